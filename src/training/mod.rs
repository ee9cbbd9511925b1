//! REINVENT run configurations and the stage pipeline that drives them.

pub mod documents;
pub mod pipeline;

pub use documents::{
    checkpoint_file, tl_model_file, ReinventDocument, RlProfile, RlRun, StageRequest,
    StagedLearningDoc, TransferLearningDoc,
};
pub use pipeline::{RlStage, StagedOutcome, TlStage, TrainingPipeline};
