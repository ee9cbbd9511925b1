pub mod adapters;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod services;
pub mod training;

pub use adapters::{DatasetSource, HubClient, ReinventCli, Standardizer, Trainer};
pub use config::AppConfig;
pub use data::{DataPrep, PrepSummary};
pub use domain::{AllowedTokens, DataType, RunLayout, RunMode, Stage};
pub use error::{PipelineError, Result};
pub use persistence::RunManifest;
pub use training::{StagedOutcome, TrainingPipeline};
