//! Dataset curation: filtering, splitting and `.smi` file IO.

pub mod curate;
pub mod prep;
pub mod smi;

pub use curate::{curate, split_head_tail, CurationReport, Curated};
pub use prep::{DataPrep, PrepSummary, WrittenSplit};
pub use smi::{read_smi, write_smi};
