pub mod hub;
pub mod reinvent_cli;
pub mod standardizer;

pub use hub::{DatasetSource, HubClient};
pub use reinvent_cli::{ReinventCli, Trainer};
pub use standardizer::{LexicalStandardizer, RdkitStandardizer, Standardizer};

#[cfg(test)]
pub use hub::MockDatasetSource;
#[cfg(test)]
pub use reinvent_cli::MockTrainer;
#[cfg(test)]
pub use standardizer::MockStandardizer;
