use clap::Parser;
use std::path::PathBuf;

use crate::domain::{DataType, RunMode};
use crate::error::Result;

/// Runtime CLI for data preparation and staged REINVENT training.
#[derive(Parser, Debug)]
#[command(name = "protac-reinvent")]
#[command(version)]
#[command(
    about = "Prepare PROTAC SMILES datasets and run staged REINVENT training",
    long_about = None
)]
pub struct Cli {
    /// Run mode: data, tl, rl, both, rl_s2, board (case-insensitive)
    #[arg(short, long, env = "PROTAC_RUN")]
    pub run: String,

    /// Working directory name under the runs folder
    #[arg(short, long, default_value = "default")]
    pub wd: String,

    /// Folder for curated `.smi` files (otherwise use config file value)
    #[arg(long, alias = "data_folder")]
    pub data_folder: Option<PathBuf>,

    /// Dataset a `tl` run trains on: tack or synthetic
    #[arg(long, alias = "data_type", default_value = "tack")]
    pub data_type: String,

    /// Epochs for a `tl` run
    #[arg(long, alias = "num_epochs")]
    pub num_epochs: Option<u32>,

    /// Minimum steps for `rl` / `rl_s2`
    #[arg(long, alias = "min_steps")]
    pub min_steps: Option<u32>,

    /// Maximum steps for `rl` / `rl_s2`
    #[arg(long, alias = "max_steps")]
    pub max_steps: Option<u32>,

    /// Run folder for `board`; defaults to the newest folder under runs
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Config file path (otherwise config/default.toml + config/$PROTAC_ENV)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn run_mode(&self) -> Result<RunMode> {
        self.run.parse()
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.data_type.parse()
    }
}
