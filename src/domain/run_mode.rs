use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// What a single invocation of the orchestrator does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Download, standardize and filter the datasets
    Data,
    /// One transfer-learning run
    Tl,
    /// One reinforcement-learning run with the primary scoring profile
    Rl,
    /// TL on synthetic, TL on TACK, then two RL stages
    Both,
    /// One reinforcement-learning run with the second-stage profile
    RlS2,
    /// Launch TensorBoard on a run folder
    Board,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Data => "data",
            RunMode::Tl => "tl",
            RunMode::Rl => "rl",
            RunMode::Both => "both",
            RunMode::RlS2 => "rl_s2",
            RunMode::Board => "board",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "data" => Ok(RunMode::Data),
            "tl" => Ok(RunMode::Tl),
            "rl" => Ok(RunMode::Rl),
            "both" => Ok(RunMode::Both),
            "rl_s2" => Ok(RunMode::RlS2),
            "board" => Ok(RunMode::Board),
            _ => Err(PipelineError::UnknownRunMode(raw.to_string())),
        }
    }
}

/// Which curated dataset a transfer-learning run trains on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Tack,
    Synthetic,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Tack => "tack",
            DataType::Synthetic => "synthetic",
        }
    }

    pub fn train_file(&self) -> String {
        format!("{}_train.smi", self.as_str())
    }

    pub fn validation_file(&self) -> String {
        format!("{}_validation.smi", self.as_str())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataType {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "tack" => Ok(DataType::Tack),
            "synthetic" => Ok(DataType::Synthetic),
            _ => Err(PipelineError::UnknownDataType(raw.to_string())),
        }
    }
}
