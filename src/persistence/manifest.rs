//! `run.json`: what produced a run folder and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{DataType, RunMode};
use crate::error::Result;

pub const MANIFEST_FILE: &str = "run.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub mode: RunMode,
    pub wd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    pub stages: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub version: String,
}

impl RunManifest {
    pub fn new(mode: RunMode, wd: &str, data_type: Option<DataType>, stages: Vec<String>) -> Self {
        Self {
            mode,
            wd: wd.to_string(),
            data_type,
            stages,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Write into `dir`, replacing any manifest from an earlier run
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&text)?)
    }
}
