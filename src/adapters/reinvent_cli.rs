//! REINVENT client using subprocess calls
//!
//! Each stage writes its TOML next to its outputs and runs
//! `reinvent -l <dir>/reinvent.log <config>` with the stage folder as cwd.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::{PipelineError, Result};
use crate::training::StageRequest;

/// Runs one training stage to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(&self, request: &StageRequest) -> Result<()>;
}

pub struct ReinventCli {
    executable: String,
}

impl ReinventCli {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Write the stage's TOML into its folder and return the path
    pub async fn write_config(&self, request: &StageRequest) -> Result<PathBuf> {
        let path = request.dir.join(request.document.file_name());
        let text = request.document.to_toml()?;
        tokio::fs::write(&path, text).await?;
        debug!("Wrote {} config to {}", request.name, path.display());
        Ok(path)
    }

    fn command(&self, dir: &Path, config_path: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-l")
            .arg(dir.join("reinvent.log"))
            .arg(config_path)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Trainer for ReinventCli {
    async fn train(&self, request: &StageRequest) -> Result<()> {
        let config_path = self.write_config(request).await?;

        info!(
            "Starting {} with {} (cwd {})",
            request.name,
            self.executable,
            request.dir.display()
        );
        let status = self
            .command(&request.dir, &config_path)
            .status()
            .await
            .map_err(|source| PipelineError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        if !status.success() {
            error!("{} exited with {}", request.name, status);
            return Err(PipelineError::TrainerFailed {
                stage: request.name.clone(),
                code: status.code(),
            });
        }

        info!("{} finished", request.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReinforcementLearningConfig;
    use crate::training::{ReinventDocument, RlProfile, RlRun, StagedLearningDoc};

    fn request(dir: &Path) -> StageRequest {
        let rl = ReinforcementLearningConfig::default();
        let doc = StagedLearningDoc::build(
            &RlRun {
                dir,
                device: "cpu",
                prior_file: Path::new("priors/reinvent.prior"),
                agent_file: Path::new("priors/reinvent.prior"),
                min_steps: 1,
                max_steps: 2,
                profile: RlProfile::Primary,
            },
            &rl,
        );
        StageRequest {
            name: "Stage_3_RL".to_string(),
            dir: dir.to_path_buf(),
            document: ReinventDocument::StagedLearning(doc),
        }
    }

    #[tokio::test]
    async fn test_write_config_lands_in_stage_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = ReinventCli::new("reinvent");
        let path = cli.write_config(&request(tmp.path())).await.unwrap();

        assert_eq!(path, tmp.path().join("staged_learning.toml"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("run_type = \"staged_learning\""));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = ReinventCli::new("/nonexistent/reinvent-for-tests");
        let err = cli.train(&request(tmp.path())).await.unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_trainer_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = ReinventCli::new("false");
        let err = cli.train(&request(tmp.path())).await.unwrap_err();
        match err {
            PipelineError::TrainerFailed { stage, code } => {
                assert_eq!(stage, "Stage_3_RL");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
