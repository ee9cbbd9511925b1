//! TensorBoard launcher for training runs.
//!
//! Port forwarding is needed when the run folder lives on a remote machine.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::BoardConfig;
use crate::error::{PipelineError, Result};
use crate::persistence::MANIFEST_FILE;

/// Most recently modified run folder of `root`.
///
/// Only folders holding a run manifest count, so a log folder or other
/// sibling that happens to be touched later is never picked.
pub fn latest_run_dir(root: &Path) -> Result<PathBuf> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_dir() || !entry.path().join(MANIFEST_FILE).is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
            latest = Some((modified, entry.path()));
        }
    }

    latest.map(|(_, path)| path).ok_or_else(|| {
        PipelineError::Validation(format!(
            "no run folders with {} found in {}",
            MANIFEST_FILE,
            root.display()
        ))
    })
}

fn board_args(cfg: &BoardConfig, logdir: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if cfg.bind_all {
        args.push("--bind_all".to_string());
    }
    args.push("--logdir".to_string());
    args.push(logdir.display().to_string());
    args.push("--port".to_string());
    args.push(cfg.port.to_string());
    args
}

/// Run TensorBoard on `logdir` until Enter is pressed or it exits on its own
pub async fn launch(cfg: &BoardConfig, logdir: &Path) -> Result<()> {
    info!("Launching TensorBoard with logdir: {}", logdir.display());

    let mut child = Command::new(&cfg.executable)
        .args(board_args(cfg, logdir))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| PipelineError::Spawn {
            program: cfg.executable.clone(),
            source,
        })?;

    println!("TensorBoard is running at http://localhost:{}/", cfg.port);
    println!("Press Enter to terminate...");

    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        read = stdin.read_line(&mut line) => {
            read?;
            child.kill().await?;
            info!("TensorBoard stopped");
        }
        status = child.wait() => {
            let status = status?;
            if !status.success() {
                warn!("TensorBoard exited with {}", status);
                return Err(PipelineError::Validation(format!(
                    "{} exited with {}",
                    cfg.executable, status
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunMode;
    use crate::persistence::RunManifest;
    use std::time::Duration;

    fn make_run(root: &Path, name: &str) {
        let dir = root.join(name);
        std::fs::create_dir(&dir).unwrap();
        RunManifest::new(RunMode::Both, name, None, Vec::new())
            .write(&dir)
            .unwrap();
    }

    #[test]
    fn test_latest_run_dir_picks_newest() {
        let tmp = tempfile::tempdir().unwrap();
        make_run(tmp.path(), "old");
        std::thread::sleep(Duration::from_millis(50));
        make_run(tmp.path(), "new");
        std::fs::write(tmp.path().join("stray.txt"), "x").unwrap();

        assert_eq!(latest_run_dir(tmp.path()).unwrap(), tmp.path().join("new"));
    }

    #[test]
    fn test_latest_run_dir_ignores_recently_touched_log_folder() {
        let tmp = tempfile::tempdir().unwrap();
        make_run(tmp.path(), "exp1");
        std::thread::sleep(Duration::from_millis(50));

        // what the logging preflight does on every start
        let logs = tmp.path().join("logs");
        std::fs::create_dir(&logs).unwrap();
        let write_test = logs.join(".protac_write_test");
        std::fs::write(&write_test, "").unwrap();
        std::fs::remove_file(&write_test).unwrap();

        assert_eq!(latest_run_dir(tmp.path()).unwrap(), tmp.path().join("exp1"));
    }

    #[test]
    fn test_latest_run_dir_errors_when_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(latest_run_dir(tmp.path()).is_err());

        std::fs::create_dir(tmp.path().join("logs")).unwrap();
        assert!(latest_run_dir(tmp.path()).is_err());
    }

    #[test]
    fn test_board_args() {
        let cfg = BoardConfig::default();
        let args = board_args(&cfg, Path::new("runs/exp"));
        assert_eq!(args, ["--bind_all", "--logdir", "runs/exp", "--port", "8089"]);

        let cfg = BoardConfig {
            bind_all: false,
            ..BoardConfig::default()
        };
        assert_eq!(board_args(&cfg, Path::new("x"))[0], "--logdir");
    }
}
