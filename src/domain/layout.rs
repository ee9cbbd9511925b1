use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Create `path` (and parents) unless it already exists as a directory
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// The four stages of the `both` pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Stage1Tl,
    Stage2Tl,
    Stage3Rl,
    Stage4Rl,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Stage1Tl,
        Stage::Stage2Tl,
        Stage::Stage3Rl,
        Stage::Stage4Rl,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::Stage1Tl => "Stage_1_TL",
            Stage::Stage2Tl => "Stage_2_TL",
            Stage::Stage3Rl => "Stage_3_RL",
            Stage::Stage4Rl => "Stage_4_RL",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// `runs/<wd>` folder of one training invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub runs_root: PathBuf,
    pub wd: PathBuf,
}

impl RunLayout {
    /// Resolve `<base>/<runs_root>/<name>` and create both levels
    pub fn prepare(base: &Path, runs_root: &Path, name: &str) -> io::Result<Self> {
        let runs_root = base.join(runs_root);
        ensure_dir(&runs_root)?;

        let wd = runs_root.join(name);
        ensure_dir(&wd)?;

        Ok(Self { runs_root, wd })
    }

    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.wd.join(stage.dir_name())
    }

    /// Create and return the sub-folder for `stage`
    pub fn prepare_stage(&self, stage: Stage) -> io::Result<PathBuf> {
        let dir = self.stage_dir(stage);
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_creates_nested_folders() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = RunLayout::prepare(tmp.path(), Path::new("runs"), "exp1").unwrap();

        assert_eq!(layout.wd, tmp.path().join("runs").join("exp1"));
        assert!(layout.wd.is_dir());

        // idempotent
        let again = RunLayout::prepare(tmp.path(), Path::new("runs"), "exp1").unwrap();
        assert_eq!(again, layout);
    }

    #[test]
    fn test_stage_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = RunLayout::prepare(tmp.path(), Path::new("runs"), "exp").unwrap();
        let dir = layout.prepare_stage(Stage::Stage3Rl).unwrap();

        assert!(dir.ends_with("runs/exp/Stage_3_RL"));
        assert!(dir.is_dir());
        assert_eq!(
            Stage::ALL.map(|s| s.dir_name()),
            ["Stage_1_TL", "Stage_2_TL", "Stage_3_RL", "Stage_4_RL"]
        );
    }
}
