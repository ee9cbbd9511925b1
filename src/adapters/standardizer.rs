//! SMILES standardizers
//!
//! The RDKit path hands whole batches to a Python child process running
//! REINVENT's `RDKitStandardizer`; one canonical SMILES (or an empty line on
//! failure) comes back per input line.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::{StandardizerConfig, StandardizerKind};
use crate::domain::normalize_lexical;
use crate::error::{PipelineError, Result};

/// Canonicalizes SMILES; `None` marks a molecule that failed
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Standardizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// One output per input, same order
    async fn standardize_batch(&self, smiles: &[String]) -> Result<Vec<Option<String>>>;
}

const RDKIT_SCRIPT: &str = r#"
import sys
from reinvent.chemistry.standardization.rdkit_standardizer import RDKitStandardizer

std = RDKitStandardizer(filter_configs=None, isomeric=False)
for line in sys.stdin:
    try:
        out = std.apply_filter(line.strip())
    except Exception:
        out = None
    sys.stdout.write((out or "") + "\n")
sys.stdout.flush()
"#;

/// RDKit standardization through the REINVENT Python package
pub struct RdkitStandardizer {
    python: String,
}

impl RdkitStandardizer {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

fn parse_output(stdout: &str, expected: usize) -> Result<Vec<Option<String>>> {
    let results: Vec<Option<String>> = stdout
        .lines()
        .map(|line| {
            let line = line.trim();
            if line.is_empty() {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect();

    if results.len() != expected {
        return Err(PipelineError::Standardizer(format!(
            "expected {} results, got {}",
            expected,
            results.len()
        )));
    }
    Ok(results)
}

#[async_trait]
impl Standardizer for RdkitStandardizer {
    fn name(&self) -> &'static str {
        "rdkit"
    }

    async fn standardize_batch(&self, smiles: &[String]) -> Result<Vec<Option<String>>> {
        if smiles.is_empty() {
            return Ok(Vec::new());
        }

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(RDKIT_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                program: self.python.clone(),
                source,
            })?;

        // Newlines inside a cell would shift every following result.
        let mut input = String::with_capacity(smiles.len() * 64);
        for s in smiles {
            input.push_str(&s.replace(['\n', '\r'], " "));
            input.push('\n');
        }

        // Feed stdin from a separate task so a full stdout pipe cannot stall the writer.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::Standardizer("stdin not captured".to_string()))?;
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;
        let written = writer
            .await
            .map_err(|e| PipelineError::Standardizer(format!("stdin writer panicked: {e}")))?;

        // A broken pipe here usually means the script died; report its stderr instead.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Standardizer(format!(
                "{} exited with {}: {}",
                self.python,
                output.status,
                stderr.trim()
            )));
        }
        written?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let results = parse_output(&stdout, smiles.len())?;
        debug!(
            "rdkit standardized {}/{} molecules",
            results.iter().filter(|r| r.is_some()).count(),
            smiles.len()
        );
        Ok(results)
    }
}

/// Toolkit-free standardization; see [`normalize_lexical`]
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalStandardizer;

#[async_trait]
impl Standardizer for LexicalStandardizer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn standardize_batch(&self, smiles: &[String]) -> Result<Vec<Option<String>>> {
        Ok(smiles.iter().map(|s| normalize_lexical(s)).collect())
    }
}

pub fn from_config(cfg: &StandardizerConfig) -> Box<dyn Standardizer> {
    match cfg.kind {
        StandardizerKind::Rdkit => Box::new(RdkitStandardizer::new(cfg.python.clone())),
        StandardizerKind::Lexical => Box::new(LexicalStandardizer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_maps_blank_lines_to_none() {
        let out = parse_output("CCO\n\nc1ccccc1\n", 3).unwrap();
        assert_eq!(
            out,
            vec![Some("CCO".to_string()), None, Some("c1ccccc1".to_string())]
        );
    }

    #[test]
    fn test_parse_output_rejects_count_mismatch() {
        let err = parse_output("CCO\n", 2).unwrap_err();
        assert!(err.to_string().contains("expected 2 results, got 1"));
    }

    #[tokio::test]
    async fn test_lexical_standardizer_keeps_order() {
        let input = vec![
            "C[C@H](N)C(=O)O".to_string(),
            "C1CC".to_string(),
            "CCO".to_string(),
        ];
        let out = LexicalStandardizer.standardize_batch(&input).await.unwrap();
        assert_eq!(
            out,
            vec![Some("CC(N)C(=O)O".to_string()), None, Some("CCO".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rdkit_missing_interpreter_is_spawn_error() {
        let std = RdkitStandardizer::new("/nonexistent/python-for-tests");
        let err = std
            .standardize_batch(&["CCO".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[test]
    fn test_from_config_selects_kind() {
        let mut cfg = StandardizerConfig::default();
        assert_eq!(from_config(&cfg).name(), "rdkit");
        cfg.kind = StandardizerKind::Lexical;
        assert_eq!(from_config(&cfg).name(), "lexical");
    }
}
