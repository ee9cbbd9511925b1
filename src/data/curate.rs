use tracing::debug;

use crate::adapters::Standardizer;
use crate::domain::AllowedTokens;
use crate::error::Result;

/// How many molecules survived each filtering step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurationReport {
    pub input: usize,
    pub standardized: usize,
    pub kept: usize,
}

impl CurationReport {
    pub fn dropped_by_standardizer(&self) -> usize {
        self.input - self.standardized
    }

    pub fn dropped_by_tokens(&self) -> usize {
        self.standardized - self.kept
    }
}

#[derive(Debug, Clone, Default)]
pub struct Curated {
    pub smiles: Vec<String>,
    pub report: CurationReport,
}

/// Standardize, drop failures, then drop anything outside the allow-list.
/// Input order is preserved.
pub async fn curate(
    raw: &[String],
    standardizer: &dyn Standardizer,
    allowed: &AllowedTokens,
    batch_size: usize,
) -> Result<Curated> {
    let mut standardized = Vec::with_capacity(raw.len());
    for chunk in raw.chunks(batch_size.max(1)) {
        let results = standardizer.standardize_batch(chunk).await?;
        standardized.extend(results.into_iter().flatten());
    }

    let n_standardized = standardized.len();
    let smiles: Vec<String> = standardized
        .into_iter()
        .filter(|s| allowed.permits(s))
        .collect();

    let report = CurationReport {
        input: raw.len(),
        standardized: n_standardized,
        kept: smiles.len(),
    };
    debug!(
        "{} standardization: {} failed, {} outside vocabulary",
        standardizer.name(),
        report.dropped_by_standardizer(),
        report.dropped_by_tokens()
    );

    Ok(Curated { smiles, report })
}

/// Head/tail split: the first `floor(fraction * len)` items train, the rest validate
pub fn split_head_tail<T>(mut items: Vec<T>, fraction: f64) -> (Vec<T>, Vec<T>) {
    let n_head = ((fraction * items.len() as f64).floor() as usize).min(items.len());
    let tail = items.split_off(n_head);
    (items, tail)
}
