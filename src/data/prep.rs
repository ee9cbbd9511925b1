//! `data` mode: download, standardize, filter and write the training sets.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::adapters::{DatasetSource, Standardizer};
use crate::config::{DatasetRef, DatasetsConfig};
use crate::data::curate::{curate, split_head_tail, CurationReport};
use crate::data::smi::write_smi;
use crate::domain::{ensure_dir, AllowedTokens};
use crate::error::Result;

/// Per-file outcome of a `data` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSplit {
    pub path: PathBuf,
    pub molecules: usize,
}

#[derive(Debug, Clone)]
pub struct PrepSummary {
    pub tack_report: CurationReport,
    pub tack_train: WrittenSplit,
    pub tack_validation: WrittenSplit,
    pub synthetic: Vec<(CurationReport, WrittenSplit)>,
}

pub struct DataPrep<'a> {
    source: &'a dyn DatasetSource,
    standardizer: &'a dyn Standardizer,
    allowed: AllowedTokens,
    datasets: &'a DatasetsConfig,
    batch_size: usize,
}

impl<'a> DataPrep<'a> {
    pub fn new(
        source: &'a dyn DatasetSource,
        standardizer: &'a dyn Standardizer,
        datasets: &'a DatasetsConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            standardizer,
            allowed: AllowedTokens::reinvent_prior().with_check(datasets.token_check),
            datasets,
            batch_size,
        }
    }

    /// Replace the prior vocabulary; the check granularity of `allowed` is kept
    pub fn with_allowed_tokens(mut self, allowed: AllowedTokens) -> Self {
        self.allowed = allowed;
        self
    }

    /// Prepare every dataset under `base_path`, creating the folder if needed
    pub async fn run(&self, base_path: &Path) -> Result<PrepSummary> {
        ensure_dir(base_path)?;

        let (tack_report, tack_train, tack_validation) = self.process_tack(base_path).await?;
        let synthetic = self.process_synthetic(base_path).await?;

        Ok(PrepSummary {
            tack_report,
            tack_train,
            tack_validation,
            synthetic,
        })
    }

    /// TACK: a single split, cut head/tail into train and validation
    async fn process_tack(
        &self,
        base_path: &Path,
    ) -> Result<(CurationReport, WrittenSplit, WrittenSplit)> {
        let tack: &DatasetRef = &self.datasets.tack;
        let split = tack.split.as_deref().unwrap_or("train");

        info!("Downloading tack data from {}", tack.dataset);
        let raw = self
            .source
            .fetch_column(&tack.dataset, &tack.config, split, &tack.column)
            .await?;

        let curated = curate(&raw, self.standardizer, &self.allowed, self.batch_size).await?;
        info!(
            "After standardization, TACK dataset has {} molecules ({} within vocabulary)",
            curated.report.standardized, curated.report.kept
        );

        let (train, validation) = split_head_tail(curated.smiles, self.datasets.train_fraction);
        info!(
            "number of molecules for: training={}, validation={}",
            train.len(),
            validation.len()
        );

        let train_path = base_path.join("tack_train.smi");
        let validation_path = base_path.join("tack_validation.smi");
        write_smi(&train_path, &train)?;
        write_smi(&validation_path, &validation)?;
        info!("Finished writing curated data to folder {}", base_path.display());

        Ok((
            curated.report,
            WrittenSplit {
                path: train_path,
                molecules: train.len(),
            },
            WrittenSplit {
                path: validation_path,
                molecules: validation.len(),
            },
        ))
    }

    /// Synthetic PROTAC-Splitter data: every split written as-is after filtering
    async fn process_synthetic(
        &self,
        base_path: &Path,
    ) -> Result<Vec<(CurationReport, WrittenSplit)>> {
        let synthetic = &self.datasets.synthetic;
        info!("Downloading synthetic data from {}", synthetic.dataset);

        let splits = match &synthetic.split {
            Some(split) => vec![split.clone()],
            None => {
                self.source
                    .splits(&synthetic.dataset, &synthetic.config)
                    .await?
            }
        };

        let mut written = Vec::with_capacity(splits.len());
        for split in splits {
            let raw = self
                .source
                .fetch_column(&synthetic.dataset, &synthetic.config, &split, &synthetic.column)
                .await?;

            let curated = curate(&raw, self.standardizer, &self.allowed, self.batch_size).await?;
            info!(
                "After filtering, {} split has {} molecules",
                split, curated.report.kept
            );

            let path = base_path.join(format!("synthetic_{}.smi", split));
            write_smi(&path, &curated.smiles)?;
            written.push((
                curated.report,
                WrittenSplit {
                    path,
                    molecules: curated.smiles.len(),
                },
            ));
        }

        info!("Finished writing synthetic data to {}", base_path.display());
        Ok(written)
    }
}
