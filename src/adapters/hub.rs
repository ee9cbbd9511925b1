//! Hugging Face datasets-server client
//!
//! Pulls a single text column out of a hosted dataset through the public
//! `/splits` and `/rows` endpoints, paging with `offset`/`length`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatasetsConfig;
use crate::error::{PipelineError, Result};

/// Source of raw SMILES columns
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Split names available for a dataset config, in hub order
    async fn splits(&self, dataset: &str, config: &str) -> Result<Vec<String>>;

    /// Every string cell of `column` in one split, in row order
    async fn fetch_column(
        &self,
        dataset: &str,
        config: &str,
        split: &str,
        column: &str,
    ) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SplitsResponse {
    splits: Vec<SplitEntry>,
}

#[derive(Debug, Deserialize)]
struct SplitEntry {
    config: String,
    split: String,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEntry>,
    num_rows_total: usize,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: serde_json::Map<String, serde_json::Value>,
}

/// datasets-server REST client
pub struct HubClient {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl HubClient {
    pub fn new(base_url: &str, page_size: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("protac-reinvent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: page_size.clamp(1, 100),
        })
    }

    pub fn from_config(cfg: &DatasetsConfig) -> Result<Self> {
        Self::new(
            &cfg.hub_url,
            cfg.page_size,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        dataset: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::download(
                dataset,
                format!("{} returned {}: {}", path, status, body.trim()),
            ));
        }

        Ok(response.json().await?)
    }
}

/// Pull the string cells of `column`; nulls and non-strings are skipped
fn extract_column(rows: Vec<RowEntry>, column: &str, out: &mut Vec<String>) -> usize {
    let mut skipped = 0;
    for mut entry in rows {
        match entry.row.remove(column) {
            Some(serde_json::Value::String(s)) => out.push(s),
            _ => skipped += 1,
        }
    }
    skipped
}

#[async_trait]
impl DatasetSource for HubClient {
    async fn splits(&self, dataset: &str, config: &str) -> Result<Vec<String>> {
        let resp: SplitsResponse = self
            .get_json(dataset, "splits", &[("dataset", dataset.to_string())])
            .await?;

        let splits: Vec<String> = resp
            .splits
            .into_iter()
            .filter(|s| s.config == config)
            .map(|s| s.split)
            .collect();

        if splits.is_empty() {
            return Err(PipelineError::download(
                dataset,
                format!("no splits found for config '{}'", config),
            ));
        }
        Ok(splits)
    }

    async fn fetch_column(
        &self,
        dataset: &str,
        config: &str,
        split: &str,
        column: &str,
    ) -> Result<Vec<String>> {
        let mut values = Vec::new();
        let mut offset = 0usize;
        let mut skipped = 0usize;

        loop {
            let page: RowsResponse = self
                .get_json(
                    dataset,
                    "rows",
                    &[
                        ("dataset", dataset.to_string()),
                        ("config", config.to_string()),
                        ("split", split.to_string()),
                        ("offset", offset.to_string()),
                        ("length", self.page_size.to_string()),
                    ],
                )
                .await?;

            let fetched = page.rows.len();
            skipped += extract_column(page.rows, column, &mut values);
            offset += fetched;

            if fetched == 0 || offset >= page.num_rows_total {
                break;
            }
        }

        if values.is_empty() && skipped > 0 {
            return Err(PipelineError::download(
                dataset,
                format!("column '{}' missing from split '{}'", column, split),
            ));
        }

        info!(
            "Fetched {} rows from {}/{} [{}] ({} skipped)",
            values.len(),
            dataset,
            config,
            split,
            skipped
        );
        Ok(values)
    }
}
