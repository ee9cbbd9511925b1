use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::TokenCheck;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub datasets: DatasetsConfig,
    pub standardizer: StandardizerConfig,
    pub reinvent: ReinventConfig,
    pub transfer_learning: TransferLearningConfig,
    pub reinforcement_learning: ReinforcementLearningConfig,
    pub schedule: ScheduleConfig,
    pub board: BoardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root folder for run artifacts, relative to the current directory
    pub runs_root: PathBuf,
    /// Folder holding the curated `.smi` files
    pub data_folder: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            runs_root: PathBuf::from("runs"),
            data_folder: PathBuf::from("data"),
        }
    }
}

/// Where a single dataset lives on the hub and which column carries SMILES
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetRef {
    pub dataset: String,
    pub config: String,
    pub column: String,
    /// Restrict to one split; all splits are fetched when unset
    #[serde(default)]
    pub split: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    /// Base URL of the Hugging Face datasets-server API
    pub hub_url: String,
    /// Rows per `/rows` request (the server caps this at 100)
    pub page_size: usize,
    pub request_timeout_secs: u64,
    /// Share of curated TACK molecules that goes to training
    pub train_fraction: f64,
    /// How curated SMILES are matched against the prior vocabulary
    pub token_check: TokenCheck,
    pub tack: DatasetRef,
    pub synthetic: DatasetRef,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            hub_url: "https://datasets-server.huggingface.co".to_string(),
            page_size: 100,
            request_timeout_secs: 60,
            train_fraction: 0.8,
            token_check: TokenCheck::Character,
            tack: DatasetRef {
                dataset: "ailab-bio/TACK".to_string(),
                config: "default".to_string(),
                column: "SMILES".to_string(),
                split: Some("train".to_string()),
            },
            synthetic: DatasetRef {
                dataset: "ailab-bio/PROTAC-Splitter-Dataset".to_string(),
                config: "clustered".to_string(),
                column: "text".to_string(),
                split: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardizerKind {
    /// REINVENT's RDKit standardizer, run through a Python child process
    Rdkit,
    /// Built-in string-level normalisation, no chemistry toolkit needed
    Lexical,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StandardizerConfig {
    pub kind: StandardizerKind,
    /// Python interpreter with `reinvent` and `rdkit` installed
    pub python: String,
    /// Molecules sent to one standardizer process
    pub batch_size: usize,
}

impl Default for StandardizerConfig {
    fn default() -> Self {
        Self {
            kind: StandardizerKind::Rdkit,
            python: "python".to_string(),
            batch_size: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReinventConfig {
    /// The `reinvent` console script
    pub executable: String,
    pub device: String,
    pub prior_file: PathBuf,
}

impl Default for ReinventConfig {
    fn default() -> Self {
        Self {
            executable: "reinvent".to_string(),
            device: "cuda:0".to_string(),
            prior_file: PathBuf::from("priors/reinvent.prior"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferLearningConfig {
    pub num_epochs: u32,
    pub save_every_n_epochs: u32,
    pub batch_size: u32,
    pub sample_batch_size: u32,
    pub num_refs: u32,
    /// Start from this model instead of the prior (single `tl` runs only)
    pub input_model_file: Option<PathBuf>,
}

impl Default for TransferLearningConfig {
    fn default() -> Self {
        Self {
            num_epochs: 50,
            save_every_n_epochs: 10,
            batch_size: 64,
            sample_batch_size: 100,
            num_refs: 100,
            input_model_file: None,
        }
    }
}

/// One scoring component of a staged-learning stage
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScoringComponent {
    /// REINVENT component type, e.g. `QED` or `MolecularWeight`
    pub component: String,
    /// Endpoint label shown in the TensorBoard summaries
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<toml::Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<toml::Table>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReinforcementLearningConfig {
    pub min_steps: u32,
    pub max_steps: u32,
    pub batch_size: u32,
    pub unique_sequences: bool,
    pub randomize_smiles: bool,
    pub sigma: f64,
    pub rate: f64,
    pub diversity_filter: String,
    pub bucket_size: u32,
    pub min_score: f64,
    /// Terminate a stage once the mean score reaches this value
    pub max_score: f64,
    pub scoring: Vec<ScoringComponent>,
    /// Second-stage profile, used by `rl_s2` and the last stage of `both`
    pub stage_2_max_score: f64,
    pub stage_2_scoring: Vec<ScoringComponent>,
    /// Agent to start from (single `rl` runs only); defaults to the prior
    pub agent_file: Option<PathBuf>,
}

fn table(pairs: &[(&str, toml::Value)]) -> toml::Table {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn qed_component(weight: f64) -> ScoringComponent {
    ScoringComponent {
        component: "QED".to_string(),
        name: "QED".to_string(),
        weight,
        transform: None,
        params: None,
    }
}

// PROTACs sit well outside rule-of-five space; reward 700-1200 Da.
fn molecular_weight_component(weight: f64) -> ScoringComponent {
    ScoringComponent {
        component: "MolecularWeight".to_string(),
        name: "Molecular weight".to_string(),
        weight,
        transform: Some(table(&[
            ("type", toml::Value::String("double_sigmoid".to_string())),
            ("low", toml::Value::Float(700.0)),
            ("high", toml::Value::Float(1200.0)),
            ("coef_div", toml::Value::Float(1200.0)),
            ("coef_si", toml::Value::Float(20.0)),
            ("coef_se", toml::Value::Float(20.0)),
        ])),
        params: None,
    }
}

fn sa_score_component(weight: f64) -> ScoringComponent {
    ScoringComponent {
        component: "SAScore".to_string(),
        name: "SA score".to_string(),
        weight,
        transform: Some(table(&[
            ("type", toml::Value::String("reverse_sigmoid".to_string())),
            ("low", toml::Value::Float(2.0)),
            ("high", toml::Value::Float(6.0)),
            ("k", toml::Value::Float(0.5)),
        ])),
        params: None,
    }
}

impl Default for ReinforcementLearningConfig {
    fn default() -> Self {
        Self {
            min_steps: 500,
            max_steps: 1000,
            batch_size: 64,
            unique_sequences: true,
            randomize_smiles: true,
            sigma: 128.0,
            rate: 0.0001,
            diversity_filter: "IdenticalMurckoScaffold".to_string(),
            bucket_size: 25,
            min_score: 0.4,
            max_score: 0.6,
            scoring: vec![qed_component(1.0), molecular_weight_component(1.0)],
            stage_2_max_score: 0.8,
            stage_2_scoring: vec![
                qed_component(1.0),
                molecular_weight_component(1.0),
                sa_score_component(1.0),
            ],
            agent_file: None,
        }
    }
}

/// Epoch and step counts of the four-stage `both` pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub stage_1_tl_epochs: u32,
    pub stage_2_tl_epochs: u32,
    pub stage_3_rl_min_steps: u32,
    pub stage_3_rl_max_steps: u32,
    pub stage_4_rl_min_steps: u32,
    pub stage_4_rl_max_steps: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            stage_1_tl_epochs: 50,
            stage_2_tl_epochs: 10,
            stage_3_rl_min_steps: 500,
            stage_3_rl_max_steps: 1000,
            stage_4_rl_min_steps: 3000,
            stage_4_rl_max_steps: 6000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub executable: String,
    pub port: u16,
    pub bind_all: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            executable: "tensorboard".to_string(),
            port: 8089,
            bind_all: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for the rolling log file; env vars take precedence, default `logs`
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/cluster.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PROTAC_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PROTAC__REINVENT__DEVICE, etc.)
            .add_source(
                Environment::with_prefix("PROTAC")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load a single explicit file, still honouring environment overrides
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(
                Environment::with_prefix("PROTAC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let fraction = self.datasets.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            errors.push(format!("train_fraction must be between 0 and 1, got {fraction}"));
        }

        if self.datasets.page_size == 0 || self.datasets.page_size > 100 {
            errors.push("page_size must be between 1 and 100".to_string());
        }

        if self.standardizer.batch_size == 0 {
            errors.push("standardizer batch_size must be positive".to_string());
        }

        if self.transfer_learning.num_epochs == 0 {
            errors.push("transfer_learning num_epochs must be positive".to_string());
        }

        let rl = &self.reinforcement_learning;
        if rl.min_steps > rl.max_steps {
            errors.push(format!(
                "reinforcement_learning min_steps ({}) exceeds max_steps ({})",
                rl.min_steps, rl.max_steps
            ));
        }
        if rl.scoring.is_empty() || rl.stage_2_scoring.is_empty() {
            errors.push("each RL scoring profile needs at least one component".to_string());
        }

        let s = &self.schedule;
        if s.stage_3_rl_min_steps > s.stage_3_rl_max_steps {
            errors.push("schedule stage 3 min steps exceed max steps".to_string());
        }
        if s.stage_4_rl_min_steps > s.stage_4_rl_max_steps {
            errors.push("schedule stage 4 min steps exceed max steps".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.schedule.stage_1_tl_epochs, 50);
        assert_eq!(cfg.schedule.stage_4_rl_max_steps, 6000);
        assert_eq!(cfg.board.port, 8089);
        assert_eq!(cfg.datasets.token_check, TokenCheck::Character);
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut cfg = AppConfig::default();
        cfg.datasets.train_fraction = 1.5;
        cfg.reinforcement_learning.min_steps = 10;
        cfg.reinforcement_learning.max_steps = 5;

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("train_fraction"));
        assert!(errors[1].contains("min_steps"));
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "[reinvent]\ndevice = \"cpu\"\n\n[schedule]\nstage_2_tl_epochs = 3\n\n[datasets]\ntoken_check = \"token\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load_file(&path).unwrap();
        assert_eq!(cfg.reinvent.device, "cpu");
        assert_eq!(cfg.schedule.stage_2_tl_epochs, 3);
        assert_eq!(cfg.datasets.token_check, TokenCheck::Token);
        // untouched keys keep their defaults
        assert_eq!(cfg.schedule.stage_1_tl_epochs, 50);
        assert_eq!(cfg.reinvent.executable, "reinvent");
    }
}
