//! REINVENT 4 run configurations, serialized to the TOML the `reinvent` CLI reads.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ReinforcementLearningConfig, ScoringComponent};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransferLearningParameters {
    pub num_epochs: u32,
    pub save_every_n_epochs: u32,
    pub batch_size: u32,
    pub sample_batch_size: u32,
    pub num_refs: u32,
    pub input_model_file: PathBuf,
    pub smiles_file: PathBuf,
    pub validation_smiles_file: PathBuf,
    pub output_model_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransferLearningDoc {
    pub run_type: &'static str,
    pub device: String,
    pub tb_logdir: PathBuf,
    pub parameters: TransferLearningParameters,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StagedParameters {
    pub summary_csv_prefix: String,
    pub use_checkpoint: bool,
    pub purge_memories: bool,
    pub prior_file: PathBuf,
    pub agent_file: PathBuf,
    pub batch_size: u32,
    pub unique_sequences: bool,
    pub randomize_smiles: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LearningStrategy {
    #[serde(rename = "type")]
    pub kind: String,
    pub sigma: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiversityFilter {
    #[serde(rename = "type")]
    pub kind: String,
    pub bucket_size: u32,
    pub minscore: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Endpoint {
    pub name: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<toml::Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<toml::Table>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComponentBody {
    pub endpoint: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Scoring {
    #[serde(rename = "type")]
    pub kind: String,
    /// Each entry is a single-key table `{ <ComponentType> = { endpoint = [...] } }`
    pub component: Vec<BTreeMap<String, ComponentBody>>,
}

impl Scoring {
    pub fn geometric_mean(components: &[ScoringComponent]) -> Self {
        let component = components
            .iter()
            .map(|c| {
                let endpoint = Endpoint {
                    name: c.name.clone(),
                    weight: c.weight,
                    transform: c.transform.clone(),
                    params: c.params.clone(),
                };
                BTreeMap::from([(
                    c.component.clone(),
                    ComponentBody {
                        endpoint: vec![endpoint],
                    },
                )])
            })
            .collect();

        Self {
            kind: "geometric_mean".to_string(),
            component,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageSection {
    pub chkpt_file: PathBuf,
    pub termination: String,
    pub max_score: f64,
    pub min_steps: u32,
    pub max_steps: u32,
    pub scoring: Scoring,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StagedLearningDoc {
    pub run_type: &'static str,
    pub device: String,
    pub tb_logdir: PathBuf,
    pub json_out_config: PathBuf,
    pub parameters: StagedParameters,
    pub learning_strategy: LearningStrategy,
    pub diversity_filter: DiversityFilter,
    pub stage: Vec<StageSection>,
}

/// Which RL scoring profile a stage uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlProfile {
    Primary,
    Secondary,
}

/// Everything a staged-learning run needs besides the shared RL settings
#[derive(Debug, Clone)]
pub struct RlRun<'a> {
    pub dir: &'a Path,
    pub device: &'a str,
    pub prior_file: &'a Path,
    pub agent_file: &'a Path,
    pub min_steps: u32,
    pub max_steps: u32,
    pub profile: RlProfile,
}

impl StagedLearningDoc {
    pub fn build(run: &RlRun<'_>, rl: &ReinforcementLearningConfig) -> Self {
        let (components, max_score) = match run.profile {
            RlProfile::Primary => (&rl.scoring, rl.max_score),
            RlProfile::Secondary => (&rl.stage_2_scoring, rl.stage_2_max_score),
        };

        Self {
            run_type: "staged_learning",
            device: run.device.to_string(),
            tb_logdir: run.dir.join("tb_logs"),
            json_out_config: run.dir.join("_staged_learning.json"),
            parameters: StagedParameters {
                summary_csv_prefix: run.dir.join("staged_learning").display().to_string(),
                use_checkpoint: false,
                purge_memories: false,
                prior_file: run.prior_file.to_path_buf(),
                agent_file: run.agent_file.to_path_buf(),
                batch_size: rl.batch_size,
                unique_sequences: rl.unique_sequences,
                randomize_smiles: rl.randomize_smiles,
            },
            learning_strategy: LearningStrategy {
                kind: "dap".to_string(),
                sigma: rl.sigma,
                rate: rl.rate,
            },
            diversity_filter: DiversityFilter {
                kind: rl.diversity_filter.clone(),
                bucket_size: rl.bucket_size,
                minscore: rl.min_score,
            },
            stage: vec![StageSection {
                chkpt_file: checkpoint_file(run.dir),
                termination: "simple".to_string(),
                max_score,
                min_steps: run.min_steps,
                max_steps: run.max_steps,
                scoring: Scoring::geometric_mean(components),
            }],
        }
    }
}

/// Model written by a transfer-learning run in `dir`
pub fn tl_model_file(dir: &Path) -> PathBuf {
    dir.join("TL_reinvent.model")
}

/// Agent checkpoint written by a staged-learning run in `dir`
pub fn checkpoint_file(dir: &Path) -> PathBuf {
    dir.join("stage1.chkpt")
}

/// A configuration ready to hand to REINVENT
#[derive(Debug, Clone, PartialEq)]
pub enum ReinventDocument {
    TransferLearning(TransferLearningDoc),
    StagedLearning(StagedLearningDoc),
}

impl ReinventDocument {
    pub fn to_toml(&self) -> Result<String> {
        let text = match self {
            ReinventDocument::TransferLearning(doc) => toml::to_string(doc)?,
            ReinventDocument::StagedLearning(doc) => toml::to_string(doc)?,
        };
        Ok(text)
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ReinventDocument::TransferLearning(_) => "transfer_learning.toml",
            ReinventDocument::StagedLearning(_) => "staged_learning.toml",
        }
    }
}

/// One call into the training library
#[derive(Debug, Clone, PartialEq)]
pub struct StageRequest {
    /// Label used in logs and errors, e.g. `Stage_2_TL`
    pub name: String,
    /// Working folder for this stage; configs and logs are written here
    pub dir: PathBuf,
    pub document: ReinventDocument,
}
