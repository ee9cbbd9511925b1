//! Transfer-learning and reinforcement-learning stages, alone or chained.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::adapters::Trainer;
use crate::config::AppConfig;
use crate::domain::{DataType, RunLayout, Stage};
use crate::error::{PipelineError, Result};
use crate::training::documents::{
    checkpoint_file, tl_model_file, ReinventDocument, RlProfile, RlRun, StageRequest,
    StagedLearningDoc, TransferLearningDoc, TransferLearningParameters,
};

/// Settings of one transfer-learning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlStage {
    pub data_type: DataType,
    pub num_epochs: u32,
    pub input_model: PathBuf,
}

/// Settings of one reinforcement-learning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RlStage {
    pub min_steps: u32,
    pub max_steps: u32,
    pub profile: RlProfile,
    pub agent_file: PathBuf,
}

/// Model files produced by the four-stage pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedOutcome {
    pub stage_1_model: PathBuf,
    pub stage_2_model: PathBuf,
    pub stage_3_checkpoint: PathBuf,
    pub stage_4_checkpoint: PathBuf,
}

/// REINVENT runs with the stage folder as its cwd, so every path written into
/// a document is anchored to the invocation cwd first.
fn resolve(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

pub struct TrainingPipeline<'a> {
    trainer: &'a dyn Trainer,
    cfg: &'a AppConfig,
    data_folder: PathBuf,
}

impl<'a> TrainingPipeline<'a> {
    /// `data_folder` should already be resolved against the working directory
    pub fn new(trainer: &'a dyn Trainer, cfg: &'a AppConfig, data_folder: PathBuf) -> Self {
        Self {
            trainer,
            cfg,
            data_folder,
        }
    }

    /// TL settings from configuration; `num_epochs` overrides the configured count
    pub fn tl_stage(&self, data_type: DataType, num_epochs: Option<u32>) -> TlStage {
        let tl = &self.cfg.transfer_learning;
        TlStage {
            data_type,
            num_epochs: num_epochs.unwrap_or(tl.num_epochs),
            input_model: tl
                .input_model_file
                .clone()
                .unwrap_or_else(|| self.cfg.reinvent.prior_file.clone()),
        }
    }

    /// RL settings from configuration; step counts override the configured ones
    pub fn rl_stage(&self, stage_2: bool, min_steps: Option<u32>, max_steps: Option<u32>) -> RlStage {
        let rl = &self.cfg.reinforcement_learning;
        RlStage {
            min_steps: min_steps.unwrap_or(rl.min_steps),
            max_steps: max_steps.unwrap_or(rl.max_steps),
            profile: if stage_2 {
                RlProfile::Secondary
            } else {
                RlProfile::Primary
            },
            agent_file: rl
                .agent_file
                .clone()
                .unwrap_or_else(|| self.cfg.reinvent.prior_file.clone()),
        }
    }

    fn training_files(&self, data_type: DataType) -> Result<(PathBuf, PathBuf)> {
        let data_folder = resolve(&self.data_folder)?;
        let train = data_folder.join(data_type.train_file());
        let validation = data_folder.join(data_type.validation_file());

        let train_len = std::fs::metadata(&train).map(|m| m.len()).map_err(|_| {
            PipelineError::Validation(format!(
                "training file {} not found; run with `--run data` first",
                train.display()
            ))
        })?;
        if train_len == 0 {
            return Err(PipelineError::Validation(format!(
                "training file {} is empty",
                train.display()
            )));
        }
        if !validation.is_file() {
            return Err(PipelineError::Validation(format!(
                "validation file {} not found",
                validation.display()
            )));
        }
        Ok((train, validation))
    }

    /// Fine-tune `stage.input_model` on the curated `data_type` set; returns the output model
    pub async fn transfer_learning(&self, name: &str, dir: &Path, stage: &TlStage) -> Result<PathBuf> {
        let (smiles_file, validation_smiles_file) = self.training_files(stage.data_type)?;
        let dir = resolve(dir)?;
        let input_model_file = resolve(&stage.input_model)?;
        let tl = &self.cfg.transfer_learning;
        let output_model_file = tl_model_file(&dir);

        info!(
            "{}: transfer learning on {} for {} epochs from {}",
            name,
            stage.data_type,
            stage.num_epochs,
            input_model_file.display()
        );

        let document = ReinventDocument::TransferLearning(TransferLearningDoc {
            run_type: "transfer_learning",
            device: self.cfg.reinvent.device.clone(),
            tb_logdir: dir.join("tb_TL"),
            parameters: TransferLearningParameters {
                num_epochs: stage.num_epochs,
                save_every_n_epochs: tl.save_every_n_epochs.min(stage.num_epochs).max(1),
                batch_size: tl.batch_size,
                sample_batch_size: tl.sample_batch_size,
                num_refs: tl.num_refs,
                input_model_file,
                smiles_file,
                validation_smiles_file,
                output_model_file: output_model_file.clone(),
            },
        });

        self.trainer
            .train(&StageRequest {
                name: name.to_string(),
                dir,
                document,
            })
            .await?;
        Ok(output_model_file)
    }

    /// Staged learning from `stage.agent_file`; returns the agent checkpoint
    pub async fn reinforcement_learning(
        &self,
        name: &str,
        dir: &Path,
        stage: &RlStage,
    ) -> Result<PathBuf> {
        if stage.min_steps > stage.max_steps {
            return Err(PipelineError::Validation(format!(
                "min_steps ({}) exceeds max_steps ({})",
                stage.min_steps, stage.max_steps
            )));
        }

        let dir = resolve(dir)?;
        let prior_file = resolve(&self.cfg.reinvent.prior_file)?;
        let agent_file = resolve(&stage.agent_file)?;

        info!(
            "{}: reinforcement learning ({:?} profile) for {}-{} steps from {}",
            name,
            stage.profile,
            stage.min_steps,
            stage.max_steps,
            agent_file.display()
        );

        let doc = StagedLearningDoc::build(
            &RlRun {
                dir: &dir,
                device: &self.cfg.reinvent.device,
                prior_file: &prior_file,
                agent_file: &agent_file,
                min_steps: stage.min_steps,
                max_steps: stage.max_steps,
                profile: stage.profile,
            },
            &self.cfg.reinforcement_learning,
        );

        self.trainer
            .train(&StageRequest {
                name: name.to_string(),
                dir: dir.clone(),
                document: ReinventDocument::StagedLearning(doc),
            })
            .await?;
        Ok(checkpoint_file(&dir))
    }

    /// TL on synthetic, TL on TACK, RL, then RL with the second-stage profile.
    /// Each stage starts from the previous stage's model; the first failure stops the run.
    pub async fn run_staged(&self, layout: &RunLayout) -> Result<StagedOutcome> {
        let schedule = &self.cfg.schedule;

        let dir = layout.prepare_stage(Stage::Stage1Tl)?;
        let stage_1 = TlStage {
            num_epochs: schedule.stage_1_tl_epochs,
            ..self.tl_stage(DataType::Synthetic, None)
        };
        let stage_1_model = self
            .transfer_learning(Stage::Stage1Tl.dir_name(), &dir, &stage_1)
            .await?;

        let dir = layout.prepare_stage(Stage::Stage2Tl)?;
        let stage_2 = TlStage {
            data_type: DataType::Tack,
            num_epochs: schedule.stage_2_tl_epochs,
            input_model: stage_1_model.clone(),
        };
        let stage_2_model = self
            .transfer_learning(Stage::Stage2Tl.dir_name(), &dir, &stage_2)
            .await?;

        let dir = layout.prepare_stage(Stage::Stage3Rl)?;
        let stage_3 = RlStage {
            min_steps: schedule.stage_3_rl_min_steps,
            max_steps: schedule.stage_3_rl_max_steps,
            profile: RlProfile::Primary,
            agent_file: stage_2_model.clone(),
        };
        let stage_3_checkpoint = self
            .reinforcement_learning(Stage::Stage3Rl.dir_name(), &dir, &stage_3)
            .await?;

        let dir = layout.prepare_stage(Stage::Stage4Rl)?;
        let stage_4 = RlStage {
            min_steps: schedule.stage_4_rl_min_steps,
            max_steps: schedule.stage_4_rl_max_steps,
            profile: RlProfile::Secondary,
            agent_file: stage_3_checkpoint.clone(),
        };
        let stage_4_checkpoint = self
            .reinforcement_learning(Stage::Stage4Rl.dir_name(), &dir, &stage_4)
            .await?;

        Ok(StagedOutcome {
            stage_1_model,
            stage_2_model,
            stage_3_checkpoint,
            stage_4_checkpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockTrainer;
    use crate::data::write_smi;
    use std::sync::{Arc, Mutex};

    fn seed_data(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        for name in [
            "synthetic_train.smi",
            "synthetic_validation.smi",
            "tack_train.smi",
            "tack_validation.smi",
        ] {
            write_smi(&dir.join(name), &["CCO", "CCN"]).unwrap();
        }
    }

    fn recording_trainer(fail_on: Option<&'static str>) -> (MockTrainer, Arc<Mutex<Vec<StageRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut trainer = MockTrainer::new();
        trainer.expect_train().returning(move |req| {
            sink.lock().unwrap().push(req.clone());
            if Some(req.name.as_str()) == fail_on {
                return Err(PipelineError::TrainerFailed {
                    stage: req.name.clone(),
                    code: Some(1),
                });
            }
            Ok(())
        });
        (trainer, seen)
    }

    #[tokio::test]
    async fn test_staged_runs_four_chained_stages() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        seed_data(&data);
        let layout = RunLayout::prepare(tmp.path(), Path::new("runs"), "exp").unwrap();

        let cfg = AppConfig::default();
        let (trainer, seen) = recording_trainer(None);
        let pipeline = TrainingPipeline::new(&trainer, &cfg, data.clone());

        let outcome = pipeline.run_staged(&layout).await.unwrap();
        let seen = seen.lock().unwrap();

        let names: Vec<&str> = seen.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Stage_1_TL", "Stage_2_TL", "Stage_3_RL", "Stage_4_RL"]);
        for stage in Stage::ALL {
            assert!(layout.stage_dir(stage).is_dir());
        }

        match &seen[0].document {
            ReinventDocument::TransferLearning(doc) => {
                assert_eq!(doc.parameters.num_epochs, 50);
                assert_eq!(doc.parameters.smiles_file, data.join("synthetic_train.smi"));
                assert_eq!(
                    doc.parameters.input_model_file,
                    std::path::absolute(&cfg.reinvent.prior_file).unwrap()
                );
                assert!(doc.parameters.output_model_file.is_absolute());
            }
            other => panic!("stage 1 should be TL, got {other:?}"),
        }
        match &seen[1].document {
            ReinventDocument::TransferLearning(doc) => {
                assert_eq!(doc.parameters.num_epochs, 10);
                assert_eq!(doc.parameters.smiles_file, data.join("tack_train.smi"));
                assert_eq!(doc.parameters.input_model_file, outcome.stage_1_model);
            }
            other => panic!("stage 2 should be TL, got {other:?}"),
        }
        match &seen[2].document {
            ReinventDocument::StagedLearning(doc) => {
                assert_eq!(doc.stage[0].min_steps, 500);
                assert_eq!(doc.stage[0].max_steps, 1000);
                assert_eq!(doc.parameters.agent_file, outcome.stage_2_model);
                assert_eq!(doc.stage[0].max_score, cfg.reinforcement_learning.max_score);
            }
            other => panic!("stage 3 should be RL, got {other:?}"),
        }
        match &seen[3].document {
            ReinventDocument::StagedLearning(doc) => {
                assert_eq!(doc.stage[0].min_steps, 3000);
                assert_eq!(doc.stage[0].max_steps, 6000);
                assert_eq!(doc.parameters.agent_file, outcome.stage_3_checkpoint);
                assert_eq!(
                    doc.stage[0].max_score,
                    cfg.reinforcement_learning.stage_2_max_score
                );
            }
            other => panic!("stage 4 should be RL, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_staged_stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        seed_data(&data);
        let layout = RunLayout::prepare(tmp.path(), Path::new("runs"), "exp").unwrap();

        let cfg = AppConfig::default();
        let (trainer, seen) = recording_trainer(Some("Stage_2_TL"));
        let pipeline = TrainingPipeline::new(&trainer, &cfg, data);

        let err = pipeline.run_staged(&layout).await.unwrap_err();
        assert!(matches!(err, PipelineError::TrainerFailed { ref stage, .. } if stage == "Stage_2_TL"));
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(!layout.stage_dir(Stage::Stage3Rl).exists());
    }

    #[tokio::test]
    async fn test_tl_requires_prepared_data() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig::default();
        let mut trainer = MockTrainer::new();
        trainer.expect_train().never();
        let pipeline = TrainingPipeline::new(&trainer, &cfg, tmp.path().join("data"));

        let stage = pipeline.tl_stage(DataType::Tack, Some(3));
        let err = pipeline
            .transfer_learning("tl", tmp.path(), &stage)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(ref m) if m.contains("tack_train.smi")));
    }

    #[test]
    fn test_stage_settings_from_config() {
        let mut cfg = AppConfig::default();
        cfg.reinforcement_learning.agent_file = Some(PathBuf::from("agents/custom.chkpt"));
        let trainer = MockTrainer::new();
        let pipeline = TrainingPipeline::new(&trainer, &cfg, PathBuf::from("data"));

        let tl = pipeline.tl_stage(DataType::Synthetic, None);
        assert_eq!(tl.num_epochs, cfg.transfer_learning.num_epochs);
        assert_eq!(tl.input_model, cfg.reinvent.prior_file);

        let rl = pipeline.rl_stage(true, Some(7), None);
        assert_eq!(rl.profile, RlProfile::Secondary);
        assert_eq!(rl.min_steps, 7);
        assert_eq!(rl.max_steps, cfg.reinforcement_learning.max_steps);
        assert_eq!(rl.agent_file, PathBuf::from("agents/custom.chkpt"));
    }

    #[tokio::test]
    async fn test_documents_never_carry_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        seed_data(&data);

        let cfg = AppConfig::default();
        assert!(cfg.reinvent.prior_file.is_relative());
        let (trainer, seen) = recording_trainer(None);
        let pipeline = TrainingPipeline::new(&trainer, &cfg, data);

        let tl = pipeline.tl_stage(DataType::Tack, Some(1));
        pipeline
            .transfer_learning("TL", Path::new("runs/exp"), &tl)
            .await
            .unwrap();
        let rl = pipeline.rl_stage(false, None, None);
        let checkpoint = pipeline
            .reinforcement_learning("RL", Path::new("runs/exp"), &rl)
            .await
            .unwrap();
        assert!(checkpoint.is_absolute());

        let seen = seen.lock().unwrap();
        let cwd = std::env::current_dir().unwrap();
        match &seen[0].document {
            ReinventDocument::TransferLearning(doc) => {
                assert_eq!(
                    doc.parameters.input_model_file,
                    cwd.join("priors/reinvent.prior")
                );
                assert!(doc.parameters.output_model_file.is_absolute());
                assert!(doc.tb_logdir.is_absolute());
            }
            other => panic!("expected TL, got {other:?}"),
        }
        match &seen[1].document {
            ReinventDocument::StagedLearning(doc) => {
                assert_eq!(doc.parameters.prior_file, cwd.join("priors/reinvent.prior"));
                assert_eq!(doc.parameters.agent_file, cwd.join("priors/reinvent.prior"));
                assert!(doc.stage[0].chkpt_file.is_absolute());
            }
            other => panic!("expected RL, got {other:?}"),
        }
        assert!(seen.iter().all(|r| r.dir == cwd.join("runs/exp")));
    }

    #[tokio::test]
    async fn test_rl_rejects_inverted_step_range() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig::default();
        let mut trainer = MockTrainer::new();
        trainer.expect_train().never();
        let pipeline = TrainingPipeline::new(&trainer, &cfg, tmp.path().to_path_buf());

        let stage = pipeline.rl_stage(false, Some(10), Some(5));
        assert!(pipeline
            .reinforcement_learning("rl", tmp.path(), &stage)
            .await
            .is_err());
    }
}
