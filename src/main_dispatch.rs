use protac_reinvent::adapters::{standardizer, HubClient, ReinventCli};
use protac_reinvent::cli::Cli;
use protac_reinvent::config::AppConfig;
use protac_reinvent::data::DataPrep;
use protac_reinvent::domain::{RunLayout, RunMode, Stage};
use protac_reinvent::error::{PipelineError, Result};
use protac_reinvent::persistence::RunManifest;
use protac_reinvent::services::board;
use protac_reinvent::training::TrainingPipeline;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub(crate) fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_file(path)?,
        None => AppConfig::load()?,
    };
    config.validate().map_err(PipelineError::InvalidConfig)?;
    Ok(config)
}

pub(crate) async fn run(cli: &Cli, mode: RunMode, config: &AppConfig) -> Result<()> {
    let cwd = std::env::current_dir()?;

    match mode {
        RunMode::Data => run_data(cli, config, &cwd).await,
        RunMode::Board => run_board(cli, config, &cwd).await,
        RunMode::Tl => run_tl(cli, config, &cwd).await,
        RunMode::Rl => run_rl(cli, config, &cwd, false).await,
        RunMode::RlS2 => run_rl(cli, config, &cwd, true).await,
        RunMode::Both => run_both(cli, config, &cwd).await,
    }
}

async fn run_data(cli: &Cli, config: &AppConfig, cwd: &Path) -> Result<()> {
    let base_path = cwd.join(cli.data_folder.as_ref().unwrap_or(&config.paths.data_folder));

    let source = HubClient::from_config(&config.datasets)?;
    let smiles_standardizer = standardizer::from_config(&config.standardizer);
    info!("Standardizing with {}", smiles_standardizer.name());

    let summary = DataPrep::new(
        &source,
        smiles_standardizer.as_ref(),
        &config.datasets,
        config.standardizer.batch_size,
    )
    .run(&base_path)
    .await?;

    println!(
        "TACK: {} train / {} validation ({} of {} molecules kept)",
        summary.tack_train.molecules,
        summary.tack_validation.molecules,
        summary.tack_report.kept,
        summary.tack_report.input
    );
    for (report, split) in &summary.synthetic {
        println!(
            "{}: {} molecules ({} of {} kept)",
            split.path.display(),
            split.molecules,
            report.kept,
            report.input
        );
    }
    Ok(())
}

async fn run_board(cli: &Cli, config: &AppConfig, cwd: &Path) -> Result<()> {
    let logdir = match &cli.folder {
        Some(folder) => folder.clone(),
        None => board::latest_run_dir(&cwd.join(&config.paths.runs_root))?,
    };
    match RunManifest::read(&logdir) {
        Ok(manifest) => println!(
            "Run '{}' ({} mode, stages {}) started {}",
            manifest.wd,
            manifest.mode,
            manifest.stages.join(", "),
            manifest.started_at.to_rfc3339()
        ),
        Err(e) => debug!("No run manifest in {}: {}", logdir.display(), e),
    }
    println!("Launching TensorBoard with logdir: {}", logdir.display());
    board::launch(&config.board, &logdir).await
}

fn prepare_run(cli: &Cli, config: &AppConfig, cwd: &Path) -> Result<(RunLayout, PathBuf)> {
    let layout = RunLayout::prepare(cwd, &config.paths.runs_root, &cli.wd)?;
    info!("Working directory: {}", layout.wd.display());

    let data_folder = cwd.join(cli.data_folder.as_ref().unwrap_or(&config.paths.data_folder));
    Ok((layout, data_folder))
}

async fn run_tl(cli: &Cli, config: &AppConfig, cwd: &Path) -> Result<()> {
    let data_type = cli.data_type()?;
    let (layout, data_folder) = prepare_run(cli, config, cwd)?;
    RunManifest::new(RunMode::Tl, &cli.wd, Some(data_type), vec!["TL".to_string()])
        .write(&layout.wd)?;

    let trainer = ReinventCli::new(config.reinvent.executable.clone());
    let pipeline = TrainingPipeline::new(&trainer, config, data_folder);
    let stage = pipeline.tl_stage(data_type, cli.num_epochs);
    let model = pipeline.transfer_learning("TL", &layout.wd, &stage).await?;

    println!("Transfer learning finished: {}", model.display());
    Ok(())
}

async fn run_rl(cli: &Cli, config: &AppConfig, cwd: &Path, stage_2: bool) -> Result<()> {
    let (mode, name) = if stage_2 {
        (RunMode::RlS2, "RL_S2")
    } else {
        (RunMode::Rl, "RL")
    };
    let (layout, data_folder) = prepare_run(cli, config, cwd)?;
    RunManifest::new(mode, &cli.wd, None, vec![name.to_string()]).write(&layout.wd)?;

    let trainer = ReinventCli::new(config.reinvent.executable.clone());
    let pipeline = TrainingPipeline::new(&trainer, config, data_folder);
    let stage = pipeline.rl_stage(stage_2, cli.min_steps, cli.max_steps);
    let checkpoint = pipeline
        .reinforcement_learning(name, &layout.wd, &stage)
        .await?;

    println!("Reinforcement learning finished: {}", checkpoint.display());
    Ok(())
}

async fn run_both(cli: &Cli, config: &AppConfig, cwd: &Path) -> Result<()> {
    let (layout, data_folder) = prepare_run(cli, config, cwd)?;
    let stages = Stage::ALL.iter().map(|s| s.dir_name().to_string()).collect();
    RunManifest::new(RunMode::Both, &cli.wd, None, stages).write(&layout.wd)?;

    let trainer = ReinventCli::new(config.reinvent.executable.clone());
    let pipeline = TrainingPipeline::new(&trainer, config, data_folder);
    let outcome = pipeline.run_staged(&layout).await?;

    println!(
        "Staged training finished: {}",
        outcome.stage_4_checkpoint.display()
    );
    Ok(())
}
