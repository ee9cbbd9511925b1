use clap::Parser;
use protac_reinvent::cli::Cli;
use protac_reinvent::domain::RunMode;
use protac_reinvent::error::Result;
use tracing::error;

mod main_dispatch;
mod main_runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = match cli.run_mode() {
        Ok(mode) => mode,
        Err(e) => {
            main_runtime::init_logging_simple();
            return Err(e);
        }
    };

    let config = match main_dispatch::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            main_runtime::init_logging_simple();
            return Err(e);
        }
    };

    if mode == RunMode::Board {
        main_runtime::init_logging_simple();
    } else {
        main_runtime::init_logging(&config.logging);
    }

    if let Err(e) = main_dispatch::run(&cli, mode, &config).await {
        error!("{} run failed: {}", mode, e);
        return Err(e);
    }
    Ok(())
}
