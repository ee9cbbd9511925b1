use protac_reinvent::config::LoggingConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default log folder. Kept out of the runs folder so the daily appender never
/// makes it the newest "run".
const DEFAULT_LOG_DIR: &str = "logs";

fn resolve_log_dir(cfg: &LoggingConfig) -> PathBuf {
    // Prefer PROTAC_LOG_DIR, then LOG_DIR, then the config value.
    std::env::var("PROTAC_LOG_DIR")
        .or_else(|_| std::env::var("LOG_DIR"))
        .map(PathBuf::from)
        .ok()
        .or_else(|| cfg.dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}

pub fn init_logging(cfg: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},protac_reinvent=debug", cfg.level))
    });

    let log_dir = resolve_log_dir(cfg);

    // `tracing_appender::rolling::daily` panics if it can't create the initial
    // log file, so preflight writability first.
    let file_layer = if std::fs::create_dir_all(&log_dir).is_ok() {
        let test_path = log_dir.join(".protac_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(&log_dir, "protac-reinvent.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the whole process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir.display(),
                    e
                );
                None
            }
        }
    } else {
        eprintln!(
            "Warning: Could not create log directory {}, file logging disabled",
            log_dir.display()
        );
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if file_logging_enabled {
        eprintln!("Logging to: {}/protac-reinvent.log", log_dir.display());
    }
}

pub fn init_logging_simple() {
    // Minimal logging for the board launcher and early failures
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
