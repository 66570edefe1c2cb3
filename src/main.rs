mod gateway;
mod i18n;

use clap::{Parser, Subcommand};
use goalbuddy_channels::telegram::TelegramChannel;
use goalbuddy_core::{
    config::{self, Config, LoggingConfig, SheetsBackend},
    session::MemoryStateStore,
    traits::{Channel, StateStore},
};
use goalbuddy_sheets::{
    google::{prepare_credentials, ServiceAccountAuth, ServiceAccountKey},
    GoogleSheets, MemorySheet, RetryPolicy, SheetBackend, Store,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "goalbuddy",
    version,
    about = "GoalBuddy: a Telegram goal-setting bot with day-2 reminders"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show the effective configuration and whether it is complete.
    Status,
    /// Print a service-account key as one-line JSON for GOOGLE_CREDENTIALS.
    PrepareCredentials {
        /// Key file (defaults to the configured credentials path).
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _log_guard = init_logging(&cfg.logging)?;
            run(cfg).await?;
        }
        Commands::Status => {
            println!("{}\n", cfg.display());
            match cfg.validate() {
                Ok(()) => println!("Configuration OK."),
                Err(errors) => {
                    println!("Configuration incomplete:");
                    for e in &errors {
                        println!("  - {e}");
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::PrepareCredentials { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(&cfg.sheets.credentials_path));
            let compact = prepare_credentials(&path)?;
            eprintln!("Set this as GOOGLE_CREDENTIALS:");
            println!("{compact}");
        }
    }

    Ok(())
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    if let Err(errors) = cfg.validate() {
        anyhow::bail!(
            "invalid configuration:\n  - {}",
            errors.join("\n  - ")
        );
    }
    info!("{}", cfg.display());

    let zone = cfg.scheduler.zone()?;
    let backend = build_backend(&cfg)?;
    let store = Arc::new(Store::new(
        backend,
        cfg.sheets.layout,
        zone,
        RetryPolicy::from_config(&cfg.sheets),
    ));
    store.prepare().await?;
    info!("connected to spreadsheet storage");

    let sessions: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    let (scheduler, reminders) = gateway::ReminderScheduler::new(256);
    let delay = cfg.scheduler.reminder_delay();

    match gateway::recover(
        &store,
        &scheduler,
        sessions.as_ref(),
        delay,
        cfg.scheduler.overdue,
        chrono::Utc::now(),
    )
    .await
    {
        Ok(report) => info!("restored {} pending reminders", report.rescheduled + report.fired),
        Err(e) => warn!("failed to restore pending reminders: {e}"),
    }

    let controller = Arc::new(gateway::Controller::new(
        store,
        sessions,
        scheduler.clone(),
        delay,
        cfg.bot.language.clone(),
    ));
    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(cfg.telegram.clone()));

    println!("GoalBuddy: starting bot...");
    let gw = Arc::new(gateway::Gateway::new(
        channel,
        controller,
        scheduler,
        cfg.bot.language.clone(),
    ));
    gw.run(reminders).await
}

fn build_backend(cfg: &Config) -> anyhow::Result<Arc<dyn SheetBackend>> {
    match cfg.sheets.backend {
        SheetsBackend::Google => {
            let key = ServiceAccountKey::from_config(&cfg.sheets)?;
            let auth = ServiceAccountAuth::new(key)?;
            Ok(Arc::new(GoogleSheets::new(
                cfg.sheets.spreadsheet_id.clone(),
                cfg.sheets.worksheet.clone(),
                Arc::new(auth),
            )))
        }
        SheetsBackend::Memory => {
            warn!("using in-memory storage: data is lost on exit");
            Ok(Arc::new(MemorySheet::new()))
        }
    }
}

/// Console logging always; a non-rolling log file when configured.
/// `RUST_LOG` overrides the configured level.
fn init_logging(
    cfg: &LoggingConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    let Some(file) = cfg.file.as_deref() else {
        registry.init();
        return Ok(None);
    };

    let path = Path::new(file);
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("LOG_FILE '{file}' has no file name"))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, name));
    registry
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(Some(guard))
}
