use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use kampus_image_cache::application::{ImageService, PressureCoordinator, PressureSettings};
use kampus_image_cache::domain::PressureSignal;
use kampus_image_cache::infrastructure::config::Command;
use kampus_image_cache::infrastructure::{AppConfig, CliArgs, StorageManager, SysinfoMemoryProbe};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::locate(args.config.as_deref())
        .wrap_err("Failed to locate config file")?;

    let mut config = storage.load().wrap_err_with(|| {
        format!("Failed to load configuration from {}", storage.config_path().display())
    })?;
    config.merge_with_args(args);
    Ok(config)
}

async fn fetch(service: &ImageService, coordinator: Arc<PressureCoordinator>, locators: &[String]) {
    let (signals, handle) = coordinator.spawn();

    for locator in locators {
        match service.load(locator).await {
            Ok(loaded) => println!(
                "{locator}: {}x{} ({}, {} bytes decoded)",
                loaded.image.width(),
                loaded.image.height(),
                loaded.source,
                loaded.cost
            ),
            Err(e) => println!("{locator}: unavailable ({e})"),
        }
    }

    if let Err(e) = signals.send(PressureSignal::EnteredBackground).await {
        warn!(error = %e, "Pressure coordinator stopped before final cleanup");
    }
    drop(signals);
    if let Err(e) = handle.await {
        warn!(error = %e, "Pressure coordinator task failed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = kampus_image_cache::VERSION, "Starting {}", kampus_image_cache::NAME);

    let service = ImageService::from_config(&config).await?;
    let coordinator = Arc::new(PressureCoordinator::new(
        service.pipeline(),
        Arc::new(SysinfoMemoryProbe::new()),
        PressureSettings::from_config(&config),
    ));

    match &args.command {
        Command::Fetch { locators } => fetch(&service, coordinator, locators).await,
        Command::Clear => {
            service.clear().await;
            println!("Cleared {}", service.disk().dir().display());
        }
        Command::Cleanup => {
            service.cleanup_if_needed().await;
            println!("{} records on disk", service.disk().len().await);
        }
        Command::Pressure { level } => {
            coordinator.apply(*level).await;
            println!(
                "Applied {level} pressure, {} records on disk",
                service.disk().len().await
            );
        }
        Command::Stats => {
            println!("memory: {}", service.stats());
            println!(
                "disk: {} records in {}",
                service.disk().len().await,
                service.disk().dir().display()
            );
        }
    }

    Ok(())
}
