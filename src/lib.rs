pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ShowCommands};
pub use config::Config;
use scheduler::Scheduler;
use services::{CycleRunner, QBitCompletionSource};
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        return cli::cmd_init();
    }

    let (config, config_path) = Config::load()?;
    config.validate()?;

    init_metrics(&config)?;
    init_tracing(&config)?;

    let Some(command) = cli.command else {
        return run_daemon(config, config_path).await;
    };

    match command {
        Commands::Daemon => run_daemon(config, config_path).await,

        Commands::Check => {
            let state = SharedState::new(config, config_path).await?;
            cli::cmd_check(&state).await
        }

        Commands::Shows { command } => {
            let state = SharedState::new(config, config_path).await?;
            match command {
                ShowCommands::List => cli::cmd_list_shows(&state).await,
                ShowCommands::Removed => cli::cmd_list_removed(&state).await,
                ShowCommands::Add {
                    names,
                    copy_to,
                    tracker,
                } => cli::cmd_add_shows(&state, &names, copy_to, tracker).await,
                ShowCommands::Remove { names } => cli::cmd_remove_shows(&state, &names).await,
                ShowCommands::Restore { name } => cli::cmd_restore_show(&state, &name).await,
            }
        }

        Commands::History { show, limit } => {
            let state = SharedState::new(config, config_path).await?;
            cli::cmd_history(&state, show.as_deref(), limit).await
        }

        Commands::Complete {
            release_name,
            download_dir,
        } => {
            let state = SharedState::new(config, config_path).await?;
            cli::cmd_complete(&state, &release_name, download_dir).await
        }

        Commands::Init => cli::cmd_init(),
    }
}

fn init_metrics(config: &Config) -> anyhow::Result<()> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }

    use metrics_exporter_prometheus::PrometheusBuilder;

    match config.observability.metrics_port {
        Some(port) => {
            PrometheusBuilder::new()
                .with_http_listener(([0, 0, 0, 0], port))
                .install()
                .context("Failed to install Prometheus exporter")?;
        }
        None => {
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?;
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let json_layer = config
        .general
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!config.general.log_json).then(|| tracing_subscriber::fmt::layer());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder
            .extra_field("version", env!("CARGO_PKG_VERSION"))?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_daemon(config: Config, config_path: PathBuf) -> anyhow::Result<()> {
    info!(
        "showfeed v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = SharedState::new(config, config_path).await?;
    state.store.ping().await?;

    if let Some(client) = &state.qbit {
        if client.is_available().await {
            let category = state.config.qbittorrent.category.trim();
            if !category.is_empty()
                && let Err(e) = client.create_category(category).await
            {
                warn!("Failed to ensure qBittorrent category '{}': {}", category, e);
            }
        } else {
            warn!("qBittorrent is not reachable; downloads will fail until it is");
        }
    }

    let runner: Arc<dyn CycleRunner> = Arc::new(state.cycle.clone());
    let scheduler = Arc::new(Scheduler::new(runner, state.config.scheduler.clone()));

    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    let completion_handle = match &state.qbit {
        Some(client) if state.config.qbittorrent.watch_completed => {
            let source = QBitCompletionSource::new(
                Arc::clone(client),
                &state.config.qbittorrent.category,
            );
            let completion = Arc::clone(&state.completion);
            let every = Duration::from_secs(state.config.qbittorrent.completion_poll_seconds.max(1));
            info!(
                "Watching qBittorrent for completed transfers every {}s",
                every.as_secs()
            );
            Some(tokio::spawn(async move {
                completion.watch(&source, every).await;
            }))
        }
        _ => None,
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop();
    scheduler_handle.abort();
    if let Some(handle) = completion_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}
