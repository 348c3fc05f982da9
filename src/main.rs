use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use swarm_constraint::cli::{format_dry_run, Args, LogFormat};
use swarm_constraint::cluster::{spawn_poll_loop, PollLoop};
use swarm_constraint::config::{load_config_file, Settings};
use swarm_constraint::directory::{DockerDirectory, DryRunDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    // Load the optional config file and resolve settings
    let file = match &args.config {
        Some(path) => Some(
            load_config_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
        ),
        None => None,
    };

    let settings =
        Arc::new(Settings::resolve(args.to_partial(), file).context("Invalid configuration")?);

    let directory =
        DockerDirectory::from_host_str(&args.docker_host, Duration::from_secs(args.timeout))
            .with_context(|| format!("Failed to create Docker client for {}", args.docker_host))?;

    // Dry-run mode: evaluate one cycle without writing and exit
    if args.dry_run {
        let directory = Arc::new(DryRunDirectory::new(directory));
        let poll = PollLoop::new(Arc::clone(&directory), Arc::clone(&settings));
        let report = poll.run_cycle().await;
        println!("{}", format_dry_run(&settings, &report, &directory.planned()));
        if let Some(error) = report.error {
            bail!("Dry run could not list nodes: {}", error);
        }
        return Ok(());
    }

    info!("Starting swarm-constraint against {}", args.docker_host);

    let (shutdown_tx, handle) = spawn_poll_loop(Arc::new(directory), settings);

    shutdown_signal().await;
    info!("Shutdown requested, finishing current cycle");
    let _ = shutdown_tx.send(true);

    if let Err(e) = handle.await {
        warn!("Poll loop ended abnormally: {}", e);
    }
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM (what `docker stop` sends)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
