mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use loadprobe_core::config::{
    read_configuration, write_configuration, LoadSettings, StressSettings, TestConfiguration,
};
use loadprobe_core::engine::{spawn_test, EngineEvent};
use loadprobe_core::http::{RequestExecutor, ReqwestTransport, TransportSettings};
use loadprobe_core::results::export::{export_csv, export_json, render_text};
use loadprobe_core::results::io::{read_run, write_run};
use loadprobe_core::TestRun;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let run = match &cli.command {
        Commands::Report { run } => read_run(run)
            .await
            .with_context(|| format!("failed to read run from {}", run.display()))?,
        command => {
            let config = build_configuration(command).await?;
            execute(&cli, config).await?
        }
    };

    write_report(&run, cli.format, cli.output.as_deref()).await
}

/// Logs go to stderr so stdout stays clean for reports.
fn init_tracing(log_level: Option<&str>) {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{level}', falling back to 'info'");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    debug!("tracing initialized");
}

async fn build_configuration(command: &Commands) -> Result<TestConfiguration> {
    let (config, save_to) = match command {
        Commands::Load {
            url,
            group_size,
            group_count,
            delay_ms,
            save_config,
        } => {
            let settings = LoadSettings::new(*group_size, *group_count)
                .with_delay(Duration::from_millis(*delay_ms));
            (TestConfiguration::load(url.as_str(), settings), save_config.as_deref())
        }
        Commands::Stress {
            url,
            initial_group_size,
            increment,
            delay_ms,
            failure_threshold,
            max_rounds,
            save_config,
        } => {
            let mut settings = StressSettings::new(*initial_group_size, *increment)
                .with_delay(Duration::from_millis(*delay_ms));
            if let Some(threshold) = failure_threshold {
                settings = settings.with_failure_threshold(*threshold);
            }
            if let Some(max) = max_rounds {
                settings = settings.with_max_rounds(*max);
            }
            (TestConfiguration::stress(url.as_str(), settings), save_config.as_deref())
        }
        Commands::Run { config } => {
            let loaded = read_configuration(config).await.with_context(|| {
                format!("failed to read configuration from {}", config.display())
            })?;
            (loaded, None)
        }
        Commands::Report { .. } => anyhow::bail!("report does not run a test"),
    };

    if let Some(path) = save_to {
        write_configuration(&config, path)
            .await
            .with_context(|| format!("failed to save configuration to {}", path.display()))?;
        info!(path = %path.display(), "configuration saved");
    }
    Ok(config)
}

async fn execute(cli: &Cli, config: TestConfiguration) -> Result<TestRun> {
    let timeout = Duration::from_secs(cli.timeout_secs);
    let transport = ReqwestTransport::new(
        TransportSettings::new()
            .timeout(timeout)
            .danger_accept_invalid_certs(cli.insecure),
    )
    .context("failed to build HTTP client")?;

    info!(mode = config.mode_name(), url = %config.target_url, "starting");

    let (tx, mut rx) = mpsc::channel(64);
    let handle = spawn_test(config, transport, RequestExecutor::new(timeout)?, Some(tx))?;
    let stopper = handle.stop_handle();

    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_progress(&event);
        }
    });

    let wait = handle.wait();
    tokio::pin!(wait);
    let mut interrupted = false;
    let result = loop {
        tokio::select! {
            result = &mut wait => break result,
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = signal {
                    warn!(error = %e, "could not listen for Ctrl-C");
                    continue;
                }
                warn!("interrupted, stopping after the current round");
                stopper.stop().await;
            }
        }
    };

    let _ = progress.await;
    debug!(status = %stopper.status().await, "engine finished");
    Ok(result?)
}

fn log_progress(event: &EngineEvent) {
    match event {
        EngineEvent::RoundStarted {
            round_index,
            concurrency,
        } => info!("round {round_index}: sending {concurrency} requests"),
        EngineEvent::RoundCompleted { result } => info!(
            "round {}: {}/{} succeeded ({:.1}%), mean {:.3}s, p95 {:.3}s",
            result.round_index,
            result.success_count,
            result.requested_count,
            result.success_rate * 100.0,
            result.mean_duration,
            result.percentile(95.0),
        ),
        EngineEvent::Finished { termination } => info!("finished: {termination}"),
    }
}

async fn write_report(run: &TestRun, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    if let (OutputFormat::Json, Some(path)) = (format, output) {
        write_run(run, path)
            .await
            .with_context(|| format!("failed to write run to {}", path.display()))?;
        info!(path = %path.display(), "run written");
        return Ok(());
    }

    let report = match format {
        OutputFormat::Text => render_text(run),
        OutputFormat::Json => export_json(run)?,
        OutputFormat::Csv => export_csv(run)?,
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, report)
                .await
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{report}"),
    }
    Ok(())
}
