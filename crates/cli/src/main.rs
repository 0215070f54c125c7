mod render;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playcheck_core::{
    check_tools, load_config, load_config_from_env, validate_config, Config, FfprobeProber,
    ScanOrchestrator, ScanSummary,
};

/// Exit code of a scan interrupted by a signal.
const EXIT_CANCELLED: i32 = 130;

/// Check a media library against the PS3 playback profile and convert what
/// does not play.
#[derive(Debug, Parser)]
#[command(name = "playcheck", version)]
struct Args {
    /// Directory to scan.
    root: PathBuf,

    /// Convert every incompatible file.
    #[arg(long)]
    convert: bool,

    /// TOML configuration file.
    #[arg(long, env = "PLAYCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of concurrent conversions.
    #[arg(long)]
    jobs: Option<usize>,

    /// Replace existing output files.
    #[arg(long)]
    overwrite: bool,

    /// Write converted files here instead of next to their source.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the summary as JSON and suppress live output.
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_json);

    match run(args).await {
        Ok(summary) if summary.cancelled => std::process::exit(EXIT_CANCELLED),
        Ok(_) => {}
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args) -> Result<ScanSummary> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_from_env().context("Failed to load configuration")?,
    };
    apply_overrides(&mut config, &args);
    validate_config(&config).context("Configuration validation failed")?;

    check_tools(&config.tools)
        .await
        .context("External tools are not available")?;

    let prober = Arc::new(FfprobeProber::new(&config.tools));
    let orchestrator = Arc::new(ScanOrchestrator::new(config, prober));

    let mut session = orchestrator
        .run_scan(&args.root, args.convert)
        .await
        .with_context(|| format!("Failed to scan {:?}", args.root))?;

    let canceller = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, cancelling scan");
            orchestrator.cancel_scan().await;
        })
    };

    let mut writer = render::EventWriter::new();
    while let Some(event) = session.next_event().await {
        if args.json {
            continue;
        }
        let stderr = std::io::stderr();
        if let Err(e) = writer.write(&mut stderr.lock(), &event) {
            warn!("Failed to write event: {}", e);
        }
    }

    let summary = session.finish().await.context("Scan did not complete")?;
    canceller.abort();
    orchestrator.shutdown().await;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &summary).context("Failed to write summary")?;
        writeln!(out)?;
    } else {
        render::write_summary(&mut out, &summary)?;
    }
    out.flush()?;

    Ok(summary)
}

/// Applies command line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(jobs) = args.jobs {
        config.supervisor.max_parallel_jobs = jobs;
    }
    if args.overwrite {
        config.encode.overwrite = true;
    }
    if let Some(dir) = &args.output_dir {
        config.encode.output_dir = Some(dir.clone());
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "playcheck",
            "/videos",
            "--convert",
            "--jobs",
            "2",
            "--output-dir",
            "/converted",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.root, PathBuf::from("/videos"));
        assert!(args.convert);
        assert_eq!(args.jobs, Some(2));
        assert!(args.json);
        assert!(!args.overwrite);
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::try_parse_from([
            "playcheck",
            "/videos",
            "--jobs",
            "3",
            "--overwrite",
            "--output-dir",
            "/converted",
        ])
        .unwrap();

        let mut config = Config::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.supervisor.max_parallel_jobs, 3);
        assert!(config.encode.overwrite);
        assert_eq!(config.encode.output_dir, Some(PathBuf::from("/converted")));
    }

    #[test]
    fn test_root_is_required() {
        assert!(Args::try_parse_from(["playcheck"]).is_err());
    }
}
