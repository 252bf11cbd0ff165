//! glesys-ddns - keeps GleSYS A records pointed at this host.

use clap::Parser;
use glesys_ddns::config::Config;
use glesys_ddns::logging::LogConfig;
use glesys_ddns::scheduler::Scheduler;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glesys-ddns")]
#[command(about = "Keeps GleSYS DNS A records pointed at this host's current IP")]
#[command(version)]
struct Cli {
    /// Path to config file (YAML, or TOML with a .toml extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single update pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    LogConfig::new(config.verbose).init();

    tracing::info!("Starting glesys-ddns {}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    let scheduler = Scheduler::from_config(&config)?;

    tracing::info!(
        "Watching {} record(s) in {} domain(s), interval {}s",
        scheduler.desired().host_count(),
        scheduler.desired().domains().len(),
        config.interval_secs
    );

    if cli.once {
        let report = scheduler.run_once().await?;
        if !report.is_clean() {
            tracing::warn!(
                "{} record(s) missing, {} call(s) failed",
                report.missing.len(),
                report.failures.len()
            );
        }
        return Ok(());
    }

    scheduler.run().await?;
    Ok(())
}
