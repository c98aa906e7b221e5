// Dynasty analyzer entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file; stdout carries JSON output)
// 3. Load config
// 4. Build the Sleeper client and the KTC scraper
// 5. Wire them into the Analyzer
// 6. Run the command

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use dynasty_app::cli::Cli;
use dynasty_app::commands::{self, Outcome};
use dynasty_core::analyzer::AnalyzerOptions;
use dynasty_core::clock::SystemClock;
use dynasty_core::config;
use dynasty_core::Analyzer;
use dynasty_ktc::KtcScraper;
use dynasty_sleeper::SleeperClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse arguments
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing()?;
    info!(command = ?cli.command, "dynasty starting");

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: sleeper={}, ktc pages={}, {} extra aliases",
        config.sources.sleeper.base_url,
        config.sources.ktc.pages,
        config.aliases.len()
    );

    // 4. Collaborators
    let sleeper = SleeperClient::from_config(&config.sources.sleeper)
        .context("failed to build Sleeper client")?;
    let ktc = KtcScraper::from_config(&config.sources.ktc)
        .context("failed to build KeepTradeCut scraper")?;

    // 5. Analyzer
    let analyzer = Analyzer::new(
        sleeper,
        ktc,
        Arc::new(SystemClock),
        AnalyzerOptions::from_config(&config.analyzer, &config.aliases),
    );

    // 6. Run; output is buffered so a failed command prints nothing partial.
    let mut buf = Vec::new();
    let outcome = match commands::run(&analyzer, cli.command, &mut buf).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Command failed: {e:#}");
            return Err(e);
        }
    };
    std::io::stdout()
        .write_all(&buf)
        .context("failed to write output")?;

    info!(?outcome, "dynasty finished");
    if outcome == Outcome::NotFound {
        std::process::exit(2);
    }
    Ok(())
}

/// Initialize tracing to log to a file, keeping stdout for command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("dynasty.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dynasty=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
