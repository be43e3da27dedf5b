//! Scan session runner.
//!
//! Builds every service explicitly, injects them into the scan session and
//! drives it against simulated capture hardware.
//!
//! # Commands
//!
//! - `scan-app run` - Run one scan until the model is built
//! - `scan-app run --manual` - Start with the scan button instead of detection
//! - `scan-app measure` - Measure a simulated hand and place a ruler
//! - `scan-app config` - Print the effective configuration as TOML

mod config;
mod run;
mod sim;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::run::RunOptions;

/// Scan session runner.
#[derive(Parser, Debug)]
#[command(name = "scan-app", version, about = "Run a simulated scan session", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when absent.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one scan against simulated hardware
    Run {
        /// Trigger the scan manually instead of waiting for detection
        #[arg(long)]
        manual: bool,

        /// Seconds to wait for a finished model
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Simulated subject distance in meters
        #[arg(long)]
        distance: Option<f32>,
    },

    /// Measure a simulated hand and place a ruler
    Measure {
        /// Camera travel between the two ruler taps, in centimeters
        #[arg(long, default_value_t = 12.5)]
        ruler_cm: f64,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = match cli.config.as_deref() {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Run {
            manual,
            timeout_secs,
            distance,
        } => {
            run::scan(
                config,
                RunOptions {
                    manual,
                    timeout: Duration::from_secs(timeout_secs),
                    subject_distance: distance,
                },
            )
            .await
        }
        Commands::Measure { ruler_cm } => run::measure(&config, ruler_cm),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["scan-app", "--log-level", "debug", "run", "--manual"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Run { manual: true, timeout_secs: 30, .. }));
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["scan-app", "config", "--config", "scan.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("scan.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[tokio::test]
    async fn test_manual_scan_completes() {
        let options = RunOptions {
            manual: true,
            timeout: Duration::from_secs(20),
            subject_distance: None,
        };
        let mut config = AppConfig::default();
        config.session = config
            .session
            .with_countdown(1, 200)
            .with_safety_delay_ms(500);
        run::scan(config, options).await.unwrap();
    }

    #[test]
    fn test_measure_runs() {
        run::measure(&AppConfig::default(), 10.0).unwrap();
    }
}
