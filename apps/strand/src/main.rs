//! # Strand - Estimation Graph Inspector
//!
//! The main binary for the strand identity and composition core.
//!
//! ## Usage
//!
//! ```bash
//! # Identifier of a stamped variable
//! strand id --kind Position2DStamped --stamp 10.0 --device imu0
//!
//! # Registered kinds
//! strand kinds
//!
//! # Build a scenario and print graph and cost
//! strand run -f scenario.toml
//! strand --json-mode check -f scenario.toml
//! ```

use clap::Parser;
use strand::cli;
use strand::config::{LogFormat, StrandConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // The configuration selects the log format, so it is read before tracing
    // starts; a failure is reported once tracing is up.
    let config = StrandConfig::resolve(cli.config.as_deref());

    init_tracing(config.as_ref().map_or(LogFormat::Text, |c| c.log_format));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. STRAND_LOG_FORMAT=json (or the config file) enables
/// machine-parseable output.
fn init_tracing(configured: LogFormat) {
    let log_format = match std::env::var("STRAND_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        Ok(_) => LogFormat::Text,
        Err(_) => configured,
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "strand=info,strand_core=info".into());

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the strand startup banner.
fn print_banner() {
    println!(
        r#"
  strand v{}
  identity and composition for estimation graphs
"#,
        env!("CARGO_PKG_VERSION")
    );
}
