//! # competency
//!
//! Command-line binary for the competency assessment and gap-analysis engine.
//!
//! ## Usage
//!
//! ```bash
//! # Workspace counts
//! competency --data team.json status
//!
//! # Reports
//! competency progress --user 1 --matrix 1
//! competency gaps --user 1 --matrix 1 --json-mode
//! competency compare --position 10 --users 1,2,3
//! competency program --user 1 --program 1
//! competency history --user 1 --competency TECH-SQL-001 --limit 5
//!
//! # Freeze a dataset into a binary snapshot
//! competency snapshot --output team.cmpt
//! ```

use clap::Parser;
use competency::cli::{self, Cli};
use competency::config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    // Config is resolved before logging so the file can pick the log format;
    // a config error is reported once logging is up.
    let config = Config::load(cli.config.as_deref())
        .map(|c| c.with_process_env().with_cli(cli.data.clone()));
    let log_format = match &config {
        Ok(config) => config.logging.format,
        Err(_) => Config::default().with_process_env().logging.format,
    };
    init_tracing(log_format, cli.verbose, cli.quiet);

    let result = config.and_then(|config| cli::execute(cli, &config));
    if let Err(e) = result {
        tracing::error!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize tracing. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(format: LogFormat, verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "competency=debug,competency_core=debug"
    } else if quiet {
        "competency=warn,competency_core=warn"
    } else {
        "competency=info,competency_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so JSON output on stdout stays parseable.
    match format {
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
