//! # Science Tree
//!
//! The main binary of the Science Tree citation pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │            apps/sciencetree (THE BINARY)          │
//! │                                                   │
//! │      ┌─────────────┐        ┌─────────────┐       │
//! │      │    CLI      │        │  HTTP API   │       │
//! │      │   (clap)    │        │   (axum)    │       │
//! │      └──────┬──────┘        └──────┬──────┘       │
//! │             └───────────┬──────────┘              │
//! │                         ▼                         │
//! │               ┌──────────────────┐                │
//! │               │ sciencetree-core │                │
//! │               │   (THE LOGIC)    │                │
//! │               └──────────────────┘                │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Build a tree from a Web of Science export
//! sciencetree generate -f savedrecs.txt -s "graph theory" -o tree.json
//!
//! # Summarize a stored result
//! sciencetree summary -i tree.json -o tree.csv
//!
//! # Start the HTTP server
//! sciencetree server --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use sciencetree::cli::{self, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SCIENCETREE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("SCIENCETREE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sciencetree=info,tower_http=debug".into());

    // Logs go to stderr so generated trees can be piped from stdout.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && matches!(cli.command, Some(Commands::Server { .. })) {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
   ___     _                      _____
  / __| __(_)___ _ _  __ ___     |_   _| _ ___ ___
  \__ \/ _| / -_) ' \/ _/ -_)      | || '_/ -_) -_)
  |___/\__|_\___|_||_\__\___|      |_||_| \___\___|

  Science Tree v{}

  Roots • Trunks • Leaves
"#,
        env!("CARGO_PKG_VERSION")
    );
}
