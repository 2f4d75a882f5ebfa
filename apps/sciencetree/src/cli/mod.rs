//! # Science Tree CLI Module
//!
//! This module implements the CLI interface for Science Tree.
//!
//! ## Available Commands
//!
//! - `generate` - Build a tree from a Web of Science or BibTeX export
//! - `inspect` - Report what each pipeline stage keeps, without composing
//! - `summary` - Render a stored tree result as a CSV summary
//! - `server` - Start the HTTP server

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand, ValueEnum};
use sciencetree_core::{Locale, TreeError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Science Tree - citation structure of a research field
///
/// Classifies the publications of a bibliographic export into roots,
/// trunks and leaves by the weight of the citation chains around them.
#[derive(Parser, Debug)]
#[command(name = "sciencetree")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format of `generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full tree result
    Json,
    /// Summary table
    Csv,
}

/// Label language accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LocaleArg {
    En,
    Es,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::En => Locale::English,
            LocaleArg::Es => Locale::Spanish,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a tree from an export file
    Generate {
        /// Web of Science (.txt) or BibTeX (.bib) export
        #[arg(short, long)]
        file: PathBuf,

        /// Seed label stored in the result (default: file name without extension)
        #[arg(short, long)]
        seed: Option<String>,

        /// Output format
        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Label language (default: from config)
        #[arg(short, long, value_enum)]
        locale: Option<LocaleArg>,
    },

    /// Show corpus and graph statistics of an export file
    Inspect {
        /// Web of Science (.txt) or BibTeX (.bib) export
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write the CSV summary of a stored JSON result
    Summary {
        /// Tree result produced by `generate -t json`
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Server {
        /// Host to bind to (default: from config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TreeError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Generate {
            file,
            seed,
            format,
            output,
            locale,
        }) => {
            let mut options = config.tree.clone();
            if let Some(locale) = locale {
                options.locale = locale.into();
            }
            cmd_generate(
                &file,
                seed.as_deref(),
                format,
                output.as_deref(),
                &options,
                config.max_upload_bytes,
            )
        }
        Some(Commands::Inspect { file }) => {
            cmd_inspect(&file, json_mode, &config.tree, config.max_upload_bytes)
        }
        Some(Commands::Summary { input, output }) => cmd_summary(&input, output.as_deref()),
        Some(Commands::Server { host, port }) => {
            let mut config = config;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_server(config).await
        }
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    }
}
