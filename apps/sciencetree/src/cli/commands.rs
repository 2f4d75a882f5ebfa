//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::OutputFormat;
use crate::api;
use crate::config::AppConfig;
use sciencetree_core::{
    CorpusReport, SourceFormat, TreeError, TreeOptions, export, generate_tree_with, inspect,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Maximum size of a stored tree result read by `summary` (500 MB).
const MAX_RESULT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Reject files larger than `max_size` before reading them.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TreeError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TreeError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TreeError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, TreeError> {
    let canonical = path.canonicalize().map_err(|e| {
        TreeError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TreeError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must already exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, TreeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TreeError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(TreeError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| TreeError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read an export file, checking its extension and the upload limit.
fn read_export(path: &Path, max_size: usize) -> Result<(SourceFormat, Vec<u8>), TreeError> {
    let format = SourceFormat::from_path(path)?;
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, u64::try_from(max_size).unwrap_or(u64::MAX))?;
    let bytes = std::fs::read(&validated)
        .map_err(|e| TreeError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    Ok((format, bytes))
}

/// Write `data` to `output`, or to stdout when no output is given.
fn write_output(output: Option<&Path>, data: &str) -> Result<(), TreeError> {
    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, data)
                .map_err(|e| TreeError::Io(format!("Write file: {}", e)))?;
            eprintln!("Wrote {} bytes to {:?}", data.len(), validated);
        }
        None => println!("{}", data),
    }
    Ok(())
}

// =============================================================================
// GENERATE COMMAND
// =============================================================================

/// Generate a tree from an export file.
///
/// The seed defaults to the file stem.
pub fn cmd_generate(
    file: &Path,
    seed: Option<&str>,
    format: OutputFormat,
    output: Option<&Path>,
    options: &TreeOptions,
    max_upload_bytes: usize,
) -> Result<(), TreeError> {
    let (source_format, bytes) = read_export(file, max_upload_bytes)?;
    let seed = match seed {
        Some(seed) => seed.to_string(),
        None => file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let result = generate_tree_with(&seed, &bytes, source_format, options)?;
    tracing::info!(
        seed = %seed,
        nodes = result.metadata.node_count,
        links = result.metadata.link_count,
        "Tree generated"
    );

    let data = match format {
        OutputFormat::Json => export::to_json(&result)?,
        OutputFormat::Csv => export::to_csv(&result),
    };
    write_output(output, &data)
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Print corpus and graph statistics of an export file.
pub fn cmd_inspect(
    file: &Path,
    json_mode: bool,
    options: &TreeOptions,
    max_upload_bytes: usize,
) -> Result<(), TreeError> {
    let (format, bytes) = read_export(file, max_upload_bytes)?;
    let report = inspect(&bytes, format, options)?;

    if json_mode {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| TreeError::Serialization(e.to_string()))?;
        println!("{}", json);
    } else {
        print_report(file, &report);
    }
    Ok(())
}

fn print_report(file: &Path, report: &CorpusReport) {
    println!("File: {:?}", file);
    println!("Format:              {}", report.format);
    println!("Records:             {}", report.records);
    println!("Duplicates dropped:  {}", report.duplicates_dropped);
    println!("References:          {}", report.references);
    println!("Citations resolved:  {}", report.citations);
    println!("Dangling references: {}", report.dangling_references);
    println!("Reduced vertices:    {}", report.reduced_vertices);
    println!("Reduced edges:       {}", report.reduced_edges);
    println!("Classified nodes:    {}", report.classified);
}

// =============================================================================
// SUMMARY COMMAND
// =============================================================================

/// Render a stored JSON result as a CSV summary.
pub fn cmd_summary(input: &Path, output: Option<&Path>) -> Result<(), TreeError> {
    let validated = validate_file_path(input)?;
    validate_file_size(&validated, MAX_RESULT_FILE_SIZE)?;

    let json = std::fs::read_to_string(&validated)
        .map_err(|e| TreeError::Io(format!("Cannot read '{}': {}", input.display(), e)))?;
    let result = export::from_json(&json)?;

    write_output(output, &export::to_csv(&result))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: AppConfig) -> Result<(), TreeError> {
    println!("Science Tree Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:        {}", config.host);
    println!("  Port:        {}", config.port);
    println!("  Rate limit:  {} req/s", config.rate_limit);
    println!("  Max upload:  {} bytes", config.max_upload_bytes);
    println!();
    println!("Endpoints:");
    println!("  POST /trees       - Generate a tree");
    println!("  POST /export/json - Download a result as JSON");
    println!("  POST /export/csv  - Download a result summary as CSV");
    println!("  GET  /health      - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.host, config.port);
    api::run_server(&addr, config).await
}
