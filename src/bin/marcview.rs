//! marcview CLI
//!
//! Render MARC files (ISO 2709, MARCXML, MARC-in-JSON or mnemonic) as plain text.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use marcview::{BatchOutput, BatchProcessor, MarcError, RecoveryMode};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// File extensions accepted without `--any-extension`.
const ACCEPTED_EXTENSIONS: &[&str] = &["mrc", "marc", "001", "dat", "txt"];

#[derive(Parser, Debug)]
#[command(name = "marcview")]
#[command(version)]
#[command(about = "Render MARC records from ISO 2709, MARCXML, MARC-in-JSON or mnemonic files")]
struct Cli {
    /// MARC files to render
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// How to treat malformed fields inside binary records
    #[arg(long, value_enum, default_value_t = Recovery::Strict)]
    recovery: Recovery,

    /// Print one JSON object per file with the rendered text and errors
    #[arg(long)]
    json: bool,

    /// Accept files regardless of extension
    #[arg(long)]
    any_extension: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Recovery {
    Strict,
    Lenient,
    Permissive,
}

impl From<Recovery> for RecoveryMode {
    fn from(recovery: Recovery) -> Self {
        match recovery {
            Recovery::Strict => RecoveryMode::Strict,
            Recovery::Lenient => RecoveryMode::Lenient,
            Recovery::Permissive => RecoveryMode::Permissive,
        }
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    #[serde(flatten)]
    output: &'a BatchOutput,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let processor = BatchProcessor::new().with_recovery_mode(cli.recovery.into());
    let mut out = BufWriter::new(io::stdout().lock());
    let mut status = RunStatus::default();

    for path in &cli.files {
        if !should_process(path, cli.any_extension) {
            tracing::warn!(file = %path.display(), "skipping file with unsupported extension");
            continue;
        }

        let output = match File::open(path) {
            Ok(file) => processor.process_reader(file),
            Err(e) => BatchOutput::fatal(None, &MarcError::SourceRead(e)),
        };
        report_errors(path, &output);
        status.record(&output);

        if cli.json {
            let report = FileReport {
                file: path.display().to_string(),
                output: &output,
            };
            serde_json::to_writer(&mut out, &report).context("Failed to write JSON report")?;
            writeln!(out).context("Failed to write to stdout")?;
        } else {
            out.write_all(output.text.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    out.flush().context("Failed to flush stdout")?;
    Ok(status.exit_code())
}

/// Files processed so far and how many of them failed outright.
#[derive(Debug, Default)]
struct RunStatus {
    processed: usize,
    failed: usize,
}

impl RunStatus {
    fn record(&mut self, output: &BatchOutput) {
        self.processed += 1;
        if output.is_fatal() {
            self.failed += 1;
        }
    }

    fn exit_code(&self) -> ExitCode {
        if self.failed > 0 {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn should_process(path: &Path, any_extension: bool) -> bool {
    any_extension || has_accepted_extension(path)
}

fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        })
}

fn report_errors(path: &Path, output: &BatchOutput) {
    for error in &output.errors {
        if error.record.is_some() {
            tracing::warn!(file = %path.display(), "{error}");
        } else {
            tracing::error!(file = %path.display(), "{error}");
        }
    }
    tracing::info!(
        file = %path.display(),
        format = ?output.format,
        rendered = output.records_rendered,
        errors = output.errors.len(),
        "processed file"
    );
}
