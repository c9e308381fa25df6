//! Command runner - executes a manifest over a device session.
//!
//! Commands run strictly in manifest order, one at a time, over the same
//! session. A failed command is recorded and the run moves on; only the
//! caller decides what is fatal.

pub mod manifest;
pub mod record;

use crate::output;
use crate::session::{CommandOutput, CommandSession};
use crate::utils::errors::Result;
use chrono::Local;
use manifest::{Manifest, ManifestEntry};
use record::{ExecutionLog, ExecutionRecord, LogHeader, Outcome, SUMMARY_FILE_NAME};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Aggregate result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub records: Vec<ExecutionRecord>,
    pub successful: usize,
    pub total: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn new(records: Vec<ExecutionRecord>, elapsed: Duration) -> Self {
        let successful = records.iter().filter(|r| r.is_success()).count();
        let total = records.len();
        Self {
            records,
            successful,
            total,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn failed(&self) -> usize {
        self.total - self.successful
    }

    /// Write the summary as pretty JSON into `dir`.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SUMMARY_FILE_NAME);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }
}

/// Runs every manifest entry and persists its output.
pub struct CommandRunner {
    output_dir: PathBuf,
    log: ExecutionLog,
}

impl CommandRunner {
    pub fn new(output_dir: impl Into<PathBuf>, log: ExecutionLog) -> Self {
        Self {
            output_dir: output_dir.into(),
            log,
        }
    }

    /// Execute the whole manifest. Never aborts on a single entry's failure.
    pub fn run<S>(&self, session: &mut S, manifest: &Manifest) -> RunSummary
    where
        S: CommandSession + ?Sized,
    {
        let start = Instant::now();
        let mut records = Vec::with_capacity(manifest.len());

        for entry in manifest {
            records.push(self.run_entry(session, entry));
        }

        let summary = RunSummary::new(records, start.elapsed());

        info!(
            "Completed {} of {} commands successfully in {}s",
            summary.successful,
            summary.total,
            record::format_seconds(summary.elapsed())
        );

        let lines = [
            format!(
                "Completed {} of {} commands successfully.",
                summary.successful, summary.total
            ),
            format!(
                "Total execution time: {} seconds",
                record::format_seconds(summary.elapsed())
            ),
        ];
        if let Err(e) = self.log.append(&lines) {
            warn!("Failed to write run summary to execution log: {}", e);
        }

        if let Err(e) = summary.write_json(&self.output_dir) {
            warn!("Failed to write {}: {}", SUMMARY_FILE_NAME, e);
        }

        summary
    }

    fn run_entry<S>(&self, session: &mut S, entry: &ManifestEntry) -> ExecutionRecord
    where
        S: CommandSession + ?Sized,
    {
        let started_at = Local::now();
        let start = Instant::now();

        info!(output = %entry.output_name, command = %entry.command, "Executing command");
        if let Err(e) = self.log.command_started(entry, started_at) {
            warn!("Failed to write execution log: {}", e);
        }

        let output_path = self.output_dir.join(&entry.output_name);
        let outcome = match session.exec(&entry.command) {
            Ok(output) => self.persist(&output_path, output),
            Err(e) => Outcome::Failure {
                error: e.to_string(),
            },
        };

        let record = ExecutionRecord {
            output_name: entry.output_name.clone(),
            command: entry.command.clone(),
            started_at,
            finished_at: Local::now(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            outcome,
        };

        match &record.outcome {
            Outcome::Success { bytes } => info!(
                output = %record.output_name,
                bytes,
                "Output saved in {}s",
                record::format_seconds(record.elapsed())
            ),
            Outcome::Failure { error } => error!(
                output = %record.output_name,
                "Command failed after {}s: {}",
                record::format_seconds(record.elapsed()),
                error
            ),
        }

        if let Err(e) = self.log.command_finished(&record, &output_path) {
            warn!("Failed to write execution log: {}", e);
        }

        record
    }

    fn persist(&self, path: &Path, output: CommandOutput) -> Outcome {
        if !output.success() {
            let stderr = output.stderr.trim();
            let error = if stderr.is_empty() {
                format!("exit status {}", output.exit_status)
            } else {
                format!("exit status {}: {}", output.exit_status, stderr)
            };
            return Outcome::Failure { error };
        }

        if output.is_blank() {
            let stderr = output.stderr.trim();
            let error = if stderr.is_empty() {
                "empty response".to_string()
            } else {
                format!("empty response: {}", stderr)
            };
            return Outcome::Failure { error };
        }

        match std::fs::write(path, &output.stdout) {
            Ok(()) => Outcome::Success {
                bytes: output.stdout.len(),
            },
            Err(e) => Outcome::Failure {
                error: format!("cannot write {}: {}", path.display(), e),
            },
        }
    }
}

/// Everything a finished collection leaves behind.
#[derive(Debug)]
pub struct Collection {
    pub output_dir: PathBuf,
    pub log: ExecutionLog,
    pub summary: RunSummary,
}

/// Open a session, create the run directory and execute the manifest.
///
/// The directory is only created once `connect` has succeeded, so an
/// unreachable device leaves nothing under `output_root`.
pub fn collect<S, F>(
    connect: F,
    manifest: &Manifest,
    output_root: &Path,
    hostname: &str,
    header: &LogHeader,
) -> Result<Collection>
where
    S: CommandSession,
    F: FnOnce() -> Result<S>,
{
    let mut session = connect()?;

    let output_dir = output::create_output_dir(output_root, hostname, &header.started_at)?;
    let log = ExecutionLog::create(&output_dir, header)?;

    let summary = CommandRunner::new(&output_dir, log.clone()).run(&mut session, manifest);

    Ok(Collection {
        output_dir,
        log,
        summary,
    })
}
