//! Execution records and the plain-text execution log.
//!
//! The log is append-only: a header when the run starts, one block per
//! manifest entry in execution order, then summary lines. Each block opens
//! with a single `Started executing command for ...` line.

use crate::executor::manifest::ManifestEntry;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LOG_FILE_NAME: &str = "execution_log.txt";
pub const SUMMARY_FILE_NAME: &str = "execution_summary.json";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { bytes: usize },
    Failure { error: String },
}

/// Immutable record of one manifest entry's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub output_name: String,
    pub command: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed_ms: u64,
    pub outcome: Outcome,
}

impl ExecutionRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Run-level facts written at the top of the log.
#[derive(Debug, Clone)]
pub struct LogHeader {
    pub started_at: DateTime<Local>,
    pub upload_url: Option<String>,
    pub insecure: bool,
    pub device: String,
    pub username: String,
}

/// Append-only execution log file.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    path: PathBuf,
}

impl ExecutionLog {
    /// Create (or truncate) the log inside `dir` and write the header.
    pub fn create(dir: &Path, header: &LogHeader) -> std::io::Result<Self> {
        let path = dir.join(LOG_FILE_NAME);
        std::fs::write(&path, header_lines(header).join("\n") + "\n")?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append lines, each terminated by a newline.
    pub fn append<S: AsRef<str>>(&self, lines: &[S]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        for line in lines {
            writeln!(file, "{}", line.as_ref())?;
        }
        Ok(())
    }

    pub fn command_started(&self, entry: &ManifestEntry, at: DateTime<Local>) -> std::io::Result<()> {
        self.append(&started_lines(entry, at))
    }

    pub fn command_finished(&self, record: &ExecutionRecord, output_path: &Path) -> std::io::Result<()> {
        self.append(&finished_lines(record, output_path))
    }
}

pub fn format_time(at: &DateTime<Local>) -> String {
    at.format(TIME_FORMAT).to_string()
}

pub fn format_seconds(elapsed: Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64())
}

fn header_lines(header: &LogHeader) -> Vec<String> {
    vec![
        "Junos Output Retrieval Tool - Execution Log".to_string(),
        format!("Started at: {}", format_time(&header.started_at)),
        String::new(),
        format!(
            "Upload URL: {}",
            header.upload_url.as_deref().unwrap_or("(upload disabled)")
        ),
        format!("Insecure mode: {}", if header.insecure { "Yes" } else { "No" }),
        String::new(),
        format!("Device: {}", header.device),
        format!("Username: {}", header.username),
        String::new(),
    ]
}

fn started_lines(entry: &ManifestEntry, at: DateTime<Local>) -> Vec<String> {
    vec![
        format!(
            "Started executing command for {} at {}",
            entry.output_name,
            format_time(&at)
        ),
        format!("Command: {}", entry.command),
    ]
}

fn finished_lines(record: &ExecutionRecord, output_path: &Path) -> Vec<String> {
    let seconds = format_seconds(record.elapsed());
    match &record.outcome {
        Outcome::Success { bytes } => vec![
            format!("Output saved to file: {} ({} bytes)", output_path.display(), bytes),
            format!("Execution time for {}: {} seconds", record.output_name, seconds),
            String::new(),
        ],
        Outcome::Failure { error } => vec![
            format!("Error executing command for {}: {}", record.output_name, error),
            format!("Execution time: {} seconds (FAILED)", seconds),
            String::new(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> LogHeader {
        LogHeader {
            started_at: Local::now(),
            upload_url: Some("https://cloud.example.com/s/abc".to_string()),
            insecure: true,
            device: "192.0.2.1:22".to_string(),
            username: "netops".to_string(),
        }
    }

    fn record(outcome: Outcome) -> ExecutionRecord {
        let now = Local::now();
        ExecutionRecord {
            output_name: "arp_xml".to_string(),
            command: "show arp | display xml | no-more".to_string(),
            started_at: now,
            finished_at: now,
            elapsed_ms: 1250,
            outcome,
        }
    }

    #[test]
    fn test_create_writes_header() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let log = ExecutionLog::create(dir.path(), &header())?;

        let content = std::fs::read_to_string(log.path())?;
        assert!(content.starts_with("Junos Output Retrieval Tool - Execution Log\n"));
        assert!(content.contains("Upload URL: https://cloud.example.com/s/abc"));
        assert!(content.contains("Insecure mode: Yes"));
        assert!(content.contains("Device: 192.0.2.1:22"));
        assert!(content.contains("Username: netops"));
        Ok(())
    }

    #[test]
    fn test_header_without_upload() {
        let mut h = header();
        h.upload_url = None;
        h.insecure = false;
        let lines = header_lines(&h);
        assert!(lines.contains(&"Upload URL: (upload disabled)".to_string()));
        assert!(lines.contains(&"Insecure mode: No".to_string()));
    }

    #[test]
    fn test_append_preserves_order() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let log = ExecutionLog::create(dir.path(), &header())?;
        log.append(&["first", "second"])?;
        log.append(&["third"])?;

        let content = std::fs::read_to_string(log.path())?;
        let tail: Vec<&str> = content.lines().rev().take(3).collect();
        assert_eq!(tail, vec!["third", "second", "first"]);
        Ok(())
    }

    #[test]
    fn test_success_lines() {
        let rec = record(Outcome::Success { bytes: 42 });
        let lines = finished_lines(&rec, Path::new("/var/tmp/run/arp_xml"));
        assert_eq!(lines[0], "Output saved to file: /var/tmp/run/arp_xml (42 bytes)");
        assert_eq!(lines[1], "Execution time for arp_xml: 1.25 seconds");
    }

    #[test]
    fn test_failure_lines() {
        let rec = record(Outcome::Failure {
            error: "syntax error".to_string(),
        });
        let lines = finished_lines(&rec, Path::new("/var/tmp/run/arp_xml"));
        assert_eq!(lines[0], "Error executing command for arp_xml: syntax error");
        assert_eq!(lines[1], "Execution time: 1.25 seconds (FAILED)");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(Outcome::Success { bytes: 7 }).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["bytes"], 7);

        let json = serde_json::to_value(Outcome::Failure {
            error: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "timeout");
    }
}
