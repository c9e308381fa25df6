//! Junos Collector - Main entry point
//!
//! Collects diagnostic show-command output from a Junos device over SSH,
//! archives it and uploads the archive to a Nextcloud share.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use junos_collector::config::{Config, UPLOAD_PASSWORD_ENV};
use junos_collector::executor::record::{format_time, ExecutionLog, LogHeader};
use junos_collector::executor::{self, Collection};
use junos_collector::session::SshSession;
use junos_collector::transfer::archive::{self, format_size};
use junos_collector::transfer::upload::Uploader;
use junos_collector::{output, prompt, utils};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Retrieve outputs from a Junos device and upload them to Nextcloud.",
    long_about = None
)]
struct Args {
    /// Nextcloud share URL to upload the archive to
    #[arg(short, long, value_name = "URL")]
    upload_url: Option<String>,

    /// Skip TLS certificate verification for the upload
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Be quiet (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Use the share password from the SUPPORT_FILES_PASSWORD environment variable
    #[arg(short, long)]
    password: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Device hostname or IP (prompted for when absent)
    #[arg(long)]
    host: Option<String>,

    /// Device SSH port
    #[arg(long)]
    port: Option<u16>,

    /// Device login user (prompted for when absent)
    #[arg(long)]
    username: Option<String>,

    /// Directory the run directory is created in
    #[arg(long, value_name = "DIR")]
    output_root: Option<PathBuf>,

    /// Archive only, do not upload
    #[arg(long)]
    no_upload: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    /// Command-line values take precedence over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.upload_url {
            config.upload.url = url.clone();
        }
        if self.insecure {
            config.upload.insecure = true;
        }
        if self.no_upload {
            config.upload.enabled = false;
        }
        if let Some(host) = &self.host {
            config.device.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.device.port = port;
        }
        if let Some(username) = &self.username {
            config.device.username = Some(username.clone());
        }
        if let Some(root) = &self.output_root {
            config.output.root = root.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);

    utils::logger::init(&config.log.level, args.quiet)?;

    tracing::info!("Starting junos-collector v{}", env!("CARGO_PKG_VERSION"));

    let manifest = config.manifest()?;
    let target = prompt::resolve_target_interactive(&config.device)?;
    let password = prompt::device_password()?;

    let header = LogHeader {
        started_at: Local::now(),
        upload_url: config.upload.enabled.then(|| config.upload.url.clone()),
        insecure: config.upload.insecure,
        device: format!("{}:{}", target.host, target.port),
        username: target.username.clone(),
    };

    tracing::info!("Connecting to {}:{} as {}...", target.host, target.port, target.username);

    let output_root = config.output.root.clone();
    let endpoint = format!("{}:{}", target.host, target.port);
    let Collection {
        output_dir,
        log,
        summary,
    } = tokio::task::spawn_blocking(move || {
        executor::collect(
            || SshSession::connect(target, &password),
            &manifest,
            &output_root,
            &output::local_hostname(),
            &header,
        )
    })
    .await?
    .with_context(|| format!("Collection from {} failed", endpoint))?;

    tracing::info!("All outputs and logs saved to: {}", output_dir.display());
    if summary.failed() > 0 {
        tracing::warn!("{} of {} commands failed, see {}", summary.failed(), summary.total, log.path().display());
    }

    // Archive
    append(&log, &[format!(
        "Compressing directory {} to {}.tar.gz",
        output_dir.display(),
        output_dir.display()
    )]);
    let archive_dir = output_dir.clone();
    let archived = tokio::task::spawn_blocking(move || archive::create_archive(&archive_dir)).await?;

    let archive = match archived {
        Ok(archive) => {
            append(&log, &[format!(
                "Archive created: {} ({})",
                archive.path.display(),
                format_size(archive.size)
            )]);
            archive
        }
        Err(e) => {
            tracing::error!("Error compressing directory: {}", e);
            append(&log, &[
                format!("Error compressing directory: {}", e),
                "Failed to create archive. Upload skipped.".to_string(),
                format!("Finished at: {}", format_time(&Local::now())),
            ]);
            return Ok(());
        }
    };

    if !config.upload.enabled {
        tracing::info!("Upload disabled, archive kept at {}", archive.path.display());
        append(&log, &[
            "Upload skipped (disabled).".to_string(),
            format!("Finished at: {}", format_time(&Local::now())),
        ]);
        return Ok(());
    }

    // Upload
    let share_password = upload_password(args.password);
    let uploaded = match Uploader::new(&config.upload.url, share_password, config.upload.insecure) {
        Ok(uploader) => {
            append(&log, &[
                "Uploading archive to Nextcloud...".to_string(),
                format!("Cloud URL: {}", uploader.share().cloud_url),
                format!("Folder Token: {}", uploader.share().token),
            ]);
            uploader.upload(&archive.path).await
        }
        Err(e) => Err(e),
    };

    let mut lines = Vec::new();
    match &uploaded {
        Ok(status) => {
            lines.push(format!("Upload successful! Status code: {}", status.as_u16()));
            tracing::info!("Archive uploaded successfully to {}", config.upload.url);
        }
        Err(e) => {
            lines.push(format!("Upload failed: {}", e));
            tracing::error!("Failed to upload archive to {}: {}", config.upload.url, e);
            tracing::info!("Archive kept at {}", archive.path.display());
        }
    }
    lines.push(format!("Upload successful: {}", if uploaded.is_ok() { "Yes" } else { "No" }));
    lines.push(format!("Finished at: {}", format_time(&Local::now())));
    append(&log, &lines);

    Ok(())
}

fn upload_password(from_env: bool) -> String {
    if !from_env {
        return String::new();
    }
    std::env::var(UPLOAD_PASSWORD_ENV).unwrap_or_else(|_| {
        tracing::warn!("{} is not set, uploading without a password", UPLOAD_PASSWORD_ENV);
        String::new()
    })
}

fn append(log: &ExecutionLog, lines: &[String]) {
    if let Err(e) = log.append(lines) {
        tracing::warn!("Failed to write execution log: {}", e);
    }
}
