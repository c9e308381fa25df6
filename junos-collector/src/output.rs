//! Per-run output directory.
//!
//! Each run writes into `<root>/junos_outputs_<hostname>_<timestamp>`. When
//! the configured root is not writable the current directory is used.

use crate::utils::errors::Result;
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DIR_PREFIX: &str = "junos_outputs";
const MAX_SUFFIX: u32 = 100;

/// Host name of the collecting machine, safe for use in a path.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().replace(['/', '\\'], "_"))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

pub fn dir_name(hostname: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}_{}", DIR_PREFIX, hostname, at.format("%Y%m%d_%H%M%S"))
}

/// Create the output directory under `root`, falling back to `.`.
pub fn create_output_dir(root: &Path, hostname: &str, at: &DateTime<Local>) -> Result<PathBuf> {
    let name = dir_name(hostname, at);

    match create_unique_dir(root, &name) {
        Ok(dir) => {
            info!("Created output directory: {}", dir.display());
            Ok(dir)
        }
        Err(e) => {
            warn!("Cannot create {}: {}", root.join(&name).display(), e);
            let dir = create_unique_dir(Path::new("."), &name)?;
            info!("Using fallback directory: {}", dir.display());
            Ok(dir)
        }
    }
}

/// Create `parent/name`, or `parent/name_1`, `name_2`, ... when taken, so
/// two runs in the same second never share a directory.
fn create_unique_dir(parent: &Path, name: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(parent)?;

    for attempt in 0..MAX_SUFFIX {
        let candidate = match attempt {
            0 => parent.join(name),
            n => parent.join(format!("{}_{}", name, n)),
        };
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("{} and its {} suffixed variants already exist", name, MAX_SUFFIX - 1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_dir_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(dir_name("collector01", &at), "junos_outputs_collector01_20240309_070501");
    }

    #[test]
    fn test_create_under_root() -> std::io::Result<()> {
        let root = TempDir::new()?;
        let at = Local::now();

        let dir = create_output_dir(root.path(), "collector01", &at).unwrap();

        assert!(dir.is_dir());
        assert_eq!(dir.parent(), Some(root.path()));
        assert_eq!(
            dir.file_name().unwrap().to_str().unwrap(),
            dir_name("collector01", &at)
        );
        Ok(())
    }

    #[test]
    fn test_same_second_runs_get_distinct_dirs() -> std::io::Result<()> {
        let root = TempDir::new()?;
        let at = Local::now();

        let first = create_output_dir(root.path(), "collector01", &at).unwrap();
        std::fs::write(first.join("execution_log.txt"), b"first run")?;
        let second = create_output_dir(root.path(), "collector01", &at).unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            format!("{}_1", dir_name("collector01", &at))
        );
        assert_eq!(std::fs::read(first.join("execution_log.txt"))?, b"first run");
        Ok(())
    }

    #[test]
    fn test_local_hostname_is_path_safe() {
        let host = local_hostname();
        assert!(!host.is_empty());
        assert!(!host.contains('/'));
    }
}
