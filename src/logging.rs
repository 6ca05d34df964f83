//! Process-wide logging
//!
//! [`init`] is called once from `main`. Records go to stderr and are
//! appended to `settings.log_file`. The file is rotated once it reaches
//! [`ROTATE_BYTES`]; rotated files older than [`RETENTION`] are deleted.

use crate::settings::Settings;

use env_logger::{Builder, Target};
use eyre::Result;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size at which the active log file is rotated
pub const ROTATE_BYTES: u64 = 5 * 1024 * 1024;
/// How long rotated log files are kept
pub const RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Size-rotated append-only log file
struct LogFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    retention: Duration,
}

impl LogFile {
    fn open(path: &Path, max_bytes: u64, retention: Duration) -> io::Result<Self> {
        let file = open_log_file(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            max_bytes,
            retention,
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    /// Move the active file aside, prune expired rotations, start a new file
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        std::fs::rename(&self.path, self.rotated_path())?;
        self.prune();
        self.file = open_log_file(&self.path)?;
        self.written = 0;
        Ok(())
    }

    /// `app.log.<unix millis>`, suffixed with a counter on collision
    fn rotated_path(&self) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let base = format!("{}.{}", self.path.display(), stamp);
        let mut candidate = PathBuf::from(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{}-{}", base, n));
            n += 1;
        }
        candidate
    }

    fn prune(&self) {
        let (Some(dir), Some(name)) = (
            self.path.parent(),
            self.path.file_name().and_then(|n| n.to_str()),
        ) else {
            return;
        };
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        let prefix = format!("{}.", name);
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };

        for entry in entries.flatten() {
            let rotated = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&prefix));
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > self.retention);
            if rotated && expired {
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }
}

/// Writes every record to stderr and, when available, the log file
struct Tee {
    file: Option<LogFile>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &mut self.file {
            // Drop a file sink that stopped accepting writes
            if file.write_all(buf).is_err() {
                self.file = None;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(log) = &mut self.file {
            log.file.flush()?;
        }
        Ok(())
    }
}

/// env_logger filter for a configured level name
///
/// Understands the usual names in any case plus `WARNING`, `CRITICAL` and
/// `SUCCESS`; anything else is passed through as a filter directive.
pub fn filter_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "success" => "info".to_string(),
        other => other.to_string(),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global logger
///
/// The level comes from `settings.log_level` (`LOG_LEVEL`), or `debug` when
/// `debug` is set. If the log file cannot be opened, logging continues on
/// stderr only.
pub fn init(settings: &Settings, debug: bool) -> Result<()> {
    let filter = match debug {
        true => "debug".to_string(),
        false => filter_directive(&settings.log_level),
    };

    let (file, file_error) = match LogFile::open(&settings.log_file, ROTATE_BYTES, RETENTION) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };

    Builder::new()
        .parse_filters(&filter)
        .format_timestamp_millis()
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init()?;

    if let Some(e) = file_error {
        log::warn!(
            "Logging to stderr only, cannot open {}: {}",
            settings.log_file.display(),
            e
        );
    }
    log::debug!("Logging initialised at level {}", filter);
    Ok(())
}

/// Flush buffered records before exit
pub fn shutdown() {
    log::logger().flush();
}
