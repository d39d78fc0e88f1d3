//! Logging setup.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crowdprice_config::LoggingConfig;
use eyre::Context;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Name of the active log file inside the configured log directory.
pub const LOG_FILE_NAME: &str = "crowdprice.log";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already set.
pub fn initialize_logging(config: &LoggingConfig) -> eyre::Result<()> {
    let registry = tracing_subscriber::registry();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,crowdprice={}", config.level)));

    let stdout_layer = fmt::Layer::new()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true);

    let stdout_layer = if config.json {
        stdout_layer.json().boxed()
    } else {
        stdout_layer.boxed()
    };

    let registry = registry.with(stdout_layer);

    let file_layer = match &config.log_dir {
        Some(log_dir) => {
            let log_file = RotatingFile::open(
                log_dir,
                config.max_file_size_mb.saturating_mul(1024 * 1024),
                config.max_files,
            )?;

            let layer = fmt::Layer::new()
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file));

            Some(if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            })
        }
        None => None,
    };

    registry
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .wrap_err("failed to install global tracing subscriber")?;

    Ok(())
}

/// Log file writer that rotates by size.
///
/// The active file is `crowdprice.log`; rotated files are `crowdprice.0.log`
/// (newest) through `crowdprice.{max_files - 1}.log` (oldest).
#[derive(Debug)]
pub struct RotatingFile {
    file: File,
    path: PathBuf,
    max_size: u64,
    max_files: usize,
    current_size: u64,
}

impl RotatingFile {
    /// Open (or create) the active log file in `dir`, appending.
    pub fn open(dir: impl AsRef<Path>, max_size: u64, max_files: usize) -> eyre::Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).wrap_err("failed to create log directory")?;

        let path = dir.join(LOG_FILE_NAME);
        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .wrap_err("failed to open log file")?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path,
            max_size,
            max_files,
            current_size,
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.path.with_extension(format!("{index}.log"))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files > 0 {
            for i in (1..self.max_files).rev() {
                let src = self.backup_path(i - 1);
                if src.exists() {
                    std::fs::rename(&src, self.backup_path(i))?;
                }
            }
            std::fs::rename(&self.path, self.backup_path(0))?;
        } else {
            std::fs::remove_file(&self.path)?;
        }

        self.file = File::options().create(true).append(true).open(&self.path)?;
        self.current_size = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current_size > 0 && self.current_size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }

        let written = self.file.write(buf)?;
        self.current_size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotating_file_rotates_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RotatingFile::open(dir.path(), 16, 2).unwrap();

        file.write_all(b"first line 0001\n").unwrap();
        file.write_all(b"second line 002\n").unwrap();
        file.write_all(b"third line 0003\n").unwrap();
        file.flush().unwrap();

        let active = std::fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
        let newest = std::fs::read_to_string(dir.path().join("crowdprice.0.log")).unwrap();
        let oldest = std::fs::read_to_string(dir.path().join("crowdprice.1.log")).unwrap();

        assert_eq!(active, "third line 0003\n");
        assert_eq!(newest, "second line 002\n");
        assert_eq!(oldest, "first line 0001\n");
    }

    #[test]
    fn test_rotating_file_drops_oldest_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RotatingFile::open(dir.path(), 4, 1).unwrap();

        for line in [b"aaaa", b"bbbb", b"cccc"] {
            file.write_all(line).unwrap();
        }
        file.flush().unwrap();

        assert!(!dir.path().join("crowdprice.1.log").exists());
        let backup = std::fs::read_to_string(dir.path().join("crowdprice.0.log")).unwrap();
        assert_eq!(backup, "bbbb");
    }

    #[test]
    fn test_second_initialization_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        initialize_logging(&config).unwrap();
        tracing::info!("logging initialised");
        assert!(initialize_logging(&config).is_err());
        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }
}
