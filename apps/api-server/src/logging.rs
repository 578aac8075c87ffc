//! Logging initialization: tracing registry plus a size-rotating file sink.
//!
//! Rotation follows the classic scheme: when the active file would exceed
//! `max_bytes`, `name` becomes `name.1`, `name.1` becomes `name.2`, and so on
//! up to the configured rotation count; the oldest backup is discarded.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::{LogPolicy, Settings};

struct ActiveFile {
    file: File,
    len: u64,
}

/// A `Write` sink that rotates the underlying file by size.
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    backups: u32,
    state: Mutex<ActiveFile>,
}

impl RotatingFileWriter {
    pub fn open(path: PathBuf, max_bytes: u64, backups: u32) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path,
            max_bytes,
            backups,
            state: Mutex::new(ActiveFile { file, len }),
        })
    }

    pub fn backup_count(&self) -> u32 {
        self.backups
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".{index}"));
        PathBuf::from(os)
    }

    fn rotate(&self, active: &mut ActiveFile) -> io::Result<()> {
        if self.backups == 0 {
            // No backups kept: truncate in place.
            active.file = File::create(&self.path)?;
            active.len = 0;
            return Ok(());
        }

        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        std::fs::rename(&self.path, self.backup_path(1))?;

        active.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        active.len = 0;
        Ok(())
    }
}

/// Per-call write handle; rotation is checked before each write.
pub struct RotatingHandle<'a> {
    writer: &'a RotatingFileWriter,
}

impl Write for RotatingHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut active = self
            .writer
            .state
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;

        if active.len > 0 && active.len + buf.len() as u64 > self.writer.max_bytes {
            self.writer.rotate(&mut active)?;
        }

        let written = active.file.write(buf)?;
        active.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut active = self
            .writer
            .state
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        active.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingHandle<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingHandle { writer: self }
    }
}

/// Build the rotating file sink for a resolved logging policy.
pub fn file_writer(policy: &LogPolicy) -> io::Result<RotatingFileWriter> {
    RotatingFileWriter::open(policy.file.clone(), policy.max_bytes, policy.rotations)
}

/// Initialize the tracing subscriber: console layer plus rotating file layer.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init(settings: &Settings) -> io::Result<()> {
    let policy = settings.log_policy();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},api_server={level},cbu_infra={level}",
            level = policy.level
        ))
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer(&policy)?)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if settings.debug {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        file = %policy.file.display(),
        max_bytes = policy.max_bytes,
        rotations = policy.rotations,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn temp_log_path() -> PathBuf {
        std::env::temp_dir().join(format!("cbu-log-test-{}.log", uuid::Uuid::new_v4()))
    }

    #[test]
    fn backup_count_comes_from_config() {
        let settings = Settings::from_yaml("DEBUG: false\nLOGGING:\n  ROTATIONS: 5\n").unwrap();
        let mut policy = settings.log_policy();
        policy.file = temp_log_path();

        let writer = file_writer(&policy).unwrap();
        assert_eq!(writer.backup_count(), 5);
        assert_eq!(writer.max_bytes(), 25 * 1_048_576);

        std::fs::remove_file(&policy.file).ok();
    }

    #[test]
    fn rotates_when_size_exceeded() {
        let path = temp_log_path();
        let writer = RotatingFileWriter::open(path.clone(), 32, 2).unwrap();

        let mut handle = writer.make_writer();
        handle
            .write_all(b"first line, long enough to count\n")
            .unwrap();
        handle.write_all(b"second line forces a rotation\n").unwrap();
        handle.flush().unwrap();

        let backup = PathBuf::from(format!("{}.1", path.display()));
        assert!(backup.exists());
        let rotated = std::fs::read_to_string(&backup).unwrap();
        assert!(rotated.contains("first line"));
        let active = std::fs::read_to_string(&path).unwrap();
        assert!(active.contains("second line"));

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&backup).ok();
    }

    #[test]
    fn oldest_backup_is_discarded() {
        let path = temp_log_path();
        let writer = RotatingFileWriter::open(path.clone(), 8, 2).unwrap();

        let mut handle = writer.make_writer();
        for line in [
            b"aaaaaaaaaa\n".as_slice(),
            b"bbbbbbbbbb\n",
            b"cccccccccc\n",
            b"dddddddddd\n",
        ] {
            handle.write_all(line).unwrap();
        }

        assert!(PathBuf::from(format!("{}.1", path.display())).exists());
        assert!(PathBuf::from(format!("{}.2", path.display())).exists());
        assert!(!PathBuf::from(format!("{}.3", path.display())).exists());

        for suffix in ["", ".1", ".2"] {
            std::fs::remove_file(format!("{}{suffix}", path.display())).ok();
        }
    }
}
