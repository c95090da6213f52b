use std::{
    fs::{self, File, OpenOptions},
    io::{self, LineWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use eyre::{bail, Context};
use flate2::{write::GzEncoder, Compression};

use super::FileTarget;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

struct ActiveFile {
    file: LineWriter<File>,
    size: u64,
}

impl ActiveFile {
    fn open(path: &Path) -> eyre::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed opening or creating log file {}", path.display()))?;
        let size = file.metadata()?.len();

        Ok(Self {
            file: LineWriter::new(file),
            size,
        })
    }
}

/// A rotated copy of a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub rotated_at: NaiveDateTime,
}

/// Append-only log file that rotates itself according to a [`FileTarget`].
///
/// Backups are named `<stem>-<timestamp><ext>` next to the active file, e.g.
/// `info-2024-03-09T14-05-07.123.log`, with `.gz` appended when compressed.
pub struct RotatingFile {
    target: FileTarget,
    active: Mutex<Option<ActiveFile>>,
}

impl RotatingFile {
    /// Opens the active file, creating its directory if needed.
    pub fn open(target: FileTarget) -> eyre::Result<Self> {
        if let Some(dir) = target.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed creating log directory {}", dir.display()))?;
        }

        let active = ActiveFile::open(&target.path)?;

        Ok(Self {
            target,
            active: Mutex::new(Some(active)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.target.path
    }

    /// Appends `line` and a newline, rotating first if the file would grow past its
    /// maximum size.
    pub fn write_line(&self, line: &str) -> eyre::Result<()> {
        let len = line.len() as u64 + 1;
        if len > self.target.max_size {
            bail!(
                "write length {} exceeds maximum file size {} of {}",
                len,
                self.target.max_size,
                self.target.path.display()
            );
        }

        let mut active = self.lock();

        let current_size = match active.as_ref() {
            Some(file) => file.size,
            None => {
                // A previous rotation failed to reopen the file.
                *active = Some(ActiveFile::open(&self.target.path)?);
                active.as_ref().map_or(0, |file| file.size)
            }
        };

        if current_size + len > self.target.max_size {
            self.rotate(&mut *active)?;
        }

        let Some(file) = active.as_mut() else {
            bail!("log file {} is not open", self.target.path.display());
        };

        writeln!(file.file, "{}", line)?;
        file.file.flush().context("Can't flush file")?;
        file.size += len;

        Ok(())
    }

    pub fn flush(&self) -> eyre::Result<()> {
        if let Some(file) = self.lock().as_mut() {
            file.file.flush().context("Can't flush file")?;
        }
        Ok(())
    }

    /// Rotated files currently on disk, newest first.
    pub fn backups(&self) -> eyre::Result<Vec<Backup>> {
        let (dir, stem, ext) = self.name_parts();

        let mut backups = Vec::new();
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed reading log directory {}", dir.display()))?;

        for entry in entries {
            let Ok(path) = entry.map(|e| e.path()) else {
                continue;
            };

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if let Some(rotated_at) = parse_backup_time(name, &stem, &ext) {
                backups.push(Backup { path, rotated_at });
            }
        }

        backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
        Ok(backups)
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveFile>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rotate(&self, active: &mut Option<ActiveFile>) -> eyre::Result<()> {
        tracing::debug!("rotating log file {}", self.target.path.display());

        if let Some(mut file) = active.take() {
            file.file.flush().context("Can't flush file")?;
        }

        let backup = self.backup_path(Local::now());
        let renamed = fs::rename(&self.target.path, &backup).with_context(|| {
            format!(
                "Failed renaming {} to {}",
                self.target.path.display(),
                backup.display()
            )
        });

        *active = Some(ActiveFile::open(&self.target.path)?);
        renamed?;

        if self.target.compress {
            if let Err(e) = compress_file(&backup) {
                tracing::warn!("failed to compress log file {}: {:#}", backup.display(), e);
            }
        }

        if let Err(e) = self.remove_expired_backups() {
            tracing::warn!(
                "failed to prune rotated files of {}: {:#}",
                self.target.path.display(),
                e
            );
        }

        Ok(())
    }

    fn remove_expired_backups(&self) -> eyre::Result<()> {
        let backups = self.backups()?;

        let cutoff = self
            .target
            .max_age
            .and_then(|age| TimeDelta::from_std(age).ok())
            .map(|age| Local::now().naive_local() - age);

        for (index, backup) in backups.iter().enumerate() {
            let over_count = self
                .target
                .max_backups
                .is_some_and(|max_backups| index >= max_backups);
            let too_old = cutoff.is_some_and(|cutoff| backup.rotated_at < cutoff);

            if !(over_count || too_old) {
                continue;
            }

            match fs::remove_file(&backup.path) {
                Ok(()) => tracing::debug!("removed old log file {}", backup.path.display()),
                Err(e) => tracing::warn!(
                    "failed to remove old log file {}: {}",
                    backup.path.display(),
                    e
                ),
            }
        }

        Ok(())
    }

    fn backup_path(&self, now: DateTime<Local>) -> PathBuf {
        let (dir, stem, ext) = self.name_parts();

        // Keep names strictly increasing so the newest backup is never pruned as oldest.
        let mut time = now.naive_local();
        if let Some(newest) = self.backups().ok().and_then(|b| b.first().map(|b| b.rotated_at)) {
            if time <= newest {
                time = newest + TimeDelta::milliseconds(1);
            }
        }

        loop {
            let name = format!("{}-{}{}", stem, time.format(BACKUP_TIME_FORMAT), ext);
            let path = dir.join(&name);
            let compressed = dir.join(format!("{}{}", name, COMPRESS_SUFFIX));

            if !path.exists() && !compressed.exists() {
                return path;
            }

            time += TimeDelta::milliseconds(1);
        }
    }

    fn name_parts(&self) -> (PathBuf, String, String) {
        let path = &self.target.path;

        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (dir, stem, ext)
    }
}

fn parse_backup_time(name: &str, stem: &str, ext: &str) -> Option<NaiveDateTime> {
    let parse = |name: &str| {
        let time = name
            .strip_prefix(stem)?
            .strip_prefix('-')?
            .strip_suffix(ext)?;
        NaiveDateTime::parse_from_str(time, BACKUP_TIME_FORMAT).ok()
    };

    // The file's own extension may itself be `.gz`.
    parse(name).or_else(|| parse(name.strip_suffix(COMPRESS_SUFFIX)?))
}

fn compress_file(path: &Path) -> eyre::Result<()> {
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(COMPRESS_SUFFIX);

    let mut source = File::open(path)?;
    let target = File::create(&gz_path)?;

    let mut encoder = GzEncoder::new(target, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)?;
    Ok(())
}
