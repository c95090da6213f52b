use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use super::Priority;

pub const DEFAULT_LOG_DIR: &str = "./log";

const MEGABYTE: u64 = 1024 * 1024;
const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Which encoder a sink renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Colored output for terminals.
    Console,
    /// Plain text for files.
    File,
}

/// A log file plus its rotation and retention limits.
///
/// The file rotates once a write would push it past `max_size` bytes. Rotated backups
/// are removed oldest first until at most `max_backups` remain, and any backup older
/// than `max_age` is removed. `None` disables the respective limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub path: PathBuf,
    pub max_size: u64,
    pub max_backups: Option<usize>,
    pub max_age: Option<Duration>,
    pub compress: bool,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: 100 * MEGABYTE,
            max_backups: None,
            max_age: None,
            compress: false,
        }
    }

    /// Specifies the maximum size of the active file in bytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Specifies how many rotated files to keep.
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = Some(max_backups);
        self
    }

    /// Specifies how long rotated files are kept.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Specifies whether rotated files are gzip compressed.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    fn info(dir: &Path, file_name: &str) -> Self {
        Self::new(dir.join(file_name))
            .with_max_size(2 * MEGABYTE)
            .with_max_backups(100)
            .with_max_age(THIRTY_DAYS)
    }

    fn error(dir: &Path) -> Self {
        Self::new(dir.join("error.log"))
            .with_max_size(MEGABYTE)
            .with_max_backups(5)
            .with_max_age(THIRTY_DAYS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(FileTarget),
}

/// One sink of a logger: where records go, how they look and which ones it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub style: Style,
    pub destination: Destination,
    pub priority: Priority,
}

impl SinkSpec {
    pub fn new(style: Style, destination: Destination, priority: Priority) -> Self {
        Self {
            style,
            destination,
            priority,
        }
    }

    fn stdout(priority: Priority) -> Self {
        Self::new(Style::Console, Destination::Stdout, priority)
    }

    fn file(target: FileTarget, priority: Priority) -> Self {
        Self::new(Style::File, Destination::File(target), priority)
    }
}

/// The list of sinks a logger is built from.
///
/// Specs naming the same file path share one open file; the first spec's limits apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkSet {
    specs: Vec<SinkSpec>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Low priority records to stdout and `info.log`, high priority records to stdout
    /// and `error.log`.
    pub fn split(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        Self::new()
            .with(SinkSpec::stdout(Priority::Low))
            .with(SinkSpec::file(
                FileTarget::info(dir, "info.log"),
                Priority::Low,
            ))
            .with(SinkSpec::stdout(Priority::High))
            .with(SinkSpec::file(FileTarget::error(dir), Priority::High))
    }

    /// Every record to stdout and to the shared `all_log.log`.
    pub fn unified(dir: impl AsRef<Path>) -> Self {
        let target = FileTarget::info(dir.as_ref(), "all_log.log");

        Self::new()
            .with(SinkSpec::stdout(Priority::Low))
            .with(SinkSpec::file(target.clone(), Priority::Low))
            .with(SinkSpec::stdout(Priority::High))
            .with(SinkSpec::file(target, Priority::High))
    }

    pub fn with(mut self, spec: SinkSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Drops every stdout sink, leaving only the files.
    pub fn without_stdout(mut self) -> Self {
        self.specs
            .retain(|spec| spec.destination != Destination::Stdout);
        self
    }

    /// Overrides the retention age of every file target.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        for target in self.file_targets_mut() {
            target.max_age = Some(max_age);
        }
        self
    }

    /// Turns compression of rotated files on or off for every file target.
    pub fn with_compress(mut self, compress: bool) -> Self {
        for target in self.file_targets_mut() {
            target.compress = compress;
        }
        self
    }

    pub fn specs(&self) -> &[SinkSpec] {
        &self.specs
    }

    fn file_targets_mut(&mut self) -> impl Iterator<Item = &mut FileTarget> {
        self.specs
            .iter_mut()
            .filter_map(|spec| match &mut spec.destination {
                Destination::File(target) => Some(target),
                Destination::Stdout => None,
            })
    }
}
