mod config;
mod formatters;
mod logger;
mod record;
mod rotation;
mod router;
mod severity;
mod sinks;

pub use config::{Destination, FileTarget, SinkSet, SinkSpec, Style, DEFAULT_LOG_DIR};
pub use formatters::{EncoderConfig, LineFormatter};
pub use logger::{Builder, Logger};
pub use record::{Caller, Record};
pub use rotation::{Backup, RotatingFile};
pub use router::Priority;
pub use severity::Severity;
pub use sinks::{FileSink, StdoutSink};

pub trait LogFormatter: Sync + Send {
    fn format(&self, record: &Record) -> String;
}

pub trait LogSink: Sync + Send {
    fn write_log(&self, record: &Record) -> eyre::Result<()>;
    fn flush(&self) -> eyre::Result<()>;
}
