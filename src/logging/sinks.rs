use std::{
    io::{self, Write},
    sync::Arc,
};

use eyre::Context;

use super::{rotation::RotatingFile, LogFormatter, LogSink, Record};

/// Writes formatted records to a [`RotatingFile`], which may be shared between sinks.
pub struct FileSink {
    file: Arc<RotatingFile>,
    formatter: Box<dyn LogFormatter>,
}

impl FileSink {
    pub fn new(file: Arc<RotatingFile>, formatter: Box<dyn LogFormatter>) -> Self {
        Self { file, formatter }
    }
}

impl LogSink for FileSink {
    fn write_log(&self, record: &Record) -> eyre::Result<()> {
        self.file
            .write_line(&self.formatter.format(record))
            .with_context(|| format!("Failed writing to {}", self.file.path().display()))
    }

    fn flush(&self) -> eyre::Result<()> {
        self.file.flush()
    }
}

pub struct StdoutSink {
    handle: io::Stdout,
    formatter: Box<dyn LogFormatter>,
}

impl StdoutSink {
    pub fn new(formatter: Box<dyn LogFormatter>) -> Self {
        Self {
            handle: io::stdout(),
            formatter,
        }
    }
}

impl LogSink for StdoutSink {
    fn write_log(&self, record: &Record) -> eyre::Result<()> {
        let line = self.formatter.format(record);
        let mut writer = self.handle.lock();

        writeln!(writer, "{}", line)?;
        writer.flush().context("Can't flush stdout")
    }

    fn flush(&self) -> eyre::Result<()> {
        self.handle.lock().flush().context("Can't flush stdout")
    }
}
