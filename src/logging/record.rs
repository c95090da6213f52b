use std::{backtrace::Backtrace, borrow::Cow, panic::Location};

use chrono::{DateTime, Local};

use super::Severity;

/// Source location of the code that emitted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl<'a> Caller<'a> {
    pub fn new(file: &'a str, line: u32) -> Self {
        Self { file, line }
    }

    /// `dir/file.rs:line`, keeping only the last directory of the path.
    pub fn trimmed_path(&self) -> String {
        let trimmed = match self.file.rfind(['/', '\\']) {
            Some(last) => match self.file[..last].rfind(['/', '\\']) {
                Some(previous) => &self.file[previous + 1..],
                None => self.file,
            },
            None => self.file,
        };

        format!("{}:{}", trimmed, self.line)
    }
}

impl From<&'static Location<'static>> for Caller<'static> {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

/// A single log event, alive only while it is dispatched to the sinks.
#[derive(Debug)]
pub struct Record<'a> {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: Cow<'a, str>,
    pub caller: Option<Caller<'a>>,
    pub stack: Option<Backtrace>,
}

impl<'a> Record<'a> {
    pub fn new(severity: Severity, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            message: message.into(),
            caller: None,
            stack: None,
        }
    }

    pub fn with_caller(mut self, caller: Caller<'a>) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stack(mut self, stack: Backtrace) -> Self {
        self.stack = Some(stack);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
