//! Leveled logger that writes every record to stdout and to rotating log files.
//!
//! Records are split by severity: debug, info and warn are "low priority", error and
//! above are "high priority". The split configuration keeps them in separate files,
//! the unified configuration writes both into one file.
//!
//! ```no_run
//! use lklog::Logger;
//!
//! # fn main() -> eyre::Result<()> {
//! let log = Logger::new(true, false)?;
//! log.info("hello info");
//! lklog::errorf!(log, "request {} failed", 42);
//! # Ok(())
//! # }
//! ```

pub mod logging;

pub use logging::{Builder, Logger, Priority, Severity, SinkSet};

#[macro_export]
macro_rules! debugf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.debug_fmt(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! infof {
    ($logger:expr, $($arg:tt)+) => {
        $logger.info_fmt(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! warnf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.warn_fmt(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! errorf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.error_fmt(::std::format_args!($($arg)+))
    };
}
