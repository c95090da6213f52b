use std::{
    backtrace::Backtrace,
    collections::{hash_map::Entry, HashMap},
    fmt::{self, Write},
    panic::Location,
    path::PathBuf,
    sync::Arc,
};

use eyre::Context;
use log::{LevelFilter, Log};

use super::{
    config::{Destination, SinkSet, Style, DEFAULT_LOG_DIR},
    formatters::{EncoderConfig, LineFormatter},
    rotation::RotatingFile,
    sinks::{FileSink, StdoutSink},
    Caller, LogSink, Priority, Record, Severity,
};

struct Route {
    priority: Priority,
    sink: Box<dyn LogSink>,
}

/// Leveled logging handle that fans records out to its sinks.
///
/// Logging never fails from the caller's point of view: a sink that cannot write
/// drops the record and reports the failure through `tracing`. Dropping the logger
/// flushes every sink.
pub struct Logger {
    routes: Vec<Route>,
    attach_caller: bool,
    attach_stacktrace: bool,
}

impl Logger {
    /// Logger writing low priority records to `./log/info.log` and high priority
    /// records to `./log/error.log`, both mirrored to stdout.
    pub fn new(attach_caller: bool, attach_stacktrace: bool) -> eyre::Result<Self> {
        Builder::new()
            .with_caller(attach_caller)
            .with_stacktrace(attach_stacktrace)
            .build()
    }

    /// Logger writing every record to `./log/all_log.log`, mirrored to stdout.
    pub fn new_unified(attach_caller: bool, attach_stacktrace: bool) -> eyre::Result<Self> {
        Builder::new()
            .with_sink_set(SinkSet::unified(DEFAULT_LOG_DIR))
            .with_caller(attach_caller)
            .with_stacktrace(attach_stacktrace)
            .build()
    }

    /// Installs this logger as the `log` crate's global logger.
    pub fn init(self, filter: LevelFilter) -> eyre::Result<()> {
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;
        log::set_max_level(filter);

        Ok(())
    }

    /// Whether any sink accepts records of this severity.
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.routes
            .iter()
            .any(|route| route.priority.accepts(severity))
    }

    #[track_caller]
    pub fn debug(&self, msg: &str) {
        self.emit(Severity::DEBUG, msg)
    }

    #[track_caller]
    pub fn info(&self, msg: &str) {
        self.emit(Severity::INFO, msg)
    }

    #[track_caller]
    pub fn warn(&self, msg: &str) {
        self.emit(Severity::WARN, msg)
    }

    #[track_caller]
    pub fn error(&self, msg: &str) {
        self.emit(Severity::ERROR, msg)
    }

    #[track_caller]
    pub fn debug_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit_fmt(Severity::DEBUG, args)
    }

    #[track_caller]
    pub fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit_fmt(Severity::INFO, args)
    }

    #[track_caller]
    pub fn warn_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit_fmt(Severity::WARN, args)
    }

    #[track_caller]
    pub fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit_fmt(Severity::ERROR, args)
    }

    /// Logs at an arbitrary severity. `PANIC` and `FATAL` only pick the tag; they
    /// neither panic nor exit.
    #[track_caller]
    pub fn emit(&self, severity: Severity, msg: &str) {
        if !self.is_enabled(severity) {
            return;
        }

        let mut record = Record::new(severity, msg);
        if self.attach_caller {
            record = record.with_caller(Caller::from(Location::caller()));
        }

        self.dispatch(record);
    }

    #[track_caller]
    pub fn emit_fmt(&self, severity: Severity, args: fmt::Arguments<'_>) {
        if !self.is_enabled(severity) {
            return;
        }

        let mut record = Record::new(severity, render(args));
        if self.attach_caller {
            record = record.with_caller(Caller::from(Location::caller()));
        }

        self.dispatch(record);
    }

    pub fn flush(&self) {
        for route in &self.routes {
            if let Err(e) = route.sink.flush() {
                tracing::warn!("failed to flush log sink: {:#}", e);
            }
        }
    }

    fn dispatch(&self, mut record: Record) {
        if self.attach_stacktrace && record.severity >= Severity::ERROR {
            record = record.with_stack(Backtrace::force_capture());
        }

        for route in &self.routes {
            if !route.priority.accepts(record.severity) {
                continue;
            }

            if let Err(e) = route.sink.write_log(&record) {
                tracing::warn!("dropped {} log record: {:#}", record.severity, e);
            }
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.is_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let severity = Severity::from(record.level());
        if !self.is_enabled(severity) {
            return;
        }

        let mut entry = Record::new(severity, render(*record.args()));
        if self.attach_caller {
            if let (Some(file), Some(line)) = (record.file(), record.line()) {
                entry = entry.with_caller(Caller::new(file, line));
            }
        }

        self.dispatch(entry);
    }

    fn flush(&self) {
        Logger::flush(self)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Formats `args`, keeping whatever was written if a `Display` impl fails.
fn render(args: fmt::Arguments<'_>) -> String {
    let mut out = String::new();
    if out.write_fmt(args).is_err() {
        tracing::warn!("log message formatting failed");
        out.push_str("<formatting failed>");
    }

    out
}

/// Assembles a [`Logger`] from a [`SinkSet`] plus any custom sinks.
pub struct Builder {
    sink_set: SinkSet,
    custom_sinks: Vec<Route>,
    attach_caller: bool,
    attach_stacktrace: bool,
}

impl Builder {
    /// Starts from the split configuration under `./log`.
    pub fn new() -> Self {
        Self {
            sink_set: SinkSet::split(DEFAULT_LOG_DIR),
            custom_sinks: Vec::new(),
            attach_caller: false,
            attach_stacktrace: false,
        }
    }

    pub fn with_sink_set(self, sink_set: SinkSet) -> Self {
        Self { sink_set, ..self }
    }

    pub fn with_caller(self, attach_caller: bool) -> Self {
        Self {
            attach_caller,
            ..self
        }
    }

    pub fn with_stacktrace(self, attach_stacktrace: bool) -> Self {
        Self {
            attach_stacktrace,
            ..self
        }
    }

    /// Adds a sink that receives every record of the given priority.
    pub fn with_sink(mut self, priority: Priority, sink: Box<dyn LogSink>) -> Self {
        self.custom_sinks.push(Route { priority, sink });
        self
    }

    /// Opens every file sink. Fails if a log directory or file cannot be created.
    pub fn build(self) -> eyre::Result<Logger> {
        let console_config = Arc::new(EncoderConfig::console());
        let file_config = Arc::new(EncoderConfig::file());

        let mut files: HashMap<PathBuf, Arc<RotatingFile>> = HashMap::new();
        let mut routes = Vec::with_capacity(self.sink_set.specs().len() + self.custom_sinks.len());

        for spec in self.sink_set.specs() {
            let config = match spec.style {
                Style::Console => console_config.clone(),
                Style::File => file_config.clone(),
            };
            let formatter = Box::new(LineFormatter::new(config));

            let sink: Box<dyn LogSink> = match &spec.destination {
                Destination::Stdout => Box::new(StdoutSink::new(formatter)),
                Destination::File(target) => {
                    let file = match files.entry(target.path.clone()) {
                        Entry::Occupied(entry) => entry.get().clone(),
                        Entry::Vacant(entry) => entry
                            .insert(Arc::new(RotatingFile::open(target.clone())?))
                            .clone(),
                    };
                    Box::new(FileSink::new(file, formatter))
                }
            };

            routes.push(Route {
                priority: spec.priority,
                sink,
            });
        }

        routes.extend(self.custom_sinks);

        Ok(Logger {
            routes,
            attach_caller: self.attach_caller,
            attach_stacktrace: self.attach_stacktrace,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    struct Captured {
        severity: Severity,
        message: String,
        caller: Option<(String, u32)>,
        has_stack: bool,
    }

    #[derive(Clone, Default)]
    struct Capture {
        records: Arc<Mutex<Vec<Captured>>>,
    }

    impl Capture {
        fn records(&self) -> Vec<Captured> {
            self.records.lock().unwrap().clone()
        }
    }

    impl LogSink for Capture {
        fn write_log(&self, record: &Record) -> eyre::Result<()> {
            self.records.lock().unwrap().push(Captured {
                severity: record.severity,
                message: record.message.to_string(),
                caller: record
                    .caller
                    .map(|caller| (caller.file.to_string(), caller.line)),
                has_stack: record.stack.is_some(),
            });
            Ok(())
        }

        fn flush(&self) -> eyre::Result<()> {
            Ok(())
        }
    }

    struct Failing;

    impl LogSink for Failing {
        fn write_log(&self, _record: &Record) -> eyre::Result<()> {
            Err(eyre::eyre!("disk full"))
        }

        fn flush(&self) -> eyre::Result<()> {
            Err(eyre::eyre!("disk full"))
        }
    }

    fn capture_logger(caller: bool, stacktrace: bool) -> (Logger, Capture, Capture) {
        let low = Capture::default();
        let high = Capture::default();

        let logger = Builder::new()
            .with_sink_set(SinkSet::new())
            .with_caller(caller)
            .with_stacktrace(stacktrace)
            .with_sink(Priority::Low, Box::new(low.clone()))
            .with_sink(Priority::High, Box::new(high.clone()))
            .build()
            .unwrap();

        (logger, low, high)
    }

    #[test]
    fn routes_records_by_priority() {
        let (logger, low, high) = capture_logger(false, false);

        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");
        logger.emit(Severity::FATAL, "f");

        let low: Vec<_> = low.records().into_iter().map(|r| r.message).collect();
        let high: Vec<_> = high.records().into_iter().map(|r| r.message).collect();

        assert_eq!(low, ["d", "i", "w"]);
        assert_eq!(high, ["e", "f"]);
    }

    #[test]
    fn caller_is_the_call_site() {
        let (logger, low, _high) = capture_logger(true, false);

        let line = line!() + 1;
        logger.info("hello");

        let (file, recorded_line) = low.records()[0].caller.clone().unwrap();
        assert!(file.ends_with("logger.rs"), "{file}");
        assert_eq!(recorded_line, line);
    }

    #[test]
    fn caller_is_omitted_when_disabled() {
        let (logger, low, high) = capture_logger(false, true);

        logger.warn("w");
        logger.error("e");

        assert!(low.records()[0].caller.is_none());
        assert!(high.records()[0].caller.is_none());
    }

    #[test]
    fn stack_is_captured_for_errors_only() {
        let (logger, low, high) = capture_logger(false, true);

        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");

        assert!(low.records().iter().all(|r| !r.has_stack));
        assert!(high.records()[0].has_stack);
    }

    #[test]
    fn stack_is_not_captured_without_the_flag() {
        let (logger, _low, high) = capture_logger(true, false);

        logger.error("e");

        assert!(!high.records()[0].has_stack);
    }

    #[test]
    fn formatted_calls_match_plain_calls() {
        let (logger, low, high) = capture_logger(false, false);

        let user = "ada";
        let attempts = 3;
        crate::infof!(logger, "user {} failed {} times", user, attempts);
        logger.info(&format!("user {} failed {} times", user, attempts));
        crate::errorf!(logger, "code={:04}", 7);
        logger.error(&format!("code={:04}", 7));

        let low = low.records();
        let high = high.records();
        assert_eq!(low[0].message, low[1].message);
        assert_eq!(high[0].message, high[1].message);
        assert_eq!(high[0].message, "code=0007");
    }

    #[test]
    fn formatted_calls_keep_the_severity_and_caller() {
        let (logger, low, high) = capture_logger(true, false);

        let line = line!() + 1;
        crate::warnf!(logger, "{}", "w");
        crate::debugf!(logger, "{}", "d");

        let low = low.records();
        assert_eq!(low[0].severity, Severity::WARN);
        assert_eq!(low[1].severity, Severity::DEBUG);
        assert_eq!(low[0].caller.as_ref().map(|c| c.1), Some(line));
        assert!(high.records().is_empty());
    }

    #[test]
    fn broken_display_does_not_panic() {
        struct Broken;

        impl fmt::Display for Broken {
            fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Err(fmt::Error)
            }
        }

        let (logger, low, _high) = capture_logger(false, false);

        crate::infof!(logger, "value: {}", Broken);

        let message = &low.records()[0].message;
        assert!(message.starts_with("value: "), "{message}");
        assert!(message.ends_with("<formatting failed>"), "{message}");
    }

    #[test]
    fn failing_sink_does_not_stop_the_others() {
        let capture = Capture::default();
        let logger = Builder::new()
            .with_sink_set(SinkSet::new())
            .with_sink(Priority::High, Box::new(Failing))
            .with_sink(Priority::High, Box::new(capture.clone()))
            .build()
            .unwrap();

        logger.error("first");
        logger.error("second");
        logger.flush();

        assert_eq!(capture.records().len(), 2);
    }

    #[test]
    fn levels_without_a_route_are_disabled() {
        let (logger, low, high) = capture_logger(false, false);

        assert!(logger.is_enabled(Severity::DEBUG));
        assert!(!logger.is_enabled(Severity::custom(-5)));

        logger.emit(Severity::custom(-5), "ignored");

        assert!(low.records().is_empty());
        assert!(high.records().is_empty());
    }

    #[test]
    fn log_records_are_bridged() {
        let (logger, low, high) = capture_logger(true, false);

        Log::log(
            &logger,
            &log::Record::builder()
                .level(log::Level::Warn)
                .args(format_args!("from log {}", 1))
                .file(Some("src/bridge/mod.rs"))
                .line(Some(9))
                .build(),
        );
        Log::log(
            &logger,
            &log::Record::builder()
                .level(log::Level::Trace)
                .args(format_args!("too verbose"))
                .build(),
        );

        let low = low.records();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].message, "from log 1");
        assert_eq!(low[0].caller, Some(("src/bridge/mod.rs".to_string(), 9)));
        assert!(high.records().is_empty());

        let metadata = log::Metadata::builder().level(log::Level::Error).build();
        assert!(Log::enabled(&logger, &metadata));
    }
}
