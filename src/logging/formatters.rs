use std::{backtrace::Backtrace, sync::Arc};

use yansi::{Color, Paint};

use super::{LogFormatter, Record, Severity};

/// Formatting settings for one output style.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub datetime_format: String,
    pub use_ansi: bool,
    pub time_color: Color,
    pub separator: String,
}

impl EncoderConfig {
    /// Colored style used for standard output.
    pub fn console() -> Self {
        Self {
            datetime_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            use_ansi: true,
            time_color: Color::Rgb(0x3F, 0xAF, 0x56),
            separator: " ".to_string(),
        }
    }

    /// Plain style used for log files.
    pub fn file() -> Self {
        Self {
            use_ansi: false,
            ..Self::console()
        }
    }
}

/// Renders a record as `[time] [LEVEL] - dir/file.rs:line - message`.
pub struct LineFormatter {
    config: Arc<EncoderConfig>,
}

impl LineFormatter {
    pub fn new(config: Arc<EncoderConfig>) -> Self {
        Self { config }
    }

    fn timestamp(&self, record: &Record) -> String {
        let time = format!(
            "[{}]",
            record.timestamp.format(&self.config.datetime_format)
        );

        if self.config.use_ansi {
            time.fg(self.config.time_color).to_string()
        } else {
            time
        }
    }

    fn format_level(&self, severity: Severity) -> String {
        let tag = severity.tag();

        if self.config.use_ansi {
            tag.fg(severity.color()).to_string()
        } else {
            tag.into_owned()
        }
    }

    fn format_caller(&self, record: &Record) -> Option<String> {
        record
            .caller
            .as_ref()
            .map(|caller| format!("- {} -", caller.trimmed_path()))
    }
}

impl LogFormatter for LineFormatter {
    fn format(&self, record: &Record) -> String {
        let mut parts = vec![self.timestamp(record), self.format_level(record.severity)];
        parts.extend(self.format_caller(record));
        parts.push(record.message.to_string());

        let mut line = parts.join(&self.config.separator);

        if let Some(stack) = &record.stack {
            line.push('\n');
            line.push_str(&caller_stack(stack));
        }

        line
    }
}

/// Symbol prefix of the frames the logger adds on top of every captured stack.
const LOGGER_FRAME: &str = concat!(env!("CARGO_CRATE_NAME"), "::logging::logger::Logger");

/// Renders `stack` starting at the first frame outside the logger.
fn caller_stack(stack: &Backtrace) -> String {
    skip_logger_frames(stack.to_string().trim_end())
}

fn skip_logger_frames(rendered: &str) -> String {
    let mut skipping = true;
    let mut kept = Vec::new();

    for line in rendered.lines() {
        if skipping && is_frame_header(line) {
            skipping = line.contains(LOGGER_FRAME);
        }
        if !skipping {
            kept.push(line);
        }
    }

    // Disabled or unsupported backtraces have no frames to skip.
    if kept.is_empty() {
        return rendered.to_string();
    }

    kept.join("\n")
}

/// Frame headers look like `  12: path::to::function`.
fn is_frame_header(line: &str) -> bool {
    line.trim_start()
        .split_once(": ")
        .is_some_and(|(index, _)| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}
