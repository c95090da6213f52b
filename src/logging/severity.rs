use std::{borrow::Cow, fmt};

use yansi::Color;

/// Severity of a log record.
///
/// Severities are totally ordered by their numeric value. The named levels cover
/// `DEBUG` (-1) through `FATAL` (5); any other value is a custom level and renders with
/// a numeric tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(i8);

impl Severity {
    pub const DEBUG: Severity = Severity(-1);
    pub const INFO: Severity = Severity(0);
    pub const WARN: Severity = Severity(1);
    pub const ERROR: Severity = Severity(2);
    pub const DPANIC: Severity = Severity(3);
    pub const PANIC: Severity = Severity(4);
    pub const FATAL: Severity = Severity(5);

    pub const fn custom(value: i8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i8 {
        self.0
    }

    /// Bracketed tag, e.g. `[WARN]`, or `[<value>]` for custom levels.
    pub fn tag(self) -> Cow<'static, str> {
        match lookup(self) {
            Some(style) => Cow::Borrowed(style.tag),
            None => Cow::Owned(format!("[{}]", self.0)),
        }
    }

    /// Console color of the tag.
    pub fn color(self) -> Color {
        lookup(self).map_or(UNKNOWN_COLOR, |style| style.color)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match lookup(*self) {
            Some(style) => f.write_str(style.tag.trim_matches(['[', ']'])),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::ERROR,
            log::Level::Warn => Severity::WARN,
            log::Level::Info => Severity::INFO,
            log::Level::Debug => Severity::DEBUG,
            // Below DEBUG: neither priority accepts it.
            log::Level::Trace => Severity::custom(-2),
        }
    }
}

struct LevelStyle {
    severity: Severity,
    tag: &'static str,
    color: Color,
}

const UNKNOWN_COLOR: Color = Color::Rgb(0xFF, 0xFF, 0x00);

static LEVEL_STYLES: [LevelStyle; 7] = [
    LevelStyle {
        severity: Severity::DEBUG,
        tag: "[DEBUG]",
        color: Color::Rgb(0x7E, 0xC0, 0xEE),
    },
    LevelStyle {
        severity: Severity::INFO,
        tag: "[INFO]",
        color: Color::Blue,
    },
    LevelStyle {
        severity: Severity::WARN,
        tag: "[WARN]",
        color: Color::Rgb(0xB8, 0x97, 0x15),
    },
    LevelStyle {
        severity: Severity::ERROR,
        tag: "[ERROR]",
        color: Color::Red,
    },
    LevelStyle {
        severity: Severity::DPANIC,
        tag: "[DPANIC]",
        color: Color::Red,
    },
    LevelStyle {
        severity: Severity::PANIC,
        tag: "[PANIC]",
        color: Color::Red,
    },
    LevelStyle {
        severity: Severity::FATAL,
        tag: "[FATAL]",
        color: Color::Red,
    },
];

fn lookup(severity: Severity) -> Option<&'static LevelStyle> {
    LEVEL_STYLES.iter().find(|style| style.severity == severity)
}
