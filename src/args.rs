use std::{path::PathBuf, time::Duration};

use clap::Parser;
use lklog::{logging::DEFAULT_LOG_DIR, SinkSet};
use yansi::Condition;

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Writes one sample record per level through the lklog sinks.", long_about = None)]
pub struct Args {
    #[arg(long, help = "Write every record to a single all_log.log instead of info.log and error.log.")]
    pub unified: bool,

    #[arg(long, help = "Attach the caller's file and line to every record.")]
    pub caller: bool,

    #[arg(long, help = "Attach a stack trace to error records.")]
    pub stacktrace: bool,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_LOG_DIR, help = "Directory the log files are written to.")]
    pub log_dir: PathBuf,

    #[arg(
        long,
        value_parser = humantime::parse_duration,
        help = "How long rotated files are kept, e.g. 7days. Defaults to 30 days."
    )]
    pub max_age: Option<Duration>,

    #[arg(long, help = "Gzip rotated log files.")]
    pub compress: bool,

    #[arg(long, help = "Never color console output. By default colors follow whether stdout is a terminal.")]
    pub no_color: bool,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        help = "Print internal diagnostics to stderr."
    )]
    pub verbose: u8,
}

impl Args {
    pub fn sink_set(&self) -> SinkSet {
        let mut sink_set = if self.unified {
            SinkSet::unified(&self.log_dir)
        } else {
            SinkSet::split(&self.log_dir)
        };

        if let Some(max_age) = self.max_age {
            sink_set = sink_set.with_max_age(max_age);
        }

        sink_set.with_compress(self.compress)
    }

    pub fn console_condition(&self) -> Condition {
        if self.no_color {
            Condition::NEVER
        } else {
            Condition::STDOUT_IS_TTY
        }
    }

    pub fn diagnostics_level(&self) -> Option<tracing::Level> {
        match self.verbose {
            0 => None,
            1 => Some(tracing::Level::WARN),
            2 => Some(tracing::Level::DEBUG),
            3_u8..=u8::MAX => Some(tracing::Level::TRACE),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::IsTerminal;

    use super::*;
    use lklog::logging::{Destination, FileTarget};

    fn file_targets(set: &SinkSet) -> Vec<FileTarget> {
        set.specs()
            .iter()
            .filter_map(|spec| match &spec.destination {
                Destination::File(target) => Some(target.clone()),
                Destination::Stdout => None,
            })
            .collect()
    }

    #[test]
    fn defaults_to_split_files_in_log_dir() {
        let args = Args::parse_from(["lklog"]);
        let targets = file_targets(&args.sink_set());

        assert!(targets.iter().any(|t| t.path == PathBuf::from("./log/info.log")));
        assert!(targets.iter().any(|t| t.path == PathBuf::from("./log/error.log")));
        assert_eq!(args.diagnostics_level(), None);
        assert_eq!(
            (*args.console_condition())(),
            std::io::stdout().is_terminal()
        );
    }

    #[test]
    fn no_color_disables_console_colors() {
        let args = Args::parse_from(["lklog", "--no-color"]);

        assert!(!(*args.console_condition())());
    }

    #[test]
    fn unified_flag_selects_the_shared_file() {
        let args = Args::parse_from(["lklog", "--unified", "--log-dir", "/tmp/app"]);
        let targets = file_targets(&args.sink_set());

        assert!(targets
            .iter()
            .all(|t| t.path == PathBuf::from("/tmp/app").join("all_log.log")));
    }

    #[test]
    fn max_age_and_compress_reach_every_file() {
        let args = Args::parse_from(["lklog", "--max-age", "7days", "--compress", "-vv"]);

        for target in file_targets(&args.sink_set()) {
            assert_eq!(target.max_age, Some(Duration::from_secs(7 * 24 * 60 * 60)));
            assert!(target.compress);
        }
        assert_eq!(args.diagnostics_level(), Some(tracing::Level::DEBUG));
    }
}
