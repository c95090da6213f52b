mod args;

use std::process::ExitCode;

use clap::Parser;
use eyre::Context;
use lklog::{Builder, Logger};

use crate::args::Args;

fn run(args: Args) -> eyre::Result<()> {
    if let Some(level) = args.diagnostics_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }

    yansi::whenever(args.console_condition());

    let log: Logger = Builder::new()
        .with_sink_set(args.sink_set())
        .with_caller(args.caller)
        .with_stacktrace(args.stacktrace)
        .build()
        .with_context(|| format!("Failed setting up logging in {}", args.log_dir.display()))?;

    log.debug("hello debug");
    log.info("hello info");
    log.warn("hello warn");
    log.error("hello error");
    lklog::infof!(log, "wrote sample records to {}", args.log_dir.display());

    log.flush();
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Err(err) => {
            let root = err.root_cause();

            eprint!("\x1b[31m");
            eprintln!("Error: {}", err);
            eprintln!();
            eprintln!("Caused by:");
            eprint!("  {}", root);
            eprintln!("\x1b[0m");
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::from(0),
    }
}
