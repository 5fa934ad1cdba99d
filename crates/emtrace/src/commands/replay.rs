//! Replay command.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use emtrace::{Arch, CallTracer, Script, TraceConfig, WriterSink};
use tracing::{error, info};

use super::build_table;
use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

pub struct ReplayArgs<'a> {
    pub script: &'a PathBuf,
    pub arch: Arch,
    pub prototypes: &'a [PathBuf],
    pub max_string_windows: usize,
    pub warn_displaced: bool,
    pub banner: &'a str,
    pub output: Option<&'a PathBuf>,
}

/// Handle the `replay` command.
pub fn cmd_replay(args: &ReplayArgs<'_>) -> i32 {
    let Some(table) = build_table(args.prototypes) else {
        return EXIT_FAILURE;
    };

    let config = TraceConfig::default()
        .with_arch(args.arch)
        .with_max_string_windows(args.max_string_windows)
        .with_displaced_call_warnings(args.warn_displaced)
        .with_banner(args.banner);
    let tracer = CallTracer::new(table, config);

    let script = match Script::load(args.script, tracer.profile()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %args.script.display(), "failed to load script");
            return EXIT_FAILURE;
        }
    };

    match args.output {
        Some(path) => match File::create(path) {
            Ok(file) => run(&tracer, &script, BufWriter::new(file)),
            Err(e) => {
                error!(error = %e, path = %path.display(), "failed to create output file");
                EXIT_FAILURE
            }
        },
        None => run(&tracer, &script, io::stdout().lock()),
    }
}

fn run<W: Write>(tracer: &CallTracer, script: &Script, writer: W) -> i32 {
    let mut session = tracer.session(WriterSink::new(writer));
    let stats = match script.replay(tracer, &mut session) {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "replay failed");
            return EXIT_FAILURE;
        }
    };

    if let Err(e) = session.into_sink().finish() {
        error!(error = %e, "failed to write trace");
        return EXIT_FAILURE;
    }

    info!(
        arch = tracer.profile().name,
        events = stats.events,
        rendered = stats.rendered,
        spurious = stats.spurious,
        suppressed = stats.suppressed,
        "replay finished"
    );
    EXIT_SUCCESS
}
