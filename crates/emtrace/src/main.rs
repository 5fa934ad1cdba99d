//! emtrace CLI - library call tracer for emulated programs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize metrics recorder if enabled
    let metrics_handle = if cli.metrics {
        emtrace::metrics::CliRecorder::new().install()
    } else {
        None
    };

    emtrace::metrics::init();

    let default_level = if cli.verbose {
        "emtrace=debug"
    } else if cli.silent {
        "emtrace=error"
    } else {
        "emtrace=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Diagnostics go to stderr; stdout carries the trace.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = commands::run_command(&cli);

    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}
