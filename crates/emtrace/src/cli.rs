//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use emtrace::Arch;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "emtrace")]
#[command(about = "ltrace-style library call tracer for emulated programs")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a recorded event script through the tracer
    Replay {
        /// Event script
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Target architecture: aarch64, riscv64, riscv32, loongarch64, mips64
        #[arg(long, default_value = "riscv64")]
        arch: Arch,

        /// Extra prototype file (repeatable; later files override earlier)
        #[arg(long = "prototypes", value_name = "FILE")]
        prototypes: Vec<PathBuf>,

        /// Maximum 8-byte windows read per string argument
        #[arg(long, default_value_t = emtrace_guest::DEFAULT_MAX_WINDOWS)]
        max_string_windows: usize,

        /// Warn when a call enters before the previous one returned
        #[arg(long)]
        warn_displaced: bool,

        /// Session banner
        #[arg(long, default_value = emtrace::DEFAULT_BANNER)]
        banner: String,

        /// Write the trace to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the active signature table
    Signatures {
        /// Extra prototype file (repeatable)
        #[arg(long = "prototypes", value_name = "FILE")]
        prototypes: Vec<PathBuf>,
    },
}
