//! Command implementations.

mod replay;
mod signatures;

use std::path::PathBuf;

use emtrace::SignatureTable;
use tracing::error;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Replay {
            script,
            arch,
            prototypes,
            max_string_windows,
            warn_displaced,
            banner,
            output,
        } => replay::cmd_replay(&replay::ReplayArgs {
            script,
            arch: *arch,
            prototypes,
            max_string_windows: *max_string_windows,
            warn_displaced: *warn_displaced,
            banner,
            output: output.as_ref(),
        }),
        Commands::Signatures { prototypes } => signatures::cmd_signatures(prototypes),
    }
}

/// Built-in libc signatures overlaid with prototype files, in order.
fn build_table(prototypes: &[PathBuf]) -> Option<SignatureTable> {
    let mut table = SignatureTable::libc();
    for path in prototypes {
        match emtrace::load_prototypes(path) {
            Ok(extra) => table.extend(extra),
            Err(e) => {
                error!(error = %e, path = %path.display(), "failed to load prototypes");
                return None;
            }
        }
    }
    Some(table)
}
