//! Signatures command.

use std::io::{self, Write};
use std::path::PathBuf;

use tracing::error;

use super::build_table;
use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `signatures` command: print the table as prototypes.
pub fn cmd_signatures(prototypes: &[PathBuf]) -> i32 {
    let Some(table) = build_table(prototypes) else {
        return EXIT_FAILURE;
    };

    let mut out = io::stdout().lock();
    for signature in table.sorted() {
        if let Err(e) = writeln!(out, "{signature}") {
            error!(error = %e, "failed to write signatures");
            return EXIT_FAILURE;
        }
    }
    EXIT_SUCCESS
}
