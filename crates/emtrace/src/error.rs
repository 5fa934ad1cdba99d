use thiserror::Error;

/// Tracer errors.
///
/// Event dispatch never fails; these cover setup: loading prototype files,
/// parsing replay scripts, and writing output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("prototype line {line}: {message}")]
    Prototype { line: usize, message: String },
    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
