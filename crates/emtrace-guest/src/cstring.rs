//! NUL-terminated string reads from guest memory.
//!
//! Strings are read in fixed [`WINDOW_SIZE`]-byte windows starting at the
//! string address, advancing one window at a time until a window contains a
//! NUL byte. The number of windows per string is capped so a pointer into
//! memory without a terminator cannot stall the emulator.

use std::fmt;

use thiserror::Error;

use crate::memory::{GuestMemory, GuestMemoryError};

/// Bytes fetched per guest read.
pub const WINDOW_SIZE: usize = 8;

/// Default window cap (512 bytes).
pub const DEFAULT_MAX_WINDOWS: usize = 64;

/// String read failures. Both carry the bytes decoded before the failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StringReadError {
    #[error("string at {start:#x} runs into unreadable memory at {addr:#x}")]
    Unmapped {
        start: u64,
        addr: u64,
        partial: Vec<u8>,
        #[source]
        source: GuestMemoryError,
    },

    #[error("string at {start:#x} has no NUL within {windows} windows")]
    Truncated {
        start: u64,
        partial: Vec<u8>,
        windows: usize,
    },
}

impl StringReadError {
    /// Bytes decoded before the read stopped.
    #[must_use]
    pub fn partial(&self) -> &[u8] {
        match self {
            Self::Unmapped { partial, .. } | Self::Truncated { partial, .. } => partial,
        }
    }
}

/// A string decoded from guest memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuestString {
    /// The pointer was null.
    Null,
    /// Bytes before the terminating NUL.
    Text(Vec<u8>),
}

impl GuestString {
    /// Raw bytes (empty for a null pointer).
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Null => &[],
            Self::Text(bytes) => bytes,
        }
    }

    /// Append the display form: `(nil)` or the quoted, escaped text.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Null => out.extend_from_slice(b"(nil)"),
            Self::Text(bytes) => write_quoted(bytes, out),
        }
    }
}

impl fmt::Display for GuestString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write_to(&mut out);
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

/// Append `bytes` with each newline written as the two characters `\n`.
///
/// Every other byte, printable or not, is copied verbatim.
pub fn write_escaped(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        if b == b'\n' {
            out.extend_from_slice(b"\\n");
        } else {
            out.push(b);
        }
    }
}

/// Append `bytes` escaped and wrapped in double quotes.
pub fn write_quoted(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'"');
    write_escaped(bytes, out);
    out.push(b'"');
}

/// Windowed C-string reader over a guest memory primitive.
#[derive(Clone, Debug)]
pub struct CStringReader<M> {
    memory: M,
    max_windows: usize,
}

impl<M: GuestMemory> CStringReader<M> {
    /// Create a reader with the default window cap.
    pub const fn new(memory: M) -> Self {
        Self {
            memory,
            max_windows: DEFAULT_MAX_WINDOWS,
        }
    }

    /// Set the maximum number of windows read per string (at least one).
    #[must_use]
    pub fn with_max_windows(mut self, max_windows: usize) -> Self {
        self.max_windows = max_windows.max(1);
        self
    }

    /// Maximum number of windows read per string.
    pub const fn max_windows(&self) -> usize {
        self.max_windows
    }

    /// Read the NUL-terminated string at `addr`.
    ///
    /// A null pointer yields [`GuestString::Null`] without touching memory.
    ///
    /// # Errors
    ///
    /// Returns [`StringReadError::Unmapped`] if memory before the terminator
    /// is unreadable, and [`StringReadError::Truncated`] if no terminator is
    /// found within the window cap.
    pub fn read(&self, addr: u64) -> Result<GuestString, StringReadError> {
        if addr == 0 {
            return Ok(GuestString::Null);
        }

        let mut text = Vec::new();
        let mut cursor = addr;
        for _ in 0..self.max_windows {
            let mut window = [0u8; WINDOW_SIZE];
            if let Err((readable, fault_addr, source)) = self.read_window(cursor, &mut window) {
                text.extend_from_slice(&window[..readable]);
                return Err(StringReadError::Unmapped {
                    start: addr,
                    addr: fault_addr,
                    partial: text,
                    source,
                });
            }
            if let Some(nul) = window.iter().position(|&b| b == 0) {
                text.extend_from_slice(&window[..nul]);
                return Ok(GuestString::Text(text));
            }
            text.extend_from_slice(&window);

            let Some(next) = cursor.checked_add(WINDOW_SIZE as u64) else {
                return Err(StringReadError::Unmapped {
                    start: addr,
                    addr: cursor,
                    partial: text,
                    source: GuestMemoryError::Unmapped {
                        addr: cursor,
                        len: WINDOW_SIZE,
                    },
                });
            };
            cursor = next;
        }

        Err(StringReadError::Truncated {
            start: addr,
            partial: text,
            windows: self.max_windows,
        })
    }

    /// Fill one window.
    ///
    /// If the whole window is not readable (e.g. the string ends just before
    /// an unmapped page), falls back to byte reads and succeeds once a NUL
    /// has been read. On failure returns the count of bytes read, the
    /// faulting address and the underlying error.
    fn read_window(
        &self,
        cursor: u64,
        window: &mut [u8; WINDOW_SIZE],
    ) -> Result<(), (usize, u64, GuestMemoryError)> {
        if self.memory.read_memory(cursor, window).is_ok() {
            return Ok(());
        }
        for i in 0..WINDOW_SIZE {
            let byte_addr = cursor.wrapping_add(i as u64);
            self.memory
                .read_memory(byte_addr, &mut window[i..=i])
                .map_err(|e| (i, byte_addr, e))?;
            if window[i] == 0 {
                return Ok(());
            }
        }
        Ok(())
    }
}
