//! Guest-memory access for emulated call tracing.
//!
//! The tracer never trusts a guest pointer: strings are pulled out of the
//! traced process through the [`GuestMemory`] primitive in fixed 8-byte
//! windows, with a hard cap on how many windows a single string may span.
//!
//! ```ignore
//! use emtrace_guest::{CStringReader, SegmentedMemory};
//!
//! let mut mem = SegmentedMemory::new();
//! mem.map(0x1000, b"hello\0".to_vec())?;
//! let s = CStringReader::new(&mem).read(0x1000)?;
//! assert_eq!(s.to_string(), "\"hello\"");
//! ```

mod cstring;
mod memory;

pub use cstring::{
    CStringReader, DEFAULT_MAX_WINDOWS, GuestString, StringReadError, WINDOW_SIZE, write_escaped,
    write_quoted,
};
pub use memory::{GuestMemory, GuestMemoryError, SegmentedMemory};
