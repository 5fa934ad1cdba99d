//! Guest memory read primitive and a segment-backed implementation.

use std::collections::BTreeMap;

use thiserror::Error;

/// Guest memory access error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuestMemoryError {
    #[error("unmapped guest memory: {len} bytes at {addr:#x}")]
    Unmapped { addr: u64, len: usize },

    #[error("segment at {addr:#x} ({len} bytes) overlaps an existing mapping")]
    Overlap { addr: u64, len: usize },

    #[error("segment at {addr:#x} wraps the address space")]
    Overflow { addr: u64 },
}

/// Debug-style read access to the traced process's address space.
///
/// Implemented by the host emulator. Reads must not have guest-visible side
/// effects (no page faults delivered to the guest). A read either fills the
/// whole buffer or fails.
pub trait GuestMemory {
    /// Read `buf.len()` bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if any byte of the range is not readable.
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), GuestMemoryError>;
}

impl<M: GuestMemory + ?Sized> GuestMemory for &M {
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), GuestMemoryError> {
        (**self).read_memory(addr, buf)
    }
}

/// Sparse guest address space made of non-overlapping byte segments.
///
/// Used to replay recorded traces and to stand in for an emulator in tests.
#[derive(Clone, Debug, Default)]
pub struct SegmentedMemory {
    /// Segments keyed by base address.
    segments: BTreeMap<u64, Vec<u8>>,
}

impl SegmentedMemory {
    /// Create an empty address space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `data` at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment overlaps an existing one or runs past
    /// the end of the 64-bit address space.
    pub fn map(&mut self, addr: u64, data: Vec<u8>) -> Result<(), GuestMemoryError> {
        let len = data.len();
        if len == 0 {
            return Ok(());
        }
        let end = addr
            .checked_add(len as u64)
            .ok_or(GuestMemoryError::Overflow { addr })?;

        // Closest segment starting at or below the new one, and the first
        // segment starting above it.
        let below = self.segments.range(..=addr).next_back();
        let above = self.segments.range(addr..).next();
        let overlaps_below = below.is_some_and(|(base, seg)| base + seg.len() as u64 > addr);
        let overlaps_above = above.is_some_and(|(base, _)| *base < end);
        if overlaps_below || overlaps_above {
            return Err(GuestMemoryError::Overlap { addr, len });
        }

        self.segments.insert(addr, data);
        Ok(())
    }

    /// Number of mapped segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total mapped bytes.
    #[must_use]
    pub fn mapped_bytes(&self) -> usize {
        self.segments.values().map(Vec::len).sum()
    }
}

impl GuestMemory for SegmentedMemory {
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), GuestMemoryError> {
        let unmapped = GuestMemoryError::Unmapped {
            addr,
            len: buf.len(),
        };
        if buf.is_empty() {
            return Ok(());
        }
        let (base, segment) = self
            .segments
            .range(..=addr)
            .next_back()
            .ok_or_else(|| unmapped.clone())?;
        let offset = usize::try_from(addr - base).map_err(|_| unmapped.clone())?;
        let bytes = offset
            .checked_add(buf.len())
            .and_then(|end| segment.get(offset..end))
            .ok_or(unmapped)?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}
