//! Calling-convention adapter: argument and return slots as register reads.

use crate::arch::{AbiError, ArchProfile};
use crate::types::MAX_SLOTS;

/// Read access to an emulated CPU's general-purpose register file.
///
/// Implemented by the host emulator. Indices are architecture-specific
/// register numbers (e.g. `10` for RISC-V `a0`).
pub trait RegisterFile {
    /// Read a register.
    fn read_register(&self, index: usize) -> u64;
}

// Registers beyond the end of a slice-backed file read as zero.
impl RegisterFile for [u64] {
    fn read_register(&self, index: usize) -> u64 {
        self.get(index).copied().unwrap_or(0)
    }
}

impl<const N: usize> RegisterFile for [u64; N] {
    fn read_register(&self, index: usize) -> u64 {
        self.as_slice().read_register(index)
    }
}

impl RegisterFile for Vec<u64> {
    fn read_register(&self, index: usize) -> u64 {
        self.as_slice().read_register(index)
    }
}

impl<R: RegisterFile + ?Sized> RegisterFile for &R {
    fn read_register(&self, index: usize) -> u64 {
        (**self).read_register(index)
    }
}

/// Projects abstract argument/return slots onto concrete registers.
///
/// The adapter is a pure view of the register file: it never inspects
/// guest memory.
pub struct CallingConvention<'a, R: RegisterFile + ?Sized> {
    profile: ArchProfile,
    regs: &'a R,
}

impl<'a, R: RegisterFile + ?Sized> CallingConvention<'a, R> {
    /// Create an adapter over a register file.
    pub const fn new(profile: ArchProfile, regs: &'a R) -> Self {
        Self { profile, regs }
    }

    /// Architecture profile in use.
    pub const fn profile(&self) -> &ArchProfile {
        &self.profile
    }

    /// Register index backing an argument slot.
    ///
    /// # Errors
    ///
    /// Returns an error if `slot` is not below [`MAX_SLOTS`] or maps past
    /// the end of the register file.
    pub const fn argument_register(&self, slot: usize) -> Result<usize, AbiError> {
        match self.profile.first_arg_reg.checked_add(slot) {
            Some(reg) if slot < MAX_SLOTS && reg < self.profile.num_regs => Ok(reg),
            _ => Err(AbiError::SlotOutOfRange {
                slot,
                max: MAX_SLOTS,
            }),
        }
    }

    /// Read the raw value of an argument slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is out of range.
    pub fn read_argument(&self, slot: usize) -> Result<u64, AbiError> {
        let reg = self.argument_register(slot)?;
        Ok(self.regs.read_register(reg))
    }

    /// Read the raw scalar return value.
    pub fn read_return(&self) -> u64 {
        self.regs.read_register(self.profile.return_reg)
    }
}
