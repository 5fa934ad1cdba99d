//! Target architecture profiles.
//!
//! A profile carries exactly what the calling-convention adapter needs to
//! know about a target: where the first argument lives, where the scalar
//! return value lives, and how wide the registers are. Register ABI names
//! are attached so tools can address registers the way the target's
//! documentation does.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// ABI errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("argument slot {slot} is out of range (max {max})")]
    SlotOutOfRange { slot: usize, max: usize },
    #[error("unknown architecture: {0}")]
    UnknownArch(String),
    #[error("unknown register '{name}' for {arch}")]
    UnknownRegister { arch: &'static str, name: String },
}

/// Calling-convention facts for one target architecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchProfile {
    /// Short architecture name.
    pub name: &'static str,
    /// Register index of the first integer argument.
    pub first_arg_reg: usize,
    /// Register index holding a scalar return value.
    pub return_reg: usize,
    /// Number of general-purpose registers in the register file.
    pub num_regs: usize,
    /// Register width in bits (32 or 64).
    pub xlen: u8,
    reg_names: &'static [&'static str],
}

impl ArchProfile {
    /// Create a profile for a target without named registers.
    #[must_use]
    pub const fn new(
        name: &'static str,
        first_arg_reg: usize,
        return_reg: usize,
        num_regs: usize,
        xlen: u8,
    ) -> Self {
        Self {
            name,
            first_arg_reg,
            return_reg,
            num_regs,
            xlen,
            reg_names: &[],
        }
    }

    /// Attach ABI register names, indexed by register number.
    #[must_use]
    pub const fn with_reg_names(mut self, names: &'static [&'static str]) -> Self {
        self.reg_names = names;
        self
    }

    /// ABI name of a register.
    #[must_use]
    pub fn reg_name(&self, index: usize) -> Option<&'static str> {
        self.reg_names.get(index).copied()
    }

    /// Resolve a register by ABI name or by number (`x12`, `r12`, `$12`, `12`).
    ///
    /// # Errors
    ///
    /// Returns an error if the name matches no register of this profile.
    pub fn reg_index(&self, name: &str) -> Result<usize, AbiError> {
        if let Some(index) = self.reg_names.iter().position(|n| *n == name) {
            return Ok(index);
        }
        let digits = name
            .strip_prefix(['x', 'r', '$'])
            .unwrap_or(name);
        match digits.parse::<usize>() {
            Ok(index) if index < self.num_regs => Ok(index),
            _ => Err(AbiError::UnknownRegister {
                arch: self.name,
                name: name.to_string(),
            }),
        }
    }

    /// Interpret a raw register value as a signed integer of register width.
    #[must_use]
    pub const fn signed(&self, value: u64) -> i64 {
        if self.xlen == 32 {
            value as u32 as i32 as i64
        } else {
            value as i64
        }
    }

    /// Truncate a raw register value to register width.
    #[must_use]
    pub const fn unsigned(&self, value: u64) -> u64 {
        if self.xlen == 32 {
            value as u32 as u64
        } else {
            value
        }
    }
}

const RISCV_REG_NAMES: &[&str] = &[
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

const AARCH64_REG_NAMES: &[&str] = &[
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14",
    "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27",
    "x28", "fp", "lr", "sp",
];

const LOONGARCH_REG_NAMES: &[&str] = &[
    "zero", "ra", "tp", "sp", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "t0", "t1", "t2",
    "t3", "t4", "t5", "t6", "t7", "t8", "u0", "fp", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8",
];

// n64 naming: $4-$11 are a0-a7.
const MIPS64_REG_NAMES: &[&str] = &[
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "t0", "t1", "t2",
    "t3", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];

/// Supported target architectures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Arch {
    /// AArch64: arguments in x0-x7, return in x0.
    Aarch64,
    /// RV64: arguments in a0-a7 (x10-x17), return in a0.
    #[default]
    Riscv64,
    /// RV32: same register assignment as RV64 with 32-bit registers.
    Riscv32,
    /// LoongArch64: arguments in a0-a7 (r4-r11), return in a0.
    LoongArch64,
    /// MIPS64 n64: arguments in a0-a7 ($4-$11), return in v0 ($2).
    Mips64,
}

impl Arch {
    /// All supported architectures.
    pub const ALL: [Self; 5] = [
        Self::Aarch64,
        Self::Riscv64,
        Self::Riscv32,
        Self::LoongArch64,
        Self::Mips64,
    ];

    /// Calling-convention profile for this architecture.
    #[must_use]
    pub const fn profile(self) -> ArchProfile {
        match self {
            Self::Aarch64 => ArchProfile::new("aarch64", 0, 0, 32, 64)
                .with_reg_names(AARCH64_REG_NAMES),
            Self::Riscv64 => ArchProfile::new("riscv64", 10, 10, 32, 64)
                .with_reg_names(RISCV_REG_NAMES),
            Self::Riscv32 => ArchProfile::new("riscv32", 10, 10, 32, 32)
                .with_reg_names(RISCV_REG_NAMES),
            Self::LoongArch64 => ArchProfile::new("loongarch64", 4, 4, 32, 64)
                .with_reg_names(LOONGARCH_REG_NAMES),
            Self::Mips64 => ArchProfile::new("mips64", 4, 2, 32, 64)
                .with_reg_names(MIPS64_REG_NAMES),
        }
    }

    /// Canonical architecture name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.profile().name
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "riscv64" | "rv64" => Ok(Self::Riscv64),
            "riscv32" | "rv32" => Ok(Self::Riscv32),
            "loongarch64" | "la64" => Ok(Self::LoongArch64),
            "mips64" | "mips64el" => Ok(Self::Mips64),
            _ => Err(AbiError::UnknownArch(s.to_string())),
        }
    }
}
