//! Call signatures and calling-convention adapters for emulated call tracing.
//!
//! This crate knows how a traced library function looks from the outside:
//! which argument slots it declares, how each slot is encoded, and which
//! guest register holds each slot on a given target architecture. It never
//! touches guest memory; string arguments are resolved by `emtrace-guest`.
//!
//! # Usage
//!
//! ```ignore
//! use emtrace_abi::{Arch, CallingConvention, SignatureTable};
//!
//! let table = SignatureTable::libc();
//! let malloc = table.get("malloc").unwrap();
//! let regs = [0u64; 32];
//! let cc = CallingConvention::new(Arch::Riscv64.profile(), &regs);
//! let size = cc.read_argument(0)?;
//! ```

mod arch;
mod convention;
mod libc;
mod table;
mod types;

pub use arch::{AbiError, Arch, ArchProfile};
pub use convention::{CallingConvention, RegisterFile};
pub use table::SignatureTable;
pub use types::{MAX_SLOTS, Signature, SignatureError, TypeTag};
