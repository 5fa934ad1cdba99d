//! ltrace-style library call tracing for instruction-level emulators.
//!
//! The emulator reports breakpoint hits on traced symbols; the tracer decodes
//! arguments and return values from the register file and guest memory and
//! appends lines such as `malloc(16) = 0x5555` to a [`LogSink`].
//!
//! ```ignore
//! use emtrace::{CallEvent, CallTracer, TraceConfig};
//!
//! let tracer = CallTracer::libc(TraceConfig::default());
//! let mut session = tracer.session(Vec::new());
//!
//! // From the emulator's breakpoint hook:
//! tracer.handle_event(&mut session, CallEvent::entry("malloc"), &regs, &memory);
//! tracer.handle_event(&mut session, CallEvent::ret("malloc"), &regs, &memory);
//! ```

pub mod config;
pub mod correlator;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod prototypes;
pub mod render;
pub mod replay;
pub mod session;
pub mod sink;

pub use config::{DEFAULT_BANNER, DEFAULT_SUPPRESSED, TraceConfig};
pub use correlator::{Correlator, ReturnDecision};
pub use dispatch::{CallEvent, CallTracer, EventKind, Outcome};
pub use error::{Error, Result};
pub use prototypes::{load_prototypes, parse_prototypes, parse_type};
pub use replay::{ReplayStats, Script, Step};
pub use session::{CpuId, SharedSession, TraceSession};
pub use sink::{LogSink, WriterSink};

pub use emtrace_abi::{
    Arch, ArchProfile, CallingConvention, RegisterFile, Signature, SignatureTable, TypeTag,
};
pub use emtrace_guest::{CStringReader, GuestMemory, GuestMemoryError, SegmentedMemory};
