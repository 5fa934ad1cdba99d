//! Symbol dispatch: the entry point called from the emulator's breakpoint hook.

use std::fmt;

use emtrace_abi::{ArchProfile, CallingConvention, RegisterFile, SignatureTable};
use emtrace_guest::{CStringReader, GuestMemory, StringReadError};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use crate::config::TraceConfig;
use crate::correlator::ReturnDecision;
use crate::metrics;
use crate::render::{self, Renderer};
use crate::session::{CpuId, SharedSession, TraceSession};
use crate::sink::LogSink;

/// Entry or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Entry,
    Return,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A breakpoint hit on a traced symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEvent<'a> {
    pub symbol: &'a str,
    pub kind: EventKind,
    pub cpu: CpuId,
}

impl<'a> CallEvent<'a> {
    pub const fn new(symbol: &'a str, is_return: bool) -> Self {
        let kind = if is_return {
            EventKind::Return
        } else {
            EventKind::Entry
        };
        Self {
            symbol,
            kind,
            cpu: 0,
        }
    }

    pub const fn entry(symbol: &'a str) -> Self {
        Self::new(symbol, false)
    }

    pub const fn ret(symbol: &'a str) -> Self {
        Self::new(symbol, true)
    }

    /// Deliver the event on emulated CPU `cpu`.
    #[must_use]
    pub const fn on_cpu(mut self, cpu: CpuId) -> Self {
        self.cpu = cpu;
        self
    }

    pub const fn is_return(&self) -> bool {
        matches!(self.kind, EventKind::Return)
    }
}

/// What dispatch did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Entry rendered. `displaced` is the call that was still pending.
    Entered {
        known: bool,
        displaced: Option<String>,
    },
    /// Return rendered.
    Returned { known: bool },
    /// Denylisted symbol; nothing rendered.
    Suppressed,
    /// Return without a matching pending call; nothing rendered.
    SpuriousReturn,
}

impl Outcome {
    /// Whether the event produced trace text.
    pub const fn rendered(&self) -> bool {
        matches!(self, Self::Entered { .. } | Self::Returned { .. })
    }
}

/// Table-driven call tracer.
///
/// Holds the read-only configuration: signatures, calling convention,
/// denylist and string cap. All mutable state lives in the
/// [`TraceSession`] passed to [`CallTracer::handle_event`].
#[derive(Debug, Clone)]
pub struct CallTracer {
    table: SignatureTable,
    profile: ArchProfile,
    suppressed: FxHashSet<String>,
    max_string_windows: usize,
    warn_on_displaced_call: bool,
    banner: String,
}

impl CallTracer {
    pub fn new(table: SignatureTable, config: TraceConfig) -> Self {
        Self {
            table,
            profile: config.profile,
            suppressed: config.suppressed.into_iter().collect(),
            max_string_windows: config.max_string_windows,
            warn_on_displaced_call: config.warn_on_displaced_call,
            banner: config.banner,
        }
    }

    /// Tracer over the built-in libc signatures.
    pub fn libc(config: TraceConfig) -> Self {
        Self::new(SignatureTable::libc(), config)
    }

    pub const fn table(&self) -> &SignatureTable {
        &self.table
    }

    pub const fn profile(&self) -> &ArchProfile {
        &self.profile
    }

    pub fn is_suppressed(&self, symbol: &str) -> bool {
        self.suppressed.contains(symbol)
    }

    /// Start a session writing to `sink`.
    pub fn session<S: LogSink>(&self, sink: S) -> TraceSession<S> {
        TraceSession::new(sink, self.banner.as_str())
    }

    /// Start a session that can be shared across emulator threads.
    pub fn shared_session<S: LogSink>(&self, sink: S) -> SharedSession<S> {
        SharedSession::new(self.session(sink))
    }

    /// Handle one breakpoint event.
    ///
    /// Never fails: unknown symbols render a placeholder, spurious returns
    /// are dropped, and unreadable strings render as markers.
    pub fn handle_event<S, R, M>(
        &self,
        session: &mut TraceSession<S>,
        event: CallEvent<'_>,
        regs: &R,
        memory: M,
    ) -> Outcome
    where
        S: LogSink,
        R: RegisterFile + ?Sized,
        M: GuestMemory,
    {
        let CallEvent { symbol, kind, cpu } = event;
        trace!(symbol, %kind, cpu, "call event");
        metrics::record_event(kind);
        session.begin();

        if self.is_suppressed(symbol) {
            debug!(symbol, %kind, "suppressed symbol");
            metrics::record_suppressed();
            return Outcome::Suppressed;
        }

        let signature = self.table.get(symbol);
        let renderer = Renderer::new(
            CallingConvention::new(self.profile, regs),
            CStringReader::new(memory).with_max_windows(self.max_string_windows),
        );
        let mut out = Vec::new();

        let outcome = match kind {
            EventKind::Entry => {
                let displaced = session.correlator_mut(cpu).on_entry(symbol);
                if let Some(previous) = &displaced {
                    metrics::record_displaced_call();
                    if self.warn_on_displaced_call {
                        warn!(
                            symbol,
                            previous = previous.as_str(),
                            cpu,
                            "call entered before previous call returned"
                        );
                    }
                }
                match signature {
                    Some(sig) => {
                        for fault in renderer.entry(&mut out, sig) {
                            report_string_fault(symbol, &fault);
                        }
                    }
                    None => render::unknown_entry(&mut out, symbol),
                }
                Outcome::Entered {
                    known: signature.is_some(),
                    displaced,
                }
            }
            EventKind::Return => {
                if session.correlator_mut(cpu).on_return(symbol) == ReturnDecision::Spurious {
                    debug!(
                        symbol,
                        cpu,
                        pending = session.pending(cpu),
                        "discarding return without matching call"
                    );
                    metrics::record_spurious_return();
                    return Outcome::SpuriousReturn;
                }
                match signature {
                    Some(sig) => {
                        if let Some(fault) = renderer.ret(&mut out, sig.ret()) {
                            report_string_fault(symbol, &fault);
                        }
                    }
                    None => render::unknown_return(&mut out),
                }
                Outcome::Returned {
                    known: signature.is_some(),
                }
            }
        };

        if signature.is_none() {
            metrics::record_unknown_symbol();
        }
        session.emit(&out);
        outcome
    }

    /// [`CallTracer::handle_event`] on a shared session.
    pub fn handle_shared<S, R, M>(
        &self,
        session: &SharedSession<S>,
        event: CallEvent<'_>,
        regs: &R,
        memory: M,
    ) -> Outcome
    where
        S: LogSink,
        R: RegisterFile + ?Sized,
        M: GuestMemory,
    {
        self.handle_event(&mut session.lock(), event, regs, memory)
    }
}

fn report_string_fault(symbol: &str, err: &StringReadError) {
    warn!(symbol, error = %err, "guest string read failed");
    metrics::record_string_fault(err);
}
