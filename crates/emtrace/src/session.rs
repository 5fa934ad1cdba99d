//! Per-trace mutable state: banner flag, sink, and call correlation.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::correlator::Correlator;
use crate::sink::LogSink;

/// Index of an emulated CPU.
pub type CpuId = u32;

/// One trace session.
///
/// Correlation is tracked per emulated CPU so calls on one CPU never match
/// returns on another. The banner and the sink are shared by all CPUs.
#[derive(Debug)]
pub struct TraceSession<S> {
    sink: S,
    banner: String,
    started: bool,
    correlators: FxHashMap<CpuId, Correlator>,
}

impl<S: LogSink> TraceSession<S> {
    /// Create a session that writes `banner` before its first event.
    pub fn new(sink: S, banner: impl Into<String>) -> Self {
        Self {
            sink,
            banner: banner.into(),
            started: false,
            correlators: FxHashMap::default(),
        }
    }

    /// Whether the banner has been written.
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Write the banner if this is the session's first event.
    pub fn begin(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let mut line = Vec::with_capacity(self.banner.len() + 1);
        line.extend_from_slice(self.banner.as_bytes());
        line.push(b'\n');
        self.sink.write_trace(&line);
    }

    /// Append rendered event text.
    pub fn emit(&mut self, text: &[u8]) {
        self.begin();
        self.sink.write_trace(text);
    }

    /// Correlator for `cpu`, if that CPU has delivered an event.
    pub fn correlator(&self, cpu: CpuId) -> Option<&Correlator> {
        self.correlators.get(&cpu)
    }

    /// Correlator for `cpu`, created idle on first use.
    pub fn correlator_mut(&mut self, cpu: CpuId) -> &mut Correlator {
        self.correlators.entry(cpu).or_default()
    }

    /// Symbol awaiting its return on `cpu`.
    pub fn pending(&self, cpu: CpuId) -> Option<&str> {
        self.correlator(cpu).and_then(Correlator::pending)
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// A [`TraceSession`] shared between emulator threads.
///
/// Events are serialized by the lock; output appears in lock order.
#[derive(Debug)]
pub struct SharedSession<S> {
    inner: Arc<Mutex<TraceSession<S>>>,
}

impl<S> Clone for SharedSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: LogSink> SharedSession<S> {
    pub fn new(session: TraceSession<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Lock the session.
    pub fn lock(&self) -> MutexGuard<'_, TraceSession<S>> {
        self.inner.lock()
    }

    /// Take the session back once every other handle is dropped.
    ///
    /// Returns `self` unchanged if other handles still exist.
    pub fn try_into_inner(self) -> Result<TraceSession<S>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_once() {
        let mut session = TraceSession::new(Vec::new(), "++++ ltrace ++++");
        assert!(!session.is_started());
        session.emit(b"a(?)");
        session.emit(b" = (?)\n");
        assert!(session.is_started());
        assert_eq!(session.into_sink(), b"++++ ltrace ++++\na(?) = (?)\n");
    }

    #[test]
    fn test_begin_without_output() {
        let mut session = TraceSession::new(Vec::new(), "BANNER");
        session.begin();
        session.begin();
        assert_eq!(session.sink(), b"BANNER\n");
    }

    #[test]
    fn test_correlators_per_cpu() {
        let mut session = TraceSession::new(Vec::new(), "");
        assert!(session.correlator(0).is_none());
        session.correlator_mut(0).on_entry("malloc");
        session.correlator_mut(1).on_entry("puts");
        assert_eq!(session.pending(0), Some("malloc"));
        assert_eq!(session.pending(1), Some("puts"));
        assert_eq!(session.pending(2), None);
    }

    #[test]
    fn test_shared_session() {
        let shared = SharedSession::new(TraceSession::new(Vec::new(), "B"));
        let other = shared.clone();
        std::thread::spawn(move || other.lock().emit(b"x"))
            .join()
            .unwrap();
        let session = shared.try_into_inner().unwrap();
        assert_eq!(session.into_sink(), b"B\nx");
    }
}
