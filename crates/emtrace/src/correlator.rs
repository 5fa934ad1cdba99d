//! Call/return correlation.
//!
//! A breakpoint on a function's first instruction can coincide with a stale
//! return breakpoint left from instrumentation setup, so the emulator may
//! report a "return" that is really an entry. The correlator only accepts a
//! return for the call it most recently saw enter.
//!
//! States are `Idle` (nothing pending) and `AwaitingReturn(symbol)`:
//!
//! | event          | state                 | result     | next state            |
//! |----------------|-----------------------|------------|-----------------------|
//! | entry `S`      | any                   | render     | `AwaitingReturn(S)`   |
//! | return `S`     | `AwaitingReturn(S)`   | render     | `Idle`                |
//! | return `S`     | `Idle`                | discard    | unchanged             |
//! | return `S`     | `AwaitingReturn(T)`   | discard    | unchanged             |

/// What to do with a return event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDecision {
    /// The return matches the pending call; render it.
    Accept,
    /// No matching pending call; drop it.
    Spurious,
}

/// Single-slot call/return state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlator {
    pending: Option<String>,
}

impl Correlator {
    /// Create a correlator in the `Idle` state.
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Record an entry to `symbol`.
    ///
    /// Always succeeds and overwrites any pending call. Returns the call
    /// that was displaced, if there was one.
    pub fn on_entry(&mut self, symbol: &str) -> Option<String> {
        self.pending.replace(symbol.to_string())
    }

    /// Decide whether a return from `symbol` is real.
    pub fn on_return(&mut self, symbol: &str) -> ReturnDecision {
        if self.pending.as_deref() == Some(symbol) {
            self.pending = None;
            ReturnDecision::Accept
        } else {
            ReturnDecision::Spurious
        }
    }

    /// Symbol awaiting its return.
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub const fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_idle() {
        let c = Correlator::new();
        assert!(c.is_idle());
        assert_eq!(c.pending(), None);
    }

    #[test]
    fn test_entry_then_matching_return() {
        let mut c = Correlator::new();
        assert_eq!(c.on_entry("malloc"), None);
        assert_eq!(c.pending(), Some("malloc"));
        assert_eq!(c.on_return("malloc"), ReturnDecision::Accept);
        assert!(c.is_idle());
    }

    #[test]
    fn test_return_without_entry() {
        let mut c = Correlator::new();
        assert_eq!(c.on_return("malloc"), ReturnDecision::Spurious);
        assert_eq!(c, Correlator::new());
    }

    #[test]
    fn test_mismatched_return_keeps_pending() {
        let mut c = Correlator::new();
        c.on_entry("A");
        assert_eq!(c.on_return("B"), ReturnDecision::Spurious);
        assert_eq!(c.pending(), Some("A"));
        assert_eq!(c.on_return("A"), ReturnDecision::Accept);
    }

    #[test]
    fn test_entry_displaces_pending() {
        let mut c = Correlator::new();
        c.on_entry("A");
        assert_eq!(c.on_entry("B").as_deref(), Some("A"));
        assert_eq!(c.on_return("A"), ReturnDecision::Spurious);
        assert_eq!(c.on_return("B"), ReturnDecision::Accept);
    }

    #[test]
    fn test_second_return_is_spurious() {
        let mut c = Correlator::new();
        c.on_entry("puts");
        assert_eq!(c.on_return("puts"), ReturnDecision::Accept);
        assert_eq!(c.on_return("puts"), ReturnDecision::Spurious);
    }
}
