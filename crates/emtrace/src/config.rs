//! Trace configuration.

use emtrace_abi::{Arch, ArchProfile};
use emtrace_guest::DEFAULT_MAX_WINDOWS;

/// Banner written once, before the first traced event of a session.
pub const DEFAULT_BANNER: &str = "++++ ltrace ++++";

/// Bookkeeping symbols that are never traced: dynamic-loader bootstrap,
/// exception-dispatch trampolines and the per-thread errno accessor.
pub const DEFAULT_SUPPRESSED: &[&str] = &[
    "__libc_start_main",
    "__cxa_finalize",
    "_dl_catch_exception",
    "__errno_location",
];

/// Tracer configuration.
#[derive(Clone, Debug)]
pub struct TraceConfig {
    /// Calling convention of the traced program.
    pub profile: ArchProfile,
    /// Maximum 8-byte windows read per string argument.
    pub max_string_windows: usize,
    /// Log a warning when a new call displaces one still awaiting its return.
    pub warn_on_displaced_call: bool,
    /// Session banner (without trailing newline).
    pub banner: String,
    /// Symbols suppressed on entry and return.
    pub suppressed: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            profile: Arch::default().profile(),
            max_string_windows: DEFAULT_MAX_WINDOWS,
            warn_on_displaced_call: false,
            banner: DEFAULT_BANNER.to_string(),
            suppressed: DEFAULT_SUPPRESSED.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl TraceConfig {
    /// Use the calling convention of a built-in architecture.
    #[must_use]
    pub const fn with_arch(mut self, arch: Arch) -> Self {
        self.profile = arch.profile();
        self
    }

    /// Use a custom calling-convention profile.
    #[must_use]
    pub const fn with_profile(mut self, profile: ArchProfile) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub const fn with_max_string_windows(mut self, windows: usize) -> Self {
        self.max_string_windows = windows;
        self
    }

    #[must_use]
    pub const fn with_displaced_call_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_displaced_call = enabled;
        self
    }

    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    /// Add a symbol to the suppression list.
    #[must_use]
    pub fn with_suppressed(mut self, symbol: impl Into<String>) -> Self {
        self.suppressed.push(symbol.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TraceConfig::default();
        assert_eq!(config.profile, Arch::Riscv64.profile());
        assert_eq!(config.max_string_windows, DEFAULT_MAX_WINDOWS);
        assert_eq!(config.banner, "++++ ltrace ++++");
        assert!(!config.warn_on_displaced_call);
        assert!(config.suppressed.iter().any(|s| s == "__errno_location"));
    }

    #[test]
    fn test_builder() {
        let config = TraceConfig::default()
            .with_arch(Arch::Aarch64)
            .with_max_string_windows(4)
            .with_displaced_call_warnings(true)
            .with_banner("== trace ==")
            .with_suppressed("_init");

        assert_eq!(config.profile.name, "aarch64");
        assert_eq!(config.max_string_windows, 4);
        assert!(config.warn_on_displaced_call);
        assert_eq!(config.banner, "== trace ==");
        assert_eq!(config.suppressed.last().map(String::as_str), Some("_init"));
    }
}
