//! Event-script replay.
//!
//! Drives the tracer from a recorded event stream instead of a live
//! emulator. Scripts are line-oriented:
//!
//! ```text
//! # map guest memory (C escapes, NUL appended)
//! mem 0x1000 "hello\n"
//! # map raw bytes
//! mem 0x2000 hex 6869000a
//! # set registers, then deliver an entry event
//! enter malloc a0=16
//! return malloc a0=0x5555
//! # events default to CPU 0
//! enter puts cpu=1 a0=0x1000
//! ```
//!
//! Register values persist per CPU between events, like a real register
//! file. Registers are named per the architecture profile (`a0`, `x10`, ...).

use std::path::Path;
use std::sync::OnceLock;

use emtrace_abi::ArchProfile;
use emtrace_guest::SegmentedMemory;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::dispatch::{CallEvent, CallTracer, EventKind, Outcome};
use crate::error::{Error, Result};
use crate::session::{CpuId, TraceSession};
use crate::sink::LogSink;

static MEM_PATTERN: OnceLock<Regex> = OnceLock::new();
static EVENT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn mem_pattern() -> &'static Regex {
    MEM_PATTERN.get_or_init(|| {
        Regex::new(
            r#"^mem\s+(?P<addr>\S+)\s+(?:"(?P<text>(?:[^"\\]|\\.)*)"|hex\s+(?P<hex>[0-9a-fA-F]*))\s*(?:#.*)?$"#,
        )
        .expect("mem pattern is valid")
    })
}

fn event_pattern() -> &'static Regex {
    EVENT_PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<kind>enter|return)\s+(?P<symbol>[^\s#]+)(?P<assigns>(?:\s+[^\s#=]+=[^\s#]+)*)\s*(?:#.*)?$",
        )
        .expect("event pattern is valid")
    })
}

/// One script instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Map bytes into guest memory.
    Map { addr: u64, bytes: Vec<u8> },
    /// Set registers on `cpu`, then deliver an event.
    Event {
        kind: EventKind,
        symbol: String,
        cpu: CpuId,
        writes: Vec<(usize, u64)>,
    },
}

/// A parsed event script.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Steps with their 1-based source line.
    steps: Vec<(usize, Step)>,
}

/// Counts of what a replay did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub events: usize,
    pub rendered: usize,
    pub unknown: usize,
    pub suppressed: usize,
    pub spurious: usize,
    pub displaced: usize,
}

impl ReplayStats {
    fn record(&mut self, outcome: &Outcome) {
        self.events += 1;
        match outcome {
            Outcome::Entered { known, displaced } => {
                self.rendered += 1;
                self.unknown += usize::from(!known);
                self.displaced += usize::from(displaced.is_some());
            }
            Outcome::Returned { known } => {
                self.rendered += 1;
                self.unknown += usize::from(!known);
            }
            Outcome::Suppressed => self.suppressed += 1,
            Outcome::SpuriousReturn => self.spurious += 1,
        }
    }
}

impl Script {
    /// Parse a script, resolving register names against `profile`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`] with the line of the first bad instruction.
    pub fn parse(text: &str, profile: &ArchProfile) -> Result<Self> {
        let mut steps = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let step = parse_step(line, profile).map_err(|message| Error::Script {
                line: index + 1,
                message,
            })?;
            steps.push((index + 1, step));
        }
        Ok(Self { steps })
    }

    /// Load and parse a script file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path, profile: &ArchProfile) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let script = Self::parse(&text, profile)?;
        debug!(path = %path.display(), steps = script.steps.len(), "loaded script");
        Ok(script)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().map(|(_, step)| step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the script through `tracer`, writing into `session`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`] if a `mem` step overlaps an earlier mapping.
    /// Events themselves never fail.
    pub fn replay<S: LogSink>(
        &self,
        tracer: &CallTracer,
        session: &mut TraceSession<S>,
    ) -> Result<ReplayStats> {
        let num_regs = tracer.profile().num_regs;
        let mut memory = SegmentedMemory::new();
        let mut cpus: FxHashMap<CpuId, Vec<u64>> = FxHashMap::default();
        let mut stats = ReplayStats::default();

        for (line, step) in &self.steps {
            match step {
                Step::Map { addr, bytes } => {
                    memory
                        .map(*addr, bytes.clone())
                        .map_err(|e| Error::Script {
                            line: *line,
                            message: e.to_string(),
                        })?;
                }
                Step::Event {
                    kind,
                    symbol,
                    cpu,
                    writes,
                } => {
                    let regs = cpus.entry(*cpu).or_insert_with(|| vec![0; num_regs]);
                    for &(index, value) in writes {
                        if index >= regs.len() {
                            regs.resize(index + 1, 0);
                        }
                        regs[index] = value;
                    }
                    let event = CallEvent::new(symbol, *kind == EventKind::Return).on_cpu(*cpu);
                    let outcome = tracer.handle_event(session, event, regs.as_slice(), &memory);
                    stats.record(&outcome);
                }
            }
        }
        Ok(stats)
    }
}

fn parse_step(line: &str, profile: &ArchProfile) -> std::result::Result<Step, String> {
    if let Some(caps) = mem_pattern().captures(line) {
        let addr = parse_value(&caps["addr"])?;
        let bytes = match (caps.name("text"), caps.name("hex")) {
            (Some(text), _) => {
                let mut bytes = unescape(text.as_str())?;
                bytes.push(0);
                bytes
            }
            (None, Some(hex)) => parse_hex_bytes(hex.as_str())?,
            (None, None) => return Err("mem needs a quoted string or hex bytes".to_string()),
        };
        return Ok(Step::Map { addr, bytes });
    }

    if let Some(caps) = event_pattern().captures(line) {
        let kind = if &caps["kind"] == "enter" {
            EventKind::Entry
        } else {
            EventKind::Return
        };
        let mut cpu = 0;
        let mut writes = Vec::new();
        for assign in caps["assigns"].split_whitespace() {
            let Some((name, value)) = assign.split_once('=') else {
                return Err(format!("expected name=value, got `{assign}`"));
            };
            let value = parse_value(value)?;
            if name == "cpu" {
                cpu = CpuId::try_from(value).map_err(|_| format!("cpu index {value} too large"))?;
            } else {
                let index = profile.reg_index(name).map_err(|e| e.to_string())?;
                writes.push((index, value));
            }
        }
        return Ok(Step::Event {
            kind,
            symbol: caps["symbol"].to_string(),
            cpu,
            writes,
        });
    }

    Err(format!("unrecognized instruction `{line}`"))
}

/// Parse `0x`-prefixed hex, decimal, or negative decimal (two's complement).
fn parse_value(text: &str) -> std::result::Result<u64, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(neg) = text.strip_prefix('-') {
        neg.parse::<u64>()
            .ok()
            .filter(|&v| v <= i64::MIN.unsigned_abs())
            .map(u64::wrapping_neg)
    } else {
        text.parse::<u64>().ok()
    };
    parsed.ok_or_else(|| format!("invalid value `{text}`"))
}

fn parse_hex_bytes(hex: &str) -> std::result::Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in `{hex}`"));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// Decode C escapes: `\n \t \r \0 \\ \" \xHH`.
fn unescape(text: &str) -> std::result::Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let escaped = match bytes.next() {
            Some(b'n') => b'\n',
            Some(b't') => b'\t',
            Some(b'r') => b'\r',
            Some(b'0') => 0,
            Some(b'\\') => b'\\',
            Some(b'"') => b'"',
            Some(b'x') => {
                let hi = bytes.next();
                let lo = bytes.next();
                let digits = [hi.unwrap_or_default(), lo.unwrap_or_default()];
                std::str::from_utf8(&digits)
                    .ok()
                    .and_then(|d| u8::from_str_radix(d, 16).ok())
                    .ok_or_else(|| "\\x needs two hex digits".to_string())?
            }
            Some(other) => return Err(format!("unknown escape `\\{}`", other as char)),
            None => return Err("trailing backslash".to_string()),
        };
        out.push(escaped);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use emtrace_abi::Arch;

    use super::*;
    use crate::config::TraceConfig;

    fn rv64() -> ArchProfile {
        Arch::Riscv64.profile()
    }

    #[test]
    fn test_parse_negative_values() {
        assert_eq!(parse_value("-1"), Ok(u64::MAX));
        assert_eq!(parse_value("-0"), Ok(0));
        assert_eq!(parse_value("-9223372036854775808"), Ok(0x8000_0000_0000_0000));
        assert!(parse_value("-9223372036854775809").is_err());
        assert_eq!(parse_value("0xffffffffffffffff"), Ok(u64::MAX));
    }

    #[test]
    fn test_parse_mem() {
        let script = Script::parse(
            "mem 0x1000 \"hi\\n\\x01\"\nmem 4096 hex 6869000a  # raw\n",
            &rv64(),
        )
        .unwrap();
        let steps: Vec<_> = script.steps().cloned().collect();
        assert_eq!(
            steps,
            [
                Step::Map {
                    addr: 0x1000,
                    bytes: b"hi\n\x01\0".to_vec()
                },
                Step::Map {
                    addr: 4096,
                    bytes: vec![0x68, 0x69, 0x00, 0x0a]
                },
            ]
        );
    }

    #[test]
    fn test_parse_quoted_hash_is_not_comment() {
        let script = Script::parse("mem 0x10 \"a#b\" # trailing", &rv64()).unwrap();
        assert_eq!(
            script.steps().next(),
            Some(&Step::Map {
                addr: 0x10,
                bytes: b"a#b\0".to_vec()
            })
        );
    }

    #[test]
    fn test_parse_events() {
        let script = Script::parse(
            "# header\n\nenter puts cpu=1 a0=0x1000\nreturn puts x10=-1\n",
            &rv64(),
        )
        .unwrap();
        let steps: Vec<_> = script.steps().cloned().collect();
        assert_eq!(
            steps,
            [
                Step::Event {
                    kind: EventKind::Entry,
                    symbol: "puts".to_string(),
                    cpu: 1,
                    writes: vec![(10, 0x1000)],
                },
                Step::Event {
                    kind: EventKind::Return,
                    symbol: "puts".to_string(),
                    cpu: 0,
                    writes: vec![(10, u64::MAX)],
                },
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = Script::parse("enter malloc a0=16\nbogus\n", &rv64()).unwrap_err();
        assert!(matches!(err, Error::Script { line: 2, .. }), "{err}");

        let err = Script::parse("enter malloc q7=16", &rv64()).unwrap_err();
        assert!(matches!(err, Error::Script { line: 1, .. }));

        let err = Script::parse("mem 0x10 hex abc", &rv64()).unwrap_err();
        assert!(matches!(err, Error::Script { line: 1, .. }));

        let err = Script::parse("mem 0x10 \"\\q\"", &rv64()).unwrap_err();
        assert!(matches!(err, Error::Script { line: 1, .. }));
    }

    #[test]
    fn test_registers_persist_per_cpu() {
        let tracer = CallTracer::libc(TraceConfig::default());
        let mut session = tracer.session(Vec::new());
        let script = Script::parse(
            "enter setuid a0=7\n\
             return setuid\n\
             enter setgid cpu=1\n\
             return setgid cpu=1\n",
            &rv64(),
        )
        .unwrap();

        script.replay(&tracer, &mut session).unwrap();
        assert_eq!(
            String::from_utf8(session.into_sink()).unwrap(),
            "++++ ltrace ++++\nsetuid(7) = 7\nsetgid(0) = 0\n"
        );
    }

    #[test]
    fn test_replay_stats() {
        let tracer = CallTracer::libc(TraceConfig::default());
        let mut session = tracer.session(Vec::new());
        let script = Script::parse(
            "return malloc\n\
             enter __libc_start_main\n\
             enter frob\n\
             enter malloc a0=1\n\
             return malloc a0=0x10\n",
            &rv64(),
        )
        .unwrap();

        let stats = script.replay(&tracer, &mut session).unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                events: 5,
                rendered: 3,
                unknown: 1,
                suppressed: 1,
                spurious: 1,
                displaced: 1,
            }
        );
    }

    #[test]
    fn test_overlapping_mem_fails() {
        let tracer = CallTracer::libc(TraceConfig::default());
        let mut session = tracer.session(Vec::new());
        let script = Script::parse("mem 0x1000 \"abc\"\nmem 0x1002 \"x\"\n", &rv64()).unwrap();

        let err = script.replay(&tracer, &mut session).unwrap_err();
        assert!(matches!(err, Error::Script { line: 2, .. }), "{err}");
    }
}
