//! Trace line rendering.
//!
//! An entry renders as `name(arg,arg,...)` with no line terminator; the
//! matching return completes the line with ` = value\n`. Values are
//! formatted per [`TypeTag`]:
//!
//! | tag              | output                                   |
//! |------------------|------------------------------------------|
//! | `Signed`         | signed decimal at register width         |
//! | `HexAddress`     | `0x`-prefixed lowercase hex              |
//! | `CString`        | quoted guest string, or `(nil)`          |
//! | `VariadicMarker` | `...`                                    |
//! | `Void`           | `<void>`                                 |
//! | `None`           | nothing                                  |
//!
//! String reads that fault or hit the window cap still render: the decoded
//! prefix is kept and followed by `<unreadable 0xADDR>` or `...`.

use std::io::Write;

use emtrace_abi::{CallingConvention, RegisterFile, Signature, TypeTag};
use emtrace_guest::{CStringReader, GuestMemory, StringReadError, write_quoted};

/// Placeholder for arguments and returns of symbols without a signature.
pub const UNKNOWN: &str = "(?)";

/// Renders decoded calls into a byte buffer.
pub struct Renderer<'a, R: RegisterFile + ?Sized, M> {
    convention: CallingConvention<'a, R>,
    strings: CStringReader<M>,
}

impl<'a, R: RegisterFile + ?Sized, M: GuestMemory> Renderer<'a, R, M> {
    pub const fn new(convention: CallingConvention<'a, R>, strings: CStringReader<M>) -> Self {
        Self {
            convention,
            strings,
        }
    }

    /// Render `name(args)`.
    ///
    /// Each declared argument consumes the next register slot, including
    /// `...`, which is never read. Returns the string reads that failed.
    pub fn entry(&self, out: &mut Vec<u8>, signature: &Signature) -> Vec<StringReadError> {
        let mut faults = Vec::new();
        out.extend_from_slice(signature.name().as_bytes());
        out.push(b'(');
        for (slot, &tag) in signature.args().iter().enumerate() {
            if slot > 0 {
                out.push(b',');
            }
            if tag == TypeTag::VariadicMarker {
                out.extend_from_slice(b"...");
                continue;
            }
            match self.convention.read_argument(slot) {
                Ok(raw) => faults.extend(self.value(out, tag, raw)),
                Err(_) => out.extend_from_slice(b"<unavailable>"),
            }
        }
        out.push(b')');
        faults
    }

    /// Render ` = value\n` for a return of type `ret`.
    pub fn ret(&self, out: &mut Vec<u8>, ret: TypeTag) -> Option<StringReadError> {
        out.extend_from_slice(b" = ");
        let fault = match ret {
            TypeTag::Void => {
                out.extend_from_slice(b"<void>");
                None
            }
            TypeTag::None | TypeTag::VariadicMarker => None,
            _ => self.value(out, ret, self.convention.read_return()),
        };
        out.push(b'\n');
        fault
    }

    fn value(&self, out: &mut Vec<u8>, tag: TypeTag, raw: u64) -> Option<StringReadError> {
        let profile = self.convention.profile();
        match tag {
            TypeTag::Signed => {
                let _ = write!(out, "{}", profile.signed(raw));
                None
            }
            TypeTag::HexAddress => {
                let _ = write!(out, "{:#x}", profile.unsigned(raw));
                None
            }
            TypeTag::CString => self.string(out, profile.unsigned(raw)),
            TypeTag::Void | TypeTag::VariadicMarker | TypeTag::None => None,
        }
    }

    fn string(&self, out: &mut Vec<u8>, addr: u64) -> Option<StringReadError> {
        match self.strings.read(addr) {
            Ok(s) => {
                s.write_to(out);
                None
            }
            Err(err) => {
                write_fault(out, &err);
                Some(err)
            }
        }
    }
}

/// Render `name(?)` for a symbol without a signature.
pub fn unknown_entry(out: &mut Vec<u8>, symbol: &str) {
    out.extend_from_slice(symbol.as_bytes());
    out.extend_from_slice(UNKNOWN.as_bytes());
}

/// Render ` = (?)\n`.
pub fn unknown_return(out: &mut Vec<u8>) {
    out.extend_from_slice(b" = ");
    out.extend_from_slice(UNKNOWN.as_bytes());
    out.push(b'\n');
}

fn write_fault(out: &mut Vec<u8>, err: &StringReadError) {
    let partial = err.partial();
    match err {
        StringReadError::Unmapped { addr, .. } => {
            if !partial.is_empty() {
                write_quoted(partial, out);
            }
            let _ = write!(out, "<unreadable {addr:#x}>");
        }
        StringReadError::Truncated { .. } => {
            write_quoted(partial, out);
            out.extend_from_slice(b"...");
        }
    }
}

#[cfg(test)]
mod tests {
    use emtrace_abi::{Arch, SignatureTable};
    use emtrace_guest::SegmentedMemory;

    use super::*;

    fn regs_with(args: &[(usize, u64)]) -> [u64; 32] {
        let mut regs = [0u64; 32];
        for &(index, value) in args {
            regs[index] = value;
        }
        regs
    }

    fn render_entry(arch: Arch, sig: &Signature, regs: &[u64], mem: &SegmentedMemory) -> String {
        let renderer = Renderer::new(
            CallingConvention::new(arch.profile(), regs),
            CStringReader::new(mem),
        );
        let mut out = Vec::new();
        renderer.entry(&mut out, sig);
        String::from_utf8(out).unwrap()
    }

    fn render_ret(arch: Arch, ret: TypeTag, regs: &[u64], mem: &SegmentedMemory) -> String {
        let renderer = Renderer::new(
            CallingConvention::new(arch.profile(), regs),
            CStringReader::new(mem),
        );
        let mut out = Vec::new();
        renderer.ret(&mut out, ret);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_malloc_round_trip() {
        let libc = SignatureTable::libc();
        let malloc = libc.get("malloc").unwrap();
        let mem = SegmentedMemory::new();

        let regs = regs_with(&[(10, 16)]);
        assert_eq!(render_entry(Arch::Riscv64, malloc, &regs, &mem), "malloc(16)");
        let regs = regs_with(&[(10, 0x5555)]);
        assert_eq!(
            render_ret(Arch::Riscv64, malloc.ret(), &regs, &mem),
            " = 0x5555\n"
        );
    }

    #[test]
    fn test_signed_is_negative() {
        let sig = Signature::new("f", &[TypeTag::Signed], TypeTag::Signed).unwrap();
        let mem = SegmentedMemory::new();
        let regs = regs_with(&[(0, u64::MAX)]);
        assert_eq!(render_entry(Arch::Aarch64, &sig, &regs, &mem), "f(-1)");
    }

    #[test]
    fn test_rv32_width() {
        let sig = Signature::new("f", &[TypeTag::Signed, TypeTag::HexAddress], TypeTag::None)
            .unwrap();
        let mem = SegmentedMemory::new();
        let regs = regs_with(&[(10, 0xffff_ffff), (11, 0x1_0000_00ab)]);
        assert_eq!(render_entry(Arch::Riscv32, &sig, &regs, &mem), "f(-1,0xab)");
    }

    #[test]
    fn test_variadic_consumes_slot() {
        let sig = Signature::new(
            "f",
            &[TypeTag::Signed, TypeTag::VariadicMarker, TypeTag::Signed],
            TypeTag::Void,
        )
        .unwrap();
        let mem = SegmentedMemory::new();
        let regs = regs_with(&[(10, 1), (11, 2), (12, 3)]);
        assert_eq!(render_entry(Arch::Riscv64, &sig, &regs, &mem), "f(1,...,3)");
    }

    #[test]
    fn test_strings() {
        let libc = SignatureTable::libc();
        let mut mem = SegmentedMemory::new();
        mem.map(0x1000, b"/tmp\0\0\0\0".to_vec()).unwrap();
        mem.map(0x2000, b"ab\0cdefgh".to_vec()).unwrap();

        let regs = regs_with(&[(10, 0x1000), (11, 0x2000)]);
        assert_eq!(
            render_entry(Arch::Riscv64, libc.get("strcmp").unwrap(), &regs, &mem),
            "strcmp(\"/tmp\",\"ab\")"
        );
        let regs = regs_with(&[(10, 0)]);
        assert_eq!(
            render_entry(Arch::Riscv64, libc.get("puts").unwrap(), &regs, &mem),
            "puts((nil))"
        );
    }

    #[test]
    fn test_string_faults_render_markers() {
        let sig = Signature::new(
            "f",
            &[TypeTag::CString, TypeTag::CString, TypeTag::Signed],
            TypeTag::None,
        )
        .unwrap();
        let mut mem = SegmentedMemory::new();
        mem.map(0x1000, b"abcdefghij".to_vec()).unwrap();

        let regs = regs_with(&[(10, 0xdead_0000), (11, 0x1000), (12, 7)]);
        let renderer = Renderer::new(
            CallingConvention::new(Arch::Riscv64.profile(), &regs),
            CStringReader::new(&mem),
        );
        let mut out = Vec::new();
        let faults = renderer.entry(&mut out, &sig);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "f(<unreadable 0xdead0000>,\"abcdefghij\"<unreadable 0x100a>,7)"
        );
        assert_eq!(faults.len(), 2);
    }

    #[test]
    fn test_truncated_string_marker() {
        let sig = Signature::new("f", &[TypeTag::CString], TypeTag::None).unwrap();
        let mut mem = SegmentedMemory::new();
        mem.map(0x1000, vec![b'A'; 32]).unwrap();
        let regs = regs_with(&[(10, 0x1000)]);
        let renderer = Renderer::new(
            CallingConvention::new(Arch::Riscv64.profile(), &regs),
            CStringReader::new(&mem).with_max_windows(2),
        );
        let mut out = Vec::new();
        let faults = renderer.entry(&mut out, &sig);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "f(\"AAAAAAAAAAAAAAAA\"...)"
        );
        assert!(matches!(faults[0], StringReadError::Truncated { .. }));
    }

    #[test]
    fn test_return_variants() {
        let mem = SegmentedMemory::new();
        let regs = regs_with(&[(0, 42), (2, 7)]);
        assert_eq!(render_ret(Arch::Aarch64, TypeTag::Void, &regs, &mem), " = <void>\n");
        assert_eq!(render_ret(Arch::Aarch64, TypeTag::None, &regs, &mem), " = \n");
        assert_eq!(render_ret(Arch::Aarch64, TypeTag::Signed, &regs, &mem), " = 42\n");
        // MIPS returns in v0, not a0.
        assert_eq!(render_ret(Arch::Mips64, TypeTag::Signed, &regs, &mem), " = 7\n");
    }

    #[test]
    fn test_string_return() {
        let mut mem = SegmentedMemory::new();
        mem.map(0x3000, b"line\n\0\0\0".to_vec()).unwrap();
        let regs = regs_with(&[(10, 0x3000)]);
        assert_eq!(
            render_ret(Arch::Riscv64, TypeTag::CString, &regs, &mem),
            " = \"line\\n\"\n"
        );
    }

    #[test]
    fn test_unknown() {
        let mut out = Vec::new();
        unknown_entry(&mut out, "frobnicate");
        unknown_return(&mut out);
        assert_eq!(out, b"frobnicate(?) = (?)\n");
    }
}
