//! Built-in libc signatures.

use crate::table::SignatureTable;
use crate::types::{Signature, TypeTag};

use TypeTag::{CString as Str, HexAddress as Hex, Signed as Int, VariadicMarker as Etc, Void};

/// Built-in signature table entry.
struct LibcEntry {
    name: &'static str,
    args: &'static [TypeTag],
    ret: TypeTag,
}

impl LibcEntry {
    const fn new(name: &'static str, args: &'static [TypeTag], ret: TypeTag) -> Self {
        Self { name, args, ret }
    }
}

const LIBC: &[LibcEntry] = &[
    LibcEntry::new("malloc", &[Int], Hex),
    LibcEntry::new("puts", &[Str], Int),
    LibcEntry::new("fflush", &[Hex], Int),
    LibcEntry::new("printf", &[Str, Etc], Int),
    LibcEntry::new("free", &[Hex], Void),
    LibcEntry::new("memcpy", &[Hex, Hex, Int], Hex),
    LibcEntry::new("mallopt", &[Int, Int], Int),
    LibcEntry::new("strrchr", &[Str, Int], Str),
    LibcEntry::new("stat64", &[Str, Hex], Int),
    LibcEntry::new("strcmp", &[Str, Str], Int),
    LibcEntry::new("setgid", &[Int], Int),
    LibcEntry::new("setuid", &[Int], Int),
    LibcEntry::new("time", &[Int], Int),
    LibcEntry::new("ioctl", &[Int, Hex], Int),
    LibcEntry::new("getenv", &[Str], Hex),
    LibcEntry::new("getuid", &[], Int),
    LibcEntry::new("getgid", &[], Int),
    LibcEntry::new("memset", &[Hex, Int, Int], Hex),
    LibcEntry::new("strlen", &[Str], Int),
    LibcEntry::new("lstat64", &[Str, Hex], Int),
    LibcEntry::new("strcpy", &[Str, Str], Str),
    LibcEntry::new("getopt_long", &[Int, Hex, Str, Hex, Hex], Hex),
    LibcEntry::new("isatty", &[Int], Int),
    LibcEntry::new("gnu_dev_major", &[Hex], Int),
    LibcEntry::new("gnu_dev_minor", &[Hex], Int),
    LibcEntry::new("readdir64", &[Hex], Hex),
    LibcEntry::new("vasprintf", &[Hex, Str, Hex], Int),
    LibcEntry::new("opendir", &[Str], Hex),
    LibcEntry::new("putchar", &[Int], Int),
    LibcEntry::new("putchar_unlocked", &[Int], Int),
    LibcEntry::new("exit", &[Int], Void),
];

pub(crate) fn libc_table() -> SignatureTable {
    LIBC.iter()
        .map(|entry| Signature::new_unchecked(entry.name, entry.args, entry.ret))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libc_entries_validate() {
        for entry in LIBC {
            Signature::new(entry.name, entry.args, entry.ret)
                .unwrap_or_else(|e| panic!("invalid built-in signature: {e}"));
        }
    }

    #[test]
    fn test_libc_table_contents() {
        let table = SignatureTable::libc();
        assert_eq!(table.len(), LIBC.len());

        let malloc = table.get("malloc").unwrap();
        assert_eq!(malloc.args(), &[TypeTag::Signed]);
        assert_eq!(malloc.ret(), TypeTag::HexAddress);

        let getopt = table.get("getopt_long").unwrap();
        assert_eq!(getopt.args().len(), 5);

        assert_eq!(table.get("free").unwrap().ret(), TypeTag::Void);
        assert!(table.get("getuid").unwrap().args().is_empty());
        assert!(table.get("__errno_location").is_none());
    }
}
