//! Table-driven symbol → signature resolution.

use rustc_hash::FxHashMap;

use crate::types::Signature;

/// Signature registry keyed by exact symbol name.
///
/// Lookups are exact string matches: no prefix matching, no demangling.
#[derive(Clone, Debug, Default)]
pub struct SignatureTable {
    entries: FxHashMap<String, Signature>,
}

impl SignatureTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in libc signatures.
    #[must_use]
    pub fn libc() -> Self {
        crate::libc::libc_table()
    }

    /// Add a signature, replacing any existing entry with the same name.
    #[must_use]
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.insert(signature);
        self
    }

    /// Insert a signature. Returns the entry it replaced, if any.
    pub fn insert(&mut self, signature: Signature) -> Option<Signature> {
        self.entries
            .insert(signature.name().to_string(), signature)
    }

    /// Merge another table into this one. Entries from `other` win.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Resolve a symbol name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.entries.get(name)
    }

    /// Whether a symbol has a signature.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All signatures sorted by symbol name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Signature> {
        let mut signatures: Vec<&Signature> = self.entries.values().collect();
        signatures.sort_by(|a, b| a.name().cmp(b.name()));
        signatures
    }
}

impl FromIterator<Signature> for SignatureTable {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        let mut table = Self::new();
        for signature in iter {
            table.insert(signature);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeTag;

    fn sig(name: &str, ret: TypeTag) -> Signature {
        Signature::new(name, &[TypeTag::Signed], ret).unwrap()
    }

    #[test]
    fn test_table_exact_match() {
        let table = SignatureTable::new().with_signature(sig("malloc", TypeTag::HexAddress));

        assert!(table.get("malloc").is_some());
        assert!(table.get("mallo").is_none());
        assert!(table.get("malloc@plt").is_none());
        assert!(table.get("MALLOC").is_none());
    }

    #[test]
    fn test_table_replace() {
        let mut table = SignatureTable::new().with_signature(sig("f", TypeTag::Signed));
        let old = table.insert(sig("f", TypeTag::HexAddress));

        assert_eq!(old.map(|s| s.ret()), Some(TypeTag::Signed));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("f").map(Signature::ret), Some(TypeTag::HexAddress));
    }

    #[test]
    fn test_table_extend_overrides() {
        let mut table = SignatureTable::libc();
        let before = table.len();
        table.extend(SignatureTable::from_iter([
            sig("malloc", TypeTag::Signed),
            sig("custom", TypeTag::Signed),
        ]));

        assert_eq!(table.len(), before + 1);
        assert_eq!(table.get("malloc").map(Signature::ret), Some(TypeTag::Signed));
    }

    #[test]
    fn test_table_sorted() {
        let table: SignatureTable = [
            sig("b", TypeTag::Signed),
            sig("a", TypeTag::Signed),
            sig("c", TypeTag::Signed),
        ]
        .into_iter()
        .collect();
        let names: Vec<&str> = table.sorted().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
