//! Prototype files: extra signatures declared in C-like syntax.
//!
//! ```text
//! # comment
//! hex   malloc(int);
//! int   printf(string, ...);
//! char* strrchr(char*, int);
//! int   getuid(void);
//! ```
//!
//! One declaration per line. Blank lines and lines starting with `#` or `;`
//! are ignored, as is anything after a `#`.

use std::path::Path;
use std::sync::OnceLock;

use emtrace_abi::{Signature, SignatureTable, TypeTag};
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static PROTOTYPE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn prototype_pattern() -> &'static Regex {
    PROTOTYPE_PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<ret>.+?)\s*\b(?P<name>[A-Za-z_][\w.$@]*)\s*\((?P<args>[^()]*)\)\s*;?$")
            .expect("prototype pattern is valid")
    })
}

/// Resolve a type name.
///
/// Whitespace is ignored and matching is case-insensitive, so `char *` and
/// `CHAR*` both mean a string.
pub fn parse_type(name: &str) -> Option<TypeTag> {
    let name: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let tag = match name.as_str() {
        "int" | "long" => TypeTag::Signed,
        "hex" | "addr" | "ptr" => TypeTag::HexAddress,
        "string" | "char*" => TypeTag::CString,
        "void" => TypeTag::Void,
        "..." => TypeTag::VariadicMarker,
        "none" => TypeTag::None,
        _ => return None,
    };
    Some(tag)
}

/// Parse one declaration. Returns `None` for blank and comment lines.
fn parse_line(line: &str) -> std::result::Result<Option<Signature>, String> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() || line.starts_with(';') {
        return Ok(None);
    }

    let caps = prototype_pattern()
        .captures(line)
        .ok_or_else(|| format!("expected `<ret> <name>(<args>);`, got `{line}`"))?;
    let ret_name = &caps["ret"];
    let ret = parse_type(ret_name).ok_or_else(|| format!("unknown type `{}`", ret_name.trim()))?;

    let args_text = caps["args"].trim();
    let args = if args_text.is_empty() || parse_type(args_text) == Some(TypeTag::Void) {
        Vec::new()
    } else {
        args_text
            .split(',')
            .map(|arg| {
                let arg = arg.trim();
                parse_type(arg).ok_or_else(|| format!("unknown type `{arg}`"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    Signature::new(&caps["name"], &args, ret)
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Parse prototype declarations.
///
/// # Errors
///
/// Returns [`Error::Prototype`] with the 1-based line number of the first
/// malformed or invalid declaration.
pub fn parse_prototypes(text: &str) -> Result<SignatureTable> {
    let mut table = SignatureTable::new();
    for (index, line) in text.lines().enumerate() {
        let signature = parse_line(line).map_err(|message| Error::Prototype {
            line: index + 1,
            message,
        })?;
        if let Some(signature) = signature {
            if let Some(previous) = table.insert(signature) {
                debug!(name = previous.name(), line = index + 1, "prototype redeclared");
            }
        }
    }
    Ok(table)
}

/// Load a prototype file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_prototypes(path: &Path) -> Result<SignatureTable> {
    let text = std::fs::read_to_string(path)?;
    let table = parse_prototypes(&text)?;
    debug!(path = %path.display(), count = table.len(), "loaded prototypes");
    Ok(table)
}
