//! Argument encodings and per-symbol signatures.

use std::fmt;

use thiserror::Error;

/// Maximum number of positional argument slots a signature may declare.
///
/// Matches the number of argument registers the calling-convention adapter
/// is guaranteed to expose on every supported architecture.
pub const MAX_SLOTS: usize = 5;

/// How a single argument slot or the return slot is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Signed decimal integer.
    Signed,
    /// `0x`-prefixed hexadecimal value (pointers, handles, flags).
    HexAddress,
    /// Pointer to a NUL-terminated string in guest memory.
    CString,
    /// No value; renders as `<void>` in the return slot.
    Void,
    /// Remaining arguments are not decoded; renders as `...`.
    VariadicMarker,
    /// Nothing meaningful to render.
    None,
}

impl TypeTag {
    /// Whether this tag may appear in an argument position.
    #[must_use]
    pub const fn is_argument(self) -> bool {
        matches!(
            self,
            Self::Signed | Self::HexAddress | Self::CString | Self::VariadicMarker
        )
    }

    /// Whether this tag may appear in the return position.
    #[must_use]
    pub const fn is_return(self) -> bool {
        matches!(
            self,
            Self::Signed | Self::HexAddress | Self::CString | Self::Void | Self::None
        )
    }

    /// Whether rendering this tag requires reading a register.
    #[must_use]
    pub const fn reads_register(self) -> bool {
        matches!(self, Self::Signed | Self::HexAddress | Self::CString)
    }

    /// Keyword used for this tag in prototype declarations.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Signed => "int",
            Self::HexAddress => "hex",
            Self::CString => "string",
            Self::Void => "void",
            Self::VariadicMarker => "...",
            Self::None => "none",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Signature validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature has an empty symbol name")]
    EmptyName,
    #[error("{name}: {count} argument slots declared (max {MAX_SLOTS})")]
    TooManyArguments { name: String, count: usize },
    #[error("{name}: variadic marker at slot {position} must be the last or second-to-last argument")]
    MisplacedVariadic { name: String, position: usize },
    #[error("{name}: `{tag}` is not a valid argument type")]
    InvalidArgumentType { name: String, tag: TypeTag },
    #[error("{name}: `{tag}` is not a valid return type")]
    InvalidReturnType { name: String, tag: TypeTag },
}

/// Declared argument/return shape of one traced symbol.
///
/// Signatures are validated on construction and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    name: String,
    args: Vec<TypeTag>,
    ret: TypeTag,
}

impl Signature {
    /// Create a validated signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, more than [`MAX_SLOTS`]
    /// arguments are declared, a tag is used in a position it cannot occupy,
    /// or a variadic marker is neither the last nor second-to-last argument.
    pub fn new(
        name: impl Into<String>,
        args: &[TypeTag],
        ret: TypeTag,
    ) -> Result<Self, SignatureError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SignatureError::EmptyName);
        }
        if args.len() > MAX_SLOTS {
            return Err(SignatureError::TooManyArguments {
                name,
                count: args.len(),
            });
        }
        if let Some(&tag) = args.iter().find(|tag| !tag.is_argument()) {
            return Err(SignatureError::InvalidArgumentType { name, tag });
        }
        if !ret.is_return() {
            return Err(SignatureError::InvalidReturnType { name, tag: ret });
        }

        let variadics: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, tag)| **tag == TypeTag::VariadicMarker)
            .map(|(i, _)| i)
            .collect();
        match variadics.as_slice() {
            [] => {}
            [position] if position + 2 >= args.len() => {}
            [position, ..] | [position] => {
                return Err(SignatureError::MisplacedVariadic {
                    name,
                    position: *position,
                });
            }
        }

        Ok(Self::new_unchecked(name, args, ret))
    }

    pub(crate) fn new_unchecked(name: impl Into<String>, args: &[TypeTag], ret: TypeTag) -> Self {
        Self {
            name: name.into(),
            args: args.to_vec(),
            ret,
        }
    }

    /// Symbol name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument types, in slot order.
    #[must_use]
    pub fn args(&self) -> &[TypeTag] {
        &self.args
    }

    /// Declared return type.
    #[must_use]
    pub const fn ret(&self) -> TypeTag {
        self.ret
    }

    /// Number of register reads an entry event performs.
    #[must_use]
    pub fn register_reads(&self) -> usize {
        self.args.iter().filter(|tag| tag.reads_register()).count()
    }
}

/// Formats as a prototype declaration, e.g. `hex malloc(int);`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.ret, self.name)?;
        for (i, tag) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}")?;
        }
        f.write_str(");")
    }
}
