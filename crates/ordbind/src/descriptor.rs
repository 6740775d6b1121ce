//! Operation descriptors - static ordinal-binding metadata
//!
//! A descriptor is the declarative contract attached to one bindable
//! operation: which export-table ordinal it maps to, how it is to be called,
//! and what it returns. Descriptors are plain immutable data supplied when a
//! bound interface is declared; they are never runtime state.

use crate::types::{CallConv, Encoding, ReturnKind};

/// Static binding metadata for a single ordinal-bound operation.
///
/// `convention` and `encoding` are overrides; `None` means "inherit the
/// library default". The declared return kind is always explicit, since it
/// decides how the native return value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalDescriptor {
    /// Export-table ordinal of the target function.
    pub ordinal: u16,
    /// Calling-convention override; `None` inherits the library default.
    pub convention: Option<CallConv>,
    /// String-encoding override; `None` inherits the library default.
    pub encoding: Option<Encoding>,
    /// Declared return type of the operation.
    pub returns: ReturnKind,
}

impl OrdinalDescriptor {
    /// Declare a binding to `ordinal` returning `returns`, inheriting the
    /// library defaults for convention and encoding.
    pub fn new(ordinal: u16, returns: ReturnKind) -> Self {
        Self {
            ordinal,
            convention: None,
            encoding: None,
            returns,
        }
    }

    /// Override the calling convention for this operation.
    pub fn with_convention(mut self, convention: CallConv) -> Self {
        self.convention = Some(convention);
        self
    }

    /// Override the string encoding for this operation.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Effective calling convention given the library default.
    pub fn effective_convention(&self, default: CallConv) -> CallConv {
        self.convention.unwrap_or(default)
    }

    /// Effective string encoding given the library default.
    pub fn effective_encoding(&self, default: Encoding) -> Encoding {
        self.encoding.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_default_to_inherit() {
        let desc = OrdinalDescriptor::new(750, ReturnKind::Int);
        assert_eq!(desc.effective_convention(CallConv::Stdcall), CallConv::Stdcall);
        assert_eq!(desc.effective_encoding(Encoding::Wide), Encoding::Wide);
    }

    #[test]
    fn explicit_overrides_win() {
        let desc = OrdinalDescriptor::new(750, ReturnKind::Int)
            .with_convention(CallConv::C)
            .with_encoding(Encoding::Ansi);
        assert_eq!(desc.effective_convention(CallConv::Stdcall), CallConv::C);
        assert_eq!(desc.effective_encoding(Encoding::Wide), Encoding::Ansi);
    }
}
