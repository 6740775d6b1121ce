//! FFI type model for ordinal-bound calls
//!
//! Defines:
//! - `CallConv`: calling conventions a native entry point may require
//! - `Encoding`: string encodings applied to string-bearing values
//! - `Value`: runtime values crossing the FFI boundary
//! - `ReturnKind`: the declared return type of a bound operation
//!
//! The value model is deliberately small: scalars, raw pointers and strings.
//! Structure and array marshalling is out of scope for ordinal dispatch.

use std::ffi::c_void;

/// Calling convention a native function expects from its caller.
///
/// `Stdcall` only differs from `C` on 32-bit Windows; on every other
/// supported target both map to the platform's default ABI. The variant is
/// still tracked separately because it participates in resolution-cache
/// identity: the same export invoked under two conventions must not share a
/// cached binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallConv {
    /// C calling convention (cdecl on x86).
    #[default]
    C,
    /// Win32 `stdcall` convention (callee cleans the stack on x86).
    Stdcall,
}

/// Encoding applied to string arguments and string return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Narrow NUL-terminated bytes (`char*`). Strings are passed as UTF-8.
    #[default]
    Ansi,
    /// Wide NUL-terminated UTF-16 units (`wchar_t*` on Windows).
    Wide,
}

impl Encoding {
    /// Display name used in diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            Encoding::Ansi => "ansi",
            Encoding::Wide => "wide",
        }
    }
}

/// Runtime value passed to or returned from a native function.
///
/// String values are marshalled according to the effective [`Encoding`] of
/// the call; everything else is passed through bit-exact.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value; only produced by calls declared [`ReturnKind::Void`].
    Void,
    /// C `int` (i32).
    Int(i32),
    /// C `long long` / `int64_t`.
    Long(i64),
    /// C `double`.
    Double(f64),
    /// Raw pointer, passed unchanged. Covers caller-managed buffers.
    Ptr(*mut c_void),
    /// String, marshalled as a NUL-terminated buffer per the call encoding.
    Str(String),
}

impl Value {
    /// Convenience constructor for string values.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Display name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Ptr(_) => "pointer",
            Value::Str(_) => "string",
        }
    }
}

/// Declared return type of a bound operation.
///
/// Part of the resolution-cache key: the same ordinal declared with two
/// different return kinds is two distinct bindings, because the return value
/// must be interpreted differently after the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnKind {
    /// No return value.
    #[default]
    Void,
    /// C `int`.
    Int,
    /// C `long long` / `int64_t`.
    Long,
    /// C `double`.
    Double,
    /// Raw pointer, returned unchanged.
    Ptr,
    /// NUL-terminated string pointer, decoded per the call encoding.
    Str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_win32_conventions() {
        assert_eq!(CallConv::default(), CallConv::C);
        assert_eq!(Encoding::default(), Encoding::Ansi);
        assert_eq!(ReturnKind::default(), ReturnKind::Void);
    }

    #[test]
    fn value_kind_names() {
        assert_eq!(Value::Int(1).kind_name(), "int");
        assert_eq!(Value::string("x").kind_name(), "string");
        assert_eq!(Value::Ptr(std::ptr::null_mut()).kind_name(), "pointer");
    }
}
