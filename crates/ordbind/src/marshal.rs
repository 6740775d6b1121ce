//! Argument and return-value marshalling
//!
//! Converts [`Value`]s into the C-compatible cells libffi passes to the
//! native function, and decodes returned string pointers. The [`ArgPack`]
//! owns every temporary buffer (NUL-terminated narrow and wide strings) for
//! the duration of one call, so the native side never observes a dangling
//! pointer.

use crate::types::{Encoding, Value};
use libffi::middle::{Arg, Type};
use std::ffi::{c_void, CStr, CString};
use thiserror::Error;

/// Faults raised while marshalling arguments or interpreting the return
/// value of a native call.
#[derive(Debug, Error)]
pub enum CallError {
    /// A string argument contains an interior NUL and cannot be passed as a
    /// NUL-terminated buffer.
    #[error("string argument contains an interior NUL byte")]
    InteriorNul,
    /// A value kind that cannot be passed as an argument (e.g. `Void`).
    #[error("value of kind '{0}' cannot be passed as an argument")]
    UnsupportedArgument(&'static str),
    /// A call declared to return a string produced a null pointer.
    #[error("native function returned a null string pointer")]
    NullStringReturn,
}

// One C-compatible argument cell. Pointer cells hold the address of a buffer
// owned by the surrounding ArgPack or by the caller.
enum ArgCell {
    I32(i32),
    I64(i64),
    F64(f64),
    Ptr(*mut c_void),
}

/// Marshalled argument list for a single native call.
///
/// Buffers live as long as the pack; build it, perform the call, drop it.
pub struct ArgPack {
    cells: Vec<ArgCell>,
    // Keep-alive storage for encoded string arguments.
    _narrow: Vec<CString>,
    _wide: Vec<Vec<u16>>,
}

impl ArgPack {
    /// Encode `args` for a call using `encoding` for string values.
    pub fn build(args: &[Value], encoding: Encoding) -> Result<Self, CallError> {
        let mut cells = Vec::with_capacity(args.len());
        let mut narrow = Vec::new();
        let mut wide = Vec::new();

        for value in args {
            let cell = match value {
                Value::Int(v) => ArgCell::I32(*v),
                Value::Long(v) => ArgCell::I64(*v),
                Value::Double(v) => ArgCell::F64(*v),
                Value::Ptr(p) => ArgCell::Ptr(*p),
                Value::Str(s) => match encoding {
                    Encoding::Ansi => {
                        let c = CString::new(s.as_str()).map_err(|_| CallError::InteriorNul)?;
                        let ptr = c.as_ptr() as *mut c_void;
                        narrow.push(c);
                        ArgCell::Ptr(ptr)
                    }
                    Encoding::Wide => {
                        let mut units: Vec<u16> = s.encode_utf16().collect();
                        if units.contains(&0) {
                            return Err(CallError::InteriorNul);
                        }
                        units.push(0);
                        let ptr = units.as_ptr() as *mut c_void;
                        wide.push(units);
                        ArgCell::Ptr(ptr)
                    }
                },
                Value::Void => return Err(CallError::UnsupportedArgument(value.kind_name())),
            };
            cells.push(cell);
        }

        Ok(Self {
            cells,
            _narrow: narrow,
            _wide: wide,
        })
    }

    /// libffi types describing each argument cell.
    pub fn ffi_types(&self) -> Vec<Type> {
        self.cells
            .iter()
            .map(|cell| match cell {
                ArgCell::I32(_) => Type::i32(),
                ArgCell::I64(_) => Type::i64(),
                ArgCell::F64(_) => Type::f64(),
                ArgCell::Ptr(_) => Type::pointer(),
            })
            .collect()
    }

    /// libffi argument references into this pack. The pack must outlive the
    /// call these are used for.
    pub fn ffi_args(&self) -> Vec<Arg> {
        self.cells
            .iter()
            .map(|cell| match cell {
                ArgCell::I32(v) => Arg::new(v),
                ArgCell::I64(v) => Arg::new(v),
                ArgCell::F64(v) => Arg::new(v),
                ArgCell::Ptr(v) => Arg::new(v),
            })
            .collect()
    }
}

/// Decode a NUL-terminated string pointer returned by a native call.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer in the encoding
/// given, valid for reads up to and including its terminator.
pub unsafe fn decode_string(ptr: *const c_void, encoding: Encoding) -> Result<String, CallError> {
    if ptr.is_null() {
        return Err(CallError::NullStringReturn);
    }
    match encoding {
        Encoding::Ansi => Ok(CStr::from_ptr(ptr as *const std::ffi::c_char)
            .to_string_lossy()
            .into_owned()),
        Encoding::Wide => {
            let mut units = Vec::new();
            let mut cursor = ptr as *const u16;
            while *cursor != 0 {
                units.push(*cursor);
                cursor = cursor.add(1);
            }
            Ok(String::from_utf16_lossy(&units))
        }
    }
}

/// Decode the UTF-16 contents of a caller-managed wide buffer, stopping at
/// the first NUL or the end of the slice. Companion for out-parameter
/// patterns like `GetTempPathW`.
pub fn decode_wide_buffer(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&u| u == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_args_pass_through() {
        let pack = ArgPack::build(
            &[Value::Int(7), Value::Long(-1), Value::Double(0.5)],
            Encoding::Ansi,
        )
        .unwrap();
        assert_eq!(pack.ffi_types().len(), 3);
        assert_eq!(pack.ffi_args().len(), 3);
    }

    #[test]
    fn ansi_string_is_nul_terminated() {
        let pack = ArgPack::build(&[Value::string("temp")], Encoding::Ansi).unwrap();
        let ArgCell::Ptr(ptr) = &pack.cells[0] else {
            panic!("string should marshal to a pointer cell");
        };
        let decoded = unsafe { decode_string(*ptr, Encoding::Ansi) }.unwrap();
        assert_eq!(decoded, "temp");
    }

    #[test]
    fn wide_string_round_trips() {
        let pack = ArgPack::build(&[Value::string("Tempfad")], Encoding::Wide).unwrap();
        let ArgCell::Ptr(ptr) = &pack.cells[0] else {
            panic!("string should marshal to a pointer cell");
        };
        let decoded = unsafe { decode_string(*ptr, Encoding::Wide) }.unwrap();
        assert_eq!(decoded, "Tempfad");
    }

    #[test]
    fn interior_nul_is_rejected() {
        let result = ArgPack::build(&[Value::string("a\0b")], Encoding::Ansi);
        assert!(matches!(result, Err(CallError::InteriorNul)));
        let result = ArgPack::build(&[Value::string("a\0b")], Encoding::Wide);
        assert!(matches!(result, Err(CallError::InteriorNul)));
    }

    #[test]
    fn void_argument_is_rejected() {
        let result = ArgPack::build(&[Value::Void], Encoding::Ansi);
        assert!(matches!(result, Err(CallError::UnsupportedArgument("void"))));
    }

    #[test]
    fn null_string_return_is_an_error() {
        let result = unsafe { decode_string(std::ptr::null(), Encoding::Ansi) };
        assert!(matches!(result, Err(CallError::NullStringReturn)));
    }

    #[test]
    fn wide_buffer_stops_at_nul() {
        let mut buffer: Vec<u16> = "C:\\Temp\\".encode_utf16().collect();
        buffer.push(0);
        buffer.extend_from_slice(&[0x2e, 0x2e]);
        assert_eq!(decode_wide_buffer(&buffer), "C:\\Temp\\");
    }
}
