//! Resolved function handles and native invocation
//!
//! A [`BoundFunction`] is the executable product of ordinal resolution: the
//! function pointer plus the calling convention and string encoding it must
//! be invoked with. Handles are cheap to clone and are what the resolution
//! cache stores.
//!
//! Invocation builds a libffi CIF from the marshalled argument pack and the
//! declared return kind, selecting the ABI that matches the effective
//! calling convention.

use crate::marshal::{self, ArgPack, CallError};
use crate::types::{CallConv, Encoding, ReturnKind, Value};
use libffi::middle::{Builder, CodePtr, Type};
use libffi::raw::ffi_abi;
use std::ffi::c_void;
use std::os::raw::{c_double, c_int, c_longlong};

/// Map a calling convention to the libffi ABI for the current target.
///
/// `stdcall` is only a distinct ABI on 32-bit Windows; everywhere else the
/// default ABI covers both conventions.
fn convention_abi(convention: CallConv) -> ffi_abi {
    #[cfg(all(windows, target_arch = "x86"))]
    {
        match convention {
            CallConv::C => libffi::raw::ffi_abi_FFI_MS_CDECL,
            CallConv::Stdcall => libffi::raw::ffi_abi_FFI_STDCALL,
        }
    }
    #[cfg(not(all(windows, target_arch = "x86")))]
    {
        let _ = convention;
        libffi::raw::ffi_abi_FFI_DEFAULT_ABI
    }
}

/// Executable binding to one native function pointer.
///
/// Created lazily on first use of a resolution key, then cached for the
/// lifetime of the owning library handle. Never invalidated.
#[derive(Clone)]
pub struct BoundFunction {
    code: CodePtr,
    convention: CallConv,
    encoding: Encoding,
}

// A BoundFunction is an immutable function pointer plus two Copy enums; the
// pointee is a loaded code segment pinned by the owning library handle.
unsafe impl Send for BoundFunction {}
unsafe impl Sync for BoundFunction {}

impl BoundFunction {
    /// Wrap a resolved function pointer with the convention and encoding it
    /// must be invoked under.
    pub fn new(code: CodePtr, convention: CallConv, encoding: Encoding) -> Self {
        Self {
            code,
            convention,
            encoding,
        }
    }

    /// Encoding applied to string-bearing values of this binding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Calling convention of this binding.
    pub fn convention(&self) -> CallConv {
        self.convention
    }

    /// Invoke the native function with `args`, interpreting the return value
    /// as `returns`.
    ///
    /// # Safety
    ///
    /// Callers must guarantee the bound pointer refers to a function whose
    /// actual signature is compatible with `args` and `returns` under this
    /// handle's calling convention. Mismatches are undefined behavior, as
    /// with any foreign call.
    pub unsafe fn invoke(&self, returns: ReturnKind, args: &[Value]) -> Result<Value, CallError> {
        let pack = ArgPack::build(args, self.encoding)?;
        let ffi_args = pack.ffi_args();

        let result_type = match returns {
            ReturnKind::Void => Type::void(),
            ReturnKind::Int => Type::i32(),
            ReturnKind::Long => Type::i64(),
            ReturnKind::Double => Type::f64(),
            ReturnKind::Ptr | ReturnKind::Str => Type::pointer(),
        };

        let cif = Builder::new()
            .args(pack.ffi_types().into_iter())
            .res(result_type)
            .abi(convention_abi(self.convention))
            .into_cif();

        let value = match returns {
            ReturnKind::Void => {
                let _: c_void = cif.call(self.code, &ffi_args);
                Value::Void
            }
            ReturnKind::Int => Value::Int(cif.call::<c_int>(self.code, &ffi_args)),
            ReturnKind::Long => Value::Long(cif.call::<c_longlong>(self.code, &ffi_args)),
            ReturnKind::Double => Value::Double(cif.call::<c_double>(self.code, &ffi_args)),
            ReturnKind::Ptr => Value::Ptr(cif.call::<*mut c_void>(self.code, &ffi_args)),
            ReturnKind::Str => {
                let ptr = cif.call::<*const c_void>(self.code, &ffi_args);
                Value::Str(marshal::decode_string(ptr, self.encoding)?)
            }
        };

        Ok(value)
    }
}
