//! Native symbol resolution by ordinal
//!
//! The [`ModuleSymbols`] trait is the seam between the dispatcher and the OS
//! loader: given an ordinal, produce the corresponding function pointer or a
//! structured fault. The production implementation ([`OsModule`], win32 only)
//! wraps ordinal-indexed `GetProcAddress` through `libloading`; tests supply
//! in-process fakes.

use libffi::middle::CodePtr;
use std::fmt;

/// Failure to resolve an ordinal to a function pointer.
///
/// Distinct from a library-load failure: the module is loaded and valid, but
/// has no export at the requested position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFault {
    /// Decoded, human-readable loader message.
    pub message: String,
    /// Platform error code, when the loader reported one.
    pub code: Option<i32>,
}

impl ResolveFault {
    /// Fault with a message and no platform code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Fault carrying a platform error code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for ResolveFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (os error {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Source of function pointers for a loaded module, indexed by ordinal.
///
/// Resolution is assumed deterministic and side-effect-free for a loaded
/// module, so racing resolutions of the same ordinal are harmless.
pub trait ModuleSymbols: Send + Sync {
    /// Resolve the export at `ordinal` to a callable function pointer.
    fn resolve(&self, ordinal: u16) -> Result<CodePtr, ResolveFault>;
}

/// Win32 module handle backing ordinal resolution.
///
/// Holds two references obtained in two phases, matching the loader's own
/// split: `LoadLibrary` to pin the library in memory for the lifetime of the
/// binding, and `GetModuleHandle` (via `open_already_loaded`) to obtain the
/// handle used for ordinal lookups. The phases can fail independently when
/// the two APIs normalize the library name differently, so both faults
/// surface at construction.
#[cfg(windows)]
pub struct OsModule {
    // Pins the library; lookups go through `module`.
    _backing: libloading::Library,
    module: libloading::os::windows::Library,
    name: String,
}

#[cfg(windows)]
impl OsModule {
    /// Load `name` and acquire its module handle.
    pub fn open(name: &str) -> Result<Self, crate::error::DispatchError> {
        let backing = unsafe { libloading::Library::new(name) }.map_err(|e| {
            crate::error::DispatchError::LibraryLoad {
                library: name.to_string(),
                message: format!("load failed: {e}"),
            }
        })?;

        let module =
            libloading::os::windows::Library::open_already_loaded(name).map_err(|e| {
                crate::error::DispatchError::LibraryLoad {
                    library: name.to_string(),
                    message: format!("module handle lookup failed: {e}"),
                }
            })?;

        tracing::debug!(target: "ordbind", library = name, "bound native library");

        Ok(Self {
            _backing: backing,
            module,
            name: name.to_string(),
        })
    }

    /// Library name this module was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(windows)]
impl ModuleSymbols for OsModule {
    fn resolve(&self, ordinal: u16) -> Result<CodePtr, ResolveFault> {
        let symbol: libloading::os::windows::Symbol<unsafe extern "system" fn()> =
            unsafe { self.module.get_ordinal(ordinal) }.map_err(|e| {
                let code = std::io::Error::last_os_error().raw_os_error();
                match code {
                    Some(code) => ResolveFault::with_code(e.to_string(), code),
                    None => ResolveFault::new(e.to_string()),
                }
            })?;
        Ok(CodePtr::from_ptr(*symbol as *const std::ffi::c_void))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_includes_code_when_present() {
        let fault = ResolveFault::with_code("The specified procedure could not be found.", 127);
        assert_eq!(
            fault.to_string(),
            "The specified procedure could not be found. (os error 127)"
        );
    }

    #[test]
    fn fault_display_without_code() {
        let fault = ResolveFault::new("no export at ordinal 65000");
        assert_eq!(fault.to_string(), "no export at ordinal 65000");
    }
}
