//! Error taxonomy for ordinal binding and dispatch
//!
//! Four distinct failure classes, all surfaced synchronously:
//! - `MissingBinding`: the operation was never declared with ordinal
//!   metadata. A programmer error, equivalent to a link error.
//! - `LibraryLoad`: the backing library could not be loaded, or its module
//!   handle could not be obtained. Raised at construction time only.
//! - `SymbolResolution`: the loaded module has no export at the requested
//!   ordinal. Carries the operation name, the ordinal and the decoded OS
//!   error, since an ordinal gives no symbolic name to debug with.
//! - `NativeCall`: the call itself failed (marshalling fault, bad string
//!   return). Distinct from resolution failures.
//!
//! Nothing is retried and nothing is negatively cached: a failed resolution
//! is attempted again on the next call with the same key.

use crate::marshal::CallError;
use thiserror::Error;

/// Errors produced by [`OrdinalLibrary`](crate::OrdinalLibrary) construction
/// and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The invoked operation carries no ordinal binding declaration.
    #[error("operation '{operation}' is not declared with an ordinal binding")]
    MissingBinding {
        /// Name of the undeclared operation.
        operation: String,
    },

    /// The backing library could not be loaded or its module handle could
    /// not be obtained.
    #[error("failed to bind library '{library}': {message}")]
    LibraryLoad {
        /// Library name as given to `open`.
        library: String,
        /// Loader error detail, including which phase failed.
        message: String,
    },

    /// No export exists at the requested ordinal in the loaded module.
    #[error(
        "could not resolve native function for operation '{operation}' at ordinal {ordinal}: {message}"
    )]
    SymbolResolution {
        /// Name of the operation whose resolution failed.
        operation: String,
        /// Ordinal that has no corresponding export.
        ordinal: u16,
        /// Decoded OS error message.
        message: String,
        /// Platform error code, when one was reported.
        code: Option<i32>,
    },

    /// The resolved native function could not be invoked.
    #[error("native call for operation '{operation}' failed: {source}")]
    NativeCall {
        /// Name of the operation being invoked.
        operation: String,
        /// Underlying marshalling or call fault.
        #[source]
        source: CallError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_names_operation_and_ordinal() {
        let err = DispatchError::SymbolResolution {
            operation: "GetTempPathW".into(),
            ordinal: 65000,
            message: "The specified procedure could not be found.".into(),
            code: Some(127),
        };
        let text = err.to_string();
        assert!(text.contains("GetTempPathW"));
        assert!(text.contains("65000"));
        assert!(text.contains("could not be found"));
    }

    #[test]
    fn missing_binding_is_distinct_from_resolution() {
        let err = DispatchError::MissingBinding {
            operation: "Undeclared".into(),
        };
        assert!(matches!(err, DispatchError::MissingBinding { .. }));
        assert!(err.to_string().contains("Undeclared"));
    }
}
