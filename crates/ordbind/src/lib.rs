//! ordbind - ordinal-based dynamic binding for native library exports
//!
//! Some native libraries export functions only by ordinal position in their
//! export table, with no symbolic name to link against. This crate binds
//! such exports and dispatches calls to them:
//! - declare an interface whose operations carry ordinal metadata
//! - resolve each ordinal to a function pointer on first use
//! - cache the resolution keyed by ordinal, calling convention, string
//!   encoding and return kind
//! - invoke through libffi with the correct ABI and marshalled arguments
//!
//! OS-backed module loading is win32 only (the ordinal `GetProcAddress`
//! contract); the dispatcher, cache and marshalling layers are platform
//! neutral behind the [`ModuleSymbols`] trait.

/// ordbind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod cache;
pub mod caller;
pub mod descriptor;
pub mod error;
pub mod interface;
pub mod library;
pub mod marshal;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use cache::{FunctionKey, ResolutionCache};
pub use caller::BoundFunction;
pub use descriptor::OrdinalDescriptor;
pub use error::DispatchError;
pub use interface::OrdinalInterface;
pub use library::OrdinalLibrary;
pub use marshal::CallError;
pub use resolver::{ModuleSymbols, ResolveFault};
#[cfg(windows)]
pub use resolver::OsModule;
pub use types::{CallConv, Encoding, ReturnKind, Value};
