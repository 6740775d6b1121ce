//! Bound interfaces - the explicit dispatch table
//!
//! Interception is table-driven, no reflection involved: an interface is
//! declared as a list of operation names, each optionally carrying an
//! [`OrdinalDescriptor`]. Calls
//! go through [`OrdinalInterface::call`], which performs the pure metadata
//! lookup and forwards to the library dispatcher. Operations declared
//! without metadata (or never declared) fail with
//! [`DispatchError::MissingBinding`].

use crate::descriptor::OrdinalDescriptor;
use crate::error::DispatchError;
use crate::library::OrdinalLibrary;
use crate::resolver::ModuleSymbols;
use crate::types::Value;
use std::collections::HashMap;

/// An interface whose operations are bound to a library by ordinal.
pub struct OrdinalInterface<M: ModuleSymbols> {
    library: OrdinalLibrary<M>,
    table: HashMap<String, Option<OrdinalDescriptor>>,
}

impl<M: ModuleSymbols> OrdinalInterface<M> {
    /// Declare an interface over `library`.
    ///
    /// Each entry names one operation; `None` declares the operation without
    /// ordinal metadata, which makes every call to it a binding error. That
    /// mirrors an interface method missing its binding annotation.
    pub fn new<N>(
        library: OrdinalLibrary<M>,
        declarations: impl IntoIterator<Item = (N, Option<OrdinalDescriptor>)>,
    ) -> Self
    where
        N: Into<String>,
    {
        let table = declarations
            .into_iter()
            .map(|(name, descriptor)| (name.into(), descriptor))
            .collect();
        Self { library, table }
    }

    /// Declared metadata for `operation`, if any. Pure lookup; never touches
    /// the resolution cache.
    pub fn descriptor(&self, operation: &str) -> Option<&OrdinalDescriptor> {
        self.table.get(operation).and_then(|d| d.as_ref())
    }

    /// Invoke `operation` with `args` through the library dispatcher.
    pub fn call(&self, operation: &str, args: &[Value]) -> Result<Value, DispatchError> {
        self.library.dispatch(operation, self.descriptor(operation), args)
    }

    /// The underlying bound library handle.
    pub fn library(&self) -> &OrdinalLibrary<M> {
        &self.library
    }
}
