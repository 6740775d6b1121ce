//! Bound library handles and the invocation dispatcher
//!
//! An [`OrdinalLibrary`] is constructed once per target library and owns the
//! module reference, the call defaults and the shared resolution cache.
//! Every call on a bound interface funnels through [`OrdinalLibrary::dispatch`]:
//! validate the declaration, compute the effective convention and encoding,
//! look up or build the resolved handle, invoke.

use crate::cache::{FunctionKey, ResolutionCache};
use crate::caller::BoundFunction;
use crate::descriptor::OrdinalDescriptor;
use crate::error::DispatchError;
use crate::resolver::ModuleSymbols;
use crate::types::{CallConv, Encoding, Value};

#[cfg(windows)]
use crate::resolver::OsModule;

/// Handle to a dynamic library whose exports are bound by ordinal.
///
/// Holds the module reference used for lookups, the default calling
/// convention and string encoding, and the resolution cache. The cache is
/// safe to share across threads; see [`ResolutionCache`].
pub struct OrdinalLibrary<M: ModuleSymbols> {
    module: M,
    default_convention: CallConv,
    default_encoding: Encoding,
    cache: ResolutionCache,
}

#[cfg(windows)]
impl OrdinalLibrary<OsModule> {
    /// Load `name` and bind it for ordinal dispatch.
    ///
    /// Performs both loader phases up front: loading (or attaching to) the
    /// library, and obtaining its module handle for later ordinal lookups.
    /// Either phase failing is a [`DispatchError::LibraryLoad`] surfaced
    /// here, never deferred to call time. A `default_encoding` of `None`
    /// selects the platform default (narrow).
    pub fn open(
        name: &str,
        default_convention: CallConv,
        default_encoding: Option<Encoding>,
    ) -> Result<Self, DispatchError> {
        let module = OsModule::open(name)?;
        Ok(Self::with_module(
            module,
            default_convention,
            default_encoding,
        ))
    }
}

impl<M: ModuleSymbols> OrdinalLibrary<M> {
    /// Bind over an arbitrary symbol source.
    ///
    /// This is the seam used by tests and by alternative loaders; `open`
    /// builds on it with the OS-backed module.
    pub fn with_module(
        module: M,
        default_convention: CallConv,
        default_encoding: Option<Encoding>,
    ) -> Self {
        Self {
            module,
            default_convention,
            default_encoding: default_encoding.unwrap_or_default(),
            cache: ResolutionCache::new(),
        }
    }

    /// The module this handle resolves ordinals against.
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Default calling convention applied when a descriptor has no override.
    pub fn default_convention(&self) -> CallConv {
        self.default_convention
    }

    /// Default string encoding applied when a descriptor has no override.
    pub fn default_encoding(&self) -> Encoding {
        self.default_encoding
    }

    /// Number of distinct bindings resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }

    /// Dispatch one intercepted call.
    ///
    /// `descriptor` is the operation's declared metadata; `None` means the
    /// operation was invoked without an ordinal binding declaration, which
    /// fails with [`DispatchError::MissingBinding`] before anything else is
    /// attempted. Resolution failures carry the operation name and ordinal;
    /// they are not cached, so the next call with the same key retries the
    /// loader.
    pub fn dispatch(
        &self,
        operation: &str,
        descriptor: Option<&OrdinalDescriptor>,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        let descriptor = descriptor.ok_or_else(|| DispatchError::MissingBinding {
            operation: operation.to_string(),
        })?;

        let convention = descriptor.effective_convention(self.default_convention);
        let encoding = descriptor.effective_encoding(self.default_encoding);
        let key = FunctionKey {
            ordinal: descriptor.ordinal,
            convention,
            encoding,
            returns: descriptor.returns,
        };

        let function = match self.cache.get(&key) {
            Some(function) => function,
            None => {
                let code = self.module.resolve(descriptor.ordinal).map_err(|fault| {
                    tracing::debug!(
                        target: "ordbind",
                        operation,
                        ordinal = descriptor.ordinal,
                        fault = %fault,
                        "ordinal resolution failed"
                    );
                    DispatchError::SymbolResolution {
                        operation: operation.to_string(),
                        ordinal: descriptor.ordinal,
                        message: fault.message,
                        code: fault.code,
                    }
                })?;
                tracing::trace!(
                    target: "ordbind",
                    operation,
                    ordinal = descriptor.ordinal,
                    "resolved ordinal to native entry point"
                );
                self.cache
                    .get_or_insert(key, BoundFunction::new(code, convention, encoding))
            }
        };

        // Safety: the declaration contract makes the caller responsible for
        // the descriptor matching the native function's actual signature.
        unsafe { function.invoke(descriptor.returns, args) }.map_err(|source| {
            DispatchError::NativeCall {
                operation: operation.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveFault;
    use crate::types::ReturnKind;
    use libffi::middle::CodePtr;
    use pretty_assertions::assert_eq;
    use std::ffi::c_void;
    use std::os::raw::c_int;
    use std::sync::atomic::{AtomicUsize, Ordering};

    extern "C" fn forty_two() -> c_int {
        42
    }

    /// Counting test double: ordinal 7 resolves, everything else faults.
    struct CountingModule {
        attempts: AtomicUsize,
    }

    impl CountingModule {
        fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl ModuleSymbols for CountingModule {
        fn resolve(&self, ordinal: u16) -> Result<CodePtr, ResolveFault> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if ordinal == 7 {
                Ok(CodePtr::from_ptr(forty_two as *const c_void))
            } else {
                Err(ResolveFault::with_code("no export at that ordinal", 127))
            }
        }
    }

    fn library() -> OrdinalLibrary<CountingModule> {
        OrdinalLibrary::with_module(CountingModule::new(), CallConv::C, None)
    }

    #[test]
    fn missing_descriptor_fails_before_resolution() {
        let lib = library();
        let err = lib.dispatch("Undeclared", None, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::MissingBinding { .. }));
        assert_eq!(lib.module.attempts(), 0);
    }

    #[test]
    fn second_call_with_same_key_skips_resolver() {
        let lib = library();
        let desc = OrdinalDescriptor::new(7, ReturnKind::Int);

        assert_eq!(lib.dispatch("FortyTwo", Some(&desc), &[]).unwrap(), Value::Int(42));
        assert_eq!(lib.dispatch("FortyTwo", Some(&desc), &[]).unwrap(), Value::Int(42));
        assert_eq!(lib.module.attempts(), 1);
        assert_eq!(lib.resolved_count(), 1);
    }

    #[test]
    fn distinct_keys_resolve_independently() {
        let lib = library();
        let narrow = OrdinalDescriptor::new(7, ReturnKind::Int);
        let wide = OrdinalDescriptor::new(7, ReturnKind::Int).with_encoding(Encoding::Wide);

        lib.dispatch("FortyTwo", Some(&narrow), &[]).unwrap();
        lib.dispatch("FortyTwo", Some(&wide), &[]).unwrap();
        assert_eq!(lib.module.attempts(), 2);
        assert_eq!(lib.resolved_count(), 2);
    }

    #[test]
    fn failed_resolution_is_retried_not_cached() {
        let lib = library();
        let desc = OrdinalDescriptor::new(65000, ReturnKind::Int);

        for _ in 0..3 {
            let err = lib.dispatch("Missing", Some(&desc), &[]).unwrap_err();
            match err {
                DispatchError::SymbolResolution {
                    operation,
                    ordinal,
                    code,
                    ..
                } => {
                    assert_eq!(operation, "Missing");
                    assert_eq!(ordinal, 65000);
                    assert_eq!(code, Some(127));
                }
                other => panic!("expected SymbolResolution, got {other}"),
            }
        }
        assert_eq!(lib.module.attempts(), 3);
        assert_eq!(lib.resolved_count(), 0);
    }

    #[test]
    fn descriptor_overrides_only_affect_their_key() {
        let lib = OrdinalLibrary::with_module(
            CountingModule::new(),
            CallConv::Stdcall,
            Some(Encoding::Wide),
        );
        let inherited = OrdinalDescriptor::new(7, ReturnKind::Int);
        let overridden = OrdinalDescriptor::new(7, ReturnKind::Int)
            .with_convention(CallConv::C)
            .with_encoding(Encoding::Ansi);

        lib.dispatch("A", Some(&inherited), &[]).unwrap();
        lib.dispatch("B", Some(&overridden), &[]).unwrap();
        assert_eq!(lib.resolved_count(), 2);
    }
}
