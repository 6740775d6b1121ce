//! Function resolution cache
//!
//! Memoizes ordinal resolutions so the OS loader is consulted at most once
//! per distinct binding. The key covers every dimension that changes how the
//! same native entry point must be invoked: ordinal, effective calling
//! convention, effective encoding and declared return kind. Hash and
//! equality are both derived over all four fields; hashing on the ordinal
//! alone would collide whenever one ordinal is bound under several
//! conventions.
//!
//! Failures are never cached. A key that failed to resolve is retried on the
//! next call, so transient loader conditions are not pinned.

use crate::caller::BoundFunction;
use crate::types::{CallConv, Encoding, ReturnKind};
use dashmap::DashMap;

/// Identity of one resolved binding.
///
/// Two operations sharing an ordinal but differing in convention, encoding
/// or return kind must not share a cached resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionKey {
    /// Export-table ordinal.
    pub ordinal: u16,
    /// Effective calling convention of the call.
    pub convention: CallConv,
    /// Effective string encoding of the call.
    pub encoding: Encoding,
    /// Declared return kind of the operation.
    pub returns: ReturnKind,
}

/// Concurrent key → handle map shared by every call through one library
/// handle.
///
/// `get_or_insert` is atomic per key; two threads racing to resolve the same
/// missing key may both perform the (idempotent) OS lookup, but exactly one
/// handle is published and no reader observes a partial entry.
#[derive(Default)]
pub struct ResolutionCache {
    entries: DashMap<FunctionKey, BoundFunction>,
}

impl ResolutionCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for `key`, if one was already published.
    pub fn get(&self, key: &FunctionKey) -> Option<BoundFunction> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Publish `function` under `key` unless a racing resolver got there
    /// first; returns the handle that ends up cached.
    pub fn get_or_insert(&self, key: FunctionKey, function: BoundFunction) -> BoundFunction {
        self.entries.entry(key).or_insert(function).value().clone()
    }

    /// Number of distinct resolved bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
