//! Error types.

use thiserror::Error;

/// Failure reported by an [`InternalStore`](crate::store::InternalStore)
/// when it cannot take a new item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("internal store is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("internal store rejected the item: {0}")]
    Rejected(String),
}

/// Expected, recoverable outcomes of editing operations.
///
/// Every operation returning one of these leaves the compositor exactly as it
/// was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositorError {
    #[error("internal store refused an item at internal offset {offset}")]
    Store {
        offset: usize,
        #[source]
        source: StoreError,
    },

    #[error("item {index} cannot be merged into: it is not a list item")]
    IneligibleMergeTarget { index: usize },

    #[error("internal store declined to merge item {from} into item {to}")]
    MergeDeclined { from: usize, to: usize },
}

/// A broken structural invariant. Always a bug in the compositor itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("sum of visible range counts is {actual}, absolute count is {expected}")]
    AbsoluteCount { expected: usize, actual: usize },

    #[error("sum of internal range counts is {actual}, internal count is {expected}")]
    InternalCount { expected: usize, actual: usize },

    #[error("range {position} is both null and internal with {count} items")]
    NullInternal { position: usize, count: usize },

    #[error("null range {position} has a count of {count}")]
    NullWithItems { position: usize, count: usize },

    #[error("range {position} is neither null nor populated")]
    Empty { position: usize },

    #[error("range {position} references no list and is not internal")]
    Unbacked { position: usize },
}
