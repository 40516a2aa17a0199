//! Deed Predicate Locks - Concurrency Control Core
//!
//! Decides whether the declared read and write sets of two transactions may
//! touch a common tuple.
//!
//! # Architecture
//!
//! - Types Layer: attribute references, declared types and typed values
//! - Comparison Layer: type-checked `=`, `<`, `<=`, `>`, `>=`
//! - Predicate Layer: atomic single-attribute predicates and their intersection
//! - Breakdown Layer: query predicate tree -> atomic predicates, with AND simplification
//! - Lock Layer: per-transaction predicate locks and the live lock table

pub mod error;
pub mod types;
pub mod comparison;
pub mod config;

// Predicate algebra
pub mod predicate;
pub mod merge;
pub mod breakdown;

// Lock modules
pub mod predicate_lock;
pub mod lock_table;

pub use error::{PredicateError, Result};
pub use types::{AttributeId, AttributeRef, RelationId, Type, TypeId, TypedValue};
pub use comparison::ComparisonId;
pub use config::{ConflictPolicy, LockConfig};

// Predicate exports
pub use predicate::{
    AtomicPredicate, BoundKind, DoubleSidedRangePredicate, EqualityPredicate, PredicateKind, RangePredicate,
    SharedPredicate,
};
pub use merge::{combine_conjuncts, merge_range};
pub use breakdown::{breakdown, ComparisonPredicate, PredicateNode, Scalar};

// Lock exports
pub use predicate_lock::{ConflictKind, IsolationLevel, PredicateLock};
pub use lock_table::{PredicateLockTable, TransactionId};
