//! Error types for predicate analysis and conflict detection

use crate::types::{AttributeRef, TypeId};
use thiserror::Error as ThisError;

/// Errors raised by the predicate algebra and the lock table.
///
/// Type errors are never folded into a "no conflict" answer: a caller that
/// receives one must treat the conflict check as failed.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum PredicateError {
    /// Two values of incompatible declared types were compared
    #[error("type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: TypeId, right: TypeId },

    /// A value does not conform to the type it was declared with
    #[error("type mismatch: value {value} is not a valid {declared}")]
    ValueTypeMismatch { declared: TypeId, value: String },

    /// A predicate tree node the breakdown cannot interpret
    #[error("unsupported predicate shape: {0}")]
    UnsupportedPredicateShape(String),

    /// Two predicates were combined although they constrain different attributes
    #[error("attribute mismatch: {left} vs {right}")]
    AttributeMismatch {
        left: AttributeRef,
        right: AttributeRef,
    },

    /// A double-sided range was built from bounds that do not form an interval
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),

    #[error("transaction {0} not found")]
    UnknownTransaction(u64),

    #[error("transaction {0} has already published its predicate lock")]
    AlreadyPublished(u64),
}

impl PredicateError {
    /// True for both flavours of type error.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(
            self,
            PredicateError::TypeMismatch { .. } | PredicateError::ValueTypeMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PredicateError>;
