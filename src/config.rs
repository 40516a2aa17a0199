//! Configuration for predicate conflict detection

use crate::error::{PredicateError, Result};
use crate::predicate_lock::{ConflictKind, IsolationLevel};
use serde::{Deserialize, Serialize};

/// Which predicate pairs count as a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Write/read, write/write and read/write pairs are always checked
    #[default]
    Strict,
    /// Pairs are checked according to the stricter isolation level of the
    /// two locks (see [`ConflictPolicy::checks`])
    IsolationAware,
}

impl ConflictPolicy {
    /// Is a pair of this kind checked at the given effective isolation level?
    ///
    /// | level             | write/read | write/write | read/write |
    /// |-------------------|------------|-------------|------------|
    /// | FullySerializable | yes        | yes         | yes        |
    /// | DirtyRead         | no         | yes         | no         |
    /// | DirtyWrite        | no         | no          | no         |
    pub fn checks(&self, level: IsolationLevel, kind: ConflictKind) -> bool {
        match self {
            ConflictPolicy::Strict => true,
            ConflictPolicy::IsolationAware => match level {
                IsolationLevel::FullySerializable => true,
                IsolationLevel::DirtyRead => kind == ConflictKind::WriteWrite,
                IsolationLevel::DirtyWrite => false,
            },
        }
    }
}

/// Configuration for a predicate lock table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Isolation level for transactions that do not ask for one
    pub default_isolation: IsolationLevel,
    /// Conflict policy applied when comparing locks
    pub conflict_policy: ConflictPolicy,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            default_isolation: IsolationLevel::FullySerializable,
            conflict_policy: ConflictPolicy::Strict,
        }
    }
}

impl LockConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PredicateError::InvalidConfig(e.to_string()))
    }
}
