//! Predicate Locks
//!
//! A transaction's declared read and write predicates. Two locks conflict when
//! a write predicate of one may touch a tuple the other reads or writes.
//! Readers never conflict with readers.
//!
//! A lock is filled by its own transaction and only read afterwards; callers
//! that check it from other threads must finish declaration first.

use crate::breakdown::{breakdown, PredicateNode};
use crate::config::ConflictPolicy;
use crate::error::Result;
use crate::predicate::SharedPredicate;
use crate::types::{AttributeId, AttributeRef, RelationId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Isolation level for a predicate lock, from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Writes may overlap uncommitted writes
    DirtyWrite,
    /// Reads may observe uncommitted writes
    DirtyRead,
    /// Full serializability
    FullySerializable,
}

impl Default for IsolationLevel {
    fn default() -> Self {
        IsolationLevel::FullySerializable
    }
}

/// Which sets of the two locks produced a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// this.write × other.read
    WriteRead,
    /// this.write × other.write
    WriteWrite,
    /// this.read × other.write
    ReadWrite,
}

#[derive(Debug, Clone, Default)]
pub struct PredicateLock {
    iso_level: IsolationLevel,
    read_predicates: Vec<SharedPredicate>,
    write_predicates: Vec<SharedPredicate>,
}

impl PredicateLock {
    pub fn new(iso_level: IsolationLevel) -> Self {
        PredicateLock {
            iso_level,
            read_predicates: Vec::new(),
            write_predicates: Vec::new(),
        }
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.iso_level
    }

    pub fn read_predicates(&self) -> &[SharedPredicate] {
        &self.read_predicates
    }

    pub fn write_predicates(&self) -> &[SharedPredicate] {
        &self.write_predicates
    }

    pub fn add_predicate_read(&mut self, predicate: SharedPredicate) {
        self.read_predicates.push(predicate);
    }

    pub fn add_predicate_write(&mut self, predicate: SharedPredicate) {
        self.write_predicates.push(predicate);
    }

    /// Break `predicate` down and declare every part as read.
    /// Returns the number of predicates added.
    pub fn declare_read(&mut self, predicate: &PredicateNode) -> Result<usize> {
        let parts = breakdown(predicate)?;
        let added = parts.len();
        self.read_predicates.extend(parts);
        Ok(added)
    }

    /// Break `predicate` down and declare every part as written.
    /// Returns the number of predicates added.
    pub fn declare_write(&mut self, predicate: &PredicateNode) -> Result<usize> {
        let parts = breakdown(predicate)?;
        let added = parts.len();
        self.write_predicates.extend(parts);
        Ok(added)
    }

    /// Has this lock declared anything on the given column, read or write?
    pub fn covers_attribute(&self, relation: RelationId, attribute: AttributeId) -> bool {
        let attr = AttributeRef::new(relation, attribute);
        self.write_predicates
            .iter()
            .chain(self.read_predicates.iter())
            .any(|p| p.attribute() == attr)
    }

    pub fn num_predicates(&self) -> usize {
        self.read_predicates.len() + self.write_predicates.len()
    }

    /// Conflict test with write/read, write/write and read/write pairs all checked.
    pub fn intersects(&self, other: &PredicateLock) -> Result<bool> {
        self.intersects_with_policy(other, ConflictPolicy::Strict)
    }

    pub fn intersects_with_policy(&self, other: &PredicateLock, policy: ConflictPolicy) -> Result<bool> {
        Ok(self.first_conflict(other, policy)?.is_some())
    }

    /// The first pair kind found to conflict, in write/read, write/write,
    /// read/write order.
    pub fn first_conflict(&self, other: &PredicateLock, policy: ConflictPolicy) -> Result<Option<ConflictKind>> {
        let level = self.iso_level.max(other.iso_level);

        let pairs = [
            (ConflictKind::WriteRead, &self.write_predicates, &other.read_predicates),
            (ConflictKind::WriteWrite, &self.write_predicates, &other.write_predicates),
            (ConflictKind::ReadWrite, &self.read_predicates, &other.write_predicates),
        ];

        for (kind, mine, theirs) in pairs {
            if !policy.checks(level, kind) {
                continue;
            }
            if let Some((a, b)) = first_overlap(mine, theirs)? {
                debug!(?kind, ?level, this = %a, other = %b, "predicate lock conflict");
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }
}

fn first_overlap<'a>(
    mine: &'a [SharedPredicate],
    theirs: &'a [SharedPredicate],
) -> Result<Option<(&'a SharedPredicate, &'a SharedPredicate)>> {
    for a in mine {
        for b in theirs {
            if a.intersects(b)? {
                return Ok(Some((a, b)));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::ComparisonId;
    use crate::breakdown::Scalar;
    use crate::predicate::{AtomicPredicate, BoundKind};
    use crate::types::{Type, TypedValue};
    use std::sync::Arc;

    fn x() -> AttributeRef {
        AttributeRef::new(1, 0)
    }

    fn eq(v: i32) -> SharedPredicate {
        Arc::new(AtomicPredicate::equality(x(), Type::int(), TypedValue::Int(v)))
    }

    fn gt(v: i32) -> SharedPredicate {
        Arc::new(AtomicPredicate::range(x(), Type::int(), TypedValue::Int(v), BoundKind::LargerThan))
    }

    #[test]
    fn test_default_lock_is_serializable() {
        let lock = PredicateLock::default();
        assert_eq!(lock.isolation_level(), IsolationLevel::FullySerializable);
        assert_eq!(lock.num_predicates(), 0);
    }

    #[test]
    fn test_add_predicates_without_dedup() {
        let mut lock = PredicateLock::new(IsolationLevel::DirtyRead);
        lock.add_predicate_read(eq(1));
        lock.add_predicate_read(eq(1));
        lock.add_predicate_write(gt(3));

        assert_eq!(lock.read_predicates().len(), 2);
        assert_eq!(lock.write_predicates().len(), 1);
        assert_eq!(lock.num_predicates(), 3);
    }

    #[test]
    fn test_covers_attribute() {
        let mut lock = PredicateLock::default();
        lock.add_predicate_write(eq(1));
        lock.add_predicate_read(Arc::new(AtomicPredicate::any(AttributeRef::new(2, 5))));

        assert!(lock.covers_attribute(1, 0));
        assert!(lock.covers_attribute(2, 5));
        assert!(!lock.covers_attribute(1, 1));
    }

    #[test]
    fn test_write_read_conflict() {
        let mut t1 = PredicateLock::default();
        t1.add_predicate_write(eq(7));
        let mut t2 = PredicateLock::default();
        t2.add_predicate_read(gt(5));

        assert!(t1.intersects(&t2).unwrap());
        assert!(t2.intersects(&t1).unwrap());
        assert_eq!(
            t1.first_conflict(&t2, ConflictPolicy::Strict).unwrap(),
            Some(ConflictKind::WriteRead)
        );
        assert_eq!(
            t2.first_conflict(&t1, ConflictPolicy::Strict).unwrap(),
            Some(ConflictKind::ReadWrite)
        );

        let mut t3 = PredicateLock::default();
        t3.add_predicate_read(gt(100));
        assert!(!t1.intersects(&t3).unwrap());
    }

    #[test]
    fn test_write_write_conflict() {
        let mut t1 = PredicateLock::default();
        t1.add_predicate_write(gt(0));
        let mut t2 = PredicateLock::default();
        t2.add_predicate_write(eq(3));

        assert_eq!(
            t1.first_conflict(&t2, ConflictPolicy::Strict).unwrap(),
            Some(ConflictKind::WriteWrite)
        );
    }

    #[test]
    fn test_readers_never_conflict() {
        let mut t1 = PredicateLock::default();
        t1.add_predicate_read(eq(7));
        let mut t2 = PredicateLock::default();
        t2.add_predicate_read(eq(7));

        assert!(!t1.intersects(&t2).unwrap());
    }

    #[test]
    fn test_isolation_aware_policy() {
        let mut writer = PredicateLock::new(IsolationLevel::DirtyRead);
        writer.add_predicate_write(eq(7));
        let mut reader = PredicateLock::new(IsolationLevel::DirtyRead);
        reader.add_predicate_read(eq(7));

        assert!(writer.intersects(&reader).unwrap());
        assert!(!writer.intersects_with_policy(&reader, ConflictPolicy::IsolationAware).unwrap());

        // the stricter level of the pair decides
        let mut strict_reader = PredicateLock::new(IsolationLevel::FullySerializable);
        strict_reader.add_predicate_read(eq(7));
        assert!(writer
            .intersects_with_policy(&strict_reader, ConflictPolicy::IsolationAware)
            .unwrap());
    }

    #[test]
    fn test_declare_from_tree() {
        let mut lock = PredicateLock::default();
        let node = PredicateNode::and(
            PredicateNode::comparison(
                ComparisonId::Greater,
                Scalar::Attribute(x()),
                Scalar::literal(TypedValue::Int(5), Type::int()),
            ),
            PredicateNode::comparison(
                ComparisonId::Less,
                Scalar::Attribute(x()),
                Scalar::literal(TypedValue::Int(10), Type::int()),
            ),
        );

        assert_eq!(lock.declare_write(&node).unwrap(), 1);
        assert!(lock.covers_attribute(1, 0));

        let mut reader = PredicateLock::default();
        reader.add_predicate_read(eq(7));
        assert!(lock.intersects(&reader).unwrap());

        let mut outside = PredicateLock::default();
        outside.add_predicate_read(eq(20));
        assert!(!lock.intersects(&outside).unwrap());
    }

    #[test]
    fn test_type_mismatch_is_not_swallowed() {
        let mut t1 = PredicateLock::default();
        t1.add_predicate_write(eq(7));
        let mut t2 = PredicateLock::default();
        t2.add_predicate_read(Arc::new(AtomicPredicate::equality(
            x(),
            Type::varchar(),
            TypedValue::Text("7".to_string()),
        )));

        assert!(t1.intersects(&t2).unwrap_err().is_type_mismatch());
    }
}
