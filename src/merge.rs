//! Simplification of AND-connected atomic predicates

use crate::comparison::ComparisonId;
use crate::error::{PredicateError, Result};
use crate::predicate::{AtomicPredicate, PredicateKind, RangePredicate, SharedPredicate};
use std::sync::Arc;
use tracing::debug;

/// Combine two range bounds on the same attribute under AND.
///
/// Bounds facing the same way collapse to the tighter one. When both sit on
/// the same value and exactly one is inclusive, the inclusive bound is kept;
/// otherwise `a` wins the tie. Opposite bounds become an interval with the
/// Larger-side bound as its lower end.
pub fn merge_range(a: &RangePredicate, b: &RangePredicate) -> Result<AtomicPredicate> {
    if a.attribute() != b.attribute() {
        return Err(PredicateError::AttributeMismatch {
            left: a.attribute(),
            right: b.attribute(),
        });
    }

    if a.bound().is_lower() != b.bound().is_lower() {
        return AtomicPredicate::double_sided(a.clone(), b.clone());
    }

    let same_value = ComparisonId::Equal.compare_checked(
        a.target_value(),
        a.target_type(),
        b.target_value(),
        b.target_type(),
    )?;

    let keep = if same_value {
        if b.bound().is_inclusive() && !a.bound().is_inclusive() {
            b
        } else {
            a
        }
    } else {
        // lower bounds keep the larger value, upper bounds the smaller one
        let tighter = if a.bound().is_lower() {
            ComparisonId::Greater
        } else {
            ComparisonId::Less
        };
        if tighter.compare_checked(a.target_value(), a.target_type(), b.target_value(), b.target_type())? {
            a
        } else {
            b
        }
    };

    Ok(AtomicPredicate::Range(keep.clone()))
}

enum Absorb {
    /// The left predicate adds nothing; drop it
    Left,
    /// The right predicate adds nothing; drop it
    Right,
    /// Replace the left predicate and drop the right one
    Merged(AtomicPredicate),
    Keep,
}

fn absorb(a: &AtomicPredicate, b: &AtomicPredicate) -> Result<Absorb> {
    use PredicateKind::*;

    let action = match (a.kind(), b.kind()) {
        (Any, _) => Absorb::Left,
        (_, Any) => Absorb::Right,
        (Range | DoubleSidedRange, Equality) => Absorb::Left,
        (Equality, Range | DoubleSidedRange) => Absorb::Right,
        (Equality, Equality) => Absorb::Right,
        (Range, Range) => match (a, b) {
            (AtomicPredicate::Range(ra), AtomicPredicate::Range(rb)) => Absorb::Merged(merge_range(ra, rb)?),
            _ => Absorb::Keep,
        },
        _ => Absorb::Keep,
    };
    Ok(action)
}

/// Simplify the conjunction of two predicate lists.
///
/// Every intersecting same-attribute pair is checked once; a predicate that
/// adds no restriction over its partner is dropped, and two ranges are merged.
/// Pairs that do not intersect describe an unsatisfiable conjunction and are
/// left untouched. Predicates without a partner on the other side pass
/// through. The left list comes first in the result.
///
/// Both lists must hold only conjuncts: every predicate in them is satisfied
/// by every tuple the list stands for. A list built from a disjunction does
/// not qualify.
pub fn combine_conjuncts(a: Vec<SharedPredicate>, b: Vec<SharedPredicate>) -> Result<Vec<SharedPredicate>> {
    let mut left = a;
    let mut right = b;

    let mut i = 0;
    'left: while i < left.len() {
        let mut j = 0;
        while j < right.len() {
            if !left[i].comparable(&right[j]) || !left[i].intersects(&right[j])? {
                j += 1;
                continue;
            }

            match absorb(&left[i], &right[j])? {
                Absorb::Left => {
                    debug!(dropped = %left[i], kept = %right[j], "conjunct absorbed");
                    left.remove(i);
                    continue 'left;
                }
                Absorb::Right => {
                    debug!(dropped = %right[j], kept = %left[i], "conjunct absorbed");
                    right.remove(j);
                }
                Absorb::Merged(merged) => {
                    debug!(left = %left[i], right = %right[j], merged = %merged, "ranges merged");
                    left[i] = Arc::new(merged);
                    right.remove(j);
                }
                Absorb::Keep => j += 1,
            }
        }
        i += 1;
    }

    left.extend(right);
    Ok(left)
}
