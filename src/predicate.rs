//! Atomic Predicates
//!
//! A single-attribute constraint: any value, one value, a half-line or an
//! interval. Predicates are immutable once built; simplification builds new
//! predicates instead of editing existing ones.
//!
//! `intersects` answers "may these two predicates select a common tuple?".
//! `true` means overlap could not be ruled out, `false` means the predicates
//! provably describe disjoint tuple sets. Predicates on different attributes
//! never intersect.

use crate::comparison::ComparisonId;
use crate::error::{PredicateError, Result};
use crate::types::{AttributeRef, Type, TypedValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Predicates are shared between read/write sets and merge results.
pub type SharedPredicate = Arc<AtomicPredicate>;

/// Direction and inclusivity of a one-sided range bound.
/// E.g. `x > 5` is `LargerThan 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundKind {
    LargerThan,
    LargerEqTo,
    SmallerThan,
    SmallerEqTo,
}

impl BoundKind {
    /// Bound of the form `x > v` or `x >= v`
    pub fn is_lower(&self) -> bool {
        matches!(self, BoundKind::LargerThan | BoundKind::LargerEqTo)
    }

    /// Bound of the form `x < v` or `x <= v`
    pub fn is_upper(&self) -> bool {
        !self.is_lower()
    }

    pub fn is_inclusive(&self) -> bool {
        matches!(self, BoundKind::LargerEqTo | BoundKind::SmallerEqTo)
    }

    /// Comparator testing `attribute_value <op> bound_value`
    pub fn comparison(&self) -> ComparisonId {
        match self {
            BoundKind::LargerThan => ComparisonId::Greater,
            BoundKind::LargerEqTo => ComparisonId::GreaterOrEqual,
            BoundKind::SmallerThan => ComparisonId::Less,
            BoundKind::SmallerEqTo => ComparisonId::LessOrEqual,
        }
    }

    /// Bound kind for `attribute <op> literal`; `None` for `=` and `!=`
    pub fn from_comparison(comparison: ComparisonId) -> Option<BoundKind> {
        match comparison {
            ComparisonId::Greater => Some(BoundKind::LargerThan),
            ComparisonId::GreaterOrEqual => Some(BoundKind::LargerEqTo),
            ComparisonId::Less => Some(BoundKind::SmallerThan),
            ComparisonId::LessOrEqual => Some(BoundKind::SmallerEqTo),
            ComparisonId::Equal | ComparisonId::NotEqual => None,
        }
    }
}

/// Discriminant of [`AtomicPredicate`], used for logging and dispatch tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    Any,
    Equality,
    Range,
    DoubleSidedRange,
}

/// `attribute = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualityPredicate {
    attr: AttributeRef,
    target_type: Type,
    target_value: TypedValue,
}

impl EqualityPredicate {
    pub fn new(attr: AttributeRef, target_type: Type, target_value: TypedValue) -> Self {
        EqualityPredicate {
            attr,
            target_type,
            target_value,
        }
    }

    pub fn attribute(&self) -> AttributeRef {
        self.attr
    }

    pub fn target_type(&self) -> &Type {
        &self.target_type
    }

    pub fn target_value(&self) -> &TypedValue {
        &self.target_value
    }

    fn intersects_equality(&self, other: &EqualityPredicate) -> Result<bool> {
        ComparisonId::Equal.compare_checked(
            &self.target_value,
            &self.target_type,
            &other.target_value,
            &other.target_type,
        )
    }
}

/// `attribute <bound> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangePredicate {
    attr: AttributeRef,
    target_type: Type,
    target_value: TypedValue,
    bound: BoundKind,
}

impl RangePredicate {
    pub fn new(attr: AttributeRef, target_type: Type, target_value: TypedValue, bound: BoundKind) -> Self {
        RangePredicate {
            attr,
            target_type,
            target_value,
            bound,
        }
    }

    pub fn attribute(&self) -> AttributeRef {
        self.attr
    }

    pub fn target_type(&self) -> &Type {
        &self.target_type
    }

    pub fn target_value(&self) -> &TypedValue {
        &self.target_value
    }

    pub fn bound(&self) -> BoundKind {
        self.bound
    }

    /// Does this half-line contain `value`?
    pub fn admits(&self, value: &TypedValue, value_type: &Type) -> Result<bool> {
        self.bound
            .comparison()
            .compare_checked(value, value_type, &self.target_value, &self.target_type)
    }

    fn admits_equality(&self, equality: &EqualityPredicate) -> Result<bool> {
        self.admits(&equality.target_value, &equality.target_type)
    }

    /// Half-line overlap. Same-direction half-lines always overlap; opposite
    /// ones overlap iff `lower < upper`, relaxed to `<=` only when both
    /// bounds are inclusive.
    pub(crate) fn intersects_range(&self, other: &RangePredicate) -> Result<bool> {
        if self.bound.is_lower() == other.bound.is_lower() {
            return Ok(true);
        }

        let (lower, upper) = if self.bound.is_lower() {
            (self, other)
        } else {
            (other, self)
        };

        let comparison = if lower.bound.is_inclusive() && upper.bound.is_inclusive() {
            ComparisonId::LessOrEqual
        } else {
            ComparisonId::Less
        };

        comparison.compare_checked(
            &lower.target_value,
            &lower.target_type,
            &upper.target_value,
            &upper.target_type,
        )
    }
}

/// Interval formed by a Larger-side bound and a Smaller-side bound on the
/// same attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntervalBounds")]
pub struct DoubleSidedRangePredicate {
    lower: RangePredicate,
    upper: RangePredicate,
}

/// Unchecked wire form of an interval
#[derive(Deserialize)]
struct IntervalBounds {
    lower: RangePredicate,
    upper: RangePredicate,
}

impl TryFrom<IntervalBounds> for DoubleSidedRangePredicate {
    type Error = PredicateError;

    fn try_from(bounds: IntervalBounds) -> Result<Self> {
        DoubleSidedRangePredicate::new(bounds.lower, bounds.upper)
    }
}

impl DoubleSidedRangePredicate {
    /// Build an interval from two opposite bounds given in either order.
    pub fn new(a: RangePredicate, b: RangePredicate) -> Result<Self> {
        if a.attr != b.attr {
            return Err(PredicateError::AttributeMismatch {
                left: a.attr,
                right: b.attr,
            });
        }
        if a.bound.is_lower() == b.bound.is_lower() {
            return Err(PredicateError::InvalidInterval(format!(
                "bounds {:?} and {:?} face the same direction",
                a.bound, b.bound
            )));
        }

        let (lower, upper) = if a.bound.is_lower() { (a, b) } else { (b, a) };
        Ok(DoubleSidedRangePredicate { lower, upper })
    }

    pub fn attribute(&self) -> AttributeRef {
        self.lower.attr
    }

    pub fn lower(&self) -> &RangePredicate {
        &self.lower
    }

    pub fn upper(&self) -> &RangePredicate {
        &self.upper
    }

    fn admits_equality(&self, equality: &EqualityPredicate) -> Result<bool> {
        Ok(self.lower.admits_equality(equality)? && self.upper.admits_equality(equality)?)
    }

    fn intersects_range(&self, range: &RangePredicate) -> Result<bool> {
        Ok(range.intersects_range(&self.lower)? || range.intersects_range(&self.upper)?)
    }

    fn intersects_interval(&self, other: &DoubleSidedRangePredicate) -> Result<bool> {
        Ok(self.lower.intersects_range(&other.upper)? || self.upper.intersects_range(&other.lower)?)
    }
}

/// Single-attribute predicate used for conflict detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomicPredicate {
    /// Every tuple; used when no literal bound could be extracted
    Any { attr: AttributeRef },
    Equality(EqualityPredicate),
    Range(RangePredicate),
    DoubleSidedRange(DoubleSidedRangePredicate),
}

impl AtomicPredicate {
    pub fn any(attr: AttributeRef) -> Self {
        AtomicPredicate::Any { attr }
    }

    pub fn equality(attr: AttributeRef, target_type: Type, target_value: TypedValue) -> Self {
        AtomicPredicate::Equality(EqualityPredicate::new(attr, target_type, target_value))
    }

    pub fn range(attr: AttributeRef, target_type: Type, target_value: TypedValue, bound: BoundKind) -> Self {
        AtomicPredicate::Range(RangePredicate::new(attr, target_type, target_value, bound))
    }

    pub fn double_sided(a: RangePredicate, b: RangePredicate) -> Result<Self> {
        DoubleSidedRangePredicate::new(a, b).map(AtomicPredicate::DoubleSidedRange)
    }

    pub fn attribute(&self) -> AttributeRef {
        match self {
            AtomicPredicate::Any { attr } => *attr,
            AtomicPredicate::Equality(p) => p.attribute(),
            AtomicPredicate::Range(p) => p.attribute(),
            AtomicPredicate::DoubleSidedRange(p) => p.attribute(),
        }
    }

    pub fn kind(&self) -> PredicateKind {
        match self {
            AtomicPredicate::Any { .. } => PredicateKind::Any,
            AtomicPredicate::Equality(_) => PredicateKind::Equality,
            AtomicPredicate::Range(_) => PredicateKind::Range,
            AtomicPredicate::DoubleSidedRange(_) => PredicateKind::DoubleSidedRange,
        }
    }

    /// Both predicates constrain the same attribute
    pub fn comparable(&self, other: &AtomicPredicate) -> bool {
        self.attribute() == other.attribute()
    }

    /// May the two predicates select a common tuple?
    ///
    /// Symmetric. Fails with a type mismatch when literal values of
    /// incompatible types have to be compared.
    pub fn intersects(&self, other: &AtomicPredicate) -> Result<bool> {
        use AtomicPredicate::*;

        if !self.comparable(other) {
            return Ok(false);
        }

        let verdict = match (self, other) {
            (Any { .. }, _) | (_, Any { .. }) => true,
            (Equality(a), Equality(b)) => a.intersects_equality(b)?,
            (Equality(e), Range(r)) | (Range(r), Equality(e)) => r.admits_equality(e)?,
            (Equality(e), DoubleSidedRange(d)) | (DoubleSidedRange(d), Equality(e)) => d.admits_equality(e)?,
            (Range(a), Range(b)) => a.intersects_range(b)?,
            (Range(r), DoubleSidedRange(d)) | (DoubleSidedRange(d), Range(r)) => d.intersects_range(r)?,
            (DoubleSidedRange(a), DoubleSidedRange(b)) => a.intersects_interval(b)?,
        };

        tracing::trace!(left = %self, right = %other, verdict, "atomic predicate intersection");
        Ok(verdict)
    }
}

impl From<EqualityPredicate> for AtomicPredicate {
    fn from(predicate: EqualityPredicate) -> Self {
        AtomicPredicate::Equality(predicate)
    }
}

impl From<RangePredicate> for AtomicPredicate {
    fn from(predicate: RangePredicate) -> Self {
        AtomicPredicate::Range(predicate)
    }
}

impl fmt::Display for RangePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attr, self.bound.comparison(), self.target_value)
    }
}

impl fmt::Display for AtomicPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicPredicate::Any { attr } => write!(f, "{} ANY", attr),
            AtomicPredicate::Equality(p) => write!(f, "{} = {}", p.attr, p.target_value),
            AtomicPredicate::Range(p) => write!(f, "{}", p),
            AtomicPredicate::DoubleSidedRange(p) => write!(f, "{} AND {}", p.lower, p.upper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeId;

    fn x() -> AttributeRef {
        AttributeRef::new(1, 0)
    }

    fn eq(v: i32) -> AtomicPredicate {
        AtomicPredicate::equality(x(), Type::int(), TypedValue::Int(v))
    }

    fn rg(bound: BoundKind, v: i32) -> RangePredicate {
        RangePredicate::new(x(), Type::int(), TypedValue::Int(v), bound)
    }

    fn range(bound: BoundKind, v: i32) -> AtomicPredicate {
        rg(bound, v).into()
    }

    fn interval(lo: BoundKind, a: i32, hi: BoundKind, b: i32) -> AtomicPredicate {
        AtomicPredicate::double_sided(rg(lo, a), rg(hi, b)).unwrap()
    }

    fn both(a: &AtomicPredicate, b: &AtomicPredicate) -> bool {
        let ab = a.intersects(b).unwrap();
        assert_eq!(ab, b.intersects(a).unwrap(), "asymmetric: {} / {}", a, b);
        ab
    }

    use crate::predicate::BoundKind::*;

    #[test]
    fn test_different_attributes_never_intersect() {
        let other = AtomicPredicate::any(AttributeRef::new(1, 1));
        assert!(!both(&AtomicPredicate::any(x()), &other));
        assert!(!both(&eq(7), &AtomicPredicate::equality(AttributeRef::new(2, 0), Type::int(), TypedValue::Int(7))));
    }

    #[test]
    fn test_any_intersects_everything() {
        let any = AtomicPredicate::any(x());
        assert!(both(&any, &any));
        assert!(both(&any, &eq(1)));
        assert!(both(&any, &range(SmallerThan, 0)));
        assert!(both(&any, &interval(LargerThan, 1, SmallerThan, 2)));
    }

    #[test]
    fn test_equality_equality() {
        assert!(both(&eq(7), &eq(7)));
        assert!(!both(&eq(7), &eq(8)));
    }

    #[test]
    fn test_equality_range() {
        assert!(both(&eq(7), &range(LargerThan, 5)));
        assert!(!both(&eq(5), &range(LargerThan, 5)));
        assert!(both(&eq(5), &range(LargerEqTo, 5)));
        assert!(!both(&eq(5), &range(SmallerThan, 5)));
        assert!(both(&eq(5), &range(SmallerEqTo, 5)));
        assert!(!both(&eq(9), &range(SmallerEqTo, 5)));
    }

    #[test]
    fn test_range_same_direction_always_intersects() {
        assert!(both(&range(LargerThan, 5), &range(LargerThan, 100)));
        assert!(both(&range(LargerEqTo, 5), &range(LargerThan, -100)));
        assert!(both(&range(SmallerThan, 5), &range(SmallerEqTo, 100)));
    }

    #[test]
    fn test_range_opposite_direction_boundaries() {
        assert!(!both(&range(LargerThan, 5), &range(SmallerThan, 5)));
        assert!(!both(&range(LargerEqTo, 5), &range(SmallerThan, 5)));
        assert!(!both(&range(LargerThan, 5), &range(SmallerEqTo, 5)));
        assert!(both(&range(LargerEqTo, 5), &range(SmallerEqTo, 5)));
        assert!(both(&range(LargerThan, 5), &range(SmallerThan, 6)));
        assert!(!both(&range(LargerThan, 10), &range(SmallerThan, 6)));
    }

    #[test]
    fn test_equality_interval() {
        let open = interval(LargerThan, 5, SmallerThan, 10);
        assert!(both(&eq(7), &open));
        assert!(!both(&eq(20), &open));
        assert!(!both(&eq(5), &open));
        assert!(!both(&eq(10), &open));

        let closed = interval(LargerEqTo, 5, SmallerEqTo, 10);
        assert!(both(&eq(5), &closed));
        assert!(both(&eq(10), &closed));
    }

    #[test]
    fn test_range_interval_tests_either_bound() {
        let open = interval(LargerThan, 5, SmallerThan, 10);
        assert!(both(&range(LargerThan, 7), &open));
        assert!(both(&range(SmallerThan, 6), &open));
        // the Larger-side bound of the interval always meets another Larger-side range
        assert!(both(&range(LargerThan, 100), &open));
    }

    #[test]
    fn test_interval_interval() {
        let a = interval(LargerThan, 0, SmallerThan, 10);
        let b = interval(LargerThan, 5, SmallerThan, 20);
        assert!(both(&a, &b));
        assert!(both(&a, &a));
    }

    #[test]
    fn test_double_sided_normalises_bound_order() {
        let d = DoubleSidedRangePredicate::new(rg(SmallerThan, 10), rg(LargerThan, 5)).unwrap();
        assert_eq!(d.lower().bound(), LargerThan);
        assert_eq!(d.upper().bound(), SmallerThan);
    }

    #[test]
    fn test_double_sided_rejects_same_direction() {
        let err = DoubleSidedRangePredicate::new(rg(LargerThan, 1), rg(LargerEqTo, 5)).unwrap_err();
        assert!(matches!(err, PredicateError::InvalidInterval(_)));

        let other = RangePredicate::new(AttributeRef::new(9, 9), Type::int(), TypedValue::Int(1), SmallerThan);
        let err = DoubleSidedRangePredicate::new(rg(LargerThan, 1), other).unwrap_err();
        assert!(matches!(err, PredicateError::AttributeMismatch { .. }));
    }

    #[test]
    fn test_deserialized_interval_is_checked() {
        let mut json = serde_json::to_value(DoubleSidedRangePredicate::new(rg(LargerThan, 1), rg(SmallerThan, 5)).unwrap()).unwrap();
        assert!(serde_json::from_value::<DoubleSidedRangePredicate>(json.clone()).is_ok());

        json["upper"] = serde_json::to_value(rg(LargerEqTo, 5)).unwrap();
        let err = serde_json::from_value::<DoubleSidedRangePredicate>(json).unwrap_err();
        assert!(err.to_string().contains("invalid interval"));
    }

    #[test]
    fn test_long_and_double_bounds_do_not_collapse() {
        let above = AtomicPredicate::range(x(), Type::double(), TypedValue::Double(9_007_199_254_740_992.0), LargerThan);
        let below = AtomicPredicate::range(x(), Type::long(), TypedValue::Long(9_007_199_254_740_993), SmallerThan);
        assert!(both(&above, &below));
    }

    #[test]
    fn test_type_mismatch_propagates() {
        let text = AtomicPredicate::equality(x(), Type::varchar(), TypedValue::Text("a".to_string()));
        let err = eq(1).intersects(&text).unwrap_err();
        assert_eq!(
            err,
            PredicateError::TypeMismatch {
                left: TypeId::Int,
                right: TypeId::VarChar
            }
        );
        assert!(text.intersects(&range(LargerThan, 3)).unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_mixed_numeric_types() {
        let long = AtomicPredicate::range(x(), Type::long(), TypedValue::Long(5), LargerThan);
        let dbl = AtomicPredicate::equality(x(), Type::double(), TypedValue::Double(5.5));
        assert!(both(&long, &dbl));
    }

    #[test]
    fn test_display() {
        assert_eq!(range(LargerThan, 5).to_string(), "r1.a0 > 5");
        assert_eq!(eq(7).to_string(), "r1.a0 = 7");
        assert_eq!(
            interval(LargerEqTo, 1, SmallerThan, 4).to_string(),
            "r1.a0 >= 1 AND r1.a0 < 4"
        );
    }
}
