//! Type-checked value comparison
//!
//! Every comparison first checks that both values conform to their declared
//! types and that the two types belong to the same family. Numeric values are
//! widened (integers to `i64`, anything involving a floating type to `f64`);
//! text compares bytewise.

use crate::error::{PredicateError, Result};
use crate::types::{Type, TypeFamily, TypedValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators understood by the type system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonId {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl ComparisonId {
    /// The operator that gives the same answer with the operands swapped
    pub fn reversed(&self) -> ComparisonId {
        match self {
            ComparisonId::Equal => ComparisonId::Equal,
            ComparisonId::NotEqual => ComparisonId::NotEqual,
            ComparisonId::Less => ComparisonId::Greater,
            ComparisonId::LessOrEqual => ComparisonId::GreaterOrEqual,
            ComparisonId::Greater => ComparisonId::Less,
            ComparisonId::GreaterOrEqual => ComparisonId::LessOrEqual,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonId::Equal => "=",
            ComparisonId::NotEqual => "!=",
            ComparisonId::Less => "<",
            ComparisonId::LessOrEqual => "<=",
            ComparisonId::Greater => ">",
            ComparisonId::GreaterOrEqual => ">=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonId::Equal => ordering == Ordering::Equal,
            ComparisonId::NotEqual => ordering != Ordering::Equal,
            ComparisonId::Less => ordering == Ordering::Less,
            ComparisonId::LessOrEqual => ordering != Ordering::Greater,
            ComparisonId::Greater => ordering == Ordering::Greater,
            ComparisonId::GreaterOrEqual => ordering != Ordering::Less,
        }
    }

    /// Evaluate `left <op> right`, failing if the declared types are incompatible.
    ///
    /// A NULL operand never satisfies a comparison.
    pub fn compare_checked(
        &self,
        left: &TypedValue,
        left_type: &Type,
        right: &TypedValue,
        right_type: &Type,
    ) -> Result<bool> {
        check_conforms(left, left_type)?;
        check_conforms(right, right_type)?;

        if !left_type.id.is_comparable_to(&right_type.id) {
            return Err(PredicateError::TypeMismatch {
                left: left_type.id,
                right: right_type.id,
            });
        }

        if left.is_null() || right.is_null() {
            return Ok(false);
        }

        Ok(order_values(left, right, left_type.id.family())
            .map(|ordering| self.accepts(ordering))
            .unwrap_or(false))
    }
}

impl fmt::Display for ComparisonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn check_conforms(value: &TypedValue, declared: &Type) -> Result<()> {
    if declared.matches(value) {
        Ok(())
    } else {
        Err(PredicateError::ValueTypeMismatch {
            declared: declared.id,
            value: value.to_string(),
        })
    }
}

/// Ordering of two non-null values of one family; `None` when unordered (NaN).
fn order_values(left: &TypedValue, right: &TypedValue, family: TypeFamily) -> Option<Ordering> {
    match family {
        TypeFamily::Numeric => match (left.as_i64(), right.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            (Some(l), None) => order_integer_float(l, right.as_f64()?),
            (None, Some(r)) => order_integer_float(r, left.as_f64()?).map(Ordering::reverse),
            (None, None) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        },
        TypeFamily::Textual => Some(left.as_str()?.as_bytes().cmp(right.as_str()?.as_bytes())),
    }
}

/// Exact ordering of an integer against a float. Casting the integer to
/// `f64` would round above 2^53.
fn order_integer_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    // exact: |whole| < 2^63 and has no fraction
    let ordering = int.cmp(&(whole as i64));
    if ordering != Ordering::Equal {
        return Some(ordering);
    }
    whole.partial_cmp(&float)
}
