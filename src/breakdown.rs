//! Predicate Breakdown
//!
//! Flattens a query predicate tree into the atomic predicates a transaction
//! declares in its predicate lock. Conjunctions are simplified with
//! [`combine_conjuncts`]; disjunctions are concatenated, since satisfying a
//! single branch is enough and no branch may be tightened by another. Once a
//! disjunction sits under a conjunction, the predicates of that conjunction
//! are concatenated as well.

use crate::comparison::ComparisonId;
use crate::error::{PredicateError, Result};
use crate::merge::combine_conjuncts;
use crate::predicate::{AtomicPredicate, BoundKind, SharedPredicate};
use crate::types::{AttributeRef, Type, TypedValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Operand of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Attribute(AttributeRef),
    Literal { value: TypedValue, value_type: Type },
    UnaryExpression { operation: String, operand: Box<Scalar> },
    BinaryExpression {
        operation: String,
        left: Box<Scalar>,
        right: Box<Scalar>,
    },
}

impl Scalar {
    pub fn attribute(relation_id: i32, attribute_id: i32) -> Self {
        Scalar::Attribute(AttributeRef::new(relation_id, attribute_id))
    }

    pub fn literal(value: TypedValue, value_type: Type) -> Self {
        Scalar::Literal { value, value_type }
    }

    fn describe(&self) -> &'static str {
        match self {
            Scalar::Attribute(_) => "attribute",
            Scalar::Literal { .. } => "literal",
            Scalar::UnaryExpression { .. } => "unary expression",
            Scalar::BinaryExpression { .. } => "binary expression",
        }
    }
}

/// `left <comparison> right`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPredicate {
    pub comparison: ComparisonId,
    pub left: Scalar,
    pub right: Scalar,
}

/// Query predicate tree as handed over by the plan reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateNode {
    True,
    False,
    Comparison(ComparisonPredicate),
    Negation(Box<PredicateNode>),
    Conjunction(Vec<PredicateNode>),
    Disjunction(Vec<PredicateNode>),
}

impl PredicateNode {
    pub fn comparison(comparison: ComparisonId, left: Scalar, right: Scalar) -> Self {
        PredicateNode::Comparison(ComparisonPredicate {
            comparison,
            left,
            right,
        })
    }

    pub fn and(left: PredicateNode, right: PredicateNode) -> Self {
        PredicateNode::Conjunction(vec![left, right])
    }

    pub fn or(left: PredicateNode, right: PredicateNode) -> Self {
        PredicateNode::Disjunction(vec![left, right])
    }

    pub fn not(operand: PredicateNode) -> Self {
        PredicateNode::Negation(Box::new(operand))
    }
}

/// Break a predicate tree down into atomic predicates.
pub fn breakdown(predicate: &PredicateNode) -> Result<Vec<SharedPredicate>> {
    Ok(breakdown_node(predicate)?.predicates)
}

/// Atomic predicates of a subtree
struct Breakdown {
    predicates: Vec<SharedPredicate>,
    /// Every predicate holds for every tuple the subtree selects, so the list
    /// may be simplified against other conjuncts
    conjunctive: bool,
}

impl Breakdown {
    fn conjunctive(predicates: Vec<SharedPredicate>) -> Self {
        Breakdown {
            predicates,
            conjunctive: true,
        }
    }
}

fn breakdown_node(predicate: &PredicateNode) -> Result<Breakdown> {
    match predicate {
        PredicateNode::True | PredicateNode::False => Ok(Breakdown::conjunctive(Vec::new())),
        PredicateNode::Comparison(comparison) => Ok(Breakdown::conjunctive(breakdown_comparison(comparison)?)),
        PredicateNode::Negation(_) => Err(PredicateError::UnsupportedPredicateShape(
            "negation".to_string(),
        )),
        PredicateNode::Conjunction(operands) => {
            let mut combined = Breakdown::conjunctive(Vec::new());
            for operand in operands {
                let part = breakdown_node(operand)?;
                if combined.conjunctive && part.conjunctive {
                    combined.predicates = combine_conjuncts(combined.predicates, part.predicates)?;
                } else {
                    // a branch of an OR must not tighten, or be tightened by, its siblings' conjuncts
                    debug!(predicates = part.predicates.len(), "conjunct over a disjunction kept unsimplified");
                    combined.predicates.extend(part.predicates);
                    combined.conjunctive = false;
                }
            }
            Ok(combined)
        }
        PredicateNode::Disjunction(operands) => {
            let mut all = Breakdown::conjunctive(Vec::new());
            for operand in operands {
                let part = breakdown_node(operand)?;
                all.predicates.extend(part.predicates);
                all.conjunctive &= part.conjunctive;
            }
            all.conjunctive &= operands.len() <= 1;
            Ok(all)
        }
    }
}

fn breakdown_comparison(predicate: &ComparisonPredicate) -> Result<Vec<SharedPredicate>> {
    if predicate.comparison == ComparisonId::NotEqual {
        return Err(PredicateError::UnsupportedPredicateShape(format!(
            "comparison {}",
            predicate.comparison
        )));
    }

    let atomic = match (&predicate.left, &predicate.right) {
        (Scalar::Attribute(attr), Scalar::Literal { value, value_type }) => {
            bind_literal(*attr, predicate.comparison, value, value_type)
        }
        (Scalar::Literal { value, value_type }, Scalar::Attribute(attr)) => {
            // literal OP attr reads as attr OP' literal
            bind_literal(*attr, predicate.comparison.reversed(), value, value_type)
        }
        (Scalar::Attribute(left), Scalar::Attribute(right)) => {
            debug!(%left, %right, "attribute comparison has no literal bound");
            return Ok(vec![
                Arc::new(AtomicPredicate::any(*right)),
                Arc::new(AtomicPredicate::any(*left)),
            ]);
        }
        (Scalar::Literal { .. }, Scalar::Literal { .. }) => {
            debug!("constant comparison references no attribute");
            return Ok(Vec::new());
        }
        (left, right) => {
            return Err(PredicateError::UnsupportedPredicateShape(format!(
                "comparison between {} and {}",
                left.describe(),
                right.describe()
            )));
        }
    };

    Ok(vec![Arc::new(atomic)])
}

fn bind_literal(attr: AttributeRef, comparison: ComparisonId, value: &TypedValue, value_type: &Type) -> AtomicPredicate {
    match BoundKind::from_comparison(comparison) {
        Some(bound) => AtomicPredicate::range(attr, *value_type, value.clone(), bound),
        None => AtomicPredicate::equality(attr, *value_type, value.clone()),
    }
}
