//! Core type definitions for predicate analysis

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a relation
pub type RelationId = i32;

/// Catalog identifier of an attribute within a relation
pub type AttributeId = i32;

/// A column, identified by its relation and attribute ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeRef {
    pub relation_id: RelationId,
    pub attribute_id: AttributeId,
}

impl AttributeRef {
    pub fn new(relation_id: RelationId, attribute_id: AttributeId) -> Self {
        AttributeRef {
            relation_id,
            attribute_id,
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}.a{}", self.relation_id, self.attribute_id)
    }
}

/// Semantic type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeId {
    Int,
    Long,
    Float,
    Double,
    Char,
    VarChar,
}

/// Groups of types whose values can be compared with each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Numeric,
    Textual,
}

impl TypeId {
    pub fn family(&self) -> TypeFamily {
        match self {
            TypeId::Int | TypeId::Long | TypeId::Float | TypeId::Double => TypeFamily::Numeric,
            TypeId::Char | TypeId::VarChar => TypeFamily::Textual,
        }
    }

    pub fn is_comparable_to(&self, other: &TypeId) -> bool {
        self.family() == other.family()
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeId::Int => "Int",
            TypeId::Long => "Long",
            TypeId::Float => "Float",
            TypeId::Double => "Double",
            TypeId::Char => "Char",
            TypeId::VarChar => "VarChar",
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a value: a type id plus nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    pub id: TypeId,
    pub nullable: bool,
}

impl Type {
    pub fn new(id: TypeId) -> Self {
        Type { id, nullable: false }
    }

    pub fn nullable(id: TypeId) -> Self {
        Type { id, nullable: true }
    }

    pub fn int() -> Self {
        Type::new(TypeId::Int)
    }

    pub fn long() -> Self {
        Type::new(TypeId::Long)
    }

    pub fn float() -> Self {
        Type::new(TypeId::Float)
    }

    pub fn double() -> Self {
        Type::new(TypeId::Double)
    }

    pub fn char() -> Self {
        Type::new(TypeId::Char)
    }

    pub fn varchar() -> Self {
        Type::new(TypeId::VarChar)
    }

    /// Check if a TypedValue conforms to this type
    pub fn matches(&self, value: &TypedValue) -> bool {
        match (self.id, value) {
            (_, TypedValue::Null) => self.nullable,
            (TypeId::Int, TypedValue::Int(_)) => true,
            (TypeId::Long, TypedValue::Long(_)) => true,
            (TypeId::Float, TypedValue::Float(_)) => true,
            (TypeId::Double, TypedValue::Double(_)) => true,
            (TypeId::Char | TypeId::VarChar, TypedValue::Text(_)) => true,
            _ => false,
        }
    }
}

/// Literal values carried by predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Int(v) => Some(i64::from(*v)),
            TypedValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Int(v) => Some(f64::from(*v)),
            TypedValue::Long(v) => Some(*v as f64),
            TypedValue::Float(v) => Some(f64::from(*v)),
            TypedValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => f.write_str("NULL"),
            TypedValue::Int(v) => write!(f, "{}", v),
            TypedValue::Long(v) => write!(f, "{}", v),
            TypedValue::Float(v) => write!(f, "{}", v),
            TypedValue::Double(v) => write!(f, "{}", v),
            TypedValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}
