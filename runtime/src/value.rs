//! Runtime values flowing between primitives
//!
//! Besides dense arrays a value can be a nil placeholder (an omitted
//! optional operand), a boolean, an integer, or a list of values. Arrays
//! optionally carry a [`Distribution`] annotation when their data is a
//! single site's partition of a larger distributed array.

use crate::array::Block;
use crate::dist::tiling::Distribution;
use crate::errors::{Result, RuntimeError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    List(Vec<Value>),
    Array(ArrayValue),
}

/// Dense array plus optional distribution annotation
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub block: Block,
    pub distribution: Option<Distribution>,
}

impl From<Block> for Value {
    fn from(block: Block) -> Self {
        Value::Array(ArrayValue {
            block,
            distribution: None,
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl Value {
    pub fn scalar(v: f64) -> Self {
        Block::scalar(v).into()
    }

    /// Local partition of a distributed array
    pub fn distributed(block: Block, distribution: Distribution) -> Self {
        Value::Array(ArrayValue {
            block,
            distribution: Some(distribution),
        })
    }

    pub fn int_list(values: &[i64]) -> Self {
        Value::List(values.iter().copied().map(Value::Int).collect())
    }

    /// `false` for nil (an omitted operand)
    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Nil)
    }

    /// Strict list test: only lists, never arrays
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        match self {
            Value::Array(a) => a.distribution.as_ref(),
            _ => None,
        }
    }

    pub fn has_distribution(&self) -> bool {
        self.distribution().is_some()
    }

    /// Number of dimensions of a numeric value; integers and booleans are
    /// scalars. Lists and nil have no rank.
    pub fn rank(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.block.rank()),
            Value::Int(_) | Value::Bool(_) => Some(0),
            Value::Nil | Value::List(_) => None,
        }
    }

    /// Borrow the dense data of an array value
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Value::Array(a) => Some(&a.block),
            _ => None,
        }
    }

    /// Value of a rank-0 numeric value
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Array(a) => a.block.as_scalar(),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Convert any numeric value into a dense block
    pub fn into_block(self, family: &str) -> Result<Block> {
        match self {
            Value::Array(a) => Ok(a.block),
            Value::Int(v) => Ok(Block::scalar(v as f64)),
            Value::Bool(b) => Ok(Block::scalar(if b { 1.0 } else { 0.0 })),
            Value::Nil => Err(RuntimeError::invalid_operand(family, "expected numeric value, got nil")),
            Value::List(_) => {
                Err(RuntimeError::invalid_operand(family, "expected numeric value, got list"))
            }
        }
    }
}

/// Extract an integer from an integer value or an integral rank-0 array
pub fn extract_scalar_integer(value: &Value, family: &str) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Array(a) => match a.block.as_scalar() {
            Some(x) if x.fract() == 0.0 => Ok(x as i64),
            _ => Err(RuntimeError::invalid_operand(
                family,
                format!("expected scalar integer, got array of shape {:?}", a.block.shape),
            )),
        },
        other => Err(RuntimeError::invalid_operand(
            family,
            format!("expected scalar integer, got {}", kind_name(other)),
        )),
    }
}

/// Extract a boolean from a boolean, integer, or rank-0 array
pub fn extract_scalar_boolean(value: &Value, family: &str) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(v) => Ok(*v != 0),
        Value::Array(a) => a.block.as_scalar().map(|x| x != 0.0).ok_or_else(|| {
            RuntimeError::invalid_operand(
                family,
                format!("expected scalar boolean, got array of shape {:?}", a.block.shape),
            )
        }),
        other => Err(RuntimeError::invalid_operand(
            family,
            format!("expected scalar boolean, got {}", kind_name(other)),
        )),
    }
}

/// Extract a list of integers from a strict list value
pub fn extract_integer_list(value: &Value, family: &str) -> Result<Vec<i64>> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| extract_scalar_integer(item, family))
            .collect(),
        other => Err(RuntimeError::invalid_operand(
            family,
            format!("expected list of integers, got {}", kind_name(other)),
        )),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Bool(_) => "boolean",
        Value::Int(_) => "integer",
        Value::List(_) => "list",
        Value::Array(_) => "array",
    }
}
