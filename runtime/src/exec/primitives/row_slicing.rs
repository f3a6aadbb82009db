//! `slice_row(data, start, stop)`
//!
//! Selects the rows `[start, stop)` of a matrix. A negative `start` counts
//! from the end, in which case `stop` must be negative or zero and counts
//! from the end too. A one-row window yields that row as a vector. Scalars
//! and vectors pass through untouched.

use crate::array::Block;
use crate::dist::tiling::gather;
use crate::errors::{Result, RuntimeError};
use crate::exec::context::EvalContext;
use crate::exec::dispatch::{dispatch, route, validate_operands, OperandSpec, Rank, RankHandlers};
use crate::exec::operand::Primitive;
use crate::value::{extract_scalar_integer, Value};
use async_trait::async_trait;

const FAMILY: &str = "slice_row";

const OPERANDS: OperandSpec = OperandSpec {
    min: 3,
    max: 3,
    optional: &[],
};

/// Effective `[start, stop)` row window for a matrix of `rows` rows
pub fn row_window(rows: usize, start: i64, stop: i64) -> Result<(usize, usize)> {
    if start < 0 && stop > 0 {
        return Err(RuntimeError::Range(format!(
            "{}: start {} is negative but stop {} is not",
            FAMILY, start, stop
        )));
    }
    if start >= 0 && stop < 0 {
        return Err(RuntimeError::Range(format!(
            "{}: stop {} is negative but start {} is not",
            FAMILY, stop, start
        )));
    }

    let r = rows as i64;
    let (lo, hi) = if start < 0 && stop <= 0 {
        (r + start, r + stop)
    } else {
        (start, stop)
    };
    if lo < 0 || hi > r || lo > hi {
        return Err(RuntimeError::Range(format!(
            "{}: rows [{}, {}) outside a matrix of {} rows",
            FAMILY, start, stop, rows
        )));
    }
    Ok((lo as usize, hi as usize))
}

fn slice_matrix(block: &Block, start: i64, stop: i64) -> Result<Value> {
    let (lo, hi) = row_window(block.shape[0], start, stop)?;
    if hi - lo == 1 {
        return Ok(Block::vector(block.row(lo).to_vec()).into());
    }
    Ok(block.rows(lo, hi)?.into())
}

fn bounds(operands: &[Value]) -> Result<(i64, i64)> {
    match operands {
        [_, start, stop] => Ok((
            extract_scalar_integer(start, FAMILY)?,
            extract_scalar_integer(stop, FAMILY)?,
        )),
        _ => Err(RuntimeError::arity(FAMILY, "3", operands.len())),
    }
}

fn into_data(operands: Vec<Value>) -> Result<Value> {
    operands
        .into_iter()
        .next()
        .ok_or_else(|| RuntimeError::arity(FAMILY, "3", 0))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RowSlicing;

#[async_trait]
impl RankHandlers for RowSlicing {
    async fn local(&self, rank: Rank, operands: Vec<Value>) -> Result<Value> {
        match rank {
            Rank::R0 | Rank::R1 => into_data(operands),
            Rank::R2 => {
                let (start, stop) = bounds(&operands)?;
                let data = into_data(operands)?.into_block(FAMILY)?;
                slice_matrix(&data, start, stop)
            }
            Rank::R3 => Err(RuntimeError::unsupported_rank(FAMILY, 3)),
        }
    }

    async fn distributed(&self, rank: Rank, operands: Vec<Value>) -> Result<Value> {
        match rank {
            // Pass-through keeps the distribution annotation
            Rank::R0 | Rank::R1 => into_data(operands),
            Rank::R2 => {
                let (start, stop) = bounds(&operands)?;
                let dist = operands[0].distribution().ok_or_else(|| {
                    RuntimeError::invalid_operand(FAMILY, "expected distributed data")
                })?;
                let global = gather(dist).await?;
                slice_matrix(&global, start, stop)
            }
            Rank::R3 => Err(RuntimeError::unsupported_rank(FAMILY, 3)),
        }
    }
}

#[async_trait]
impl Primitive for RowSlicing {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn eval(&self, operands: Vec<Value>, _ctx: &EvalContext) -> Result<Value> {
        validate_operands(FAMILY, &operands, &OPERANDS)?;
        let route = route(FAMILY, &operands[0], false)?;
        dispatch(self, route, operands).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m4x3() -> Block {
        Block::matrix(vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
            vec![10.0, 11.0, 12.0],
        ])
        .unwrap()
    }

    async fn slice(data: Value, start: i64, stop: i64) -> Result<Value> {
        RowSlicing
            .eval(vec![data, Value::Int(start), Value::Int(stop)], &EvalContext::new())
            .await
    }

    #[tokio::test]
    async fn test_negative_window_selects_row() {
        let out = slice(m4x3().into(), -2, -1).await.unwrap();
        let block = out.as_block().unwrap();
        assert_eq!(block.shape, vec![3]);
        assert_eq!(block.data, vec![7.0, 8.0, 9.0]);
    }

    #[tokio::test]
    async fn test_full_window_is_identity() {
        let m = m4x3();
        let out = slice(m.clone().into(), 0, 4).await.unwrap();
        assert_eq!(out.as_block(), Some(&m));
    }

    #[tokio::test]
    async fn test_negative_equals_positive() {
        let m = m4x3();
        for k in 0..4i64 {
            let neg = slice(m.clone().into(), -k - 1, -k).await.unwrap();
            let pos = slice(m.clone().into(), 4 - k - 1, 4 - k).await.unwrap();
            assert_eq!(neg, pos);
        }
    }

    #[tokio::test]
    async fn test_one_row_windows_are_vectors() {
        let m = m4x3();
        for i in 0..4 {
            let out = slice(m.clone().into(), i, i + 1).await.unwrap();
            let block = out.as_block().unwrap();
            assert_eq!(block.rank(), 1);
            assert_eq!(block.data, m.row(i as usize));
        }
    }

    #[test]
    fn test_row_window() {
        assert_eq!(row_window(4, -3, 0).unwrap(), (1, 4));
        assert_eq!(row_window(4, -4, -2).unwrap(), (0, 2));
        assert_eq!(row_window(4, 2, 2).unwrap(), (2, 2));
        assert!(row_window(4, -5, -1).is_err());
        assert!(row_window(4, 3, 1).is_err());
    }

    #[tokio::test]
    async fn test_multi_row_window() {
        let out = slice(m4x3().into(), 1, 3).await.unwrap();
        let block = out.as_block().unwrap();
        assert_eq!(block.shape, vec![2, 3]);
        assert_eq!(block.data, vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[tokio::test]
    async fn test_mixed_sign_bounds_fail() {
        for (start, stop) in [(-1, 1), (1, -1)] {
            let err = slice(m4x3().into(), start, stop).await.unwrap_err();
            assert!(matches!(err, RuntimeError::Range(_)));
        }
        assert!(matches!(slice(m4x3().into(), 2, 9).await, Err(RuntimeError::Range(_))));
    }

    #[tokio::test]
    async fn test_low_ranks_pass_through() {
        let v: Value = Block::vector(vec![1.0, 2.0, 3.0]).into();
        assert_eq!(slice(v.clone(), 5, -7).await.unwrap(), v);
        assert_eq!(slice(Value::scalar(2.0), 0, 1).await.unwrap(), Value::scalar(2.0));
    }

    #[tokio::test]
    async fn test_rank_three_unsupported() {
        let t = Block::new(vec![2, 2, 2], vec![0.0; 8]).unwrap();
        let err = slice(t.into(), 0, 1).await.unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedRank { rank: 3, .. }));
    }

    #[tokio::test]
    async fn test_all_operands_required() {
        let err = RowSlicing
            .eval(vec![m4x3().into(), Value::Int(0)], &EvalContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Arity { .. }));

        let err = RowSlicing
            .eval(vec![m4x3().into(), Value::Nil, Value::Int(1)], &EvalContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidOperand { .. }));
    }
}
