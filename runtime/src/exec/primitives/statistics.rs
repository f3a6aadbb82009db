//! Reductions: `sum`, `prod`, `min`, `max`, `mean`
//!
//! `stat(data, axis?, keepdims?, initial?)`
//!
//! - `axis` nil reduces every axis, an integer reduces that axis (negative
//!   values count from the end), a list of integers reduces the named axes
//! - `keepdims` keeps reduced axes with extent 1
//! - `initial` seeds every accumulator instead of the identity element
//!
//! Distributed data is gathered first, so every site computes the global
//! result. A list of axes always takes the local path.

use crate::array::reduce::reduce;
use crate::array::{Block, Statistic};
use crate::dist::tiling::gather;
use crate::errors::{Result, RuntimeError};
use crate::exec::context::EvalContext;
use crate::exec::dispatch::{dispatch, route, validate_operands, OperandSpec, Rank, RankHandlers};
use crate::exec::operand::Primitive;
use crate::value::{
    extract_integer_list, extract_scalar_boolean, extract_scalar_integer, ArrayValue, Value,
};
use async_trait::async_trait;
use std::marker::PhantomData;

const OPERANDS: OperandSpec = OperandSpec {
    min: 1,
    max: 4,
    optional: &[1, 2, 3],
};

#[derive(Debug, Clone, PartialEq)]
enum Axes {
    All,
    One(i64),
    Many(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq)]
struct ReduceArgs {
    axes: Axes,
    keepdims: bool,
    initial: Option<f64>,
}

fn present(operands: &[Value], position: usize) -> Option<&Value> {
    operands.get(position).filter(|v| v.is_valid())
}

fn parse_args(family: &str, operands: &[Value]) -> Result<ReduceArgs> {
    let axes = match present(operands, 1) {
        None => Axes::All,
        Some(v) if v.is_list() => Axes::Many(extract_integer_list(v, family)?),
        Some(v) => Axes::One(extract_scalar_integer(v, family)?),
    };
    let keepdims = match present(operands, 2) {
        Some(v) => extract_scalar_boolean(v, family)?,
        None => false,
    };
    let initial = match present(operands, 3) {
        Some(v) => Some(v.as_scalar().ok_or_else(|| {
            RuntimeError::invalid_operand(family, "initial value must be a scalar")
        })?),
        None => None,
    };
    Ok(ReduceArgs {
        axes,
        keepdims,
        initial,
    })
}

fn normalize_axis(family: &str, axis: i64, rank: usize) -> Result<usize> {
    let dims = rank as i64;
    let normalized = if axis < 0 { axis + dims } else { axis };
    if normalized < 0 || normalized >= dims {
        return Err(RuntimeError::invalid_operand(
            family,
            format!("axis {} is out of bounds for array of dimension {}", axis, rank),
        ));
    }
    Ok(normalized as usize)
}

/// Reduction family parameterized by its statistic
pub struct Statistics<S: Statistic> {
    _statistic: PhantomData<fn() -> S>,
}

impl<S: Statistic> Default for Statistics<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Statistic> Statistics<S> {
    pub fn new() -> Self {
        Self {
            _statistic: PhantomData,
        }
    }

    /// Reduce a block that is wholly present on this site
    fn reduce_block(&self, rank: Rank, block: &Block, args: &ReduceArgs) -> Result<Value> {
        let result = match rank {
            // A scalar reduces to itself whatever the axis
            Rank::R0 => reduce::<S>(block, &[], args.keepdims, args.initial),
            Rank::R1 | Rank::R2 | Rank::R3 => {
                let axes = match &args.axes {
                    Axes::All => (0..rank.dims()).collect(),
                    Axes::One(a) => vec![normalize_axis(S::NAME, *a, rank.dims())?],
                    Axes::Many(list) => list
                        .iter()
                        .map(|a| normalize_axis(S::NAME, *a, rank.dims()))
                        .collect::<Result<Vec<_>>>()?,
                };
                reduce::<S>(block, &axes, args.keepdims, args.initial)
            }
        };
        Ok(result.into())
    }
}

#[async_trait]
impl<S: Statistic> RankHandlers for Statistics<S> {
    async fn local(&self, rank: Rank, operands: Vec<Value>) -> Result<Value> {
        let args = parse_args(S::NAME, &operands)?;
        let block = operands
            .into_iter()
            .next()
            .ok_or_else(|| RuntimeError::arity(S::NAME, "between 1 and 4", 0))?
            .into_block(S::NAME)?;
        self.reduce_block(rank, &block, &args)
    }

    async fn distributed(&self, rank: Rank, operands: Vec<Value>) -> Result<Value> {
        let args = parse_args(S::NAME, &operands)?;
        let distribution = match operands.first() {
            Some(Value::Array(ArrayValue {
                distribution: Some(dist),
                ..
            })) => dist.clone(),
            _ => return self.local(rank, operands).await,
        };
        let global = gather(&distribution).await?;
        self.reduce_block(rank, &global, &args)
    }
}

#[async_trait]
impl<S: Statistic> Primitive for Statistics<S> {
    fn family(&self) -> &'static str {
        S::NAME
    }

    async fn eval(&self, operands: Vec<Value>, _ctx: &EvalContext) -> Result<Value> {
        validate_operands(S::NAME, &operands, &OPERANDS)?;
        let plain_nd = operands.get(1).map(Value::is_list).unwrap_or(false);
        let route = route(S::NAME, &operands[0], plain_nd)?;
        dispatch(self, route, operands).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Max, Mean, Min, Prod, Sum};

    fn m4x3() -> Value {
        Block::matrix(vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
            vec![10.0, 11.0, 12.0],
        ])
        .unwrap()
        .into()
    }

    async fn eval<S: Statistic>(operands: Vec<Value>) -> Result<Value> {
        Statistics::<S>::new().eval(operands, &EvalContext::new()).await
    }

    #[tokio::test]
    async fn test_sum_all() {
        let out = eval::<Sum>(vec![m4x3()]).await.unwrap();
        assert_eq!(out.as_scalar(), Some(78.0));
        assert_eq!(out.rank(), Some(0));

        let out = eval::<Sum>(vec![m4x3(), Value::Nil, Value::Bool(false)]).await.unwrap();
        assert_eq!(out.as_scalar(), Some(78.0));
    }

    #[tokio::test]
    async fn test_sum_axis_keepdims() {
        let out = eval::<Sum>(vec![m4x3(), Value::Int(1), Value::Bool(true)]).await.unwrap();
        let block = out.as_block().unwrap();
        assert_eq!(block.shape, vec![4, 1]);
        assert_eq!(block.data, vec![6.0, 15.0, 24.0, 33.0]);
    }

    #[tokio::test]
    async fn test_negative_axis() {
        let out = eval::<Max>(vec![m4x3(), Value::Int(-2)]).await.unwrap();
        let block = out.as_block().unwrap();
        assert_eq!(block.shape, vec![3]);
        assert_eq!(block.data, vec![10.0, 11.0, 12.0]);
    }

    #[tokio::test]
    async fn test_axis_out_of_bounds() {
        let err = eval::<Sum>(vec![m4x3(), Value::Int(2)]).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidOperand { .. }));
        let err = eval::<Sum>(vec![m4x3(), Value::Int(-3)]).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidOperand { .. }));
    }

    #[tokio::test]
    async fn test_axis_list() {
        let t = Block::new(vec![2, 2, 2], (1..=8).map(f64::from).collect()).unwrap();
        let out = eval::<Sum>(vec![t.into(), Value::int_list(&[0, -1])]).await.unwrap();
        let block = out.as_block().unwrap();
        assert_eq!(block.shape, vec![2]);
        assert_eq!(block.data, vec![1.0 + 2.0 + 5.0 + 6.0, 3.0 + 4.0 + 7.0 + 8.0]);
    }

    #[tokio::test]
    async fn test_initial() {
        let v: Value = Block::vector(vec![2.0, 3.0]).into();
        let out = eval::<Prod>(vec![v.clone(), Value::Nil, Value::Nil, Value::scalar(10.0)])
            .await
            .unwrap();
        assert_eq!(out.as_scalar(), Some(60.0));

        let out = eval::<Min>(vec![v.clone(), Value::Nil, Value::Nil, Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(out.as_scalar(), Some(1.0));

        // Seeds the sum only; the count stays at 2
        let out = eval::<Mean>(vec![v, Value::Nil, Value::Nil, Value::Int(1)]).await.unwrap();
        assert_eq!(out.as_scalar(), Some(3.0));
    }

    #[tokio::test]
    async fn test_scalar_data() {
        let out = eval::<Mean>(vec![Value::Int(4)]).await.unwrap();
        assert_eq!(out.as_scalar(), Some(4.0));
    }

    #[tokio::test]
    async fn test_arity_and_required_operands() {
        assert!(matches!(eval::<Sum>(vec![]).await, Err(RuntimeError::Arity { .. })));
        assert!(matches!(
            eval::<Sum>(vec![m4x3(); 5]).await,
            Err(RuntimeError::Arity { .. })
        ));
        assert!(matches!(
            eval::<Sum>(vec![Value::Nil, Value::Int(0)]).await,
            Err(RuntimeError::InvalidOperand { .. })
        ));
    }

    #[tokio::test]
    async fn test_rank_four_unsupported() {
        let t = Block::new(vec![1, 1, 1, 2], vec![1.0, 2.0]).unwrap();
        let err = eval::<Sum>(vec![t.into()]).await.unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedRank { rank: 4, .. }));
    }
}
