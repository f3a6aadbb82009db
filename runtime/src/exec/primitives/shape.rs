//! `shape(data)` and `shape(data, index)`
//!
//! Returns the extents of `data` as a list of integers, or a single extent.
//! Distributed data reports the shape of the assembled global array.

use crate::dist::tiling::gather;
use crate::errors::{Result, RuntimeError};
use crate::exec::context::EvalContext;
use crate::exec::dispatch::{dispatch, route, validate_operands, OperandSpec, Rank, RankHandlers};
use crate::exec::operand::Primitive;
use crate::value::{extract_scalar_integer, Value};
use async_trait::async_trait;

const FAMILY: &str = "shape";

const OPERANDS: OperandSpec = OperandSpec {
    min: 1,
    max: 2,
    optional: &[],
};

fn extents(dims: &[usize], operands: &[Value]) -> Result<Value> {
    let Some(index) = operands.get(1) else {
        let list: Vec<i64> = dims.iter().map(|&d| d as i64).collect();
        return Ok(Value::int_list(&list));
    };

    let index = extract_scalar_integer(index, FAMILY)?;
    let rank = dims.len() as i64;
    let normalized = if index < 0 { index + rank } else { index };
    if normalized < 0 || normalized >= rank {
        return Err(RuntimeError::invalid_operand(
            FAMILY,
            format!("index {} is out of bounds for array of dimension {}", index, rank),
        ));
    }
    Ok(Value::Int(dims[normalized as usize] as i64))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Shape;

#[async_trait]
impl RankHandlers for Shape {
    async fn local(&self, _rank: Rank, operands: Vec<Value>) -> Result<Value> {
        let dims = match operands[0].as_block() {
            Some(block) => block.shape.clone(),
            // integers and booleans are scalars
            None => Vec::new(),
        };
        extents(&dims, &operands)
    }

    async fn distributed(&self, rank: Rank, operands: Vec<Value>) -> Result<Value> {
        let distribution = match operands[0].distribution() {
            Some(dist) if rank != Rank::R0 => dist.clone(),
            _ => return self.local(rank, operands).await,
        };
        let global = gather(&distribution).await?;
        extents(&global.shape, &operands)
    }
}

#[async_trait]
impl Primitive for Shape {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn eval(&self, operands: Vec<Value>, _ctx: &EvalContext) -> Result<Value> {
        validate_operands(FAMILY, &operands, &OPERANDS)?;
        let route = route(FAMILY, &operands[0], false)?;
        dispatch(self, route, operands).await
    }
}
