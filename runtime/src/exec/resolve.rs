//! Operand resolution and joining
//!
//! Every operand of a node is evaluated concurrently; the join finishes once
//! all of them have, and hands the values on in operand order. If any operand
//! failed, the first failure in operand order is returned and the remaining
//! values are discarded.

use super::context::EvalContext;
use super::operand::Operand;
use crate::errors::{Result, RuntimeError};
use crate::value::Value;
use futures::future::join_all;

/// Resolve one operand to a value
pub async fn resolve_operand(operand: &Operand, args: &[Value], ctx: &EvalContext) -> Result<Value> {
    match operand {
        Operand::Literal(v) => Ok(v.clone()),
        Operand::Argument(index) => args.get(*index).cloned().ok_or_else(|| {
            RuntimeError::invalid_operand(
                "argument",
                format!("argument {} requested, {} supplied", index, args.len()),
            )
        }),
        Operand::Node(node) => node.eval(args, ctx).await,
    }
}

/// Resolve all operands concurrently, preserving their order
pub async fn map_operands(operands: &[Operand], args: &[Value], ctx: &EvalContext) -> Result<Vec<Value>> {
    join_all(operands.iter().map(|op| resolve_operand(op, args, ctx)))
        .await
        .into_iter()
        .collect()
}
