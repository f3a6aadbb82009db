//! Operation graph nodes
//!
//! A [`PrimitiveNode`] binds one primitive family to an ordered operand list.
//! Operands are literals, references to the caller's runtime arguments, or
//! nested nodes evaluated by the same engine.

use super::context::EvalContext;
use super::resolve::map_operands;
use super::stats::PrimitiveStats;
use crate::errors::Result;
use crate::value::Value;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A primitive family's evaluation entry point
///
/// Receives the fully resolved operand values in their original order.
#[async_trait]
pub trait Primitive: Send + Sync {
    fn family(&self) -> &'static str;

    async fn eval(&self, operands: Vec<Value>, ctx: &EvalContext) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub enum Operand {
    Literal(Value),
    /// Index into the runtime arguments of the evaluation
    Argument(usize),
    Node(Arc<PrimitiveNode>),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Literal(v)
    }
}

impl From<Arc<PrimitiveNode>> for Operand {
    fn from(node: Arc<PrimitiveNode>) -> Self {
        Operand::Node(node)
    }
}

pub struct PrimitiveNode {
    instance_name: String,
    primitive: Arc<dyn Primitive>,
    operands: Vec<Operand>,
    stats: PrimitiveStats,
}

impl PrimitiveNode {
    pub fn new(
        instance_name: impl Into<String>,
        primitive: Arc<dyn Primitive>,
        operands: Vec<Operand>,
    ) -> Self {
        Self {
            instance_name: instance_name.into(),
            primitive,
            operands,
            stats: PrimitiveStats::new(),
        }
    }

    /// Unique name of this node, e.g. `sum#3`
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn family(&self) -> &'static str {
        self.primitive.family()
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn stats(&self) -> &PrimitiveStats {
        &self.stats
    }

    /// Evaluate against the caller's runtime arguments
    ///
    /// A node without bound operands takes `args` as its operands.
    pub fn eval<'a>(
        &'a self,
        args: &'a [Value],
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            debug!(
                request_id = %ctx.request_id(),
                depth = ctx.depth(),
                node = %self.instance_name,
                "Evaluating primitive"
            );
            let started = Instant::now();

            let operands = if self.operands.is_empty() {
                args.to_vec()
            } else {
                map_operands(&self.operands, args, &ctx.child()).await?
            };
            let result = self.primitive.eval(operands, ctx).await;

            self.stats.record(started.elapsed());
            if let Err(e) = &result {
                warn!(request_id = %ctx.request_id(), node = %self.instance_name, error = %e, "Primitive failed");
            }
            result
        }
        .boxed()
    }

    /// This node followed by every nested node, depth first
    pub fn walk(&self) -> Vec<&PrimitiveNode> {
        let mut nodes = vec![self];
        for op in &self.operands {
            if let Operand::Node(child) = op {
                nodes.extend(child.walk());
            }
        }
        nodes
    }
}

impl fmt::Debug for PrimitiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveNode")
            .field("instance_name", &self.instance_name)
            .field("family", &self.family())
            .field("operands", &self.operands)
            .finish()
    }
}
