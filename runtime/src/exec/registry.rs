//! Name → primitive family table
//!
//! Front ends build operation graphs by name; the registry turns a name and
//! an operand list into a [`PrimitiveNode`] with a unique instance name.

use super::operand::{Operand, Primitive, PrimitiveNode};
use super::primitives;
use crate::errors::{Result, RuntimeError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub type Factory = fn() -> Arc<dyn Primitive>;

/// One registered family
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveInfo {
    pub name: &'static str,
    /// Accepted call form, `_N` standing for the N-th operand
    pub pattern: &'static str,
    pub factory: Factory,
}

impl PrimitiveInfo {
    pub const fn new(name: &'static str, pattern: &'static str, factory: Factory) -> Self {
        Self {
            name,
            pattern,
            factory,
        }
    }
}

#[derive(Debug)]
pub struct PrimitiveRegistry {
    entries: BTreeMap<&'static str, PrimitiveInfo>,
    next_instance: AtomicU64,
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PrimitiveRegistry {
    /// Registry without any families
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_instance: AtomicU64::new(0),
        }
    }

    /// Registry holding every built-in family
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for info in primitives::builtin() {
            registry.entries.insert(info.name, info);
        }
        registry
    }

    pub fn register(&mut self, info: PrimitiveInfo) -> Result<()> {
        if self.entries.contains_key(info.name) {
            return Err(RuntimeError::Config(format!(
                "primitive {} is already registered",
                info.name
            )));
        }
        self.entries.insert(info.name, info);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn pattern(&self, name: &str) -> Option<&'static str> {
        self.entries.get(name).map(|info| info.pattern)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Build a node of family `name` over `operands`
    pub fn create(&self, name: &str, operands: Vec<Operand>) -> Result<Arc<PrimitiveNode>> {
        let info = self
            .entries
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownPrimitive(name.to_string()))?;
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let instance_name = format!("{}#{}", info.name, instance);
        debug!(node = %instance_name, operands = operands.len(), "Created primitive node");
        Ok(Arc::new(PrimitiveNode::new(
            instance_name,
            (info.factory)(),
            operands,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Block;
    use crate::exec::context::EvalContext;
    use crate::exec::stats::{write_csv, CSV_HEADER};
    use crate::value::Value;

    #[test]
    fn test_builtins() {
        let registry = PrimitiveRegistry::with_builtins();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["max", "mean", "min", "prod", "shape", "slice_row", "sum"]);
        assert_eq!(registry.pattern("slice_row"), Some("slice_row(_1, _2, _3)"));
        assert!(registry.contains("sum"));
    }

    #[test]
    fn test_unknown_and_duplicate() {
        let mut registry = PrimitiveRegistry::with_builtins();
        let err = registry.create("transpose", vec![]).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownPrimitive(ref n) if n == "transpose"));

        let sum = primitives::builtin()[0];
        assert!(registry.register(sum).is_err());

        let mut empty = PrimitiveRegistry::empty();
        empty.register(sum).unwrap();
        assert!(empty.contains("sum"));
    }

    #[tokio::test]
    async fn test_nested_graph_and_stats() {
        let registry = PrimitiveRegistry::with_builtins();
        let m = Block::matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();

        // sum(slice_row(_0, 0, 2), 0)
        let rows = registry
            .create(
                "slice_row",
                vec![
                    Operand::Argument(0),
                    Operand::Literal(Value::Int(0)),
                    Operand::Literal(Value::Int(2)),
                ],
            )
            .unwrap();
        let sum = registry
            .create("sum", vec![rows.into(), Operand::Literal(Value::Int(0))])
            .unwrap();

        let out = sum.eval(&[m.into()], &EvalContext::new()).await.unwrap();
        assert_eq!(out.as_block().unwrap().data, vec![4.0, 6.0]);
        assert_eq!(sum.walk().len(), 2);
        assert!(sum.walk().iter().all(|n| n.stats().count() == 1));

        let mut csv = Vec::new();
        write_csv(&sum, &mut csv).unwrap();
        let csv = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with(&format!("{},sum,1,", sum.instance_name())));
        assert!(lines[2].contains(",slice_row,1,"));
    }

    #[tokio::test]
    async fn test_node_without_operands_uses_arguments() {
        let registry = PrimitiveRegistry::with_builtins();
        let node = registry.create("max", vec![]).unwrap();
        let v: Value = Block::vector(vec![3.0, 9.0, 1.0]).into();
        let out = node.eval(&[v], &EvalContext::new()).await.unwrap();
        assert_eq!(out.as_scalar(), Some(9.0));
    }
}
