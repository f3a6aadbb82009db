//! Built-in primitive families

pub mod row_slicing;
pub mod shape;
pub mod statistics;

pub use row_slicing::RowSlicing;
pub use shape::Shape;
pub use statistics::Statistics;

use super::operand::Primitive;
use super::registry::PrimitiveInfo;
use crate::array::{Max, Mean, Min, Prod, Statistic, Sum};
use std::sync::Arc;

fn statistic<S: Statistic>() -> Arc<dyn Primitive> {
    Arc::new(Statistics::<S>::new())
}

fn row_slicing() -> Arc<dyn Primitive> {
    Arc::new(RowSlicing)
}

fn shape() -> Arc<dyn Primitive> {
    Arc::new(Shape)
}

/// Registry entries for every built-in family
pub fn builtin() -> Vec<PrimitiveInfo> {
    vec![
        PrimitiveInfo::new("sum", "sum(_1, _2, _3, _4)", statistic::<Sum>),
        PrimitiveInfo::new("prod", "prod(_1, _2, _3, _4)", statistic::<Prod>),
        PrimitiveInfo::new("min", "min(_1, _2, _3, _4)", statistic::<Min>),
        PrimitiveInfo::new("max", "max(_1, _2, _3, _4)", statistic::<Max>),
        PrimitiveInfo::new("mean", "mean(_1, _2, _3, _4)", statistic::<Mean>),
        PrimitiveInfo::new("slice_row", "slice_row(_1, _2, _3)", row_slicing),
        PrimitiveInfo::new("shape", "shape(_1, _2)", shape),
    ]
}
