//! Asynchronous primitive evaluation
//!
//! An operation graph is a tree of [`PrimitiveNode`]s. Evaluating a node
//! resolves its operands concurrently ([`resolve`]), then routes the values to
//! the family's rank-specialized handler ([`dispatch`]).

pub mod context;
pub mod dispatch;
pub mod operand;
pub mod primitives;
pub mod registry;
pub mod resolve;
pub mod stats;

pub use context::EvalContext;
pub use dispatch::{Rank, RankHandlers, Route};
pub use operand::{Operand, Primitive, PrimitiveNode};
pub use registry::{PrimitiveInfo, PrimitiveRegistry};
pub use stats::{write_csv, PrimitiveStats};
