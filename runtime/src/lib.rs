pub mod array;
pub mod config;
pub mod dist;
pub mod errors;
pub mod exec;
pub mod observability;
pub mod value;

pub use array::Block;
pub use config::{LoggingConfig, RuntimeConfig, SiteConfig};
pub use dist::{
    gather, DistributedTensor, Distribution, InMemoryDirectory, LoopbackCluster, Site, Tiling,
};
pub use errors::{Result, RuntimeError};
pub use exec::{EvalContext, Operand, PrimitiveNode, PrimitiveRegistry};
pub use value::Value;
