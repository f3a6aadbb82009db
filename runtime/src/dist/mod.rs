//! Distributed tensors and the plumbing they sit on
//!
//! - [`partition`]: site-local blocks and the handles naming them
//! - [`address_cache`]: per-tensor site → handle cache
//! - [`tensor`]: the distributed tensor itself
//! - [`tiling`]: distribution annotations and gathering
//! - [`directory`], [`transport`], [`server`]: naming, request framing, hosting
//! - [`loopback`]: every site of a computation inside one process

pub mod address_cache;
pub mod directory;
pub mod loopback;
pub mod partition;
pub mod server;
pub mod site;
pub mod tensor;
pub mod tiling;
pub mod transport;

pub use address_cache::AddressCache;
pub use directory::Directory;
pub use loopback::{InMemoryDirectory, LoopbackCluster, LoopbackTransport};
pub use partition::{Partition, PartitionHandle};
pub use server::PartitionServer;
pub use site::Site;
pub use tensor::DistributedTensor;
pub use tiling::{gather, Distribution, Tiling};
pub use transport::{Opcode, RemoteInvoker};
