//! Symbolic-name directory interface
//!
//! The directory maps `"<basename>#<site>"` keys to partition handles. It is
//! an external collaborator: the runtime only registers its own partitions
//! and looks up the others on demand.

use super::partition::PartitionHandle;
use crate::errors::Result;
use async_trait::async_trait;

/// Distributed naming service
#[async_trait]
pub trait Directory: Send + Sync {
    /// Register `handle` as site `site`'s part of `name`
    async fn register(&self, name: &str, site: usize, handle: PartitionHandle) -> Result<()>;

    /// Resolve site `site`'s part of `name`
    ///
    /// May suspend until the owning site has registered its part.
    async fn lookup(&self, name: &str, site: usize) -> Result<PartitionHandle>;

    /// Remove site `site`'s part of `name`; completes once the name is gone
    async fn unregister(&self, name: &str, site: usize) -> Result<()>;
}
