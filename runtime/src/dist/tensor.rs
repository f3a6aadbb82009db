//! Distributed tensors
//!
//! A [`DistributedTensor`] is one site's view of a logical array whose
//! partitions live on every participating site. All sites create it at the
//! same logical point under the same basename; each registers only its own
//! partition. Remote partitions are never fetched eagerly: their handles are
//! resolved through the directory on first use and cached.
//!
//! ```text
//!  site 0                    site 1                    site 2
//! ┌──────────────┐          ┌──────────────┐          ┌──────────────┐
//! │ local part 0 │          │ local part 1 │          │ local part 2 │
//! │ cache {0,2}  │──fetch──▶│ cache {1}    │          │ cache {2}    │
//! └──────────────┘    │     └──────────────┘          └──────────────┘
//!                     └────────────────fetch_range──────────▲
//! ```

use super::address_cache::{AddressCache, Insert};
use super::directory::Directory;
use super::partition::{Partition, PartitionHandle, NAME_PREFIX};
use super::server::PartitionServer;
use super::site::Site;
use super::transport::{from_cbor, to_cbor, FetchPartRequest, Opcode, RemoteInvoker, Reply};
use crate::array::Block;
use crate::errors::{Result, RuntimeError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct DistributedTensor {
    /// Registered name, `"dist_tensor_" + basename`
    name: String,
    site_count: usize,
    this_site: usize,
    local: Arc<Partition>,
    local_handle: PartitionHandle,
    cache: AddressCache,
    directory: Arc<dyn Directory>,
    invoker: Arc<dyn RemoteInvoker>,
    server: Arc<PartitionServer>,
    destroyed: bool,
}

impl DistributedTensor {
    /// Create this site's part of the distributed tensor `basename`
    ///
    /// `site_count` and `this_site` default to the ambient facts of `site`.
    /// Fails with [`RuntimeError::InvalidPartition`] when
    /// `this_site >= site_count`; nothing is registered in that case, nor
    /// when registration itself fails.
    pub async fn create(
        site: &Site,
        basename: &str,
        data: Block,
        site_count: Option<usize>,
        this_site: Option<usize>,
    ) -> Result<Self> {
        let site_count = site_count.unwrap_or_else(|| site.site_count());
        let this_site = this_site.unwrap_or_else(|| site.this_site());
        if this_site >= site_count {
            return Err(RuntimeError::InvalidPartition {
                this_site,
                site_count,
            });
        }

        let name = format!("{}{}", NAME_PREFIX, basename);
        let local = Arc::new(Partition::new(this_site, data)?);
        let server = Arc::clone(site.server());
        let local_handle = server.host(Arc::clone(&local))?;

        if let Err(e) = site.directory().register(&name, this_site, local_handle).await {
            server.retire(local_handle)?;
            return Err(e);
        }

        let cache = AddressCache::new();
        cache.insert_if_absent(this_site, local_handle);

        info!(
            name = %name,
            site_count,
            this_site,
            shape = ?local.shape(),
            "Registered distributed tensor partition"
        );

        Ok(Self {
            name,
            site_count,
            this_site,
            local,
            local_handle,
            cache,
            directory: Arc::clone(site.directory()),
            invoker: Arc::clone(site.invoker()),
            server,
            destroyed: false,
        })
    }

    /// Registered name (`"dist_tensor_" + basename`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn site_count(&self) -> usize {
        self.site_count
    }

    pub fn this_site(&self) -> usize {
        self.this_site
    }

    /// Number of resolved handles, the local one included
    pub fn cached_sites(&self) -> usize {
        self.cache.len()
    }

    /// The local partition's data, without copying
    pub fn deref_local(&self) -> &Block {
        debug_assert_eq!(
            self.cache.get(self.this_site),
            Some(self.local_handle),
            "local partition must be registered"
        );
        self.local.block()
    }

    /// Resolve `site` to a partition handle, consulting the directory at
    /// most once per site in the common case. Concurrent first lookups for
    /// the same site may all reach the directory; the first to insert wins
    /// and every caller returns the winning handle.
    #[instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub async fn resolve(&self, site: usize) -> Result<PartitionHandle> {
        if site == self.this_site {
            return self
                .cache
                .get(site)
                .ok_or_else(|| RuntimeError::Directory("local partition not cached".into()));
        }

        if site >= self.site_count {
            return Err(RuntimeError::Range(format!(
                "{}: site index {} out of range for {} sites",
                self.name, site, self.site_count
            )));
        }

        if let Some(handle) = self.cache.get(site) {
            return Ok(handle);
        }

        let looked_up = self.directory.lookup(&self.name, site).await?;
        match self.cache.insert_if_absent(site, looked_up) {
            Insert::Inserted(handle) => {
                debug!(site, handle = %handle, "Cached partition handle");
                Ok(handle)
            }
            Insert::Existing(handle) => {
                debug!(site, handle = %handle, "Concurrent lookup already cached handle");
                Ok(handle)
            }
        }
    }

    /// Owned copy of `site`'s whole partition
    ///
    /// Goes through the transport even for the local site; use
    /// [`deref_local`](Self::deref_local) for zero-copy local access.
    pub async fn fetch(&self, site: usize) -> Result<Partition> {
        let handle = self.resolve(site).await?;
        let bytes = self.invoker.invoke(handle, Opcode::Fetch, Vec::new()).await?;
        let block = from_cbor::<Reply>(&bytes)?.into_result()?;
        Partition::new(site, block)
    }

    /// Owned copy of the window `[start, stop)` per axis of `site`'s partition
    pub async fn fetch_range(&self, site: usize, start: &[usize], stop: &[usize]) -> Result<Partition> {
        let handle = self.resolve(site).await?;
        let payload = to_cbor(&FetchPartRequest {
            start: start.to_vec(),
            stop: stop.to_vec(),
        })?;
        let bytes = self.invoker.invoke(handle, Opcode::FetchPart, payload).await?;
        let block = from_cbor::<Reply>(&bytes)?.into_result()?;
        Partition::new(site, block)
    }

    /// Unregister the local name and stop hosting the local partition
    ///
    /// Returns once the directory has confirmed the unregistration.
    pub async fn destroy(mut self) -> Result<()> {
        self.destroyed = true;
        let unregistered = self.directory.unregister(&self.name, self.this_site).await;
        self.server.retire(self.local_handle)?;
        unregistered?;
        info!(name = %self.name, this_site = self.this_site, "Unregistered distributed tensor partition");
        Ok(())
    }
}

impl Drop for DistributedTensor {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }

        warn!(
            name = %self.name,
            this_site = self.this_site,
            "Distributed tensor dropped without destroy(); unregistering in background"
        );
        if let Err(e) = self.server.retire(self.local_handle) {
            warn!(name = %self.name, error = %e, "Failed to retire local partition");
        }
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            let directory = Arc::clone(&self.directory);
            let name = std::mem::take(&mut self.name);
            let site = self.this_site;
            rt.spawn(async move {
                if let Err(e) = directory.unregister(&name, site).await {
                    warn!(name = %name, error = %e, "Background unregistration failed");
                }
            });
        }
    }
}

impl fmt::Debug for DistributedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedTensor")
            .field("name", &self.name)
            .field("site_count", &self.site_count)
            .field("this_site", &self.this_site)
            .field("local_shape", &self.local.shape())
            .field("cached_sites", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::loopback::LoopbackCluster;
    use futures::future::join_all;
    use std::time::Duration;

    async fn create_on_all(cluster: &LoopbackCluster, basename: &str) -> Vec<DistributedTensor> {
        let mut tensors = Vec::new();
        for site in cluster.sites() {
            let rows = vec![vec![site.this_site() as f64; 2]; 2];
            let block = Block::matrix(rows).unwrap();
            tensors.push(DistributedTensor::create(site, basename, block, None, None).await.unwrap());
        }
        tensors
    }

    #[tokio::test]
    async fn test_create_registers_local_partition() {
        let cluster = LoopbackCluster::new(3).unwrap();
        let tensors = create_on_all(&cluster, "a").await;

        assert_eq!(tensors[1].name(), "dist_tensor_a");
        assert_eq!(tensors[1].cached_sites(), 1);
        assert_eq!(tensors[1].deref_local().data, vec![1.0; 4]);
        assert_eq!(cluster.directory().registered_count(), 3);
        assert_eq!(cluster.directory().lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_partition_registers_nothing() {
        let cluster = LoopbackCluster::new(2).unwrap();
        let err = DistributedTensor::create(cluster.site(0), "bad", Block::scalar(1.0), Some(2), Some(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidPartition {
                this_site: 2,
                site_count: 2
            }
        ));
        assert_eq!(cluster.directory().registered_count(), 0);
        assert_eq!(cluster.site(0).server().hosted_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rolled_back() {
        let cluster = LoopbackCluster::new(1).unwrap();
        let _first = DistributedTensor::create(cluster.site(0), "dup", Block::scalar(1.0), None, None)
            .await
            .unwrap();
        let second =
            DistributedTensor::create(cluster.site(0), "dup", Block::scalar(2.0), None, None).await;
        assert!(matches!(second, Err(RuntimeError::Directory(_))));
        assert_eq!(cluster.site(0).server().hosted_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_remote_and_local() {
        let cluster = LoopbackCluster::new(3).unwrap();
        let tensors = create_on_all(&cluster, "b").await;

        let remote = tensors[0].fetch(2).await.unwrap();
        assert_eq!(remote.site(), 2);
        assert_eq!(remote.block().data, vec![2.0; 4]);

        // The local site also goes through the transport
        let before = cluster.transport().invocation_count();
        let local = tensors[0].fetch(0).await.unwrap();
        assert_eq!(local.block(), tensors[0].deref_local());
        assert_eq!(cluster.transport().invocation_count(), before + 1);
    }

    #[tokio::test]
    async fn test_fetch_range() {
        let cluster = LoopbackCluster::new(2).unwrap();
        let site = cluster.site(1);
        let data = Block::matrix(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let _remote = DistributedTensor::create(site, "c", data, None, None).await.unwrap();
        let zeros = Block::matrix(vec![vec![0.0; 3]]).unwrap();
        let local = DistributedTensor::create(cluster.site(0), "c", zeros, None, None)
            .await
            .unwrap();

        let part = local.fetch_range(1, &[1, 1], &[2, 3]).await.unwrap();
        assert_eq!(part.shape(), &[1, 2]);
        assert_eq!(part.block().data, vec![5.0, 6.0]);

        let err = local.fetch_range(1, &[0, 0], &[3, 3]).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Range(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_site_skips_directory() {
        let cluster = LoopbackCluster::new(2).unwrap();
        let tensors = create_on_all(&cluster, "d").await;

        let err = tensors[0].fetch(5).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Range(_)));
        assert_eq!(cluster.directory().lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_fetches_agree() {
        let cluster = LoopbackCluster::new(2).unwrap();
        let block = Block::matrix(vec![vec![0.0; 2]; 2]).unwrap();
        let t0 = DistributedTensor::create(cluster.site(0), "e", block, None, None)
            .await
            .unwrap();

        // Every resolve is waiting in the directory before site 1 registers
        let resolves = join_all((0..16).map(|_| t0.resolve(1)));
        let register = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let block = Block::matrix(vec![vec![1.0; 2]; 2]).unwrap();
            DistributedTensor::create(cluster.site(1), "e", block, None, None)
                .await
                .unwrap()
        };
        let (handles, t1) = tokio::join!(resolves, register);

        assert_eq!(cluster.directory().lookup_count(), 16);
        let first = handles[0].as_ref().copied().unwrap();
        assert_eq!(first.site, 1);
        assert!(handles.iter().all(|h| h.as_ref().ok() == Some(&first)));
        assert_eq!(t0.cached_sites(), 2);

        // Resolved handles are never looked up again
        assert_eq!(t0.fetch(1).await.unwrap().block().data, vec![1.0; 4]);
        assert_eq!(cluster.directory().lookup_count(), 16);

        t1.destroy().await.unwrap();
        t0.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_without_destroy_retires_partition() {
        let cluster = LoopbackCluster::new(1).unwrap();
        let tensor = DistributedTensor::create(cluster.site(0), "g", Block::scalar(1.0), None, None)
            .await
            .unwrap();
        assert_eq!(cluster.site(0).server().hosted_count(), 1);

        drop(tensor);
        assert_eq!(cluster.site(0).server().hosted_count(), 0);
        // Unregistration finishes on a background task
        for _ in 0..10 {
            if cluster.directory().registered_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cluster.directory().registered_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_unregisters() {
        let cluster = LoopbackCluster::new(2).unwrap();
        let mut tensors = create_on_all(&cluster, "f").await;
        let t1 = tensors.pop().unwrap();
        let t0 = tensors.pop().unwrap();
        t0.fetch(1).await.unwrap();

        t1.destroy().await.unwrap();
        assert_eq!(cluster.directory().registered_count(), 1);
        assert_eq!(cluster.site(1).server().hosted_count(), 0);

        // The cached handle now points at a retired partition
        assert!(matches!(t0.fetch(1).await, Err(RuntimeError::Transport(_))));
        t0.destroy().await.unwrap();
        assert_eq!(cluster.directory().registered_count(), 0);
    }
}
