//! In-process directory and transport
//!
//! Runs every site of a computation inside one process: one shared
//! [`InMemoryDirectory`], one [`LoopbackTransport`] routing requests to the
//! target site's [`PartitionServer`]. Used for single-host execution and
//! throughout the tests.

use super::directory::Directory;
use super::partition::{directory_key, PartitionHandle};
use super::server::PartitionServer;
use super::site::Site;
use super::transport::{Opcode, RemoteInvoker};
use crate::config::SiteConfig;
use crate::errors::{Result, RuntimeError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, trace};

/// Directory kept in process memory
///
/// `lookup` of a name that has not been registered yet suspends until some
/// site registers it.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    names: Mutex<HashMap<String, PartitionHandle>>,
    registered: Notify,
    lookups: AtomicU64,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `lookup` calls served so far
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn registered_count(&self) -> usize {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn get(&self, key: &str) -> Option<PartitionHandle> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn register(&self, name: &str, site: usize, handle: PartitionHandle) -> Result<()> {
        let key = directory_key(name, site);
        {
            let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
            if names.contains_key(&key) {
                return Err(RuntimeError::Directory(format!("{} is already registered", key)));
            }
            names.insert(key.clone(), handle);
        }
        debug!(key = %key, handle = %handle, "Registered name");
        self.registered.notify_waiters();
        Ok(())
    }

    async fn lookup(&self, name: &str, site: usize) -> Result<PartitionHandle> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = directory_key(name, site);
        loop {
            // Arm the notification before checking so a registration
            // between the check and the await is not missed.
            let notified = self.registered.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(handle) = self.get(&key) {
                trace!(key = %key, handle = %handle, "Resolved name");
                return Ok(handle);
            }

            debug!(key = %key, "Waiting for name registration");
            notified.await;
        }
    }

    async fn unregister(&self, name: &str, site: usize) -> Result<()> {
        let key = directory_key(name, site);
        let removed = self
            .names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        match removed {
            Some(_) => {
                debug!(key = %key, "Unregistered name");
                Ok(())
            }
            None => Err(RuntimeError::Directory(format!("{} is not registered", key))),
        }
    }
}

/// Transport delivering requests to in-process partition servers
pub struct LoopbackTransport {
    servers: Vec<Arc<PartitionServer>>,
    invocations: AtomicU64,
}

impl LoopbackTransport {
    pub fn new(servers: Vec<Arc<PartitionServer>>) -> Self {
        Self {
            servers,
            invocations: AtomicU64::new(0),
        }
    }

    /// Number of requests carried so far
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RemoteInvoker for LoopbackTransport {
    async fn invoke(
        &self,
        target: PartitionHandle,
        opcode: Opcode,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        // Stand-in for the network round trip
        tokio::task::yield_now().await;

        let server = self.servers.get(target.site).ok_or_else(|| {
            RuntimeError::Transport(format!("no site {} in loopback cluster", target.site))
        })?;
        server.serve(target, opcode, &payload)
    }
}

/// All sites of a computation wired together in one process
pub struct LoopbackCluster {
    directory: Arc<InMemoryDirectory>,
    transport: Arc<LoopbackTransport>,
    sites: Vec<Site>,
}

impl LoopbackCluster {
    pub fn new(site_count: usize) -> Result<Self> {
        if site_count == 0 {
            return Err(RuntimeError::Config("site_count must be at least 1".into()));
        }

        let directory = Arc::new(InMemoryDirectory::new());
        let servers: Vec<Arc<PartitionServer>> = (0..site_count)
            .map(|site| Arc::new(PartitionServer::new(site)))
            .collect();
        let transport = Arc::new(LoopbackTransport::new(servers.clone()));

        let sites = servers
            .into_iter()
            .enumerate()
            .map(|(this_site, server)| {
                let directory: Arc<dyn Directory> = directory.clone();
                let invoker: Arc<dyn RemoteInvoker> = transport.clone();
                Site::new(
                    SiteConfig {
                        site_count,
                        this_site,
                    },
                    directory,
                    invoker,
                    server,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            directory,
            transport,
            sites,
        })
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn site(&self, index: usize) -> &Site {
        &self.sites[index]
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    pub fn transport(&self) -> &Arc<LoopbackTransport> {
        &self.transport
    }
}
