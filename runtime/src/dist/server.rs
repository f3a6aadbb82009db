//! Partition hosting
//!
//! Each site runs one [`PartitionServer`]. It owns the table of partitions
//! hosted on the site and answers fetch requests arriving through the
//! transport with owned copies of the requested data.

use super::partition::{Partition, PartitionHandle};
use super::transport::{from_cbor, to_cbor, FailureCode, FetchPartRequest, Opcode, Reply};
use crate::errors::{Result, RuntimeError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct PartitionServer {
    site: usize,
    /// Never held across an await
    hosted: RwLock<HashMap<Uuid, Arc<Partition>>>,
}

impl PartitionServer {
    pub fn new(site: usize) -> Self {
        Self {
            site,
            hosted: RwLock::new(HashMap::new()),
        }
    }

    pub fn site(&self) -> usize {
        self.site
    }

    /// Start hosting a partition, returning its new handle
    pub fn host(&self, partition: Arc<Partition>) -> Result<PartitionHandle> {
        let handle = PartitionHandle::new(self.site);
        let mut hosted = self.hosted.write().map_err(|_| {
            RuntimeError::Transport("Failed to acquire partition table write lock".to_string())
        })?;
        hosted.insert(handle.id, partition);
        debug!(site = self.site, handle = %handle, "Hosting partition");
        Ok(handle)
    }

    /// Stop hosting; returns whether the handle was hosted
    pub fn retire(&self, handle: PartitionHandle) -> Result<bool> {
        let mut hosted = self.hosted.write().map_err(|_| {
            RuntimeError::Transport("Failed to acquire partition table write lock".to_string())
        })?;
        Ok(hosted.remove(&handle.id).is_some())
    }

    /// Direct access to a hosted partition
    pub fn get(&self, handle: PartitionHandle) -> Option<Arc<Partition>> {
        let hosted = self.hosted.read().ok()?;
        hosted.get(&handle.id).cloned()
    }

    pub fn hosted_count(&self) -> usize {
        self.hosted.read().map(|h| h.len()).unwrap_or(0)
    }

    /// Answer one request, producing the encoded [`Reply`]
    pub fn serve(&self, target: PartitionHandle, opcode: Opcode, payload: &[u8]) -> Result<Vec<u8>> {
        let reply = match self.get(target) {
            None => {
                warn!(site = self.site, handle = %target, "Request for unknown partition");
                Reply::failed(
                    FailureCode::NotFound,
                    format!("partition {} not hosted on site {}", target, self.site),
                )
            }
            Some(partition) => match opcode {
                Opcode::Fetch => Reply::Partition(partition.block().clone()),
                Opcode::FetchPart => match from_cbor::<FetchPartRequest>(payload) {
                    Ok(req) => match partition.block().sub_block(&req.start, &req.stop) {
                        Ok(block) => Reply::Partition(block),
                        Err(e) => Reply::failed(FailureCode::Range, e.to_string()),
                    },
                    Err(e) => Reply::failed(FailureCode::BadRequest, e.to_string()),
                },
            },
        };
        to_cbor(&reply)
    }
}
