//! Partition data and handles
//!
//! A partition is the portion of a distributed tensor owned by one site.
//! Handles identify a hosted partition independently of where the caller
//! runs; they are what the directory hands out for a symbolic name.

use crate::array::Block;
use crate::errors::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Highest rank a partition may have (pages × rows × columns)
pub const MAX_PARTITION_RANK: usize = 3;

/// Immutable dense block owned by one site
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    site: usize,
    block: Block,
}

impl Partition {
    /// Wrap a block as `site`'s partition, rejecting ranks above 3
    pub fn new(site: usize, block: Block) -> Result<Self> {
        if block.rank() > MAX_PARTITION_RANK {
            return Err(RuntimeError::unsupported_rank("partition", block.rank()));
        }
        Ok(Self { site, block })
    }

    pub fn site(&self) -> usize {
        self.site
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn shape(&self) -> &[usize] {
        &self.block.shape
    }

    pub fn into_block(self) -> Block {
        self.block
    }
}

/// Stable reference to a partition hosted on some site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionHandle {
    /// Site hosting the partition
    pub site: usize,
    /// Identity of the hosted partition on that site
    pub id: Uuid,
}

impl PartitionHandle {
    pub fn new(site: usize) -> Self {
        Self {
            site,
            id: Uuid::new_v4(),
        }
    }
}

impl fmt::Display for PartitionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.site)
    }
}

/// Prefix applied to every distributed tensor's registered name
pub const NAME_PREFIX: &str = "dist_tensor_";

/// Directory key for one site's part of a symbolic name: `"<basename>#<site>"`
pub fn directory_key(basename: &str, site: usize) -> String {
    format!("{}#{}", basename, site)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_rank_bound() {
        let cube = Block::new(vec![2, 2, 2], vec![0.0; 8]).unwrap();
        let p = Partition::new(1, cube).unwrap();
        assert_eq!(p.site(), 1);
        assert_eq!(p.shape(), &[2, 2, 2]);

        let hyper = Block::new(vec![1, 1, 1, 1], vec![0.0]).unwrap();
        let err = Partition::new(0, hyper).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedRank { rank: 4, .. }));
    }

    #[test]
    fn test_directory_key() {
        assert_eq!(directory_key("dist_tensor_weights", 3), "dist_tensor_weights#3");
    }

    #[test]
    fn test_handles_are_unique() {
        let a = PartitionHandle::new(0);
        let b = PartitionHandle::new(0);
        assert_ne!(a, b);
        assert!(a.to_string().ends_with("@0"));
    }
}
