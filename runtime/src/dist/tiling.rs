//! Distribution annotation
//!
//! An array value whose data is one site's partition of a larger array
//! carries a [`Distribution`]: the distributed tensor the partition belongs to
//! and the axis along which the partitions tile the global array.

use super::tensor::DistributedTensor;
use crate::array::Block;
use crate::errors::{Result, RuntimeError};
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

/// Axis along which site partitions are laid side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tiling {
    Pages,
    Rows,
    Columns,
}

impl Tiling {
    /// Concatenation axis for partitions of the given rank
    ///
    /// Pages only exist for rank 3; a vector has a single axis whatever the
    /// tiling. Scalars are replicated and have none.
    pub fn axis(self, rank: usize) -> Result<usize> {
        let axis = match (rank, self) {
            (1, _) => Some(0),
            (2, Tiling::Rows) => Some(0),
            (2, Tiling::Columns) => Some(1),
            (3, Tiling::Pages) => Some(0),
            (3, Tiling::Rows) => Some(1),
            (3, Tiling::Columns) => Some(2),
            _ => None,
        };
        axis.ok_or_else(|| {
            RuntimeError::Range(format!("{:?} tiling is undefined for rank {}", self, rank))
        })
    }
}

#[derive(Debug, Clone)]
pub struct Distribution {
    pub tensor: Arc<DistributedTensor>,
    pub tiling: Tiling,
}

impl Distribution {
    pub fn new(tensor: Arc<DistributedTensor>, tiling: Tiling) -> Self {
        Self { tensor, tiling }
    }
}

impl PartialEq for Distribution {
    fn eq(&self, other: &Self) -> bool {
        self.tiling == other.tiling
            && (Arc::ptr_eq(&self.tensor, &other.tensor)
                || (self.tensor.name() == other.tensor.name()
                    && self.tensor.this_site() == other.tensor.this_site()))
    }
}

/// Assemble the global array from every site's partition
///
/// Remote partitions are fetched concurrently and placed in site order; the
/// local one is read in place. Rank-0 partitions are replicated, so the
/// local value is the global one.
pub async fn gather(distribution: &Distribution) -> Result<Block> {
    let tensor = &distribution.tensor;
    let local = tensor.deref_local();
    if local.rank() == 0 || tensor.site_count() == 1 {
        return Ok(local.clone());
    }
    let axis = distribution.tiling.axis(local.rank())?;

    let parts = join_all((0..tensor.site_count()).map(|site| async move {
        if site == tensor.this_site() {
            Ok(tensor.deref_local().clone())
        } else {
            tensor.fetch(site).await.map(|p| p.into_block())
        }
    }))
    .await
    .into_iter()
    .collect::<Result<Vec<Block>>>()?;

    let global = Block::concat(&parts, axis)?;
    debug!(
        name = tensor.name(),
        sites = parts.len(),
        shape = ?global.shape,
        "Gathered distributed array"
    );
    Ok(global)
}
