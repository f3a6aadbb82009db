//! Dense numeric blocks
//!
//! A [`Block`] is a row-major array of `f64` values with an explicit shape.
//! Rank 0 is a scalar, rank 1 a vector, rank 2 a matrix (rows × columns) and
//! rank 3 a tensor (pages × rows × columns). The kernels in [`reduce`] and
//! the slicing helpers here are the dense math the primitives build on.

pub mod reduce;

use crate::errors::{Result, RuntimeError};
use serde::{Deserialize, Serialize};

pub use reduce::{Max, Mean, Min, Prod, Statistic, Sum};

/// Row-major dense array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Extent of each axis (empty for scalars)
    pub shape: Vec<usize>,
    /// Flattened data
    pub data: Vec<f64>,
}

impl Block {
    /// Create a block, checking the data length against the shape
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(RuntimeError::Range(format!(
                "data length {} doesn't match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Build a matrix from equally sized rows
    pub fn matrix(rows: Vec<Vec<f64>>) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(num_rows * num_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != num_cols {
                return Err(RuntimeError::Range(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    num_cols
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            shape: vec![num_rows, num_cols],
            data,
        })
    }

    /// Build a rank-3 block from equally shaped pages
    pub fn tensor3(pages: Vec<Vec<Vec<f64>>>) -> Result<Self> {
        let num_pages = pages.len();
        let mut shape = vec![num_pages, 0, 0];
        let mut data = Vec::new();
        for (p, page) in pages.into_iter().enumerate() {
            let m = Block::matrix(page)?;
            if p == 0 {
                shape[1] = m.shape[0];
                shape[2] = m.shape[1];
            } else if m.shape[..] != shape[1..] {
                return Err(RuntimeError::Range(format!(
                    "page {} has shape {:?}, expected {:?}",
                    p,
                    m.shape,
                    &shape[1..]
                )));
            }
            data.extend(m.data);
        }
        Ok(Self { shape, data })
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value of a rank-0 block
    pub fn as_scalar(&self) -> Option<f64> {
        if self.rank() == 0 {
            self.data.first().copied()
        } else {
            None
        }
    }

    /// Row `i` of a matrix
    pub fn row(&self, i: usize) -> &[f64] {
        let cols = self.shape[1];
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Row-major strides for the current shape
    pub fn strides(&self) -> Vec<usize> {
        strides_of(&self.shape)
    }

    /// Owned copy of the hyper-rectangle `[start, stop)` along every axis
    pub fn sub_block(&self, start: &[usize], stop: &[usize]) -> Result<Block> {
        let rank = self.rank();
        if start.len() != rank || stop.len() != rank {
            return Err(RuntimeError::Range(format!(
                "sub-block coordinates must have {} components, got {} and {}",
                rank,
                start.len(),
                stop.len()
            )));
        }
        for axis in 0..rank {
            if start[axis] > stop[axis] || stop[axis] > self.shape[axis] {
                return Err(RuntimeError::Range(format!(
                    "axis {}: window [{}, {}) outside extent {}",
                    axis, start[axis], stop[axis], self.shape[axis]
                )));
            }
        }

        let shape: Vec<usize> = (0..rank).map(|a| stop[a] - start[a]).collect();
        let total: usize = shape.iter().product();
        let src_strides = self.strides();
        let mut data = Vec::with_capacity(total);
        let mut index = vec![0usize; rank];
        for _ in 0..total {
            let offset: usize = (0..rank)
                .map(|a| (start[a] + index[a]) * src_strides[a])
                .sum();
            data.push(self.data[offset]);
            advance(&mut index, &shape);
        }
        Ok(Block { shape, data })
    }

    /// Owned copy of rows `[start, stop)` of a matrix, all columns
    pub fn rows(&self, start: usize, stop: usize) -> Result<Block> {
        if self.rank() != 2 {
            return Err(RuntimeError::Range(format!(
                "row window requires a matrix, got rank {}",
                self.rank()
            )));
        }
        self.sub_block(&[start, 0], &[stop, self.shape[1]])
    }

    /// Concatenate blocks of equal rank along `axis`
    ///
    /// All extents other than `axis` must agree.
    pub fn concat(blocks: &[Block], axis: usize) -> Result<Block> {
        let first = blocks
            .first()
            .ok_or_else(|| RuntimeError::Range("nothing to concatenate".into()))?;
        let rank = first.rank();
        if axis >= rank {
            return Err(RuntimeError::Range(format!(
                "cannot concatenate rank-{} blocks along axis {}",
                rank, axis
            )));
        }
        for b in blocks {
            let compatible = b.rank() == rank
                && (0..rank).all(|a| a == axis || b.shape[a] == first.shape[a]);
            if !compatible {
                return Err(RuntimeError::Range(format!(
                    "shape {:?} incompatible with {:?} along axis {}",
                    b.shape, first.shape, axis
                )));
            }
        }

        let mut shape = first.shape.clone();
        shape[axis] = blocks.iter().map(|b| b.shape[axis]).sum();

        // Each block contributes contiguous runs of `shape[axis..]` elements
        // per outer index.
        let outer: usize = first.shape[..axis].iter().product();
        let inner: usize = first.shape[axis + 1..].iter().product();
        let mut data = Vec::with_capacity(shape.iter().product());
        for o in 0..outer {
            for b in blocks {
                let run = b.shape[axis] * inner;
                data.extend_from_slice(&b.data[o * run..(o + 1) * run]);
            }
        }
        Ok(Block { shape, data })
    }
}

pub(crate) fn strides_of(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for a in (0..shape.len().saturating_sub(1)).rev() {
        strides[a] = strides[a + 1] * shape[a + 1];
    }
    strides
}

/// Advance a row-major multi-index by one element
pub(crate) fn advance(index: &mut [usize], shape: &[usize]) {
    for a in (0..shape.len()).rev() {
        index[a] += 1;
        if index[a] < shape[a] {
            return;
        }
        index[a] = 0;
    }
}
