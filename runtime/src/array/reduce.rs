//! Axis reductions over dense blocks

use super::{advance, strides_of, Block};
use std::collections::BTreeSet;

/// A reduction operation: identity element, accumulation step and an
/// optional finishing step that sees how many elements were combined.
pub trait Statistic: Send + Sync + 'static {
    /// Primitive family name
    const NAME: &'static str;

    fn identity() -> f64;

    fn combine(acc: f64, x: f64) -> f64;

    fn finalize(acc: f64, _count: usize) -> f64 {
        acc
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

#[derive(Debug, Clone, Copy, Default)]
pub struct Prod;

#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

#[derive(Debug, Clone, Copy, Default)]
pub struct Mean;

impl Statistic for Sum {
    const NAME: &'static str = "sum";

    fn identity() -> f64 {
        0.0
    }

    fn combine(acc: f64, x: f64) -> f64 {
        acc + x
    }
}

impl Statistic for Prod {
    const NAME: &'static str = "prod";

    fn identity() -> f64 {
        1.0
    }

    fn combine(acc: f64, x: f64) -> f64 {
        acc * x
    }
}

impl Statistic for Min {
    const NAME: &'static str = "min";

    fn identity() -> f64 {
        f64::INFINITY
    }

    fn combine(acc: f64, x: f64) -> f64 {
        acc.min(x)
    }
}

impl Statistic for Max {
    const NAME: &'static str = "max";

    fn identity() -> f64 {
        f64::NEG_INFINITY
    }

    fn combine(acc: f64, x: f64) -> f64 {
        acc.max(x)
    }
}

impl Statistic for Mean {
    const NAME: &'static str = "mean";

    fn identity() -> f64 {
        0.0
    }

    fn combine(acc: f64, x: f64) -> f64 {
        acc + x
    }

    // `initial` lands in the sum but not in the count
    fn finalize(acc: f64, count: usize) -> f64 {
        acc / count as f64
    }
}

/// Reduce `block` over `axes` with statistic `S`.
///
/// `axes` must already be normalized (each `< rank`); duplicates are
/// ignored. With `keepdims` every reduced axis is kept with extent 1.
/// `initial` seeds every accumulator in place of the identity element.
pub fn reduce<S: Statistic>(
    block: &Block,
    axes: &[usize],
    keepdims: bool,
    initial: Option<f64>,
) -> Block {
    let reduced: BTreeSet<usize> = axes.iter().copied().collect();
    let rank = block.rank();

    let kept_shape: Vec<usize> = (0..rank)
        .map(|a| if reduced.contains(&a) { 1 } else { block.shape[a] })
        .collect();
    let kept_strides = strides_of(&kept_shape);
    let out_len: usize = kept_shape.iter().product();
    let count: usize = reduced.iter().map(|&a| block.shape[a]).product();

    let seed = initial.unwrap_or_else(S::identity);
    let mut acc = vec![seed; out_len];

    let mut index = vec![0usize; rank];
    for &x in &block.data {
        let out: usize = (0..rank)
            .filter(|a| !reduced.contains(a))
            .map(|a| index[a] * kept_strides[a])
            .sum();
        acc[out] = S::combine(acc[out], x);
        advance(&mut index, &block.shape);
    }

    let data = acc.into_iter().map(|v| S::finalize(v, count)).collect();
    let shape = if keepdims {
        kept_shape
    } else {
        (0..rank)
            .filter(|a| !reduced.contains(a))
            .map(|a| block.shape[a])
            .collect()
    };
    Block { shape, data }
}

/// Reduce every axis
pub fn reduce_all<S: Statistic>(block: &Block, keepdims: bool, initial: Option<f64>) -> Block {
    let axes: Vec<usize> = (0..block.rank()).collect();
    reduce::<S>(block, &axes, keepdims, initial)
}
