//! Per-node evaluation counters
//!
//! Every [`PrimitiveNode`] counts its evaluations and the wall time spent in
//! them. [`write_csv`] dumps the counters of a whole operation graph.

use super::operand::PrimitiveNode;
use crate::errors::Result;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const CSV_HEADER: &str = "primitive_instance,display_name,count,time_ns";

#[derive(Debug, Default)]
pub struct PrimitiveStats {
    count: AtomicU64,
    time_ns: AtomicU64,
}

impl PrimitiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed evaluation
    pub fn record(&self, elapsed: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.time_ns.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Cumulative evaluation time in nanoseconds
    pub fn time_ns(&self) -> u64 {
        self.time_ns.load(Ordering::Relaxed)
    }
}

/// Write one CSV row per node reachable from `root`, root first
pub fn write_csv<W: Write>(root: &PrimitiveNode, out: &mut W) -> Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for node in root.walk() {
        writeln!(
            out,
            "{},{},{},{}",
            node.instance_name(),
            node.family(),
            node.stats().count(),
            node.stats().time_ns()
        )?;
    }
    Ok(())
}
