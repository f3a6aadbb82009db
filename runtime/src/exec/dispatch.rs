//! Rank and distribution dispatch
//!
//! Primitive families implement up to eight handlers: one per supported rank
//! (0 through 3), each in a local and a distribution-aware flavour. The
//! primary data operand decides which one runs.
//!
//! ```text
//!                 operand 0
//!                     │
//!           rank ∈ 0..=3 ? ──no──▶ UnsupportedRank
//!                     │
//!     distributed && !list axis ?
//!          │                 │
//!         yes                no
//!          ▼                 ▼
//!   distributed(rank)    local(rank)
//! ```

use crate::errors::{Result, RuntimeError};
use crate::value::Value;
use async_trait::async_trait;
use tracing::trace;

/// Supported data ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    R0,
    R1,
    R2,
    R3,
}

impl Rank {
    pub fn from_dims(family: &str, dims: usize) -> Result<Self> {
        match dims {
            0 => Ok(Rank::R0),
            1 => Ok(Rank::R1),
            2 => Ok(Rank::R2),
            3 => Ok(Rank::R3),
            other => Err(RuntimeError::unsupported_rank(family, other)),
        }
    }

    pub fn dims(self) -> usize {
        match self {
            Rank::R0 => 0,
            Rank::R1 => 1,
            Rank::R2 => 2,
            Rank::R3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Local(Rank),
    Distributed(Rank),
}

/// Operand count bounds and which positions may be nil
#[derive(Debug, Clone, Copy)]
pub struct OperandSpec {
    pub min: usize,
    pub max: usize,
    pub optional: &'static [usize],
}

impl OperandSpec {
    fn expected(&self) -> String {
        if self.min == self.max {
            self.min.to_string()
        } else {
            format!("between {} and {}", self.min, self.max)
        }
    }
}

/// Check operand count, then that every non-optional operand is present
pub fn validate_operands(family: &str, operands: &[Value], accepted: &OperandSpec) -> Result<()> {
    if operands.len() < accepted.min || operands.len() > accepted.max {
        return Err(RuntimeError::arity(family, accepted.expected(), operands.len()));
    }
    for (position, operand) in operands.iter().enumerate() {
        if !operand.is_valid() && !accepted.optional.contains(&position) {
            return Err(RuntimeError::invalid_operand(
                family,
                format!("operand {} is required but was not supplied", position + 1),
            ));
        }
    }
    Ok(())
}

/// Pick the handler for `data`
///
/// `plain_nd` forces the local route even for distributed data; reductions
/// over an explicit list of axes take it.
pub fn route(family: &str, data: &Value, plain_nd: bool) -> Result<Route> {
    let dims = data
        .rank()
        .ok_or_else(|| RuntimeError::invalid_operand(family, "data operand must be numeric"))?;
    let rank = Rank::from_dims(family, dims)?;
    let route = if data.has_distribution() && !plain_nd {
        Route::Distributed(rank)
    } else {
        Route::Local(rank)
    };
    trace!(family, ?route, "Routed operands");
    Ok(route)
}

/// The rank-specialized handlers of one primitive family
#[async_trait]
pub trait RankHandlers: Send + Sync {
    async fn local(&self, rank: Rank, operands: Vec<Value>) -> Result<Value>;

    /// Distribution-aware variant; families without one fall back to the
    /// local handler of the same rank.
    async fn distributed(&self, rank: Rank, operands: Vec<Value>) -> Result<Value> {
        self.local(rank, operands).await
    }
}

pub async fn dispatch<H>(handlers: &H, route: Route, operands: Vec<Value>) -> Result<Value>
where
    H: RankHandlers + ?Sized,
{
    match route {
        Route::Local(rank) => handlers.local(rank, operands).await,
        Route::Distributed(rank) => handlers.distributed(rank, operands).await,
    }
}
