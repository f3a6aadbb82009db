//! Remote invocation interface and request framing
//!
//! A fetch is framed as a target handle, an [`Opcode`] and a CBOR payload.
//! The serving site answers with a CBOR-encoded [`Reply`]. The transport
//! that carries the bytes is an external collaborator behind
//! [`RemoteInvoker`].

use super::partition::PartitionHandle;
use crate::array::Block;
use crate::errors::{Result, RuntimeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Operation selector for partition requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Full copy of the partition; empty payload
    Fetch,
    /// Copy of a hyper-rectangular window; payload is a [`FetchPartRequest`]
    FetchPart,
}

/// Window `[start, stop)` per axis of the target partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPartRequest {
    pub start: Vec<usize>,
    pub stop: Vec<usize>,
}

/// Failure category carried back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCode {
    /// Requested window outside the partition
    Range,
    /// Handle not hosted (retired or never hosted) on the target site
    NotFound,
    /// Payload could not be decoded
    BadRequest,
}

/// Response to a partition request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Partition(Block),
    Failed { code: FailureCode, message: String },
}

impl Reply {
    pub fn failed(code: FailureCode, message: impl Into<String>) -> Self {
        Reply::Failed {
            code,
            message: message.into(),
        }
    }

    /// Turn a reply into the fetched block or the matching runtime error
    ///
    /// Decoded blocks bypass [`Block::new`], so their shape is checked
    /// against their data here.
    pub fn into_result(self) -> Result<Block> {
        match self {
            Reply::Partition(block) => Block::new(block.shape, block.data).map_err(|e| {
                RuntimeError::Serialization(format!("inconsistent partition frame: {}", e))
            }),
            Reply::Failed {
                code: FailureCode::Range,
                message,
            } => Err(RuntimeError::Range(message)),
            Reply::Failed { code, message } => {
                Err(RuntimeError::Transport(format!("{:?}: {}", code, message)))
            }
        }
    }
}

/// Serialize a frame to CBOR bytes
pub fn to_cbor<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf)
        .map_err(|e| RuntimeError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a frame from CBOR bytes
pub fn from_cbor<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| RuntimeError::Serialization(e.to_string()))
}

/// Asynchronous request/response client
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Send `payload` to the partition behind `target`, returning the encoded
    /// [`Reply`]
    async fn invoke(&self, target: PartitionHandle, opcode: Opcode, payload: Vec<u8>)
        -> Result<Vec<u8>>;
}
