//! Wire transports (component G): one flush of buffered bytes to a
//! QuestDB endpoint, over HTTP(S) or raw TCP(S).
//!
//! Both transports are reached through the single [`Transport`] trait so
//! [`crate::sender::Sender`] can drive either without knowing which it
//! holds. An ILP transport has no correlated responses to route back to a
//! caller: `flush` either succeeds or fails for the whole buffer, so there
//! is no request/response multiplexing layer here.

pub mod http;
pub mod socket;

use async_trait::async_trait;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::protocol::ProtocolVersion;

/// One network endpoint capable of accepting a flush of buffered rows.
///
/// A `Transport` owns exactly one connection at a time and is driven by a
/// single [`crate::sender::Sender`]. It is not required to be `Sync`,
/// matching this crate's single-threaded-per-instance concurrency model.
#[async_trait]
pub trait Transport {
    /// Sends every byte currently in `buffer` to the server. On success the
    /// caller clears the buffer; on failure the buffer is left untouched so
    /// the caller can retry or fail the whole batch.
    async fn flush(&mut self, buffer: &Buffer) -> Result<()>;

    /// Begins an HTTP transactional flush for a single table. Transports
    /// that don't support transactions (raw TCP) return
    /// [`Error::unsupported`].
    async fn begin_transaction(&mut self, table: &str) -> Result<()> {
        let _ = table;
        Err(Error::unsupported(
            "transactions are only supported over HTTP(S)",
        ))
    }

    async fn commit_transaction(&mut self) -> Result<()> {
        Err(Error::unsupported(
            "transactions are only supported over HTTP(S)",
        ))
    }

    async fn rollback_transaction(&mut self) -> Result<()> {
        Err(Error::unsupported(
            "transactions are only supported over HTTP(S)",
        ))
    }

    /// Whether the connection backing this transport is still usable, so
    /// the sender can decide to reconnect rather than retry a half-broken
    /// socket.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Queries the protocol versions the currently selected endpoint
    /// supports, for `auto` protocol-version negotiation (component D).
    /// Transports with nothing to negotiate (raw TCP has no capabilities
    /// endpoint) report an empty set, which [`crate::sender::Sender`]
    /// interprets as "fall back to V1".
    async fn discover_protocol_versions(&mut self) -> Result<Vec<ProtocolVersion>> {
        Ok(Vec::new())
    }
}
