//! The wire channel contract.
//!
//! The routing core does not frame, serialize, or correlate messages; it
//! drives an abstract [`Channel`] that owns one broker connection, and a
//! [`ChannelFactory`] that opens channels against resolved endpoints.
//! Implementations wrap a TCP (or TLS) stream plus the wire codec.
//!
//! Channel failure is terminal for that handle: the core evicts the broker,
//! rediscovers, and opens a fresh channel. Decode, framing and
//! out-of-memory failures are different: they indicate a broken peer or a
//! broken process, so they propagate to the caller without recovery.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::broker::EndPoint;
use crate::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use crate::protocol::{RequestMessage, ResponseMessage};

/// Errors a channel can report for a single exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChanError {
    /// The transport failed (connection refused, reset, timed out, ...).
    /// Transient from the cluster's point of view: the broker is evicted
    /// and the request re-routed.
    Transport(io::ErrorKind),
    /// The peer sent bytes that do not decode as the expected response.
    /// Fatal: retrying against a peer we cannot understand is pointless.
    Decode(String),
    /// The peer violated the length-prefixed framing.
    /// Fatal, same reasoning as [`ChanError::Decode`].
    Framing(String),
    /// The process could not allocate for the response.
    /// Fatal: recovery would allocate more.
    OutOfMemory,
}

impl ChanError {
    /// Whether this error must propagate without broker eviction or retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChanError::Decode(_) | ChanError::Framing(_) | ChanError::OutOfMemory
        )
    }
}

impl std::fmt::Display for ChanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChanError::Transport(kind) => write!(f, "transport error: {kind:?}"),
            ChanError::Decode(msg) => write!(f, "response decode error: {msg}"),
            ChanError::Framing(msg) => write!(f, "framing error: {msg}"),
            ChanError::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Result of a single request/response exchange on a channel.
pub type ChanResult<T> = std::result::Result<T, Vec<ChanError>>;

/// A live, bidirectional connection to one broker.
///
/// Channels are opened lazily on first route to a broker, cached in the
/// cluster state, and reused across requests. [`Channel::ensure_open`] is
/// consulted before reuse; a channel that fails it is discarded together
/// with its broker entry.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Send one request and await its response.
    ///
    /// Request/response ordering on the connection is this channel's
    /// responsibility; the core never reorders per-broker sub-requests.
    async fn send(&self, request: RequestMessage) -> ChanResult<ResponseMessage>;

    /// Close the connection. In-flight sends observe terminal transport
    /// errors after this returns.
    async fn close(&self);

    /// The resolved endpoint this channel is connected to.
    fn endpoint(&self) -> EndPoint;

    /// Verify the connection is still usable.
    async fn ensure_open(&self) -> ChanResult<()>;
}

/// Shared handle to a channel, as stored in the cluster state.
pub type SharedChan = Arc<dyn Channel>;

/// Opens channels against resolved endpoints.
///
/// The factory carries everything a new connection needs beyond the
/// endpoint: the per-handle connection id, the client id stamped on every
/// request, the negotiated API version lookup and the TCP knobs.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Open a channel to `endpoint`.
    async fn connect(&self, endpoint: EndPoint) -> ChanResult<SharedChan>;
}

/// TCP options handed opaquely to the channel factory.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Receive buffer size hint, if any.
    pub receive_buffer_bytes: Option<usize>,
    /// Send buffer size hint, if any.
    pub send_buffer_bytes: Option<usize>,
    /// Whether to set TCP_NODELAY.
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            receive_buffer_bytes: None,
            send_buffer_bytes: None,
            nodelay: true,
        }
    }
}
