//! # Kavka
//! Rust-native Kafka client routing and recovery core.
//!
//! This crate is the part of a Kafka client that knows where requests go:
//! given typed protocol requests issued concurrently by higher layers
//! (producer, consumer, admin), it routes each one to the correct
//! broker(s), maintains connections transparently, refreshes stale
//! routing state on error, and retries under a configured policy. Callers
//! see one logical handle; broker topology, reconnection, metadata
//! staleness and coordinator relocation stay internal.
//!
//! # Goals
//! - Easy to understand code
//! - Leverage best in class libraries such as [Tokio](https://tokio.rs/)
//! - Hide cluster topology behind a single typed `send`
//! - Be a building block for full producer/consumer/admin clients
//!
//! ## Architecture
//!
//! The pipeline for every request:
//!
//! 1. **Snapshot**: take the current immutable [`state::ClusterState`].
//! 2. **Route**: [`router::route`] maps the request to (sub-request,
//!    broker) pairs, or names what's missing.
//! 3. **Send**: each sub-request goes over that broker's cached
//!    [`chan::Channel`], opened lazily.
//! 4. **Classify**: [`classify::classify`] scans the response for
//!    routing-invalidation error codes.
//! 5. **Recover**: discovery (bootstrap, metadata, coordinator lookup)
//!    runs through the single-writer [`cell::StateCell`], so concurrent
//!    failures collapse into one refresh.
//! 6. **Retry**: under the configured [`retry::RetryPolicy`].
//!
//! The wire codec is not part of this crate: implement
//! [`chan::Channel`]/[`chan::ChannelFactory`] around your framing layer
//! and hand the factory to [`client::KafkaClient::new`].
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kavka::chan::ChannelFactory;
//! use kavka::client::KafkaClient;
//! use kavka::config::ClientConfig;
//!
//! async fn run(factory: Arc<dyn ChannelFactory>) -> kavka::error::Result<()> {
//!     let config = ClientConfig::new(["kafka://broker-1:9092", "broker-2"])?;
//!     let client = KafkaClient::new(config, factory);
//!     client.connect().await?;
//!     let metadata = client.get_metadata(&["events".to_string()]).await?;
//!     println!("{} topics", metadata.topics.len());
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [Confluence Docs](https://cwiki.apache.org/confluence/display/KAFKA/A+Guide+To+The+Kafka+Protocol)

#![forbid(unsafe_code)]

pub mod broker;
pub mod cell;
pub mod chan;
pub mod classify;
pub mod client;
pub mod config;
pub mod constants;
mod discovery;
mod engine;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod retry;
pub mod router;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod versions;

pub mod prelude {
    //! Main exports for building on the routing core.
    //!
    //! Implement [`Channel`]/[`ChannelFactory`] around your wire codec,
    //! then drive a [`KafkaClient`].

    pub use crate::broker::{Broker, BrokerUri, EndPoint};
    pub use crate::chan::{ChanError, ChanResult, Channel, ChannelFactory, SharedChan, TcpConfig};
    pub use crate::classify::{classify, RecoveryAction};
    pub use crate::client::KafkaClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::protocol::{ApiKey, RequestMessage, ResponseMessage};
    pub use crate::retry::{RetryPolicy, RetryState};
    pub use crate::router::{route, RouteType};
    pub use crate::state::ClusterState;
    pub use crate::types::{BrokerId, PartitionId};
    pub use crate::versions::KafkaVersion;

    pub use bytes;
}
