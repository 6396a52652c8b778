//! The public client handle.
//!
//! [`KafkaClient`] is the single logical connection to a cluster: callers
//! hand it typed requests and get typed responses back, while broker
//! topology, reconnection, metadata staleness and coordinator moves stay
//! hidden behind the engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kavka::client::KafkaClient;
//! use kavka::chan::ChannelFactory;
//! use kavka::config::ClientConfig;
//!
//! async fn example(factory: Arc<dyn ChannelFactory>) -> kavka::error::Result<()> {
//!     let config = ClientConfig::new(["kafka://localhost:9092"])?;
//!     let client = KafkaClient::new(config, factory);
//!     client.connect().await?;
//!     let metadata = client.get_metadata(&[]).await?;
//!     println!("cluster has {} brokers", metadata.brokers.len());
//!     client.close().await;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::chan::ChannelFactory;
use crate::config::ClientConfig;
use crate::engine::{Engine, StateView};
use crate::error::{Error, Result};
use crate::protocol::*;
use crate::versions::{VersionTable, AUTO_API_VERSIONS_BASELINE};

/// A logical connection to a Kafka cluster.
pub struct KafkaClient {
    engine: Arc<Engine>,
    versions: RwLock<VersionTable>,
    shutdown_tx: broadcast::Sender<()>,
}

impl KafkaClient {
    /// Create a handle. No I/O happens until [`KafkaClient::connect`] or
    /// the first [`KafkaClient::send`].
    pub fn new(config: ClientConfig, factory: Arc<dyn ChannelFactory>) -> Self {
        let versions = RwLock::new(VersionTable::default_for(config.broker_version));
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            engine: Arc::new(Engine::new(config, factory)),
            versions,
            shutdown_tx,
        }
    }

    /// Bootstrap against the configured servers and, when enabled and the
    /// broker version supports it, negotiate API versions.
    pub async fn connect(&self) -> Result<()> {
        let caller_version = self.engine.cell.peek().version();
        self.engine
            .bootstrap(caller_version, &StateView::Committed)
            .await?;

        let config = &self.engine.config;
        tracing::info!(
            conn_id = %config.conn_id,
            client_id = %config.client_id,
            "connected to cluster"
        );
        let negotiate =
            config.auto_api_versions && config.broker_version >= AUTO_API_VERSIONS_BASELINE;
        if negotiate {
            let response = self
                .engine
                .send(RequestMessage::ApiVersions(ApiVersionsRequest))
                .await?;
            match response {
                ResponseMessage::ApiVersions(negotiated) => {
                    tracing::info!(
                        apis = negotiated.api_keys.len(),
                        "negotiated api versions"
                    );
                    if let Ok(mut table) = self.versions.write() {
                        *table = VersionTable::from_negotiated(&negotiated.api_keys);
                    }
                }
                other => {
                    return Err(Error::UnexpectedResponse {
                        expected: ApiKey::ApiVersions,
                        got: other.api_key(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Send a request to wherever it must go, recovering transparently
    /// from stale routing, moved coordinators and dropped connections.
    pub async fn send(&self, request: RequestMessage) -> Result<ResponseMessage> {
        self.engine.send(request).await
    }

    /// The protocol version to encode for an API, post-negotiation when
    /// it ran.
    pub fn api_version(&self, key: ApiKey) -> i16 {
        self.versions
            .read()
            .map(|table| table.api_version(key))
            .unwrap_or(0)
    }

    /// Fetch metadata for `topics` (empty = all topics).
    pub async fn get_metadata(&self, topics: &[String]) -> Result<MetadataResponse> {
        let response = self
            .send(RequestMessage::Metadata(MetadataRequest {
                topics: topics.to_vec(),
            }))
            .await?;
        match response {
            ResponseMessage::Metadata(metadata) => Ok(metadata),
            other => Err(Error::UnexpectedResponse {
                expected: ApiKey::Metadata,
                got: other.api_key(),
            }),
        }
    }

    /// Look up the coordinator broker for a consumer group.
    pub async fn get_group_coordinator(&self, group_id: &str) -> Result<FindCoordinatorResponse> {
        let response = self
            .send(RequestMessage::FindCoordinator(
                FindCoordinatorRequest::for_group(group_id),
            ))
            .await?;
        match response {
            ResponseMessage::FindCoordinator(coordinator) => Ok(coordinator),
            other => Err(Error::UnexpectedResponse {
                expected: ApiKey::FindCoordinator,
                got: other.api_key(),
            }),
        }
    }

    /// A receiver that fires when [`KafkaClient::close`] is called.
    /// Auxiliary loops (heartbeats, fetchers) subscribe to this.
    pub fn cancellation(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal cancellation and tear the handle down: all cached channels
    /// close and further sends fail.
    ///
    /// In-flight sends are not aborted; they observe terminal errors from
    /// their closed channels.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(());
        self.engine.cell.dispose().await;
        tracing::info!(conn_id = %self.engine.config.conn_id, "client closed");
    }

    /// Whether [`KafkaClient::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.engine.cell.is_disposed()
    }
}
