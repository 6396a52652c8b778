//! Cluster discovery: bootstrap, metadata, group coordinators.
//!
//! Discovery runs inside the state cell's writer slot, which is what
//! collapses concurrent recoveries into one round-trip: queued refreshers
//! whose trigger is already resolved in the committed state skip the
//! fetch entirely. Reentrant paths (a metadata refresh that itself needs
//! to bootstrap) run in critical mode against the local uncommitted
//! state; the outer updater commits the final result.

use std::sync::Arc;

use crate::broker::{resolve_endpoints, Broker};
use crate::engine::{Engine, StateView};
use crate::error::{Error, Result};
use crate::metrics;
use crate::protocol::*;
use crate::retry::RetryState;
use crate::router::RouteType;
use crate::state::ClusterState;

impl Engine {
    /// Run the discovery that resolves a missing route.
    pub(crate) async fn recover(
        &self,
        missing: &RouteType,
        caller_version: u64,
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        match missing {
            RouteType::Bootstrap => self.bootstrap(caller_version, view).await,
            RouteType::Group(group_id) => {
                self.fetch_group_coordinator(group_id, caller_version, view).await
            }
            RouteType::Topic(topics) => self.refresh_metadata(topics, caller_version, view).await,
            RouteType::AllBrokers => self.refresh_metadata(&[], caller_version, view).await,
        }
    }

    /// Walk the configured bootstrap servers until one accepts a
    /// connection, then record it as the bootstrap broker.
    ///
    /// Queued behind another updater that already bootstrapped, this
    /// short-circuits instead of dialing again.
    pub(crate) async fn bootstrap(
        &self,
        caller_version: u64,
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        if view.is_critical() {
            return self.bootstrap_inline(view).await;
        }
        self.cell
            .update_async(|state| async move {
                if state.version() > caller_version && state.bootstrap_broker().is_some() {
                    tracing::debug!(
                        version = state.version(),
                        "bootstrap already completed, skipping"
                    );
                    return Ok(state.as_ref().clone());
                }
                let local = StateView::critical(state);
                let bootstrapped = self.bootstrap_inline(&local).await?;
                Ok(bootstrapped.as_ref().clone())
            })
            .await
    }

    async fn bootstrap_inline(&self, view: &StateView) -> Result<Arc<ClusterState>> {
        let servers = &self.config.bootstrap_servers;
        if servers.is_empty() {
            metrics::BOOTSTRAPS.with_label_values(&["exhausted"]).inc();
            return Err(Error::BootstrapExhausted {
                attempts: 0,
                servers: 0,
            });
        }

        let mut retries = RetryState::new();
        loop {
            for uri in servers {
                let broker = uri.to_broker();
                tracing::debug!(server = %uri, "attempting bootstrap");
                let endpoints = match resolve_endpoints(&broker.host, broker.port).await {
                    Ok(endpoints) => endpoints,
                    Err(e) => {
                        tracing::warn!(server = %uri, error = %e, "bootstrap DNS resolution failed");
                        continue;
                    }
                };
                for endpoint in endpoints {
                    match self.factory.connect(endpoint).await {
                        Ok(chan) => {
                            tracing::info!(server = %uri, endpoint = %endpoint, "bootstrap connected");
                            metrics::CHANNEL_CONNECTS.with_label_values(&["success"]).inc();
                            metrics::ACTIVE_CHANNELS.inc();
                            metrics::BOOTSTRAPS.with_label_values(&["success"]).inc();
                            return view
                                .apply(&self.cell, |s| {
                                    s.add_channel(&broker, chan.clone())
                                        .update_bootstrap_broker(broker.clone())
                                })
                                .await;
                        }
                        Err(errors) => {
                            metrics::CHANNEL_CONNECTS.with_label_values(&["error"]).inc();
                            tracing::warn!(server = %uri, endpoint = %endpoint, ?errors, "bootstrap connect failed");
                        }
                    }
                }
            }
            let next = self.config.bootstrap_retry.await_next_state(retries).await;
            let outcome = if next.is_some() { "attempt" } else { "exhausted" };
            metrics::RETRY_ATTEMPTS
                .with_label_values(&["bootstrap", outcome])
                .inc();
            retries = match next {
                Some(next) => next,
                None => {
                    metrics::BOOTSTRAPS.with_label_values(&["exhausted"]).inc();
                    tracing::error!(
                        servers = servers.len(),
                        attempts = retries.tries(),
                        "bootstrap exhausted"
                    );
                    return Err(Error::BootstrapExhausted {
                        attempts: retries.tries(),
                        servers: servers.len(),
                    });
                }
            };
        }
    }

    /// Fetch metadata for `topics` (empty = all) and fold it into the
    /// state. A queued refresher whose caller already observes the topics
    /// covered by a newer snapshot returns that snapshot untouched.
    pub(crate) async fn refresh_metadata(
        &self,
        topics: &[String],
        caller_version: u64,
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        if view.is_critical() {
            return self.refresh_metadata_inline(topics, view).await;
        }
        self.cell
            .update_async(|state| async move {
                if state.version() > caller_version && state.contains_topic_metadata(topics) {
                    tracing::debug!(
                        ?topics,
                        version = state.version(),
                        "metadata already refreshed, skipping"
                    );
                    return Ok(state.as_ref().clone());
                }
                let local = StateView::critical(state);
                let refreshed = self.refresh_metadata_inline(topics, &local).await?;
                Ok(refreshed.as_ref().clone())
            })
            .await
    }

    async fn refresh_metadata_inline(
        &self,
        topics: &[String],
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        metrics::METADATA_REFRESHES.inc();
        let request = RequestMessage::Metadata(MetadataRequest {
            topics: topics.to_vec(),
        });
        let response = self.route_and_send(request, RetryState::new(), view).await?;
        let metadata = match response {
            ResponseMessage::Metadata(metadata) => metadata,
            other => {
                return Err(Error::UnexpectedResponse {
                    expected: ApiKey::Metadata,
                    got: other.api_key(),
                })
            }
        };
        self.apply_metadata(&metadata, view).await
    }

    async fn apply_metadata(
        &self,
        metadata: &MetadataResponse,
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        let brokers: Vec<Broker> = metadata
            .brokers
            .iter()
            .map(|b| Broker::new(b.node_id, b.host.clone(), b.port as u16))
            .collect();

        let mut leaders = Vec::new();
        for topic in &metadata.topics {
            for partition in &topic.partitions {
                if partition.leader_id < 0 {
                    tracing::warn!(
                        topic = %topic.name,
                        partition = partition.partition_index,
                        "partition is leaderless, dropping from routing"
                    );
                }
                leaders.push((topic.name.clone(), partition.partition_index, partition.leader_id));
            }
        }

        tracing::debug!(
            brokers = brokers.len(),
            partitions = leaders.len(),
            "applying metadata"
        );
        view.apply(&self.cell, move |s| s.update_metadata(brokers, &leaders))
            .await
    }

    /// Look up and record the coordinator for a consumer group.
    ///
    /// Unlike metadata, a queued coordinator refresher never
    /// short-circuits: coordinator moves are cheap to confirm and a stale
    /// entry sends every group request to the wrong broker.
    pub(crate) async fn fetch_group_coordinator(
        &self,
        group_id: &str,
        _caller_version: u64,
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        if view.is_critical() {
            return self.fetch_group_coordinator_inline(group_id, view).await;
        }
        self.cell
            .update_async(|state| async move {
                let local = StateView::critical(state);
                let refreshed = self.fetch_group_coordinator_inline(group_id, &local).await?;
                Ok(refreshed.as_ref().clone())
            })
            .await
    }

    async fn fetch_group_coordinator_inline(
        &self,
        group_id: &str,
        view: &StateView,
    ) -> Result<Arc<ClusterState>> {
        metrics::COORDINATOR_LOOKUPS.inc();
        let request = RequestMessage::FindCoordinator(FindCoordinatorRequest::for_group(group_id));
        let response = self.route_and_send(request, RetryState::new(), view).await?;
        let coordinator = match response {
            ResponseMessage::FindCoordinator(coordinator) => coordinator,
            other => {
                return Err(Error::UnexpectedResponse {
                    expected: ApiKey::FindCoordinator,
                    got: other.api_key(),
                })
            }
        };
        let broker = Broker::new(
            coordinator.node_id,
            coordinator.host.clone(),
            coordinator.port as u16,
        );
        tracing::info!(group = group_id, coordinator = %broker, "group coordinator installed");
        view.apply(&self.cell, |s| s.update_group_coordinator(broker, group_id))
            .await
    }
}
