//! The request engine: route, send, classify, recover, retry.
//!
//! [`Engine::send`] drives a request through the loop at the core of this
//! crate: snapshot the cluster state, route, send each sub-request with
//! recovery, and on any routing-invalidation signal refresh the relevant
//! discovery and go around again under the request retry policy.
//!
//! Recovery can reenter the engine (a metadata refresh is itself a routed
//! request), so every function threads a [`StateView`]: committed mode
//! reads and writes through the state cell, critical mode works against a
//! local uncommitted snapshot while the caller holds the cell's writer
//! slot. Keeping that distinction in a loop variable instead of the call
//! stack is what prevents writer-queue deadlock.

use std::sync::Arc;
use std::time::Instant;

use futures::future::{join_all, BoxFuture};
use tokio::sync::Mutex;

use crate::broker::{resolve_endpoints, Broker};
use crate::cell::StateCell;
use crate::chan::{ChanError, ChannelFactory, SharedChan};
use crate::classify::{classify, RecoveryAction};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::protocol::*;
use crate::retry::RetryState;
use crate::router::{route, route_type_of};
use crate::state::ClusterState;

/// How engine code reads and mutates cluster state.
#[derive(Clone)]
pub(crate) enum StateView {
    /// Snapshots come from the cell, mutations commit through it.
    Committed,
    /// A local, uncommitted state for reentrant discovery. The outer
    /// updater holding the cell's writer slot commits the final value.
    Critical(Arc<Mutex<Arc<ClusterState>>>),
}

impl StateView {
    pub(crate) fn critical(initial: Arc<ClusterState>) -> Self {
        StateView::Critical(Arc::new(Mutex::new(initial)))
    }

    pub(crate) fn is_critical(&self) -> bool {
        matches!(self, StateView::Critical(_))
    }

    pub(crate) async fn snapshot(&self, cell: &StateCell) -> Arc<ClusterState> {
        match self {
            StateView::Committed => cell.peek(),
            StateView::Critical(local) => local.lock().await.clone(),
        }
    }

    pub(crate) async fn apply<F>(&self, cell: &StateCell, f: F) -> Result<Arc<ClusterState>>
    where
        F: FnOnce(&ClusterState) -> ClusterState,
    {
        match self {
            StateView::Committed => cell.update(f).await,
            StateView::Critical(local) => {
                let mut guard = local.lock().await;
                let next = Arc::new(f(&guard));
                *guard = next.clone();
                Ok(next)
            }
        }
    }

    pub(crate) async fn apply_with<F, R>(
        &self,
        cell: &StateCell,
        f: F,
    ) -> Result<(Arc<ClusterState>, R)>
    where
        F: FnOnce(&ClusterState) -> (ClusterState, R),
    {
        match self {
            StateView::Committed => cell.update_with_result(f).await,
            StateView::Critical(local) => {
                let mut guard = local.lock().await;
                let (next, result) = f(&guard);
                let next = Arc::new(next);
                *guard = next.clone();
                Ok((next, result))
            }
        }
    }
}

/// Outcome of caching a freshly opened channel.
enum CacheOutcome {
    /// Someone else cached a channel first; use theirs.
    Existing(SharedChan),
    /// Ours went in; the previously cached channel, if any, must close.
    Ours(Option<SharedChan>),
}

/// The routing core shared by one client handle.
pub(crate) struct Engine {
    pub(crate) config: ClientConfig,
    pub(crate) cell: StateCell,
    pub(crate) factory: Arc<dyn ChannelFactory>,
}

impl Engine {
    pub(crate) fn new(config: ClientConfig, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            config,
            cell: StateCell::new(),
            factory,
        }
    }

    /// Send a request, transparently recovering from stale routing state,
    /// moved coordinators and dropped channels.
    pub(crate) async fn send(&self, request: RequestMessage) -> Result<ResponseMessage> {
        if self.cell.is_disposed() {
            return Err(Error::Disposed);
        }
        let api = request.api_key();
        let start = Instant::now();
        let result = self
            .route_and_send(request, RetryState::new(), &StateView::Committed)
            .await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_request(api.as_str(), status, start.elapsed().as_secs_f64());
        result
    }

    /// Advance the request retry state, recording the outcome.
    async fn next_request_retry(&self, retries: RetryState) -> Option<RetryState> {
        let next = self.config.request_retry.await_next_state(retries).await;
        let outcome = if next.is_some() { "attempt" } else { "exhausted" };
        metrics::RETRY_ATTEMPTS
            .with_label_values(&["request", outcome])
            .inc();
        next
    }

    /// The route/recover loop. Boxed because recovery recurses back into
    /// it through `send_with_recovery`.
    pub(crate) fn route_and_send<'a>(
        &'a self,
        request: RequestMessage,
        retries: RetryState,
        view: &'a StateView,
    ) -> BoxFuture<'a, Result<ResponseMessage>> {
        Box::pin(async move {
            let mut retries = retries;
            loop {
                let state = view.snapshot(&self.cell).await;
                match route(&state, &request) {
                    Ok(mut routes) => {
                        if routes.len() == 1 {
                            let (sub, broker) = routes.remove(0);
                            return self
                                .send_with_recovery(sub, broker, state.version(), retries, view)
                                .await;
                        }
                        let api = request.api_key();
                        let version = state.version();
                        let sends = routes.into_iter().map(|(sub, broker)| {
                            self.send_with_recovery(sub, broker, version, retries, view)
                        });
                        let mut responses = Vec::new();
                        for result in join_all(sends).await {
                            responses.push(result?);
                        }
                        return gather(api, responses);
                    }
                    Err(missing) => {
                        tracing::debug!(
                            route = ?missing,
                            attempt = retries.attempt(),
                            "no route, running discovery"
                        );
                        retries = match self.next_request_retry(retries).await {
                            Some(next) => next,
                            None => {
                                return Err(Error::MissingRoute {
                                    route: missing,
                                    attempts: retries.tries(),
                                })
                            }
                        };
                        self.recover(&missing, state.version(), view).await?;
                    }
                }
            }
        })
    }

    /// Send one sub-request to one broker, classifying the response and
    /// dispatching recovery as needed.
    fn send_with_recovery<'a>(
        &'a self,
        request: RequestMessage,
        broker: Broker,
        routed_version: u64,
        retries: RetryState,
        view: &'a StateView,
    ) -> BoxFuture<'a, Result<ResponseMessage>> {
        Box::pin(async move {
            let chan = match self.channel_for(&broker, view).await {
                Ok(chan) => chan,
                Err(Error::Channel(errors)) => {
                    return self
                        .recover_channel_failure(
                            request,
                            broker,
                            errors,
                            routed_version,
                            retries,
                            view,
                        )
                        .await;
                }
                Err(other) => return Err(other),
            };

            let sent = chan.send(request.clone()).await;
            let response = match sent {
                Ok(response) => response,
                Err(errors) => {
                    return self
                        .recover_channel_failure(
                            request,
                            broker,
                            errors,
                            routed_version,
                            retries,
                            view,
                        )
                        .await;
                }
            };

            match classify(&response) {
                None => Ok(response),
                Some((code, RecoveryAction::PassThru)) => {
                    tracing::debug!(?code, api = ?response.api_key(), "delivering response as-is");
                    Ok(response)
                }
                Some((code, RecoveryAction::Escalate)) => {
                    let endpoint = chan.endpoint().to_string();
                    tracing::error!(?code, broker = %broker, endpoint = %endpoint, "escalating protocol error");
                    Err(Error::Escalated {
                        code,
                        api: request.api_key(),
                        endpoint,
                        request: Box::new(request),
                        response: Box::new(response),
                    })
                }
                Some((code, RecoveryAction::RefreshMetadata(topics))) => {
                    let Some(next) = self.next_request_retry(retries).await else {
                        return Err(Error::RetryExhausted {
                            attempts: retries.tries(),
                            last: Some(code),
                        });
                    };
                    tracing::info!(?code, ?topics, broker = %broker, "routing state stale, refreshing metadata");
                    self.refresh_metadata(&topics, routed_version, view).await?;
                    self.route_and_send(request, next, view).await
                }
                Some((code, RecoveryAction::WaitAndRetry)) => {
                    let Some(next) = self.next_request_retry(retries).await else {
                        return Err(Error::RetryExhausted {
                            attempts: retries.tries(),
                            last: Some(code),
                        });
                    };
                    tracing::debug!(?code, broker = %broker, "transient broker condition, retrying");
                    self.route_and_send(request, next, view).await
                }
            }
        })
    }

    /// A channel failed mid-exchange: evict the broker, rediscover the
    /// routing the request depends on, and re-route.
    async fn recover_channel_failure(
        &self,
        request: RequestMessage,
        broker: Broker,
        errors: Vec<ChanError>,
        routed_version: u64,
        retries: RetryState,
        view: &StateView,
    ) -> Result<ResponseMessage> {
        if errors.iter().any(ChanError::is_fatal) {
            return Err(Error::Channel(errors));
        }
        tracing::warn!(broker = %broker, ?errors, "channel failed, evicting broker");
        metrics::BROKER_EVICTIONS.inc();

        let (_, evicted) = view
            .apply_with(&self.cell, |s| s.remove_broker(&broker))
            .await?;
        if let Some(chan) = evicted {
            metrics::ACTIVE_CHANNELS.dec();
            tokio::spawn(async move { chan.close().await });
        }

        // Discovery runs before the retry budget is consulted; a final
        // failed attempt still commits refreshed routing state.
        let missing = route_type_of(&request);
        self.recover(&missing, routed_version, view).await?;

        let Some(next) = self.next_request_retry(retries).await else {
            tracing::error!(broker = %broker, ?errors, "channel retry budget exhausted");
            return Err(Error::RetryExhausted {
                attempts: retries.tries(),
                last: None,
            });
        };
        self.route_and_send(request, next, view).await
    }

    /// Resolve the channel for a broker, opening one if absent. Cached
    /// channels are verified with `ensure_open` before reuse.
    async fn channel_for(&self, broker: &Broker, view: &StateView) -> Result<SharedChan> {
        let state = view.snapshot(&self.cell).await;
        let mut replace_stale = false;
        if let Some(chan) = state.chan_for_node(broker.node_id) {
            if chan.ensure_open().await.is_ok() {
                return Ok(chan.clone());
            }
            replace_stale = true;
        }

        let endpoints = resolve_endpoints(&broker.host, broker.port)
            .await
            .map_err(|_| {
                Error::Channel(vec![ChanError::Transport(std::io::ErrorKind::NotFound)])
            })?;

        let mut last_errors = vec![ChanError::Transport(
            std::io::ErrorKind::AddrNotAvailable,
        )];
        for endpoint in endpoints {
            match self.factory.connect(endpoint).await {
                Ok(chan) => {
                    metrics::CHANNEL_CONNECTS.with_label_values(&["success"]).inc();
                    let target = broker.clone();
                    let fresh = chan.clone();
                    let (_, outcome) = view
                        .apply_with(&self.cell, move |s| {
                            if !replace_stale {
                                // A concurrent sender may have cached a
                                // channel while we were connecting.
                                if let Some(existing) = s.chan_for_node(target.node_id) {
                                    return (s.clone(), CacheOutcome::Existing(existing.clone()));
                                }
                            }
                            let replaced = s.chan_for_node(target.node_id).cloned();
                            (
                                s.add_channel(&target, fresh.clone()),
                                CacheOutcome::Ours(replaced),
                            )
                        })
                        .await?;
                    return match outcome {
                        CacheOutcome::Existing(existing) => {
                            tokio::spawn(async move { chan.close().await });
                            Ok(existing)
                        }
                        CacheOutcome::Ours(replaced) => {
                            metrics::ACTIVE_CHANNELS.inc();
                            if let Some(stale) = replaced {
                                metrics::ACTIVE_CHANNELS.dec();
                                tokio::spawn(async move { stale.close().await });
                            }
                            Ok(chan)
                        }
                    };
                }
                Err(errors) => {
                    metrics::CHANNEL_CONNECTS.with_label_values(&["error"]).inc();
                    tracing::warn!(broker = %broker, endpoint = %endpoint, ?errors, "connect failed");
                    last_errors = errors;
                }
            }
        }
        Err(Error::Channel(last_errors))
    }
}

/// Reassemble fan-out responses into one. Only APIs whose responses
/// concatenate are supported; everything else must route to one broker.
fn gather(api: ApiKey, mut responses: Vec<ResponseMessage>) -> Result<ResponseMessage> {
    if responses.len() == 1 {
        return Ok(responses.remove(0));
    }
    match api {
        ApiKey::Fetch => {
            let mut throttle_time_ms = 0;
            let mut topics = Vec::new();
            for response in responses {
                match response {
                    ResponseMessage::Fetch(fetch) => {
                        throttle_time_ms = throttle_time_ms.max(fetch.throttle_time_ms);
                        topics.extend(fetch.responses);
                    }
                    other => {
                        return Err(Error::UnexpectedResponse {
                            expected: api,
                            got: other.api_key(),
                        })
                    }
                }
            }
            Ok(ResponseMessage::Fetch(FetchResponse {
                throttle_time_ms,
                responses: topics,
            }))
        }
        ApiKey::ListOffsets => {
            let mut throttle_time_ms = 0;
            let mut topics = Vec::new();
            for response in responses {
                match response {
                    ResponseMessage::ListOffsets(offsets) => {
                        throttle_time_ms = throttle_time_ms.max(offsets.throttle_time_ms);
                        topics.extend(offsets.topics);
                    }
                    other => {
                        return Err(Error::UnexpectedResponse {
                            expected: api,
                            got: other.api_key(),
                        })
                    }
                }
            }
            Ok(ResponseMessage::ListOffsets(ListOffsetsResponse {
                throttle_time_ms,
                topics,
            }))
        }
        ApiKey::ListGroups => {
            let mut throttle_time_ms = 0;
            let mut error_code = crate::error::KafkaCode::None;
            let mut groups = Vec::new();
            for response in responses {
                match response {
                    ResponseMessage::ListGroups(list) => {
                        throttle_time_ms = throttle_time_ms.max(list.throttle_time_ms);
                        if error_code == crate::error::KafkaCode::None {
                            error_code = list.error_code;
                        }
                        groups.extend(list.groups);
                    }
                    other => {
                        return Err(Error::UnexpectedResponse {
                            expected: api,
                            got: other.api_key(),
                        })
                    }
                }
            }
            Ok(ResponseMessage::ListGroups(ListGroupsResponse {
                throttle_time_ms,
                error_code,
                groups,
            }))
        }
        other => Err(Error::UnsupportedFanout(other)),
    }
}
