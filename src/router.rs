//! Pure request routing over a cluster state snapshot.
//!
//! [`route`] maps a typed request to the broker(s) that must receive it,
//! splitting topic-routed requests into per-leader sub-requests. It never
//! performs I/O and never returns an empty success: a request that cannot
//! be routed fails with the [`RouteType`] describing what is missing, and
//! the engine turns that into the matching discovery action.

use std::collections::HashSet;

use crate::broker::Broker;
use crate::protocol::*;
use crate::state::ClusterState;

/// Why a request could not be routed (or, equivalently, which routing
/// table a request depends on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteType {
    /// Needs the bootstrap broker.
    Bootstrap,
    /// Needs partition leaders for these topics.
    Topic(Vec<String>),
    /// Needs the coordinator of this group.
    Group(String),
    /// Needs at least one known broker.
    AllBrokers,
}

/// A routed request: one sub-request per target broker.
pub type Routes = Vec<(RequestMessage, Broker)>;

/// Route a request against a state snapshot.
///
/// Topic-routed requests (Produce, Fetch, ListOffsets) are flattened to
/// per-partition items and regrouped by leader; every other envelope field
/// is preserved on each sub-request. If any partition has no known leader
/// the whole route fails with the set of missing topics.
pub fn route(
    state: &ClusterState,
    request: &RequestMessage,
) -> std::result::Result<Routes, RouteType> {
    match request {
        // Routed through the bootstrap broker.
        RequestMessage::Metadata(_)
        | RequestMessage::FindCoordinator(_)
        | RequestMessage::ApiVersions(_) => match state.bootstrap_broker() {
            Some(broker) => Ok(vec![(request.clone(), broker.clone())]),
            None => Err(RouteType::Bootstrap),
        },

        // Fanned out to every known broker.
        RequestMessage::DescribeGroups(_) | RequestMessage::ListGroups(_) => {
            let routes: Routes = state
                .brokers()
                .map(|broker| (request.clone(), broker.clone()))
                .collect();
            if routes.is_empty() {
                Err(RouteType::AllBrokers)
            } else {
                Ok(routes)
            }
        }

        // Routed to the group coordinator.
        RequestMessage::OffsetCommit(OffsetCommitRequest { group_id, .. })
        | RequestMessage::OffsetFetch(OffsetFetchRequest { group_id, .. })
        | RequestMessage::JoinGroup(JoinGroupRequest { group_id, .. })
        | RequestMessage::SyncGroup(SyncGroupRequest { group_id, .. })
        | RequestMessage::Heartbeat(HeartbeatRequest { group_id, .. })
        | RequestMessage::LeaveGroup(LeaveGroupRequest { group_id, .. }) => {
            match state.find_group_coordinator(group_id) {
                Some(broker) => Ok(vec![(request.clone(), broker.clone())]),
                None => Err(RouteType::Group(group_id.clone())),
            }
        }

        // Partitioned by leader.
        RequestMessage::Fetch(fetch) => route_fetch(state, fetch),
        RequestMessage::ListOffsets(offsets) => route_list_offsets(state, offsets),
        RequestMessage::Produce(produce) => route_produce(state, produce),
    }
}

/// The routing table a request depends on, derived from the request alone.
///
/// Used when a channel fails mid-send: the response never arrived, so the
/// recovery action is inferred from what the request needed routed.
pub fn route_type_of(request: &RequestMessage) -> RouteType {
    match request {
        RequestMessage::Metadata(_)
        | RequestMessage::FindCoordinator(_)
        | RequestMessage::ApiVersions(_) => RouteType::Bootstrap,
        RequestMessage::DescribeGroups(_) | RequestMessage::ListGroups(_) => RouteType::AllBrokers,
        RequestMessage::OffsetCommit(r) => RouteType::Group(r.group_id.clone()),
        RequestMessage::OffsetFetch(r) => RouteType::Group(r.group_id.clone()),
        RequestMessage::JoinGroup(r) => RouteType::Group(r.group_id.clone()),
        RequestMessage::SyncGroup(r) => RouteType::Group(r.group_id.clone()),
        RequestMessage::Heartbeat(r) => RouteType::Group(r.group_id.clone()),
        RequestMessage::LeaveGroup(r) => RouteType::Group(r.group_id.clone()),
        RequestMessage::Fetch(r) => {
            RouteType::Topic(r.topics.iter().map(|t| t.name.clone()).collect())
        }
        RequestMessage::ListOffsets(r) => {
            RouteType::Topic(r.topics.iter().map(|t| t.name.clone()).collect())
        }
        RequestMessage::Produce(r) => {
            RouteType::Topic(r.topics.iter().map(|t| t.name.clone()).collect())
        }
    }
}

/// Accumulates per-broker groupings in first-seen order, so routes (and
/// therefore gather concatenation) are deterministic.
struct LeaderGroups<T> {
    order: Vec<(Broker, Vec<T>)>,
    missing: Vec<String>,
    missing_seen: HashSet<String>,
}

impl<T> LeaderGroups<T> {
    fn new() -> Self {
        Self {
            order: vec![],
            missing: vec![],
            missing_seen: HashSet::new(),
        }
    }

    fn push(&mut self, leader: Option<&Broker>, topic: &str, item: T) {
        match leader {
            Some(broker) => {
                let slot = self
                    .order
                    .iter_mut()
                    .find(|(b, _)| b.node_id == broker.node_id);
                match slot {
                    Some((_, items)) => items.push(item),
                    None => self.order.push((broker.clone(), vec![item])),
                }
            }
            None => {
                if self.missing_seen.insert(topic.to_string()) {
                    self.missing.push(topic.to_string());
                }
            }
        }
    }

    fn finish(self) -> std::result::Result<Vec<(Broker, Vec<T>)>, RouteType> {
        if !self.missing.is_empty() || self.order.is_empty() {
            Err(RouteType::Topic(self.missing))
        } else {
            Ok(self.order)
        }
    }
}

/// Regroup flat `(topic, item)` pairs back into per-topic lists,
/// preserving scan order. Partitions of one topic are contiguous because
/// the scan is topic-major.
fn regroup<T, G>(items: Vec<(String, T)>, make_topic: impl Fn(String, Vec<T>) -> G) -> Vec<G> {
    let mut out: Vec<(String, Vec<T>)> = vec![];
    for (topic, item) in items {
        match out.last_mut() {
            Some((name, list)) if *name == topic => list.push(item),
            _ => out.push((topic, vec![item])),
        }
    }
    out.into_iter()
        .map(|(name, list)| make_topic(name, list))
        .collect()
}

fn route_fetch(
    state: &ClusterState,
    fetch: &FetchRequest,
) -> std::result::Result<Routes, RouteType> {
    let mut groups = LeaderGroups::new();
    for topic in &fetch.topics {
        for partition in &topic.partitions {
            let leader = state.find_partition_leader(&topic.name, partition.partition_index);
            groups.push(leader, &topic.name, (topic.name.clone(), partition.clone()));
        }
    }
    Ok(groups
        .finish()?
        .into_iter()
        .map(|(broker, items)| {
            let sub = FetchRequest {
                replica_id: fetch.replica_id,
                max_wait_ms: fetch.max_wait_ms,
                min_bytes: fetch.min_bytes,
                max_bytes: fetch.max_bytes,
                isolation_level: fetch.isolation_level,
                topics: regroup(items, |name, partitions| FetchTopic { name, partitions }),
            };
            (RequestMessage::Fetch(sub), broker)
        })
        .collect())
}

fn route_list_offsets(
    state: &ClusterState,
    offsets: &ListOffsetsRequest,
) -> std::result::Result<Routes, RouteType> {
    let mut groups = LeaderGroups::new();
    for topic in &offsets.topics {
        for partition in &topic.partitions {
            let leader = state.find_partition_leader(&topic.name, partition.partition_index);
            groups.push(leader, &topic.name, (topic.name.clone(), partition.clone()));
        }
    }
    Ok(groups
        .finish()?
        .into_iter()
        .map(|(broker, items)| {
            let sub = ListOffsetsRequest {
                replica_id: offsets.replica_id,
                isolation_level: offsets.isolation_level,
                topics: regroup(items, |name, partitions| ListOffsetsTopic {
                    name,
                    partitions,
                }),
            };
            (RequestMessage::ListOffsets(sub), broker)
        })
        .collect())
}

fn route_produce(
    state: &ClusterState,
    produce: &ProduceRequest,
) -> std::result::Result<Routes, RouteType> {
    let mut groups = LeaderGroups::new();
    for topic in &produce.topics {
        for partition in &topic.partitions {
            let leader = state.find_partition_leader(&topic.name, partition.partition_index);
            groups.push(leader, &topic.name, (topic.name.clone(), partition.clone()));
        }
    }
    Ok(groups
        .finish()?
        .into_iter()
        .map(|(broker, items)| {
            let sub = ProduceRequest {
                transactional_id: produce.transactional_id.clone(),
                acks: produce.acks,
                timeout_ms: produce.timeout_ms,
                topics: regroup(items, |name, partitions| ProduceTopic { name, partitions }),
            };
            (RequestMessage::Produce(sub), broker)
        })
        .collect())
}
