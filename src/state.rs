//! Immutable cluster state snapshots.
//!
//! [`ClusterState`] is a value: every mutation is a pure operation that
//! returns a new snapshot with `version + 1`. Snapshots are shared behind
//! `Arc` and mutated only through the [`StateCell`](crate::cell::StateCell),
//! so readers never observe torn state.
//!
//! Map invariants maintained here:
//!
//! - every channel keyed by node id is also keyed by its endpoint,
//! - every broker referenced by a partition, group or bootstrap entry is
//!   either present in the node map or is a bootstrap sentinel,
//! - a partition whose upstream leader id is negative is never mapped
//!   (leaderless partitions are unrouteable),
//! - removing a broker removes everything that points at it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::broker::{Broker, EndPoint};
use crate::chan::SharedChan;
use crate::types::{BrokerId, PartitionId};

/// One snapshot of everything the client knows about the cluster.
#[derive(Clone, Default)]
pub struct ClusterState {
    bootstrap_broker: Option<Broker>,
    brokers_by_node: HashMap<BrokerId, Broker>,
    leader_by_partition: HashMap<PartitionId, Broker>,
    coordinator_by_group: HashMap<String, Broker>,
    chans_by_node: HashMap<BrokerId, SharedChan>,
    chans_by_endpoint: HashMap<EndPoint, SharedChan>,
    version: u64,
}

impl ClusterState {
    /// The empty state a handle starts from.
    pub fn zero() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Monotonic snapshot version. Strictly increases across mutations.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The broker that supplied initial metadata, if bootstrap completed.
    pub fn bootstrap_broker(&self) -> Option<&Broker> {
        self.bootstrap_broker.as_ref()
    }

    /// All brokers known by node id.
    pub fn brokers(&self) -> impl Iterator<Item = &Broker> {
        self.brokers_by_node.values()
    }

    /// Number of known brokers.
    pub fn broker_count(&self) -> usize {
        self.brokers_by_node.len()
    }

    /// Current leader for a topic partition, if known.
    pub fn find_partition_leader(&self, topic: &str, partition: i32) -> Option<&Broker> {
        self.leader_by_partition
            .get(&PartitionId::new(topic, partition))
    }

    /// Coordinator for a consumer group, if known.
    pub fn find_group_coordinator(&self, group_id: &str) -> Option<&Broker> {
        self.coordinator_by_group.get(group_id)
    }

    /// Cached channel for a broker, if one is open.
    pub fn chan_for_node(&self, node_id: BrokerId) -> Option<&SharedChan> {
        self.chans_by_node.get(&node_id)
    }

    /// Cached channel for an endpoint, if one is open.
    pub fn chan_for_endpoint(&self, endpoint: &EndPoint) -> Option<&SharedChan> {
        self.chans_by_endpoint.get(endpoint)
    }

    /// All cached channels.
    pub fn channels(&self) -> impl Iterator<Item = &SharedChan> {
        self.chans_by_endpoint.values()
    }

    /// Projection: topic name to the partition indexes known for it.
    pub fn topic_partitions(&self) -> HashMap<String, Vec<i32>> {
        let mut out: HashMap<String, Vec<i32>> = HashMap::new();
        for id in self.leader_by_partition.keys() {
            out.entry(id.topic().to_string())
                .or_default()
                .push(id.partition());
        }
        for partitions in out.values_mut() {
            partitions.sort_unstable();
        }
        out
    }

    /// Whether every topic in `topics` has at least one known partition.
    pub fn contains_topic_metadata(&self, topics: &[String]) -> bool {
        topics.iter().all(|topic| {
            self.leader_by_partition
                .keys()
                .any(|id| id.topic() == topic)
        })
    }

    fn bump(mut self) -> Self {
        self.version += 1;
        self
    }

    /// Apply a metadata response: rebuild the node map from `brokers` and
    /// apply each `(topic, partition, leader)` triple. A triple with a
    /// negative leader removes the mapping; a leader id that does not
    /// resolve to a known broker is skipped.
    pub fn update_metadata(&self, brokers: Vec<Broker>, leaders: &[(String, i32, i32)]) -> Self {
        let mut next = self.clone();
        next.brokers_by_node = brokers
            .into_iter()
            .map(|broker| (broker.node_id, broker))
            .collect();

        for (topic, partition, leader_id) in leaders {
            let id = PartitionId::new(topic.as_str(), *partition);
            if *leader_id < 0 {
                next.leader_by_partition.remove(&id);
            } else if let Some(leader) = next.brokers_by_node.get(&BrokerId(*leader_id)) {
                next.leader_by_partition.insert(id, leader.clone());
            }
        }
        next.bump()
    }

    /// Set or overwrite the coordinator for a group. The coordinator is
    /// also registered in the node map when it carries a real node id.
    pub fn update_group_coordinator(&self, broker: Broker, group_id: impl Into<String>) -> Self {
        let mut next = self.clone();
        if broker.node_id.is_valid() {
            next.brokers_by_node.insert(broker.node_id, broker.clone());
        }
        next.coordinator_by_group.insert(group_id.into(), broker);
        next.bump()
    }

    /// Record the broker that answered bootstrap.
    pub fn update_bootstrap_broker(&self, broker: Broker) -> Self {
        let mut next = self.clone();
        next.bootstrap_broker = Some(broker);
        next.bump()
    }

    /// Cache an open channel for a broker, keyed by node id and endpoint.
    pub fn add_channel(&self, broker: &Broker, chan: SharedChan) -> Self {
        let mut next = self.clone();
        next.chans_by_endpoint.insert(chan.endpoint(), chan.clone());
        next.chans_by_node.insert(broker.node_id, chan);
        next.bump()
    }

    /// Drop a broker and everything that points at it.
    ///
    /// Returns the evicted channel (if one was cached) so the caller can
    /// close it; closing is I/O and does not belong in a pure operation.
    pub fn remove_broker(&self, broker: &Broker) -> (Self, Option<SharedChan>) {
        let mut next = self.clone();
        next.brokers_by_node.remove(&broker.node_id);
        next.leader_by_partition.retain(|_, b| b != broker);
        next.coordinator_by_group.retain(|_, b| b != broker);
        let chan = next.chans_by_node.remove(&broker.node_id);
        if let Some(chan) = &chan {
            next.chans_by_endpoint.remove(&chan.endpoint());
        }
        if next.bootstrap_broker.as_ref() == Some(broker) {
            next.bootstrap_broker = None;
        }
        (next.bump(), chan)
    }
}

impl fmt::Debug for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterState")
            .field("version", &self.version)
            .field("bootstrap_broker", &self.bootstrap_broker)
            .field("brokers", &self.brokers_by_node.len())
            .field("partitions", &self.leader_by_partition.len())
            .field("groups", &self.coordinator_by_group.len())
            .field("channels", &self.chans_by_endpoint.len())
            .finish()
    }
}
