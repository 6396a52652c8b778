//! Type-safe wrappers for Kafka protocol primitives.
//!
//! These newtypes provide type safety to prevent mixing up different
//! values that share an underlying representation: broker ids are not
//! partition indexes, and a topic-partition pair is a routing key, not an
//! ad-hoc tuple.

use std::fmt;

/// A Kafka broker identifier.
///
/// Broker IDs are 32-bit signed integers that uniquely identify
/// brokers within a Kafka cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BrokerId(pub i32);

impl BrokerId {
    /// Invalid broker ID, used by the protocol to indicate no leader.
    pub const INVALID: Self = BrokerId(-1);

    /// Sentinel id for a bootstrap-only broker entry.
    ///
    /// Distinct from [`BrokerId::INVALID`] so that a bootstrap entry can
    /// never be mistaken for the protocol's "no leader" marker.
    pub const BOOTSTRAP: Self = BrokerId(crate::constants::BOOTSTRAP_NODE_ID);

    /// Create a new broker ID from a raw value.
    #[inline]
    pub const fn new(value: i32) -> Self {
        BrokerId(value)
    }

    /// Get the raw i32 value.
    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Check if this is a valid (non-negative) broker ID.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl From<i32> for BrokerId {
    fn from(value: i32) -> Self {
        BrokerId(value)
    }
}

impl From<BrokerId> for i32 {
    fn from(id: BrokerId) -> Self {
        id.0
    }
}

impl fmt::Display for BrokerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A topic-partition identifier.
///
/// This type provides an ergonomic and type-safe way to identify a
/// specific partition within a topic, replacing the common pattern of
/// using `(String, i32)` tuples. It is the key of the cluster state's
/// leader map.
///
/// # Usage
///
/// ```
/// use kavka::types::PartitionId;
///
/// let partition = PartitionId::new("my-topic", 0);
/// assert_eq!(partition.to_string(), "my-topic-0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionId {
    /// The topic name.
    topic: String,
    /// The partition index.
    partition: i32,
}

impl PartitionId {
    /// Create a new partition identifier.
    #[inline]
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }

    /// Get the topic name.
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Get the partition index.
    #[inline]
    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Convert to a tuple.
    #[inline]
    pub fn as_tuple(&self) -> (&str, i32) {
        (&self.topic, self.partition)
    }

    /// Convert to an owned tuple.
    #[inline]
    pub fn into_tuple(self) -> (String, i32) {
        (self.topic, self.partition)
    }
}

impl From<(String, i32)> for PartitionId {
    fn from((topic, partition): (String, i32)) -> Self {
        Self { topic, partition }
    }
}

impl From<(&str, i32)> for PartitionId {
    fn from((topic, partition): (&str, i32)) -> Self {
        Self {
            topic: topic.to_string(),
            partition,
        }
    }
}

impl From<PartitionId> for (String, i32) {
    fn from(id: PartitionId) -> Self {
        (id.topic, id.partition)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}
