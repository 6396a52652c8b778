//! Request data types for outgoing Kafka protocol messages.
//!
//! Field names and shapes follow the protocol specification. These are the
//! structs the router inspects (and rebuilds, for topic-routed requests
//! that fan out across brokers).

use bytes::Bytes;

// ============================================================================
// Metadata
// ============================================================================

/// Metadata request data.
///
/// An empty `topics` list asks the broker for metadata on all topics.
#[derive(Debug, Clone, Default)]
pub struct MetadataRequest {
    pub topics: Vec<String>,
}

// ============================================================================
// Produce
// ============================================================================

/// Produce request data.
#[derive(Debug, Clone)]
pub struct ProduceRequest {
    pub transactional_id: Option<String>,
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceTopic>,
}

#[derive(Debug, Clone)]
pub struct ProduceTopic {
    pub name: String,
    pub partitions: Vec<ProducePartition>,
}

#[derive(Debug, Clone)]
pub struct ProducePartition {
    pub partition_index: i32,
    pub records: Bytes,
}

// ============================================================================
// Fetch
// ============================================================================

/// Fetch request data.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub replica_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub topics: Vec<FetchTopic>,
}

#[derive(Debug, Clone)]
pub struct FetchTopic {
    pub name: String,
    pub partitions: Vec<FetchPartition>,
}

#[derive(Debug, Clone)]
pub struct FetchPartition {
    pub partition_index: i32,
    pub fetch_offset: i64,
    pub partition_max_bytes: i32,
}

// ============================================================================
// ListOffsets
// ============================================================================

/// ListOffsets request data.
#[derive(Debug, Clone)]
pub struct ListOffsetsRequest {
    pub replica_id: i32,
    pub isolation_level: i8,
    pub topics: Vec<ListOffsetsTopic>,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsTopic {
    pub name: String,
    pub partitions: Vec<ListOffsetsPartition>,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsPartition {
    pub partition_index: i32,
    pub timestamp: i64,
}

// ============================================================================
// OffsetCommit / OffsetFetch
// ============================================================================

/// OffsetCommit request data.
#[derive(Debug, Clone)]
pub struct OffsetCommitRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub topics: Vec<OffsetCommitTopic>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitPartition {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub committed_metadata: Option<String>,
}

/// OffsetFetch request data.
#[derive(Debug, Clone)]
pub struct OffsetFetchRequest {
    pub group_id: String,
    pub topics: Vec<OffsetFetchTopic>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchTopic {
    pub name: String,
    pub partition_indexes: Vec<i32>,
}

// ============================================================================
// FindCoordinator
// ============================================================================

/// FindCoordinator request data.
///
/// `key_type` 0 asks for a consumer group coordinator.
#[derive(Debug, Clone)]
pub struct FindCoordinatorRequest {
    pub key: String,
    pub key_type: i8,
}

impl FindCoordinatorRequest {
    /// Build a coordinator lookup for a consumer group.
    pub fn for_group(group_id: impl Into<String>) -> Self {
        Self {
            key: group_id.into(),
            key_type: 0,
        }
    }
}

// ============================================================================
// Group membership
// ============================================================================

/// JoinGroup request data.
#[derive(Debug, Clone)]
pub struct JoinGroupRequest {
    pub group_id: String,
    pub session_timeout_ms: i32,
    pub rebalance_timeout_ms: i32,
    pub member_id: String,
    pub protocol_type: String,
    pub protocols: Vec<JoinGroupProtocol>,
}

#[derive(Debug, Clone)]
pub struct JoinGroupProtocol {
    pub name: String,
    pub metadata: Bytes,
}

/// Heartbeat request data.
#[derive(Debug, Clone)]
pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
}

/// LeaveGroup request data.
#[derive(Debug, Clone)]
pub struct LeaveGroupRequest {
    pub group_id: String,
    pub member_id: String,
}

/// SyncGroup request data.
#[derive(Debug, Clone)]
pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub assignments: Vec<SyncGroupAssignment>,
}

#[derive(Debug, Clone)]
pub struct SyncGroupAssignment {
    pub member_id: String,
    pub assignment: Bytes,
}

// ============================================================================
// Group administration
// ============================================================================

/// DescribeGroups request data.
#[derive(Debug, Clone)]
pub struct DescribeGroupsRequest {
    pub group_ids: Vec<String>,
}

/// ListGroups request data.
#[derive(Debug, Clone, Default)]
pub struct ListGroupsRequest {
    pub states_filter: Vec<String>,
}

// ============================================================================
// ApiVersions
// ============================================================================

/// ApiVersions request data. The request body is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiVersionsRequest;
