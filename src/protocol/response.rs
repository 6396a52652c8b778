//! Response data types for incoming Kafka protocol messages.
//!
//! These mirror what brokers send back. Error codes are kept as
//! [`KafkaCode`] values in place, at the nesting level the protocol puts
//! them; the error classifier scans them in received order.

use bytes::Bytes;

use crate::error::KafkaCode;

// ============================================================================
// Metadata
// ============================================================================

/// Metadata response data.
#[derive(Debug, Clone, Default)]
pub struct MetadataResponse {
    pub brokers: Vec<MetadataBroker>,
    pub controller_id: i32,
    pub topics: Vec<TopicMetadata>,
}

#[derive(Debug, Clone)]
pub struct MetadataBroker {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TopicMetadata {
    pub error_code: KafkaCode,
    pub name: String,
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    pub error_code: KafkaCode,
    pub partition_index: i32,
    pub leader_id: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
}

// ============================================================================
// Produce
// ============================================================================

/// Produce response data.
#[derive(Debug, Clone, Default)]
pub struct ProduceResponse {
    pub responses: Vec<ProduceTopicResponse>,
    pub throttle_time_ms: i32,
}

#[derive(Debug, Clone)]
pub struct ProduceTopicResponse {
    pub name: String,
    pub partitions: Vec<ProducePartitionResponse>,
}

#[derive(Debug, Clone, Default)]
pub struct ProducePartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
    pub base_offset: i64,
    pub log_append_time: i64,
}

// ============================================================================
// Fetch
// ============================================================================

/// Fetch response data.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub throttle_time_ms: i32,
    pub responses: Vec<FetchTopicResponse>,
}

#[derive(Debug, Clone)]
pub struct FetchTopicResponse {
    pub name: String,
    pub partitions: Vec<FetchPartitionResponse>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchPartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub aborted_transactions: Vec<AbortedTransaction>,
    pub records: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct AbortedTransaction {
    pub producer_id: i64,
    pub first_offset: i64,
}

// ============================================================================
// ListOffsets
// ============================================================================

/// ListOffsets response data.
#[derive(Debug, Clone, Default)]
pub struct ListOffsetsResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<ListOffsetsTopicResponse>,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsTopicResponse {
    pub name: String,
    pub partitions: Vec<ListOffsetsPartitionResponse>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOffsetsPartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
    pub timestamp: i64,
    pub offset: i64,
}

// ============================================================================
// OffsetCommit / OffsetFetch
// ============================================================================

/// OffsetCommit response data.
#[derive(Debug, Clone, Default)]
pub struct OffsetCommitResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetCommitTopicResponse>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopicResponse {
    pub name: String,
    pub partitions: Vec<OffsetCommitPartitionResponse>,
}

#[derive(Debug, Clone, Default)]
pub struct OffsetCommitPartitionResponse {
    pub partition_index: i32,
    pub error_code: KafkaCode,
}

/// OffsetFetch response data.
#[derive(Debug, Clone, Default)]
pub struct OffsetFetchResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetFetchTopicResponse>,
    pub error_code: KafkaCode,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchTopicResponse {
    pub name: String,
    pub partitions: Vec<OffsetFetchPartitionResponse>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchPartitionResponse {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub metadata: Option<String>,
    pub error_code: KafkaCode,
}

// ============================================================================
// FindCoordinator
// ============================================================================

/// FindCoordinator response data.
#[derive(Debug, Clone, Default)]
pub struct FindCoordinatorResponse {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

// ============================================================================
// Group membership
// ============================================================================

/// JoinGroup response data.
#[derive(Debug, Clone, Default)]
pub struct JoinGroupResponse {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub generation_id: i32,
    pub protocol_name: String,
    pub leader: String,
    pub member_id: String,
    pub members: Vec<JoinGroupMember>,
}

#[derive(Debug, Clone)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub metadata: Bytes,
}

/// Heartbeat response data.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatResponse {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
}

/// LeaveGroup response data.
#[derive(Debug, Clone, Default)]
pub struct LeaveGroupResponse {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
}

/// SyncGroup response data.
#[derive(Debug, Clone, Default)]
pub struct SyncGroupResponse {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub assignment: Bytes,
}

// ============================================================================
// Group administration
// ============================================================================

/// DescribeGroups response data.
#[derive(Debug, Clone, Default)]
pub struct DescribeGroupsResponse {
    pub throttle_time_ms: i32,
    pub groups: Vec<DescribedGroup>,
}

#[derive(Debug, Clone)]
pub struct DescribedGroup {
    pub error_code: KafkaCode,
    pub group_id: String,
    pub group_state: String,
    pub protocol_type: String,
    pub protocol_data: String,
    pub members: Vec<DescribedGroupMember>,
}

#[derive(Debug, Clone)]
pub struct DescribedGroupMember {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub member_metadata: Bytes,
    pub member_assignment: Bytes,
}

/// ListGroups response data.
#[derive(Debug, Clone, Default)]
pub struct ListGroupsResponse {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub groups: Vec<ListedGroup>,
}

#[derive(Debug, Clone)]
pub struct ListedGroup {
    pub group_id: String,
    pub protocol_type: String,
    pub group_state: String,
}

// ============================================================================
// ApiVersions
// ============================================================================

/// ApiVersions response data.
#[derive(Debug, Clone, Default)]
pub struct ApiVersionsResponse {
    pub error_code: KafkaCode,
    pub api_keys: Vec<ApiVersionRange>,
    pub throttle_time_ms: i32,
}

/// Supported version range for one API, as reported by a broker.
#[derive(Debug, Clone, Copy)]
pub struct ApiVersionRange {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}
