//! Typed Kafka protocol messages.
//!
//! This module is the message catalogue the routing core works with: one
//! tagged enum for requests ([`RequestMessage`]) and one for responses
//! ([`ResponseMessage`]), plus the per-API data structs. The wire codec is
//! not here; serialization and request/response correlation belong to the
//! channel implementation behind the [`Channel`](crate::chan::Channel)
//! trait. The router and the error classifier dispatch exhaustively over
//! these enums.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

/// API keys for the Kafka protocol operations this client routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    FindCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    ApiVersions = 18,
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        key as i16
    }
}

impl ApiKey {
    /// Returns a static string name for this API key.
    ///
    /// This avoids allocating a new String on every request for metrics.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKey::Produce => "Produce",
            ApiKey::Fetch => "Fetch",
            ApiKey::ListOffsets => "ListOffsets",
            ApiKey::Metadata => "Metadata",
            ApiKey::OffsetCommit => "OffsetCommit",
            ApiKey::OffsetFetch => "OffsetFetch",
            ApiKey::FindCoordinator => "FindCoordinator",
            ApiKey::JoinGroup => "JoinGroup",
            ApiKey::Heartbeat => "Heartbeat",
            ApiKey::LeaveGroup => "LeaveGroup",
            ApiKey::SyncGroup => "SyncGroup",
            ApiKey::DescribeGroups => "DescribeGroups",
            ApiKey::ListGroups => "ListGroups",
            ApiKey::ApiVersions => "ApiVersions",
        }
    }

    /// All API keys this client knows how to route.
    pub const fn all() -> &'static [ApiKey] {
        &[
            ApiKey::Produce,
            ApiKey::Fetch,
            ApiKey::ListOffsets,
            ApiKey::Metadata,
            ApiKey::OffsetCommit,
            ApiKey::OffsetFetch,
            ApiKey::FindCoordinator,
            ApiKey::JoinGroup,
            ApiKey::Heartbeat,
            ApiKey::LeaveGroup,
            ApiKey::SyncGroup,
            ApiKey::DescribeGroups,
            ApiKey::ListGroups,
            ApiKey::ApiVersions,
        ]
    }
}

/// A typed Kafka request, ready for routing.
#[derive(Debug, Clone)]
pub enum RequestMessage {
    Produce(ProduceRequest),
    Fetch(FetchRequest),
    ListOffsets(ListOffsetsRequest),
    Metadata(MetadataRequest),
    OffsetCommit(OffsetCommitRequest),
    OffsetFetch(OffsetFetchRequest),
    FindCoordinator(FindCoordinatorRequest),
    JoinGroup(JoinGroupRequest),
    Heartbeat(HeartbeatRequest),
    LeaveGroup(LeaveGroupRequest),
    SyncGroup(SyncGroupRequest),
    DescribeGroups(DescribeGroupsRequest),
    ListGroups(ListGroupsRequest),
    ApiVersions(ApiVersionsRequest),
}

impl RequestMessage {
    /// The API key of this request.
    pub fn api_key(&self) -> ApiKey {
        match self {
            RequestMessage::Produce(_) => ApiKey::Produce,
            RequestMessage::Fetch(_) => ApiKey::Fetch,
            RequestMessage::ListOffsets(_) => ApiKey::ListOffsets,
            RequestMessage::Metadata(_) => ApiKey::Metadata,
            RequestMessage::OffsetCommit(_) => ApiKey::OffsetCommit,
            RequestMessage::OffsetFetch(_) => ApiKey::OffsetFetch,
            RequestMessage::FindCoordinator(_) => ApiKey::FindCoordinator,
            RequestMessage::JoinGroup(_) => ApiKey::JoinGroup,
            RequestMessage::Heartbeat(_) => ApiKey::Heartbeat,
            RequestMessage::LeaveGroup(_) => ApiKey::LeaveGroup,
            RequestMessage::SyncGroup(_) => ApiKey::SyncGroup,
            RequestMessage::DescribeGroups(_) => ApiKey::DescribeGroups,
            RequestMessage::ListGroups(_) => ApiKey::ListGroups,
            RequestMessage::ApiVersions(_) => ApiKey::ApiVersions,
        }
    }
}

/// A typed Kafka response, as decoded by the channel.
#[derive(Debug, Clone)]
pub enum ResponseMessage {
    Produce(ProduceResponse),
    Fetch(FetchResponse),
    ListOffsets(ListOffsetsResponse),
    Metadata(MetadataResponse),
    OffsetCommit(OffsetCommitResponse),
    OffsetFetch(OffsetFetchResponse),
    FindCoordinator(FindCoordinatorResponse),
    JoinGroup(JoinGroupResponse),
    Heartbeat(HeartbeatResponse),
    LeaveGroup(LeaveGroupResponse),
    SyncGroup(SyncGroupResponse),
    DescribeGroups(DescribeGroupsResponse),
    ListGroups(ListGroupsResponse),
    ApiVersions(ApiVersionsResponse),
}

impl ResponseMessage {
    /// The API key of this response.
    pub fn api_key(&self) -> ApiKey {
        match self {
            ResponseMessage::Produce(_) => ApiKey::Produce,
            ResponseMessage::Fetch(_) => ApiKey::Fetch,
            ResponseMessage::ListOffsets(_) => ApiKey::ListOffsets,
            ResponseMessage::Metadata(_) => ApiKey::Metadata,
            ResponseMessage::OffsetCommit(_) => ApiKey::OffsetCommit,
            ResponseMessage::OffsetFetch(_) => ApiKey::OffsetFetch,
            ResponseMessage::FindCoordinator(_) => ApiKey::FindCoordinator,
            ResponseMessage::JoinGroup(_) => ApiKey::JoinGroup,
            ResponseMessage::Heartbeat(_) => ApiKey::Heartbeat,
            ResponseMessage::LeaveGroup(_) => ApiKey::LeaveGroup,
            ResponseMessage::SyncGroup(_) => ApiKey::SyncGroup,
            ResponseMessage::DescribeGroups(_) => ApiKey::DescribeGroups,
            ResponseMessage::ListGroups(_) => ApiKey::ListGroups,
            ResponseMessage::ApiVersions(_) => ApiKey::ApiVersions,
        }
    }
}
