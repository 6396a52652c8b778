//! API version information for the Kafka protocol.
//!
//! This module centralizes the versions this client can speak per API and
//! the lookup the channel consults when encoding request headers. Before
//! bootstrap the lookup comes from a static support matrix pinned by the
//! configured broker version; when API version negotiation is enabled the
//! handle replaces it with the intersection of our matrix and what the
//! broker reported.
//!
//! # Maintenance Notes
//!
//! The version numbers in `SUPPORTED_VERSIONS` are hardcoded based on the
//! Apache Kafka protocol specification. When raising a `max_version`,
//! make sure the corresponding request/response data structs in
//! `protocol/` cover the new version's fields.

use std::collections::HashMap;
use std::fmt;

use crate::protocol::{ApiKey, ApiVersionRange};

/// A broker software version, e.g. `0.10.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KafkaVersion(pub u16, pub u16, pub u16);

impl KafkaVersion {
    pub const V0_9_0: KafkaVersion = KafkaVersion(0, 9, 0);
    pub const V0_10_0: KafkaVersion = KafkaVersion(0, 10, 0);
    pub const V0_10_1: KafkaVersion = KafkaVersion(0, 10, 1);
    pub const V0_11_0: KafkaVersion = KafkaVersion(0, 11, 0);
}

impl fmt::Display for KafkaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Brokers older than this cannot answer `ApiVersions`; auto negotiation
/// is disabled below it.
pub const AUTO_API_VERSIONS_BASELINE: KafkaVersion = KafkaVersion::V0_10_0;

/// Supported version range for a specific API.
#[derive(Debug, Clone, Copy)]
pub struct SupportedVersion {
    /// The API key.
    pub api_key: ApiKey,
    /// Minimum supported version.
    pub min_version: i16,
    /// Maximum supported version.
    pub max_version: i16,
}

impl SupportedVersion {
    /// Create a new supported version entry.
    pub const fn new(api_key: ApiKey, min_version: i16, max_version: i16) -> Self {
        Self {
            api_key,
            min_version,
            max_version,
        }
    }
}

/// The versions this client implements per API.
///
/// | API | Min | Max |
/// |-----|-----|-----|
/// | Produce | 0 | 2 |
/// | Fetch | 0 | 3 |
/// | ListOffsets | 0 | 1 |
/// | Metadata | 0 | 1 |
/// | OffsetCommit | 0 | 2 |
/// | OffsetFetch | 0 | 1 |
/// | FindCoordinator | 0 | 0 |
/// | JoinGroup | 0 | 1 |
/// | Heartbeat | 0 | 0 |
/// | LeaveGroup | 0 | 0 |
/// | SyncGroup | 0 | 0 |
/// | DescribeGroups | 0 | 0 |
/// | ListGroups | 0 | 0 |
/// | ApiVersions | 0 | 0 |
pub const SUPPORTED_VERSIONS: &[SupportedVersion] = &[
    SupportedVersion::new(ApiKey::Produce, 0, 2),
    SupportedVersion::new(ApiKey::Fetch, 0, 3),
    SupportedVersion::new(ApiKey::ListOffsets, 0, 1),
    SupportedVersion::new(ApiKey::Metadata, 0, 1),
    SupportedVersion::new(ApiKey::OffsetCommit, 0, 2),
    SupportedVersion::new(ApiKey::OffsetFetch, 0, 1),
    SupportedVersion::new(ApiKey::FindCoordinator, 0, 0),
    SupportedVersion::new(ApiKey::JoinGroup, 0, 1),
    SupportedVersion::new(ApiKey::Heartbeat, 0, 0),
    SupportedVersion::new(ApiKey::LeaveGroup, 0, 0),
    SupportedVersion::new(ApiKey::SyncGroup, 0, 0),
    SupportedVersion::new(ApiKey::DescribeGroups, 0, 0),
    SupportedVersion::new(ApiKey::ListGroups, 0, 0),
    SupportedVersion::new(ApiKey::ApiVersions, 0, 0),
];

/// The version to use per API when encoding requests.
#[derive(Debug, Clone)]
pub struct VersionTable {
    by_key: HashMap<i16, i16>,
}

impl VersionTable {
    /// The static table for a configured broker version: newest supported
    /// versions on 0.10.1+, oldest below.
    pub fn default_for(broker_version: KafkaVersion) -> Self {
        let by_key = SUPPORTED_VERSIONS
            .iter()
            .map(|entry| {
                let version = if broker_version >= KafkaVersion::V0_10_1 {
                    entry.max_version
                } else {
                    entry.min_version
                };
                (i16::from(entry.api_key), version)
            })
            .collect();
        Self { by_key }
    }

    /// Intersect our support matrix with what a broker reported.
    ///
    /// APIs the broker did not report keep our minimum version.
    pub fn from_negotiated(ranges: &[ApiVersionRange]) -> Self {
        let reported: HashMap<i16, &ApiVersionRange> =
            ranges.iter().map(|r| (r.api_key, r)).collect();
        let by_key = SUPPORTED_VERSIONS
            .iter()
            .map(|entry| {
                let key = i16::from(entry.api_key);
                let version = match reported.get(&key) {
                    Some(range) => entry.max_version.min(range.max_version),
                    None => entry.min_version,
                };
                (key, version)
            })
            .collect();
        Self { by_key }
    }

    /// The version to encode for an API.
    pub fn api_version(&self, key: ApiKey) -> i16 {
        self.by_key.get(&i16::from(key)).copied().unwrap_or(0)
    }
}
