//! Crate & protocol level errors.
//!
//! This module provides the top-level error types for the kavka client core.
//!
//! # Error Hierarchy
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Protocol Layer
//!
//! - [`KafkaCode`]: Wire protocol error codes carried inside otherwise
//!   successful responses. The error classifier translates these into
//!   recovery actions.
//!
//! ## Client Layer
//!
//! - [`Error`]: Everything the routing core can surface to a caller:
//!   channel failures, missing routes, exhausted retry budgets, failed
//!   bootstrap, and protocol errors the core refuses to absorb
//!   (escalations).
//!
//! Channel-level failures are reported as [`ChanError`] lists by the wire
//! layer; decode, framing and out-of-memory failures are fatal and
//! propagate without triggering recovery.

use std::result;

use num_derive::FromPrimitive;
use thiserror::Error as ThisError;

use crate::chan::ChanError;
use crate::protocol::{ApiKey, RequestMessage, ResponseMessage};
use crate::router::RouteType;

pub type Result<T> = result::Result<T, Error>;

/// Client-level errors surfaced by the routing core.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The wire channel failed while sending a request.
    #[error("channel error: {0:?}")]
    Channel(Vec<ChanError>),

    /// No broker is known for the required route and the retry budget for
    /// rediscovering one is spent.
    #[error("no route to {route:?} after {attempts} attempts")]
    MissingRoute {
        /// The route that could not be resolved.
        route: RouteType,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The per-request retry budget was exhausted while recovering from a
    /// retriable response or channel error.
    #[error("retry budget exhausted after {attempts} attempts (last error: {last:?})")]
    RetryExhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// The last protocol error observed, if any.
        last: Option<KafkaCode>,
    },

    /// Every configured bootstrap server failed across the bootstrap
    /// retry policy.
    #[error("bootstrap exhausted after {attempts} attempts across {servers} server(s)")]
    BootstrapExhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// Number of configured bootstrap servers.
        servers: usize,
    },

    /// A protocol error the core refuses to absorb. Carries the
    /// triggering error code, the request, the response, and the broker
    /// that produced it.
    #[error("broker {endpoint} returned {code:?} for {api:?}")]
    Escalated {
        /// The protocol error code that triggered the escalation.
        code: KafkaCode,
        /// API of the offending exchange.
        api: ApiKey,
        /// Endpoint of the broker that answered.
        endpoint: String,
        /// The request that was sent.
        request: Box<RequestMessage>,
        /// The response that came back.
        response: Box<ResponseMessage>,
    },

    /// A fan-out route produced multiple responses for an API whose
    /// responses cannot be merged.
    #[error("multi-broker fan-out is not supported for {0:?}")]
    UnsupportedFanout(ApiKey),

    /// The channel answered a request with a response of the wrong kind.
    #[error("expected {expected:?} response, got {got:?}")]
    UnexpectedResponse {
        /// API of the request that was sent.
        expected: ApiKey,
        /// API of the response that arrived.
        got: ApiKey,
    },

    /// The handle was closed; no further requests are accepted.
    #[error("client is closed")]
    Disposed,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The protocol error code behind this error, when there is one.
    pub fn kafka_code(&self) -> Option<KafkaCode> {
        match self {
            Error::Escalated { code, .. } => Some(*code),
            Error::RetryExhausted { last, .. } => *last,
            _ => None,
        }
    }
}

/// Various errors reported by a remote Kafka broker.
/// See also [Kafka Errors](http://kafka.apache.org/protocol.html)
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
pub enum KafkaCode {
    /// An unexpected server error
    Unknown = -1,
    #[default]
    None = 0,
    /// The requested offset is outside the range of offsets
    /// maintained by the server for the given topic/partition
    OffsetOutOfRange = 1,
    /// This indicates that a message contents does not match its CRC
    CorruptMessage = 2,
    /// This request is for a topic or partition that does not exist
    /// on this broker.
    UnknownTopicOrPartition = 3,
    /// The message has a negative size
    InvalidMessageSize = 4,
    /// This error is thrown if we are in the middle of a leadership
    /// election and there is currently no leader for this partition
    /// and hence it is unavailable for writes.
    LeaderNotAvailable = 5,
    /// This error is thrown if the client attempts to send messages
    /// to a replica that is not the leader for some partition. It
    /// indicates that the clients metadata is out of date.
    NotLeaderForPartition = 6,
    /// This error is thrown if the request exceeds the user-specified
    /// time limit in the request.
    RequestTimedOut = 7,
    /// This is not a client facing error and is used mostly by tools
    /// when a broker is not alive.
    BrokerNotAvailable = 8,
    /// If replica is expected on a broker, but is not (this can be
    /// safely ignored).
    ReplicaNotAvailable = 9,
    /// The server has a configurable maximum message size to avoid
    /// unbounded memory allocation. This error is thrown if the
    /// client attempt to produce a message larger than this maximum.
    MessageSizeTooLarge = 10,
    /// Internal error code for broker-to-broker communication.
    StaleControllerEpoch = 11,
    /// If you specify a string larger than configured maximum for
    /// offset metadata
    OffsetMetadataTooLarge = 12,
    /// The server disconnected before a response was received.
    NetworkException = 13,
    /// The broker returns this error code for an offset fetch request
    /// if it is still loading offsets (after a leader change for that
    /// offsets topic partition), or in response to group membership
    /// requests (such as heartbeats) when group metadata is being
    /// loaded by the coordinator.
    GroupLoadInProgress = 14,
    /// The broker returns this error code for group coordinator
    /// requests, offset commits, and most group management requests
    /// if the offsets topic has not yet been created, or if the group
    /// coordinator is not active.
    GroupCoordinatorNotAvailable = 15,
    /// The broker returns this error code if it receives an offset
    /// fetch or commit request for a group that it is not a
    /// coordinator for.
    NotCoordinatorForGroup = 16,
    /// For a request which attempts to access an invalid topic
    /// (e.g. one which has an illegal name), or if an attempt is made
    /// to write to an internal topic (such as the consumer offsets
    /// topic).
    InvalidTopic = 17,
    /// If a message batch in a produce request exceeds the maximum
    /// configured segment size.
    RecordListTooLarge = 18,
    /// Returned from a produce request when the number of in-sync
    /// replicas is lower than the configured minimum and requiredAcks is
    /// -1.
    NotEnoughReplicas = 19,
    /// Returned from a produce request when the message was written
    /// to the log, but with fewer in-sync replicas than required.
    NotEnoughReplicasAfterAppend = 20,
    /// Returned from a produce request if the requested requiredAcks is
    /// invalid (anything other than -1, 1, or 0).
    InvalidRequiredAcks = 21,
    /// Returned from group membership requests (such as heartbeats) when
    /// the generation id provided in the request is not the current
    /// generation.
    IllegalGeneration = 22,
    /// Returned in join group when the member provides a protocol type or
    /// set of protocols which is not compatible with the current group.
    InconsistentGroupProtocol = 23,
    /// Returned in join group when the groupId is empty or null.
    InvalidGroupId = 24,
    /// Returned from group requests (offset commits/fetches, heartbeats,
    /// etc) when the memberId is not in the current generation.
    UnknownMemberId = 25,
    /// Return in join group when the requested session timeout is outside
    /// of the allowed range on the broker
    InvalidSessionTimeout = 26,
    /// Returned in heartbeat requests when the coordinator has begun
    /// rebalancing the group. This indicates to the client that it
    /// should rejoin the group.
    RebalanceInProgress = 27,
    /// This error indicates that an offset commit was rejected because of
    /// oversize metadata.
    InvalidCommitOffsetSize = 28,
    /// Returned by the broker when the client is not authorized to access
    /// the requested topic.
    TopicAuthorizationFailed = 29,
    /// Returned by the broker when the client is not authorized to access
    /// a particular groupId.
    GroupAuthorizationFailed = 30,
    /// Returned by the broker when the client is not authorized to use an
    /// inter-broker or administrative API.
    ClusterAuthorizationFailed = 31,
    /// The timestamp of the message is out of acceptable range.
    InvalidTimestamp = 32,
    /// The broker does not support the requested SASL mechanism.
    UnsupportedSaslMechanism = 33,
    /// Request is not valid given the current SASL state.
    IllegalSaslState = 34,
    /// The version of API is not supported.
    UnsupportedVersion = 35,
    /// Topic with this name already exists.
    TopicAlreadyExists = 36,
    /// This is not the correct controller for this cluster.
    NotController = 41,
    /// The message format version on the broker does not support the request.
    UnsupportedForMessageFormat = 43,
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_kafka_code_from_primitive() {
        assert_eq!(KafkaCode::from_i16(-1), Some(KafkaCode::Unknown));
        assert_eq!(KafkaCode::from_i16(0), Some(KafkaCode::None));
        assert_eq!(KafkaCode::from_i16(5), Some(KafkaCode::LeaderNotAvailable));
        assert_eq!(
            KafkaCode::from_i16(6),
            Some(KafkaCode::NotLeaderForPartition)
        );
        assert_eq!(
            KafkaCode::from_i16(16),
            Some(KafkaCode::NotCoordinatorForGroup)
        );
        assert_eq!(KafkaCode::from_i16(25), Some(KafkaCode::UnknownMemberId));
        assert_eq!(
            KafkaCode::from_i16(27),
            Some(KafkaCode::RebalanceInProgress)
        );
    }

    #[test]
    fn test_kafka_code_unknown_value() {
        // Values not in the enum should return None
        assert_eq!(KafkaCode::from_i16(999), None);
        assert_eq!(KafkaCode::from_i16(-100), None);
    }

    #[test]
    fn test_kafka_code_values() {
        assert_eq!(KafkaCode::Unknown as i16, -1);
        assert_eq!(KafkaCode::None as i16, 0);
        assert_eq!(KafkaCode::OffsetOutOfRange as i16, 1);
        assert_eq!(KafkaCode::UnknownTopicOrPartition as i16, 3);
        assert_eq!(KafkaCode::LeaderNotAvailable as i16, 5);
        assert_eq!(KafkaCode::NotLeaderForPartition as i16, 6);
        assert_eq!(KafkaCode::RequestTimedOut as i16, 7);
        assert_eq!(KafkaCode::GroupLoadInProgress as i16, 14);
        assert_eq!(KafkaCode::GroupCoordinatorNotAvailable as i16, 15);
        assert_eq!(KafkaCode::NotCoordinatorForGroup as i16, 16);
        assert_eq!(KafkaCode::NotEnoughReplicas as i16, 19);
        assert_eq!(KafkaCode::IllegalGeneration as i16, 22);
        assert_eq!(KafkaCode::RebalanceInProgress as i16, 27);
    }

    #[test]
    fn test_error_display_missing_route() {
        let err = Error::MissingRoute {
            route: RouteType::Bootstrap,
            attempts: 3,
        };
        let display = format!("{}", err);
        assert!(display.contains("Bootstrap"));
        assert!(display.contains('3'));
    }

    #[test]
    fn test_error_display_bootstrap_exhausted() {
        let err = Error::BootstrapExhausted {
            attempts: 2,
            servers: 1,
        };
        assert!(format!("{}", err).contains("bootstrap exhausted"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::Disposed);
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_kafka_code_accessor() {
        let err = Error::RetryExhausted {
            attempts: 5,
            last: Some(KafkaCode::RequestTimedOut),
        };
        assert_eq!(err.kafka_code(), Some(KafkaCode::RequestTimedOut));
        assert_eq!(Error::Disposed.kafka_code(), None);
    }
}
