//! Translation of protocol error codes into recovery actions.
//!
//! Brokers report routing staleness inside otherwise successful
//! responses: a moved partition leader shows up as an error code on a
//! fetch partition, a moved group coordinator as an error code on an
//! offset commit. [`classify`] scans a response for the first such signal
//! and names the recovery the engine should run. It is total: every
//! response yields either `None` (deliver as-is) or a well-formed
//! `(code, action)` pair.
//!
//! Scan order matters and follows the wire order: topics in received
//! order, partitions in received order, first erroring entry wins.

use crate::error::KafkaCode;
use crate::protocol::*;

/// What the engine should do about an error code found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Routing state for these topics is stale; refresh metadata and
    /// re-route.
    RefreshMetadata(Vec<String>),
    /// Transient broker-side condition; back off and retry unchanged.
    WaitAndRetry,
    /// Deliver the response as-is; a higher layer owns this error
    /// (consumer group membership, producer acks).
    PassThru,
    /// Terminate the request with an escalation error.
    Escalate,
}

/// Classify a response. `None` means no error was found and the response
/// is delivered unchanged.
pub fn classify(response: &ResponseMessage) -> Option<(KafkaCode, RecoveryAction)> {
    match response {
        // The producer layer interprets per-partition produce errors
        // itself (ack handling); the routing core passes them through.
        ResponseMessage::Produce(_) => None,

        ResponseMessage::Metadata(metadata) => scan_metadata(metadata),
        ResponseMessage::Fetch(fetch) => scan_fetch(fetch),
        ResponseMessage::ListOffsets(offsets) => scan_list_offsets(offsets),
        ResponseMessage::OffsetCommit(commit) => scan_offset_commit(commit),
        ResponseMessage::OffsetFetch(fetch) => scan_offset_fetch(fetch),

        ResponseMessage::FindCoordinator(r) => top_level(r.error_code, None),
        ResponseMessage::ListGroups(r) => top_level(r.error_code, None),
        ResponseMessage::ApiVersions(r) => top_level(r.error_code, None),
        ResponseMessage::LeaveGroup(r) => top_level(r.error_code, None),

        ResponseMessage::Heartbeat(r) => group_membership(r.error_code),
        ResponseMessage::SyncGroup(r) => group_membership(r.error_code),
        ResponseMessage::JoinGroup(r) => match r.error_code {
            KafkaCode::UnknownMemberId => {
                Some((KafkaCode::UnknownMemberId, RecoveryAction::PassThru))
            }
            code => top_level(code, None),
        },

        ResponseMessage::DescribeGroups(r) => r
            .groups
            .iter()
            .find(|g| g.error_code != KafkaCode::None)
            .and_then(|g| top_level(g.error_code, None)),
    }
}

/// The top-level rule table.
///
/// `topics` carries topic context when the erroring entry sits inside a
/// per-topic scan. The coordinator codes are deliberately listed twice:
/// with topic context they mean "my routing for these topics is stale"
/// and trigger a refresh; without it, `GroupCoordinatorNotAvailable` is a
/// transient coordinator condition worth waiting out, while
/// `NotCoordinatorForGroup` is handed to the group layer. Topic context
/// takes precedence.
fn top_level(
    code: KafkaCode,
    topics: Option<&[String]>,
) -> Option<(KafkaCode, RecoveryAction)> {
    use KafkaCode::*;
    let action = match code {
        None => return Option::None,

        NotCoordinatorForGroup | GroupCoordinatorNotAvailable if topics.is_some() => {
            RecoveryAction::RefreshMetadata(topics.unwrap_or(&[]).to_vec())
        }

        LeaderNotAvailable | RequestTimedOut | GroupLoadInProgress
        | GroupCoordinatorNotAvailable | NotEnoughReplicas | NotEnoughReplicasAfterAppend => {
            RecoveryAction::WaitAndRetry
        }

        NotCoordinatorForGroup | IllegalGeneration | OffsetOutOfRange | UnknownMemberId => {
            RecoveryAction::PassThru
        }

        // UnknownTopicOrPartition and CorruptMessage land here on
        // purpose: at the top level they mean the request itself is
        // wrong, not that routing went stale.
        _ => RecoveryAction::Escalate,
    };
    Some((code, action))
}

/// Membership codes on Heartbeat/SyncGroup (and the offset APIs) belong
/// to the consumer group protocol, not to routing.
fn group_membership(code: KafkaCode) -> Option<(KafkaCode, RecoveryAction)> {
    use KafkaCode::*;
    match code {
        UnknownMemberId | IllegalGeneration | RebalanceInProgress => {
            Some((code, RecoveryAction::PassThru))
        }
        code => top_level(code, Option::None),
    }
}

/// Leader-staleness codes inside topic scans trigger a refresh of just
/// the topic that reported them.
fn leader_scan(code: KafkaCode, topic: &str) -> Option<(KafkaCode, RecoveryAction)> {
    use KafkaCode::*;
    match code {
        None => Option::None,
        UnknownTopicOrPartition | NotLeaderForPartition => Some((
            code,
            RecoveryAction::RefreshMetadata(vec![topic.to_string()]),
        )),
        code => {
            let topics = [topic.to_string()];
            top_level(code, Some(&topics))
        }
    }
}

fn scan_metadata(metadata: &MetadataResponse) -> Option<(KafkaCode, RecoveryAction)> {
    for topic in &metadata.topics {
        if topic.error_code != KafkaCode::None {
            return leader_scan(topic.error_code, &topic.name);
        }
        for partition in &topic.partitions {
            if partition.error_code != KafkaCode::None {
                return leader_scan(partition.error_code, &topic.name);
            }
        }
    }
    None
}

fn scan_fetch(fetch: &FetchResponse) -> Option<(KafkaCode, RecoveryAction)> {
    for topic in &fetch.responses {
        for partition in &topic.partitions {
            if partition.error_code != KafkaCode::None {
                return leader_scan(partition.error_code, &topic.name);
            }
        }
    }
    None
}

fn scan_list_offsets(offsets: &ListOffsetsResponse) -> Option<(KafkaCode, RecoveryAction)> {
    for topic in &offsets.topics {
        for partition in &topic.partitions {
            if partition.error_code != KafkaCode::None {
                return leader_scan(partition.error_code, &topic.name);
            }
        }
    }
    None
}

/// Offset APIs carry both membership codes (pass-thru) and coordinator
/// codes (refresh, with the response's topics as context).
fn offset_scan(
    code: KafkaCode,
    all_topics: &[String],
) -> Option<(KafkaCode, RecoveryAction)> {
    use KafkaCode::*;
    match code {
        None => Option::None,
        UnknownMemberId | IllegalGeneration | RebalanceInProgress => {
            Some((code, RecoveryAction::PassThru))
        }
        code => top_level(code, Some(all_topics)),
    }
}

fn scan_offset_commit(commit: &OffsetCommitResponse) -> Option<(KafkaCode, RecoveryAction)> {
    let all_topics: Vec<String> = commit.topics.iter().map(|t| t.name.clone()).collect();
    for topic in &commit.topics {
        for partition in &topic.partitions {
            if partition.error_code != KafkaCode::None {
                return offset_scan(partition.error_code, &all_topics);
            }
        }
    }
    None
}

fn scan_offset_fetch(fetch: &OffsetFetchResponse) -> Option<(KafkaCode, RecoveryAction)> {
    let all_topics: Vec<String> = fetch.topics.iter().map(|t| t.name.clone()).collect();
    for topic in &fetch.topics {
        for partition in &topic.partitions {
            if partition.error_code != KafkaCode::None {
                return offset_scan(partition.error_code, &all_topics);
            }
        }
    }
    if fetch.error_code != KafkaCode::None {
        return offset_scan(fetch.error_code, &all_topics);
    }
    None
}
