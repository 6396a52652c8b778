//! End-to-end routing and recovery scenarios against a mock cluster.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use common::*;
use kavka::chan::ChanError;
use kavka::client::KafkaClient;
use kavka::config::ClientConfig;
use kavka::error::{Error, KafkaCode};
use kavka::protocol::*;
use kavka::retry::RetryPolicy;

fn test_config(seed_port: u16, request_attempts: u32) -> ClientConfig {
    ClientConfig::new([format!("127.0.0.1:{seed_port}")])
        .unwrap()
        .with_auto_api_versions(false)
        .with_request_retry(RetryPolicy::constant_bounded_ms(5, request_attempts))
        .with_bootstrap_retry(RetryPolicy::constant_bounded_ms(5, 2))
}

fn produce_success(topic: &str, partition: i32, base_offset: i64) -> ResponseMessage {
    ResponseMessage::Produce(ProduceResponse {
        responses: vec![ProduceTopicResponse {
            name: topic.to_string(),
            partitions: vec![ProducePartitionResponse {
                partition_index: partition,
                error_code: KafkaCode::None,
                base_offset,
                log_append_time: -1,
            }],
        }],
        throttle_time_ms: 0,
    })
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_happy_produce_routes_to_leader() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);

    seed.set_handler(|req| match req {
        RequestMessage::Metadata(_) => Ok(metadata_response(&[(1, 9001)], &[("t", 0, 1)])),
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Produce(_) => Ok(produce_success("t", 0, 42)),
        _ => panic!("unexpected request at broker 1"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();
    client.get_metadata(&["t".to_string()]).await.unwrap();

    let response = client.send(produce_request("t", 0)).await.unwrap();
    let ResponseMessage::Produce(produce) = response else {
        panic!("expected produce response");
    };
    assert_eq!(produce.responses[0].partitions[0].base_offset, 42);

    // Routed in one hop off the primed state: one produce, one metadata.
    assert_eq!(broker1.served(ApiKey::Produce), 1);
    assert_eq!(seed.served(ApiKey::Metadata), 1);
    client.close().await;
}

// ============================================================================
// Leader moved
// ============================================================================

#[tokio::test]
async fn test_leader_moved_refreshes_and_retries() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);
    let broker2 = cluster.add_broker(9002);

    let metadata_calls = Arc::new(AtomicU32::new(0));
    let calls = metadata_calls.clone();
    seed.set_handler(move |req| match req {
        RequestMessage::Metadata(_) => {
            let brokers = [(1, 9001), (2, 9002)];
            // The leader moves to broker 2 after the first answer.
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(metadata_response(&brokers, &[("t", 0, 1)]))
            } else {
                Ok(metadata_response(&brokers, &[("t", 0, 2)]))
            }
        }
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Fetch(_) => {
            Ok(fetch_error("t", 0, KafkaCode::NotLeaderForPartition))
        }
        _ => panic!("unexpected request at broker 1"),
    });
    broker2.set_handler(|req| match req {
        RequestMessage::Fetch(_) => Ok(fetch_success("t", 0)),
        _ => panic!("unexpected request at broker 2"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();
    client.get_metadata(&["t".to_string()]).await.unwrap();

    let response = client.send(fetch_request(&[("t", 0)])).await.unwrap();
    let ResponseMessage::Fetch(fetch) = response else {
        panic!("expected fetch response");
    };
    assert_eq!(fetch.responses[0].partitions[0].error_code, KafkaCode::None);

    // Two fetch attempts total: stale leader, then the new one.
    assert_eq!(broker1.served(ApiKey::Fetch), 1);
    assert_eq!(broker2.served(ApiKey::Fetch), 1);
    assert_eq!(seed.served(ApiKey::Metadata), 2);
    client.close().await;
}

// ============================================================================
// Coordinator discovery
// ============================================================================

#[tokio::test]
async fn test_missing_coordinator_discovered_then_join_succeeds() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker3 = cluster.add_broker(9003);

    seed.set_handler(|req| match req {
        RequestMessage::FindCoordinator(find) => {
            assert_eq!(find.key, "g1");
            Ok(coordinator_response(3, 9003))
        }
        _ => panic!("seed only serves find-coordinator in this test"),
    });
    broker3.set_handler(|req| match req {
        RequestMessage::JoinGroup(_) => Ok(ResponseMessage::JoinGroup(JoinGroupResponse {
            throttle_time_ms: 0,
            error_code: KafkaCode::None,
            generation_id: 1,
            protocol_name: "range".to_string(),
            leader: "m-1".to_string(),
            member_id: "m-1".to_string(),
            members: vec![],
        })),
        _ => panic!("unexpected request at broker 3"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();

    let response = client.send(join_group_request("g1")).await.unwrap();
    let ResponseMessage::JoinGroup(join) = response else {
        panic!("expected join-group response");
    };
    assert_eq!(join.generation_id, 1);
    assert_eq!(join.member_id, "m-1");

    assert_eq!(seed.served(ApiKey::FindCoordinator), 1);
    assert_eq!(broker3.served(ApiKey::JoinGroup), 1);
    client.close().await;
}

// ============================================================================
// Channel drop during fan-out
// ============================================================================

#[tokio::test]
async fn test_fanout_channel_drop_retries_only_affected_subrequest() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);
    let broker2 = cluster.add_broker(9002);
    let broker3 = cluster.add_broker(9003);

    // Broker 2 never accepts a connection.
    broker2.set_online(false);

    let metadata_calls = Arc::new(AtomicU32::new(0));
    let calls = metadata_calls.clone();
    seed.set_handler(move |req| match req {
        RequestMessage::Metadata(_) => {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(metadata_response(
                    &[(1, 9001), (2, 9002)],
                    &[("t", 0, 1), ("t", 1, 2)],
                ))
            } else {
                // Partition 1 moved to broker 3 after broker 2 died.
                Ok(metadata_response(
                    &[(1, 9001), (3, 9003)],
                    &[("t", 0, 1), ("t", 1, 3)],
                ))
            }
        }
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Fetch(_) => Ok(fetch_success("t", 0)),
        _ => panic!("unexpected request at broker 1"),
    });
    broker3.set_handler(|req| match req {
        RequestMessage::Fetch(_) => Ok(fetch_success("t", 1)),
        _ => panic!("unexpected request at broker 3"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();
    client.get_metadata(&["t".to_string()]).await.unwrap();

    let response = client
        .send(fetch_request(&[("t", 0), ("t", 1)]))
        .await
        .unwrap();
    let ResponseMessage::Fetch(fetch) = response else {
        panic!("expected fetch response");
    };

    // Gather preserves the full multiset of (topic, partition) items.
    let mut items: Vec<(String, i32)> = fetch
        .responses
        .iter()
        .flat_map(|t| {
            t.partitions
                .iter()
                .map(|p| (t.name.clone(), p.partition_index))
        })
        .collect();
    items.sort();
    assert_eq!(items, vec![("t".to_string(), 0), ("t".to_string(), 1)]);

    // The healthy sub-request was not re-sent.
    assert_eq!(broker1.served(ApiKey::Fetch), 1);
    assert_eq!(broker3.served(ApiKey::Fetch), 1);
    client.close().await;
}

// ============================================================================
// Bootstrap exhaustion
// ============================================================================

#[tokio::test]
async fn test_bootstrap_exhaustion_after_configured_attempts() {
    let cluster = MockCluster::new();
    // No broker listens on 9999.
    let config = ClientConfig::new(["127.0.0.1:9999"])
        .unwrap()
        .with_auto_api_versions(false)
        .with_bootstrap_retry(RetryPolicy::constant_bounded_ms(10, 2));

    let client = KafkaClient::new(config, cluster.factory());
    let err = client.connect().await.unwrap_err();
    match err {
        Error::BootstrapExhausted { attempts, servers } => {
            assert_eq!(attempts, 2);
            assert_eq!(servers, 1);
        }
        other => panic!("expected bootstrap exhaustion, got {other:?}"),
    }
    assert_eq!(cluster.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_bootstrap_list_fails_without_io() {
    let cluster = MockCluster::new();
    let config = ClientConfig::new(Vec::<String>::new()).unwrap();
    let client = KafkaClient::new(config, cluster.factory());

    let err = client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        Error::BootstrapExhausted {
            attempts: 0,
            servers: 0
        }
    ));
    assert_eq!(cluster.connects.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Thundering herd
// ============================================================================

#[tokio::test]
async fn test_thundering_herd_coalesces_to_one_refresh() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);
    let broker2 = cluster.add_broker(9002);

    let metadata_calls = Arc::new(AtomicU32::new(0));
    let calls = metadata_calls.clone();
    seed.set_handler(move |req| match req {
        RequestMessage::Metadata(_) => {
            let brokers = [(1, 9001), (2, 9002)];
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(metadata_response(&brokers, &[("t", 0, 1)]))
            } else {
                Ok(metadata_response(&brokers, &[("t", 0, 2)]))
            }
        }
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Fetch(_) => {
            Ok(fetch_error("t", 0, KafkaCode::NotLeaderForPartition))
        }
        _ => panic!("unexpected request at broker 1"),
    });
    broker2.set_handler(|req| match req {
        RequestMessage::Fetch(_) => Ok(fetch_success("t", 0)),
        _ => panic!("unexpected request at broker 2"),
    });

    let client = Arc::new(KafkaClient::new(test_config(9000, 10), cluster.factory()));
    client.connect().await.unwrap();
    client.get_metadata(&["t".to_string()]).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.send(fetch_request(&[("t", 0)])).await
        }));
    }
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        let ResponseMessage::Fetch(fetch) = response else {
            panic!("expected fetch response");
        };
        assert_eq!(fetch.responses[0].partitions[0].error_code, KafkaCode::None);
    }

    // One priming fetch plus exactly one coalesced refresh: the queued
    // refreshers observed the already-updated state and skipped.
    assert_eq!(seed.served(ApiKey::Metadata), 2);
    assert_eq!(broker2.served(ApiKey::Fetch), 100);
    client.close().await;
}

// ============================================================================
// Classifier-driven retry outcomes
// ============================================================================

#[tokio::test]
async fn test_wait_and_retry_resends_after_backoff() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);

    seed.set_handler(|req| match req {
        RequestMessage::Metadata(_) => Ok(metadata_response(&[(1, 9001)], &[("t", 0, 1)])),
        _ => panic!("seed only serves metadata in this test"),
    });
    let fetch_calls = Arc::new(AtomicU32::new(0));
    let calls = fetch_calls.clone();
    broker1.set_handler(move |req| match req {
        RequestMessage::Fetch(_) => {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(fetch_error("t", 0, KafkaCode::LeaderNotAvailable))
            } else {
                Ok(fetch_success("t", 0))
            }
        }
        _ => panic!("unexpected request at broker 1"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();

    let response = client.send(fetch_request(&[("t", 0)])).await.unwrap();
    let ResponseMessage::Fetch(fetch) = response else {
        panic!("expected fetch response");
    };
    assert_eq!(fetch.responses[0].partitions[0].error_code, KafkaCode::None);
    assert_eq!(broker1.served(ApiKey::Fetch), 2);
    client.close().await;
}

#[tokio::test]
async fn test_escalation_surfaces_code_request_and_endpoint() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);

    seed.set_handler(|req| match req {
        RequestMessage::Metadata(_) => Ok(metadata_response(&[(1, 9001)], &[("t", 0, 1)])),
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Fetch(_) => Ok(fetch_error("t", 0, KafkaCode::CorruptMessage)),
        _ => panic!("unexpected request at broker 1"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();

    let err = client.send(fetch_request(&[("t", 0)])).await.unwrap_err();
    match err {
        Error::Escalated {
            code,
            api,
            endpoint,
            ..
        } => {
            assert_eq!(code, KafkaCode::CorruptMessage);
            assert_eq!(api, ApiKey::Fetch);
            assert_eq!(endpoint, "127.0.0.1:9001");
        }
        other => panic!("expected escalation, got {other:?}"),
    }
    client.close().await;
}

#[tokio::test]
async fn test_persistent_stale_leader_exhausts_retry_budget() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);

    // Metadata keeps naming broker 1 as leader, and broker 1 keeps
    // disagreeing.
    seed.set_handler(|req| match req {
        RequestMessage::Metadata(_) => Ok(metadata_response(&[(1, 9001)], &[("t", 0, 1)])),
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Fetch(_) => {
            Ok(fetch_error("t", 0, KafkaCode::NotLeaderForPartition))
        }
        _ => panic!("unexpected request at broker 1"),
    });

    let client = KafkaClient::new(test_config(9000, 3), cluster.factory());
    client.connect().await.unwrap();
    client.get_metadata(&["t".to_string()]).await.unwrap();

    let err = client.send(fetch_request(&[("t", 0)])).await.unwrap_err();
    match err {
        Error::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last, Some(KafkaCode::NotLeaderForPartition));
        }
        other => panic!("expected retry exhaustion, got {other:?}"),
    }
    assert_eq!(broker1.served(ApiKey::Fetch), 3);
    client.close().await;
}

#[tokio::test]
async fn test_fatal_decode_error_propagates_without_recovery() {
    let cluster = MockCluster::new();
    let seed = cluster.add_broker(9000);
    let broker1 = cluster.add_broker(9001);

    seed.set_handler(|req| match req {
        RequestMessage::Metadata(_) => Ok(metadata_response(&[(1, 9001)], &[("t", 0, 1)])),
        _ => panic!("seed only serves metadata in this test"),
    });
    broker1.set_handler(|req| match req {
        RequestMessage::Fetch(_) => Err(vec![ChanError::Decode("garbled length".into())]),
        _ => panic!("unexpected request at broker 1"),
    });

    let client = KafkaClient::new(test_config(9000, 10), cluster.factory());
    client.connect().await.unwrap();

    let err = client.send(fetch_request(&[("t", 0)])).await.unwrap_err();
    match err {
        Error::Channel(errors) => {
            assert!(errors[0].is_fatal());
        }
        other => panic!("expected channel error, got {other:?}"),
    }
    // No recovery ran: the decode failure went straight through.
    assert_eq!(broker1.served(ApiKey::Fetch), 1);
    assert_eq!(seed.served(ApiKey::Metadata), 1);
    client.close().await;
}
