//! Shared mock-cluster harness for integration tests.
//!
//! Brokers are addressed as `127.0.0.1:<port>` so endpoint resolution
//! never touches a real resolver. Each mock broker serves requests
//! through a swappable handler closure and counts what it saw, which is
//! what the recovery tests assert on.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kavka::broker::EndPoint;
use kavka::chan::{ChanError, ChanResult, Channel, ChannelFactory, SharedChan};
use kavka::error::KafkaCode;
use kavka::protocol::*;

pub type Handler = dyn Fn(&RequestMessage) -> ChanResult<ResponseMessage> + Send + Sync;

pub fn ep(port: u16) -> EndPoint {
    EndPoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

/// One scripted broker.
pub struct MockBroker {
    pub endpoint: EndPoint,
    pub online: AtomicBool,
    handler: Mutex<Arc<Handler>>,
    /// Requests served, by API name.
    counts: Mutex<HashMap<&'static str, u32>>,
}

impl MockBroker {
    fn new(port: u16) -> Self {
        Self {
            endpoint: ep(port),
            online: AtomicBool::new(true),
            handler: Mutex::new(Arc::new(|_: &RequestMessage| {
                Err(vec![ChanError::Transport(io::ErrorKind::InvalidInput)])
            })),
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_handler<F>(&self, f: F)
    where
        F: Fn(&RequestMessage) -> ChanResult<ResponseMessage> + Send + Sync + 'static,
    {
        *self.handler.lock().unwrap() = Arc::new(f);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Requests served for one API.
    pub fn served(&self, api: ApiKey) -> u32 {
        *self.counts.lock().unwrap().get(api.as_str()).unwrap_or(&0)
    }

    fn record(&self, api: ApiKey) {
        *self.counts.lock().unwrap().entry(api.as_str()).or_insert(0) += 1;
    }
}

/// The cluster: a registry of mock brokers plus connect accounting.
pub struct MockCluster {
    brokers: Arc<Mutex<HashMap<EndPoint, Arc<MockBroker>>>>,
    pub connects: Arc<AtomicU32>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self {
            brokers: Arc::new(Mutex::new(HashMap::new())),
            connects: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn add_broker(&self, port: u16) -> Arc<MockBroker> {
        let broker = Arc::new(MockBroker::new(port));
        self.brokers
            .lock()
            .unwrap()
            .insert(broker.endpoint, broker.clone());
        broker
    }

    pub fn factory(&self) -> Arc<dyn ChannelFactory> {
        Arc::new(MockFactory {
            brokers: self.brokers.clone(),
            connects: self.connects.clone(),
        })
    }
}

struct MockFactory {
    brokers: Arc<Mutex<HashMap<EndPoint, Arc<MockBroker>>>>,
    connects: Arc<AtomicU32>,
}

#[async_trait]
impl ChannelFactory for MockFactory {
    async fn connect(&self, endpoint: EndPoint) -> ChanResult<SharedChan> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let broker = self.brokers.lock().unwrap().get(&endpoint).cloned();
        match broker {
            Some(broker) if broker.online.load(Ordering::SeqCst) => Ok(Arc::new(MockChan {
                broker,
                closed: AtomicBool::new(false),
            }) as SharedChan),
            _ => Err(vec![ChanError::Transport(io::ErrorKind::ConnectionRefused)]),
        }
    }
}

struct MockChan {
    broker: Arc<MockBroker>,
    closed: AtomicBool,
}

#[async_trait]
impl Channel for MockChan {
    async fn send(&self, request: RequestMessage) -> ChanResult<ResponseMessage> {
        if self.closed.load(Ordering::SeqCst) || !self.broker.online.load(Ordering::SeqCst) {
            return Err(vec![ChanError::Transport(io::ErrorKind::ConnectionReset)]);
        }
        self.broker.record(request.api_key());
        let handler = self.broker.handler.lock().unwrap().clone();
        handler(&request)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn endpoint(&self) -> EndPoint {
        self.broker.endpoint
    }

    async fn ensure_open(&self) -> ChanResult<()> {
        if self.closed.load(Ordering::SeqCst) || !self.broker.online.load(Ordering::SeqCst) {
            Err(vec![ChanError::Transport(io::ErrorKind::NotConnected)])
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Response builders
// ============================================================================

/// A metadata response advertising `brokers` as `(node_id, port)` on
/// localhost and `leaders` as `(topic, partition, leader_node)`.
pub fn metadata_response(brokers: &[(i32, u16)], leaders: &[(&str, i32, i32)]) -> ResponseMessage {
    let mut topics: Vec<TopicMetadata> = vec![];
    for (name, partition, leader) in leaders {
        let partition_meta = PartitionMetadata {
            error_code: KafkaCode::None,
            partition_index: *partition,
            leader_id: *leader,
            replica_nodes: vec![*leader],
            isr_nodes: vec![*leader],
        };
        match topics.iter_mut().find(|t| t.name == *name) {
            Some(topic) => topic.partitions.push(partition_meta),
            None => topics.push(TopicMetadata {
                error_code: KafkaCode::None,
                name: name.to_string(),
                is_internal: false,
                partitions: vec![partition_meta],
            }),
        }
    }
    ResponseMessage::Metadata(MetadataResponse {
        brokers: brokers
            .iter()
            .map(|(node_id, port)| MetadataBroker {
                node_id: *node_id,
                host: "127.0.0.1".to_string(),
                port: *port as i32,
                rack: None,
            })
            .collect(),
        controller_id: brokers.first().map(|(id, _)| *id).unwrap_or(-1),
        topics,
    })
}

pub fn coordinator_response(node_id: i32, port: u16) -> ResponseMessage {
    ResponseMessage::FindCoordinator(FindCoordinatorResponse {
        throttle_time_ms: 0,
        error_code: KafkaCode::None,
        error_message: None,
        node_id,
        host: "127.0.0.1".to_string(),
        port: port as i32,
    })
}

pub fn fetch_success(topic: &str, partition: i32) -> ResponseMessage {
    ResponseMessage::Fetch(FetchResponse {
        throttle_time_ms: 0,
        responses: vec![FetchTopicResponse {
            name: topic.to_string(),
            partitions: vec![FetchPartitionResponse {
                partition_index: partition,
                error_code: KafkaCode::None,
                high_watermark: 100,
                last_stable_offset: 100,
                aborted_transactions: vec![],
                records: None,
            }],
        }],
    })
}

pub fn fetch_error(topic: &str, partition: i32, code: KafkaCode) -> ResponseMessage {
    ResponseMessage::Fetch(FetchResponse {
        throttle_time_ms: 0,
        responses: vec![FetchTopicResponse {
            name: topic.to_string(),
            partitions: vec![FetchPartitionResponse {
                partition_index: partition,
                error_code: code,
                high_watermark: -1,
                last_stable_offset: -1,
                aborted_transactions: vec![],
                records: None,
            }],
        }],
    })
}

// ============================================================================
// Request builders
// ============================================================================

pub fn fetch_request(parts: &[(&str, i32)]) -> RequestMessage {
    let mut topics: Vec<FetchTopic> = vec![];
    for (name, partition) in parts {
        let p = FetchPartition {
            partition_index: *partition,
            fetch_offset: 0,
            partition_max_bytes: 1024 * 1024,
        };
        match topics.last_mut() {
            Some(t) if t.name == *name => t.partitions.push(p),
            _ => topics.push(FetchTopic {
                name: name.to_string(),
                partitions: vec![p],
            }),
        }
    }
    RequestMessage::Fetch(FetchRequest {
        replica_id: -1,
        max_wait_ms: 100,
        min_bytes: 1,
        max_bytes: 16 * 1024 * 1024,
        isolation_level: 0,
        topics,
    })
}

pub fn produce_request(topic: &str, partition: i32) -> RequestMessage {
    RequestMessage::Produce(ProduceRequest {
        transactional_id: None,
        acks: 1,
        timeout_ms: 5000,
        topics: vec![ProduceTopic {
            name: topic.to_string(),
            partitions: vec![ProducePartition {
                partition_index: partition,
                records: bytes::Bytes::from_static(b"records"),
            }],
        }],
    })
}

pub fn join_group_request(group_id: &str) -> RequestMessage {
    RequestMessage::JoinGroup(JoinGroupRequest {
        group_id: group_id.to_string(),
        session_timeout_ms: 30_000,
        rebalance_timeout_ms: 60_000,
        member_id: String::new(),
        protocol_type: "consumer".to_string(),
        protocols: vec![],
    })
}
