//! Broker identity, resolved endpoints, and bootstrap URI parsing.

use std::fmt;
use std::net::IpAddr;

use crate::constants::DEFAULT_BROKER_PORT;
use crate::error::{Error, Result};
use crate::types::BrokerId;

/// A broker node of the cluster.
///
/// Value equality over all three fields: two `Broker`s naming the same
/// node id but different addresses are different brokers (the cluster
/// moved the node), and state operations that remove a broker compare by
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Broker {
    pub node_id: BrokerId,
    pub host: String,
    pub port: u16,
}

impl Broker {
    /// Create a broker record.
    pub fn new(node_id: impl Into<BrokerId>, host: impl Into<String>, port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            host: host.into(),
            port,
        }
    }

    /// Create a bootstrap-only broker entry for a configured address.
    ///
    /// Bootstrap entries carry the [`BrokerId::BOOTSTRAP`] sentinel so
    /// they can never collide with a node id a broker reports.
    pub fn bootstrap(host: impl Into<String>, port: u16) -> Self {
        Self::new(BrokerId::BOOTSTRAP, host, port)
    }

    /// Whether this entry is a bootstrap sentinel rather than a
    /// cluster-assigned node.
    pub fn is_bootstrap(&self) -> bool {
        !self.node_id.is_valid()
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.node_id, self.host, self.port)
    }
}

/// A resolved broker address: IP and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndPoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl EndPoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// A parsed, canonicalized bootstrap server URI.
///
/// Accepted forms are `host`, `host:port`, `kafka://host[:port]` and
/// `tcp://host[:port]`; the canonical rendering always uses the `kafka`
/// scheme and an explicit port (default 9092).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerUri {
    pub host: String,
    pub port: u16,
}

impl BrokerUri {
    /// Parse a bootstrap server URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unknown schemes, malformed ports,
    /// empty or invalid host names.
    pub fn parse(input: &str) -> Result<Self> {
        let rest = match input.split_once("://") {
            Some(("kafka", rest)) | Some(("tcp", rest)) => rest,
            Some((scheme, _)) => {
                return Err(Error::Config(format!(
                    "unsupported scheme '{scheme}' in broker uri '{input}'"
                )));
            }
            None => input,
        };

        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    Error::Config(format!("invalid port '{port}' in broker uri '{input}'"))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_BROKER_PORT),
        };

        if host.is_empty() || !host.chars().all(valid_host_char) {
            return Err(Error::Config(format!(
                "invalid host '{host}' in broker uri '{input}'"
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// The bootstrap broker entry for this URI.
    pub fn to_broker(&self) -> Broker {
        Broker::bootstrap(self.host.clone(), self.port)
    }
}

fn valid_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

impl fmt::Display for BrokerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kafka://{}:{}", self.host, self.port)
    }
}

/// Resolve a broker's host to IPv4 endpoints.
///
/// A host that is already a literal IP address is accepted without a
/// lookup. Otherwise the system resolver is consulted and only IPv4
/// results are kept.
pub async fn resolve_endpoints(host: &str, port: u16) -> Result<Vec<EndPoint>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![EndPoint::new(ip, port)]);
    }

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::Config(format!("dns lookup failed for '{host}': {e}")))?;

    let endpoints: Vec<EndPoint> = addrs
        .filter(|addr| addr.is_ipv4())
        .map(|addr| EndPoint::new(addr.ip(), addr.port()))
        .collect();

    if endpoints.is_empty() {
        return Err(Error::Config(format!("no IPv4 address found for '{host}'")));
    }
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host() {
        let uri = BrokerUri::parse("host").unwrap();
        assert_eq!(uri.host, "host");
        assert_eq!(uri.port, 9092);
    }

    #[test]
    fn test_parse_host_with_port() {
        let uri = BrokerUri::parse("host:123").unwrap();
        assert_eq!(uri.host, "host");
        assert_eq!(uri.port, 123);
    }

    #[test]
    fn test_parse_kafka_scheme() {
        let uri = BrokerUri::parse("kafka://host").unwrap();
        assert_eq!(uri.host, "host");
        assert_eq!(uri.port, 9092);
    }

    #[test]
    fn test_parse_tcp_scheme_with_port() {
        let uri = BrokerUri::parse("tcp://host:9").unwrap();
        assert_eq!(uri.host, "host");
        assert_eq!(uri.port, 9);
    }

    #[test]
    fn test_parse_host_with_dots_and_dashes() {
        let uri = BrokerUri::parse("host-with.dots_and_dash").unwrap();
        assert_eq!(uri.host, "host-with.dots_and_dash");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(BrokerUri::parse("!!!").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        assert!(BrokerUri::parse("http://host:80").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(BrokerUri::parse("host:notaport").is_err());
        assert!(BrokerUri::parse("host:99999").is_err());
    }

    #[test]
    fn test_canonical_display() {
        let uri = BrokerUri::parse("tcp://host:9").unwrap();
        assert_eq!(uri.to_string(), "kafka://host:9");
        let uri = BrokerUri::parse("host").unwrap();
        assert_eq!(uri.to_string(), "kafka://host:9092");
    }

    #[test]
    fn test_bootstrap_broker_sentinel() {
        let broker = BrokerUri::parse("host:1234").unwrap().to_broker();
        assert_eq!(broker.node_id, BrokerId::BOOTSTRAP);
        assert!(broker.is_bootstrap());
        assert_eq!(broker.port, 1234);
    }

    #[test]
    fn test_broker_value_equality() {
        let a = Broker::new(1, "h", 9092);
        let b = Broker::new(1, "h", 9092);
        let c = Broker::new(1, "other", 9092);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_resolve_literal_ip() {
        let eps = resolve_endpoints("127.0.0.1", 9092).await.unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].to_string(), "127.0.0.1:9092");
    }
}
