//! Client configuration.
//!
//! [`ClientConfig`] collects everything a handle needs before it can
//! bootstrap: the seed brokers, the identity stamped on requests, the
//! target broker version, and the retry policies for bootstrap and
//! per-request recovery. Construction validates bootstrap URIs eagerly so
//! a typo fails at configuration time, not mid-recovery.

use uuid::Uuid;

use crate::broker::BrokerUri;
use crate::chan::TcpConfig;
use crate::constants::{
    DEFAULT_BOOTSTRAP_RETRY_ATTEMPTS, DEFAULT_BOOTSTRAP_RETRY_DELAY_MS,
    DEFAULT_REQUEST_RETRY_ATTEMPTS, DEFAULT_REQUEST_RETRY_DELAY_MS,
};
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::versions::KafkaVersion;

/// Configuration for a [`KafkaClient`](crate::client::KafkaClient) handle.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Seed brokers tried in order during bootstrap.
    pub bootstrap_servers: Vec<BrokerUri>,
    /// Opaque client identifier sent on every request.
    pub client_id: String,
    /// Unique per-handle connection id, stamped into logs and handed to
    /// the channel factory.
    pub conn_id: String,
    /// Protocol version of the target brokers.
    pub broker_version: KafkaVersion,
    /// Negotiate API versions after bootstrap. Ignored (treated as off)
    /// for broker versions below the `ApiVersions` baseline.
    pub auto_api_versions: bool,
    /// TCP options passed opaquely to the channel factory.
    pub tcp: TcpConfig,
    /// Policy for bootstrap connection attempts.
    pub bootstrap_retry: RetryPolicy,
    /// Policy for per-request recovery attempts.
    pub request_retry: RetryPolicy,
}

impl ClientConfig {
    /// Build a configuration from bootstrap server URIs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::error::Error::Config) when a URI
    /// does not parse.
    pub fn new<I, S>(bootstrap_servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bootstrap_servers = bootstrap_servers
            .into_iter()
            .map(|uri| BrokerUri::parse(uri.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            bootstrap_servers,
            client_id: "kavka".to_string(),
            conn_id: Uuid::new_v4().to_string(),
            broker_version: KafkaVersion::V0_10_1,
            auto_api_versions: true,
            tcp: TcpConfig::default(),
            bootstrap_retry: RetryPolicy::constant_bounded_ms(
                DEFAULT_BOOTSTRAP_RETRY_DELAY_MS,
                DEFAULT_BOOTSTRAP_RETRY_ATTEMPTS,
            ),
            request_retry: RetryPolicy::constant_bounded_ms(
                DEFAULT_REQUEST_RETRY_DELAY_MS,
                DEFAULT_REQUEST_RETRY_ATTEMPTS,
            ),
        })
    }

    /// Set the client id stamped on every request.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the target broker version.
    pub fn with_broker_version(mut self, version: KafkaVersion) -> Self {
        self.broker_version = version;
        self
    }

    /// Enable or disable API version negotiation.
    pub fn with_auto_api_versions(mut self, enabled: bool) -> Self {
        self.auto_api_versions = enabled;
        self
    }

    /// Set the bootstrap retry policy.
    pub fn with_bootstrap_retry(mut self, policy: RetryPolicy) -> Self {
        self.bootstrap_retry = policy;
        self
    }

    /// Set the per-request retry policy.
    pub fn with_request_retry(mut self, policy: RetryPolicy) -> Self {
        self.request_retry = policy;
        self
    }

    /// Set the TCP options.
    pub fn with_tcp(mut self, tcp: TcpConfig) -> Self {
        self.tcp = tcp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_parses_uris() {
        let config = ClientConfig::new(["kafka://seed-1:9092", "seed-2"]).unwrap();
        assert_eq!(config.bootstrap_servers.len(), 2);
        assert_eq!(config.bootstrap_servers[1].port, 9092);
    }

    #[test]
    fn test_new_rejects_bad_uri() {
        assert!(ClientConfig::new(["!!!"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(["seed"]).unwrap();
        assert_eq!(config.broker_version, KafkaVersion::V0_10_1);
        assert!(config.auto_api_versions);
        assert_eq!(config.request_retry.max_attempts(), 20);
        assert_eq!(config.bootstrap_retry.max_attempts(), 3);
        // Fresh handles get distinct conn ids.
        let other = ClientConfig::new(["seed"]).unwrap();
        assert_ne!(config.conn_id, other.conn_id);
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new(["seed"])
            .unwrap()
            .with_client_id("my-app")
            .with_broker_version(KafkaVersion::V0_9_0)
            .with_auto_api_versions(false)
            .with_request_retry(RetryPolicy::constant_bounded_ms(100, 5));
        assert_eq!(config.client_id, "my-app");
        assert_eq!(config.broker_version, KafkaVersion::V0_9_0);
        assert!(!config.auto_api_versions);
        assert_eq!(config.request_retry.max_attempts(), 5);
    }
}
