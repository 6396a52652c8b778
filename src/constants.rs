//! Centralized protocol and configuration constants.
//!
//! This module consolidates the magic numbers used throughout the kavka
//! client core. Having them in one place makes it easier to:
//!
//! - Understand the protocol constraints
//! - Update values consistently
//! - Document the rationale for each constant
//!
//! # Categories
//!
//! - **Protocol Constants**: Kafka wire protocol identifiers and sentinels
//! - **Bootstrap Constants**: Initial cluster discovery settings
//! - **Retry Constants**: Default retry policy parameters

// =============================================================================
// Protocol Constants (Kafka Wire Protocol)
// =============================================================================

/// Default Kafka broker port, used when a bootstrap URI omits one.
pub const DEFAULT_BROKER_PORT: u16 = 9092;

/// Node id sentinel for bootstrap-only broker entries.
///
/// Real broker assignments are non-negative and `-1` is reserved by the
/// protocol for "no leader", so bootstrap entries use `-2` to avoid any
/// collision with values a broker can return.
pub const BOOTSTRAP_NODE_ID: i32 = -2;

/// Leader id the protocol uses for "this partition currently has no leader".
pub const NO_LEADER_NODE_ID: i32 = -1;

// =============================================================================
// Bootstrap Constants
// =============================================================================

/// Default delay between bootstrap connection attempts, in milliseconds.
pub const DEFAULT_BOOTSTRAP_RETRY_DELAY_MS: u64 = 1000;

/// Default number of bootstrap connection attempts before giving up.
pub const DEFAULT_BOOTSTRAP_RETRY_ATTEMPTS: u32 = 3;

// =============================================================================
// Retry Constants
// =============================================================================

/// Default delay between per-request recovery attempts, in milliseconds.
pub const DEFAULT_REQUEST_RETRY_DELAY_MS: u64 = 1000;

/// Default number of per-request recovery attempts before giving up.
pub const DEFAULT_REQUEST_RETRY_ATTEMPTS: u32 = 20;

/// Default TCP connect timeout, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
