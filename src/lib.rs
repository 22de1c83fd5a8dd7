//! Keystone Collector - OpenStack identity metrics for telemetry hosts
//!
//! Authenticates against an OpenStack Keystone identity service and reports
//! count-based metrics: total tenants, users, services and endpoints, plus the
//! number of users in every tenant. A telemetry host drives the collector,
//! asking first which metrics exist and then for their current values.
//!
//! # Architecture
//!
//! ```text
//! Host ──▶ Collector ──▶ IdentityService port ──▶ KeystoneAdapter ──▶ Keystone (v2.0 + v3)
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Identity service adapters implementing domain ports
//! - [`config`] - Host configuration bag and typed Keystone configuration
//! - [`domain`] - Domain value objects and the identity port
//! - [`error`] - Error types
//! - [`metrics`] - Namespaces, plugin metadata and the collector

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use adapters::{InMemoryIdentityService, KeystoneAdapter};
pub use config::{ClientOptions, ConfigMap, ConfigValue, KeystoneConfig};
pub use error::{Error, ErrorKind, Result};
pub use metrics::{Collector, Metric, MetricType, Namespace};
