//! Metrics module
//!
//! Metric namespaces, plugin metadata and the Keystone collector.

mod collector;
pub mod namespace;
pub mod plugin;
mod proptest;

pub use collector::{Collector, Metric, MetricType};
pub use namespace::{AggregateMetric, MetricTarget, Namespace};
pub use plugin::{config_policy, meta, ConfigPolicy, PluginMeta, PluginType};
