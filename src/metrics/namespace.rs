//! Metric namespaces
//!
//! Every metric is identified by a path of string segments rooted at
//! `/intel/openstack/keystone`. Aggregate metrics add one fixed name,
//! per-tenant metrics add the tenant name and `users_count`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const VENDOR: &str = "intel";
pub const SUBSYSTEM: &str = "openstack";
pub const PLUGIN_NAME: &str = "keystone";
pub const USERS_COUNT: &str = "users_count";

/// Index of the segment that selects the metric (aggregate name or tenant).
const TARGET_SEGMENT: usize = 3;

// =============================================================================
// Aggregate Metrics
// =============================================================================

/// Deployment-wide counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateMetric {
    TotalTenants,
    TotalUsers,
    TotalServices,
    TotalEndpoints,
}

impl AggregateMetric {
    /// All aggregate metrics, in advertisement order.
    pub const ALL: [AggregateMetric; 4] = [
        AggregateMetric::TotalTenants,
        AggregateMetric::TotalUsers,
        AggregateMetric::TotalServices,
        AggregateMetric::TotalEndpoints,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateMetric::TotalTenants => "total_tenants_count",
            AggregateMetric::TotalUsers => "total_users_count",
            AggregateMetric::TotalServices => "total_services_count",
            AggregateMetric::TotalEndpoints => "total_endpoints_count",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for AggregateMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Namespace
// =============================================================================

/// What a namespace asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricTarget<'a> {
    Aggregate(AggregateMetric),
    /// Member count of the named tenant
    TenantUsers(&'a str),
    /// Too short to name a metric
    Unknown,
}

/// Hierarchical metric identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// `/intel/openstack/keystone/{tenant}/users_count`
    pub fn tenant_users(tenant: &str) -> Self {
        Self::new([VENDOR, SUBSYSTEM, PLUGIN_NAME, tenant, USERS_COUNT])
    }

    /// `/intel/openstack/keystone/{metric}`
    pub fn aggregate(metric: AggregateMetric) -> Self {
        Self::new([VENDOR, SUBSYSTEM, PLUGIN_NAME, metric.as_str()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Classify by the fourth segment.
    ///
    /// Anything that is not an aggregate name is taken as a tenant name; it is
    /// not checked against the live tenant list.
    pub fn target(&self) -> MetricTarget<'_> {
        match self.0.get(TARGET_SEGMENT) {
            None => MetricTarget::Unknown,
            Some(segment) => match AggregateMetric::from_name(segment) {
                Some(metric) => MetricTarget::Aggregate(metric),
                None => MetricTarget::TenantUsers(segment),
            },
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.trim_start_matches('/').split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::Config(format!("Invalid metric namespace: {:?}", s)));
        }
        Ok(Self::new(segments))
    }
}
