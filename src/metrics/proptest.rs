//! Property-Based Tests for the Collector
//!
//! Uses proptest to check discovery and collection over arbitrary tenant
//! inventories served by the in-memory identity service.
//!
//! # Test Properties
//!
//! 1. **Discovery Size**: N tenants advertise N + 4 metric types
//! 2. **Membership Coverage**: every advertised tenant metric carries a value
//! 3. **Request Order**: metrics come back in the order they were requested

#![cfg(test)]

use std::sync::Arc;

use proptest::prelude::*;

use super::{AggregateMetric, Collector, MetricTarget};
use crate::adapters::InMemoryIdentityService;
use crate::config::{ConfigMap, ADMIN_ENDPOINT, ADMIN_PASSWORD, ADMIN_TENANT, ADMIN_USER};
use crate::domain::Tenant;

// =============================================================================
// Property Strategies
// =============================================================================

/// Tenants with distinct names and their member counts.
fn tenants_strategy() -> impl Strategy<Value = Vec<(String, usize)>> {
    prop::collection::btree_map("[a-z][a-z0-9_-]{0,11}", 0usize..50, 0..12)
        .prop_map(|tenants| tenants.into_iter().collect())
}

fn identity(tenants: &[(String, usize)]) -> Arc<InMemoryIdentityService> {
    let identity = tenants.iter().enumerate().fold(
        InMemoryIdentityService::new(),
        |identity, (i, (name, members))| {
            identity.with_tenant(Tenant::new(format!("t-{}", i), name.as_str()), *members)
        },
    );
    Arc::new(identity)
}

fn cfg() -> ConfigMap {
    ConfigMap::new()
        .with(ADMIN_ENDPOINT, "http://keystone:5000/v2.0")
        .with(ADMIN_USER, "admin")
        .with(ADMIN_PASSWORD, "secret")
        .with(ADMIN_TENANT, "admin")
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_metric_types_cover_every_tenant(tenants in tenants_strategy()) {
        let mut collector = Collector::with_host(identity(&tenants), "prop-host");

        let mts = tokio_test::block_on(collector.get_metric_types(&cfg())).unwrap();

        prop_assert_eq!(mts.len(), tenants.len() + AggregateMetric::ALL.len());
        for (name, _) in &tenants {
            prop_assert!(mts
                .iter()
                .any(|mt| mt.namespace.target() == MetricTarget::TenantUsers(name)));
        }
    }

    #[test]
    fn prop_collected_tenant_counts_match_membership(tenants in tenants_strategy()) {
        let mut collector = Collector::with_host(identity(&tenants), "prop-host");

        let metrics = tokio_test::block_on(async {
            let mts = collector.get_metric_types(&cfg()).await?;
            collector.collect_metrics(&mts).await
        })
        .unwrap();

        prop_assert_eq!(metrics.len(), tenants.len() + AggregateMetric::ALL.len());
        for ((name, members), metric) in tenants.iter().zip(&metrics) {
            prop_assert_eq!(metric.namespace.target(), MetricTarget::TenantUsers(name));
            prop_assert_eq!(metric.value, Some(*members as u64));
        }

        let total_tenants = metrics
            .iter()
            .find(|m| m.namespace.target() == MetricTarget::Aggregate(AggregateMetric::TotalTenants))
            .and_then(|m| m.value);
        prop_assert_eq!(total_tenants, Some(tenants.len() as u64));
    }
}
