//! Keystone Collector
//!
//! Answers the two host queries: which metrics are available, and what their
//! current values are. Owns the identity session and the memoized
//! service/endpoint lists for its whole lifetime.
//!
//! # Collection
//!
//! ```text
//!                 ┌── services  (skipped once memoized) ──┐
//!  authenticate ──┼── endpoints (skipped once memoized) ──┼── join ── users per tenant ── records
//!   (once)        ├── tenants ────────────────────────────┤
//!                 └── users ──────────────────────────────┘
//! ```
//!
//! Any failing worker fails the whole call; nothing fetched by that call is
//! kept.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::namespace::{AggregateMetric, MetricTarget, Namespace};
use crate::adapters::KeystoneAdapter;
use crate::config::{ClientOptions, ConfigMap, KeystoneConfig};
use crate::domain::ports::{Endpoint, IdentityService, Service, Session, Tenant, User};
use crate::error::{Error, Result};

/// Upper bound of concurrent fetch workers per collection.
const FETCH_WORKERS: usize = 4;

// =============================================================================
// Metric Records
// =============================================================================

/// A metric the host may request, with the configuration to request it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricType {
    pub namespace: Namespace,
    #[serde(default)]
    pub config: ConfigMap,
}

impl MetricType {
    pub fn new(namespace: Namespace, config: ConfigMap) -> Self {
        Self { namespace, config }
    }
}

/// A collected metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub namespace: Namespace,
    /// `None` when the namespace names a tenant that was not found.
    pub value: Option<u64>,
    pub timestamp: DateTime<Utc>,
    /// Host the collector runs on
    pub source: String,
}

// =============================================================================
// Collector State
// =============================================================================

/// State populated at most once per collector.
#[derive(Debug, Default)]
struct CollectorState {
    session: Option<Arc<Session>>,
    services: Option<Arc<Vec<Service>>>,
    endpoints: Option<Arc<Vec<Endpoint>>>,
}

/// Output of a single fetch worker.
enum Fetched {
    Services(Vec<Service>),
    Endpoints(Vec<Endpoint>),
    Tenants(Vec<Tenant>),
    Users(Vec<User>),
}

/// Everything one collection needs, after the join.
struct Inventory {
    services: Arc<Vec<Service>>,
    endpoints: Arc<Vec<Endpoint>>,
    tenants: Vec<Tenant>,
    users: Vec<User>,
}

// =============================================================================
// Collector
// =============================================================================

/// Keystone metrics collector.
pub struct Collector {
    identity: Arc<dyn IdentityService>,
    host: String,
    state: CollectorState,
}

impl Collector {
    /// Create a collector over an identity service.
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".to_string());
        Self::with_host(identity, host)
    }

    /// Create a collector that reports `host` as the metric source.
    pub fn with_host(identity: Arc<dyn IdentityService>, host: impl Into<String>) -> Self {
        Self {
            identity,
            host: host.into(),
            state: CollectorState::default(),
        }
    }

    /// Create a collector talking to Keystone over HTTP.
    pub fn keystone(options: ClientOptions) -> Result<Self> {
        Ok(Self::new(Arc::new(KeystoneAdapter::new(options)?)))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether a session has been established.
    pub fn is_authenticated(&self) -> bool {
        self.state.session.is_some()
    }

    /// Memoized services, once fetched.
    pub fn memoized_services(&self) -> Option<&[Service]> {
        self.state.services.as_deref().map(Vec::as_slice)
    }

    /// Memoized endpoints, once fetched.
    pub fn memoized_endpoints(&self) -> Option<&[Endpoint]> {
        self.state.endpoints.as_deref().map(Vec::as_slice)
    }

    /// List the metrics this collector can produce.
    ///
    /// One `users_count` metric per live tenant, followed by the aggregate
    /// metrics. Every entry carries `cfg` unchanged.
    #[instrument(skip(self, cfg))]
    pub async fn get_metric_types(&mut self, cfg: &ConfigMap) -> Result<Vec<MetricType>> {
        let config = KeystoneConfig::from_config_map(cfg)?;
        let session = self.session(&config).await?;

        let tenants = self.identity.list_tenants(&session).await?;

        let metric_types: Vec<MetricType> = tenants
            .iter()
            .map(|tenant| Namespace::tenant_users(&tenant.name))
            .chain(AggregateMetric::ALL.into_iter().map(Namespace::aggregate))
            .map(|namespace| MetricType::new(namespace, cfg.clone()))
            .collect();

        debug!(
            "Advertising {} metric types for {} tenants",
            metric_types.len(),
            tenants.len()
        );

        Ok(metric_types)
    }

    /// Collect current values for `requested`, in request order.
    ///
    /// Configuration is taken from the first requested metric.
    #[instrument(skip(self, requested), fields(requested = requested.len()))]
    pub async fn collect_metrics(&mut self, requested: &[MetricType]) -> Result<Vec<Metric>> {
        let Some(first) = requested.first() else {
            debug!("No metrics requested");
            return Ok(Vec::new());
        };

        let config = KeystoneConfig::from_config_map(&first.config)?;
        let session = self.session(&config).await?;

        let inventory = self.fetch_inventory(session.clone()).await?;
        let tenant_users = self
            .identity
            .users_per_tenant(&session, &inventory.tenants)
            .await?;

        let timestamp = Utc::now();
        let metrics = requested
            .iter()
            .map(|metric_type| Metric {
                namespace: metric_type.namespace.clone(),
                value: resolve_value(&metric_type.namespace, &inventory, &tenant_users),
                timestamp,
                source: self.host.clone(),
            })
            .collect();

        Ok(metrics)
    }

    /// Return the cached session, authenticating first if there is none.
    async fn session(&mut self, config: &KeystoneConfig) -> Result<Arc<Session>> {
        if let Some(session) = &self.state.session {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(self.identity.authenticate(config).await?);
        info!(
            endpoint = %config.endpoint,
            user = %config.user,
            "Authenticated against identity service"
        );
        self.state.session = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Run the concurrent fetches and wait for all of them.
    ///
    /// Memoization is applied only when every worker succeeded.
    async fn fetch_inventory(&mut self, session: Arc<Session>) -> Result<Inventory> {
        let (errors, mut failures) = mpsc::channel::<Error>(FETCH_WORKERS);
        let mut workers = JoinSet::new();

        if self.state.services.is_none() {
            let (identity, session) = (Arc::clone(&self.identity), Arc::clone(&session));
            spawn_fetch(&mut workers, "services", errors.clone(), async move {
                identity.list_services(&session).await.map(Fetched::Services)
            });
        }
        if self.state.endpoints.is_none() {
            let (identity, session) = (Arc::clone(&self.identity), Arc::clone(&session));
            spawn_fetch(&mut workers, "endpoints", errors.clone(), async move {
                identity.list_endpoints(&session).await.map(Fetched::Endpoints)
            });
        }
        {
            let (identity, session) = (Arc::clone(&self.identity), Arc::clone(&session));
            spawn_fetch(&mut workers, "tenants", errors.clone(), async move {
                identity.list_tenants(&session).await.map(Fetched::Tenants)
            });
        }
        {
            let (identity, session) = (Arc::clone(&self.identity), Arc::clone(&session));
            spawn_fetch(&mut workers, "users", errors.clone(), async move {
                identity.list_users(&session).await.map(Fetched::Users)
            });
        }
        drop(errors);

        debug!("Waiting for {} fetch workers", workers.len());

        let mut services = None;
        let mut endpoints = None;
        let mut tenants = None;
        let mut users = None;
        let mut panicked = None;

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Some(Fetched::Services(v))) => services = Some(v),
                Ok(Some(Fetched::Endpoints(v))) => endpoints = Some(v),
                Ok(Some(Fetched::Tenants(v))) => tenants = Some(v),
                Ok(Some(Fetched::Users(v))) => users = Some(v),
                Ok(None) => {}
                Err(e) => {
                    warn!("Fetch worker did not complete: {}", e);
                    panicked.get_or_insert(Error::Internal(format!("Fetch worker failed: {}", e)));
                }
            }
        }

        if let Ok(err) = failures.try_recv() {
            return Err(err);
        }
        if let Some(err) = panicked {
            return Err(err);
        }

        let services = match services {
            Some(fetched) => {
                let fetched = Arc::new(fetched);
                self.state.services = Some(Arc::clone(&fetched));
                fetched
            }
            None => self
                .state
                .services
                .clone()
                .ok_or_else(|| missing_result("services"))?,
        };
        let endpoints = match endpoints {
            Some(fetched) => {
                let fetched = Arc::new(fetched);
                self.state.endpoints = Some(Arc::clone(&fetched));
                fetched
            }
            None => self
                .state
                .endpoints
                .clone()
                .ok_or_else(|| missing_result("endpoints"))?,
        };

        Ok(Inventory {
            services,
            endpoints,
            tenants: tenants.ok_or_else(|| missing_result("tenants"))?,
            users: users.ok_or_else(|| missing_result("users"))?,
        })
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("host", &self.host)
            .field("authenticated", &self.is_authenticated())
            .field("services_memoized", &self.state.services.is_some())
            .field("endpoints_memoized", &self.state.endpoints.is_some())
            .finish()
    }
}

/// Spawn one fetch worker. A failure is reported on `errors` and the worker
/// yields no result.
fn spawn_fetch<F>(
    workers: &mut JoinSet<Option<Fetched>>,
    resource: &'static str,
    errors: mpsc::Sender<Error>,
    fetch: F,
) where
    F: Future<Output = Result<Fetched>> + Send + 'static,
{
    workers.spawn(async move {
        match fetch.await {
            Ok(fetched) => Some(fetched),
            Err(e) => {
                warn!("Failed to fetch {}: {}", resource, e);
                // Capacity matches the worker count, so this never waits.
                let _ = errors.send(e).await;
                None
            }
        }
    });
}

fn missing_result(resource: &str) -> Error {
    Error::Internal(format!("Fetch worker for {} finished without a result", resource))
}

fn resolve_value(
    namespace: &Namespace,
    inventory: &Inventory,
    tenant_users: &HashMap<String, usize>,
) -> Option<u64> {
    let count = match namespace.target() {
        MetricTarget::Aggregate(AggregateMetric::TotalTenants) => inventory.tenants.len(),
        MetricTarget::Aggregate(AggregateMetric::TotalUsers) => inventory.users.len(),
        MetricTarget::Aggregate(AggregateMetric::TotalServices) => inventory.services.len(),
        MetricTarget::Aggregate(AggregateMetric::TotalEndpoints) => inventory.endpoints.len(),
        MetricTarget::TenantUsers(tenant) => match tenant_users.get(tenant) {
            Some(count) => *count,
            None => {
                debug!("No membership count for tenant {}", tenant);
                return None;
            }
        },
        MetricTarget::Unknown => {
            warn!("Ignoring malformed metric namespace {}", namespace);
            return None;
        }
    };
    Some(count as u64)
}
