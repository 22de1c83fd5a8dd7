//! In-Memory Identity Adapter
//!
//! Implements the `IdentityService` port over fixed in-process data.
//! Every call is counted per operation and any operation can be made to
//! fail, which makes it the backend of choice for collector tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::StatusCode;

use crate::config::KeystoneConfig;
use crate::domain::ports::{Endpoint, IdentityService, Service, Session, Tenant, User};
use crate::error::{Error, Result};

const IN_MEMORY_URL: &str = "memory://keystone";
const IN_MEMORY_TOKEN: &str = "in-memory-token";

/// Operations of the identity port, used for call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityOperation {
    Authenticate,
    ListTenants,
    ListUsers,
    ListServices,
    ListEndpoints,
    UsersPerTenant,
}

impl IdentityOperation {
    fn resource(self) -> &'static str {
        match self {
            IdentityOperation::Authenticate => "tokens",
            IdentityOperation::ListTenants => "tenants",
            IdentityOperation::ListUsers => "users",
            IdentityOperation::ListServices => "services",
            IdentityOperation::ListEndpoints => "endpoints",
            IdentityOperation::UsersPerTenant => "tenant users",
        }
    }
}

#[derive(Debug, Default)]
struct Backend {
    tenants: Vec<Tenant>,
    members: HashMap<String, usize>,
    users: Vec<User>,
    services: Vec<Service>,
    endpoints: Vec<Endpoint>,
}

/// In-memory identity service for testing.
#[derive(Debug, Default)]
pub struct InMemoryIdentityService {
    backend: RwLock<Backend>,
    failing: RwLock<HashSet<IdentityOperation>>,
    calls: Mutex<HashMap<IdentityOperation, usize>>,
}

impl InMemoryIdentityService {
    /// Create an empty identity service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Two tenants (`demo` with 3 members, `admin` with 1), three users,
    /// four services and four endpoints.
    pub fn demo_deployment() -> Self {
        Self::new()
            .with_tenant(Tenant::new("11111", "demo"), 3)
            .with_tenant(Tenant::new("22222", "admin"), 1)
            .with_users(vec![
                User::new("27b6b980", "heat"),
                User::new("60251a90", "heat-cfn"),
                User::new("659a62b0", "cinder"),
            ])
            .with_services(vec![
                Service::new("13c6403d", "heat", "orchestration"),
                Service::new("361c1c46", "heat-cfn", "cloudformation"),
                Service::new("615e0649", "ceilometer", "metering"),
                Service::new("79b1d028", "novav3", "computev3"),
            ])
            .with_endpoints(vec![
                Endpoint::new("035d8ea0", "dc52eef8", "https://public.fuel.local:8773/services/Cloud"),
                Endpoint::new("0a587d53", "615e0649", "https://public.fuel.local:8777"),
                Endpoint::new("0b74729c", "efbf568d", "http://192.168.20.2:9696"),
                Endpoint::new("159572c2", "efbf568d", "http://192.168.20.2:9696"),
            ])
    }

    /// Add a tenant with the given number of members.
    pub fn with_tenant(self, tenant: Tenant, members: usize) -> Self {
        {
            let mut backend = self.backend.write();
            backend.members.insert(tenant.id.clone(), members);
            backend.tenants.push(tenant);
        }
        self
    }

    pub fn with_users(self, users: Vec<User>) -> Self {
        self.backend.write().users = users;
        self
    }

    pub fn with_services(self, services: Vec<Service>) -> Self {
        self.backend.write().services = services;
        self
    }

    pub fn with_endpoints(self, endpoints: Vec<Endpoint>) -> Self {
        self.backend.write().endpoints = endpoints;
        self
    }

    /// Replace the tenant list and memberships.
    pub fn set_tenants(&self, tenants: Vec<(Tenant, usize)>) {
        let mut backend = self.backend.write();
        backend.members = tenants
            .iter()
            .map(|(tenant, members)| (tenant.id.clone(), *members))
            .collect();
        backend.tenants = tenants.into_iter().map(|(tenant, _)| tenant).collect();
    }

    /// Replace the service list.
    pub fn set_services(&self, services: Vec<Service>) {
        self.backend.write().services = services;
    }

    /// Make `operation` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, operation: IdentityOperation) {
        self.failing.write().insert(operation);
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: IdentityOperation) {
        self.failing.write().remove(&operation);
    }

    /// Number of times `operation` was invoked.
    pub fn calls(&self, operation: IdentityOperation) -> usize {
        self.calls.lock().get(&operation).copied().unwrap_or(0)
    }

    /// Number of invocations across all operations.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    fn enter(&self, operation: IdentityOperation) -> Result<()> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;

        if !self.failing.read().contains(&operation) {
            return Ok(());
        }
        match operation {
            IdentityOperation::Authenticate => Err(Error::AuthRejected(
                "Keystone rejected credentials: 401 Unauthorized".to_string(),
            )),
            other => Err(Error::FetchStatus {
                resource: other.resource(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            }),
        }
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn authenticate(&self, _config: &KeystoneConfig) -> Result<Session> {
        self.enter(IdentityOperation::Authenticate)?;
        Ok(Session::new(IN_MEMORY_URL, IN_MEMORY_TOKEN))
    }

    async fn list_tenants(&self, _session: &Session) -> Result<Vec<Tenant>> {
        self.enter(IdentityOperation::ListTenants)?;
        Ok(self.backend.read().tenants.clone())
    }

    async fn list_users(&self, _session: &Session) -> Result<Vec<User>> {
        self.enter(IdentityOperation::ListUsers)?;
        Ok(self.backend.read().users.clone())
    }

    async fn list_services(&self, _session: &Session) -> Result<Vec<Service>> {
        self.enter(IdentityOperation::ListServices)?;
        Ok(self.backend.read().services.clone())
    }

    async fn list_endpoints(&self, _session: &Session) -> Result<Vec<Endpoint>> {
        self.enter(IdentityOperation::ListEndpoints)?;
        Ok(self.backend.read().endpoints.clone())
    }

    async fn users_per_tenant(
        &self,
        _session: &Session,
        tenants: &[Tenant],
    ) -> Result<HashMap<String, usize>> {
        self.enter(IdentityOperation::UsersPerTenant)?;

        let backend = self.backend.read();
        tenants
            .iter()
            .map(|tenant| match backend.members.get(&tenant.id) {
                Some(count) => Ok((tenant.name.clone(), *count)),
                None => Err(Error::FetchStatus {
                    resource: "tenant users",
                    status: StatusCode::NOT_FOUND,
                }),
            })
            .collect()
    }
}
