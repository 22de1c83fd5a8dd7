//! Domain Ports (DDD Port/Adapter Pattern)
//!
//! This module defines the value objects the collector works with and the
//! [`IdentityService`] port it depends on. Infrastructure adapters implement
//! the port to talk to a concrete identity service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  IdentityService                     │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │  KeystoneAdapter │ InMemoryIdentityService          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::KeystoneConfig;
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// A project/account in the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

impl Tenant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An identity principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            username: name.clone(),
            name,
        }
    }
}

/// A registered API service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

impl Service {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            service_type: service_type.into(),
        }
    }
}

/// A registered service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub id: String,
    pub service_id: String,
    pub url: String,
    pub region: String,
    pub name: String,
}

impl Endpoint {
    pub fn new(id: impl Into<String>, service_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_id: service_id.into(),
            url: url.into(),
            region: String::new(),
            name: String::new(),
        }
    }
}

/// Entry of the service catalog returned with a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

/// Authenticated handle to the identity service.
///
/// Carries the service root the token was issued by, so that every call made
/// with it targets the same deployment.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    identity_url: String,
    token: String,
    catalog: Vec<CatalogEntry>,
    expires_at: Option<String>,
}

impl Session {
    pub fn new(identity_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity_url: identity_url.into(),
            token: token.into(),
            catalog: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<CatalogEntry>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_expiry(mut self, expires_at: Option<String>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Identity service root, without a version segment.
    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    pub fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity_url", &self.identity_url)
            .field("token", &"<redacted>")
            .field("catalog_entries", &self.catalog.len())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// =============================================================================
// Identity Port
// =============================================================================

/// Port for read-only identity service operations.
///
/// All list operations return complete collections; pagination is drained
/// by the implementation.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Authenticate with the configured credentials.
    async fn authenticate(&self, config: &KeystoneConfig) -> Result<Session>;

    /// List all tenants.
    async fn list_tenants(&self, session: &Session) -> Result<Vec<Tenant>>;

    /// List all users.
    async fn list_users(&self, session: &Session) -> Result<Vec<User>>;

    /// List all registered services.
    async fn list_services(&self, session: &Session) -> Result<Vec<Service>>;

    /// List all registered endpoints.
    async fn list_endpoints(&self, session: &Session) -> Result<Vec<Endpoint>>;

    /// Count members of each tenant, keyed by tenant name.
    ///
    /// Tenants are queried one after another; the first failure aborts the
    /// whole operation.
    async fn users_per_tenant(
        &self,
        session: &Session,
        tenants: &[Tenant],
    ) -> Result<HashMap<String, usize>>;
}
