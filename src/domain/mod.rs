//! Domain Layer
//!
//! Value objects and the identity port the collector is written against.
//!
//! # Usage
//!
//! ```ignore
//! use keystone_collector::domain::{IdentityService, Session};
//!
//! async fn tenant_names<I: IdentityService>(identity: &I, session: &Session) -> Result<Vec<String>> {
//!     let tenants = identity.list_tenants(session).await?;
//!     Ok(tenants.into_iter().map(|t| t.name).collect())
//! }
//! ```

pub mod ports;

pub use ports::{CatalogEntry, Endpoint, IdentityService, Service, Session, Tenant, User};
