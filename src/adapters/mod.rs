//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                IdentityService (Trait)                      │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │     KeystoneAdapter (HTTP)  │  InMemoryIdentityService     │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use keystone_collector::adapters::KeystoneAdapter;
//! use keystone_collector::config::ClientOptions;
//! use keystone_collector::domain::IdentityService;
//!
//! let identity = KeystoneAdapter::new(ClientOptions::default())?;
//! let session = identity.authenticate(&config).await?;
//! let tenants = identity.list_tenants(&session).await?;
//! ```

mod in_memory;
mod keystone;

pub use in_memory::{IdentityOperation, InMemoryIdentityService};
pub use keystone::{identity_root, ApiProfile, KeystoneAdapter};
