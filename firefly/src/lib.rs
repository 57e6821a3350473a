//! Main firefly crate: an active-record model layer over document stores.
//!
//! This crate is the primary entry point for users of firefly. It re-exports the core
//! types from the sub-crates, the `Model` derive, and the available storage backends.
//!
//! # Features
//!
//! - **Typed models** - Plain serde structs with generated ids and timestamps
//! - **Active-record operations** - `create`, `get`, `find`, `filter`, `save`, `delete` and friends
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//! - **Configuration** - TOML file plus environment overrides to pick a backend at runtime
//!
//! # Quick Start
//!
//! ```ignore
//! use firefly::{prelude::*, memory::InMemoryStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct Bug {
//!     pub id: String,
//!     pub created_at: String,
//!     pub timestamp: i64,
//!     pub name: String,
//!     #[serde(rename = "type")]
//!     pub kind: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     let mut bug = Bug::build(doc! { "id": 1, "name": "Steve", "type": "moth" })?;
//!     bug.save(&store).await?;
//!
//!     let steve = Bug::find(&store, ("name", "Steve")).await?;
//!     let moths = Bug::filter(&store, ("type", "moth")).await?;
//!     assert!(bug.delete(&store).await?);
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Runtime backend selection
//!
//! [`FireflyConfig::connect`](config::FireflyConfig::connect) returns a
//! [`DynDocumentStore`](store::DynDocumentStore), which every model operation accepts
//! just like a statically typed store:
//!
//! ```ignore
//! let config = FireflyConfig::load()?;
//! firefly::logging::init_tracing(&config.logging);
//!
//! let store = config.connect().await?;
//! let bugs = Bug::all(&store).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as firefly;

pub mod config;
pub mod logging;
pub mod prelude;

pub use firefly_core::{backend, collection, error, inflect, model, query, record, store};
pub use firefly_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use firefly_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use firefly_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
