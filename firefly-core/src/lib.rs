//! A minimal active-record model layer over document stores.
//!
//! This crate is the core of the firefly project and provides:
//!
//! - **Models** ([`model`]) - The model trait and the construction contract every model follows
//! - **Active records** ([`record`]) - Save, fetch, query and delete models by type
//! - **Collection naming** ([`inflect`]) - Type name to collection name resolution
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query and filtering API** ([`query`]) - Comparison operators and query construction
//! - **Collections interface** ([`collection`]) - Raw document access with argument checks
//! - **Document store** ([`store`]) - Entry point binding a backend to its collections
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use firefly::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct Bug {
//!     pub id: String,
//!     pub created_at: String,
//!     pub timestamp: i64,
//!     pub name: String,
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let bug = Bug::create(&store, doc! { "name": "Steve" }).await?;
//! assert!(Bug::exists(&store, &bug.id).await?);
//! ```

#[allow(unused_extern_crates)]
extern crate self as firefly_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod inflect;
pub mod model;
pub mod query;
pub mod record;
pub mod store;
