//! In-memory document storage backend for firefly.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! tests and small single-process deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Full query support** - Every comparison operator, dotted field paths, sorting and limits
//! - **Store semantics** - Replace and merge writes, store-assigned ids, no-op deletes
//!
//! # Quick Start
//!
//! ```ignore
//! use firefly::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let bug = Bug::create(&store, doc! { "name": "Steve" }).await?;
//!     assert!(Bug::exists(&store, &bug.id).await?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as firefly_memory;

mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
