//! MongoDB backend implementation for firefly.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait,
//! persisting models in a MongoDB database and pushing filters, sorts and limits down
//! to the MongoDB query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! firefly = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use firefly::{backend::StoreBackendBuilder, mongodb::MongoDbStore, store::DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "fireflies")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as firefly_mongodb;

mod query;
mod sanitizer;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
