//! Convenient re-exports of commonly used types from firefly.
//!
//! ```ignore
//! use firefly::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `Model` trait and derive, and the `ActiveRecord` operations
//! - Stores, collections and backends
//! - Query operators and builders
//! - Error and configuration types
//! - The `doc!` macro

pub use bson::doc;

pub use firefly_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    error::{StoreError, StoreResult},
    model::Model,
    query::{Condition, Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    record::{ActiveRecord, Criteria, TypedCollection},
    store::{DocumentStore, DynDocumentStore, StoreOptions},
};
pub use firefly_macros::Model;

pub use crate::config::{BackendKind, FireflyConfig, LoggingConfig, StoreConfig};
