//! Main document store interface for interacting with document backends.
//!
//! [`DocumentStore`] wraps a backend and hands out two kinds of collection handles:
//!
//! - [`Collection`] - raw documents addressed by collection name
//! - [`TypedCollection`] - model instances, collection resolved from the model type
//!
//! # Example
//!
//! ```ignore
//! use firefly::store::DocumentStore;
//! use firefly::memory::InMemoryStore;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let bugs = store.collection("bugs");
//! bugs.create("1", bson::doc! { "name": "Steve" }).await?;
//!
//! let typed = store.typed_collection::<Bug>();
//! let steve = typed.get("1").await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::Collection,
    error::StoreResult,
    model::Model,
    record::TypedCollection,
};

/// Default cap on the number of documents equality and ordered queries return.
pub const DEFAULT_LIMIT: usize = 500;

/// Tunables shared by every collection handle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Result cap for `find`, `filter` and `order_by` when the caller passes none.
    pub default_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { default_limit: DEFAULT_LIMIT }
    }
}

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    options: StoreOptions,
}

/// A document store whose backend was chosen at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn DynStoreBackend>>;

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend and default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    /// Creates a new document store with the given backend and options.
    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// Returns the options this store was created with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a handle on the raw documents of the named collection.
    ///
    /// The name is checked when an operation runs, not here.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), &self.backend, self.options.default_limit)
    }

    /// Gets a typed collection for the specified model type.
    ///
    /// The collection name is determined by the model type's `collection_name()`.
    pub fn typed_collection<'a, M: Model>(&'a self) -> TypedCollection<'a, B, M> {
        TypedCollection::new(self.collection(M::collection_name()))
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Erases the backend type so stores built from different backends share one type.
    pub fn into_dyn(self) -> DynDocumentStore {
        DocumentStore {
            backend: Box::new(self.backend),
            options: self.options,
        }
    }
}
