//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that abstract over the remote (or local) document
//! database a model layer is persisted in. The model layer never talks to a backend
//! directly; it goes through [`DocumentStore`](crate::store::DocumentStore) and its
//! [`Collection`](crate::collection::Collection) handles, which add argument checks
//! and merge document ids into returned documents.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: An object-safe twin used for runtime backend selection
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use firefly::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! backend.set_document("bugs", "1", doc! { "name": "Steve" }).await?;
//! let stored = backend.get_document("bugs", "1").await?;
//! ```

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::{error::StoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// Documents are field/value maps addressed by a string id within a named collection.
/// The id is not required to be part of the stored map; callers receive it alongside
/// each document and decide how to present it.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks.
///
/// # Error Handling
///
/// A backend reports absence through `Option`/empty vectors and reserves errors for
/// failed calls (network, permissions, malformed data).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Retrieves a single document by id, or `None` if it does not exist.
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Queries documents in a collection using a structured query.
    ///
    /// Applies the query's filter, sort and limit. Unsorted results come back in the
    /// backend's natural order. Each match is returned with its id.
    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>>;

    /// Writes a document under the given id, replacing any existing document entirely.
    ///
    /// The collection is created on demand.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()>;

    /// Merges fields into the document with the given id, creating it if absent.
    ///
    /// Nested maps are merged recursively; every other value is replaced.
    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()>;

    /// Inserts a document under an id chosen by the backend and returns that id.
    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String>;

    /// Deletes a document by id.
    ///
    /// Deleting a document (or collection) that does not exist is not an error.
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe counterpart of [`StoreBackend`].
///
/// Every `StoreBackend` implements this automatically, and `Box<dyn DynStoreBackend>`
/// implements `StoreBackend` in turn, so a boxed backend chosen at runtime can be used
/// anywhere a concrete one can.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>>;
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()>;
    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()>;
    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String>;
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        StoreBackend::get_document(self, collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        StoreBackend::query_documents(self, collection, query).await
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        StoreBackend::set_document(self, collection, id, document).await
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        StoreBackend::merge_document(self, collection, id, document).await
    }

    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String> {
        StoreBackend::add_document(self, collection, document).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        StoreBackend::delete_document(self, collection, id).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        DynStoreBackend::get_document(&**self, collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        DynStoreBackend::query_documents(&**self, collection, query).await
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        DynStoreBackend::set_document(&**self, collection, id, document).await
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        DynStoreBackend::merge_document(&**self, collection, id, document).await
    }

    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String> {
        DynStoreBackend::add_document(&**self, collection, document).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        DynStoreBackend::delete_document(&**self, collection, id).await
    }

    async fn shutdown(self) -> StoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
