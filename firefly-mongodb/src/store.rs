use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::debug;
use uuid::Uuid;

use firefly_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    query::{Query, QueryVisitor, SortDirection},
};

use crate::{query::MongoQueryTranslator, sanitizer::KeySanitizer};

const MONGO_ID: &str = "_id";

fn backend_error(err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Flattens nested maps into dotted `$set` paths so a merge only touches the leaves
/// it names. Keys must already be sanitized.
fn flatten_for_set(prefix: Option<&str>, document: Document, into: &mut Document) {
    for (key, value) in document {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };

        match value {
            Bson::Document(nested) if !nested.is_empty() => {
                flatten_for_set(Some(&path), nested, into)
            }
            other => {
                into.insert(path, other);
            }
        }
    }
}

/// Document store backed by a MongoDB database.
///
/// Each document is stored with its id in `_id`, and each collection maps to the
/// MongoDB collection of the same (sanitized) name.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_key(collection_name))
    }

    fn prepare_document(&self, id: &str, document: Document) -> Document {
        let mut prepared = KeySanitizer::sanitize_document(document);
        prepared.insert(MONGO_ID, id);
        prepared
    }

    fn restore_document(&self, mut document: Document) -> StoreResult<(String, Document)> {
        let id = match document.remove(MONGO_ID) {
            Some(Bson::String(id)) => id,
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(other) => other.to_string(),
            None => {
                return Err(StoreError::InvalidDocument(
                    "stored document has no _id".to_string(),
                ));
            }
        };

        Ok((id, KeySanitizer::restore_document(document)))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(doc! { MONGO_ID: id })
            .await
            .map_err(backend_error)?
            .map(|document| self.restore_document(document).map(|(_, document)| document))
            .transpose()
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(find_limit(limit));
        }
        // Ties, and unsorted queries, fall back to id order.
        options.sort = Some(match &query.sort {
            Some(sort) => {
                let sort_field = KeySanitizer::sanitize_path(&sort.field);

                doc! {
                    sort_field: match sort.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    },
                    MONGO_ID: 1,
                }
            }
            None => doc! { MONGO_ID: 1 },
        });

        let filter = match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr)?,
            None => doc! {},
        };
        debug!(collection, %filter, "mongodb find");

        self.get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(|document| self.restore_document(document))
            .collect()
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        self.get_collection(collection)
            .replace_one(doc! { MONGO_ID: id }, self.prepare_document(id, document))
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        let mut set = Document::new();
        flatten_for_set(None, KeySanitizer::sanitize_document(document), &mut set);

        if set.is_empty() {
            // `$set` rejects an empty document; still create the target if absent.
            self.get_collection(collection)
                .update_one(doc! { MONGO_ID: id }, doc! { "$setOnInsert": { MONGO_ID: id } })
                .upsert(true)
                .await
                .map_err(backend_error)?;

            return Ok(());
        }

        self.get_collection(collection)
            .update_one(doc! { MONGO_ID: id }, doc! { "$set": set })
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn add_document(&self, collection: &str, document: Document) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();

        self.get_collection(collection)
            .insert_one(self.prepare_document(&id, document))
            .await
            .map_err(backend_error)?;

        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.get_collection(collection)
            .delete_one(doc! { MONGO_ID: id })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        if self.database.is_empty() {
            return Err(StoreError::Initialization("database name is empty".to_string()));
        }

        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        let client =
            Client::with_options(options).map_err(|e| StoreError::Initialization(e.to_string()))?;

        Ok(MongoDbStore::new(client, self.database))
    }
}

/// Driver limits are signed; anything past `i64::MAX` means no practical cap.
fn find_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_limits_saturate_instead_of_wrapping() {
        assert_eq!(find_limit(500), 500);
        assert_eq!(find_limit(usize::MAX), i64::MAX);
    }

    #[test]
    fn flattening_turns_nested_maps_into_paths() {
        let mut set = Document::new();
        flatten_for_set(
            None,
            doc! { "name": "Steve", "owner": { "name": "Ray", "pet": { "legs": 6 } }, "kids": [{ "name": "Dolly" }] },
            &mut set,
        );

        assert_eq!(
            set,
            doc! {
                "name": "Steve",
                "owner.name": "Ray",
                "owner.pet.legs": 6,
                "kids": [{ "name": "Dolly" }],
            }
        );
    }

    #[test]
    fn empty_maps_are_set_whole() {
        let mut set = Document::new();
        flatten_for_set(None, doc! { "owner": {} }, &mut set);

        assert_eq!(set, doc! { "owner": {} });
    }
}
