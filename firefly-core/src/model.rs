//! Core model trait and the construction contract shared by every model.
//!
//! A model is a plain serde struct persisted as one document in the collection named
//! after its type. Constructing a model, whether from caller-supplied fields or from a
//! document read back out of the store, always goes through the same steps:
//!
//! 1. the input must be a field/value map,
//! 2. `id` is generated when absent, `null` or empty, and coerced to a string otherwise,
//! 3. `created_at` is set to the current time unless already present,
//! 4. `timestamp` is set to the current instant in Unix milliseconds, every time.
//!
//! Step 4 also runs on rehydration, so a model read back through `get`, `find` or
//! `filter` carries the instant it was materialized rather than the one it was saved.
//!
//! Fields the struct does not declare are dropped by serde unless the model keeps a
//! catch-all. Declare one with `#[serde(flatten)]` to carry arbitrary caller fields
//! through construction, storage and rehydration:
//!
//! ```ignore
//! #[serde(flatten)]
//! pub extra: bson::Document,
//! ```
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
//! let bug = Bug::build(bson::doc! { "id": 1, "name": "Steve" })?;
//! assert_eq!(bug.id, "1");
//! assert_eq!(Bug::collection_name(), "bugs");
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::error::{StoreError, StoreResult};

/// Field holding a model's identity.
pub const ID_FIELD: &str = "id";
/// Field holding the human-readable creation time.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Field holding the materialization instant in Unix milliseconds.
pub const TIMESTAMP_FIELD: &str = "timestamp";

const ID_LENGTH: usize = 12;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Trait that every persisted model implements.
///
/// Usually derived with `#[derive(Model)]`, which resolves the collection name from the
/// type name at compile time. A manual implementation looks like this:
///
/// ```ignore
/// impl Model for Bug {
///     fn collection_name() -> &'static str { "bugs" }
///     fn id(&self) -> &str { &self.id }
///     fn set_id(&mut self, id: String) { self.id = id; }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the name of the collection this model is stored in.
    fn collection_name() -> &'static str;

    /// Returns this instance's identity. Empty only for hand-built instances that
    /// have never been constructed through [`Model::build`].
    fn id(&self) -> &str;

    /// Replaces this instance's identity, e.g. with one assigned by the store.
    fn set_id(&mut self, id: String);

    /// Name of the field holding the identity.
    fn id_field() -> &'static str {
        ID_FIELD
    }

    /// Returns the collection of this instance's type.
    fn collection(&self) -> &'static str {
        Self::collection_name()
    }

    /// Constructs a model from any serializable field/value map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDocument`] when `fields` does not serialize to a
    /// map (an array, say), and [`StoreError::Serialization`] when the map lacks a
    /// field the model requires.
    fn build<F: Serialize>(fields: F) -> StoreResult<Self> {
        Self::from_document(to_document(&fields)?)
    }

    /// Constructs a model from a raw document, applying the construction contract.
    fn from_document(document: Document) -> StoreResult<Self> {
        let document = prepare(document, Self::id_field())?;

        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    /// Serializes this model into the plain document that gets persisted.
    fn to_document(&self) -> StoreResult<Document> {
        to_document(self)
    }
}

/// Serializes a value and requires the result to be a field/value map.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a field/value map, got {:?}",
            other.element_type()
        ))),
    }
}

/// Applies the identity and timestamp steps of the construction contract, with the
/// identity kept under `id_field`.
pub fn prepare(mut document: Document, id_field: &str) -> StoreResult<Document> {
    let id = match document.get(id_field) {
        None | Some(Bson::Null) => generate_id(),
        Some(value) => coerce_id(value)?.unwrap_or_else(generate_id),
    };
    let now = Utc::now();

    trace!(id = %id, "preparing model fields");

    document.insert(id_field, id);
    if is_blank(document.get(CREATED_AT_FIELD)) {
        document.insert(CREATED_AT_FIELD, format_created_at(&now));
    }
    document.insert(TIMESTAMP_FIELD, now.timestamp_millis());

    Ok(document)
}

fn is_blank(value: Option<&Bson>) -> bool {
    match value {
        None | Some(Bson::Null) => true,
        Some(Bson::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Generates a random 12 character base-36 identity.
pub fn generate_id() -> String {
    let mut rng = rand::rng();

    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Coerces a supplied id value to its string form.
///
/// Returns `None` for an empty string, which counts as no id at all.
fn coerce_id(value: &Bson) -> StoreResult<Option<String>> {
    let id = match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) if n.fract() == 0.0 && n.is_finite() => format!("{n:.0}"),
        Bson::Double(n) => n.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => {
            return Err(StoreError::InvalidDocument(format!(
                "id must be a string or number, got {:?}",
                other.element_type()
            )));
        }
    };

    Ok(if id.is_empty() { None } else { Some(id) })
}

/// Formats a creation time the way HTTP dates are written, e.g.
/// `Mon, 19 Oct 2026 12:00:00 GMT`.
pub fn format_created_at(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Bug {
        id: String,
        created_at: String,
        timestamp: i64,
        name: String,
        #[serde(default)]
        kind: Option<String>,
    }

    impl Model for Bug {
        fn collection_name() -> &'static str {
            "bugs"
        }

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Moth {
        id: String,
        created_at: String,
        timestamp: i64,
        #[serde(flatten)]
        extra: Document,
    }

    impl Model for Moth {
        fn collection_name() -> &'static str {
            "moths"
        }

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    #[test]
    fn catch_all_keeps_undeclared_fields() {
        let moth = Moth::build(doc! { "id": "1", "legs": 6, "wings": { "spots": true } }).unwrap();

        assert_eq!(moth.extra, doc! { "legs": 6, "wings": { "spots": true } });

        let document = moth.to_document().unwrap();
        assert_eq!(document.get_i32("legs").unwrap(), 6);
        assert!(document.get_document("wings").unwrap().get_bool("spots").unwrap());
    }

    #[test]
    fn generates_id_when_absent() {
        let bug = Bug::build(doc! { "name": "Steve" }).unwrap();

        assert_eq!(bug.id.len(), ID_LENGTH);
        assert!(bug.id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn generated_ids_differ() {
        let first = Bug::build(doc! { "name": "Steve" }).unwrap();
        let second = Bug::build(doc! { "name": "Steve" }).unwrap();

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn empty_and_null_ids_are_replaced() {
        let empty = Bug::build(doc! { "id": "", "name": "Steve" }).unwrap();
        let null = Bug::build(doc! { "id": Bson::Null, "name": "Steve" }).unwrap();

        assert_eq!(empty.id.len(), ID_LENGTH);
        assert_eq!(null.id.len(), ID_LENGTH);
    }

    #[test]
    fn numeric_ids_are_coerced_to_strings() {
        assert_eq!(Bug::build(doc! { "id": 1, "name": "Steve" }).unwrap().id, "1");
        assert_eq!(Bug::build(doc! { "id": 42_i64, "name": "Steve" }).unwrap().id, "42");
        assert_eq!(Bug::build(doc! { "id": 7.0, "name": "Steve" }).unwrap().id, "7");
    }

    #[test]
    fn rejects_structured_ids() {
        let result = Bug::build(doc! { "id": { "nested": true }, "name": "Steve" });

        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }

    #[test]
    fn keeps_existing_created_at() {
        let bug = Bug::build(doc! {
            "name": "Steve",
            "created_at": "Thu, 01 Jan 2015 00:00:00 GMT",
        })
        .unwrap();

        assert_eq!(bug.created_at, "Thu, 01 Jan 2015 00:00:00 GMT");
    }

    #[test]
    fn sets_created_at_when_absent() {
        let bug = Bug::build(doc! { "name": "Steve" }).unwrap();

        assert!(bug.created_at.ends_with(" GMT"));
    }

    #[test]
    fn timestamp_is_reset_on_every_construction() {
        let bug = Bug::build(doc! { "name": "Steve", "timestamp": 5_i64 }).unwrap();

        assert!(bug.timestamp > 5);
    }

    #[test]
    fn array_input_is_an_invalid_document() {
        let result = Bug::build(vec![1, 2, 3]);

        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }

    #[test]
    fn missing_required_fields_fail_deserialization() {
        let result = Bug::build(doc! { "kind": "moth" });

        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn to_document_keeps_identity_and_timestamps() {
        let bug = Bug::build(doc! { "id": "1", "name": "Steve", "kind": "moth" }).unwrap();
        let document = bug.to_document().unwrap();

        assert_eq!(document.get_str(ID_FIELD).unwrap(), "1");
        assert_eq!(document.get_str("kind").unwrap(), "moth");
        assert!(document.contains_key(CREATED_AT_FIELD));
        assert!(document.contains_key(TIMESTAMP_FIELD));
    }

    #[test]
    fn formats_created_at_like_http_dates() {
        let at = DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(format_created_at(&at), "Mon, 19 Oct 2026 12:00:00 GMT");
    }
}
