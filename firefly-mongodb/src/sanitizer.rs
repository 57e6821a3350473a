//! Key sanitization for MongoDB compatibility.
//!
//! MongoDB field names may not contain dots (nested path separator), dollar signs
//! (operator prefix) or null bytes. Keys are escaped on the way in and restored on the
//! way out; values are stored untouched so queries compare against what the caller
//! wrote.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Escapes every key of a document, recursing into nested maps and arrays.
    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::sanitize_key(&key), Self::sanitize_value(value)))
            .collect()
    }

    fn sanitize_value(value: Bson) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(Self::sanitize_document(doc)),
            Bson::Array(arr) => Bson::Array(arr.into_iter().map(Self::sanitize_value).collect()),
            other => other,
        }
    }

    /// Inverse of [`KeySanitizer::sanitize_document`].
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore_key(&key), Self::restore_value(value)))
            .collect()
    }

    fn restore_value(value: Bson) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(Self::restore_document(doc)),
            Bson::Array(arr) => Bson::Array(arr.into_iter().map(Self::restore_value).collect()),
            other => other,
        }
    }

    /// Escapes a single key or collection name.
    pub(crate) fn sanitize_key(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    pub(crate) fn restore_key(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }

    /// Escapes each segment of a dotted field path, keeping the separators.
    pub(crate) fn sanitize_path(path: &str) -> String {
        path.split('.')
            .map(Self::sanitize_key)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn escapes_keys_but_not_values() {
        let sanitized = KeySanitizer::sanitize_document(doc! {
            "a.b": "c.d",
            "$price": 3,
            "nested": { "x.y": 1 },
            "list": [{ "$k": "v" }],
        });

        assert_eq!(
            sanitized,
            doc! {
                "a__dot__b": "c.d",
                "__dollar__price": 3,
                "nested": { "x__dot__y": 1 },
                "list": [{ "__dollar__k": "v" }],
            }
        );
    }

    #[test]
    fn restore_reverses_sanitize() {
        let original = doc! { "a.b": { "$c": ["x.y"] }, "plain": 1 };
        let restored = KeySanitizer::restore_document(KeySanitizer::sanitize_document(original.clone()));

        assert_eq!(restored, original);
    }

    #[test]
    fn paths_keep_their_separators() {
        assert_eq!(KeySanitizer::sanitize_path("owner.name"), "owner.name");
        assert_eq!(KeySanitizer::sanitize_path("owner.$name"), "owner.__dollar__name");
    }
}
