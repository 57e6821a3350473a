//! Query translation from the firefly query AST to MongoDB query syntax.
//!
//! Translation keeps the in-memory backend's semantics: comparisons never match a
//! document that lacks the field, `contains` means array membership or a
//! case-sensitive substring, and string operators match literally.

use bson::{Bson, Document, doc};

use firefly_core::{
    error::StoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

use crate::sanitizer::KeySanitizer;

/// Translates query expressions into MongoDB filter documents.
pub(crate) struct MongoQueryTranslator;

/// Escapes regex metacharacters so a string matches literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn as_list(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        other => Bson::Array(vec![other.clone()]),
    }
}

fn contains(field: &str, value: &Bson) -> Document {
    match value {
        Bson::String(s) => doc! {
            "$or": [
                { field: { "$elemMatch": { "$eq": value } } },
                {
                    "$and": [
                        { field: { "$not": { "$type": "array" } } },
                        { field: { "$regex": escape_regex(s) } },
                    ]
                },
            ]
        },
        _ => doc! { field: { "$elemMatch": { "$eq": value } } },
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        let field = KeySanitizer::sanitize_path(field);

        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let field = KeySanitizer::sanitize_path(field);
        let field = field.as_str();

        Ok(match op {
            FieldOp::Eq => doc! { field: { "$eq": value } },
            FieldOp::Ne => doc! { field: { "$ne": value, "$exists": true } },
            FieldOp::Gt => doc! { field: { "$gt": value } },
            FieldOp::Gte => doc! { field: { "$gte": value } },
            FieldOp::Lt => doc! { field: { "$lt": value } },
            FieldOp::Lte => doc! { field: { "$lte": value } },
            FieldOp::Contains => contains(field, value),
            FieldOp::NotContains => doc! {
                "$and": [
                    { field: { "$exists": true } },
                    { "$nor": [contains(field, value)] },
                ]
            },
            FieldOp::StartsWith | FieldOp::EndsWith => {
                let Bson::String(s) = value else {
                    return Err(StoreError::Backend(format!(
                        "`{op}` requires a string value"
                    )));
                };
                let pattern = match op {
                    FieldOp::StartsWith => format!("^{}", escape_regex(s)),
                    _ => format!("{}$", escape_regex(s)),
                };

                doc! { field: { "$regex": pattern } }
            }
            FieldOp::AnyOf => doc! { field: { "$in": as_list(value) } },
            FieldOp::NoneOf => doc! { field: { "$nin": as_list(value), "$exists": true } },
        })
    }
}
