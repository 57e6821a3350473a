//! Query expression evaluation for in-memory document filtering.
//!
//! Field paths may be dotted (`owner.name`) to reach into nested maps. A comparison
//! against a field the document does not have never matches, whatever the operator.

use bson::{Bson, Document, datetime::DateTime};
use std::{cmp::Ordering, collections::HashMap};

use firefly_core::{
    error::StoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view of a BSON value.
///
/// Integers and floats collapse into one numeric variant so `6` and `6.0` compare
/// equal, as they do in hosted document stores.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Anything else, compared by exact value only.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Position of this value's type in the cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::DateTime(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Other(_) => 5,
            Comparable::Array(_) => 6,
            Comparable::Map(_) => 7,
        }
    }

    /// Total order used for sorting: values of different types order by type.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted field path inside a document.
///
/// A key that literally contains dots wins over the nested interpretation.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> bool {
        self.visit_expr(expr).unwrap_or(false)
    }

    /// Returns the entries matching `expr`, keeping their input order.
    pub fn filter_documents<I>(documents: I, expr: &Expr) -> Vec<(String, Document)>
    where
        I: IntoIterator<Item = (&'a String, &'a Document)>,
    {
        documents
            .into_iter()
            .filter(|(_, doc)| DocumentEvaluator::new(doc).evaluate(expr))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect()
    }
}

fn any_shared(field: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match (field, values) {
        (Comparable::Array(items), Comparable::Array(values)) => {
            values.iter().any(|value| items.contains(value))
        }
        (Comparable::Array(items), single) => items.contains(single),
        (single, Comparable::Array(values)) => values.contains(single),
        (left, right) => left == right,
    }
}

fn contains(field: &Comparable<'_>, value: &Comparable<'_>) -> Option<bool> {
    match (field, value) {
        (Comparable::Array(items), value) => Some(items.contains(value)),
        (Comparable::String(left), Comparable::String(right)) => Some(left.contains(right)),
        _ => None,
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.document, field) else {
            return Ok(false);
        };
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FieldOp::Contains => contains(&left, &right).unwrap_or(false),
            FieldOp::NotContains => contains(&left, &right).is_some_and(|found| !found),
            FieldOp::StartsWith => match (left, right) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (left, right) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => any_shared(&left, &right),
            FieldOp::NoneOf => !any_shared(&left, &right),
        })
    }
}
