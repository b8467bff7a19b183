//! Query shapes shared by every store client.
//!
//! # Responsibility
//! - Describe filter, projection, sort and pagination inputs for `find`.
//! - Provide the document matching/shaping helpers store clients apply.
//!
//! # Invariants
//! - An empty filter matches every document.
//! - `limit == 0` means unbounded.
//! - Projection never removes the reserved identifier key.

use crate::mapping::{FieldMap, RESERVED_ID_KEY};
use serde_json::Value;
use std::cmp::Ordering;

/// Field-equality filter: a document matches when every listed field is
/// present with exactly the listed value. Empty means match-all.
pub type Filter = FieldMap;

/// Field inclusion/exclusion applied to find results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Keep every field.
    #[default]
    All,
    /// Keep only the listed fields (plus the reserved identifier key).
    Include(Vec<String>),
    /// Drop the listed fields (the reserved identifier key is never dropped).
    Exclude(Vec<String>),
}

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Ordering specification: sort keys applied in sequence. Empty means the
/// store's natural order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sorting {
    pub keys: Vec<(String, SortOrder)>,
}

impl Sorting {
    /// Single-key ascending/descending convenience.
    pub fn by(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            keys: vec![(field.into(), order)],
        }
    }
}

/// Result-window specification. `limit == 0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: 0 }
    }
}

/// Combined options for a `find` call. Defaults reproduce the bare query:
/// all fields, natural order, no window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub projection: Projection,
    pub sorting: Sorting,
    pub pagination: Pagination,
}

/// Returns whether `document` satisfies the field-equality `filter`.
pub fn matches_filter(document: &FieldMap, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// Sorts documents in place by the given keys, preserving the incoming
/// order of ties (stable sort, so natural order survives as tiebreaker).
pub fn apply_sorting(documents: &mut [FieldMap], sorting: &Sorting) {
    if sorting.keys.is_empty() {
        return;
    }

    documents.sort_by(|a, b| {
        for (field, order) in &sorting.keys {
            let ordering = compare_values(a.get(field), b.get(field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Applies `skip`/`limit` to an already-sorted result sequence.
pub fn apply_pagination(documents: Vec<FieldMap>, pagination: &Pagination) -> Vec<FieldMap> {
    let skipped = documents.into_iter().skip(pagination.skip as usize);
    if pagination.limit == 0 {
        skipped.collect()
    } else {
        skipped.take(pagination.limit as usize).collect()
    }
}

/// Shapes one document according to the projection.
///
/// The reserved identifier key always survives, so projected documents stay
/// convertible back to entities.
pub fn apply_projection(document: FieldMap, projection: &Projection) -> FieldMap {
    match projection {
        Projection::All => document,
        Projection::Include(fields) => document
            .into_iter()
            .filter(|(key, _)| key == RESERVED_ID_KEY || fields.iter().any(|f| f == key))
            .collect(),
        Projection::Exclude(fields) => document
            .into_iter()
            .filter(|(key, _)| key == RESERVED_ID_KEY || !fields.iter().any(|f| f == key))
            .collect(),
    }
}

/// Total order over JSON values for sorting: null < bool < number < string <
/// array < object, with natural ordering inside each class. Absent fields
/// sort before any present value.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let rank_a = type_rank(a);
            let rank_b = type_rank(b);
            if rank_a != rank_b {
                return rank_a.cmp(&rank_b);
            }
            match (a, b) {
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                (Value::Number(a), Value::Number(b)) => {
                    let a = a.as_f64().unwrap_or(f64::NAN);
                    let b = b.as_f64().unwrap_or(f64::NAN);
                    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
                }
                (Value::String(a), Value::String(b)) => a.cmp(b),
                // Arrays and objects compare by their JSON text. Rarely used
                // as sort keys, but the order stays total and deterministic.
                _ => a.to_string().cmp(&b.to_string()),
            }
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
