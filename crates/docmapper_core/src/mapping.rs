//! Entity/document conversion primitives.
//!
//! # Responsibility
//! - Rename the identifier field between its entity form (`id`) and its
//!   persisted form (the reserved key `_id`).
//! - Mint stable string identifiers for factories that need one.
//!
//! # Invariants
//! - Conversion never touches fields other than the identifier.
//! - `document_to_entity(entity_to_document(f)) == f` for every field map
//!   carrying an `id` key.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier field name on the entity side.
pub const ENTITY_ID_KEY: &str = "id";

/// Reserved identifier key on the document side.
pub const RESERVED_ID_KEY: &str = "_id";

/// Dynamic field set of an entity or document.
pub type FieldMap = serde_json::Map<String, Value>;

pub type MappingResult<T> = Result<T, MappingError>;

/// Conversion failure: the identifier key the direction requires is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    MissingEntityId,
    MissingDocumentId,
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEntityId => {
                write!(f, "entity field map has no `{ENTITY_ID_KEY}` field")
            }
            Self::MissingDocumentId => {
                write!(f, "document has no `{RESERVED_ID_KEY}` key")
            }
        }
    }
}

impl Error for MappingError {}

/// Converts an entity field map into its document form.
///
/// All fields are copied verbatim except `id`, which moves to the reserved
/// key. The input is untouched.
pub fn entity_to_document(fields: &FieldMap) -> MappingResult<FieldMap> {
    rename_key(fields, ENTITY_ID_KEY, RESERVED_ID_KEY).ok_or(MappingError::MissingEntityId)
}

/// Converts a persisted document back into its entity field map form.
///
/// Inverse of [`entity_to_document`] over well-formed inputs.
pub fn document_to_entity(document: &FieldMap) -> MappingResult<FieldMap> {
    rename_key(document, RESERVED_ID_KEY, ENTITY_ID_KEY).ok_or(MappingError::MissingDocumentId)
}

/// Mints a fresh string identifier for a new entity.
///
/// Factories call this when `construct` receives no usable identifier.
pub fn generate_entity_id() -> String {
    Uuid::new_v4().to_string()
}

fn rename_key(fields: &FieldMap, from: &str, to: &str) -> Option<FieldMap> {
    let id = fields.get(from)?.clone();

    let mut renamed = FieldMap::new();
    renamed.insert(to.to_string(), id);
    for (key, value) in fields {
        if key != from {
            renamed.insert(key.clone(), value.clone());
        }
    }

    Some(renamed)
}
