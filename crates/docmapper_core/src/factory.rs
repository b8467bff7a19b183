//! Entity factory contract.
//!
//! # Responsibility
//! - Define the capability set a domain type must provide before the mapper
//!   will persist it: construction from a field map and instance recognition.
//!
//! # Invariants
//! - `construct` is total: it coerces or defaults malformed fields instead of
//!   failing, and mints an identifier when none is usable.
//! - `is_instance_of` accepts exactly the field maps `construct` emits.

use crate::mapping::FieldMap;
use serde::Serialize;

/// Capability set for producing and recognizing one entity type.
///
/// The mapper validates entities through `is_instance_of` before every write
/// and routes every read through `construct`, so results are always
/// factory-conformant values rather than raw converted maps. `name` appears
/// in type-mismatch error messages and must not be blank.
pub trait EntityFactory: Send + Sync {
    /// The entity type this factory produces.
    type Entity: Serialize;

    /// Human-readable entity type name, used in error messages.
    fn name(&self) -> &str;

    /// Builds an entity from a field map, coercing missing or malformed
    /// fields to defaults.
    fn construct(&self, fields: FieldMap) -> Self::Entity;

    /// Returns whether the field map describes a well-formed instance of
    /// this factory's entity type.
    fn is_instance_of(&self, fields: &FieldMap) -> bool;
}
