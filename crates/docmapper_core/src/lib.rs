//! Generic entity-document mapper core.
//! Translates between plain domain entities and documents in a
//! document-oriented store, exposing lifecycle and CRUD operations.

pub mod error;
pub mod factory;
pub mod logging;
pub mod mapper;
pub mod mapping;
pub mod store;

pub use error::{MapperError, MapperResult};
pub use factory::EntityFactory;
pub use logging::{default_log_level, init_logging, logging_status};
pub use mapper::{DataMapper, DestroyOptions, MapperConfig};
pub use mapping::{
    document_to_entity, entity_to_document, generate_entity_id, FieldMap, MappingError,
    ENTITY_ID_KEY, RESERVED_ID_KEY,
};
pub use store::{
    DocumentCollection, Filter, FindOptions, Pagination, Projection, SortOrder, Sorting,
    SqliteStoreClient, StoreClient, StoreConnection, StoreError, StoreResult, SQLITE_URI_SCHEME,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
