//! Entity-document mapper session.
//!
//! # Responsibility
//! - Validate configuration and bind one connection + collection + factory.
//! - Run CRUD operations, converting entity<->document at each boundary.
//!
//! # Invariants
//! - Entities are checked against the bound factory before every write.
//! - Every document read back passes through `factory.construct`, so callers
//!   only ever see factory-conformant entities.
//! - A destroyed session rejects every further operation, destroy included.

use crate::error::{MapperError, MapperResult};
use crate::factory::EntityFactory;
use crate::mapping::{document_to_entity, entity_to_document, FieldMap, ENTITY_ID_KEY};
use crate::store::{DocumentCollection, Filter, FindOptions, StoreClient, StoreConnection};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

static COLLECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("valid collection name regex"));

/// Configuration for [`DataMapper::initialize`].
///
/// All three options are required; they are `Option` here so that validation
/// can report exactly which one is missing.
#[derive(Debug, Clone)]
pub struct MapperConfig<F> {
    /// Connection target, e.g. `sqlite://memory`. Must match the store
    /// client's URI scheme.
    pub store_uri: Option<String>,
    /// Collection the session binds to.
    pub collection_name: Option<String>,
    /// Factory producing and recognizing the session's entity type.
    pub factory: Option<F>,
}

impl<F> Default for MapperConfig<F> {
    fn default() -> Self {
        Self {
            store_uri: None,
            collection_name: None,
            factory: None,
        }
    }
}

/// Options for [`DataMapper::destroy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOptions {
    /// Abort in-flight work instead of waiting for a clean close. Exact
    /// semantics belong to the store client.
    pub forcefully: bool,
}

/// One live mapper session: a connection, a bound collection and a factory.
///
/// Methods take `&self`, so a session can be shared across logical callers
/// (e.g. behind `Arc`); coordination between concurrent operations is
/// whatever the store client guarantees, nothing more.
pub struct DataMapper<F: EntityFactory> {
    connection: Box<dyn StoreConnection>,
    collection: Box<dyn DocumentCollection>,
    factory: F,
    destroyed: AtomicBool,
}

impl<F: EntityFactory> std::fmt::Debug for DataMapper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataMapper")
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<F: EntityFactory> DataMapper<F> {
    /// Validates `config`, connects to the store and binds the collection.
    ///
    /// Validation is fail-fast in a fixed order: missing options first (in
    /// `storeUri`, `factory`, `collectionName` order), then per-option
    /// format checks. No connection is attempted unless validation passes.
    ///
    /// # Errors
    /// - `MissingOption` / `InvalidOption` for configuration violations.
    /// - `Connection` when the store client fails to connect or bind;
    ///   propagated unmodified, never retried.
    pub fn initialize(client: &dyn StoreClient, config: MapperConfig<F>) -> MapperResult<Self> {
        let store_uri = config
            .store_uri
            .filter(|uri| !uri.is_empty())
            .ok_or(MapperError::MissingOption("storeUri"))?;
        let factory = config
            .factory
            .ok_or(MapperError::MissingOption("factory"))?;
        let collection_name = config
            .collection_name
            .filter(|name| !name.is_empty())
            .ok_or(MapperError::MissingOption("collectionName"))?;

        if !store_uri.starts_with(client.scheme()) {
            return Err(MapperError::InvalidOption("storeUri"));
        }
        // Construction and recognition are trait-guaranteed; the remaining
        // runtime-checkable capability is a usable name for error messages.
        if factory.name().trim().is_empty() {
            return Err(MapperError::InvalidOption("factory"));
        }
        if !COLLECTION_NAME_RE.is_match(&collection_name) {
            return Err(MapperError::InvalidOption("collectionName"));
        }

        let connection = client.connect(&store_uri).map_err(MapperError::Connection)?;
        let collection = connection
            .collection(&collection_name)
            .map_err(MapperError::Connection)?;

        info!(
            "event=mapper_init module=mapper status=ok collection={} factory={}",
            collection_name,
            factory.name()
        );
        Ok(Self {
            connection,
            collection,
            factory,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Closes the session's connection and marks the session destroyed.
    ///
    /// # Errors
    /// - `SessionDestroyed` when called on an already-destroyed session.
    /// - `Store` when the store client fails to close the connection.
    pub fn destroy(&self, options: DestroyOptions) -> MapperResult<()> {
        self.ensure_open()?;
        self.destroyed.store(true, Ordering::SeqCst);

        self.connection
            .close(options.forcefully)
            .map_err(MapperError::Store)?;
        info!(
            "event=mapper_destroy module=mapper status=ok forcefully={}",
            options.forcefully
        );
        Ok(())
    }

    /// Persists a new entity as a document.
    ///
    /// # Errors
    /// - `TypeMismatch` when the bound factory does not recognize the
    ///   entity; nothing is written.
    /// - Identifier collisions surface as `Store` errors, exactly as the
    ///   store reports them.
    pub fn save(&self, entity: &F::Entity) -> MapperResult<()> {
        self.ensure_open()?;
        let fields = self.recognized_fields(entity)?;
        let document = entity_to_document(&fields)?;

        self.collection
            .insert(&document)
            .map_err(MapperError::Store)
    }

    /// Queries the collection and returns matching entities.
    ///
    /// Each document is converted back to entity form and passed through
    /// the factory, preserving per-document order (requested sort order, or
    /// natural store order when unsorted).
    pub fn find(&self, filter: &Filter, options: &FindOptions) -> MapperResult<Vec<F::Entity>> {
        self.ensure_open()?;
        let documents = self
            .collection
            .find(filter, options)
            .map_err(MapperError::Store)?;

        documents
            .iter()
            .map(|document| Ok(self.factory.construct(document_to_entity(document)?)))
            .collect()
    }

    /// [`find`](Self::find) with default arguments: every document, all
    /// fields, natural order.
    pub fn find_all(&self) -> MapperResult<Vec<F::Entity>> {
        self.find(&Filter::new(), &FindOptions::default())
    }

    /// Replaces all non-identifier fields of the document matching `id`
    /// with the entity's fields and returns the post-update entity.
    ///
    /// The entity's own `id` field is dropped before the update, so the
    /// stored identifier is never altered.
    ///
    /// # Errors
    /// - `TypeMismatch` when the factory does not recognize the entity.
    /// - `NotFound` when no document matches `id`; nothing is changed.
    pub fn update(&self, id: &Value, entity: &F::Entity) -> MapperResult<F::Entity> {
        self.ensure_open()?;
        let mut changes = self.recognized_fields(entity)?;
        changes.remove(ENTITY_ID_KEY);

        let updated = self
            .collection
            .find_one_and_update(id, &changes)
            .map_err(MapperError::Store)?
            .ok_or_else(|| MapperError::NotFound(id.clone()))?;

        Ok(self.factory.construct(document_to_entity(&updated)?))
    }

    /// Deletes the document matching `id` and returns its pre-deletion
    /// state as an entity.
    ///
    /// # Errors
    /// - `NotFound` when no document matches `id`.
    pub fn remove(&self, id: &Value) -> MapperResult<F::Entity> {
        self.ensure_open()?;
        let deleted = self
            .collection
            .find_one_and_delete(id)
            .map_err(MapperError::Store)?
            .ok_or_else(|| MapperError::NotFound(id.clone()))?;

        Ok(self.factory.construct(document_to_entity(&deleted)?))
    }

    /// The bound factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn ensure_open(&self) -> MapperResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(MapperError::SessionDestroyed);
        }
        Ok(())
    }

    /// Serializes the entity to its field map and enforces the factory
    /// precondition shared by `save` and `update`.
    fn recognized_fields(&self, entity: &F::Entity) -> MapperResult<FieldMap> {
        let fields = match serde_json::to_value(entity) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(MapperError::InvalidData(format!(
                    "entity does not serialize to a JSON object: {other}"
                )));
            }
            Err(err) => {
                return Err(MapperError::InvalidData(format!(
                    "entity serialization failed: {err}"
                )));
            }
        };

        if !self.factory.is_instance_of(&fields) {
            return Err(MapperError::TypeMismatch {
                expected: self.factory.name().to_string(),
            });
        }
        Ok(fields)
    }
}
