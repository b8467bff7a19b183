//! Store client abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the collaborator contract the mapper drives: connect to a store,
//!   bind a collection, run document CRUD.
//! - Isolate driver details (SQL, connection handling) behind the contract.
//!
//! # Invariants
//! - `find_one_and_update` returns the post-update document state.
//! - `find_one_and_delete` returns the pre-deletion document state.
//! - Both return `None` for a missing identifier instead of failing.

use crate::mapping::FieldMap;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod query;
pub mod sqlite;

pub use query::{Filter, FindOptions, Pagination, Projection, SortOrder, Sorting};
pub use sqlite::{SqliteStoreClient, SQLITE_URI_SCHEME};

pub type StoreResult<T> = Result<T, StoreError>;

/// Transport-level failure raised by a store client.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    UnsupportedScheme { uri: String },
    InvalidCollectionName(String),
    ConnectionClosed,
    Serialization(serde_json::Error),
    Corrupt(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedScheme { uri } => {
                write!(f, "store uri has an unsupported scheme: `{uri}`")
            }
            Self::InvalidCollectionName(name) => {
                write!(f, "collection name is not a valid identifier: `{name}`")
            }
            Self::ConnectionClosed => write!(f, "store connection is closed"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::Corrupt(message) => write!(f, "corrupt stored document: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Entry point to one kind of document store.
pub trait StoreClient {
    /// URI prefix this client expects, e.g. `sqlite://`. The mapper rejects
    /// configuration whose `storeUri` does not start with it.
    fn scheme(&self) -> &str;

    /// Opens a connection to the store at `uri`.
    fn connect(&self, uri: &str) -> StoreResult<Box<dyn StoreConnection>>;
}

impl std::fmt::Debug for dyn StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StoreConnection")
    }
}

impl std::fmt::Debug for dyn DocumentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn DocumentCollection")
    }
}

/// One open connection to a document store.
pub trait StoreConnection: Send + Sync {
    /// Binds a named collection, creating it on first use.
    fn collection(&self, name: &str) -> StoreResult<Box<dyn DocumentCollection>>;

    /// Closes the connection. With `force`, in-flight work may be aborted;
    /// the exact semantics belong to the store client.
    fn close(&self, force: bool) -> StoreResult<()>;
}

/// Document CRUD over one bound collection.
pub trait DocumentCollection: Send + Sync {
    /// Inserts one document. Identifier uniqueness is whatever the store
    /// enforces on the reserved key.
    fn insert(&self, document: &FieldMap) -> StoreResult<()>;

    /// Returns documents matching `filter`, shaped and windowed by
    /// `options`, in the requested sort order (natural order when unsorted).
    fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<FieldMap>>;

    /// Atomically replaces all non-identifier fields of the document whose
    /// reserved key equals `id` with `changes`, returning the post-update
    /// state. `None` when no document matches.
    fn find_one_and_update(&self, id: &Value, changes: &FieldMap)
        -> StoreResult<Option<FieldMap>>;

    /// Atomically deletes the document whose reserved key equals `id`,
    /// returning its pre-deletion state. `None` when no document matches.
    fn find_one_and_delete(&self, id: &Value) -> StoreResult<Option<FieldMap>>;
}
