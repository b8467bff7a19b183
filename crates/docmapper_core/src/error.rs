//! Mapper error taxonomy.
//!
//! # Responsibility
//! - Give every mapper failure a semantic variant: configuration problems,
//!   type mismatches, missing targets, store transport failures.
//!
//! # Invariants
//! - Store failures surface immediately and unmodified; nothing is retried.
//! - Configuration errors name the offending option.

use crate::mapping::MappingError;
use crate::store::StoreError;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MapperResult<T> = Result<T, MapperError>;

/// Failure of a mapper lifecycle or CRUD operation.
#[derive(Debug)]
pub enum MapperError {
    /// Required configuration option absent or empty.
    MissingOption(&'static str),
    /// Configuration option present but malformed or unusable.
    InvalidOption(&'static str),
    /// Entity was not recognized by the bound factory.
    TypeMismatch { expected: String },
    /// No document matches the target identifier.
    NotFound(Value),
    /// Connection establishment failed; propagated from the store client.
    Connection(StoreError),
    /// A CRUD call failed inside the store client.
    Store(StoreError),
    /// Operation invoked on a destroyed session.
    SessionDestroyed,
    /// Entity or stored document could not be mapped to a field set.
    InvalidData(String),
}

impl Display for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOption(name) => write!(f, "configuration option `{name}` is missing"),
            Self::InvalidOption(name) => write!(f, "configuration option `{name}` is invalid"),
            Self::TypeMismatch { expected } => {
                write!(f, "can only persist instances of {expected}")
            }
            Self::NotFound(id) => write!(f, "no document matches identifier {id}"),
            Self::Connection(err) => write!(f, "store connection failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::SessionDestroyed => write!(f, "mapper session has been destroyed"),
            Self::InvalidData(message) => write!(f, "{message}"),
        }
    }
}

impl Error for MapperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) | Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MappingError> for MapperError {
    fn from(value: MappingError) -> Self {
        Self::InvalidData(value.to_string())
    }
}
