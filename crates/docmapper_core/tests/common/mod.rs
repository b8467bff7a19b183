#![allow(dead_code)]

use docmapper_core::{
    generate_entity_id, DataMapper, EntityFactory, FieldMap, MapperConfig, SqliteStoreClient,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Sample domain entity used across the integration suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub done: bool,
}

impl Todo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: generate_entity_id(),
            text: text.into(),
            done: false,
        }
    }

    pub fn id_value(&self) -> Value {
        json!(self.id)
    }
}

/// Factory for [`Todo`] entities.
///
/// Mirrors the coercing-constructor contract: `construct` is total and mints
/// an identifier when the field map carries none (or an invalid one), while
/// `is_instance_of` only accepts fully well-formed shapes.
pub struct TodoFactory;

impl EntityFactory for TodoFactory {
    type Entity = Todo;

    fn name(&self) -> &str {
        "Todo"
    }

    fn construct(&self, fields: FieldMap) -> Todo {
        let id = fields
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| Uuid::parse_str(id).is_ok())
            .map(str::to_string)
            .unwrap_or_else(generate_entity_id);
        let text = fields
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let done = fields.get("done").and_then(Value::as_bool).unwrap_or(false);

        Todo { id, text, done }
    }

    fn is_instance_of(&self, fields: &FieldMap) -> bool {
        let id_ok = fields
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| Uuid::parse_str(id).is_ok());

        id_ok
            && fields.get("text").is_some_and(Value::is_string)
            && fields.get("done").is_some_and(Value::is_boolean)
    }
}

/// In-memory mapper session bound to `collection`, ready for CRUD.
pub fn todo_mapper(collection: &str) -> DataMapper<TodoFactory> {
    DataMapper::initialize(
        &SqliteStoreClient,
        MapperConfig {
            store_uri: Some("sqlite://memory".to_string()),
            collection_name: Some(collection.to_string()),
            factory: Some(TodoFactory),
        },
    )
    .unwrap()
}
