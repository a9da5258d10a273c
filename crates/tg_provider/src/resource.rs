use crate::schema::{AttributeMode, Schema};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("attribute `{0}` is not declared in the schema")]
    UnknownAttribute(String),
    #[error("attribute `{0}` is not computed and cannot be set by a read")]
    NotComputed(String),
    #[error("attribute `{name}` expects a {expected}")]
    TypeMismatch { name: String, expected: String },
}

/// The host's view of one data source invocation: the user configuration
/// going in, the identifier and computed attributes coming out.
pub trait ResourceData: Send {
    fn config(&self) -> &Value;
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
    fn set(&mut self, attribute: &str, value: Value) -> Result<(), StateError>;
}

/// Schema-checked `ResourceData` kept in memory.
#[derive(Debug, Clone)]
pub struct MemoryResourceData {
    schema: Schema,
    config: Value,
    id: Option<String>,
    state: BTreeMap<String, Value>,
}

impl MemoryResourceData {
    pub fn new(schema: Schema, config: Value) -> Self {
        Self {
            schema,
            config,
            id: None,
            state: BTreeMap::new(),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.state.get(attribute)
    }

    pub fn state(&self) -> &BTreeMap<String, Value> {
        &self.state
    }
}

impl ResourceData for MemoryResourceData {
    fn config(&self) -> &Value {
        &self.config
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set(&mut self, attribute: &str, value: Value) -> Result<(), StateError> {
        let declared = self
            .schema
            .attribute(attribute)
            .ok_or_else(|| StateError::UnknownAttribute(attribute.to_string()))?;
        if declared.mode != AttributeMode::Computed {
            return Err(StateError::NotComputed(attribute.to_string()));
        }
        if !declared.value_type.accepts(&value) {
            return Err(StateError::TypeMismatch {
                name: attribute.to_string(),
                expected: declared.value_type.label(),
            });
        }
        self.state.insert(attribute.to_string(), value);
        Ok(())
    }
}
