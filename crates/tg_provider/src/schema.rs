use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "elem", rename_all = "snake_case")]
pub enum ValueType {
    String,
    Map(Box<ValueType>),
    Set(Box<ValueType>),
}

impl ValueType {
    pub fn map_of(elem: ValueType) -> Self {
        ValueType::Map(Box::new(elem))
    }

    pub fn set_of(elem: ValueType) -> Self {
        ValueType::Set(Box::new(elem))
    }

    /// Whether `value` has this shape. `null` stands for an unset attribute.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueType::String, Value::String(_)) => true,
            (ValueType::Map(elem), Value::Object(entries)) => {
                entries.values().all(|v| elem.accepts_element(v))
            }
            (ValueType::Set(elem), Value::Array(items)) => {
                items.iter().all(|v| elem.accepts_element(v))
            }
            _ => false,
        }
    }

    fn accepts_element(&self, value: &Value) -> bool {
        !value.is_null() && self.accepts(value)
    }

    pub fn label(&self) -> String {
        match self {
            ValueType::String => "string".into(),
            ValueType::Map(elem) => format!("map of {}", elem.label()),
            ValueType::Set(elem) => format!("set of {}", elem.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    Required,
    Optional,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub mode: AttributeMode,
}

/// Attribute declarations the host uses to validate configuration and state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}
