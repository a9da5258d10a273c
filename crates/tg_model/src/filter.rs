use crate::Node;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

pub const TAGS_ATTR: &str = "tags";
pub const EXCLUDE_TAGS_ATTR: &str = "exclude_tags";

pub type TagMap = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("configuration must be an object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("attribute `{field}` must be a map of strings, found {found}")]
    FieldType {
        field: &'static str,
        found: &'static str,
    },
    #[error("attribute `{field}` entry `{key}` must be a string, found {found}")]
    ValueType {
        field: &'static str,
        key: String,
        found: &'static str,
    },
}

/// Tag criteria selecting a subset of nodes.
///
/// A node is selected when it carries every `tags` entry with the same value
/// and none of the `exclude_tags` entries with the same value. A key the node
/// does not carry never satisfies a required entry and never triggers an
/// excluded one, whatever the filter value (including the empty string).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub tags: TagMap,
    pub exclude_tags: TagMap,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn exclude(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exclude_tags.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.exclude_tags.is_empty()
    }

    /// Extracts the filter from an untyped data source configuration.
    ///
    /// Both attributes are optional; `null` counts as absent. Keys other than
    /// `tags` and `exclude_tags` are ignored.
    pub fn from_config(config: &Value) -> Result<Self, DecodeError> {
        let object = match config {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            other => {
                return Err(DecodeError::NotAnObject {
                    found: json_kind(other),
                })
            }
        };
        Ok(Self {
            tags: decode_tag_map(object, TAGS_ATTR)?,
            exclude_tags: decode_tag_map(object, EXCLUDE_TAGS_ATTR)?,
        })
    }

    pub fn matches(&self, node: &Node) -> bool {
        let required = self
            .tags
            .iter()
            .all(|(key, value)| node.tag(key) == Some(value.as_str()));
        if !required {
            return false;
        }
        !self
            .exclude_tags
            .iter()
            .any(|(key, value)| node.tag(key) == Some(value.as_str()))
    }
}

fn decode_tag_map(object: &Map<String, Value>, field: &'static str) -> Result<TagMap, DecodeError> {
    let entries = match object.get(field) {
        None | Some(Value::Null) => return Ok(TagMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(DecodeError::FieldType {
                field,
                found: json_kind(other),
            })
        }
    };
    entries
        .iter()
        .map(|(key, value)| match value {
            Value::String(value) => Ok((key.clone(), value.clone())),
            other => Err(DecodeError::ValueType {
                field,
                key: key.clone(),
                found: json_kind(other),
            }),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(tags: &[(&str, &str)]) -> Node {
        Node {
            uid: "n1".into(),
            name: "edge-1".into(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn prod_infra() -> Node {
        node(&[("env", "prod"), ("team", "infra")])
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = NodeFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&prod_infra()));
        assert!(filter.matches(&node(&[])));
    }

    #[test]
    fn required_tag_must_be_equal() {
        assert!(NodeFilter::new().require("env", "prod").matches(&prod_infra()));
        assert!(!NodeFilter::new()
            .require("env", "staging")
            .matches(&prod_infra()));
    }

    #[test]
    fn required_tag_absent_is_a_mismatch() {
        let filter = NodeFilter::new().require("region", "eu");
        assert!(!filter.matches(&prod_infra()));
        let filter = NodeFilter::new().require("region", "");
        assert!(!filter.matches(&prod_infra()));
    }

    #[test]
    fn excluded_tag_rejects_on_equal_value() {
        let filter = NodeFilter::new().exclude("team", "infra");
        assert!(!filter.matches(&prod_infra()));
        assert!(filter.matches(&node(&[("env", "prod")])));
        assert!(filter.matches(&node(&[("team", "apps")])));
    }

    #[test]
    fn excluded_empty_value_ignores_absent_tag() {
        let filter = NodeFilter::new().exclude("team", "");
        assert!(filter.matches(&node(&[("env", "prod")])));
        assert!(!filter.matches(&node(&[("team", "")])));
    }

    #[test]
    fn required_and_excluded_are_independent() {
        let filter = NodeFilter::new()
            .require("env", "prod")
            .exclude("team", "infra");
        assert!(!filter.matches(&prod_infra()));
        assert!(filter.matches(&node(&[("env", "prod"), ("team", "apps")])));
        assert!(!filter.matches(&node(&[("env", "dev"), ("team", "apps")])));
    }

    #[test]
    fn comparison_is_exact() {
        let filter = NodeFilter::new().require("env", "Prod");
        assert!(!filter.matches(&prod_infra()));
        let filter = NodeFilter::new().require("env", "prod ");
        assert!(!filter.matches(&prod_infra()));
    }

    #[test]
    fn decodes_both_attributes() {
        let config = json!({
            "tags": {"env": "prod"},
            "exclude_tags": {"team": "infra"},
            "node_ids": ["ignored"],
        });
        let filter = NodeFilter::from_config(&config).expect("decode");
        assert_eq!(
            filter,
            NodeFilter::new().require("env", "prod").exclude("team", "infra")
        );
    }

    #[test]
    fn absent_or_null_attributes_decode_empty() {
        assert!(NodeFilter::from_config(&json!({})).unwrap().is_empty());
        assert!(NodeFilter::from_config(&Value::Null).unwrap().is_empty());
        let filter =
            NodeFilter::from_config(&json!({"tags": null, "exclude_tags": {}})).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn non_string_tag_value_is_rejected() {
        let err = NodeFilter::from_config(&json!({"tags": {"env": "prod", "tier": 3}}))
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::ValueType {
                field: TAGS_ATTR,
                key: "tier".into(),
                found: "number",
            }
        );
        assert!(err.to_string().contains("tier"));
    }

    #[test]
    fn non_map_attribute_is_rejected() {
        let err = NodeFilter::from_config(&json!({"exclude_tags": ["team"]})).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldType {
                field: EXCLUDE_TAGS_ATTR,
                found: "list",
            }
        );
    }

    #[test]
    fn non_object_config_is_rejected() {
        let err = NodeFilter::from_config(&json!("tags")).unwrap_err();
        assert_eq!(err, DecodeError::NotAnObject { found: "string" });
    }
}
