mod filter;

pub use filter::{DecodeError, NodeFilter, TagMap, EXCLUDE_TAGS_ATTR, TAGS_ATTR};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};
use std::collections::HashMap;

pub type NodeId = String;

/// A managed endpoint as returned by the inventory `/node` endpoint.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Node {
    pub uid: NodeId,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub fqdn: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub cluster: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub config: NodeConfig,
}

impl Node {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeConfig {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub snmp: SnmpConfig,
}

/// SNMP settings of a node. Only `enabled` is interpreted, everything else
/// is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SnmpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}
