use crate::diagnostics::Diagnostics;
use crate::resource::{ResourceData, StateError};
use crate::schema::{Attribute, AttributeMode, Schema, ValueType};
use crate::DataSource;
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use thiserror::Error;
use tg_client::{FetchError, NodeSource};
use tg_model::{DecodeError, NodeFilter, NodeId, TagMap, EXCLUDE_TAGS_ATTR, TAGS_ATTR};
use tracing::{error, info, instrument};

pub const NODES_DATA_SOURCE: &str = "tg_nodes";
pub const NODE_IDS_ATTR: &str = "node_ids";

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("invalid node filter")]
    Decode(#[from] DecodeError),
    #[error("failed to list nodes")]
    Fetch(#[from] FetchError),
    #[error("failed to record node_ids")]
    State(#[from] StateError),
}

/// Outcome of a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodesState {
    pub id: String,
    pub node_ids: BTreeSet<NodeId>,
}

pub fn node_data_source_schema() -> Schema {
    Schema {
        description: "Fetches nodes from Trustgrid",
        attributes: vec![
            Attribute {
                name: TAGS_ATTR,
                description: "Tag Filters",
                value_type: ValueType::map_of(ValueType::String),
                mode: AttributeMode::Optional,
            },
            Attribute {
                name: EXCLUDE_TAGS_ATTR,
                description: "Exclude Tag Filters",
                value_type: ValueType::map_of(ValueType::String),
                mode: AttributeMode::Optional,
            },
            Attribute {
                name: NODE_IDS_ATTR,
                description: "List of matching nodes",
                value_type: ValueType::set_of(ValueType::String),
                mode: AttributeMode::Computed,
            },
        ],
    }
}

/// Lists the whole node collection once and keeps the uids the filter selects.
pub async fn fetch_matching<S>(source: &S, filter: &NodeFilter) -> Result<BTreeSet<NodeId>, FetchError>
where
    S: NodeSource + ?Sized,
{
    let nodes = source.list_nodes().await?;
    let total = nodes.len();
    let matched: BTreeSet<NodeId> = nodes
        .into_iter()
        .filter(|node| filter.matches(node))
        .map(|node| node.uid)
        .collect();
    info!(
        target: "provider::nodes",
        "{} of {} nodes matched filter",
        matched.len(),
        total
    );
    Ok(matched)
}

/// Stable identifier of a read: sha256 over the sorted filter entries.
/// Every string is length-prefixed so distinct filters never share an input.
pub fn filter_id(filter: &NodeFilter) -> String {
    let mut hasher = Sha256::new();
    for (section, tags) in [
        (TAGS_ATTR, &filter.tags),
        (EXCLUDE_TAGS_ATTR, &filter.exclude_tags),
    ] {
        hash_str(&mut hasher, section);
        hash_tags(&mut hasher, tags);
    }
    hex::encode(hasher.finalize())
}

fn hash_tags(hasher: &mut Sha256, tags: &TagMap) {
    hasher.update((tags.len() as u64).to_le_bytes());
    for (key, value) in tags {
        hash_str(hasher, key);
        hash_str(hasher, value);
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// The `tg_nodes` data source. The node source is injected by the caller.
pub struct NodeDataSource<S> {
    source: S,
}

impl<S: NodeSource> NodeDataSource<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[instrument(skip(self), target = "provider::nodes")]
    pub async fn read_state(&self, filter: &NodeFilter) -> Result<NodesState, ReadError> {
        let node_ids = fetch_matching(&self.source, filter).await?;
        Ok(NodesState {
            id: filter_id(filter),
            node_ids,
        })
    }

    /// Decodes the configuration, reads, and writes the state back. Nothing is
    /// written unless every step succeeded.
    pub async fn read_into(&self, data: &mut dyn ResourceData) -> Result<NodesState, ReadError> {
        let filter = NodeFilter::from_config(data.config())?;
        let state = self.read_state(&filter).await?;
        let node_ids = Value::from_iter(state.node_ids.iter().cloned());
        data.set(NODE_IDS_ATTR, node_ids)?;
        data.set_id(state.id.clone());
        Ok(state)
    }
}

#[async_trait]
impl<S: NodeSource> DataSource for NodeDataSource<S> {
    fn type_name(&self) -> &'static str {
        NODES_DATA_SOURCE
    }

    fn schema(&self) -> Schema {
        node_data_source_schema()
    }

    async fn read(&self, data: &mut dyn ResourceData) -> Diagnostics {
        match self.read_into(data).await {
            Ok(_) => Diagnostics::new(),
            Err(err) => {
                error!(target: "provider::nodes", "read failed: {err}");
                Diagnostics::from_error(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InMemoryNodes;
    use crate::resource::MemoryResourceData;
    use serde_json::json;
    use tg_model::Node;

    fn node(uid: &str, tags: &[(&str, &str)]) -> Node {
        Node {
            uid: uid.into(),
            name: format!("edge-{uid}"),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn inventory() -> InMemoryNodes {
        InMemoryNodes::new(vec![
            node("n1", &[("env", "prod"), ("team", "infra")]),
            node("n2", &[("env", "prod"), ("team", "apps")]),
            node("n3", &[("env", "staging")]),
            node("n4", &[]),
        ])
    }

    struct Unreachable;

    #[async_trait]
    impl NodeSource for Unreachable {
        async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
            Err(FetchError::Status {
                url: "https://api.trustgrid.io/node".into(),
                status: 502,
                body: "bad gateway".into(),
            })
        }
    }

    fn data(config: Value) -> MemoryResourceData {
        MemoryResourceData::new(node_data_source_schema(), config)
    }

    #[tokio::test]
    async fn empty_filter_selects_every_node() {
        let ids = fetch_matching(&inventory(), &NodeFilter::new()).await.unwrap();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn read_writes_matching_ids_and_id() {
        let source = NodeDataSource::new(inventory());
        let mut data = data(json!({
            "tags": {"env": "prod"},
            "exclude_tags": {"team": "infra"}
        }));

        let diagnostics = source.read(&mut data).await;

        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(data.get(NODE_IDS_ATTR), Some(&json!(["n2"])));
        let expected = filter_id(&NodeFilter::new().require("env", "prod").exclude("team", "infra"));
        assert_eq!(data.id(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn repeated_reads_share_an_id() {
        let source = NodeDataSource::new(inventory());
        let filter = NodeFilter::new().require("env", "prod");
        let first = source.read_state(&filter).await.unwrap();
        let second = source.read_state(&filter.clone()).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn id_follows_filter_contents() {
        let a = NodeFilter::new().require("env", "prod").require("team", "infra");
        let b = NodeFilter::new().require("team", "infra").require("env", "prod");
        assert_eq!(filter_id(&a), filter_id(&b));

        let moved = NodeFilter::new().require("env", "prod").exclude("team", "infra");
        assert_ne!(filter_id(&a), filter_id(&moved));
        assert_ne!(filter_id(&NodeFilter::new()), filter_id(&a));

        let split = NodeFilter::new().require("ab", "c");
        let joined = NodeFilter::new().require("a", "bc");
        assert_ne!(filter_id(&split), filter_id(&joined));
        assert_eq!(filter_id(&a).len(), 64);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_state_untouched() {
        let source = NodeDataSource::new(Unreachable);
        let mut data = data(json!({"tags": {"env": "prod"}}));

        let diagnostics = source.read(&mut data).await;

        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.summary, "failed to list nodes");
        assert!(diagnostic.detail.as_deref().unwrap().contains("502"));
        assert!(data.id().is_none());
        assert!(data.state().is_empty());
    }

    #[tokio::test]
    async fn rejected_state_write_sets_no_id() {
        let source = NodeDataSource::new(inventory());
        let schema = Schema {
            description: "no computed attributes",
            attributes: Vec::new(),
        };
        let mut data = MemoryResourceData::new(schema, json!({"tags": {"env": "prod"}}));

        let diagnostics = source.read(&mut data).await;

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.summary, "failed to record node_ids");
        assert_eq!(
            diagnostic.detail.as_deref(),
            Some("attribute `node_ids` is not declared in the schema")
        );
        assert!(data.id().is_none());
        assert!(data.state().is_empty());
    }

    #[tokio::test]
    async fn malformed_config_is_reported_before_fetching() {
        let source = NodeDataSource::new(Unreachable);
        let mut data = data(json!({"tags": {"env": true}}));

        let err = source.read_into(&mut data).await.unwrap_err();

        assert!(matches!(err, ReadError::Decode(_)), "{err:?}");
        assert!(data.id().is_none());
    }

    #[test]
    fn schema_declares_filter_inputs_and_computed_ids() {
        let schema = node_data_source_schema();
        assert_eq!(schema.attribute(TAGS_ATTR).unwrap().mode, AttributeMode::Optional);
        assert_eq!(
            schema.attribute(EXCLUDE_TAGS_ATTR).unwrap().mode,
            AttributeMode::Optional
        );
        let ids = schema.attribute(NODE_IDS_ATTR).unwrap();
        assert_eq!(ids.mode, AttributeMode::Computed);
        assert_eq!(ids.value_type, ValueType::set_of(ValueType::String));
    }
}
