pub mod diagnostics;
mod inventory;
mod nodes;
pub mod resource;
pub mod schema;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use inventory::InMemoryNodes;
pub use nodes::{
    fetch_matching, filter_id, node_data_source_schema, NodeDataSource, NodesState, ReadError,
    NODES_DATA_SOURCE, NODE_IDS_ATTR,
};
pub use resource::{MemoryResourceData, ResourceData, StateError};
pub use schema::Schema;

use async_trait::async_trait;
use std::sync::Arc;
use tg_client::NodeSource;

/// A read-only data source as seen by the host framework.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    async fn read(&self, data: &mut dyn ResourceData) -> Diagnostics;
}

pub type DynDataSource = Arc<dyn DataSource>;

pub struct Provider {
    data_sources: Vec<DynDataSource>,
}

impl Provider {
    pub fn new(data_sources: Vec<DynDataSource>) -> Self {
        Self { data_sources }
    }

    /// Provider exposing `tg_nodes` backed by `source`.
    pub fn with_node_source<S: NodeSource + 'static>(source: S) -> Self {
        Self::new(vec![Arc::new(NodeDataSource::new(source))])
    }

    pub fn data_source(&self, type_name: &str) -> Option<DynDataSource> {
        self.data_sources
            .iter()
            .find(|ds| ds.type_name() == type_name)
            .cloned()
    }

    pub fn data_source_names(&self) -> Vec<&'static str> {
        self.data_sources.iter().map(|ds| ds.type_name()).collect()
    }
}
