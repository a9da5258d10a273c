use async_trait::async_trait;
use tg_client::{FetchError, NodeSource};
use tg_model::Node;

pub struct InMemoryNodes {
    nodes: Vec<Node>,
}

impl InMemoryNodes {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl NodeSource for InMemoryNodes {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        Ok(self.nodes.clone())
    }
}
