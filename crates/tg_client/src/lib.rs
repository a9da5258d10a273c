pub mod config;
mod http;

pub use config::{ApiCredentials, ClientConfig, ConfigError};
pub use http::{TrustgridClient, NODES_PATH};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tg_model::Node;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("response from {url} could not be decoded")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid endpoint path `{path}`: {reason}")]
    InvalidUrl { path: String, reason: String },
}

/// Anything able to hand out the full node collection.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError>;
}

#[async_trait]
impl<S: NodeSource + ?Sized> NodeSource for Arc<S> {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        (**self).list_nodes().await
    }
}
