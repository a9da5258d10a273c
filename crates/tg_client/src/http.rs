use crate::config::{ClientConfig, ConfigError};
use crate::{FetchError, NodeSource};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tg_model::Node;
use tracing::{debug, warn};

pub const NODES_PATH: &str = "/node";

const USER_AGENT: &str = concat!("tgrust/", env!("CARGO_PKG_VERSION"));

/// Read-only client for the Trustgrid REST API.
#[derive(Clone)]
pub struct TrustgridClient {
    client: Client,
    config: ClientConfig,
}

impl TrustgridClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ConfigError::Client)?;
        Ok(Self { client, config })
    }

    /// Issues a single GET and decodes the JSON body. No retries.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(credentials) = &self.config.credentials {
            request = request.header(AUTHORIZATION, credentials.header_value());
        }

        debug!(target: "client::http", "GET {}", url);
        let response = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            warn!(target: "client::http", "GET {} responded {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.config
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| FetchError::InvalidUrl {
                path: path.to_string(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl NodeSource for TrustgridClient {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        let nodes: Vec<Node> = self.get(NODES_PATH).await?;
        debug!(target: "client::http", "fetched {} nodes", nodes.len());
        Ok(nodes)
    }
}
