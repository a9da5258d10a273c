use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tg_client::config::API_HOST_VAR;
use tg_client::{ClientConfig, TrustgridClient};
use tg_model::{Node, EXCLUDE_TAGS_ATTR, TAGS_ATTR};
use tg_provider::{
    MemoryResourceData, Provider, ResourceData, Severity, NODES_DATA_SOURCE, NODE_IDS_ATTR,
};
use tracing::info;

#[derive(Args)]
pub struct NodesCmd {
    /// Required tag, repeatable
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
    /// Excluded tag, repeatable
    #[arg(long = "exclude-tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub exclude_tags: Vec<(String, String)>,
    /// Read nodes from a JSON or YAML file instead of the API
    #[arg(long)]
    pub inventory: Option<PathBuf>,
    /// Overrides TG_API_HOST
    #[arg(long)]
    pub api_host: Option<String>,
    #[arg(long, default_value = "json", value_parser = ["json", "ids"])]
    pub format: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InventoryFile {
    List(Vec<Node>),
    Wrapped { nodes: Vec<Node> },
}

pub async fn run(cmd: NodesCmd) -> Result<()> {
    let provider = match &cmd.inventory {
        Some(path) => {
            let nodes = load_inventory(path)?;
            info!("Loaded {} nodes from {}", nodes.len(), path.display());
            Provider::with_node_source(tg_provider::InMemoryNodes::new(nodes))
        }
        None => {
            let config = ClientConfig::from_lookup(|name| match (name, &cmd.api_host) {
                (API_HOST_VAR, Some(host)) => Some(host.clone()),
                _ => std::env::var(name).ok(),
            })?;
            info!("Using inventory API at {}", config.base_url);
            Provider::with_node_source(TrustgridClient::new(config)?)
        }
    };

    let data_source = provider
        .data_source(NODES_DATA_SOURCE)
        .context("tg_nodes data source not registered")?;
    let mut data = MemoryResourceData::new(data_source.schema(), filter_config(&cmd));
    let diagnostics = data_source.read(&mut data).await;

    for diagnostic in &diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "error",
        };
        match &diagnostic.detail {
            Some(detail) => eprintln!("{label}: {}: {detail}", diagnostic.summary),
            None => eprintln!("{label}: {}", diagnostic.summary),
        }
    }
    if diagnostics.has_errors() {
        bail!("reading {} failed", NODES_DATA_SOURCE);
    }

    let node_ids = data.get(NODE_IDS_ATTR).cloned().unwrap_or(Value::Null);
    match cmd.format.as_str() {
        "ids" => {
            for id in node_ids.as_array().into_iter().flatten() {
                if let Some(id) = id.as_str() {
                    println!("{id}");
                }
            }
        }
        _ => {
            let state = json!({ "id": data.id(), NODE_IDS_ATTR: node_ids });
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }
    Ok(())
}

fn filter_config(cmd: &NodesCmd) -> Value {
    let to_map = |pairs: &[(String, String)]| -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<String, Value>>(),
        )
    };
    json!({
        TAGS_ATTR: to_map(&cmd.tags),
        EXCLUDE_TAGS_ATTR: to_map(&cmd.exclude_tags),
    })
}

fn load_inventory(path: &Path) -> Result<Vec<Node>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read inventory {}", path.display()))?;
    let file: InventoryFile = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&data)
            .with_context(|| format!("parse inventory {}", path.display()))?,
        _ => serde_yaml::from_str(&data)
            .with_context(|| format!("parse inventory {}", path.display()))?,
    };
    Ok(match file {
        InventoryFile::List(nodes) => nodes,
        InventoryFile::Wrapped { nodes } => nodes,
    })
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
