mod nodes;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tg_provider::node_data_source_schema;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tg_cli", about = "Run the Trustgrid node data source outside of a host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tg_nodes schema as JSON
    Schema,
    /// Read tg_nodes and print the resulting state
    Nodes(nodes::NodesCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&node_data_source_schema())?);
        }
        Commands::Nodes(cmd) => nodes::run(cmd).await?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
