use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use gamedex_sync::{catalog_from_config, SyncConfig};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "gamedex-cli")]
#[command(about = "Keeps the game catalog in sync with its source sites")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report records whose source shows a newer update date.
    Check {
        /// Reconcile changed records right away and save the catalog.
        #[arg(long)]
        apply: bool,
    },
    /// Refetch and reconcile every record.
    Update,
    /// Track a new game from its page URL.
    Add {
        url: String,
        /// Adapter name to use instead of matching the URL.
        #[arg(long)]
        adapter: Option<String>,
        /// Manual field value as KEY=VALUE; VALUE is read as JSON when it parses.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        properties: Vec<String>,
    },
}

fn parse_properties(pairs: &[String]) -> Result<Option<Map<String, Value>>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut properties = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got {pair:?}");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        properties.insert(key.trim().to_string(), value);
    }
    Ok(Some(properties))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "gamedex=info,warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();
    let mut catalog = catalog_from_config(&config)?;
    catalog.load()?;

    match cli.command.unwrap_or(Commands::Check { apply: false }) {
        Commands::Check { apply } => {
            let updated = catalog.check_all_for_updates(apply).await;
            if apply {
                catalog.save()?;
            }
            println!("check complete: records={} updated={}", catalog.len(), updated.len());
            for record in &updated {
                println!("  {} [{}] {}", record.title, record.last_version, record.updated);
            }
        }
        Commands::Update => {
            let summary = catalog.update_all().await;
            catalog.save()?;
            println!("update complete: {}", serde_json::to_string(&summary)?);
        }
        Commands::Add {
            url,
            adapter,
            properties,
        } => {
            let properties = parse_properties(&properties)?;
            let record = catalog
                .add_from_url(&url, properties, adapter.as_deref())
                .await?;
            catalog.save()?;
            println!("added: id={} title={:?}", record.id, record.title);
        }
    }

    Ok(())
}
