use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crm_coach::config::Config;
use crm_coach::embeddings::OpenAiEmbedder;
use crm_coach::llm::{Completer, OpenAiClient};
use crm_coach::progress::{AgentProgress, ProgressSink};
use crm_coach::store::SnapshotStore;
use crm_coach::vector::{ChromaStore, DealIndex, EmbeddingCache, MetadataFilter};
use crm_coach::SalesAssistant;

#[derive(Parser)]
#[command(name = "crm-coach")]
#[command(about = "AI sales assistant over a CRM snapshot", long_about = None)]
#[command(version)]
struct Cli {
    /// CRM snapshot (JSON with deals, contacts, communications, activities)
    #[arg(long, global = true, env = "CRM_COACH_DATA", default_value = "crm.json")]
    data: PathBuf,

    /// Config file (defaults to ~/.config/crm-coach/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every deal and rebuild the similarity index
    Index,

    /// Find deals similar to a free-text query
    Search {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Drop results whose metadata field equals the value (key=value)
        #[arg(long, value_parser = parse_key_value)]
        exclude: Vec<(String, Value)>,

        /// Keep only results whose metadata field equals the value (key=value)
        #[arg(long = "where", value_parser = parse_key_value)]
        filter: Vec<(String, Value)>,
    },

    /// Coaching plan for a deal from a panel of specialists
    Coach { deal_id: String },

    /// Refined rebuttal to a customer objection
    Objection { deal_id: String, objection: String },

    /// Why a closed deal was won or lost
    Explain { deal_id: String },

    /// Behavioral persona and communication advice for a contact
    Persona { contact_id: String },
}

/// `key=value`; the value is read as JSON when it parses (`true`, `42`),
/// otherwise as a string.
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_assistant(cli: &Cli, config: &Config, progress: ProgressSink) -> Result<SalesAssistant> {
    let store = SnapshotStore::from_file(&cli.data)
        .with_context(|| format!("Failed to load CRM snapshot {}", cli.data.display()))?;

    let client = Arc::new(OpenAiClient::with_config(&config.openai)?);
    let embedder = Arc::new(OpenAiEmbedder::new(
        client.clone(),
        config.openai.embedding_model.clone(),
    ));

    let managed = match &config.vector_store.chroma_url {
        Some(url) => Some(ChromaStore::new(
            url,
            config.vector_store.collection.clone(),
            embedder.clone(),
        )?),
        None => None,
    };
    let index = DealIndex::new(
        embedder,
        EmbeddingCache::new(config.vector_store.cache_path()),
        managed,
    );

    Ok(SalesAssistant::new(
        Completer::from_config(client, &config.openai),
        Arc::new(store),
        Arc::new(index),
        config.agents.clone(),
    )
    .with_progress(progress))
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let issues = config.check();
    if !issues.is_empty() {
        return Err(anyhow!("Configuration incomplete: {}", issues.join("; ")));
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<AgentProgress>();
    let progress_task = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            log::info!("{}", progress);
        }
    });

    let assistant = build_assistant(&cli, &config, ProgressSink::new(tx))?;

    let result = match cli.command {
        Commands::Index => print_json(&assistant.build_index().await?),
        Commands::Search {
            query,
            limit,
            exclude,
            filter,
        } => {
            let mut metadata_filter = MetadataFilter::new();
            for (key, value) in exclude {
                metadata_filter = metadata_filter.exclude(key, value);
            }
            for (key, value) in filter {
                metadata_filter = metadata_filter.require(key, value);
            }
            print_json(&assistant.search(&query, &metadata_filter, limit).await?)
        }
        Commands::Coach { deal_id } => print_json(&assistant.coach_deal(&deal_id).await?),
        Commands::Objection { deal_id, objection } => {
            print_json(&assistant.handle_objection(&deal_id, &objection).await?)
        }
        Commands::Explain { deal_id } => print_json(&assistant.explain_outcome(&deal_id).await?),
        Commands::Persona { contact_id } => print_json(&assistant.build_persona(&contact_id).await?),
    };

    // Closes the progress channel so the forwarder drains and exits.
    drop(assistant);
    let _ = progress_task.await;
    result
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
