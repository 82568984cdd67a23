mod chat;
mod error;
mod llm_client;
mod server;
mod store;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;

use chat::{Category, ChatPipeline, ContextBuilder};
use llm_client::{build_llm_client_from_env, EchoLlmClient, SharedLlmClient};
use server::ServerConfig;
use store::{build_store_from_env, SharedDocumentStore};

#[derive(Parser, Debug)]
#[command(
    name = "alumni-assistant",
    about = "Retrieval-grounded chatbot service for the alumni platform"
)]
struct Cli {
    /// Optional one-shot question; if omitted the HTTP service starts.
    #[arg(short, long)]
    ask: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP chatbot service.
    Serve {
        /// Port to bind; defaults to ALUMNI_PORT / PORT or 8080.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch every collection once and report record counts.
    StoreSmoke,
    /// Print the context block the chatbot would send to the model.
    ContextPreview,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let store = build_store_from_env(false).context("Document store initialization failed")?;

    if let Some(command) = cli.command {
        match command {
            Commands::Serve { port } => {
                return serve(store, port).await;
            }
            Commands::StoreSmoke => {
                return run_store_smoke(store).await;
            }
            Commands::ContextPreview => {
                return run_context_preview(store).await;
            }
        }
    }

    if let Some(question) = cli.ask {
        return run_single(store, question).await;
    }

    serve(store, None).await
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

async fn serve(store: SharedDocumentStore, port: Option<u16>) -> anyhow::Result<()> {
    let llm = build_llm_client_from_env(false).context("LLM client initialization failed")?;
    let pipeline = Arc::new(ChatPipeline::new(store, llm, ContextBuilder::from_env()));
    let port = port.unwrap_or_else(|| ServerConfig::from_env().port);

    server::run_server(pipeline, port).await
}

async fn run_single(store: SharedDocumentStore, question: String) -> anyhow::Result<()> {
    // One-shot runs fall back to the echo client so the pipeline can be
    // exercised without completion credentials.
    let llm: SharedLlmClient = build_llm_client_from_env(true)?;
    let pipeline = ChatPipeline::new(store, llm, ContextBuilder::from_env());

    let reply = pipeline.answer(&question).await.map_err(|err| {
        error!(?err, "Chat request failed");
        err
    })?;

    println!("\nAssistant:\n{reply}\n");
    Ok(())
}

async fn run_store_smoke(store: SharedDocumentStore) -> anyhow::Result<()> {
    println!("Checking document store connectivity...");

    for category in Category::ALL {
        let collection = category.collection();
        let records = store
            .list_all(collection)
            .await
            .with_context(|| format!("Failed to fetch collection '{collection}'"))?;
        println!("✔ {collection}: {} records", records.len());
    }

    println!("Store smoke test complete.");
    Ok(())
}

async fn run_context_preview(store: SharedDocumentStore) -> anyhow::Result<()> {
    let pipeline = ChatPipeline::new(store, EchoLlmClient::shared(), ContextBuilder::from_env());
    let snapshot = pipeline.snapshot().await?;

    println!("{}", pipeline.context_block(&snapshot));
    Ok(())
}
