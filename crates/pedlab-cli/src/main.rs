//! Pedlab CLI: ingest documents and work with the article, material and
//! message stores.
//!
//! Reads configuration from the environment (and `.env`): PEDLAB_API_URL,
//! PEDLAB_API_KEY, STORAGE_BACKEND and friends. Raw files go to the
//! configured storage backend, or to the remote upload function when
//! STORAGE_BACKEND is unset.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pedlab_api_client::{ApiClient, HttpRawFileStore};
use pedlab_cli::{
    articles_table, file_name_of, init_tracing, materials_table, messages_list, outcome_report,
};
use pedlab_core::models::{CreateMaterialRequest, CreateMessageRequest, UploadRequest};
use pedlab_core::Config;
use pedlab_processing::{
    assemble, host_images, ArticleDraft, ContentMode, IngestionOrchestrator, IngestionOutcome,
};
use pedlab_storage::{create_storage, RawFileStore, StorageRawFileStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pedlab", about = "Pedlab document ingestion and store CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document and print the outcome as JSON
    Ingest {
        /// Path to a .txt, .rtf, .doc, .docx, .odt or .pdf file
        file: PathBuf,
    },
    /// Ingest a document and publish it as an article
    Publish {
        /// Path to the document
        file: PathBuf,
        /// Article title
        #[arg(long)]
        title: String,
        /// Excerpt; derived from the content when omitted
        #[arg(long, default_value = "")]
        excerpt: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Typed text that replaces the ingested content
        #[arg(long)]
        text: Option<String>,
    },
    /// Article store operations
    Articles {
        #[command(subcommand)]
        sub: ArticleCommands,
    },
    /// Material store operations
    Materials {
        #[command(subcommand)]
        sub: MaterialCommands,
    },
    /// Message store operations
    Messages {
        #[command(subcommand)]
        sub: MessageCommands,
    },
}

#[derive(Subcommand)]
enum ArticleCommands {
    /// List articles, newest first
    List {
        /// Category filter ("all" for every category)
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Get a single article by ID
    Get { id: i64 },
    /// Delete an article by ID
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum MaterialCommands {
    List {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// File type label, e.g. PDF
        #[arg(long = "type")]
        file_type: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum MessageCommands {
    List {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Post a message
    Send {
        text: String,
        #[arg(long)]
        author: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Object storage when a backend is configured, otherwise the remote
/// upload function.
async fn raw_store(config: &Config, client: &ApiClient) -> anyhow::Result<Arc<dyn RawFileStore>> {
    if config.storage_backend().is_some() {
        let storage = create_storage(config)
            .await
            .context("Failed to initialize storage backend")?;
        tracing::info!(backend = %storage.backend_type(), "Using object storage for raw files");
        Ok(Arc::new(StorageRawFileStore::new(storage)))
    } else {
        Ok(Arc::new(HttpRawFileStore::new(client.clone())))
    }
}

async fn ingest_file(
    config: &Config,
    store: Arc<dyn RawFileStore>,
    path: &Path,
) -> anyhow::Result<IngestionOutcome> {
    let file_name = file_name_of(path)?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let orchestrator = IngestionOrchestrator::from_config(config, store);
    Ok(orchestrator
        .ingest(UploadRequest::new(file_name, data))
        .await)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let client = ApiClient::from_config(&config).context("Failed to create API client")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { file } => {
            let store = raw_store(&config, &client).await?;
            let outcome = ingest_file(&config, store, &file).await?;
            print_json(&outcome_report(&outcome))?;
        }
        Commands::Publish {
            file,
            title,
            excerpt,
            author,
            category,
            text,
        } => {
            let store = raw_store(&config, &client).await?;
            let outcome = ingest_file(&config, store.clone(), &file).await?;
            if let Some(message) = outcome.user_message() {
                if text.is_none() {
                    anyhow::bail!("{} ({})", message, outcome.file_name);
                }
                tracing::warn!(file_name = %outcome.file_name, "{}", message);
            }
            if let Some(error) = outcome.storage.error() {
                tracing::warn!(error = %error, "Publishing without a downloadable original");
            }

            let mut draft = ArticleDraft::new(title);
            draft.excerpt = excerpt;
            draft.author = author;
            draft.category = category;
            let mut result = outcome.result();
            if result.is_some() {
                draft.attach_ingestion();
            }
            if let Some(text) = text {
                draft.edit_text(text);
            }
            if let Some(result) = result.as_mut() {
                if draft.mode() == ContentMode::Structured {
                    result.html = host_images(store.as_ref(), result)
                        .await
                        .context("Failed to host extracted images")?;
                }
            }

            let request = assemble(&draft, result.as_ref())?;
            let article = client.create_article(&request).await?;
            print_json(&article)?;
        }
        Commands::Articles { sub } => match sub {
            ArticleCommands::List { category, format } => {
                let articles = client.list_articles(category.as_deref()).await?;
                match format {
                    OutputFormat::Json => print_json(&articles)?,
                    OutputFormat::Table => print!("{}", articles_table(&articles)),
                }
            }
            ArticleCommands::Get { id } => {
                let article = client.get_article(id).await?;
                print_json(&article)?;
            }
            ArticleCommands::Delete { id } => {
                let response = client.delete_article(id).await?;
                print_json(&response)?;
            }
        },
        Commands::Materials { sub } => match sub {
            MaterialCommands::List { format } => {
                let materials = client.list_materials().await?;
                match format {
                    OutputFormat::Json => print_json(&materials)?,
                    OutputFormat::Table => print!("{}", materials_table(&materials)),
                }
            }
            MaterialCommands::Create {
                title,
                description,
                author,
                category,
                file_type,
            } => {
                let mut request = CreateMaterialRequest::new(title);
                request.description = description;
                if let Some(author) = non_empty(author) {
                    request.author = author;
                }
                if let Some(category) = non_empty(category) {
                    request.category = category;
                }
                if let Some(file_type) = non_empty(file_type) {
                    request.file_type = file_type;
                }
                let material = client.create_material(&request).await?;
                print_json(&material)?;
            }
            MaterialCommands::Delete { id } => {
                let response = client.delete_material(id).await?;
                print_json(&response)?;
            }
        },
        Commands::Messages { sub } => match sub {
            MessageCommands::List { format } => {
                let messages = client.list_messages().await?;
                match format {
                    OutputFormat::Json => print_json(&messages)?,
                    OutputFormat::Table => print!("{}", messages_list(&messages)),
                }
            }
            MessageCommands::Send { text, author } => {
                let message = client
                    .send_message(&CreateMessageRequest::new(author, text))
                    .await?;
                print_json(&message)?;
            }
        },
    }

    Ok(())
}
