use chrono::{DateTime, Local};
use clap::Parser;
use rw_core::{Result, SearchQuery, DEFAULT_SEARCH_LIMIT};
use rw_inference::{
    create_chat_model, create_embedding_model, AgentExecutor, ChatProvider, Config, EmbeddingProvider, Tool,
};
use rw_reader::{init_logging, ArticleLibrary, ReaderConfig, ReadwiseClient, SearchReadwiseTool};
use rw_storage::{CacheDir, IndexManifest};
use rw_web::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Search and chat over your archived Readwise articles", long_about = None)]
pub struct Cli {
    /// Directory holding article snapshots and the similarity index
    #[arg(long, default_value = "./cache")]
    cache_dir: PathBuf,
    #[arg(long, default_value = "openai", help = "Embedding model. Available models: openai (default), hashing, ollama")]
    embedding_model: String,
    #[arg(long, default_value = "deepseek", help = "Chat model for `ask`. Available models: deepseek (default), openai")]
    chat_model: String,
    /// Base URL override for the embedding model, e.g. http://localhost:11434/nomic-embed-text for ollama
    #[arg(long)]
    model_url: Option<String>,
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Ask the agent a question about your archive
    Ask {
        query: String,
    },
    /// Search the archive directly
    Search {
        keywords: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Fetch the archive and rebuild the index even if the cache is fresh
    Refresh,
    /// Show what is cached
    Status,
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

fn create_agent(config: &Config, library: &Arc<ArticleLibrary>) -> Result<AgentExecutor> {
    let model = create_chat_model(&config.chat)?;
    info!("💬 Chat model initialized (using {})", model.name());
    let tool = Arc::new(SearchReadwiseTool::new(library.clone())) as Arc<dyn Tool>;
    Ok(AgentExecutor::new(model, vec![tool]).with_verbose(true))
}

fn print_status(cache: &CacheDir) -> Result<()> {
    let snapshots = cache.snapshots()?;
    println!("Cache directory: {}", cache.root().display());
    println!("Snapshots: {}", snapshots.len());

    if let Some((created, path)) = cache.newest()? {
        let articles = CacheDir::read_snapshot(&path)?;
        let fresh = cache.locate()?.is_some();
        println!(
            "Newest: {} ({} articles, written {}, {})",
            path.display(),
            articles.len(),
            DateTime::<Local>::from(created).format("%Y-%m-%d %H:%M:%S"),
            if fresh { "fresh" } else { "stale" }
        );
    }

    match IndexManifest::read(&cache.index_dir())? {
        Some(manifest) => println!(
            "Index: {} documents, {} ({} dims), built {}",
            manifest.documents, manifest.embedding_model, manifest.dimension, manifest.created_at
        ),
        None => println!("Index: none"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(if cli.verbose { Level::DEBUG } else { Level::INFO });

    let embedding: EmbeddingProvider = cli.embedding_model.parse()?;
    let chat: ChatProvider = cli.chat_model.parse()?;
    let mut config = Config::from_env(embedding, chat);
    config.embedding.url = cli.model_url.clone();

    let embedder = create_embedding_model(&config.embedding)?;
    info!("🧠 Embedding model initialized (using {})", embedder.name());
    let library = Arc::new(ArticleLibrary::new(
        ReadwiseClient::new(ReaderConfig::from_env()),
        CacheDir::new(&cli.cache_dir),
        embedder,
    ));

    match cli.command {
        Commands::Ask { query } => {
            let agent = create_agent(&config, &library)?;
            info!("🤖 Asking: {}", query);
            let output = agent.run(&query).await?;
            println!("{}", output);
        }
        Commands::Search {
            keywords,
            author,
            site,
            tag,
            year,
            limit,
        } => {
            let query = SearchQuery {
                keywords,
                author,
                site,
                tag,
                year,
                limit,
            };
            info!("🔎 Searching for {:?}", query.effective_query());
            let results = library.try_search(&query).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Refresh => {
            info!("📚 Fetching archived articles...");
            let snapshot = library.refresh().await?;
            match snapshot.path {
                Some(path) => info!("✨ Cached {} articles to {}", snapshot.articles.len(), path.display()),
                None => warn!("⚠️ No archived articles returned, nothing cached"),
            }
        }
        Commands::Serve { port } => {
            let mut state = AppState::new(library.clone());
            if config.chat.api_key.is_some() {
                state = state.with_agent(Arc::new(create_agent(&config, &library)?));
            } else {
                warn!("⚠️ No chat API key set, /api/ask is disabled");
            }

            let app = rw_web::create_app(state).await;
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            info!("🌐 Listening on http://0.0.0.0:{}", port);
            axum::serve(listener, app).await?;
        }
        Commands::Status => print_status(library.cache())?,
    }

    Ok(())
}
