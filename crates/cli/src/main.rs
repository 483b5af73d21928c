use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docqa_cli::{chat, server};
use docqa_core::config::{self, AppConfig};
use docqa_core::{extractor, pipeline, Session};
use providers::noop::NoopProvider;
use providers::ProviderRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask {
            file,
            question,
            json,
        } => run_ask(cfg, &file, &question, json).await,
        Commands::Chat { file } => run_chat(cfg, &file).await,
        Commands::Inspect { file, question } => run_inspect(cfg, &file, &question).await,
        Commands::Serve { bind } => run_serve(cfg, bind).await,
    }
}

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a single document", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question about FILE
    Ask {
        file: PathBuf,
        question: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask questions about FILE interactively
    Chat { file: PathBuf },
    /// Show the fragments retrieved for QUESTION without generating an answer
    Inspect { file: PathBuf, question: String },
    /// Serve the HTTP API
    Serve {
        /// Address to bind, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
}

fn session_from(cfg: &AppConfig, registry: ProviderRegistry) -> Result<Session> {
    Ok(pipeline::build_session(cfg, &registry)?)
}

async fn load_document(session: &Session, file: &Path) -> Result<()> {
    let path = file.to_path_buf();
    let text = tokio::task::spawn_blocking(move || extractor::extract_text(&path))
        .await?
        .with_context(|| format!("reading {}", file.display()))?;
    let outcome = session.ingest(&text).await?;
    if !outcome.success {
        bail!("{}: {}", file.display(), outcome.message);
    }
    info!(
        file = %file.display(),
        fragments = outcome.fragments,
        status = ?outcome.status,
        "document loaded"
    );
    Ok(())
}

async fn run_ask(cfg: AppConfig, file: &Path, question: &str, json: bool) -> Result<()> {
    let session = session_from(&cfg, pipeline::build_registry(&cfg))?;
    load_document(&session, file).await?;
    let result = session.ask(question).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Answer: {}", result.text);
        println!("Confidence: {}%", result.confidence);
    }
    Ok(())
}

async fn run_chat(cfg: AppConfig, file: &Path) -> Result<()> {
    let session = session_from(&cfg, pipeline::build_registry(&cfg))?;
    load_document(&session, file).await?;
    eprintln!("Ask a question about {} (exit to quit)", file.display());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let answered = chat::run(&session, stdin, tokio::io::stdout()).await?;
    info!(answered, "chat finished");
    Ok(())
}

async fn run_inspect(cfg: AppConfig, file: &Path, question: &str) -> Result<()> {
    let registry = pipeline::build_registry(&cfg)
        .with_llm("noop", Arc::new(NoopProvider))
        .set_preferred_llm("noop");
    let session = session_from(&cfg, registry)?;
    load_document(&session, file).await?;
    let hits = session.retrieve(question).await?;
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{:>2}. {} @{} sim={:.4}",
            rank + 1,
            hit.fragment.id(),
            hit.fragment.source_offset(),
            hit.similarity
        );
        println!("    {}", hit.fragment.text().replace('\n', " "));
    }
    Ok(())
}

async fn run_serve(cfg: AppConfig, bind: Option<String>) -> Result<()> {
    let session = session_from(&cfg, pipeline::build_registry(&cfg))?;
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    server::serve(Arc::new(session), &bind).await
}
