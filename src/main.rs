//! lexgate command-line interface.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lexgate::config::Config;
use lexgate::providers::create_embedder;
use lexgate::retrieval::{build_index, ChunkStore, TextSplitter};
use lexgate::{gateway, Terminal, Workflow};

/// Gated legal research assistant.
#[derive(Parser, Debug)]
#[command(name = "lexgate")]
#[command(author = "theonlyhennygod")]
#[command(version)]
#[command(about = "Legal research assistant with query gatekeeping and answer validation.", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.lexgate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single legal query
    Ask {
        /// The question, e.g. "Can I get anticipatory bail in a cybercrime case?"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the document index used for retrieval
    Index {
        #[command(subcommand)]
        index_command: IndexCommands,
    },

    /// Start the HTTP gateway
    Serve {
        /// Port to listen on; defaults to [gateway].port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to [gateway].host
        #[arg(long)]
        host: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommands {
    /// Split, embed and store every .txt/.md file under a directory
    Build {
        /// Corpus directory
        dir: PathBuf,

        /// Drop existing chunks before indexing
        #[arg(long)]
        rebuild: bool,
    },
    /// Show what the index contains
    Stats,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration (API key redacted)
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexgate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "lexgate", &mut std::io::stdout());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };

    match cli.command {
        Commands::Ask { query, json } => ask(&config, &query.join(" "), json).await,
        Commands::Index { index_command } => match index_command {
            IndexCommands::Build { dir, rebuild } => index_build(&config, &dir, rebuild).await,
            IndexCommands::Stats => index_stats(&config),
        },
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, config).await
        }
        Commands::Config { config_command } => match config_command {
            ConfigCommands::Show => config_show(&config),
        },
        Commands::Completions { .. } => Ok(()),
    }
}

async fn ask(config: &Config, query: &str, json: bool) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Query must not be empty");
    }

    let workflow = Workflow::from_config(config)?;
    let outcome = workflow.run(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        if let Some(kind) = outcome.responder_kind {
            println!("Query type: {kind}");
        }
        println!("{}", outcome.final_answer);
    }

    if outcome.terminal == Terminal::Failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn index_build(config: &Config, dir: &std::path::Path, rebuild: bool) -> Result<()> {
    let embedder = create_embedder(&config.provider, config.retrieval.embedding_model.as_deref())?;
    let index_path = config.retrieval.resolved_index_path();
    let store = ChunkStore::create(&index_path)?;
    if rebuild {
        store.clear()?;
    }

    let splitter = TextSplitter::new(config.retrieval.chunk_size, config.retrieval.chunk_overlap);
    let report = build_index(dir, &splitter, embedder.as_ref(), &store)
        .await
        .with_context(|| format!("Failed to index {}", dir.display()))?;

    println!(
        "✅ Indexed {} file(s), {} chunk(s) into {}",
        report.files,
        report.chunks,
        index_path.display()
    );
    for path in &report.skipped {
        println!("   skipped: {}", path.display());
    }
    Ok(())
}

fn index_stats(config: &Config) -> Result<()> {
    let store = ChunkStore::open_existing(&config.retrieval.resolved_index_path())?;
    let stats = store.stats()?;
    println!("Index:     {}", store.path().display());
    println!("Sources:   {}", stats.sources);
    println!("Chunks:    {}", stats.chunks);
    println!(
        "Embedding: {}",
        stats.embedding_model.as_deref().unwrap_or("unknown")
    );
    if let Some(built_at) = stats.built_at {
        println!("Built at:  {}", built_at.to_rfc3339());
    }
    Ok(())
}

fn config_show(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("***".into());
    }
    println!("# {}", config.config_path.display());
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::parse_from(["lexgate", "ask", "What", "is", "bail?", "--json"]);
        match cli.command {
            Commands::Ask { query, json } => {
                assert_eq!(query.join(" "), "What is bail?");
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn index_build_parses_rebuild_flag() {
        let cli = Cli::parse_from(["lexgate", "index", "build", "./corpus", "--rebuild"]);
        match cli.command {
            Commands::Index {
                index_command: IndexCommands::Build { dir, rebuild },
            } => {
                assert_eq!(dir, PathBuf::from("./corpus"));
                assert!(rebuild);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
