//! News Threads CLI
//!
//! Serving loop, one-shot repository requests and offline batch stages.

use anyhow::Context;
use clap::{Parser, Subcommand};
use news_threads::config::{self, Config};
use news_threads::index::VectorIndex;
use news_threads::models::Word2VecEmbedder;
use news_threads::pipeline::BatchPipeline;
use news_threads::server::{serve_lines, Reply, WireReply, WorkerPool};
use news_threads::storage::RecordStore;
use news_threads::{Collaborators, Repository};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// News Threads CLI - online news clustering and story threads
#[derive(Parser)]
#[command(name = "nthreads")]
#[command(about = "Ingest news articles, cluster them into threads and serve ranked threads", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (overrides NEWS_THREADS_CONFIG)
    #[arg(long, env = "NEWS_THREADS_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Worker budget (defaults to the configured value)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the metadata store and empty vector indexes
    Init,

    /// Serve line-delimited JSON requests from stdin
    Serve,

    /// Ingest one article
    Put {
        /// Article name
        name: String,

        /// Article file
        file: PathBuf,

        /// Time to live in seconds
        #[arg(long)]
        ttl: u64,
    },

    /// Delete an article
    Delete {
        /// Article name
        name: String,
    },

    /// Ranked threads of a language
    Get {
        /// Window length in seconds
        #[arg(long, default_value = "86400")]
        period: u64,

        /// Language code
        #[arg(long)]
        lang: String,

        /// Category name or "any"
        #[arg(long, default_value = "any")]
        category: String,
    },

    /// Group the articles of a directory by language
    Languages {
        /// Article directory
        dir: PathBuf,
    },

    /// List the news articles of a directory
    News {
        /// Article directory
        dir: PathBuf,
    },

    /// Group the news articles of a directory by category
    Categories {
        /// Article directory
        dir: PathBuf,
    },

    /// Cluster the news articles of a directory into threads
    Threads {
        /// Article directory
        dir: PathBuf,
    },

    /// Per-language repository statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config_path = config::expand(&cli.config);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading configuration {}", config_path.display()))?;
    if let Some(workers) = cli.workers {
        config.workers = workers.max(1);
    }

    match cli.command {
        Commands::Init => cmd_init(&config)?,
        Commands::Serve => cmd_serve(&config)?,
        Commands::Put { name, file, ttl } => cmd_put(&config, &name, &file, ttl)?,
        Commands::Delete { name } => cmd_delete(&config, &name)?,
        Commands::Get {
            period,
            lang,
            category,
        } => cmd_get(&config, period, &lang, &category)?,
        Commands::Languages { dir } => {
            let pipeline = BatchPipeline::new(config);
            let languages = pipeline.languages(&dir)?;
            print_json(&BatchPipeline::language_report(&languages))?;
        }
        Commands::News { dir } => {
            let pipeline = BatchPipeline::new(config);
            let news = pipeline.news(pipeline.languages(&dir)?)?;
            print_json(&BatchPipeline::news_report(&news))?;
        }
        Commands::Categories { dir } => {
            let pipeline = BatchPipeline::new(config);
            let categorized = pipeline.categories(pipeline.news(pipeline.languages(&dir)?)?)?;
            print_json(&BatchPipeline::category_report(&categorized))?;
        }
        Commands::Threads { dir } => {
            let pipeline = BatchPipeline::new(config);
            let categorized = pipeline.categories(pipeline.news(pipeline.languages(&dir)?)?)?;
            print_json(&pipeline.threads(categorized)?)?;
        }
        Commands::Stats => cmd_stats(&config)?,
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_reply(reply: WireReply) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn open_repository(config: &Config) -> anyhow::Result<Repository> {
    let collaborators = Collaborators::load(config).context("loading language models")?;
    Ok(Repository::load(config, collaborators)?)
}

// ============================================================================
// COMMANDS
// ============================================================================

fn cmd_init(config: &Config) -> anyhow::Result<()> {
    fs::create_dir_all(&config.store_path)?;
    let store = RecordStore::open(&config.store_path)?;
    store.flush()?;
    println!("✓ Metadata store ready at {}", config.store_path.display());

    for language in &config.languages {
        if language.index_file.exists() {
            println!("  {}: index {} already exists", language.code, language.index_file.display());
            continue;
        }
        let dimensions = Word2VecEmbedder::read_dimensions(&language.embedding_model)
            .with_context(|| format!("reading embedding model of '{}'", language.code))?;
        if let Some(parent) = language.index_file.parent() {
            fs::create_dir_all(parent)?;
        }
        VectorIndex::new(dimensions).save(&language.index_file)?;
        println!(
            "  {}: created empty index {} ({} dimensions)",
            language.code,
            language.index_file.display(),
            dimensions
        );
    }

    Ok(())
}

fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let collaborators = Collaborators::load(config).context("loading language models")?;
    let repository = Repository::open(config, collaborators)?;
    let pool = WorkerPool::start(repository.clone(), config.workers)?;

    info!(workers = config.workers, "Serving requests from stdin");
    let served = serve_lines(&pool, io::stdin().lock(), io::stdout().lock());

    pool.shutdown();
    let report = repository.close()?;
    info!(
        requests = served.as_ref().copied().unwrap_or_default(),
        evicted = report.evicted,
        "Server stopped"
    );
    served?;
    Ok(())
}

fn cmd_put(config: &Config, name: &str, file: &Path, ttl: u64) -> anyhow::Result<()> {
    let body = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let repository = open_repository(config)?;
    let status = repository.put(name, ttl, &body);
    repository.close()?;
    print_reply(Reply::Put(status).into())
}

fn cmd_delete(config: &Config, name: &str) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    let status = repository.delete(name);
    repository.close()?;
    print_reply(Reply::Delete(status).into())
}

fn cmd_get(config: &Config, period: u64, lang: &str, category: &str) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    let status = repository.get(period, lang, category);
    repository.close()?;
    print_reply(Reply::Get(status).into())
}

fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    println!("Store: {}", config.store_path.display());
    println!("  Records: {}", repository.store().count()?);
    for stats in repository.stats()? {
        println!("  {}:", stats.code);
        println!("    Vectors: {}", stats.vectors);
        println!("    Last vector id: {}", stats.last_vector_id);
        match stats.newest_published {
            Some(published) => println!("    Newest article: {}", format_time(published)),
            None => println!("    Newest article: -"),
        }
    }
    // dropped without close: stats never rewrites the index files
    drop(repository);
    Ok(())
}

fn format_time(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| seconds.to_string())
}
