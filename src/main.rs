//! scholar-retriever - profile search and author retrieval from the command line
//!
//! ```bash
//! scholar-retriever search --author "Ada Lovelace" --pages 3
//! scholar-retriever author izlC3EEAAAAJ --articles --num 250 --csv articles.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scholar_retriever::{
    export, ArticlesOrder, AuthorArticlesRetriever, AuthorInfoRetriever, CoAuthorsRetriever,
    Config, ConfigOverrides, Fetcher, ProfileSearch, RateLimiter, RetrievalRecord, Retriever,
    SearchCriteria,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Retrieve researcher profiles, citation metrics, co-authors and publications
#[derive(Parser)]
#[command(name = "scholar-retriever")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Override the site base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Proxy URL for every request
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Attempts per page fetch
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Delay between consecutive fetches, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search author profiles
    Search(SearchArgs),

    /// Retrieve information about one author
    Author(AuthorArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct SearchArgs {
    /// Author name
    #[arg(long, conflicts_with_all = ["org", "link"])]
    author: Option<String>,

    /// Research interest label
    #[arg(long, conflicts_with_all = ["org", "link"])]
    label: Option<String>,

    /// Organization id
    #[arg(long, conflicts_with = "link")]
    org: Option<String>,

    /// Profile search URL copied from a browser
    #[arg(long)]
    link: Option<String>,

    /// Maximum number of result pages to follow
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Interface language (`hl`)
    #[arg(long)]
    language: Option<String>,

    /// Write the JSON output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AuthorArgs {
    /// Author id (the `user` parameter of a profile URL)
    author_id: String,

    /// Header and citation metrics
    #[arg(long)]
    info: bool,

    /// Co-author list
    #[arg(long)]
    coauthors: bool,

    /// Publication list
    #[arg(long)]
    articles: bool,

    /// Publication order: cited, title or pubdate
    #[arg(long)]
    sort: Option<ArticlesOrder>,

    /// Offset of the first publication
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Maximum number of publications
    #[arg(long)]
    num: Option<usize>,

    /// Interface language (`hl`)
    #[arg(long)]
    language: Option<String>,

    /// Export the publication list as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the JSON output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&ConfigOverrides {
        base_url: cli.base_url.clone(),
        language: None,
        proxy: cli.proxy.clone(),
        max_retries: cli.max_retries,
        delay_ms: cli.delay_ms,
    });
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Search(args) => run_search(&config, args).await,
        Commands::Author(args) => run_author(&config, args).await,
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_search(config: &Config, args: SearchArgs) -> Result<()> {
    let fetcher = Fetcher::new(config).context("Failed to create HTTP client")?;
    let mut search = ProfileSearch::new(fetcher);
    let mut limiter = RateLimiter::from_interval(config.politeness.delay());

    limiter.acquire().await;
    let first = if let Some(ref link) = args.link {
        search.search_by_url(link).await
    } else {
        let criteria = SearchCriteria {
            author: args.author.clone(),
            label: args.label.clone(),
            organization: args.org.clone(),
            language: args.language.clone(),
        };
        search.search_by_criteria(&criteria).await
    }
    .context("Profile search failed")?
    .clone();

    let mut pages = vec![RetrievalRecord::Profiles(first)];
    while pages.len() < args.pages && search.current_results().pagination.has_next() {
        limiter.acquire().await;
        match search.next_page().await {
            Ok(page) => pages.push(RetrievalRecord::Profiles(page.clone())),
            Err(e) => {
                warn!("Stopping after {} page(s): {}", pages.len(), e);
                break;
            }
        }
    }

    let profiles: usize = pages.iter().map(RetrievalRecord::len).sum();
    info!("Retrieved {} profiles from {} page(s)", profiles, pages.len());

    let documents = pages
        .iter()
        .map(RetrievalRecord::to_json)
        .collect::<scholar_retriever::Result<Vec<_>>>()?;
    let output = serde_json::Value::Array(documents);
    write_output(args.output.as_deref(), &serde_json::to_string_pretty(&output)?)
}

async fn run_author(config: &Config, args: AuthorArgs) -> Result<()> {
    let fetcher = Fetcher::new(config).context("Failed to create HTTP client")?;
    let hl = args.language.as_deref();
    let everything = !(args.info || args.coauthors || args.articles);

    let mut retrievers: Vec<Box<dyn Retriever>> = Vec::new();
    if everything || args.info {
        retrievers.push(Box::new(AuthorInfoRetriever::new(
            fetcher.clone(),
            &args.author_id,
            hl,
        )?));
    }
    if everything || args.coauthors {
        retrievers.push(Box::new(CoAuthorsRetriever::new(
            fetcher.clone(),
            &args.author_id,
            hl,
        )?));
    }
    if everything || args.articles {
        let mut articles = AuthorArticlesRetriever::new(fetcher, &args.author_id, hl)?
            .with_collection(
                args.sort.unwrap_or(config.articles.sort_by),
                args.start,
                args.num,
            );
        articles.set_page_size(config.articles.page_size as usize)?;
        retrievers.push(Box::new(articles));
    }

    let mut limiter = RateLimiter::from_interval(config.politeness.delay());
    let mut records = Vec::with_capacity(retrievers.len());
    let mut failures = Vec::new();

    for retriever in &mut retrievers {
        limiter.acquire().await;
        match retriever.fetch().await {
            Ok(record) => {
                info!("{}: {} entries", retriever.name(), record.len());
                records.push(record);
            }
            Err(e) => {
                error!("{} failed: {}", retriever.name(), e);
                failures.push(retriever.name());
                // keep whatever was committed before the failure
                records.push(retriever.as_record());
            }
        }
    }

    if let Some(ref csv_path) = args.csv {
        match records
            .iter()
            .find_map(|r| match r {
                RetrievalRecord::Publications(articles) => Some(articles),
                _ => None,
            }) {
            Some(articles) => export::export_articles_csv(csv_path, articles)
                .with_context(|| format!("Failed to write {}", csv_path.display()))?,
            None => warn!("--csv ignored: publications were not retrieved"),
        }
    }

    let document = RetrievalRecord::merge_json(&records)?;
    write_output(args.output.as_deref(), &serde_json::to_string_pretty(&document)?)?;

    if !failures.is_empty() {
        bail!("Retrieval incomplete: {} failed", failures.join(", "));
    }
    Ok(())
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, format!("{content}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Saved {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")?;
        }
    }
    Ok(())
}
