//! A3S Scout CLI - multi-engine search and article extraction.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use a3s_scout::{
    ArticleResponse, EngineRegistry, EngineSelector, Scout, SearchQuery, SearchResponse,
    SearchType, Settings, DEFAULT_VERIFY_URL,
};

/// A3S Scout - resilient search over a shared headless browser
#[derive(Parser)]
#[command(name = "a3s-scout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search with automatic engine fallback
    Search(SearchArgs),

    /// Fetch a page and extract its article text
    Fetch(FetchArgs),

    /// List search engines and their state
    Engines,

    /// Show Baidu's realtime trending topics
    Hot {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Open a visible browser, wait for a manual anti-bot check, save cookies
    Verify(VerifyArgs),
}

#[derive(Parser)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Preferred engine: auto, baidu, bing, sogou, google, 360
    #[arg(short, long, default_value = "auto")]
    engine: EngineSelector,

    /// Only use the chosen engine, without fallback
    #[arg(long)]
    only: bool,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    num: Option<usize>,

    /// Search news instead of web pages
    #[arg(long)]
    news: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Parser)]
struct FetchArgs {
    /// Article URL
    url: String,

    /// Skip image collection
    #[arg(long)]
    no_images: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Parser)]
struct VerifyArgs {
    /// Page that shows the verification wall
    #[arg(default_value = DEFAULT_VERIFY_URL)]
    url: String,

    /// Seconds to wait for the check to be cleared
    #[arg(short, long, default_value_t = 300)]
    wait: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Search(args) => {
            let scout = build_scout(settings)?;
            let outcome = run_search(&scout, args).await;
            scout.shutdown().await;
            exit_on_failure(outcome)
        }
        Commands::Fetch(args) => {
            let scout = build_scout(settings)?;
            let outcome = run_fetch(&scout, args).await;
            scout.shutdown().await;
            exit_on_failure(outcome)
        }
        Commands::Engines => list_engines(&settings),
        Commands::Hot { format } => {
            let scout = build_scout(settings)?;
            let outcome = run_hot(&scout, format).await;
            scout.shutdown().await;
            exit_on_failure(outcome)
        }
        Commands::Verify(args) => {
            let mut settings = settings;
            settings.browser.headless = false;
            let scout = build_scout(settings)?;
            let outcome = run_verify(&scout, args).await;
            scout.shutdown().await;
            exit_on_failure(outcome)
        }
    }
}

/// Exits with status 1 when the command ran but produced no usable output.
fn exit_on_failure(outcome: Result<bool>) -> Result<()> {
    if !outcome? {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "headless")]
fn build_scout(settings: Settings) -> Result<Scout> {
    Ok(Scout::new(settings)?)
}

#[cfg(not(feature = "headless"))]
fn build_scout(_settings: Settings) -> Result<Scout> {
    anyhow::bail!("a3s-scout was built without the `headless` feature; no browser is available")
}

fn list_engines(settings: &Settings) -> Result<()> {
    let registry = EngineRegistry::new(&settings.engines);
    println!("Search engines (fallback order):\n");
    for engine in registry.snapshot() {
        let state = if engine.enabled { "enabled" } else { "disabled" };
        println!("  {}. {:<8} {:<24} {}", engine.priority, engine.id, engine.name, state);
    }
    println!();

    #[cfg(feature = "headless")]
    match a3s_scout::browser_setup::detect_chrome() {
        Some(path) => println!("Browser: {}", path.display()),
        None => println!("Browser: not found (install Chrome/Chromium or set CHROME)"),
    }

    println!("\nUsage: a3s-scout search \"query\" -e baidu");
    Ok(())
}

async fn run_search(scout: &Scout, args: SearchArgs) -> Result<bool> {
    let mut query = SearchQuery::new(&args.query).with_selector(args.engine.clone());
    if let Some(n) = args.num {
        query = query.with_num_results(n);
    }
    if args.news {
        query = query.news();
    }

    let response = match (&args.engine, args.only) {
        (EngineSelector::Named(id), true) => scout.search_engine(id, &query).await?,
        _ => scout.search(&query).await?,
    };

    match args.format {
        OutputFormat::Text => print_search_text(&response),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Compact => {
            for result in &response.results {
                println!("{}\t{}", result.title, result.url);
            }
        }
    }

    Ok(response.is_success())
}

fn print_search_text(response: &SearchResponse) {
    let kind = match response.search_type {
        SearchType::Web => "results",
        SearchType::News => "news results",
    };
    match (&response.engine_name, &response.error) {
        (Some(name), _) => println!(
            "\n{} {} for \"{}\" from {} ({} engines available, {} banned):\n",
            response.total, kind, response.query, name, response.available_engines, response.banned_engines
        ),
        (None, error) => {
            println!(
                "\nNo results for \"{}\": {}",
                response.query,
                error.as_deref().unwrap_or("unknown error")
            );
            if let Some(reason) = response.block_reason {
                println!("Last block: {}", reason);
            }
        }
    }

    for (i, result) in response.results.iter().enumerate() {
        println!("{}. {}", i + 1, result.title);
        println!("   URL: {}", result.url);
        if !result.summary.is_empty() {
            println!("   {}", truncate(&result.summary, 150));
        }
        if !result.source.is_empty() || !result.time.is_empty() {
            println!("   {} {}", result.source, result.time);
        }
        println!();
    }

    if response.attempts.len() > 1 || response.engine.is_none() {
        println!("Attempts:");
        for attempt in &response.attempts {
            println!(
                "  {:<8} {:?} {}",
                attempt.engine,
                attempt.outcome,
                attempt.detail.as_deref().unwrap_or_default()
            );
        }
    }
}

async fn run_hot(scout: &Scout, format: OutputFormat) -> Result<bool> {
    let board = scout.baidu_hot().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&board)?),
        OutputFormat::Compact => {
            for item in &board.items {
                println!("{}\t{}\t{}", item.rank, item.title, item.hot_score);
            }
        }
        OutputFormat::Text => {
            if let Some(ref error) = board.error {
                println!("\nHot board unavailable: {}", error);
            } else {
                println!("\nBaidu hot board ({} topics):\n", board.total);
                for item in &board.items {
                    println!("{:>3}. {:<40} {}", item.rank, item.title, item.hot_score);
                }
            }
        }
    }

    Ok(board.is_success())
}

async fn run_verify(scout: &Scout, args: VerifyArgs) -> Result<bool> {
    println!("Complete the check in the browser window for {}", args.url);
    println!("Waiting up to {} seconds...", args.wait);

    let outcome = scout.verify(&args.url, Duration::from_secs(args.wait)).await?;
    if outcome.cleared {
        println!(
            "Verified after {}s ({}). Saved {} cookies.",
            outcome.waited_secs, outcome.title, outcome.cookies_saved
        );
        if scout.settings().browser.cookie_file.is_none() {
            println!("No cookie file is configured; nothing was persisted.");
        }
    } else {
        println!("Not verified within {}s; last title: {}", args.wait, outcome.title);
    }
    Ok(outcome.cleared)
}

async fn run_fetch(scout: &Scout, args: FetchArgs) -> Result<bool> {
    let article = scout.fetch_article(&args.url, !args.no_images).await?;

    match args.format {
        OutputFormat::Text => print_article_text(&article),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&article)?),
        OutputFormat::Compact => println!("{}", serde_json::to_string(&article.to_record())?),
    }

    Ok(article.is_ok())
}

fn print_article_text(article: &ArticleResponse) {
    let status = &article.status;
    println!("\n{}", article.title);
    println!("{}", article.url);
    println!(
        "Status: {:?} ({}) | {} chars | {} images",
        status.status,
        status.reason,
        article.content_length,
        article.images.len()
    );
    if let Some(ref quality) = status.quality {
        println!("Quality: {} ({}/100)", quality.level.as_str(), quality.score);
    }
    for tip in &status.suggestions {
        println!("  - {}", tip);
    }
    println!();
    println!("{}", article.content);
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
