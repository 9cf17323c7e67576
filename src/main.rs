//! dork-runner CLI - batch search-engine dork queries.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dork_runner::{
    config::{CacheSettings, RunConfig, Settings},
    engines::create_engine,
    output::{render_console, write_outputs, OutputFormats},
    identity::IdentityRotator,
    proxy::{ProxyPool, ProxyStrategy},
    query::load_queries,
    ConfigError, EngineId, EngineKind, RunStatus, Runner,
};

/// dork-runner - run search-engine dork queries in bulk
#[derive(Parser)]
#[command(name = "dork-runner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every query in a file
    Run(RunArgs),

    /// List available search engines
    Engines,
}

#[derive(Parser)]
struct RunArgs {
    /// File with one query per line (blank lines and # comments are skipped)
    #[arg(short, long)]
    file: PathBuf,

    /// Target domain, prepended to every query as site:<domain>
    #[arg(short, long)]
    target: Option<String>,

    /// Search engine: google, duckduckgo, bing, brave or searxng
    #[arg(short, long, default_value = "google")]
    engine: EngineId,

    /// Config file with API keys and endpoints
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Output file prefix (a timestamp and extension are appended)
    #[arg(short, long, default_value = "results")]
    output: String,

    /// Minimum delay between requests in seconds
    #[arg(short, long, default_value = "2.0")]
    delay: f64,

    /// Disable the random extra delay of up to one second
    #[arg(long)]
    no_jitter: bool,

    /// Do not write a CSV file
    #[arg(long)]
    no_csv: bool,

    /// Do not write a JSON file
    #[arg(long)]
    no_json: bool,

    /// Print results to the console
    #[arg(long)]
    console: bool,

    /// Persist responses so later runs can reuse them
    #[arg(long)]
    cache: bool,

    /// Directory for persisted responses
    #[arg(long, default_value = ".cache")]
    cache_dir: PathBuf,

    /// Hours before a cached response expires
    #[arg(long, default_value = "24")]
    cache_ttl: u64,

    /// File with one proxy per line (e.g. 127.0.0.1:8080 or socks5://host:1080)
    #[arg(short, long)]
    proxies: Option<PathBuf>,

    /// Pick proxies at random instead of in file order
    #[arg(long)]
    random_proxy: bool,

    /// Send every request with this user agent instead of rotating
    #[arg(long)]
    user_agent: Option<String>,

    /// Attempts per query, including the first
    #[arg(long, default_value = "3")]
    max_attempts: u32,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Results requested per query
    #[arg(short = 'n', long, default_value = "10")]
    num: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for results.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dork_runner={}", default_level)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => run_queries(args).await,
        Commands::Engines => list_engines(),
    }
}

fn list_engines() -> Result<()> {
    println!("Available search engines:\n");
    for engine in EngineId::all() {
        let access = match engine.kind() {
            EngineKind::Scrape => "scraped HTML".to_string(),
            EngineKind::Api if engine.requires_api_key() => {
                format!("API, key via {}", engine.api_key_env())
            }
            EngineKind::Api => format!("API, endpoint via {}", engine.endpoint_env()),
        };
        println!("  {:<11} - {} ({})", engine.name(), engine.display_name(), access);
    }
    println!();
    println!("Usage: dork-runner run -f dorks.txt -e duckduckgo -t example.com");
    Ok(())
}

async fn run_queries(args: RunArgs) -> Result<()> {
    // Everything that can be misconfigured is checked before the first request.
    let settings = Settings::load(&args.config)?;
    let backend = settings.resolve(args.engine)?;

    let mut config = RunConfig {
        max_attempts: args.max_attempts,
        timeout: Duration::from_secs(args.timeout),
        max_results: args.num,
        cache: CacheSettings {
            persist: args.cache,
            dir: args.cache_dir.clone(),
            ttl: Duration::from_secs(args.cache_ttl.saturating_mul(3600)),
        },
        ..Default::default()
    }
    .with_delay_secs(args.delay)?;
    if args.no_jitter {
        config = config.without_jitter();
    }
    config.validate()?;

    let queries = load_queries(&args.file)?;
    let mut proxies = match &args.proxies {
        Some(path) => ProxyPool::load_from_file(path)?,
        None => ProxyPool::new(),
    };
    if args.random_proxy {
        proxies = proxies.with_strategy(ProxyStrategy::Random);
    }

    let engine = create_engine(config.engine_config(backend))?;

    println!("dork-runner");
    println!("{}", "=".repeat(50));
    println!("Found {} queries to search", queries.len());
    println!("Engine: {}", engine.id().display_name());
    if let Some(target) = &args.target {
        println!("Target domain: {}", target);
    }
    println!("Delay between requests: {}s", args.delay);
    if !proxies.is_empty() {
        println!("Proxies: {}", proxies.len());
    }
    if args.cache {
        println!("Cache: {}", args.cache_dir.display());
    }
    println!("{}", "=".repeat(50));

    let engine_name = engine.name();
    let mut runner = Runner::new(engine, &config).with_proxy_pool(proxies);
    if let Some(user_agent) = args.user_agent {
        runner = runner.with_identities(IdentityRotator::fixed(user_agent));
    }

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current query");
            token.cancel();
        }
    });

    let report = runner.run(&queries, args.target.as_deref()).await;

    println!();
    println!("{}", "=".repeat(50));
    match &report.status {
        RunStatus::Completed => println!("Search completed!"),
        RunStatus::Cancelled => println!("Search interrupted; keeping partial results."),
        RunStatus::Aborted(_) => println!("Search aborted."),
    }
    println!("Queries: {}", report.stats.queries);
    println!("Failed queries: {}", report.stats.failed);
    println!("Cache hits: {}", report.stats.cache_hits);
    println!("Total results found: {}", report.stats.total_results);
    println!("{}", "=".repeat(50));
    println!();

    if args.console {
        println!("Results:\n");
        print!("{}", render_console(&report.results));
    }

    let formats = OutputFormats {
        csv: !args.no_csv,
        json: !args.no_json,
    };
    let summary = write_outputs(&report.results, &args.output, formats, Local::now());
    for path in &summary.written {
        println!("Results saved to: {}", path.display());
    }

    if let RunStatus::Aborted(error) = report.status {
        return Err(ConfigError::AuthRejected {
            engine: engine_name.to_string(),
            reason: error.to_string(),
        }
        .into());
    }

    Ok(())
}
