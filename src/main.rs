use anyhow::{Context, Result};
use catmap::aggregate::Aggregator;
use catmap::api::MediaWikiClient;
use catmap::config::{self, ApiConfig, Config};
use catmap::crawl::Crawler;
use catmap::emit;
use catmap::stats::CrawlStats;
use catmap::store::CategoryStore;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "catmap")]
#[command(about = "Crawl a Wikipedia category tree and emit a geocoded JSON map dataset")]
struct Cli {
    /// Root category to crawl
    #[arg(default_value = config::DEFAULT_ROOT_TITLE)]
    root: String,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// MediaWiki API endpoint of the crawled wiki
    #[arg(long, env = "CATMAP_API_URL", default_value = config::DEFAULT_API_URL)]
    api_url: String,

    /// Wikidata API endpoint for claim lookups
    #[arg(long, env = "CATMAP_WIKIDATA_URL", default_value = config::DEFAULT_WIKIDATA_URL)]
    wikidata_url: String,

    /// Directory of the category store
    #[arg(long, env = "CATMAP_STORE_DIR", default_value = config::DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Directory receiving data.js and data.min.js
    #[arg(long, env = "CATMAP_OUTPUT_DIR", default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Minimum delay between API requests
    #[arg(long, default_value_t = config::DEFAULT_RATE_LIMIT_MS)]
    rate_limit_ms: u64,

    /// User-Agent sent with every request
    #[arg(long, env = "CATMAP_USER_AGENT", default_value = config::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Skip the crawl and aggregate what is already in the store
    #[arg(long)]
    offline: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            store_dir: self.store_dir.clone(),
            output_dir: self.output_dir.clone(),
            api: ApiConfig {
                api_url: self.api_url.clone(),
                wikidata_url: self.wikidata_url.clone(),
                user_agent: self.user_agent.clone(),
                rate_limit_ms: self.rate_limit_ms,
                ..ApiConfig::default()
            },
        }
    }
}

fn run(root: &str, config: &Config, offline: bool) -> Result<()> {
    let store = CategoryStore::open(&config.store_dir)
        .with_context(|| format!("Category store is not writable: {:?}", config.store_dir))?;
    let stats = CrawlStats::new();

    let start_crawl = Instant::now();
    let mut requests = 0;
    if offline {
        info!("Offline mode, skipping crawl");
    } else {
        let mut client = MediaWikiClient::new(config.api.clone())?;
        Crawler::new(&mut client, &store, &stats).crawl(root)?;
        requests = client.request_count();
    }
    let crawl_duration = start_crawl.elapsed();

    let start_aggregate = Instant::now();
    let areas = Aggregator::new(&store).aggregate(root)?;
    let paths = emit::emit(&areas, &config.output_dir)?;
    let aggregate_duration = start_aggregate.elapsed();

    let root_count = areas.last().map(|a| a.count).unwrap_or(0);
    let geocoded = areas.iter().filter(|a| a.lat_lng.is_some()).count();

    println!();
    println!("=== Summary ===");
    println!("Crawl time:         {:.2}s", crawl_duration.as_secs_f64());
    println!("Aggregate time:     {:.2}s", aggregate_duration.as_secs_f64());
    println!("API requests:       {}", requests);
    println!("Categories crawled: {}", stats.categories());
    println!("Result pages:       {}", stats.pages());
    println!("Member pages:       {}", stats.members());
    println!("Child links:        {}", stats.children());
    println!("Ignored members:    {}", stats.ignored());
    println!("Wikidata items:     {}", stats.items());
    println!("Geography items:    {}", stats.geographies());
    println!("Coordinates:        {}", stats.coordinates());
    println!("OSM relations:      {}", stats.osm());
    println!("Metadata errors:    {}", stats.metadata_errors());
    println!("Map areas:          {} ({} geocoded)", areas.len(), geocoded);
    println!("Root total:         {}", root_count);
    println!("Output:             {}", paths.pretty.display());
    println!("                    {}", paths.minified.display());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = cli.config();
    match run(&cli.root, &config, cli.offline) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
