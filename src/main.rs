//! Manifold Trading Bot CLI
//!
//! `select` writes a ranked list of markets; `run` decides (and bets) on a
//! list of market URLs.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use manifold_bot::bot::process_markets_file;
use manifold_bot::config::resolve_key;
use manifold_bot::selection::{write_report_file, DEFAULT_BAD_TAGS};
use manifold_bot::services::{BingSearchHandler, Llm, LlmModel, MockLlm, MockSearchHandler, OpenAiLlm, SearchHandler};
use manifold_bot::strategies::forecast::DEFAULT_MIN_EDGE;
use manifold_bot::{
    select_markets, Bettor, Bot, BettorRange, Config, DecisionMaker, FilterConfig, ForecastDecisionMaker,
    HttpBettor, HttpMarketFetcher, ManifoldScanner, MarketFetcher, MockMarketFetcher, RandomDecisionMaker,
    SelectionParams,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "manifold-bot")]
#[command(about = "Market selection and betting bot for Manifold prediction markets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Select markets closing around a day and write them to a file
    Select(SelectArgs),

    /// Decide on every market in an input file, optionally betting
    Run(RunArgs),
}

#[derive(Args)]
struct SelectArgs {
    /// Maximum number of markets to write
    #[arg(long, alias = "max_markets", default_value = "1000")]
    max_markets: usize,

    /// Markets closing after this day are penalised per day late
    #[arg(long, alias = "last_free_day", default_value = "2025-01-01")]
    last_free_day: NaiveDate,

    /// Bettor counts inside [LOW, HIGH] carry no penalty
    #[arg(long, alias = "bettor_range", num_args = 2, value_names = ["LOW", "HIGH"], default_values_t = [10, 20])]
    bettor_range: Vec<u32>,

    /// Tags to avoid, least important first
    /// [default: personal personal-goals fun selfresolving free-money nonpredictive-profits nonpredictive unsubsidized]
    #[arg(long, alias = "bad_tags", num_args = 1..)]
    bad_tags: Option<Vec<String>>,

    /// Do not penalise any tags (skips all tag lookups)
    #[arg(long, alias = "ignore_tags")]
    ignore_tags: bool,

    /// Days before the last free day included in the window
    #[arg(long, alias = "days_before", default_value = "1")]
    days_before: u32,

    /// Days after the last free day included in the window
    #[arg(long, alias = "days_after", default_value = "6")]
    days_after: u32,

    /// Seed for the tie-breaking shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Listing page size (at most 1000)
    #[arg(long, alias = "page_size", default_value = "1000")]
    page_size: usize,

    /// Where to write the selected markets
    #[arg(long)]
    outfile: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SearchType {
    None,
    Mock,
    Bing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BetType {
    None,
    #[value(name = "dry_run", alias = "dry-run")]
    DryRun,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecisionType {
    Random,
    Forecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LlmType {
    Mock,
    #[value(name = "gpt-4o")]
    Gpt4o,
    #[value(name = "gpt-4o-mini")]
    Gpt4oMini,
}

impl LlmType {
    fn model(self) -> Option<LlmModel> {
        match self {
            LlmType::Mock => None,
            LlmType::Gpt4o => Some(LlmModel::Gpt4o),
            LlmType::Gpt4oMini => Some(LlmModel::Gpt4oMini),
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// File with one market URL per line
    #[arg(long, alias = "input_file")]
    input_file: PathBuf,

    /// Decisions are appended here; markets already in it are skipped
    #[arg(long, alias = "output_file")]
    output_file: PathBuf,

    /// Use built-in mock markets instead of the Manifold API
    #[arg(long, alias = "mock_markets")]
    mock_markets: bool,

    #[arg(long, alias = "search_type", value_enum, default_value_t = SearchType::None)]
    search_type: SearchType,

    #[arg(long, alias = "bet_type", value_enum, default_value_t = BetType::None)]
    bet_type: BetType,

    #[arg(long, value_enum, default_value_t = DecisionType::Random)]
    decision: DecisionType,

    #[arg(long, value_enum, default_value_t = LlmType::Mock)]
    llm: LlmType,

    /// Minimum gap between estimate and market probability before betting
    #[arg(long, alias = "min_edge", default_value_t = DEFAULT_MIN_EDGE)]
    min_edge: f64,

    /// Seed for the random decision maker and mock markets
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, alias = "openai_key_path")]
    openai_key_path: Option<PathBuf>,

    #[arg(long, alias = "bing_key_path")]
    bing_key_path: Option<PathBuf>,

    #[arg(long, alias = "manifold_key_path")]
    manifold_key_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    // Load configuration
    let config = Config::from_env()?;

    match cli.command {
        Commands::Select(args) => select(&config, args).await?,
        Commands::Run(args) => run_bot(&config, args).await?,
    }

    Ok(())
}

async fn select(config: &Config, args: SelectArgs) -> Result<()> {
    // Everything the user typed is checked before the first request
    let (low, high) = match args.bettor_range.as_slice() {
        [low, high] => (*low, *high),
        _ => bail!("--bettor-range takes exactly two values"),
    };
    let bettor_range = BettorRange::new(low, high)?;
    let bad_tags = if args.ignore_tags {
        Vec::new()
    } else {
        args.bad_tags
            .unwrap_or_else(|| DEFAULT_BAD_TAGS.iter().map(|t| t.to_string()).collect())
    };

    let filter = FilterConfig::new(args.last_free_day, bettor_range, bad_tags);
    let mut params = SelectionParams::new(filter.clone(), args.max_markets);
    params.days_before = args.days_before;
    params.days_after = args.days_after;
    params.page_size = args.page_size;
    let window = params.window()?;

    println!("\n{}", "=".repeat(70));
    println!("  MANIFOLD MARKET SELECTION");
    println!(
        "  Window: {} to {} | Bettors: {}-{} | Bad tags: {}",
        window.min_close_time.format("%Y-%m-%d"),
        window.last_included_day(),
        low,
        high,
        if filter.bad_tags.is_empty() { "IGNORED".to_string() } else { filter.bad_tags.len().to_string() }
    );
    println!("{}\n", "=".repeat(70));

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let scanner = ManifoldScanner::new(config)?;

    let selection = select_markets(&scanner, &params, &mut rng).await?;
    let header = selection.header(Utc::now().date_naive(), &filter);
    write_report_file(&args.outfile, &selection.markets, &header, &filter)?;

    println!(
        "Wrote {} of {} markets to {}",
        selection.markets.len(),
        selection.fetched,
        args.outfile.display()
    );
    Ok(())
}

async fn run_bot(config: &Config, args: RunArgs) -> Result<()> {
    // Keys first, so a missing one fails before any market is touched
    let manifold_key = match args.bet_type {
        BetType::None => None,
        _ => Some(resolve_key(
            args.manifold_key_path.as_deref(),
            config.manifold_api_key.as_deref(),
            "Manifold",
        )?),
    };
    let bing_key = match args.search_type {
        SearchType::Bing => Some(resolve_key(
            args.bing_key_path.as_deref(),
            config.bing_api_key.as_deref(),
            "Bing",
        )?),
        _ => None,
    };
    if args.decision == DecisionType::Forecast && args.llm == LlmType::Mock {
        bail!("--decision forecast needs a real --llm (gpt-4o or gpt-4o-mini)");
    }
    let llm: Arc<dyn Llm> = match args.llm.model() {
        None => Arc::new(MockLlm),
        Some(model) => {
            let key = resolve_key(
                args.openai_key_path.as_deref(),
                config.openai_api_key.as_deref(),
                "OpenAI",
            )?;
            Arc::new(OpenAiLlm::new(config.http_client()?, config.openai_api_url.clone(), key, model))
        }
    };

    let market_fetcher: Arc<dyn MarketFetcher> = match (args.mock_markets, args.seed) {
        (true, Some(seed)) => Arc::new(MockMarketFetcher::with_seed(seed)),
        (true, None) => Arc::new(MockMarketFetcher::new()),
        (false, _) => Arc::new(HttpMarketFetcher::new(config)?),
    };

    let decision_maker: Arc<dyn DecisionMaker> = match args.decision {
        DecisionType::Random => match args.seed {
            Some(seed) => Arc::new(RandomDecisionMaker::with_seed(seed)),
            None => Arc::new(RandomDecisionMaker::new()),
        },
        DecisionType::Forecast => Arc::new(ForecastDecisionMaker::new(llm.clone(), args.min_edge)),
    };

    let search_handler: Option<Arc<dyn SearchHandler>> = match args.search_type {
        SearchType::None => None,
        SearchType::Mock => Some(Arc::new(MockSearchHandler)),
        SearchType::Bing => {
            let key = bing_key.context("Bing key required")?;
            Some(Arc::new(BingSearchHandler::new(
                config.http_client()?,
                config.bing_search_url.clone(),
                key,
            )))
        }
    };

    let bettor: Option<HttpBettor> = match manifold_key {
        Some(key) => Some(HttpBettor::new(config, key, args.bet_type == BetType::DryRun)?),
        None => None,
    };

    let mut bot = Bot::new(decision_maker.clone(), market_fetcher).with_query_llm(llm);
    if let Some(handler) = search_handler {
        bot = bot.with_search(handler);
    }

    println!("\n{}", "=".repeat(70));
    println!("  MANIFOLD BOT");
    println!(
        "  Decision: {} | Search: {:?} | Betting: {}",
        decision_maker.name(),
        args.search_type,
        match args.bet_type {
            BetType::None => "OFF",
            BetType::DryRun => "DRY RUN",
            BetType::Real => "LIVE",
        }
    );
    println!("{}\n", "=".repeat(70));

    let summary = process_markets_file(
        &args.input_file,
        &args.output_file,
        &bot,
        bettor.as_ref().map(|b| b as &dyn Bettor),
    )
    .await?;

    info!("Run finished: {:?}", summary);
    println!("\n{}", "-".repeat(70));
    println!(
        "Decided {} markets ({} already done) | Bets placed: {} | Skipped: {}",
        summary.decided, summary.already_done, summary.bets_placed, summary.bets_skipped
    );

    Ok(())
}
