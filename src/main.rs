//! MTF Return Calculator
//!
//! Computes the net profit of a margin-trade-funded equity position after
//! brokerage, statutory charges, GST and financing interest.

mod api;
mod calculator;
mod db;
mod format;
mod margin;
mod models;
mod validation;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{MarginClient, DEFAULT_MARGIN_API_BASE};
use crate::calculator::{ChargeSchedule, MtfCalculator};
use crate::db::Database;
use crate::format::{format_inr, format_pct, truncate};
use crate::margin::{MarginCache, DEFAULT_CACHE_TTL};
use crate::models::{
    normalize_symbol, MarginEntry, SellMode, SizeMode, TradeInput, TradeResult,
};
use crate::validation::TradeForm;

/// MTF return calculator CLI.
#[derive(Parser)]
#[command(name = "mtfcalc")]
#[command(about = "Calculate returns on margin-trade-funded equity positions", long_about = None)]
struct Cli {
    /// Database file path
    #[arg(short, long, env = "MTF_DATABASE_URL", default_value = "sqlite:./mtfcalc.db?mode=rwc")]
    database: String,

    /// Margin-data service base URL
    #[arg(long, env = "MTF_MARGIN_API_URL", default_value = DEFAULT_MARGIN_API_BASE)]
    margin_api: String,

    /// How long a fetched margin list stays valid (seconds)
    #[arg(long, env = "MTF_MARGIN_CACHE_TTL_SECS", default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    cache_ttl: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the return of a leveraged trade
    Calc {
        /// Symbol to look the leverage up for
        #[arg(short, long)]
        symbol: Option<String>,

        /// Leverage multiplier (overrides the symbol lookup)
        #[arg(long)]
        leverage: Option<String>,

        /// Buy price per share
        #[arg(short, long)]
        buy: Option<String>,

        /// Exact sell price per share
        #[arg(long, conflicts_with = "target_pct")]
        sell: Option<String>,

        /// Target gain in percent instead of a sell price
        #[arg(long)]
        target_pct: Option<String>,

        /// Holding period in days (0 = intraday)
        #[arg(short, long, conflicts_with = "entry_date")]
        days: Option<String>,

        /// Entry date (YYYY-MM-DD) to derive the holding period from
        #[arg(long)]
        entry_date: Option<String>,

        /// Exit date (YYYY-MM-DD); defaults to today
        #[arg(long, requires = "entry_date")]
        exit_date: Option<String>,

        /// Number of shares
        #[arg(short, long, conflicts_with = "capital")]
        qty: Option<String>,

        /// Own capital to deploy; shares are derived through leverage
        #[arg(short, long)]
        capital: Option<String>,

        /// JSON file overriding the charge schedule
        #[arg(long)]
        charges: Option<PathBuf>,

        /// Save the calculation to history
        #[arg(long)]
        save: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List leverage multipliers from the margin service
    Margins {
        /// Only show symbols containing this text
        #[arg(short, long)]
        symbol: Option<String>,

        /// Maximum number of rows to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Keep re-listing every N seconds (Enter forces a refetch, Ctrl+C stops)
        #[arg(short, long)]
        watch: Option<u64>,
    },

    /// Show saved calculations
    History {
        /// Only show calculations for this symbol
        #[arg(short, long)]
        symbol: Option<String>,

        /// Maximum number of rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Delete all saved calculations
        #[arg(long)]
        clear: bool,

        /// Print the saved calculations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the charge schedule in effect
    Charges {
        /// JSON file overriding the charge schedule
        #[arg(long)]
        charges: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Calc {
            symbol,
            leverage,
            buy,
            sell,
            target_pct,
            days,
            entry_date,
            exit_date,
            qty,
            capital,
            charges,
            save,
            json,
        } => {
            let schedule = load_schedule(charges.as_deref())?;

            let leverage = match (leverage, symbol) {
                (Some(l), _) => Some(l.clone()),
                (None, Some(sym)) => {
                    let cache = margin_cache(&cli)?;
                    match cache.leverage_for(sym).await? {
                        Some(margin) => {
                            info!(symbol = %sym, margin = %margin, "Using leverage from margin service");
                            Some(margin.to_string())
                        }
                        None => {
                            warn!(symbol = %sym, "No margin listed for symbol");
                            None
                        }
                    }
                }
                (None, None) => None,
            };

            let (exit_target, sell_mode) = match target_pct {
                Some(pct) => (Some(pct.clone()), SellMode::Percent),
                None => (sell.clone(), SellMode::Exact),
            };
            let (size_value, size_mode) = match capital {
                Some(c) => (Some(c.clone()), SizeMode::Capital),
                None => (qty.clone(), SizeMode::Quantity),
            };

            let form = TradeForm {
                leverage,
                buy_price: buy.clone(),
                exit_target,
                sell_mode,
                holding_days: days.clone(),
                entry_date: entry_date.clone(),
                exit_date: exit_date.clone(),
                size_value,
                size_mode,
            };

            let today = chrono::Local::now().date_naive();
            let input = match form.validate(today) {
                Ok(input) => input,
                Err(errors) => {
                    println!("\nCannot calculate, please fix:");
                    for e in &errors.errors {
                        println!("  {:<14} {}", e.field.as_str(), e.message);
                    }
                    anyhow::bail!("{} field(s) failed validation", errors.errors.len());
                }
            };

            let calculator = MtfCalculator::new(schedule);
            let result = calculator.calculate(&input)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(symbol.as_deref(), &input, &result);
            }

            if *save {
                let db = Database::new(&cli.database).await?;
                let saved_symbol = symbol.as_deref().map(normalize_symbol);
                let id = db
                    .save_calculation(saved_symbol.as_deref(), &input, &result)
                    .await?;
                println!("\nSaved calculation {}", id);
            }
        }

        Commands::Margins {
            symbol,
            limit,
            watch,
        } => {
            let cache = margin_cache(&cli)?;
            let filter = symbol.as_deref().map(normalize_symbol);

            let entries = cache.entries().await?;
            print_margins(&entries, filter.as_deref(), *limit);

            if let Some(secs) = watch {
                watch_margins(&cache, filter.as_deref(), *limit, Duration::from_secs(*secs)).await?;
            }
        }

        Commands::History {
            symbol,
            limit,
            clear,
            json,
        } => {
            let db = Database::new(&cli.database).await?;

            if *clear {
                let removed = db.clear_calculations().await?;
                println!("Removed {} saved calculation(s).", removed);
                return Ok(());
            }

            let records = match symbol {
                Some(s) => db.calculations_for_symbol(&normalize_symbol(s), *limit).await?,
                None => db.recent_calculations(*limit).await?,
            };

            if *json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                println!("No saved calculations. Use 'mtfcalc calc ... --save' to add one.");
                return Ok(());
            }

            println!(
                "\n{:<17} {:<12} {:>6} {:>10} {:>8} {:>14} {:>9}",
                "DATE", "SYMBOL", "LEV", "BUY", "SHARES", "NET P&L", "RETURN"
            );
            println!("{}", "-".repeat(82));

            for r in records {
                println!(
                    "{:<17} {:<12} {:>5.2}x {:>10.2} {:>8} {:>14.2} {:>8.2}%",
                    r.created_at.format("%Y-%m-%d %H:%M"),
                    truncate(r.symbol.as_deref().unwrap_or("-"), 12),
                    r.leverage,
                    r.buy_price,
                    r.shares,
                    r.net_profit,
                    r.return_on_margin_pct
                );
            }
        }

        Commands::Charges { charges } => {
            let s = load_schedule(charges.as_deref())?;

            println!("\n=== Charge Schedule ===\n");
            println!("Brokerage:             {} per trade", format_inr(s.brokerage));
            println!("STT (delivery):        {}% of turnover", as_pct(s.stt_delivery_rate));
            println!("STT (intraday):        {}% of sell value", as_pct(s.stt_intraday_rate));
            println!("Stamp duty (delivery): {}% of buy value", as_pct(s.stamp_delivery_rate));
            println!("Stamp duty (intraday): {}% of buy value", as_pct(s.stamp_intraday_rate));
            println!("Exchange charges:      {}% of turnover", as_pct(s.exchange_rate));
            println!("SEBI fee:              {}% of turnover", as_pct(s.sebi_rate));
            println!("GST:                   {}% of brokerage + exchange + SEBI", as_pct(s.gst_rate));
            println!(
                "Funding interest:      {}% p.a. ({}-day year)",
                as_pct(s.annual_interest_rate),
                s.days_in_year
            );
        }
    }

    Ok(())
}

/// Default schedule, or one loaded from a JSON override file.
fn load_schedule(path: Option<&Path>) -> Result<ChargeSchedule> {
    match path {
        Some(p) => {
            let schedule = ChargeSchedule::from_json_file(p)?;
            info!(path = %p.display(), "Loaded charge schedule");
            Ok(schedule)
        }
        None => Ok(ChargeSchedule::default()),
    }
}

/// Rate fraction as a plain percentage number (0.001 -> 0.1).
fn as_pct(rate: Decimal) -> Decimal {
    (rate * Decimal::from(100)).normalize()
}

fn margin_cache(cli: &Cli) -> Result<MarginCache<MarginClient>> {
    let client = MarginClient::with_base_url(cli.margin_api.clone())?;
    Ok(MarginCache::new(client, Duration::from_secs(cli.cache_ttl)))
}

fn print_margins(entries: &[MarginEntry], filter: Option<&str>, limit: usize) {
    let mut rows: Vec<_> = entries
        .iter()
        .filter(|e| filter.map_or(true, |f| e.normalized_symbol().contains(f)))
        .collect();
    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    if rows.is_empty() {
        println!("No margin data found.");
        return;
    }

    println!("\n{:<20} {:>10}", "SYMBOL", "LEVERAGE");
    println!("{}", "-".repeat(31));
    for entry in rows.iter().take(limit) {
        println!("{:<20} {:>9}x", truncate(&entry.symbol, 20), entry.margin);
    }
    if rows.len() > limit {
        println!("... {} more", rows.len() - limit);
    }
}

/// Re-list margins until Ctrl+C. The cache TTL decides when the service is
/// hit again; a line on stdin drops the cached list first.
async fn watch_margins(
    cache: &MarginCache<MarginClient>,
    filter: Option<&str>,
    limit: usize,
    every: Duration,
) -> Result<()> {
    let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
    ticker.tick().await;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!("\nWatching margins. Press Enter to refetch, Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped watching margins.");
                break;
            }
            _ = ticker.tick() => {}
            line = stdin.next_line(), if stdin_open => {
                match line? {
                    Some(_) => cache.invalidate().await,
                    None => {
                        stdin_open = false;
                        continue;
                    }
                }
            }
        }

        let cached = cache.is_fresh().await;
        let entries = cache.entries().await?;
        println!(
            "\n[{}] {} symbols ({})",
            chrono::Local::now().format("%H:%M:%S"),
            entries.len(),
            if cached { "cached" } else { "refetched" }
        );
        print_margins(&entries, filter, limit);
    }

    Ok(())
}

fn print_result(symbol: Option<&str>, input: &TradeInput, r: &TradeResult) {
    let title = symbol.map(normalize_symbol).unwrap_or_else(|| "Trade".to_string());

    println!("\n=== {} @ {}x leverage ===", title, input.leverage_multiplier);
    println!(
        "Holding:            {}",
        if input.is_intraday() {
            "intraday".to_string()
        } else {
            format!("{} day(s)", input.holding_days)
        }
    );
    if let Some(target) = r.target_price {
        println!("Target Price:       {}", format_inr(target));
    }

    println!("\n--- Position ---");
    println!("Shares:             {}", r.shares);
    println!("Total Exposure:     {}", format_inr(r.total_exposure));
    println!("Your Margin:        {}", format_inr(r.margin_required));
    println!("Funded Amount:      {}", format_inr(r.funded_amount));

    println!("\n--- Charges ---");
    println!("Brokerage:          {}", format_inr(r.charges.brokerage));
    println!("STT:                {}", format_inr(r.charges.stt));
    println!("Exchange Charges:   {}", format_inr(r.charges.exchange));
    println!("Stamp Duty:         {}", format_inr(r.charges.stamp_duty));
    println!("SEBI Fee:           {}", format_inr(r.charges.sebi));
    println!("GST:                {}", format_inr(r.charges.gst));
    println!("Total Charges:      {}", format_inr(r.total_charges));
    println!("Funding Interest:   {}", format_inr(r.financing_interest));

    println!("\n--- Result ---");
    println!("Gross Profit:       {}", format_inr(r.gross_profit));
    println!("Net Profit:         {}", format_inr(r.net_profit));
    println!("Return on Margin:   {}", format_pct(r.return_on_margin_pct));
    println!(
        "Outcome:            {}",
        if r.is_profitable { "Profit" } else { "Loss" }
    );
}
