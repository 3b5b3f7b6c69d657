//! Dipwatch CLI: scan a watchlist for dips in uptrends.
//!
//! Commands:
//! - `scan`: run the full watchlist scan and send alerts
//! - `check`: evaluate the rule for one symbol and print the numbers
//! - `backtest`: replay the rule over one symbol's history

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dipwatch_core::backtest::replay;
use dipwatch_core::data::{
    CircuitBreaker, HeadlineSource, Lookback, OptionsSource, PriceSource, SyntheticSource,
    YahooClient,
};
use dipwatch_core::indicators::IndicatorFrame;
use dipwatch_core::params::{StrategyParams, StrategyPreset};
use dipwatch_core::signal::{detect, Verdict};
use dipwatch_runner::{
    Advisor, GeminiAdvisor, LogNotifier, NoAdvisor, Notifier, RunContext, ScanConfig, ScanReport,
    Scanner, Secrets, SmtpNotifier,
};

#[derive(Parser)]
#[command(name = "dipwatch", about = "Dipwatch: dip-in-uptrend watchlist scanner")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the configured watchlist and deliver alerts for triggered assets.
    Scan {
        /// Path to a TOML config file. Defaults to the built-in watchlist.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log alerts instead of calling the advisory service and sending mail.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Use deterministic synthetic prices instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Print the scan report as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Evaluate the rule for one symbol.
    Check {
        symbol: String,

        /// Strategy preset: ma60_dip, ma60_dip_wide, ma120_touch.
        #[arg(long, default_value = "ma60_dip")]
        preset: String,

        /// History to fetch (e.g. 1y, 2y, 6mo).
        #[arg(long, default_value = "2y")]
        lookback: String,

        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Replay the rule over one symbol's history and list the trades.
    Backtest {
        symbol: String,

        #[arg(long, default_value = "ma60_dip")]
        preset: String,

        #[arg(long, default_value = "2y")]
        lookback: String,

        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env");
        }
    }

    match cli.command {
        Commands::Scan {
            config,
            dry_run,
            synthetic,
            json,
        } => run_scan(config, dry_run, synthetic, json),
        Commands::Check {
            symbol,
            preset,
            lookback,
            synthetic,
        } => run_check(&symbol, &preset, &lookback, synthetic),
        Commands::Backtest {
            symbol,
            preset,
            lookback,
            synthetic,
        } => run_backtest_cmd(&symbol, &preset, &lookback, synthetic),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Market data for the whole run: Yahoo, or synthetic when offline.
enum Market {
    Yahoo(YahooClient),
    Synthetic(SyntheticSource),
}

impl Market {
    fn open(synthetic: bool) -> Result<Self> {
        if synthetic {
            info!("using synthetic market data");
            return Ok(Market::Synthetic(SyntheticSource::new(Utc::now().date_naive())));
        }
        let breaker = Arc::new(CircuitBreaker::default_provider());
        Ok(Market::Yahoo(YahooClient::new(breaker)?))
    }

    fn prices(&self) -> &dyn PriceSource {
        match self {
            Market::Yahoo(y) => y,
            Market::Synthetic(s) => s,
        }
    }

    fn headlines(&self) -> &dyn HeadlineSource {
        match self {
            Market::Yahoo(y) => y,
            Market::Synthetic(s) => s,
        }
    }

    fn options(&self) -> &dyn OptionsSource {
        match self {
            Market::Yahoo(y) => y,
            Market::Synthetic(s) => s,
        }
    }
}

fn run_scan(config_path: Option<PathBuf>, dry_run: bool, synthetic: bool, json: bool) -> Result<()> {
    let config = match &config_path {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    let market = Market::open(synthetic)?;

    let (advisor, notifier): (Box<dyn Advisor>, Box<dyn Notifier>) = if dry_run {
        (Box::new(NoAdvisor), Box::new(LogNotifier))
    } else {
        let secrets = Secrets::from_env().context("secrets are required unless --dry-run is set")?;
        let notifier = SmtpNotifier::new(&config.mail, &secrets)?;
        (
            Box::new(GeminiAdvisor::new(secrets.gemini_api_key, &config.advisory)?),
            Box::new(notifier),
        )
    };

    let ctx = RunContext::new(
        &config,
        market.prices(),
        market.headlines(),
        market.options(),
        advisor.as_ref(),
        notifier.as_ref(),
    )?;
    let report = Scanner::new(&ctx).run();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    let m = &report.macro_context;
    println!();
    println!("=== Scan {} ===", &report.fingerprint[..12]);
    if m.is_available() {
        println!(
            "Macro:       VIX {:.2}, 10Y {:.2}%, {}",
            m.vix_level, m.ten_year_yield, m.regime
        );
    } else {
        println!("Macro:       unavailable");
    }
    println!(
        "Triggered:   {} ({} delivered)",
        report.triggered(),
        report.delivered()
    );
    println!("Filtered:    {}", report.filtered());
    println!("No signal:   {}", report.no_signal());
    println!("Skipped:     {}", report.skipped());
    println!("Failed:      {}", report.failed());
}

fn resolve_params(preset: &str) -> Result<StrategyParams> {
    Ok(StrategyPreset::from_name(preset)?.params())
}

fn load_frame(
    symbol: &str,
    lookback: &str,
    synthetic: bool,
    params: &StrategyParams,
) -> Result<IndicatorFrame> {
    let lookback: Lookback = lookback.parse().map_err(anyhow::Error::msg)?;
    let market = Market::open(synthetic)?;
    let series = market
        .prices()
        .fetch_history(symbol, lookback)
        .with_context(|| format!("fetching {symbol}"))?;
    Ok(IndicatorFrame::build(series, params))
}

fn run_check(symbol: &str, preset: &str, lookback: &str, synthetic: bool) -> Result<()> {
    let params = resolve_params(preset)?;
    let frame = load_frame(symbol, lookback, synthetic, &params)?;
    let signal = detect(&frame, &params)?;
    let s = &signal.snapshot;

    println!();
    println!("=== {} on {} ===", signal.symbol, s.date);
    println!("Price:       ${:.2}", s.price);
    println!(
        "MA{}:        ${:.2} (gap {:.2}%)",
        params.short_window,
        s.short_ma,
        signal.percent_gap_to_short_ma * 100.0
    );
    println!(
        "MA{}:       ${:.2} (trend {})",
        params.long_window,
        s.long_ma,
        if signal.is_uptrend { "UP" } else { "DOWN" }
    );
    println!("RSI({}):     {:.1}", params.rsi_window, s.rsi);
    match s.historical_volatility {
        Some(hv) => println!("Volatility:  {:.1}%", hv * 100.0),
        None => println!("Volatility:  n/a"),
    }
    let verdict = match signal.verdict() {
        Verdict::Triggered => "SIGNAL: pullback to short MA in an uptrend",
        Verdict::Downtrend => "FILTERED: near short MA but in a downtrend",
        Verdict::NoSignal => "no signal",
    };
    println!("Verdict:     {verdict}");
    Ok(())
}

fn run_backtest_cmd(symbol: &str, preset: &str, lookback: &str, synthetic: bool) -> Result<()> {
    let params = resolve_params(preset)?;
    let frame = load_frame(symbol, lookback, synthetic, &params)?;
    let report = replay(&frame, &params);

    println!();
    println!(
        "=== {} backtest ({}-bar hold, {} bars) ===",
        report.symbol,
        report.holding_period,
        frame.bars().len()
    );
    for t in &report.trades {
        println!(
            "{} -> {}  {:>10.2} -> {:>10.2}  {:+7.2}%",
            t.entry_date,
            t.exit_date,
            t.entry_close,
            t.exit_close,
            t.return_frac * 100.0
        );
    }
    println!("{}", report.summary.describe(report.holding_period));
    Ok(())
}
