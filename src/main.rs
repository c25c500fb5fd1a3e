use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retrotest::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "retrotest")]
#[command(about = "Backtest parametric trading strategies against historical prices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    //log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    //engine configuration json file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    //run a single backtest
    Run {
        //path to csv data file (timestamp, close, symbol columns)
        #[arg(long)]
        data: PathBuf,

        //backtest request json file; overrides the flags below
        #[arg(long)]
        request: Option<PathBuf>,

        //symbol to test (eg SPY, EURUSD)
        #[arg(long)]
        symbol: Option<String>,

        //strategy type (SMA, MeanReversion)
        #[arg(long, default_value = "SMA")]
        strategy: String,

        //start of the date range (ISO-8601)
        #[arg(long)]
        start: Option<String>,

        //end of the date range (ISO-8601)
        #[arg(long)]
        end: Option<String>,

        //strategy parameter as KEY=VALUE (eg SMA_S=10), repeatable
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        //proportional transaction cost per unit of position change
        #[arg(long)]
        tc: Option<f64>,

        //output path for the result json
        #[arg(long)]
        output: Option<PathBuf>,
    },

    //run a json array of backtest requests in parallel
    Batch {
        //path to csv data file (timestamp, close, symbol columns)
        #[arg(long)]
        data: PathBuf,

        //json file holding an array of backtest requests
        #[arg(long)]
        requests: PathBuf,

        //output path for the results json
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_param(raw: &str) -> std::result::Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for {}: {}", key, e))?;
    Ok((key.trim().to_string(), value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: Level = cli
        .log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", cli.log_level))?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .context(format!("Failed to load engine config from {:?}", path))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Run {
            data,
            request,
            symbol,
            strategy,
            start,
            end,
            params,
            tc,
            output,
        } => {
            let request = match request {
                Some(path) => BacktestRequest::from_json_file(&path)
                    .context(format!("Failed to load request from {:?}", path))?,
                None => build_request(&config, symbol, strategy, start, end, params, tc)?,
            };
            run_single(config, &data, &request, output)?;
        }
        Commands::Batch {
            data,
            requests,
            output,
        } => {
            run_batch(config, &data, &requests, output)?;
        }
    }

    Ok(())
}

fn build_request(
    config: &EngineConfig,
    symbol: Option<String>,
    strategy: String,
    start: Option<String>,
    end: Option<String>,
    params: Vec<(String, f64)>,
    tc: Option<f64>,
) -> Result<BacktestRequest> {
    let symbol = symbol.ok_or_else(|| anyhow::anyhow!("--symbol required without --request"))?;
    let start = start.ok_or_else(|| anyhow::anyhow!("--start required without --request"))?;
    let end = end.ok_or_else(|| anyhow::anyhow!("--end required without --request"))?;

    let mut request = BacktestRequest::new(strategy, symbol, start, end)
        .with_transaction_cost(tc.unwrap_or(config.default_transaction_cost));
    for (key, value) in params {
        request = request.with_param(key, value);
    }
    Ok(request)
}

fn engine_for(config: EngineConfig, data: &Path) -> BacktestEngine<CachedPriceSource<CsvPriceSource>> {
    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let source = CachedPriceSource::new(CsvPriceSource::new(data), ttl);
    BacktestEngine::new(config, source)
}

fn run_single(
    config: EngineConfig,
    data: &Path,
    request: &BacktestRequest,
    output: Option<PathBuf>,
) -> Result<()> {
    let engine = engine_for(config, data);

    let result = engine
        .run(request)
        .context(format!("Backtest of {} failed", request.symbol))?;

    println!(
        "{} {} on {} ({} to {})",
        request.strategy_type,
        format_params(request),
        request.symbol,
        request.start_date,
        request.end_date
    );
    println!("Performance:    {:.6}", result.performance);
    println!("Outperformance: {:+.6}\n", result.outperformance);
    result.summary.pretty_print_table();

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, json).context(format!("Failed to write {:?}", path))?;
        println!("\nResult saved to {:?}", path);
    }

    Ok(())
}

fn run_batch(config: EngineConfig, data: &Path, requests: &Path, output: Option<PathBuf>) -> Result<()> {
    let contents = std::fs::read_to_string(requests)
        .context(format!("Failed to read requests from {:?}", requests))?;
    let requests: Vec<BacktestRequest> =
        serde_json::from_str(&contents).context("Failed to parse backtest requests")?;

    info!(count = requests.len(), "running batch");
    let engine = engine_for(config, data);
    let results = engine.run_many(&requests);

    let mut report = Vec::with_capacity(results.len());
    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok(result) => {
                println!(
                    "{:<8} {:<14} performance {:.6} outperformance {:+.6}",
                    request.symbol, request.strategy_type, result.performance, result.outperformance
                );
                report.push(serde_json::json!({ "request": request, "result": result }));
            }
            Err(e) => {
                println!("{:<8} {:<14} failed: {}", request.symbol, request.strategy_type, e);
                report.push(serde_json::json!({ "request": request, "error": e.to_string() }));
            }
        }
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).context(format!("Failed to write {:?}", path))?;
        println!("\nResults saved to {:?}", path);
    }

    Ok(())
}

fn format_params(request: &BacktestRequest) -> String {
    let pairs: Vec<String> = request
        .parameters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    format!("[{}] tc={}", pairs.join(", "), request.transaction_cost)
}
