use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use gate_core::{
    AsyncGatedInvoker, GateConfig, GateError, GateSettings, GatedInvoker, SleepAndRetry,
    WindowSnapshot,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

mod fetch;

use fetch::{AsyncCachedFetcher, CachedFetcher, FetchStats, Page};

#[derive(Parser, Debug)]
#[command(name = "gatectl", version, about = "Cache-aware rate-limited fetch driver")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML gate settings; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    calls: Option<i64>,

    /// Window length in seconds.
    #[arg(long)]
    period: Option<f64>,

    /// Return nothing for throttled calls instead of sleeping and retrying.
    #[arg(long)]
    no_raise: bool,

    #[arg(long, default_value_t = 100)]
    total: u64,

    #[arg(long, default_value_t = 10)]
    keys: u64,

    /// Simulated latency of an uncached fetch.
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    #[arg(long = "async")]
    async_mode: bool,

    /// Print only a JSON summary.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    Init {
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    Show {
        path: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct Summary {
    mode: &'static str,
    calls: u64,
    keys: u64,
    fresh_fetches: u64,
    cache_hits: u64,
    cache_lookups: u64,
    waits: u64,
    throttled: u64,
    elapsed_secs: f64,
    window: WindowSnapshot,
}

struct Outcome {
    page: Option<Page>,
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(command) = &cli.command {
        return handle_config(command);
    }

    if cli.keys == 0 {
        bail!("--keys must be at least 1");
    }
    let settings = resolve_settings(&cli)?;
    let config = GateConfig::try_from(settings).context("invalid gate settings")?;
    info!(
        gate = %config.name(),
        calls = config.calls(),
        period_ms = config.period().as_millis() as u64,
        raise = config.raises_on_limit(),
        "gate configured"
    );

    let summary = if cli.async_mode {
        run_async(&cli, config).await?
    } else {
        let total = cli.total;
        let keys = cli.keys;
        let latency = Duration::from_millis(cli.latency_ms);
        let json = cli.json;
        tokio::task::spawn_blocking(move || run_blocking(config, total, keys, latency, json))
            .await
            .context("demo thread panicked")??
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} calls in {:.2}s: {} fetched, {} from cache, {} waits, {} throttled",
            summary.calls,
            summary.elapsed_secs,
            summary.fresh_fetches,
            summary.cache_hits,
            summary.waits,
            summary.throttled
        );
    }
    Ok(())
}

fn handle_config(command: &Commands) -> Result<()> {
    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force)", path.display());
                }
                default_settings().save(path)?;
                println!("wrote {}", path.display());
            }
            ConfigCommands::Show { path } => {
                let settings = GateSettings::load(path)?;
                let config = GateConfig::try_from(settings).context("invalid gate settings")?;
                println!(
                    "{}: {} fresh calls per {:.3}s, raise_on_limit={}",
                    config.name(),
                    config.calls(),
                    config.period().as_secs_f64(),
                    config.raises_on_limit()
                );
            }
        },
    }
    Ok(())
}

fn default_settings() -> GateSettings {
    GateSettings {
        name: Some("httpbin".into()),
        calls: 1,
        period_secs: 1.0,
        raise_on_limit: true,
    }
}

fn resolve_settings(cli: &Cli) -> Result<GateSettings> {
    let mut settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => default_settings(),
    };
    if let Some(calls) = cli.calls {
        settings.calls = calls;
    }
    if let Some(period) = cli.period {
        settings.period_secs = period;
    }
    if cli.no_raise {
        settings.raise_on_limit = false;
    }
    Ok(settings)
}

fn load_settings(path: &Path) -> Result<GateSettings> {
    GateSettings::load(path).with_context(|| format!("load {}", path.display()))
}

fn ts() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

fn report(quiet: bool, i: u64, key: u64, outcome: &Outcome) {
    if quiet {
        return;
    }
    let source = if outcome.fresh { "fetched" } else { "cache" };
    match &outcome.page {
        Some(page) => println!("{} #{i} key={key} [{source}] {}", ts(), page.body),
        None => println!("{} #{i} key={key} [throttled]", ts()),
    }
}

struct Run {
    mode: &'static str,
    calls: u64,
    keys: u64,
    started: Instant,
    hits: u64,
    throttled: u64,
}

impl Run {
    fn start(mode: &'static str, calls: u64, keys: u64) -> Self {
        Self {
            mode,
            calls,
            keys,
            started: Instant::now(),
            hits: 0,
            throttled: 0,
        }
    }

    // Per caller call: a retried call whose first attempt fetched is fresh.
    fn record(&mut self, outcome: &Outcome) {
        match (&outcome.page, outcome.fresh) {
            (None, _) => self.throttled += 1,
            (Some(_), false) => self.hits += 1,
            (Some(_), true) => {}
        }
    }

    fn finish(self, stats: &FetchStats, waits: u64, window: WindowSnapshot) -> Summary {
        Summary {
            mode: self.mode,
            calls: self.calls,
            keys: self.keys,
            fresh_fetches: stats.fresh(),
            cache_hits: self.hits,
            cache_lookups: stats.hits(),
            waits,
            throttled: self.throttled,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            window,
        }
    }
}

fn run_blocking(
    config: GateConfig,
    total: u64,
    keys: u64,
    latency: Duration,
    quiet: bool,
) -> Result<Summary> {
    let retry = SleepAndRetry::new(GatedInvoker::new(config, CachedFetcher::new(latency)));
    let mut run = Run::start("blocking", total, keys);
    for i in 0..total {
        let key = i % keys;
        let before = retry.gate().inner().stats().fresh();
        let page = retry.invoke(key).map_err(into_anyhow)?;
        let fresh = retry.gate().inner().stats().fresh() > before;
        let outcome = Outcome { page, fresh };
        run.record(&outcome);
        report(quiet, i, key, &outcome);
    }
    Ok(run.finish(
        retry.gate().inner().stats(),
        retry.waits(),
        retry.gate().snapshot(),
    ))
}

async fn run_async(cli: &Cli, config: GateConfig) -> Result<Summary> {
    let fetcher = AsyncCachedFetcher::new(Duration::from_millis(cli.latency_ms));
    let retry = SleepAndRetry::new(AsyncGatedInvoker::new(config, fetcher));
    let mut run = Run::start("async", cli.total, cli.keys);
    for i in 0..cli.total {
        let key = i % cli.keys;
        let before = retry.gate().inner().stats().fresh();
        let page = retry.invoke(key).await.map_err(into_anyhow)?;
        let fresh = retry.gate().inner().stats().fresh() > before;
        let outcome = Outcome { page, fresh };
        run.record(&outcome);
        report(cli.json, i, key, &outcome);
    }
    let window = retry.gate().snapshot().await;
    Ok(run.finish(retry.gate().inner().stats(), retry.waits(), window))
}

fn into_anyhow(err: GateError<anyhow::Error>) -> anyhow::Error {
    match err {
        GateError::Operation(err) => err,
        GateError::RateLimited(limit) => limit.into(),
    }
}
