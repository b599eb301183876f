#![deny(warnings)]

//! Headless driver: builds a market, runs it for a number of days and
//! prints a summary or a JSON snapshot.

use anyhow::{bail, Context, Result};
use sim_core::{validate_config, Resource, SimConfig};
use sim_runtime::{run_days_in_place, MarketEngine};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    days: Option<u32>,
    seed: Option<u64>,
    scenario: Option<String>,
    config: Option<PathBuf>,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--days" => {
                let v = it.next().context("--days needs a value")?;
                args.days = Some(v.parse().with_context(|| format!("bad --days {v}"))?);
            }
            "--seed" => {
                let v = it.next().context("--seed needs a value")?;
                args.seed = Some(v.parse().with_context(|| format!("bad --seed {v}"))?);
            }
            "--scenario" => args.scenario = it.next(),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--json" => args.json = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match (&args.config, args.scenario.as_deref()) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        (None, None) | (None, Some("rent-squeeze")) => SimConfig::rent_squeeze(),
        (None, Some("festival")) => SimConfig::festival(),
        (None, Some(other)) => {
            bail!("unknown scenario {other} (expected rent-squeeze or festival)")
        }
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    validate_config(&config)?;
    Ok(config)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    info!(?args, "starting CLI");

    let config = load_config(&args)?;
    let days = args.days.unwrap_or(365);
    let mut engine = MarketEngine::new(config)?;
    run_days_in_place(&mut engine, days)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        return Ok(());
    }

    println!(
        "Day {} | {} | {} | {} | mood: {}",
        engine.tick(),
        engine.date(),
        engine.season(),
        engine.weather(),
        engine.mood()
    );
    println!("News | {}", engine.headline());
    for (res, price) in engine.prices() {
        let opening = engine.history(*res).first().copied().unwrap_or(*price);
        println!(
            "{:<15} ₹{:>9.2}  ({:+.1}% since open)",
            res.label(),
            price,
            (price / opening - 1.0) * 100.0
        );
    }
    if let Some(rent) = engine.rent() {
        println!(
            "Rent ₹{:.0}/day | avg consumer cash ₹{:.0}",
            rent,
            engine.avg_consumer_cash()
        );
    }
    let idli_stock: f64 = engine
        .agents()
        .iter()
        .map(|a| a.holding(Resource::IdliSet))
        .sum();
    println!("Idli sets held across the market: {idli_stock:.0}");
    for line in engine.logs().iter().take(5) {
        println!("  {line}");
    }
    Ok(())
}
