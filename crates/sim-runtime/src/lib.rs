#![deny(warnings)]

//! Tick orchestration for the market simulation.
//!
//! [`MarketEngine`] owns the market state, every agent, the injected RNG and
//! the rolling activity log. One [`MarketEngine::step`] runs a full day:
//! clock, prices, agents, aggregate statistics, log. Presentation layers poll
//! the read accessors or [`MarketEngine::snapshot`] between steps.

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sim_ai::{build_population, Agent};
use sim_core::{
    validate_config, MarketState, Mood, Resource, Season, SimConfig, SimError, Weather,
};
use sim_econ::{advance_clock, update_prices};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Observer-facing copy of the engine state between ticks.
#[derive(Clone, Debug, Serialize)]
pub struct MarketSnapshot {
    pub tick: u64,
    pub date: NaiveDate,
    pub season: Season,
    pub weather: Weather,
    pub headline: String,
    pub mood: Mood,
    pub prices: BTreeMap<Resource, f64>,
    pub history: BTreeMap<Resource, Vec<f64>>,
    pub rent: Option<f64>,
    pub rent_history: Vec<f64>,
    pub avg_consumer_cash: f64,
    /// Most recent first.
    pub logs: Vec<String>,
}

pub struct MarketEngine<R = ChaCha8Rng> {
    config: SimConfig,
    state: MarketState,
    agents: Vec<Agent>,
    logs: Vec<String>,
    rng: R,
    tick: u64,
}

impl MarketEngine<ChaCha8Rng> {
    /// Validate `config` and seed a ChaCha RNG from `config.rng_seed`.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> MarketEngine<R> {
    /// Validate `config` and drive all stochastic draws from `rng`.
    pub fn with_rng(config: SimConfig, rng: R) -> Result<Self, SimError> {
        validate_config(&config)?;
        let state = MarketState::new(&config)?;
        let agents = build_population(&config.population, config.market.luxury.good());
        info!(
            agents = agents.len(),
            luxury = %config.market.luxury.good(),
            rent = config.market.rent.is_some(),
            start = %config.start_date,
            "market engine ready"
        );
        Ok(Self {
            logs: Vec::with_capacity(config.log_capacity),
            config,
            state,
            agents,
            rng,
            tick: 0,
        })
    }

    /// Advance the simulation by exactly one day.
    ///
    /// Errors only on wiring bugs (a price or inventory slot an agent relies
    /// on is missing) or calendar overflow.
    pub fn step(&mut self) -> Result<(), SimError> {
        let previous_headline = self.state.headline.clone();

        advance_clock(&mut self.state, &mut self.rng)?;
        update_prices(&mut self.state, &self.config.market, &mut self.rng)?;

        let mut daily = Vec::with_capacity(self.agents.len() + self.logs.len());
        let mut consumer_cash = 0.0;
        let mut consumers = 0usize;
        for agent in &mut self.agents {
            daily.push(agent.act(&self.state)?);
            if agent.is_consumer() {
                consumer_cash += agent.cash();
                consumers += 1;
            }
        }

        if consumers > 0 {
            self.state.avg_consumer_cash = consumer_cash / consumers as f64;
        }
        if let Some(rent) = self.state.rent {
            self.state.mood = Mood::from_savings_ratio(self.state.avg_consumer_cash / rent);
        }

        daily.append(&mut self.logs);
        daily.truncate(self.config.log_capacity);
        self.logs = daily;
        self.tick += 1;

        if self.state.headline != previous_headline {
            info!(date = %self.state.date, headline = %self.state.headline, "news");
        }
        debug!(
            tick = self.tick,
            date = %self.state.date,
            weather = %self.state.weather,
            mood = %self.state.mood,
            avg_consumer_cash = self.state.avg_consumer_cash,
            "tick complete"
        );
        Ok(())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn date(&self) -> NaiveDate {
        self.state.date
    }

    pub fn season(&self) -> Season {
        self.state.season
    }

    pub fn weather(&self) -> Weather {
        self.state.weather
    }

    pub fn headline(&self) -> &str {
        &self.state.headline
    }

    pub fn mood(&self) -> Mood {
        self.state.mood
    }

    pub fn prices(&self) -> &BTreeMap<Resource, f64> {
        &self.state.prices
    }

    pub fn price(&self, res: Resource) -> Result<f64, SimError> {
        self.state.price(res)
    }

    pub fn history(&self, res: Resource) -> &[f64] {
        self.state.history(res)
    }

    pub fn rent(&self) -> Option<f64> {
        self.state.rent
    }

    pub fn rent_history(&self) -> &[f64] {
        &self.state.rent_history
    }

    pub fn avg_consumer_cash(&self) -> f64 {
        self.state.avg_consumer_cash
    }

    /// Rolling activity log, most recent first.
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            tick: self.tick,
            date: self.state.date,
            season: self.state.season,
            weather: self.state.weather,
            headline: self.state.headline.clone(),
            mood: self.state.mood,
            prices: self.state.prices.clone(),
            history: self.state.history.clone(),
            rent: self.state.rent,
            rent_history: self.state.rent_history.clone(),
            avg_consumer_cash: self.state.avg_consumer_cash,
            logs: self.logs.clone(),
        }
    }
}

/// Step an existing engine `days` times.
pub fn run_days_in_place<R: Rng>(
    engine: &mut MarketEngine<R>,
    days: u32,
) -> Result<(), SimError> {
    for _ in 0..days {
        engine.step()?;
    }
    Ok(())
}

/// Build an engine from `config`, run it for `days` and return the final
/// snapshot.
pub fn run_days(config: SimConfig, days: u32) -> Result<MarketSnapshot, SimError> {
    let mut engine = MarketEngine::new(config)?;
    run_days_in_place(&mut engine, days)?;
    Ok(engine.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{ValidationError, PRICE_FLOOR};

    #[test]
    fn engine_starts_at_epoch() {
        let engine = MarketEngine::new(SimConfig::default()).unwrap();
        assert_eq!(engine.tick(), 0);
        assert_eq!(engine.date(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(engine.season(), Season::Winter);
        assert_eq!(engine.weather(), Weather::Sunny);
        assert_eq!(engine.mood(), Mood::Stable);
        assert_eq!(engine.headline(), "Market opens: Rents are stable.");
        assert!(engine.logs().is_empty());
        assert_eq!(engine.agents().len(), 16);
        assert_eq!(engine.rent_history(), &[2000.0]);
    }

    #[test]
    fn step_advances_one_day() {
        let mut engine = MarketEngine::new(SimConfig::default()).unwrap();
        engine.step().unwrap();
        engine.step().unwrap();
        assert_eq!(engine.tick(), 2);
        assert_eq!(engine.date(), NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn log_is_bounded_and_newest_first() {
        let mut engine = MarketEngine::new(SimConfig::default()).unwrap();
        let names: Vec<String> = engine.agents().iter().map(|a| a.name().to_string()).collect();
        let a = names.len();
        for n in 1..=5usize {
            engine.step().unwrap();
            let logs = engine.logs();
            assert_eq!(logs.len(), (n * a).min(50));
            for (line, name) in logs.iter().zip(&names) {
                assert!(line.starts_with(name.as_str()), "{line} should come from {name}");
            }
        }
    }

    #[test]
    fn histories_grow_once_per_step() {
        let mut engine = MarketEngine::new(SimConfig::festival()).unwrap();
        for n in 1..=40usize {
            engine.step().unwrap();
            for res in engine.state().tracked.clone() {
                assert_eq!(engine.history(res).len(), n + 1);
                assert!(engine.price(res).unwrap() >= PRICE_FLOOR);
            }
        }
        assert!(engine.rent_history().is_empty());
        assert_eq!(engine.mood(), Mood::Stable);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let a = run_days(SimConfig::default(), 200).unwrap();
        let b = run_days(SimConfig::default(), 200).unwrap();
        assert_eq!(a.history, b.history);
        assert_eq!(a.rent_history, b.rent_history);
        assert_eq!(a.logs, b.logs);

        let mut other = SimConfig::default();
        other.rng_seed = 7;
        let c = run_days(other, 200).unwrap();
        assert_ne!(a.history, c.history);
    }

    #[test]
    fn injected_rng_matches_seeded_constructor() {
        let config = SimConfig::festival();
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let mut injected = MarketEngine::with_rng(config.clone(), rng).unwrap();
        let mut seeded = MarketEngine::new(config).unwrap();
        run_days_in_place(&mut injected, 30).unwrap();
        run_days_in_place(&mut seeded, 30).unwrap();
        assert_eq!(injected.snapshot().history, seeded.snapshot().history);
    }

    #[test]
    fn mood_tracks_savings_to_rent() {
        let mut engine = MarketEngine::new(SimConfig::default()).unwrap();
        engine.step().unwrap();
        let rent = engine.rent().unwrap();
        let expected = Mood::from_savings_ratio(engine.avg_consumer_cash() / rent);
        assert_eq!(engine.mood(), expected);
        assert_ne!(engine.mood(), Mood::Stable);

        let consumers: Vec<f64> = engine
            .agents()
            .iter()
            .filter(|a| a.is_consumer())
            .map(Agent::cash)
            .collect();
        let mean = consumers.iter().sum::<f64>() / consumers.len() as f64;
        assert!((engine.avg_consumer_cash() - mean).abs() < 1e-9);
    }

    #[test]
    fn broke_consumers_panic() {
        let mut config = SimConfig::default();
        config.population.consumer.starting_cash = 0.0;
        config.population.consumer.wage = 0.0;
        let mut engine = MarketEngine::new(config).unwrap();
        engine.step().unwrap();
        assert_eq!(engine.mood(), Mood::Panic);
        // Rent still deducted: cash runs negative.
        assert!(engine.avg_consumer_cash() < 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.market.rent = None;
        assert!(matches!(
            MarketEngine::new(config),
            Err(SimError::Invalid(ValidationError::LuxuryNeedsRent))
        ));
    }

    #[test]
    fn snapshot_serializes() {
        let snap = run_days(SimConfig::default(), 3).unwrap();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["tick"], 3);
        assert_eq!(json["date"], "2025-01-04");
        assert_eq!(json["logs"].as_array().unwrap().len(), 48);
    }

    #[test]
    fn empty_population_still_ticks() {
        let mut config = SimConfig::festival();
        config.population.producer_groups.clear();
        config.population.consumer.count = 0;
        config.population.intermediary.count = 0;
        let snap = run_days(config, 10).unwrap();
        assert!(snap.logs.is_empty());
        assert_eq!(snap.avg_consumer_cash, 5000.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]
        #[test]
        fn floor_and_history_hold_for_any_seed(seed in any::<u64>(), days in 1u32..150, festival in any::<bool>()) {
            let mut config = if festival { SimConfig::festival() } else { SimConfig::rent_squeeze() };
            config.rng_seed = seed;
            let snap = run_days(config, days).unwrap();
            for (res, series) in &snap.history {
                prop_assert_eq!(series.len(), days as usize + 1);
                prop_assert!(series.iter().all(|p| *p >= PRICE_FLOOR), "{} breached the floor", res);
            }
            prop_assert!(snap.logs.len() <= 50);
            prop_assert!(snap.rent_history.windows(2).all(|w| w[1] >= w[0]));
        }
    }
}
