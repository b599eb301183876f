#![deny(warnings)]

//! Economic dynamics for Namma Market.
//!
//! This crate provides:
//! - The weather/season clock that advances the calendar one day per tick
//! - The per-day price update: cost-push for idli sets, bounded random walk
//!   for everything else, plus weather, rent and labour-market shocks
//! - Small pure helpers (cost basis, smoothing) used by both

use rand::Rng;
use sim_core::{LuxuryDemand, MarketConfig, MarketState, Resource, Season, SimError, Weather};
use tracing::debug;

/// Weighted draw over integer percentage weights.
///
/// Example:
/// let w = sample_weather(Season::Monsoon, &mut rng);
/// assert!(Weather::ALL.contains(&w));
pub fn sample_weather<R: Rng + ?Sized>(season: Season, rng: &mut R) -> Weather {
    let weights = season.weather_weights();
    let total: u32 = weights.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total.max(1));
    for (weather, weight) in weights {
        if roll < *weight {
            return *weather;
        }
        roll -= weight;
    }
    // Only reachable with an all-zero table.
    Weather::Sunny
}

/// Advance the calendar one day, then recompute season and weather.
///
/// Headline writes happen in order (season change, then weather alert); the
/// last one wins.
pub fn advance_clock<R: Rng + ?Sized>(
    state: &mut MarketState,
    rng: &mut R,
) -> Result<(), SimError> {
    state.date = state
        .date
        .succ_opt()
        .ok_or(SimError::CalendarOverflow(state.date))?;

    let season = Season::for_date(state.date);
    if season != state.season {
        state.season = season;
        state.headline = format!("SEASON CHANGE: {} has arrived!", season);
    }

    let weather = sample_weather(state.season, rng);
    if weather != state.weather && weather.is_severe() {
        state.headline = "ALERT: Severe drought conditions reported!".to_string();
    } else if weather == Weather::Rainy && state.season != Season::Monsoon {
        state.headline = "Unexpected rains surprise citizens.".to_string();
    }
    state.weather = weather;
    debug!(date = %state.date, season = %state.season, weather = %state.weather, "clock advanced");
    Ok(())
}

/// Weighted cost of inputs plus overhead, marked up by `margin`.
///
/// Example:
/// // 1.2 * (1.5 * 50 + 0.1 * 250 + 10) = 132
/// assert_eq!(cost_push_target(&cfg, 50.0, 250.0), 132.0);
pub fn cost_push_target(cfg: &sim_core::CostPushConfig, staple: f64, input: f64) -> f64 {
    cfg.margin * (cfg.staple_weight * staple + cfg.input_weight * input + cfg.overhead)
}

/// Move `current` a fraction `factor` of the way toward `target`.
pub fn smooth_toward(current: f64, target: f64, factor: f64) -> f64 {
    current + (target - current) * factor
}

fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

/// Update every tracked price once and append each to its history.
///
/// Returns the headline candidates in the order they were generated. When
/// any exist the first one becomes the state's headline.
pub fn update_prices<R: Rng + ?Sized>(
    state: &mut MarketState,
    market: &MarketConfig,
    rng: &mut R,
) -> Result<Vec<String>, SimError> {
    let mut headlines = Vec::new();

    if let (Some(rent_cfg), Some(rent)) = (&market.rent, state.rent.as_mut()) {
        if roll(rng, rent_cfg.shock_probability) && !rent_cfg.hike_steps.is_empty() {
            let hike = rent_cfg.hike_steps[rng.gen_range(0..rent_cfg.hike_steps.len())];
            *rent += hike;
            headlines.push(format!("RENT HIKE! Landlords demand ₹{:.0}/day.", *rent));
        }
    }

    let target = cost_push_target(
        &market.cost_push,
        state.price(Resource::Rice)?,
        state.price(Resource::CoffeeBeans)?,
    );
    let idli = smooth_toward(
        state.price(Resource::IdliSet)?,
        target,
        market.cost_push.smoothing,
    );
    state.set_price(Resource::IdliSet, idli)?;

    let luxury = market.luxury.good();
    let tracked = state.tracked.clone();
    for res in tracked.into_iter().filter(|r| *r != Resource::IdliSet) {
        let v = market.volatility;
        let mut change = rng.gen_range(1.0 - v..=1.0 + v);

        if res == luxury {
            change += luxury_adjustment(state, market, rng, &mut headlines)?;
        }

        if res == Resource::CoffeeBeans {
            if state.weather.is_severe() {
                change += market.raw_input.drought_nudge;
                if roll(rng, market.headline_probability) {
                    headlines.push(market.bean_drought_headline.clone());
                }
            } else if state.season == Season::Winter {
                change -= market.raw_input.winter_discount;
            }
        }

        if res.is_staple() && state.weather.is_severe() {
            change += market.staple_drought_nudge;
            if roll(rng, market.headline_probability) {
                headlines.push(market.staple_drought_headline.replace("{good}", res.label()));
            }
        }

        if res == Resource::Code {
            let labor = &market.labor;
            change += labor.drift;
            if roll(rng, labor.shock_probability) {
                let shift = if rng.gen_bool(0.5) {
                    -labor.shock_size
                } else {
                    labor.shock_size
                };
                change += shift;
                if labor.announce_shocks {
                    headlines.push(if shift > 0.0 {
                        "Tech Boom! Global startups hiring in Bengaluru.".to_string()
                    } else {
                        "Recession fears: Tech stocks take a hit.".to_string()
                    });
                }
            }
        }

        let next = state.price(res)? * change;
        state.set_price(res, next)?;
        state.record_price(res)?;
    }

    state.record_price(Resource::IdliSet)?;
    if let Some(rent) = state.rent {
        state.rent_history.push(rent);
    }

    if let Some(first) = headlines.first() {
        state.headline = first.clone();
    }
    Ok(headlines)
}

/// Additive factor adjustment for the luxury good.
fn luxury_adjustment<R: Rng + ?Sized>(
    state: &MarketState,
    market: &MarketConfig,
    rng: &mut R,
    headlines: &mut Vec<String>,
) -> Result<f64, SimError> {
    let mut delta = 0.0;
    match &market.luxury {
        LuxuryDemand::RentSqueeze {
            good,
            input_threshold,
            input_cost_push,
            soft_rent,
            soft_drag,
            hard_rent,
            hard_drag,
            growth,
            ceiling,
            ceiling_correction,
        } => {
            if state.price(Resource::CoffeeBeans)? > *input_threshold {
                delta += input_cost_push;
            }
            let rent = state.rent.unwrap_or(0.0);
            if rent > *hard_rent {
                delta -= hard_drag;
                if roll(rng, market.slump_headline_probability) {
                    headlines.push("Cafes reporting lower footfall.".to_string());
                }
            } else if rent > *soft_rent {
                delta -= soft_drag;
            } else {
                delta += growth;
            }
            if state.price(*good)? > *ceiling {
                delta -= ceiling_correction;
            }
        }
        LuxuryDemand::Festival {
            season,
            boost_min,
            boost_max,
            food_price_ceiling,
            drag,
            ..
        } => {
            let boost = if state.season == *season {
                rng.gen_range(*boost_min..=*boost_max)
            } else {
                0.0
            };
            if state.price(Resource::IdliSet)? > *food_price_ceiling {
                delta -= drag;
                if roll(rng, market.slump_headline_probability) {
                    headlines.push(
                        "Flower market slump: 'People spending on food, not flowers'".to_string(),
                    );
                }
            } else {
                delta += boost;
            }
        }
    }
    Ok(delta)
}
