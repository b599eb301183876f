#![deny(warnings)]

//! Core domain models and invariants for Namma Market.
//!
//! This crate defines the closed catalogs (resources, regions, seasons,
//! weather), the shared [`MarketState`], the serializable simulation
//! configuration and the validation helpers that guarantee a configuration is
//! wired consistently before any tick runs.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Lowest price any tracked resource may settle at after an update.
pub const PRICE_FLOOR: f64 = 5.0;

/// Default number of entries kept in the rolling activity log.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Tradable goods plus the unit of account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Staple grain grown by Mandya farmers.
    Ragi,
    /// Processed staple, main input of the idli recipe.
    Rice,
    /// Raw coffee beans from Coorg estates.
    CoffeeBeans,
    /// Processed luxury good in the rent-squeeze economy.
    ArtisanCoffee,
    /// Luxury good in the festival economy.
    Flowers,
    /// Abstract labour output of the tech sector.
    Code,
    /// Finished consumer good priced by cost-push.
    IdliSet,
    /// Currency. Never carries a price.
    Inr,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Ragi,
        Resource::Rice,
        Resource::CoffeeBeans,
        Resource::ArtisanCoffee,
        Resource::Flowers,
        Resource::Code,
        Resource::IdliSet,
        Resource::Inr,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Resource::Ragi => "Ragi",
            Resource::Rice => "Rice",
            Resource::CoffeeBeans => "Coffee Beans",
            Resource::ArtisanCoffee => "Artisan Coffee",
            Resource::Flowers => "Flowers",
            Resource::Code => "Code",
            Resource::IdliSet => "Idli Set",
            Resource::Inr => "INR",
        }
    }

    pub fn is_currency(self) -> bool {
        self == Resource::Inr
    }

    pub fn is_luxury(self) -> bool {
        matches!(self, Resource::ArtisanCoffee | Resource::Flowers)
    }

    pub fn is_staple(self) -> bool {
        matches!(self, Resource::Ragi | Resource::Rice)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Geographic zone an agent is attached to. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    Bengaluru,
    Mandya,
    Coorg,
    Mysore,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::Bengaluru => "Bengaluru",
            Region::Mandya => "Mandya",
            Region::Coorg => "Coorg",
            Region::Mysore => "Mysore",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observable weather tags. `Drought` is the severe one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Drought,
}

impl Weather {
    pub const ALL: [Weather; 4] = [
        Weather::Sunny,
        Weather::Cloudy,
        Weather::Rainy,
        Weather::Drought,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weather::Sunny => "Sunny",
            Weather::Cloudy => "Cloudy",
            Weather::Rainy => "Rainy",
            Weather::Drought => "Drought",
        }
    }

    pub fn is_severe(self) -> bool {
        self == Weather::Drought
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calendar seasons, derived from the month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// March to May.
    Summer,
    /// June to September.
    Monsoon,
    /// October to December, the festival months.
    PostMonsoon,
    /// January and February.
    Winter,
}

const MONSOON_WEATHER: [(Weather, u32); 3] = [
    (Weather::Rainy, 70),
    (Weather::Cloudy, 20),
    (Weather::Sunny, 10),
];
const SUMMER_WEATHER: [(Weather, u32); 3] = [
    (Weather::Sunny, 80),
    (Weather::Drought, 15),
    (Weather::Rainy, 5),
];
const WINTER_WEATHER: [(Weather, u32); 3] = [
    (Weather::Sunny, 60),
    (Weather::Cloudy, 30),
    (Weather::Rainy, 10),
];
const POST_MONSOON_WEATHER: [(Weather, u32); 3] = [
    (Weather::Cloudy, 40),
    (Weather::Sunny, 40),
    (Weather::Rainy, 20),
];

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Summer,
        Season::Monsoon,
        Season::PostMonsoon,
        Season::Winter,
    ];

    /// Season for a calendar month (1 = January). Out-of-range months fall
    /// into `Winter`.
    pub fn for_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Summer,
            6..=9 => Season::Monsoon,
            10..=12 => Season::PostMonsoon,
            _ => Season::Winter,
        }
    }

    pub fn for_date(date: NaiveDate) -> Season {
        Season::for_month(date.month())
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Summer => "Summer",
            Season::Monsoon => "Monsoon",
            Season::PostMonsoon => "Post-Monsoon",
            Season::Winter => "Winter",
        }
    }

    /// Integer percentage weights of each weather tag in this season.
    pub fn weather_weights(self) -> &'static [(Weather, u32)] {
        match self {
            Season::Monsoon => &MONSOON_WEATHER,
            Season::Summer => &SUMMER_WEATHER,
            Season::Winter => &WINTER_WEATHER,
            Season::PostMonsoon => &POST_MONSOON_WEATHER,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse classification of consumer financial health.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    /// Initial mood, and the permanent one when rent is not tracked.
    Stable,
    Optimistic,
    Anxious,
    Panic,
}

/// Savings-to-rent ratio below which consumers panic.
pub const PANIC_RATIO: f64 = 5.0;
/// Savings-to-rent ratio below which consumers are anxious.
pub const ANXIOUS_RATIO: f64 = 15.0;

impl Mood {
    /// Classify the ratio of mean consumer cash to rent.
    pub fn from_savings_ratio(ratio: f64) -> Mood {
        if ratio < PANIC_RATIO {
            Mood::Panic
        } else if ratio < ANXIOUS_RATIO {
            Mood::Anxious
        } else {
            Mood::Optimistic
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Stable => "Stable",
            Mood::Optimistic => "Optimistic",
            Mood::Anxious => "Anxious",
            Mood::Panic => "Panic",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Macro cost paid by every consumer each day.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RentConfig {
    /// Starting daily rent.
    pub initial: f64,
    /// Per-tick probability of a rent hike.
    pub shock_probability: f64,
    /// Candidate hike sizes, one picked uniformly per shock.
    pub hike_steps: Vec<f64>,
}

/// Cost-push rule for the finished good (idli sets).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostPushConfig {
    /// Weight of the rice price in the cost basis.
    pub staple_weight: f64,
    /// Weight of the coffee bean price in the cost basis.
    pub input_weight: f64,
    /// Fixed overhead added to the cost basis.
    pub overhead: f64,
    /// Multiplier applied to the cost basis.
    pub margin: f64,
    /// Fraction of the gap to target closed per tick, in (0, 1].
    pub smoothing: f64,
}

/// Demand coupling for the luxury good.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LuxuryDemand {
    /// Cafe economy: prices follow bean costs and soften when rent bites.
    RentSqueeze {
        good: Resource,
        /// Bean price above which cafes pass costs on.
        input_threshold: f64,
        input_cost_push: f64,
        /// Rent above which demand slows mildly.
        soft_rent: f64,
        soft_drag: f64,
        /// Rent above which demand contracts.
        hard_rent: f64,
        hard_drag: f64,
        /// Demand growth while rent stays below `soft_rent`.
        growth: f64,
        ceiling: f64,
        ceiling_correction: f64,
    },
    /// Festival economy: seasonal spikes unless food is expensive.
    Festival {
        good: Resource,
        season: Season,
        boost_min: f64,
        boost_max: f64,
        /// Finished-good price above which consumers skip luxuries.
        food_price_ceiling: f64,
        drag: f64,
    },
}

impl LuxuryDemand {
    pub fn good(&self) -> Resource {
        match self {
            LuxuryDemand::RentSqueeze { good, .. } | LuxuryDemand::Festival { good, .. } => *good,
        }
    }
}

/// Raw coffee bean dynamics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawInputConfig {
    pub drought_nudge: f64,
    /// Off-season softening applied in winter when there is no drought.
    pub winter_discount: f64,
}

/// Labour output dynamics: secular drift plus rare boom/bust shocks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaborConfig {
    pub drift: f64,
    pub shock_probability: f64,
    pub shock_size: f64,
    /// Emit boom/bust headlines when a shock fires.
    pub announce_shocks: bool,
}

/// Everything the price update engine needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Opening price of every tracked resource.
    pub initial_prices: BTreeMap<Resource, f64>,
    /// Half-width of the idiosyncratic multiplicative noise.
    pub volatility: f64,
    /// Rent tracking; `None` disables rent, rent shocks and mood.
    pub rent: Option<RentConfig>,
    pub cost_push: CostPushConfig,
    pub luxury: LuxuryDemand,
    pub raw_input: RawInputConfig,
    /// Factor nudge applied to staples during drought.
    pub staple_drought_nudge: f64,
    pub labor: LaborConfig,
    /// Chance that a drought or demand nudge also produces a headline.
    pub headline_probability: f64,
    /// Chance that a cafe demand contraction produces a headline.
    pub slump_headline_probability: f64,
    /// Headline shown before the first tick.
    pub opening_headline: String,
    /// Headline raised when drought hits the bean crop.
    pub bean_drought_headline: String,
    /// Headline raised when drought hits a staple; `{good}` becomes its label.
    pub staple_drought_headline: String,
}

impl MarketConfig {
    /// Tracked resources in price-update order.
    pub fn tracked_resources(&self) -> Vec<Resource> {
        vec![
            Resource::Ragi,
            Resource::Rice,
            Resource::CoffeeBeans,
            self.luxury.good(),
            Resource::Code,
            Resource::IdliSet,
        ]
    }
}

/// Harvest per day for each weather tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YieldTable {
    pub sunny: f64,
    pub cloudy: f64,
    pub rainy: f64,
    pub drought: f64,
}

impl YieldTable {
    pub fn for_weather(&self, weather: Weather) -> f64 {
        match weather {
            Weather::Sunny => self.sunny,
            Weather::Cloudy => self.cloudy,
            Weather::Rainy => self.rainy,
            Weather::Drought => self.drought,
        }
    }
}

/// A named batch of producers sharing a crop and region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProducerGroup {
    pub name_prefix: String,
    pub region: Region,
    pub crop: Resource,
    pub count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub starting_cash: f64,
    /// Ragi each producer starts with.
    pub starting_staple: f64,
    /// Crop units kept back after selling.
    pub keep_buffer: f64,
    pub yields: YieldTable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub name_prefix: String,
    pub region: Region,
    pub count: u32,
    pub wage: f64,
    pub starting_cash: f64,
    /// Cash a consumer must exceed before buying a luxury.
    pub luxury_threshold: f64,
    /// Log note for a day without the luxury; `{good}` becomes its label.
    pub skip_luxury_note: String,
}

/// Fixed input-to-output conversion used by intermediaries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipe {
    pub staple: f64,
    pub input: f64,
    pub output: f64,
}

/// Restock rule: buy `batch` units once holdings drop below `below`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Restock {
    pub below: f64,
    pub batch: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntermediaryConfig {
    pub name_prefix: String,
    pub region: Region,
    pub count: u32,
    pub starting_cash: f64,
    pub starting_staple: f64,
    pub starting_input: f64,
    pub staple_restock: Restock,
    pub input_restock: Restock,
    pub recipe: Recipe,
}

/// Agent counts and per-role parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub producer_groups: Vec<ProducerGroup>,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub intermediary: IntermediaryConfig,
}

impl PopulationConfig {
    pub fn agent_count(&self) -> usize {
        self.producer_groups
            .iter()
            .map(|g| g.count)
            .chain([self.consumer.count, self.intermediary.count])
            .fold(0usize, |total, n| total.saturating_add(n as usize))
    }
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for the deterministic RNG.
    pub rng_seed: u64,
    /// Date of the opening state; the first tick moves one day past it.
    pub start_date: NaiveDate,
    /// Maximum entries in the rolling log.
    pub log_capacity: usize,
    pub market: MarketConfig,
    pub population: PopulationConfig,
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn opening_prices(luxury: Resource, luxury_price: f64) -> BTreeMap<Resource, f64> {
    BTreeMap::from([
        (Resource::Ragi, 35.0),
        (Resource::Rice, 50.0),
        (Resource::CoffeeBeans, 250.0),
        (luxury, luxury_price),
        (Resource::Code, 1000.0),
        (Resource::IdliSet, 40.0),
    ])
}

fn default_producer_groups() -> Vec<ProducerGroup> {
    vec![
        ProducerGroup {
            name_prefix: "Raitha".to_string(),
            region: Region::Mandya,
            crop: Resource::Ragi,
            count: 5,
        },
        ProducerGroup {
            name_prefix: "Planter".to_string(),
            region: Region::Coorg,
            crop: Resource::CoffeeBeans,
            count: 3,
        },
    ]
}

fn default_producer() -> ProducerConfig {
    ProducerConfig {
        starting_cash: 500.0,
        starting_staple: 10.0,
        keep_buffer: 2.0,
        yields: YieldTable {
            sunny: 10.0,
            cloudy: 5.0,
            rainy: 5.0,
            drought: 1.0,
        },
    }
}

fn default_intermediary() -> IntermediaryConfig {
    IntermediaryConfig {
        name_prefix: "Darshini".to_string(),
        region: Region::Bengaluru,
        count: 3,
        starting_cash: 2000.0,
        starting_staple: 10.0,
        starting_input: 5.0,
        staple_restock: Restock {
            below: 5.0,
            batch: 10.0,
        },
        input_restock: Restock {
            below: 2.0,
            batch: 5.0,
        },
        recipe: Recipe {
            staple: 1.0,
            input: 0.2,
            output: 5.0,
        },
    }
}

fn default_cost_push() -> CostPushConfig {
    CostPushConfig {
        staple_weight: 1.5,
        input_weight: 0.1,
        overhead: 10.0,
        margin: 1.2,
        smoothing: 0.2,
    }
}

impl SimConfig {
    /// Bengaluru under rising rents: artisan coffee as the luxury index,
    /// salaried techies with a savings target, mood tracking.
    pub fn rent_squeeze() -> Self {
        Self {
            rng_seed: 42,
            start_date: default_start_date(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            market: MarketConfig {
                initial_prices: opening_prices(Resource::ArtisanCoffee, 300.0),
                volatility: 0.02,
                rent: Some(RentConfig {
                    initial: 2000.0,
                    shock_probability: 0.02,
                    hike_steps: vec![100.0, 200.0, 500.0],
                }),
                cost_push: default_cost_push(),
                luxury: LuxuryDemand::RentSqueeze {
                    good: Resource::ArtisanCoffee,
                    input_threshold: 260.0,
                    input_cost_push: 0.01,
                    soft_rent: 2500.0,
                    soft_drag: 0.005,
                    hard_rent: 3000.0,
                    hard_drag: 0.015,
                    growth: 0.005,
                    ceiling: 500.0,
                    ceiling_correction: 0.02,
                },
                raw_input: RawInputConfig {
                    drought_nudge: 0.04,
                    winter_discount: 0.0,
                },
                staple_drought_nudge: 0.05,
                labor: LaborConfig {
                    drift: 0.001,
                    shock_probability: 0.05,
                    shock_size: 0.05,
                    announce_shocks: false,
                },
                headline_probability: 0.2,
                slump_headline_probability: 0.1,
                opening_headline: "Market opens: Rents are stable.".to_string(),
                bean_drought_headline: "Coffee crop failure in Coorg!".to_string(),
                staple_drought_headline: "{good} shortage due to drought.".to_string(),
            },
            population: PopulationConfig {
                producer_groups: default_producer_groups(),
                producer: default_producer(),
                consumer: ConsumerConfig {
                    name_prefix: "Dev".to_string(),
                    region: Region::Bengaluru,
                    count: 5,
                    wage: 3000.0,
                    starting_cash: 40000.0,
                    luxury_threshold: 50000.0,
                    skip_luxury_note: "SAVING MODE (no {good}).".to_string(),
                },
                intermediary: default_intermediary(),
            },
        }
    }

    /// The festival economy: no rent, flowers spike around Dasara and
    /// Deepavali, and tech booms and busts make the news.
    pub fn festival() -> Self {
        let mut config = Self::rent_squeeze();
        config.market.initial_prices = opening_prices(Resource::Flowers, 80.0);
        config.market.rent = None;
        config.market.luxury = LuxuryDemand::Festival {
            good: Resource::Flowers,
            season: Season::PostMonsoon,
            boost_min: 0.05,
            boost_max: 0.15,
            food_price_ceiling: 60.0,
            drag: 0.05,
        };
        config.market.raw_input = RawInputConfig {
            drought_nudge: 0.03,
            winter_discount: 0.01,
        };
        config.market.labor = LaborConfig {
            drift: 0.0,
            shock_probability: 0.05,
            shock_size: 0.1,
            announce_shocks: true,
        };
        config.market.opening_headline = "Market opens for the new year!".to_string();
        config.market.bean_drought_headline =
            "Planters worry as drought hits coffee estates.".to_string();
        config.market.staple_drought_headline =
            "{good} prices soar due to lack of rain.".to_string();
        config.population.consumer.wage = 2000.0;
        config.population.consumer.starting_cash = 5000.0;
        config.population.consumer.luxury_threshold = 5000.0;
        config.population.consumer.skip_luxury_note = "Too broke for {good}!".to_string();
        config
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::rent_squeeze()
    }
}

/// The single shared mutable market entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketState {
    pub date: NaiveDate,
    pub season: Season,
    pub weather: Weather,
    pub prices: BTreeMap<Resource, f64>,
    /// Append-only price series, seeded with the opening price.
    pub history: BTreeMap<Resource, Vec<f64>>,
    /// Current rent when rent tracking is enabled.
    pub rent: Option<f64>,
    pub rent_history: Vec<f64>,
    pub headline: String,
    pub mood: Mood,
    /// Mean consumer cash after the latest agent pass.
    pub avg_consumer_cash: f64,
    /// Tracked resources in price-update order.
    pub tracked: Vec<Resource>,
}

impl MarketState {
    /// Build the opening state. The config should already be validated.
    pub fn new(config: &SimConfig) -> Result<Self, ValidationError> {
        let tracked = config.market.tracked_resources();
        let mut prices = BTreeMap::new();
        let mut history = BTreeMap::new();
        for &res in &tracked {
            let price = *config
                .market
                .initial_prices
                .get(&res)
                .ok_or(ValidationError::MissingPrice(res))?;
            prices.insert(res, price);
            history.insert(res, vec![price]);
        }
        let rent = config.market.rent.as_ref().map(|r| r.initial);
        Ok(Self {
            date: config.start_date,
            season: Season::Winter,
            weather: Weather::Sunny,
            prices,
            history,
            rent,
            rent_history: rent.into_iter().collect(),
            headline: config.market.opening_headline.clone(),
            mood: Mood::Stable,
            avg_consumer_cash: config.population.consumer.starting_cash,
            tracked,
        })
    }

    /// Current price of a tracked resource.
    pub fn price(&self, res: Resource) -> Result<f64, SimError> {
        self.prices
            .get(&res)
            .copied()
            .ok_or(SimError::MissingPrice(res))
    }

    /// Overwrite a price, clamping it to [`PRICE_FLOOR`].
    pub fn set_price(&mut self, res: Resource, price: f64) -> Result<f64, SimError> {
        let slot = self
            .prices
            .get_mut(&res)
            .ok_or(SimError::MissingPrice(res))?;
        *slot = price.max(PRICE_FLOOR);
        Ok(*slot)
    }

    /// Append the current price of `res` to its history.
    pub fn record_price(&mut self, res: Resource) -> Result<(), SimError> {
        let price = self.price(res)?;
        self.history
            .get_mut(&res)
            .ok_or(SimError::MissingPrice(res))?
            .push(price);
        Ok(())
    }

    pub fn history(&self, res: Resource) -> &[f64] {
        self.history.get(&res).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Validation errors for configuration invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A tracked resource has no opening price.
    #[error("no opening price for tracked resource {0}")]
    MissingPrice(Resource),
    /// Prices must be finite and strictly positive.
    #[error("opening price for {0} must be finite and > 0")]
    InvalidPrice(Resource),
    /// The currency is the unit of account and cannot be priced.
    #[error("currency cannot carry a market price")]
    PricedCurrency,
    /// Numeric field must be finite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),
    /// Probability outside [0, 1].
    #[error("probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    /// Volatility must lie in [0, 1).
    #[error("volatility {0} is outside [0, 1)")]
    InvalidVolatility(f64),
    /// Smoothing must lie in (0, 1].
    #[error("smoothing {0} is outside (0, 1]")]
    InvalidSmoothing(f64),
    /// Rent-coupled luxury demand needs rent tracking.
    #[error("rent-squeeze luxury demand requires rent tracking")]
    LuxuryNeedsRent,
    /// The luxury slot holds a non-luxury good.
    #[error("{0} is not a luxury good")]
    NotLuxury(Resource),
    /// Producers must grow a staple or a raw input.
    #[error("{0} cannot be grown by producers")]
    InvalidCrop(Resource),
    /// Rent hike candidates must be non-empty and non-negative.
    #[error("rent hike steps must be non-empty and >= 0")]
    InvalidHikeSteps,
    /// The rolling log must hold at least one entry.
    #[error("log capacity must be > 0")]
    ZeroLogCapacity,
    /// Festival boost range must not be inverted.
    #[error("luxury boost range [{min}, {max}] is inverted")]
    InvalidBoostRange { min: f64, max: f64 },
    /// Season weather weights must sum to 100.
    #[error("weather weights for {0} do not sum to 100")]
    InvalidWeights(Season),
}

/// Errors raised while running a tick.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// Price lookup for a resource the market does not track.
    #[error("no market price for {0}")]
    MissingPrice(Resource),
    /// An agent lacks an inventory slot its policy relies on.
    #[error("agent {agent} has no inventory slot for {resource}")]
    MissingInventory { agent: String, resource: Resource },
    /// Date arithmetic ran past the calendar's range.
    #[error("calendar overflow after {0}")]
    CalendarOverflow(NaiveDate),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite(name))
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidProbability { name, value })
    }
}

/// Validate the season weather tables.
pub fn validate_weather_tables() -> Result<(), ValidationError> {
    for season in Season::ALL {
        let total: u32 = season.weather_weights().iter().map(|(_, w)| w).sum();
        if total != 100 {
            return Err(ValidationError::InvalidWeights(season));
        }
    }
    Ok(())
}

/// Validate market parameters, including catalog coverage of tracked goods.
pub fn validate_market(m: &MarketConfig) -> Result<(), ValidationError> {
    if m.initial_prices.contains_key(&Resource::Inr) {
        return Err(ValidationError::PricedCurrency);
    }
    for res in m.tracked_resources() {
        let price = *m
            .initial_prices
            .get(&res)
            .ok_or(ValidationError::MissingPrice(res))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::InvalidPrice(res));
        }
    }
    if !(0.0..1.0).contains(&m.volatility) {
        return Err(ValidationError::InvalidVolatility(m.volatility));
    }
    let cp = &m.cost_push;
    for (name, v) in [
        ("cost_push.staple_weight", cp.staple_weight),
        ("cost_push.input_weight", cp.input_weight),
        ("cost_push.overhead", cp.overhead),
        ("cost_push.margin", cp.margin),
    ] {
        check_finite(name, v)?;
    }
    if !(cp.smoothing > 0.0 && cp.smoothing <= 1.0) {
        return Err(ValidationError::InvalidSmoothing(cp.smoothing));
    }
    if let Some(rent) = &m.rent {
        if !rent.initial.is_finite() || rent.initial <= 0.0 {
            return Err(ValidationError::NonFinite("rent.initial"));
        }
        check_probability("rent.shock_probability", rent.shock_probability)?;
        if rent.hike_steps.is_empty()
            || rent.hike_steps.iter().any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(ValidationError::InvalidHikeSteps);
        }
    }
    let good = m.luxury.good();
    if !good.is_luxury() {
        return Err(ValidationError::NotLuxury(good));
    }
    match &m.luxury {
        LuxuryDemand::RentSqueeze { .. } if m.rent.is_none() => {
            return Err(ValidationError::LuxuryNeedsRent);
        }
        LuxuryDemand::Festival {
            boost_min,
            boost_max,
            ..
        } => {
            check_finite("luxury.boost_min", *boost_min)?;
            check_finite("luxury.boost_max", *boost_max)?;
            if boost_min > boost_max {
                return Err(ValidationError::InvalidBoostRange {
                    min: *boost_min,
                    max: *boost_max,
                });
            }
        }
        LuxuryDemand::RentSqueeze { .. } => {}
    }
    check_finite("raw_input.drought_nudge", m.raw_input.drought_nudge)?;
    check_finite("raw_input.winter_discount", m.raw_input.winter_discount)?;
    check_finite("staple_drought_nudge", m.staple_drought_nudge)?;
    check_finite("labor.drift", m.labor.drift)?;
    check_finite("labor.shock_size", m.labor.shock_size)?;
    check_probability("labor.shock_probability", m.labor.shock_probability)?;
    check_probability("headline_probability", m.headline_probability)?;
    check_probability("slump_headline_probability", m.slump_headline_probability)?;
    Ok(())
}

/// Validate agent parameters.
pub fn validate_population(p: &PopulationConfig) -> Result<(), ValidationError> {
    for group in &p.producer_groups {
        if !(group.crop.is_staple() || group.crop == Resource::CoffeeBeans) {
            return Err(ValidationError::InvalidCrop(group.crop));
        }
    }
    let y = &p.producer.yields;
    for (name, v) in [
        ("producer.starting_cash", p.producer.starting_cash),
        ("producer.starting_staple", p.producer.starting_staple),
        ("producer.keep_buffer", p.producer.keep_buffer),
        ("producer.yields.sunny", y.sunny),
        ("producer.yields.cloudy", y.cloudy),
        ("producer.yields.rainy", y.rainy),
        ("producer.yields.drought", y.drought),
        ("consumer.wage", p.consumer.wage),
        ("consumer.starting_cash", p.consumer.starting_cash),
        ("consumer.luxury_threshold", p.consumer.luxury_threshold),
        ("intermediary.starting_cash", p.intermediary.starting_cash),
        ("intermediary.starting_staple", p.intermediary.starting_staple),
        ("intermediary.starting_input", p.intermediary.starting_input),
        ("intermediary.staple_restock.below", p.intermediary.staple_restock.below),
        ("intermediary.staple_restock.batch", p.intermediary.staple_restock.batch),
        ("intermediary.input_restock.below", p.intermediary.input_restock.below),
        ("intermediary.input_restock.batch", p.intermediary.input_restock.batch),
        ("intermediary.recipe.staple", p.intermediary.recipe.staple),
        ("intermediary.recipe.input", p.intermediary.recipe.input),
        ("intermediary.recipe.output", p.intermediary.recipe.output),
    ] {
        check_finite(name, v)?;
    }
    Ok(())
}

/// Validate a full configuration before building an engine.
pub fn validate_config(config: &SimConfig) -> Result<(), ValidationError> {
    if config.log_capacity == 0 {
        return Err(ValidationError::ZeroLogCapacity);
    }
    validate_weather_tables()?;
    validate_market(&config.market)?;
    validate_population(&config.population)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn month_bands_partition_the_year() {
        let mut counts: BTreeMap<Season, u32> = BTreeMap::new();
        for month in 1..=12 {
            *counts.entry(Season::for_month(month)).or_default() += 1;
        }
        assert_eq!(counts.values().sum::<u32>(), 12);
        assert_eq!(counts[&Season::Summer], 3);
        assert_eq!(counts[&Season::Monsoon], 4);
        assert_eq!(counts[&Season::PostMonsoon], 3);
        assert_eq!(counts[&Season::Winter], 2);
        assert_eq!(Season::for_month(1), Season::Winter);
        assert_eq!(Season::for_month(2), Season::Winter);
        assert_eq!(Season::for_month(3), Season::Summer);
        assert_eq!(Season::for_month(9), Season::Monsoon);
        assert_eq!(Season::for_month(10), Season::PostMonsoon);
    }

    #[test]
    fn weather_tables_sum_to_one_hundred() {
        validate_weather_tables().unwrap();
        for season in Season::ALL {
            let tags: Vec<Weather> = season.weather_weights().iter().map(|(w, _)| *w).collect();
            assert!(tags.iter().all(|t| Weather::ALL.contains(t)));
        }
    }

    #[test]
    fn mood_thresholds() {
        assert_eq!(Mood::from_savings_ratio(4.99), Mood::Panic);
        assert_eq!(Mood::from_savings_ratio(5.0), Mood::Anxious);
        assert_eq!(Mood::from_savings_ratio(14.9), Mood::Anxious);
        assert_eq!(Mood::from_savings_ratio(15.0), Mood::Optimistic);
    }

    #[test]
    fn presets_validate() {
        validate_config(&SimConfig::rent_squeeze()).unwrap();
        validate_config(&SimConfig::festival()).unwrap();
    }

    #[test]
    fn opening_state_seeds_history_with_prices() {
        let config = SimConfig::rent_squeeze();
        let state = MarketState::new(&config).unwrap();
        assert_eq!(state.tracked.len(), 6);
        assert!(!state.prices.contains_key(&Resource::Inr));
        for res in &state.tracked {
            assert_eq!(state.history(*res), &[state.price(*res).unwrap()]);
        }
        assert_eq!(state.rent, Some(2000.0));
        assert_eq!(state.rent_history, vec![2000.0]);
        assert_eq!(state.mood, Mood::Stable);
        assert_eq!(state.season, Season::Winter);
        assert_eq!(state.weather, Weather::Sunny);
    }

    #[test]
    fn festival_state_has_no_rent() {
        let state = MarketState::new(&SimConfig::festival()).unwrap();
        assert_eq!(state.rent, None);
        assert!(state.rent_history.is_empty());
        assert!(state.tracked.contains(&Resource::Flowers));
        assert!(!state.tracked.contains(&Resource::ArtisanCoffee));
    }

    #[test]
    fn missing_price_is_a_wiring_error() {
        let state = MarketState::new(&SimConfig::festival()).unwrap();
        assert_eq!(
            state.price(Resource::ArtisanCoffee),
            Err(SimError::MissingPrice(Resource::ArtisanCoffee))
        );
    }

    #[test]
    fn set_price_clamps_to_floor() {
        let mut state = MarketState::new(&SimConfig::default()).unwrap();
        let p = state.set_price(Resource::Ragi, -3.0).unwrap();
        assert_eq!(p, PRICE_FLOOR);
        assert!(state.set_price(Resource::Inr, 10.0).is_err());
    }

    #[test]
    fn rejects_inconsistent_configs() {
        let mut c = SimConfig::rent_squeeze();
        c.market.rent = None;
        assert_eq!(validate_config(&c), Err(ValidationError::LuxuryNeedsRent));

        let mut c = SimConfig::rent_squeeze();
        c.market.initial_prices.remove(&Resource::Code);
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::MissingPrice(Resource::Code))
        );

        let mut c = SimConfig::rent_squeeze();
        c.market.initial_prices.insert(Resource::Inr, 1.0);
        assert_eq!(validate_config(&c), Err(ValidationError::PricedCurrency));

        let mut c = SimConfig::rent_squeeze();
        c.log_capacity = 0;
        assert_eq!(validate_config(&c), Err(ValidationError::ZeroLogCapacity));

        let mut c = SimConfig::festival();
        c.population.producer_groups[0].crop = Resource::Code;
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::InvalidCrop(Resource::Code))
        );
    }

    #[test]
    fn inverted_boost_range_is_reported_as_such() {
        let mut c = SimConfig::festival();
        if let LuxuryDemand::Festival {
            boost_min,
            boost_max,
            ..
        } = &mut c.market.luxury
        {
            *boost_min = 0.2;
            *boost_max = 0.1;
        }
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::InvalidBoostRange { min: 0.2, max: 0.1 })
        );
    }

    #[test]
    fn intermediary_stock_rules_must_be_finite() {
        let mut c = SimConfig::default();
        c.population.intermediary.starting_staple = f64::NAN;
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::NonFinite("intermediary.starting_staple"))
        );

        let mut c = SimConfig::default();
        c.population.intermediary.starting_input = f64::INFINITY;
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::NonFinite("intermediary.starting_input"))
        );

        let mut c = SimConfig::default();
        c.population.intermediary.staple_restock.batch = f64::INFINITY;
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::NonFinite("intermediary.staple_restock.batch"))
        );

        let mut c = SimConfig::default();
        c.population.intermediary.input_restock.below = f64::NAN;
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::NonFinite("intermediary.input_restock.below"))
        );
    }

    #[test]
    fn agent_count_does_not_overflow() {
        let mut p = SimConfig::default().population;
        assert_eq!(p.agent_count(), 16);
        for group in &mut p.producer_groups {
            group.count = u32::MAX;
        }
        p.consumer.count = u32::MAX;
        p.intermediary.count = u32::MAX;
        let expected = (u32::MAX as usize).saturating_mul(4);
        assert_eq!(p.agent_count(), expected);
    }

    #[test]
    fn config_json_roundtrip() {
        let c = SimConfig::festival();
        let s = serde_json::to_string_pretty(&c).unwrap();
        let back: SimConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back.market.luxury.good(), Resource::Flowers);
        assert_eq!(back.start_date, c.start_date);
        validate_config(&back).unwrap();
    }

    proptest! {
        #[test]
        fn every_month_maps_to_its_date_season(month in 1u32..=12, day in 1u32..=28) {
            let date = NaiveDate::from_ymd_opt(2025, month, day).unwrap();
            prop_assert_eq!(Season::for_date(date), Season::for_month(month));
        }

        #[test]
        fn non_positive_prices_rejected(p in -1000.0f64..=0.0) {
            let mut c = SimConfig::rent_squeeze();
            c.market.initial_prices.insert(Resource::Rice, p);
            prop_assert_eq!(validate_config(&c), Err(ValidationError::InvalidPrice(Resource::Rice)));
        }
    }
}
