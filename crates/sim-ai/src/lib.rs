#![deny(warnings)]

//! Agent decision policies: fixed daily routines for producers,
//! intermediaries and consumers.
//!
//! Every policy reads the shared [`MarketState`] (already repriced for the
//! day), mutates only its own inventory and cash, and returns one log line.
//! Agents never observe each other.

use serde::Serialize;
use sim_core::{
    ConsumerConfig, IntermediaryConfig, MarketState, PopulationConfig, ProducerConfig, Recipe,
    Region, Resource, Restock, SimError, YieldTable,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Resource → quantity held.
pub type Inventory = BTreeMap<Resource, f64>;

fn slot<'a>(
    inventory: &'a mut Inventory,
    agent: &str,
    res: Resource,
) -> Result<&'a mut f64, SimError> {
    inventory.get_mut(&res).ok_or_else(|| SimError::MissingInventory {
        agent: agent.to_string(),
        resource: res,
    })
}

/// Farmer or planter: harvests a crop, eats ragi, sells the surplus.
#[derive(Clone, Debug, Serialize)]
pub struct Producer {
    pub name: String,
    pub region: Region,
    pub crop: Resource,
    pub inventory: Inventory,
    pub cash: f64,
    keep_buffer: f64,
    yields: YieldTable,
}

impl Producer {
    /// The staple every producer eats.
    pub const STAPLE: Resource = Resource::Ragi;

    pub fn new(name: String, region: Region, crop: Resource, cfg: &ProducerConfig) -> Self {
        let mut inventory = Inventory::new();
        inventory.insert(crop, 0.0);
        // A ragi farmer's crop and food share one slot.
        inventory.insert(Self::STAPLE, cfg.starting_staple);
        Self {
            name,
            region,
            crop,
            inventory,
            cash: cfg.starting_cash,
            keep_buffer: cfg.keep_buffer,
            yields: cfg.yields.clone(),
        }
    }

    pub fn act(&mut self, state: &MarketState) -> Result<String, SimError> {
        let harvest = self.yields.for_weather(state.weather);
        *slot(&mut self.inventory, &self.name, self.crop)? += harvest;

        let staple = slot(&mut self.inventory, &self.name, Self::STAPLE)?;
        if *staple > 0.0 {
            *staple -= 1.0;
        } else {
            let cost = state.price(Self::STAPLE)?;
            if self.cash >= cost {
                self.cash -= cost;
                *staple += 1.0;
            }
        }

        let held = slot(&mut self.inventory, &self.name, self.crop)?;
        let to_sell = (*held - self.keep_buffer).max(0.0);
        if to_sell > 0.0 {
            let revenue = to_sell * state.price(self.crop)?;
            *held -= to_sell;
            self.cash += revenue;
            return Ok(format!(
                "{} harvested {} {} and sold {} for ₹{:.2}.",
                self.name, harvest, self.crop, to_sell, revenue
            ));
        }
        Ok(format!("{} harvested {} {}.", self.name, harvest, self.crop))
    }
}

/// Darshini owner: restocks rice and beans, cooks idli sets.
#[derive(Clone, Debug, Serialize)]
pub struct Intermediary {
    pub name: String,
    pub region: Region,
    pub inventory: Inventory,
    pub cash: f64,
    staple_restock: Restock,
    input_restock: Restock,
    recipe: Recipe,
}

impl Intermediary {
    pub const STAPLE: Resource = Resource::Rice;
    pub const INPUT: Resource = Resource::CoffeeBeans;
    pub const OUTPUT: Resource = Resource::IdliSet;

    pub fn new(name: String, cfg: &IntermediaryConfig) -> Self {
        let inventory = Inventory::from([
            (Self::OUTPUT, 0.0),
            (Self::STAPLE, cfg.starting_staple),
            (Self::INPUT, cfg.starting_input),
        ]);
        Self {
            name,
            region: cfg.region,
            inventory,
            cash: cfg.starting_cash,
            staple_restock: cfg.staple_restock.clone(),
            input_restock: cfg.input_restock.clone(),
            recipe: cfg.recipe.clone(),
        }
    }

    fn restock(&mut self, res: Resource, rule: &Restock, price: f64) -> Result<(), SimError> {
        let held = slot(&mut self.inventory, &self.name, res)?;
        if *held >= rule.below {
            return Ok(());
        }
        let cost = price * rule.batch;
        if self.cash >= cost {
            self.cash -= cost;
            *held += rule.batch;
        } else {
            debug!(agent = %self.name, resource = %res, cost, cash = self.cash, "restock unaffordable");
        }
        Ok(())
    }

    pub fn act(&mut self, state: &MarketState) -> Result<String, SimError> {
        let staple_rule = self.staple_restock.clone();
        let input_rule = self.input_restock.clone();
        self.restock(Self::STAPLE, &staple_rule, state.price(Self::STAPLE)?)?;
        self.restock(Self::INPUT, &input_rule, state.price(Self::INPUT)?)?;

        let staple = *slot(&mut self.inventory, &self.name, Self::STAPLE)?;
        let input = *slot(&mut self.inventory, &self.name, Self::INPUT)?;
        let mut produced = 0.0;
        if staple >= self.recipe.staple && input >= self.recipe.input {
            *slot(&mut self.inventory, &self.name, Self::STAPLE)? -= self.recipe.staple;
            *slot(&mut self.inventory, &self.name, Self::INPUT)? -= self.recipe.input;
            produced = self.recipe.output;
            *slot(&mut self.inventory, &self.name, Self::OUTPUT)? += produced;
        }
        Ok(format!("{} cooked {} Idli Sets.", self.name, produced))
    }
}

/// Salaried worker: earns a wage, pays rent, eats, maybe splurges.
#[derive(Clone, Debug, Serialize)]
pub struct Consumer {
    pub name: String,
    pub region: Region,
    pub inventory: Inventory,
    pub cash: f64,
    pub luxury: Resource,
    wage: f64,
    luxury_threshold: f64,
    skip_luxury_note: String,
}

impl Consumer {
    pub const FOOD: Resource = Resource::IdliSet;

    pub fn new(name: String, luxury: Resource, cfg: &ConsumerConfig) -> Self {
        let inventory = Inventory::from([
            (Resource::Code, 0.0),
            (Self::FOOD, 0.0),
            (luxury, 0.0),
        ]);
        Self {
            name,
            region: cfg.region,
            inventory,
            cash: cfg.starting_cash,
            luxury,
            wage: cfg.wage,
            luxury_threshold: cfg.luxury_threshold,
            skip_luxury_note: cfg.skip_luxury_note.clone(),
        }
    }

    /// Rent, when tracked, is paid before anything else and may leave cash
    /// negative. There is no eviction or default.
    pub fn act(&mut self, state: &MarketState) -> Result<String, SimError> {
        self.cash += self.wage;

        let mut parts = vec![format!("{}:", self.name)];
        if let Some(rent) = state.rent {
            self.cash -= rent;
            parts.push(format!("Paid rent ₹{:.0}.", rent));
            if self.cash < 0.0 {
                warn!(agent = %self.name, cash = self.cash, rent, "cash negative after rent");
            }
        }

        let food_price = state.price(Self::FOOD)?;
        let bought_food = self.cash >= food_price;
        if bought_food {
            self.cash -= food_price;
            *slot(&mut self.inventory, &self.name, Self::FOOD)? += 1.0;
            parts.push(format!("Ate Idli (₹{:.0}).", food_price));
        } else {
            parts.push("Skipped Idli.".to_string());
        }

        let luxury_price = state.price(self.luxury)?;
        if bought_food && self.cash > self.luxury_threshold && self.cash >= luxury_price {
            self.cash -= luxury_price;
            *slot(&mut self.inventory, &self.name, self.luxury)? += 1.0;
            parts.push(format!("Bought {} (₹{:.0}).", self.luxury, luxury_price));
        } else {
            parts.push(self.skip_luxury_note.replace("{good}", self.luxury.label()));
        }
        Ok(parts.join(" "))
    }
}

/// Any participant in the market.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Agent {
    Producer(Producer),
    Intermediary(Intermediary),
    Consumer(Consumer),
}

impl Agent {
    /// Run the agent's daily routine and return its log line.
    pub fn act(&mut self, state: &MarketState) -> Result<String, SimError> {
        match self {
            Agent::Producer(a) => a.act(state),
            Agent::Intermediary(a) => a.act(state),
            Agent::Consumer(a) => a.act(state),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Agent::Producer(a) => &a.name,
            Agent::Intermediary(a) => &a.name,
            Agent::Consumer(a) => &a.name,
        }
    }

    pub fn region(&self) -> Region {
        match self {
            Agent::Producer(a) => a.region,
            Agent::Intermediary(a) => a.region,
            Agent::Consumer(a) => a.region,
        }
    }

    pub fn cash(&self) -> f64 {
        match self {
            Agent::Producer(a) => a.cash,
            Agent::Intermediary(a) => a.cash,
            Agent::Consumer(a) => a.cash,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        match self {
            Agent::Producer(a) => &a.inventory,
            Agent::Intermediary(a) => &a.inventory,
            Agent::Consumer(a) => &a.inventory,
        }
    }

    /// Quantity held, zero for goods the agent never deals in.
    pub fn holding(&self, res: Resource) -> f64 {
        self.inventory().get(&res).copied().unwrap_or(0.0)
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self, Agent::Consumer(_))
    }
}

/// Create every agent in tick order: producer groups, then consumers, then
/// intermediaries.
pub fn build_population(population: &PopulationConfig, luxury: Resource) -> Vec<Agent> {
    let mut agents = Vec::with_capacity(population.agent_count());
    for group in &population.producer_groups {
        for i in 0..group.count {
            agents.push(Agent::Producer(Producer::new(
                format!("{}-{}", group.name_prefix, i),
                group.region,
                group.crop,
                &population.producer,
            )));
        }
    }
    let consumer = &population.consumer;
    for i in 0..consumer.count {
        agents.push(Agent::Consumer(Consumer::new(
            format!("{}-{}", consumer.name_prefix, i),
            luxury,
            consumer,
        )));
    }
    let intermediary = &population.intermediary;
    for i in 0..intermediary.count {
        agents.push(Agent::Intermediary(Intermediary::new(
            format!("{}-{}", intermediary.name_prefix, i),
            intermediary,
        )));
    }
    agents
}
