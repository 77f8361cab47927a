use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetClass {
    Stocks,
    Bonds,
    RealEstate,
    Commodities,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Stocks,
        AssetClass::Bonds,
        AssetClass::RealEstate,
        AssetClass::Commodities,
    ];

    /// Rate a fresh (or cleared) portfolio starts with.
    pub fn default_rate(self) -> f64 {
        match self {
            AssetClass::Stocks => 150.0,
            AssetClass::Bonds => 1_000.0,
            AssetClass::RealEstate => 50_000.0,
            AssetClass::Commodities => 50.0,
        }
    }

    /// Whole-number range the session's opening rate is drawn from.
    pub fn initial_rate_range(self) -> RangeInclusive<u32> {
        match self {
            AssetClass::Stocks => 100..=299,
            AssetClass::Bonds => 800..=1_199,
            AssetClass::RealEstate => 40_000..=49_999,
            AssetClass::Commodities => 40..=59,
        }
    }

    /// Daily volatility used by the market path simulator.
    pub fn path_volatility(self) -> f64 {
        match self {
            AssetClass::Stocks => 0.5,
            AssetClass::Bonds => 0.02,
            AssetClass::RealEstate => 0.03,
            AssetClass::Commodities => 0.1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetClass::Stocks => "Stocks",
            AssetClass::Bonds => "Bonds",
            AssetClass::RealEstate => "Real Estate",
            AssetClass::Commodities => "Commodities",
        }
    }
}

/// Units held in one asset class at a unit rate.
///
/// `amount` is `None` when the last edit could not be read as a number; such a
/// holding is worth nothing until it is edited again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHolding {
    pub rate: f64,
    pub amount: Option<f64>,
    pub total_cost: f64,
    pub previous_rate: f64,
}

impl AssetHolding {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            amount: Some(0.0),
            total_cost: 0.0,
            previous_rate: rate,
        }
    }

    pub fn units(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    pub fn current_value(&self) -> f64 {
        self.units() * self.rate
    }

    pub fn previous_value(&self) -> f64 {
        self.units() * self.previous_rate
    }

    pub(crate) fn set_amount(&mut self, amount: Option<f64>) {
        self.amount = amount;
        self.recompute_total_cost();
    }

    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        self.recompute_total_cost();
    }

    fn recompute_total_cost(&mut self) {
        let cost = self.units() * self.rate;
        self.total_cost = if cost.is_finite() { cost } else { 0.0 };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub stocks: AssetHolding,
    pub bonds: AssetHolding,
    pub real_estate: AssetHolding,
    pub commodities: AssetHolding,
    pub cash: f64,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            stocks: AssetHolding::new(AssetClass::Stocks.default_rate()),
            bonds: AssetHolding::new(AssetClass::Bonds.default_rate()),
            real_estate: AssetHolding::new(AssetClass::RealEstate.default_rate()),
            commodities: AssetHolding::new(AssetClass::Commodities.default_rate()),
            cash: 0.0,
        }
    }
}

impl Portfolio {
    pub fn holding(&self, class: AssetClass) -> &AssetHolding {
        match class {
            AssetClass::Stocks => &self.stocks,
            AssetClass::Bonds => &self.bonds,
            AssetClass::RealEstate => &self.real_estate,
            AssetClass::Commodities => &self.commodities,
        }
    }

    pub fn holding_mut(&mut self, class: AssetClass) -> &mut AssetHolding {
        match class {
            AssetClass::Stocks => &mut self.stocks,
            AssetClass::Bonds => &mut self.bonds,
            AssetClass::RealEstate => &mut self.real_estate,
            AssetClass::Commodities => &mut self.commodities,
        }
    }

    pub fn holdings(&self) -> impl Iterator<Item = (AssetClass, &AssetHolding)> {
        AssetClass::ALL
            .into_iter()
            .map(move |class| (class, self.holding(class)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub asset_class: AssetClass,
    pub label: &'static str,
    pub current: f64,
    pub previous: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePath {
    pub asset_class: AssetClass,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSimulation {
    pub labels: Vec<String>,
    pub paths: Vec<PricePath>,
}

/// Starting value per asset class for a market simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InitialValues {
    pub stocks: f64,
    pub bonds: f64,
    pub real_estate: f64,
    pub commodities: f64,
}

impl InitialValues {
    pub fn get(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Stocks => self.stocks,
            AssetClass::Bonds => self.bonds,
            AssetClass::RealEstate => self.real_estate,
            AssetClass::Commodities => self.commodities,
        }
    }
}
