use chrono::NaiveDate;
use rand::Rng;

use super::types::{AssetClass, InitialValues, MarketSimulation, PricePath};

pub const HORIZON_DAYS: usize = 50;
pub const PATH_FLOOR: f64 = 50.0;

/// Multiplicative random walk floored at `PATH_FLOOR`.
///
/// The first value is `initial` lifted to the floor; each following value
/// moves the previous one by `(u - 0.5) * volatility` with `u` uniform in
/// `[0, 1)`.
pub fn generate_path<R: Rng>(
    initial: f64,
    days: usize,
    volatility: f64,
    rng: &mut R,
) -> Vec<f64> {
    let mut values = Vec::with_capacity(days);
    if days == 0 {
        return values;
    }

    let mut current = initial.max(PATH_FLOOR);
    values.push(current);
    for _ in 1..days {
        let u: f64 = rng.gen_range(0.0..1.0);
        current = (current * (1.0 + (u - 0.5) * volatility)).max(PATH_FLOOR);
        values.push(current);
    }
    values
}

pub fn generate_date_labels(start: NaiveDate, days: usize) -> Vec<String> {
    start
        .iter_days()
        .take(days)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .collect()
}

pub fn simulate_market<R: Rng>(
    initial: &InitialValues,
    days: usize,
    start: NaiveDate,
    rng: &mut R,
) -> MarketSimulation {
    let paths = AssetClass::ALL
        .into_iter()
        .map(|class| PricePath {
            asset_class: class,
            values: generate_path(initial.get(class), days, class.path_volatility(), rng),
        })
        .collect();

    MarketSimulation {
        labels: generate_date_labels(start, days),
        paths,
    }
}
