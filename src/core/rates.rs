use rand::Rng;

use super::types::{AssetClass, Portfolio};

pub const REVISION_BAND: f64 = 0.1;
pub const DEFAULT_THRESHOLD: f64 = 10_000.0;
const THRESHOLD_SPAN: u32 = 1_000;

/// Opening rate per asset class, in `AssetClass::ALL` order.
pub fn initial_rates<R: Rng>(rng: &mut R) -> [(AssetClass, f64); 4] {
    AssetClass::ALL.map(|class| {
        let rate: u32 = rng.gen_range(class.initial_rate_range());
        (class, rate as f64)
    })
}

/// Replaces the current rate of every holding with a freshly drawn opening
/// rate. Previous rates are left alone.
pub fn randomize_rates<R: Rng>(portfolio: &mut Portfolio, rng: &mut R) {
    for (class, rate) in initial_rates(rng) {
        portfolio.holding_mut(class).set_rate(rate);
    }
}

/// Moves `previous_rate` by a uniform factor in `[1 - band, 1 + band)`.
pub fn revise_rate<R: Rng>(previous_rate: f64, rng: &mut R) -> f64 {
    let variation = previous_rate * REVISION_BAND;
    let u: f64 = rng.gen_range(0.0..1.0);
    previous_rate + (u * (variation * 2.0) - variation)
}

pub fn random_threshold<R: Rng>(rng: &mut R) -> f64 {
    let offset: u32 = rng.gen_range(0..THRESHOLD_SPAN);
    DEFAULT_THRESHOLD + offset as f64
}
