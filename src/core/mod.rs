mod chart;
mod error;
mod market;
mod rates;
mod session;
mod types;
mod valuation;

pub use chart::{ChartData, Dataset, market_datasets, portfolio_chart};
pub use error::SubmitError;
pub use market::{HORIZON_DAYS, PATH_FLOOR, generate_date_labels, generate_path, simulate_market};
pub use rates::{
    DEFAULT_THRESHOLD, REVISION_BAND, initial_rates, random_threshold, randomize_rates,
    revise_rate,
};
pub use session::{Session, SessionView};
pub use types::{
    AssetClass, AssetHolding, AssetSummary, InitialValues, MarketSimulation, Portfolio, PricePath,
};
pub use valuation::{
    asset_summaries, clear, parse_number, submit, total_value, update_cash, update_holding,
    value_at_previous_rates,
};
