use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use super::chart::{ChartData, portfolio_chart};
use super::error::SubmitError;
use super::rates::{DEFAULT_THRESHOLD, random_threshold, randomize_rates};
use super::types::{AssetClass, AssetSummary, Portfolio};
use super::valuation;

/// State of one game: the allocation being edited, its threshold and the
/// outcome of the last submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub name: String,
    pub portfolio: Portfolio,
    pub threshold: f64,
    pub submitted: bool,
    pub profit_loss: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub name: String,
    pub portfolio: Portfolio,
    pub threshold: f64,
    pub total_value: f64,
    pub exceeds_threshold: bool,
    pub submitted: bool,
    pub profit_loss: f64,
    pub error: Option<String>,
    pub assets: Vec<AssetSummary>,
    pub chart: ChartData,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            portfolio: Portfolio::default(),
            threshold: DEFAULT_THRESHOLD,
            submitted: false,
            profit_loss: 0.0,
            error: None,
        }
    }

    /// Draws opening rates and the threshold. Runs once per session.
    pub fn start<R: Rng>(&mut self, rng: &mut R) {
        randomize_rates(&mut self.portfolio, rng);
        self.threshold = random_threshold(rng);
        debug!(threshold = self.threshold, "session started");
    }

    pub fn total_value(&self) -> f64 {
        valuation::total_value(&self.portfolio)
    }

    pub fn exceeds_threshold(&self) -> bool {
        self.total_value() > self.threshold
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn update_holding(&mut self, class: AssetClass, input: &str) {
        valuation::update_holding(&mut self.portfolio, class, input);
        debug!(?class, input, amount = ?self.portfolio.holding(class).amount, "holding updated");
    }

    pub fn update_cash(&mut self, input: &str) {
        valuation::update_cash(&mut self.portfolio, input);
        debug!(input, cash = self.portfolio.cash, "cash updated");
    }

    pub fn submit<R: Rng>(&mut self, rng: &mut R) -> Result<f64, SubmitError> {
        match valuation::submit(&mut self.portfolio, self.threshold, rng) {
            Ok(profit_loss) => {
                self.profit_loss = profit_loss;
                self.submitted = true;
                self.error = None;
                debug!(profit_loss, "portfolio submitted");
                Ok(profit_loss)
            }
            Err(err) => {
                let SubmitError::ThresholdExceeded { total, threshold } = err;
                warn!(total, threshold, "submission rejected");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Back to the fixed default portfolio. The threshold is kept.
    pub fn clear(&mut self) {
        self.name.clear();
        self.portfolio = valuation::clear();
        self.submitted = false;
        self.profit_loss = 0.0;
        self.error = None;
        debug!("session cleared");
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            name: self.name.clone(),
            portfolio: self.portfolio.clone(),
            threshold: self.threshold,
            total_value: self.total_value(),
            exceeds_threshold: self.exceeds_threshold(),
            submitted: self.submitted,
            profit_loss: self.profit_loss,
            error: self.error.clone(),
            assets: valuation::asset_summaries(&self.portfolio),
            chart: portfolio_chart(&self.portfolio),
        }
    }
}
