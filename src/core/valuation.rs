use rand::Rng;

use super::error::SubmitError;
use super::rates::revise_rate;
use super::types::{AssetClass, AssetSummary, Portfolio};

pub fn total_value(portfolio: &Portfolio) -> f64 {
    portfolio
        .holdings()
        .map(|(_, holding)| holding.current_value())
        .sum::<f64>()
        + portfolio.cash
}

pub fn value_at_previous_rates(portfolio: &Portfolio) -> f64 {
    portfolio
        .holdings()
        .map(|(_, holding)| holding.previous_value())
        .sum::<f64>()
        + portfolio.cash
}

/// Commits the allocation and advances every rate.
///
/// Each new rate is a revision of the holding's previous rate; the rate being
/// replaced becomes the new previous rate. Returns the profit/loss between the
/// new rates and the previous rates that were in place before the call. When
/// the portfolio is worth more than `threshold` nothing is touched.
pub fn submit<R: Rng>(
    portfolio: &mut Portfolio,
    threshold: f64,
    rng: &mut R,
) -> Result<f64, SubmitError> {
    let total = total_value(portfolio);
    if total > threshold {
        return Err(SubmitError::ThresholdExceeded { total, threshold });
    }

    let value_before = value_at_previous_rates(portfolio);
    for class in AssetClass::ALL {
        let holding = portfolio.holding_mut(class);
        let new_rate = revise_rate(holding.previous_rate, rng);
        holding.previous_rate = holding.rate;
        holding.set_rate(new_rate);
    }

    Ok(total_value(portfolio) - value_before)
}

pub fn update_holding(portfolio: &mut Portfolio, class: AssetClass, input: &str) {
    portfolio.holding_mut(class).set_amount(parse_number(input));
}

pub fn update_cash(portfolio: &mut Portfolio, input: &str) {
    portfolio.cash = parse_number(input).unwrap_or(0.0);
}

/// Fixed defaults, not the session's opening rates.
pub fn clear() -> Portfolio {
    Portfolio::default()
}

pub fn asset_summaries(portfolio: &Portfolio) -> Vec<AssetSummary> {
    portfolio
        .holdings()
        .map(|(class, holding)| AssetSummary {
            asset_class: class,
            label: class.label(),
            current: holding.current_value(),
            previous: holding.previous_value(),
        })
        .collect()
}

/// Reads the longest numeric prefix of `input`, ignoring leading whitespace,
/// so `"12abc"` is 12 and `"abc"` is `None`. Non-finite results are `None`.
pub fn parse_number(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
