use thiserror::Error;

/// Rejections raised by portfolio actions.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SubmitError {
    #[error("Total portfolio value exceeds threshold!")]
    ThresholdExceeded { total: f64, threshold: f64 },
}
