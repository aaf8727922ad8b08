//! Error types for lnpay
//!
//! Terminal payment outcomes are not errors in this sense: they are reported
//! to the caller as `PayFailure` values, with bad `pay` input carried as a
//! `PayRequestError` inside them. `LnPayError` covers broken setup and lost
//! payment tasks.

use crate::lightning::invoice::InvoiceError;
use thiserror::Error;

/// Main error type for lnpay
#[derive(Debug, Error)]
pub enum LnPayError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The payment task went away without reporting
    #[error("Payment task aborted: {0}")]
    TaskAborted(String),
}

/// Result type alias for lnpay operations
pub type LnPayResult<T> = Result<T, LnPayError>;

/// Rejections raised before any attempt state exists
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PayRequestError {
    #[error("Invalid bolt11: {0}")]
    InvalidInvoice(#[from] InvoiceError),

    #[error("msatoshi parameter unnecessary")]
    AmountUnnecessary,

    #[error("msatoshi parameter required")]
    AmountRequired,

    #[error("msatoshi must be greater than zero")]
    ZeroAmount,

    #[error("msatoshi '{0}' is not a valid number")]
    InvalidAmount(String),

    #[error("'{0}' is not a valid double")]
    InvalidDouble(String),

    #[error("{0:.6} maxfeepercent must be non-negative")]
    MaxFeeNegative(f64),

    #[error("{0:.6} maxfeepercent must be <= 100.0")]
    MaxFeeTooLarge(f64),

    #[error("'{0}' is not a valid riskfactor")]
    InvalidRiskFactor(f64),

    #[error("{0}")]
    InvalidParams(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
