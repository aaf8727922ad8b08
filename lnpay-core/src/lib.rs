//! lnpay core
//!
//! Payment attempt orchestration for a Lightning node: request a route, check
//! its fee against the caller's budget, send, and decide whether and when to
//! try again.

pub mod config;
pub mod error;
pub mod lightning;
pub mod rpc;

pub use config::{LnPayConfig, LoggingConfig, PayConfig};
pub use error::{ConfigError, LnPayError, LnPayResult, PayRequestError};
