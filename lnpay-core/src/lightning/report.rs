//! Terminal payment results and their JSON shapes
//!
//! Field names and error codes are what existing `pay` callers parse, so they
//! must not change.

use super::attempt::AttemptCounters;
use super::payment::PaymentPreimage;
use super::sendpay::TerminalSendFailure;
use crate::error::PayRequestError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const PAY_IN_PROGRESS: i32 = 200;
pub const PAY_RHASH_ALREADY_USED: i32 = 201;
pub const PAY_UNPARSEABLE_ONION: i32 = 202;
pub const PAY_DESTINATION_PERM_FAIL: i32 = 203;
pub const PAY_TRY_OTHER_ROUTE: i32 = 204;
pub const PAY_ROUTE_NOT_FOUND: i32 = 205;
pub const PAY_ROUTE_TOO_EXPENSIVE: i32 = 206;
pub const PAY_INVOICE_EXPIRED: i32 = 207;

/// JSON-RPC "invalid params"
pub const INVALID_PARAMS: i32 = -32602;

/// Successful payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaySuccess {
    pub payment_preimage: PaymentPreimage,
    pub getroute_tries: u32,
    pub sendpay_tries: u32,
}

impl PaySuccess {
    pub fn new(payment_preimage: PaymentPreimage, counters: AttemptCounters) -> Self {
        Self {
            payment_preimage,
            getroute_tries: counters.getroute_tries,
            sendpay_tries: counters.sendpay_tries,
        }
    }
}

/// Why a payment ended without success
#[derive(Debug, Clone, PartialEq)]
pub enum PayFailure {
    /// Rejected before an attempt was created
    InvalidRequest(PayRequestError),
    InvoiceExpired {
        now: u64,
        expiry: u64,
        counters: AttemptCounters,
    },
    RouteNotFound {
        counters: AttemptCounters,
    },
    FeeTooHigh {
        fee: u64,
        fee_percent: f64,
        amount_msat: u64,
        max_fee_percent: f64,
        counters: AttemptCounters,
    },
    /// The send path gave up; reported as the sender described it
    Send {
        failure: TerminalSendFailure,
        counters: AttemptCounters,
    },
}

impl PayFailure {
    /// JSON-RPC error code
    pub fn code(&self) -> i32 {
        match self {
            PayFailure::InvalidRequest(_) => INVALID_PARAMS,
            PayFailure::InvoiceExpired { .. } => PAY_INVOICE_EXPIRED,
            PayFailure::RouteNotFound { .. } => PAY_ROUTE_NOT_FOUND,
            PayFailure::FeeTooHigh { .. } => PAY_ROUTE_TOO_EXPENSIVE,
            PayFailure::Send { failure, .. } => match failure {
                TerminalSendFailure::InProgress { .. } => PAY_IN_PROGRESS,
                TerminalSendFailure::RhashAlreadyUsed { .. } => PAY_RHASH_ALREADY_USED,
                TerminalSendFailure::DestinationPermFail { .. } => PAY_DESTINATION_PERM_FAIL,
            },
        }
    }

    /// Human readable summary
    pub fn message(&self) -> String {
        match self {
            PayFailure::InvalidRequest(e) => e.to_string(),
            PayFailure::InvoiceExpired { .. } => "Invoice expired".to_string(),
            PayFailure::RouteNotFound { .. } => "Could not find a route".to_string(),
            PayFailure::FeeTooHigh {
                fee,
                fee_percent,
                amount_msat,
                max_fee_percent,
                ..
            } => format!(
                "Fee {} is {:.6}% of payment {}; max fee requested is {:.6}%",
                fee, fee_percent, amount_msat, max_fee_percent
            ),
            PayFailure::Send { failure, .. } => match failure {
                TerminalSendFailure::InProgress { details }
                | TerminalSendFailure::RhashAlreadyUsed { details } => details.clone(),
                TerminalSendFailure::DestinationPermFail { failure, details } => {
                    format!("failed: {} ({})", failure.failcode, details)
                }
            },
        }
    }

    /// Structured detail payload; `None` only for invalid requests
    pub fn data(&self) -> Option<Value> {
        let tries = |counters: &AttemptCounters| {
            let mut map = Map::new();
            map.insert("getroute_tries".into(), json!(counters.getroute_tries));
            map.insert("sendpay_tries".into(), json!(counters.sendpay_tries));
            map
        };

        let data = match self {
            PayFailure::InvalidRequest(_) => return None,
            PayFailure::InvoiceExpired {
                now,
                expiry,
                counters,
            } => {
                let mut map = Map::new();
                map.insert("now".into(), json!(now));
                map.insert("expiry".into(), json!(expiry));
                map.extend(tries(counters));
                map
            }
            PayFailure::RouteNotFound { counters } => tries(counters),
            PayFailure::FeeTooHigh {
                fee,
                fee_percent,
                amount_msat,
                max_fee_percent,
                counters,
            } => {
                let mut map = Map::new();
                map.insert("fee".into(), json!(fee));
                map.insert("feepercent".into(), json!(fee_percent));
                map.insert("msatoshi".into(), json!(amount_msat));
                map.insert("maxfeepercent".into(), json!(max_fee_percent));
                map.extend(tries(counters));
                map
            }
            PayFailure::Send { failure, counters } => match failure {
                TerminalSendFailure::InProgress { .. }
                | TerminalSendFailure::RhashAlreadyUsed { .. } => tries(counters),
                TerminalSendFailure::DestinationPermFail { failure, .. } => {
                    let mut map = Map::new();
                    map.insert("erring_index".into(), json!(failure.erring_index));
                    map.insert("failcode".into(), json!(failure.failcode.code()));
                    map.insert(
                        "erring_node".into(),
                        json!(hex::encode(failure.erring_node.serialize())),
                    );
                    map.insert(
                        "erring_channel".into(),
                        json!(failure.erring_channel.to_string()),
                    );
                    if let Some(update) = &failure.channel_update {
                        map.insert("channel_update".into(), json!(hex::encode(update)));
                    }
                    map
                }
            },
        };
        Some(Value::Object(data))
    }

    /// Counters at the time of failure; zero for invalid requests
    pub fn counters(&self) -> AttemptCounters {
        match self {
            PayFailure::InvalidRequest(_) => AttemptCounters::default(),
            PayFailure::InvoiceExpired { counters, .. }
            | PayFailure::RouteNotFound { counters }
            | PayFailure::FeeTooHigh { counters, .. }
            | PayFailure::Send { counters, .. } => *counters,
        }
    }
}

impl From<PayRequestError> for PayFailure {
    fn from(err: PayRequestError) -> Self {
        PayFailure::InvalidRequest(err)
    }
}

/// Terminal result of a payment
pub type PayResult = Result<PaySuccess, PayFailure>;
