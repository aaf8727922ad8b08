//! Send outcomes and the payment dispatch seam

use super::onion::FailCode;
use super::payment::{PaymentHash, PaymentPreimage};
use super::router::{Route, ShortChannelId};
use async_trait::async_trait;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

/// Where and why a payment failed inside the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingFailure {
    /// Index of the failing hop; 0 is ourselves
    pub erring_index: u32,
    pub failcode: FailCode,
    pub erring_node: PublicKey,
    pub erring_channel: ShortChannelId,
    /// Raw channel_update the erring node attached, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_update: Option<Vec<u8>>,
}

/// Why a dispatched payment did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum SendFailure {
    /// A payment for this hash is already in flight
    InProgress { details: String },
    /// This payment hash was already paid
    RhashAlreadyUsed { details: String },
    /// The returned onion error could not be decoded
    UnparseableOnion { details: String },
    /// The receiver (or a hop) rejected the payment permanently
    DestinationPermFail {
        failure: RoutingFailure,
        details: String,
    },
    /// A hop failed; another route may work
    TryOtherRoute {
        failure: RoutingFailure,
        details: String,
    },
}

impl SendFailure {
    pub fn details(&self) -> &str {
        match self {
            SendFailure::InProgress { details }
            | SendFailure::RhashAlreadyUsed { details }
            | SendFailure::UnparseableOnion { details }
            | SendFailure::DestinationPermFail { details, .. }
            | SendFailure::TryOtherRoute { details, .. } => details,
        }
    }

    pub fn routing_failure(&self) -> Option<&RoutingFailure> {
        match self {
            SendFailure::DestinationPermFail { failure, .. }
            | SendFailure::TryOtherRoute { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Result of one payment dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    Success { preimage: PaymentPreimage },
    Failure(SendFailure),
}

/// Send failures that end the payment. Retryable failures have no variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalSendFailure {
    InProgress { details: String },
    RhashAlreadyUsed { details: String },
    DestinationPermFail {
        failure: RoutingFailure,
        details: String,
    },
}

/// Dispatches a payment over a chosen route and reports how it went
#[async_trait]
pub trait PaymentSender: Send + Sync {
    async fn send_payment(&self, payment_hash: PaymentHash, route: Route) -> SendOutcome;
}
