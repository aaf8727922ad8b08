//! Decoded invoice fields and the decoder seam
//!
//! BOLT #11 parsing and signature checks happen in the decoder; the payment
//! code only sees the fields below.

use super::payment::PaymentHash;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default invoice expiry when the invoice does not carry one (BOLT #11)
pub const DEFAULT_INVOICE_EXPIRY_SECS: u64 = 3600;

/// Default final CLTV delta when the invoice does not carry one (BOLT #11)
pub const DEFAULT_MIN_FINAL_CLTV_EXPIRY: u32 = 9;

fn default_expiry() -> u64 {
    DEFAULT_INVOICE_EXPIRY_SECS
}

fn default_min_final_cltv_expiry() -> u32 {
    DEFAULT_MIN_FINAL_CLTV_EXPIRY
}

/// Invoice decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("{0}")]
    Malformed(String),

    #[error("description hash does not match description")]
    DescriptionMismatch,

    #[error("description required")]
    DescriptionRequired,

    #[error("unknown invoice")]
    Unknown,
}

/// The invoice fields a payment needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInvoice {
    pub payment_hash: PaymentHash,
    pub receiver_id: PublicKey,
    /// Creation time, unix seconds
    pub timestamp: u64,
    /// Seconds after `timestamp` the invoice stays payable
    #[serde(default = "default_expiry")]
    pub expiry: u64,
    #[serde(default = "default_min_final_cltv_expiry")]
    pub min_final_cltv_expiry: u32,
    /// Requested amount; absent for "any amount" invoices
    #[serde(default)]
    pub msatoshi: Option<u64>,
}

impl DecodedInvoice {
    /// Absolute expiry, unix seconds
    pub fn absolute_expiry(&self) -> u64 {
        self.timestamp.saturating_add(self.expiry)
    }
}

/// Turns an encoded invoice into its fields
pub trait InvoiceDecoder: Send + Sync {
    fn decode(&self, bolt11: &str, description: Option<&str>) -> Result<DecodedInvoice, InvoiceError>;
}
