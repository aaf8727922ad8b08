//! Payment identifiers
//!
//! The payment hash identifies a payment across the network; the preimage is
//! what the receiver releases when the payment settles.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors parsing payment identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentIdError {
    #[error("Expected 64 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

fn decode_32(hex_str: &str) -> Result<[u8; 32], PaymentIdError> {
    if hex_str.len() != 64 {
        return Err(PaymentIdError::InvalidLength(hex_str.len()));
    }

    let bytes = hex::decode(hex_str).map_err(|e| PaymentIdError::InvalidHex(e.to_string()))?;

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Payment hash - SHA256 hash of payment preimage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentHash([u8; 32]);

impl fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl PaymentHash {
    pub fn new(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, PaymentIdError> {
        decode_32(hex_str).map(Self)
    }

    /// Short prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// Payment preimage - 32 bytes released by the receiver on settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentPreimage([u8; 32]);

impl PaymentPreimage {
    pub fn new(preimage: [u8; 32]) -> Self {
        Self(preimage)
    }

    pub fn new_random() -> Self {
        let mut preimage = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut preimage);
        Self(preimage)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Generate payment hash from this preimage
    pub fn payment_hash(&self) -> PaymentHash {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        PaymentHash(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, PaymentIdError> {
        decode_32(hex_str).map(Self)
    }
}

macro_rules! hex_string_conversions {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = PaymentIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                <$ty>::from_hex(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_hex()
            }
        }
    };
}

hex_string_conversions!(PaymentHash);
hex_string_conversions!(PaymentPreimage);
