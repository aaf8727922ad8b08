//! Onion failure codes (BOLT #4)
//!
//! A failing hop reports one of these inside the returned onion error. Only
//! the code and its name matter here; onion construction lives elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const BADONION: u16 = 0x8000;
pub const PERM: u16 = 0x4000;
pub const NODE: u16 = 0x2000;
pub const UPDATE: u16 = 0x1000;

/// Routing failure code reported by an erring hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum FailCode {
    InvalidRealm,
    TemporaryNodeFailure,
    PermanentNodeFailure,
    RequiredNodeFeatureMissing,
    InvalidOnionVersion,
    InvalidOnionHmac,
    InvalidOnionKey,
    TemporaryChannelFailure,
    PermanentChannelFailure,
    RequiredChannelFeatureMissing,
    UnknownNextPeer,
    AmountBelowMinimum,
    FeeInsufficient,
    IncorrectCltvExpiry,
    ExpiryTooSoon,
    UnknownPaymentHash,
    IncorrectPaymentAmount,
    FinalExpiryTooSoon,
    FinalIncorrectCltvExpiry,
    FinalIncorrectHtlcAmount,
    ChannelDisabled,
    ExpiryTooFar,
    /// A code this node does not recognise
    Unknown(u16),
}

impl FailCode {
    pub fn code(self) -> u16 {
        match self {
            FailCode::InvalidRealm => PERM | 1,
            FailCode::TemporaryNodeFailure => NODE | 2,
            FailCode::PermanentNodeFailure => PERM | NODE | 2,
            FailCode::RequiredNodeFeatureMissing => PERM | NODE | 3,
            FailCode::InvalidOnionVersion => BADONION | PERM | 4,
            FailCode::InvalidOnionHmac => BADONION | PERM | 5,
            FailCode::InvalidOnionKey => BADONION | PERM | 6,
            FailCode::TemporaryChannelFailure => UPDATE | 7,
            FailCode::PermanentChannelFailure => PERM | 8,
            FailCode::RequiredChannelFeatureMissing => PERM | 9,
            FailCode::UnknownNextPeer => PERM | 10,
            FailCode::AmountBelowMinimum => UPDATE | 11,
            FailCode::FeeInsufficient => UPDATE | 12,
            FailCode::IncorrectCltvExpiry => UPDATE | 13,
            FailCode::ExpiryTooSoon => UPDATE | 14,
            FailCode::UnknownPaymentHash => PERM | 15,
            FailCode::IncorrectPaymentAmount => PERM | 16,
            FailCode::FinalExpiryTooSoon => 17,
            FailCode::FinalIncorrectCltvExpiry => 18,
            FailCode::FinalIncorrectHtlcAmount => 19,
            FailCode::ChannelDisabled => UPDATE | 20,
            FailCode::ExpiryTooFar => 21,
            FailCode::Unknown(code) => code,
        }
    }

    pub fn name(self) -> String {
        let name = match self {
            FailCode::InvalidRealm => "WIRE_INVALID_REALM",
            FailCode::TemporaryNodeFailure => "WIRE_TEMPORARY_NODE_FAILURE",
            FailCode::PermanentNodeFailure => "WIRE_PERMANENT_NODE_FAILURE",
            FailCode::RequiredNodeFeatureMissing => "WIRE_REQUIRED_NODE_FEATURE_MISSING",
            FailCode::InvalidOnionVersion => "WIRE_INVALID_ONION_VERSION",
            FailCode::InvalidOnionHmac => "WIRE_INVALID_ONION_HMAC",
            FailCode::InvalidOnionKey => "WIRE_INVALID_ONION_KEY",
            FailCode::TemporaryChannelFailure => "WIRE_TEMPORARY_CHANNEL_FAILURE",
            FailCode::PermanentChannelFailure => "WIRE_PERMANENT_CHANNEL_FAILURE",
            FailCode::RequiredChannelFeatureMissing => "WIRE_REQUIRED_CHANNEL_FEATURE_MISSING",
            FailCode::UnknownNextPeer => "WIRE_UNKNOWN_NEXT_PEER",
            FailCode::AmountBelowMinimum => "WIRE_AMOUNT_BELOW_MINIMUM",
            FailCode::FeeInsufficient => "WIRE_FEE_INSUFFICIENT",
            FailCode::IncorrectCltvExpiry => "WIRE_INCORRECT_CLTV_EXPIRY",
            FailCode::ExpiryTooSoon => "WIRE_EXPIRY_TOO_SOON",
            FailCode::UnknownPaymentHash => "WIRE_UNKNOWN_PAYMENT_HASH",
            FailCode::IncorrectPaymentAmount => "WIRE_INCORRECT_PAYMENT_AMOUNT",
            FailCode::FinalExpiryTooSoon => "WIRE_FINAL_EXPIRY_TOO_SOON",
            FailCode::FinalIncorrectCltvExpiry => "WIRE_FINAL_INCORRECT_CLTV_EXPIRY",
            FailCode::FinalIncorrectHtlcAmount => "WIRE_FINAL_INCORRECT_HTLC_AMOUNT",
            FailCode::ChannelDisabled => "WIRE_CHANNEL_DISABLED",
            FailCode::ExpiryTooFar => "WIRE_EXPIRY_TOO_FAR",
            FailCode::Unknown(code) => return format!("INVALID {}", code),
        };
        name.to_string()
    }

    /// Failures that mean the sender and a hop disagree about block height
    pub fn is_blockheight_related(self) -> bool {
        matches!(
            self,
            FailCode::ExpiryTooFar | FailCode::ExpiryTooSoon | FailCode::FinalExpiryTooSoon
        )
    }
}

impl From<u16> for FailCode {
    fn from(code: u16) -> Self {
        const KNOWN: [FailCode; 22] = [
            FailCode::InvalidRealm,
            FailCode::TemporaryNodeFailure,
            FailCode::PermanentNodeFailure,
            FailCode::RequiredNodeFeatureMissing,
            FailCode::InvalidOnionVersion,
            FailCode::InvalidOnionHmac,
            FailCode::InvalidOnionKey,
            FailCode::TemporaryChannelFailure,
            FailCode::PermanentChannelFailure,
            FailCode::RequiredChannelFeatureMissing,
            FailCode::UnknownNextPeer,
            FailCode::AmountBelowMinimum,
            FailCode::FeeInsufficient,
            FailCode::IncorrectCltvExpiry,
            FailCode::ExpiryTooSoon,
            FailCode::UnknownPaymentHash,
            FailCode::IncorrectPaymentAmount,
            FailCode::FinalExpiryTooSoon,
            FailCode::FinalIncorrectCltvExpiry,
            FailCode::FinalIncorrectHtlcAmount,
            FailCode::ChannelDisabled,
            FailCode::ExpiryTooFar,
        ];
        KNOWN
            .into_iter()
            .find(|known| known.code() == code)
            .unwrap_or(FailCode::Unknown(code))
    }
}

impl From<FailCode> for u16 {
    fn from(code: FailCode) -> Self {
        code.code()
    }
}

impl fmt::Display for FailCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(FailCode::ExpiryTooSoon.code(), 0x100e);
        assert_eq!(FailCode::TemporaryChannelFailure.code(), 0x1007);
        assert_eq!(FailCode::InvalidOnionHmac.code(), 0xc005);
        assert_eq!(FailCode::FinalExpiryTooSoon.code(), 17);
        assert_eq!(FailCode::ExpiryTooFar.code(), 21);
    }

    #[test]
    fn test_from_u16_roundtrips_known_codes() {
        assert_eq!(FailCode::from(0x100e), FailCode::ExpiryTooSoon);
        assert_eq!(FailCode::from(0x4008), FailCode::PermanentChannelFailure);
        assert_eq!(FailCode::from(0x1234), FailCode::Unknown(0x1234));
        assert_eq!(FailCode::Unknown(0x1234).name(), "INVALID 4660");
    }

    #[test]
    fn test_blockheight_related() {
        assert!(FailCode::ExpiryTooFar.is_blockheight_related());
        assert!(FailCode::ExpiryTooSoon.is_blockheight_related());
        assert!(FailCode::FinalExpiryTooSoon.is_blockheight_related());
        assert!(!FailCode::IncorrectCltvExpiry.is_blockheight_related());
        assert!(!FailCode::TemporaryChannelFailure.is_blockheight_related());
    }
}
