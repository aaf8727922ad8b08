// lnpay Lightning - route types and the route source seam
//
// Routes are computed elsewhere (the gossip/routing daemon). This module only
// describes what we ask for and what comes back.

use async_trait::async_trait;
use rand::RngCore;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing a short channel id
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShortChannelIdError {
    #[error("Malformed short channel id: {0}")]
    Malformed(String),

    #[error("Short channel id component out of range: {0}")]
    OutOfRange(String),
}

/// Channel identifier derived from the funding output location:
/// block height (24 bits), transaction index (24 bits), output index (16 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortChannelId(u64);

impl ShortChannelId {
    pub fn new(block_height: u32, tx_index: u32, output_index: u16) -> Result<Self, ShortChannelIdError> {
        if block_height > 0xFF_FFFF || tx_index > 0xFF_FFFF {
            return Err(ShortChannelIdError::OutOfRange(format!(
                "{}x{}x{}",
                block_height, tx_index, output_index
            )));
        }
        Ok(Self(
            (u64::from(block_height) << 40) | (u64::from(tx_index) << 16) | u64::from(output_index),
        ))
    }

    pub fn block_height(&self) -> u32 {
        (self.0 >> 40) as u32
    }

    pub fn tx_index(&self) -> u32 {
        ((self.0 >> 16) & 0xFF_FFFF) as u32
    }

    pub fn output_index(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for ShortChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block_height(),
            self.tx_index(),
            self.output_index()
        )
    }
}

impl FromStr for ShortChannelId {
    type Err = ShortChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 3 {
            return Err(ShortChannelIdError::Malformed(s.to_string()));
        }
        let malformed = |_| ShortChannelIdError::Malformed(s.to_string());
        let block_height = parts[0].parse::<u32>().map_err(malformed)?;
        let tx_index = parts[1].parse::<u32>().map_err(malformed)?;
        let output_index = parts[2].parse::<u16>().map_err(malformed)?;
        Self::new(block_height, tx_index, output_index)
    }
}

impl TryFrom<String> for ShortChannelId {
    type Error = ShortChannelIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShortChannelId> for String {
    fn from(scid: ShortChannelId) -> Self {
        scid.to_string()
    }
}

/// A hop in a payment route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    /// Channel used to reach `node_id`
    pub channel_id: ShortChannelId,

    /// Node at the far end of the channel
    pub node_id: PublicKey,

    /// Amount to forward over this channel, fees for later hops included
    pub amount_msat: u64,

    /// Cumulative CLTV delay at this hop
    pub delay: u32,
}

/// An ordered route from us to the receiver. Empty means no path was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    pub hops: Vec<RouteHop>,
}

impl Route {
    pub fn new(hops: Vec<RouteHop>) -> Self {
        Self { hops }
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Amount we hand to the first hop, or `None` for an empty route
    pub fn amount_sent(&self) -> Option<u64> {
        self.hops.first().map(|hop| hop.amount_msat)
    }

    /// Human readable route, e.g. `us -> 1x2x0 (1010msat, 20blk) -> 02ab..`
    pub fn describe(&self) -> String {
        let mut out = String::from("us");
        for hop in &self.hops {
            out.push_str(&format!(
                " -> {} ({}msat, {}blk) -> {}",
                hop.channel_id, hop.amount_msat, hop.delay, hop.node_id
            ));
        }
        out
    }
}

/// Seed for tie-breaking among equally fuzzed routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSeed(pub [u8; 16]);

impl RouteSeed {
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; 16];
        rng.fill_bytes(&mut seed);
        Self(seed)
    }
}

/// Parameters of a single route query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub source: PublicKey,
    pub destination: PublicKey,
    pub amount_msat: u64,
    pub riskfactor: f64,
    pub final_cltv: u32,
    pub fuzz: f64,
    pub seed: RouteSeed,
}

/// Anything that can answer route queries, normally the routing daemon
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Ask for a route. An empty route means no path exists.
    async fn get_route(&self, request: RouteRequest) -> Route;
}
