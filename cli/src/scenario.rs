//! Scripted payment scenarios
//!
//! A scenario file describes one invoice and what the network will say when
//! asked for routes and sends, in order. It lets the `pay` command run
//! against the real orchestrator without a node behind it.
//!
//! ```toml
//! node_id = "02..."
//! now = 1700000000
//!
//! [invoice]
//! bolt11 = "lnbc1..."
//! payment_hash = "..."
//! receiver_id = "03..."
//! msatoshi = 100000
//!
//! [[routes]]
//! hops = [{ channel_id = "600000x12x0", node_id = "03...", amount_msat = 100300, delay = 9 }]
//!
//! [[outcomes]]
//! outcome = "success"
//! preimage = "..."
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use lnpay_core::lightning::invoice::{DEFAULT_INVOICE_EXPIRY_SECS, DEFAULT_MIN_FINAL_CLTV_EXPIRY};
use lnpay_core::lightning::{
    Clock, DecodedInvoice, InvoiceDecoder, InvoiceError, PaymentHash, PaymentSender, Route,
    RouteHop, RouteRequest, RouteSource, SendFailure, SendOutcome, SystemClock,
};
use secp256k1::PublicKey;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

fn default_expiry() -> u64 {
    DEFAULT_INVOICE_EXPIRY_SECS
}

fn default_min_final_cltv_expiry() -> u32 {
    DEFAULT_MIN_FINAL_CLTV_EXPIRY
}

/// A scenario as written on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Our node id; every route starts here
    pub node_id: PublicKey,
    /// Fixed wall clock, unix seconds; the system clock when absent
    #[serde(default)]
    pub now: Option<u64>,
    pub invoice: ScenarioInvoice,
    /// Route replies in the order they are handed out
    #[serde(default)]
    pub routes: Vec<ScriptedRoute>,
    /// Send outcomes in the order they are handed out
    #[serde(default)]
    pub outcomes: Vec<SendOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioInvoice {
    pub bolt11: String,
    pub payment_hash: PaymentHash,
    pub receiver_id: PublicKey,
    /// Creation time; defaults to the scenario clock
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default = "default_expiry")]
    pub expiry: u64,
    #[serde(default = "default_min_final_cltv_expiry")]
    pub min_final_cltv_expiry: u32,
    #[serde(default)]
    pub msatoshi: Option<u64>,
    /// When set the invoice commits to this description and the payer must
    /// supply it
    #[serde(default)]
    pub description: Option<String>,
}

/// One route reply; no hops means no path was found
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedRoute {
    #[serde(default)]
    pub hops: Vec<RouteHop>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse scenario")
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.now {
            Some(now) => Arc::new(FixedClock(now)),
            None => Arc::new(SystemClock),
        }
    }
}

/// Clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

/// Plays back a scenario as route source, payment sender and invoice decoder
pub struct ScriptedNetwork {
    invoice: DecodedInvoice,
    bolt11: String,
    description: Option<String>,
    routes: Mutex<VecDeque<Route>>,
    outcomes: Mutex<VecDeque<SendOutcome>>,
}

impl ScriptedNetwork {
    pub fn new(scenario: &Scenario, clock: &dyn Clock) -> Self {
        let written = &scenario.invoice;
        let invoice = DecodedInvoice {
            payment_hash: written.payment_hash,
            receiver_id: written.receiver_id,
            timestamp: written.timestamp.unwrap_or_else(|| clock.now()),
            expiry: written.expiry,
            min_final_cltv_expiry: written.min_final_cltv_expiry,
            msatoshi: written.msatoshi,
        };
        Self {
            invoice,
            bolt11: written.bolt11.clone(),
            description: written.description.clone(),
            routes: Mutex::new(
                scenario
                    .routes
                    .iter()
                    .map(|r| Route::new(r.hops.clone()))
                    .collect(),
            ),
            outcomes: Mutex::new(scenario.outcomes.iter().cloned().collect()),
        }
    }

    pub fn remaining_routes(&self) -> usize {
        self.routes.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn remaining_outcomes(&self) -> usize {
        self.outcomes.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl InvoiceDecoder for ScriptedNetwork {
    fn decode(&self, bolt11: &str, description: Option<&str>) -> Result<DecodedInvoice, InvoiceError> {
        if bolt11 != self.bolt11 {
            return Err(InvoiceError::Unknown);
        }
        match (self.description.as_deref(), description) {
            (Some(_), None) => Err(InvoiceError::DescriptionRequired),
            (Some(expected), Some(given)) if expected != given => {
                Err(InvoiceError::DescriptionMismatch)
            }
            _ => Ok(self.invoice.clone()),
        }
    }
}

#[async_trait]
impl RouteSource for ScriptedNetwork {
    async fn get_route(&self, request: RouteRequest) -> Route {
        debug!(
            "scenario: route request for {} msat, fuzz {:.2}",
            request.amount_msat, request.fuzz
        );
        let next = match self.routes.lock() {
            Ok(mut routes) => routes.pop_front(),
            Err(_) => None,
        };
        next.unwrap_or_else(|| {
            warn!("scenario: out of routes, answering with no route");
            Route::default()
        })
    }
}

#[async_trait]
impl PaymentSender for ScriptedNetwork {
    async fn send_payment(&self, payment_hash: PaymentHash, route: Route) -> SendOutcome {
        debug!(
            "scenario: send {} over {} hops",
            payment_hash.short(),
            route.len()
        );
        let next = match self.outcomes.lock() {
            Ok(mut outcomes) => outcomes.pop_front(),
            Err(_) => None,
        };
        next.unwrap_or_else(|| {
            warn!("scenario: out of send outcomes, answering with an unparseable onion");
            SendOutcome::Failure(SendFailure::UnparseableOnion {
                details: "scenario has no more send outcomes".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnpay_core::lightning::{FailCode, PaymentPreimage};

    const NODE_A: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const NODE_B: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn sample() -> String {
        format!(
            r#"
node_id = "{a}"
now = 1700000000

[invoice]
bolt11 = "lnbc1test"
payment_hash = "{hash}"
receiver_id = "{b}"
msatoshi = 100000
description = "coffee"

[[routes]]
hops = [{{ channel_id = "600000x12x0", node_id = "{b}", amount_msat = 100300, delay = 9 }}]

[[routes]]

[[outcomes]]
outcome = "failure"
error = "try_other_route"
details = "reply from remote"
failure = {{ erring_index = 1, failcode = 0x100e, erring_node = "{b}", erring_channel = "600000x12x0" }}

[[outcomes]]
outcome = "success"
preimage = "{preimage}"
"#,
            a = NODE_A,
            b = NODE_B,
            hash = PaymentPreimage::new([7; 32]).payment_hash().to_hex(),
            preimage = PaymentPreimage::new([7; 32]).to_hex(),
        )
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(&sample()).unwrap();
        assert_eq!(scenario.now, Some(1_700_000_000));
        assert_eq!(scenario.invoice.expiry, DEFAULT_INVOICE_EXPIRY_SECS);
        assert_eq!(scenario.routes.len(), 2);
        assert_eq!(scenario.routes[0].hops[0].amount_msat, 100_300);
        assert!(scenario.routes[1].hops.is_empty());

        match &scenario.outcomes[0] {
            SendOutcome::Failure(SendFailure::TryOtherRoute { failure, .. }) => {
                assert_eq!(failure.failcode, FailCode::ExpiryTooSoon);
                assert_eq!(failure.erring_channel.to_string(), "600000x12x0");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(
            scenario.outcomes[1],
            SendOutcome::Success {
                preimage: PaymentPreimage::new([7; 32])
            }
        );
    }

    #[test]
    fn test_bundled_scenario_parses() {
        let scenario = Scenario::parse(include_str!("../scenarios/fee_backoff.toml")).unwrap();
        assert_eq!(scenario.now, None);
        assert_eq!(scenario.routes.len(), 3);
        assert_eq!(scenario.outcomes.len(), 2);
        assert_eq!(
            scenario.invoice.payment_hash,
            PaymentPreimage::new([0x42; 32]).payment_hash()
        );
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let broken = sample().replace("msatoshi = 100000", "amount = 100000");
        assert!(Scenario::parse(&broken).is_err());
    }

    #[test]
    fn test_decoder_checks_bolt11_and_description() {
        let scenario = Scenario::parse(&sample()).unwrap();
        let network = ScriptedNetwork::new(&scenario, scenario.clock().as_ref());

        assert_eq!(
            network.decode("lnbc1other", Some("coffee")),
            Err(InvoiceError::Unknown)
        );
        assert_eq!(
            network.decode("lnbc1test", None),
            Err(InvoiceError::DescriptionRequired)
        );
        assert_eq!(
            network.decode("lnbc1test", Some("tea")),
            Err(InvoiceError::DescriptionMismatch)
        );

        let invoice = network.decode("lnbc1test", Some("coffee")).unwrap();
        assert_eq!(invoice.timestamp, 1_700_000_000);
        assert_eq!(invoice.absolute_expiry(), 1_700_003_600);
        assert_eq!(invoice.msatoshi, Some(100_000));
    }

    #[tokio::test]
    async fn test_network_plays_back_in_order() {
        let scenario = Scenario::parse(&sample()).unwrap();
        let network = ScriptedNetwork::new(&scenario, &FixedClock(0));
        let request = RouteRequest {
            source: scenario.node_id,
            destination: scenario.invoice.receiver_id,
            amount_msat: 100_000,
            riskfactor: 1000.0,
            final_cltv: 9,
            fuzz: 0.75,
            seed: lnpay_core::lightning::RouteSeed([0; 16]),
        };

        assert_eq!(network.get_route(request.clone()).await.len(), 1);
        assert!(network.get_route(request.clone()).await.is_empty());
        assert!(network.get_route(request).await.is_empty());
        assert_eq!(network.remaining_routes(), 0);

        let hash = scenario.invoice.payment_hash;
        assert!(matches!(
            network.send_payment(hash, Route::default()).await,
            SendOutcome::Failure(SendFailure::TryOtherRoute { .. })
        ));
        assert!(matches!(
            network.send_payment(hash, Route::default()).await,
            SendOutcome::Success { .. }
        ));
        assert_eq!(network.remaining_outcomes(), 0);
        assert!(matches!(
            network.send_payment(hash, Route::default()).await,
            SendOutcome::Failure(SendFailure::UnparseableOnion { .. })
        ));
    }
}
