//! Per-payment attempt state
//!
//! One `AttemptState` lives for the whole of a payment. Everything produced
//! by a single route-request/send cycle sits in `AttemptScratch`, which is
//! dropped and rebuilt at the top of every cycle so a long retry chain never
//! accumulates old routes or requests.

use super::fuzz;
use super::payment::PaymentHash;
use super::router::{Route, RouteRequest, RouteSeed};
use crate::error::PayRequestError;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ATTEMPT_ID: AtomicU64 = AtomicU64::new(1);

/// What the caller asked us to pay, after invoice decoding
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTerms {
    pub payment_hash: PaymentHash,
    pub receiver_id: PublicKey,
    /// Absolute expiry, unix seconds
    pub expiry: u64,
    pub min_final_cltv: u32,
    pub amount_msat: u64,
    /// Passed to the route source untouched
    pub riskfactor: f64,
    pub max_fee_percent: f64,
}

impl PaymentTerms {
    pub fn validate(&self) -> Result<(), PayRequestError> {
        if !(0.0 <= self.max_fee_percent) {
            return Err(PayRequestError::MaxFeeNegative(self.max_fee_percent));
        }
        if !(self.max_fee_percent <= 100.0) {
            return Err(PayRequestError::MaxFeeTooLarge(self.max_fee_percent));
        }
        if self.amount_msat == 0 {
            return Err(PayRequestError::ZeroAmount);
        }
        if !self.riskfactor.is_finite() {
            return Err(PayRequestError::InvalidRiskFactor(self.riskfactor));
        }
        Ok(())
    }
}

/// Route request and send counters, reported with every outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounters {
    pub getroute_tries: u32,
    pub sendpay_tries: u32,
}

/// Data owned by one route-request/send cycle
#[derive(Debug, Default)]
pub struct AttemptScratch {
    pub seed: Option<RouteSeed>,
    pub request: Option<RouteRequest>,
    pub route: Option<Route>,
}

impl AttemptScratch {
    pub fn is_empty(&self) -> bool {
        self.seed.is_none() && self.request.is_none() && self.route.is_none()
    }
}

/// Mutable record of one in-flight payment
#[derive(Debug)]
pub struct AttemptState {
    id: u64,
    terms: PaymentTerms,
    counters: AttemptCounters,
    fuzz: f64,
    rng: ChaCha20Rng,
    scratch: AttemptScratch,
}

impl AttemptState {
    /// Create the attempt. Terms are validated when the attempt is started.
    pub fn new(terms: PaymentTerms) -> Self {
        Self::with_rng(terms, ChaCha20Rng::from_entropy())
    }

    pub fn with_rng(terms: PaymentTerms, rng: ChaCha20Rng) -> Self {
        Self {
            id: NEXT_ATTEMPT_ID.fetch_add(1, Ordering::Relaxed),
            terms,
            counters: AttemptCounters::default(),
            fuzz: fuzz::INITIAL_FUZZ,
            rng,
            scratch: AttemptScratch::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn terms(&self) -> &PaymentTerms {
        &self.terms
    }

    pub fn payment_hash(&self) -> PaymentHash {
        self.terms.payment_hash
    }

    pub fn expiry(&self) -> u64 {
        self.terms.expiry
    }

    pub fn amount_msat(&self) -> u64 {
        self.terms.amount_msat
    }

    pub fn max_fee_percent(&self) -> f64 {
        self.terms.max_fee_percent
    }

    pub fn counters(&self) -> AttemptCounters {
        self.counters
    }

    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }

    pub fn scratch(&self) -> &AttemptScratch {
        &self.scratch
    }

    /// Lower the fuzz one step; returns the new value
    pub(crate) fn lower_fuzz(&mut self) -> f64 {
        self.fuzz = fuzz::decay(self.fuzz);
        self.fuzz
    }

    /// Start a new cycle: drop the previous cycle's data, draw a fresh seed,
    /// count the route request and build it.
    pub fn begin_cycle(&mut self, source: PublicKey) -> RouteRequest {
        self.scratch = AttemptScratch::default();

        let seed = RouteSeed::generate(&mut self.rng);
        self.counters.getroute_tries += 1;

        let request = RouteRequest {
            source,
            destination: self.terms.receiver_id,
            amount_msat: self.terms.amount_msat,
            riskfactor: self.terms.riskfactor,
            final_cltv: self.terms.min_final_cltv,
            fuzz: self.fuzz,
            seed,
        };

        self.scratch.seed = Some(seed);
        self.scratch.request = Some(request.clone());
        request
    }

    /// Keep the route returned for this cycle
    pub fn record_route(&mut self, route: Route) -> &Route {
        self.scratch.route.insert(route)
    }

    /// Count a send; called right before dispatch
    pub fn mark_send(&mut self) {
        self.counters.sendpay_tries += 1;
    }

    /// Drop all per-cycle data; used on terminal outcomes
    pub fn release(&mut self) {
        self.scratch = AttemptScratch::default();
    }
}
