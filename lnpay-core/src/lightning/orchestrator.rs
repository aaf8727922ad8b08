//! Payment orchestration
//!
//! Drives one payment through repeated route-request / fee-check / send
//! cycles until it succeeds or fails for good:
//!
//! ```text
//! Init -> RequestingRoute -> EvaluatingFee -> SendingPayment -> Succeeded
//!              ^                  |                 |        \-> Failed
//!              |                  | (over budget)   | (retryable)
//!              +------------------+-----------------+ (optionally after a delay)
//! ```
//!
//! Only one collaborator call is outstanding per payment at any time. Many
//! payments can run side by side; each owns its `AttemptState`.

use super::attempt::{AttemptState, PaymentTerms};
use super::classifier::{self, Verdict};
use super::evaluator::{self, RouteDecision};
use super::payment::PaymentHash;
use super::report::{PayFailure, PayResult, PaySuccess};
use super::router::{Route, RouteSource};
use super::sendpay::{PaymentSender, SendOutcome};
use crate::error::{LnPayError, LnPayResult};
use async_trait::async_trait;
use secp256k1::PublicKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One-shot delay used before a deferred retry
#[async_trait]
pub trait RetryTimer: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// `RetryTimer` backed by the tokio timer wheel
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl RetryTimer for TokioTimer {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Wall clock, unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Services a payment talks to. Shared by every payment; none hold
/// per-payment state.
#[derive(Clone)]
pub struct Collaborators {
    /// Our own node id, the source of every route
    pub node_id: PublicKey,
    pub routes: Arc<dyn RouteSource>,
    pub sender: Arc<dyn PaymentSender>,
    pub timer: Arc<dyn RetryTimer>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    pub fn new(
        node_id: PublicKey,
        routes: Arc<dyn RouteSource>,
        sender: Arc<dyn PaymentSender>,
    ) -> Self {
        Self {
            node_id,
            routes,
            sender,
            timer: Arc::new(TokioTimer),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_timer(mut self, timer: Arc<dyn RetryTimer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Where a payment is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayState {
    Init,
    RequestingRoute,
    EvaluatingFee,
    SendingPayment,
    WaitingToRetry,
    Succeeded,
    Failed,
}

enum RouteStep {
    Send(Route),
    Retry,
    Done(PayFailure),
}

/// Drives a single payment to a terminal result
pub struct PaymentOrchestrator {
    attempt: AttemptState,
    ctx: Collaborators,
    retry_delay: Duration,
    state: PayState,
}

impl PaymentOrchestrator {
    pub fn new(attempt: AttemptState, ctx: Collaborators) -> Self {
        Self {
            attempt,
            ctx,
            retry_delay: classifier::BLOCKHEIGHT_RETRY_DELAY,
            state: PayState::Init,
        }
    }

    /// Delay used for block height disagreements
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn attempt(&self) -> &AttemptState {
        &self.attempt
    }

    fn transition(&mut self, next: PayState) {
        debug!(
            "pay({}): {:?} -> {:?}",
            self.attempt.id(),
            self.state,
            next
        );
        self.state = next;
    }

    /// Fails with `InvoiceExpired` once the invoice expiry has been reached
    pub fn check_expiry(&self) -> Result<(), PayFailure> {
        let now = self.ctx.clock.now();
        if now >= self.attempt.expiry() {
            return Err(PayFailure::InvoiceExpired {
                now,
                expiry: self.attempt.expiry(),
                counters: self.attempt.counters(),
            });
        }
        Ok(())
    }

    /// Run cycles until the payment succeeds or fails for good
    pub async fn run(mut self) -> PayResult {
        let result = self.drive().await;

        self.transition(if result.is_ok() {
            PayState::Succeeded
        } else {
            PayState::Failed
        });
        self.attempt.release();

        match &result {
            Ok(success) => info!(
                "pay({}): Success after {} route requests, {} sends",
                self.attempt.id(),
                success.getroute_tries,
                success.sendpay_tries
            ),
            Err(failure) => info!(
                "pay({}): Failed, reporting to caller: {}",
                self.attempt.id(),
                failure.message()
            ),
        }
        result
    }

    async fn drive(&mut self) -> PayResult {
        loop {
            self.transition(PayState::RequestingRoute);
            self.check_expiry()?;

            let request = self.attempt.begin_cycle(self.ctx.node_id);
            debug!(
                "pay({}): getroute #{} amount={} fuzz={:.2}",
                self.attempt.id(),
                self.attempt.counters().getroute_tries,
                request.amount_msat,
                request.fuzz
            );
            let route = self.ctx.routes.get_route(request).await;

            self.transition(PayState::EvaluatingFee);
            let route = match self.judge_route(route) {
                RouteStep::Send(route) => route,
                RouteStep::Retry => continue,
                RouteStep::Done(failure) => return Err(failure),
            };

            self.transition(PayState::SendingPayment);
            self.attempt.mark_send();
            let outcome = self
                .ctx
                .sender
                .send_payment(self.attempt.payment_hash(), route)
                .await;

            let failure = match outcome {
                SendOutcome::Success { preimage } => {
                    return Ok(PaySuccess::new(preimage, self.attempt.counters()));
                }
                SendOutcome::Failure(failure) => failure,
            };

            match failure.routing_failure() {
                Some(routing) => debug!(
                    "pay({}): send failed: {} at hop {} ({}): {}",
                    self.attempt.id(),
                    routing.failcode,
                    routing.erring_index,
                    routing.erring_channel,
                    failure.details()
                ),
                None => debug!(
                    "pay({}): send failed: {}",
                    self.attempt.id(),
                    failure.details()
                ),
            }

            match classifier::classify(failure, self.retry_delay) {
                Verdict::Terminal(failure) => {
                    return Err(PayFailure::Send {
                        failure,
                        counters: self.attempt.counters(),
                    });
                }
                Verdict::RetryNow => {}
                Verdict::RetryAfterDelay { delay, reason } => {
                    info!(
                        "pay({}): Delay before retry: {}",
                        self.attempt.id(),
                        reason
                    );
                    self.transition(PayState::WaitingToRetry);
                    self.ctx.timer.sleep(delay).await;
                }
            }
            info!("pay({}): Try another route", self.attempt.id());
        }
    }

    fn judge_route(&mut self, route: Route) -> RouteStep {
        if route.is_empty() {
            return RouteStep::Done(PayFailure::RouteNotFound {
                counters: self.attempt.counters(),
            });
        }

        let route = self.attempt.record_route(route).clone();
        match evaluator::evaluate(&mut self.attempt, &route) {
            RouteDecision::Accept(cost) => {
                info!(
                    "pay({}): sendpay via route: {} (fee {} msat)",
                    self.attempt.id(),
                    route.describe(),
                    cost.fee_msat
                );
                RouteStep::Send(route)
            }
            RouteDecision::RetryWithLessFuzz { cost, fuzz } => {
                info!(
                    "pay({}): Route fee {:.6}% over budget {:.6}%, retrying with fuzz {:.2}",
                    self.attempt.id(),
                    cost.fee_percent,
                    self.attempt.max_fee_percent(),
                    fuzz
                );
                RouteStep::Retry
            }
            RouteDecision::TooExpensive(cost) => {
                warn!(
                    "pay({}): Route fee {:.6}% over budget {:.6}% with no fuzz left",
                    self.attempt.id(),
                    cost.fee_percent,
                    self.attempt.max_fee_percent()
                );
                RouteStep::Done(PayFailure::FeeTooHigh {
                    fee: cost.fee_msat,
                    fee_percent: cost.fee_percent,
                    amount_msat: self.attempt.amount_msat(),
                    max_fee_percent: self.attempt.max_fee_percent(),
                    counters: self.attempt.counters(),
                })
            }
        }
    }
}

/// A payment running in the background
#[derive(Debug)]
pub struct PendingPayment {
    payment_hash: PaymentHash,
    attempt_id: u64,
    handle: JoinHandle<PayResult>,
}

impl PendingPayment {
    pub fn payment_hash(&self) -> PaymentHash {
        self.payment_hash
    }

    pub fn attempt_id(&self) -> u64 {
        self.attempt_id
    }

    /// Wait for the terminal result
    pub async fn wait(self) -> LnPayResult<PayResult> {
        self.handle
            .await
            .map_err(|e| LnPayError::TaskAborted(e.to_string()))
    }
}

/// Starts payments; each runs as its own tokio task
#[derive(Clone)]
pub struct PaymentService {
    ctx: Collaborators,
    retry_delay: Duration,
}

impl PaymentService {
    pub fn new(ctx: Collaborators) -> Self {
        Self {
            ctx,
            retry_delay: classifier::BLOCKHEIGHT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Validate and start a payment. Bad terms and already expired invoices
    /// fail here; anything else comes back as a `PendingPayment`.
    /// Must be called from within a tokio runtime.
    pub fn initiate_payment(&self, terms: PaymentTerms) -> Result<PendingPayment, PayFailure> {
        self.start(AttemptState::new(terms))
    }

    /// Start an already built attempt, e.g. one with a seeded RNG
    pub fn start(&self, attempt: AttemptState) -> Result<PendingPayment, PayFailure> {
        attempt.terms().validate()?;
        let payment_hash = attempt.payment_hash();
        let attempt_id = attempt.id();
        let orchestrator =
            PaymentOrchestrator::new(attempt, self.ctx.clone()).with_retry_delay(self.retry_delay);

        if let Err(failure) = orchestrator.check_expiry() {
            info!("pay({}): Invoice expired before first attempt", attempt_id);
            return Err(failure);
        }

        info!(
            "pay({}): Starting payment {} for {} msat",
            attempt_id,
            payment_hash.short(),
            orchestrator.attempt().amount_msat()
        );
        let handle = tokio::spawn(orchestrator.run());
        Ok(PendingPayment {
            payment_hash,
            attempt_id,
            handle,
        })
    }
}
