// lnpay Lightning payment engine
//
// Leaf modules first: fuzz and classifier depend on nothing but their inputs,
// the evaluator works on attempt state, and the orchestrator ties them
// together around the route source and payment sender.

pub mod attempt;
pub mod classifier;
pub mod evaluator;
pub mod fuzz;
pub mod invoice;
pub mod onion;
pub mod orchestrator;
pub mod payment;
pub mod report;
pub mod router;
pub mod sendpay;

pub use attempt::{AttemptCounters, AttemptScratch, AttemptState, PaymentTerms};
pub use classifier::{classify, Verdict, BLOCKHEIGHT_RETRY_DELAY};
pub use evaluator::{evaluate, RouteCost, RouteDecision};
pub use invoice::{DecodedInvoice, InvoiceDecoder, InvoiceError};
pub use onion::FailCode;
pub use orchestrator::{
    Clock, Collaborators, PayState, PaymentOrchestrator, PaymentService, PendingPayment,
    RetryTimer, SystemClock, TokioTimer,
};
pub use payment::{PaymentHash, PaymentIdError, PaymentPreimage};
pub use report::{PayFailure, PayResult, PaySuccess};
pub use router::{Route, RouteHop, RouteRequest, RouteSeed, RouteSource, ShortChannelId};
pub use sendpay::{PaymentSender, RoutingFailure, SendFailure, SendOutcome, TerminalSendFailure};
