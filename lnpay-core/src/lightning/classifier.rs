//! Send failure classification
//!
//! Decides what a failed send means for the payment: give up, try another
//! route right away, or wait for block heights to settle first.

use super::sendpay::{SendFailure, TerminalSendFailure};
use std::time::Duration;

/// Delay before retrying after a suspected block height disagreement.
/// Overridden by `pay.blockheight_retry_delay_secs`.
pub const BLOCKHEIGHT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// What the orchestrator should do next with a failed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Report to the caller; no retry
    Terminal(TerminalSendFailure),
    /// Request a new route immediately
    RetryNow,
    /// Request a new route once the delay has passed
    RetryAfterDelay { delay: Duration, reason: String },
}

/// Classify a failed send. Total over every failure variant and fail code.
pub fn classify(failure: SendFailure, delay: Duration) -> Verdict {
    match failure {
        SendFailure::InProgress { details } => {
            Verdict::Terminal(TerminalSendFailure::InProgress { details })
        }
        SendFailure::RhashAlreadyUsed { details } => {
            Verdict::Terminal(TerminalSendFailure::RhashAlreadyUsed { details })
        }
        SendFailure::DestinationPermFail { failure, details } => {
            Verdict::Terminal(TerminalSendFailure::DestinationPermFail { failure, details })
        }
        SendFailure::UnparseableOnion { .. } => Verdict::RetryNow,
        SendFailure::TryOtherRoute { failure, .. } if failure.failcode.is_blockheight_related() => {
            Verdict::RetryAfterDelay {
                delay,
                reason: format!(
                    "Possible blockheight disagreement ({} from peer)",
                    failure.failcode
                ),
            }
        }
        SendFailure::TryOtherRoute { .. } => Verdict::RetryNow,
    }
}
