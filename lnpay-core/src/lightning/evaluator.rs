//! Route fee evaluation against the caller's budget

use super::attempt::AttemptState;
use super::fuzz;
use super::router::Route;
use tracing::warn;

/// Fee of a proposed route relative to the amount being paid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCost {
    pub fee_msat: u64,
    pub fee_percent: f64,
}

impl RouteCost {
    // The fee wraps like the u64 subtraction it is, so a route delivering
    // less than the amount shows up as an absurd fee rather than a free one.
    // f64 holds 53 bits exactly. The full msat supply needs about 61, so
    // percentages lose precision near that range; amounts the network
    // accepts today are far below it.
    pub fn compute(amount_msat: u64, amount_sent_msat: u64) -> Self {
        let fee_msat = amount_sent_msat.wrapping_sub(amount_msat);
        let fee_percent = fee_msat as f64 * 100.0 / amount_msat as f64;
        Self {
            fee_msat,
            fee_percent,
        }
    }
}

/// Outcome of judging a route
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteDecision {
    /// Within budget; send over it
    Accept(RouteCost),
    /// Over budget and no fuzz left to trade
    TooExpensive(RouteCost),
    /// Over budget; fuzz lowered, ask for another route
    RetryWithLessFuzz { cost: RouteCost, fuzz: f64 },
}

/// Judge a non-empty route. Lowers the attempt's fuzz when asking for a retry.
/// A route that delivers less than the amount is never accepted.
pub fn evaluate(attempt: &mut AttemptState, route: &Route) -> RouteDecision {
    let amount_sent = route.amount_sent().unwrap_or_default();
    let underpays = amount_sent < attempt.amount_msat();
    if underpays {
        warn!(
            "pay({}): route delivers {} msat, less than the {} msat requested",
            attempt.id(),
            amount_sent,
            attempt.amount_msat()
        );
    }

    let cost = RouteCost::compute(attempt.amount_msat(), amount_sent);

    if !underpays && cost.fee_percent <= attempt.max_fee_percent() {
        return RouteDecision::Accept(cost);
    }

    if fuzz::is_exhausted(attempt.fuzz()) {
        return RouteDecision::TooExpensive(cost);
    }

    let fuzz = attempt.lower_fuzz();
    RouteDecision::RetryWithLessFuzz { cost, fuzz }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lightning::attempt::tests::test_attempt;
    use crate::lightning::router::{RouteHop, ShortChannelId};
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn route_sending(amount_msat: u64) -> Route {
        let secret = SecretKey::from_slice(&[9u8; 32]).unwrap();
        Route::new(vec![RouteHop {
            channel_id: ShortChannelId::new(1, 1, 1).unwrap(),
            node_id: PublicKey::from_secret_key(&Secp256k1::new(), &secret),
            amount_msat,
            delay: 10,
        }])
    }

    #[test]
    fn test_cost_computation() {
        let cost = RouteCost::compute(100_000, 101_200);
        assert_eq!(cost.fee_msat, 1_200);
        assert!((cost.fee_percent - 1.2).abs() < 1e-9);

        let free = RouteCost::compute(100_000, 100_000);
        assert_eq!(free.fee_msat, 0);
        assert_eq!(free.fee_percent, 0.0);

        let short = RouteCost::compute(100_000, 50_000);
        assert_eq!(short.fee_msat, u64::MAX - 49_999);
        assert!(short.fee_percent > 100.0);
    }

    #[test]
    fn test_route_short_of_amount_is_never_accepted() {
        let mut attempt = test_attempt(100_000, 100.0);
        match evaluate(&mut attempt, &route_sending(50_000)) {
            RouteDecision::RetryWithLessFuzz { fuzz, .. } => {
                assert!((fuzz - 0.60).abs() < 1e-9);
            }
            other => panic!("unexpected decision {:?}", other),
        }

        while !fuzz::is_exhausted(attempt.fuzz()) {
            attempt.lower_fuzz();
        }
        assert!(matches!(
            evaluate(&mut attempt, &route_sending(99_999)),
            RouteDecision::TooExpensive(_)
        ));
    }

    #[test]
    fn test_short_route_rejected_even_when_wrapped_fee_looks_cheap() {
        // amount close to u64::MAX makes the wrapped fee tiny
        let mut attempt = test_attempt(u64::MAX, 0.5);
        let decision = evaluate(&mut attempt, &route_sending(0));
        assert!(!matches!(decision, RouteDecision::Accept(_)), "{:?}", decision);
    }

    #[test]
    fn test_accept_within_budget() {
        let mut attempt = test_attempt(100_000, 0.5);
        let decision = evaluate(&mut attempt, &route_sending(100_500));
        assert!(matches!(decision, RouteDecision::Accept(_)));
        assert_eq!(attempt.fuzz(), fuzz::INITIAL_FUZZ);
    }

    #[test]
    fn test_over_budget_lowers_fuzz() {
        let mut attempt = test_attempt(100_000, 0.5);
        match evaluate(&mut attempt, &route_sending(101_200)) {
            RouteDecision::RetryWithLessFuzz { cost, fuzz } => {
                assert_eq!(cost.fee_msat, 1_200);
                assert!((fuzz - 0.60).abs() < 1e-9);
            }
            other => panic!("unexpected decision {:?}", other),
        }
        assert!((attempt.fuzz() - 0.60).abs() < 1e-9);
    }

    #[test]
    fn test_over_budget_with_no_fuzz_is_final() {
        let mut attempt = test_attempt(100_000, 0.5);
        while !fuzz::is_exhausted(attempt.fuzz()) {
            attempt.lower_fuzz();
        }
        let decision = evaluate(&mut attempt, &route_sending(200_000));
        match decision {
            RouteDecision::TooExpensive(cost) => {
                assert_eq!(cost.fee_msat, 100_000);
                assert!((cost.fee_percent - 100.0).abs() < 1e-9);
            }
            other => panic!("unexpected decision {:?}", other),
        }
    }
}
