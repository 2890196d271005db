// nexus_core/src/strategy/mod.rs
//
// §4.11 strategy adapter: contract only, not specified in detail. The
// core commits to three inputs (market updates, this client's own
// responses, a per-ticker risk policy) and one output (requests); how a
// concrete strategy turns that into trading decisions is explicitly out
// of scope (§1 Non-goals: "example strategies (market-maker /
// liquidity-taker / random)").
//
// What the core DOES require of any implementation, per §4.11:
//   - requests are emitted with a monotonically increasing
//     `client_order_id` per client (`ClientOrderIdSequence` below is the
//     one piece of that contract worth giving a concrete, reusable
//     shape — everything else is genuinely strategy-specific);
//   - a CANCEL names a previously-emitted `client_order_id` (the
//     exchange tolerates stale ones via CANCEL_REJECTED, §4.6);
//   - every order is checked with `risk::check` against its ticker's
//     `RiskLimits` before being emitted.

use crate::types::OrderId;
use crate::wire::{MEClientRequest, MEClientResponse, MEMarketUpdate};

/// The core's view of a strategy: something that can be driven with
/// market data and its own order responses, and polled for outbound
/// requests. The order-gateway poll loop (§4.10) owns the request
/// queue a strategy pushes onto and the response queue it reads from;
/// this trait only names the shape, not the queues.
pub trait Strategy {
    /// A market update for a ticker this strategy is watching.
    fn on_market_update(&mut self, update: MEMarketUpdate);

    /// A response to one of this client's own requests.
    fn on_response(&mut self, response: MEClientResponse);

    /// Called once per poll iteration after market data and responses
    /// for that iteration have been delivered; returns every request
    /// the strategy wants sent this cycle, in the order they should be
    /// framed and transmitted.
    fn poll(&mut self) -> Vec<MEClientRequest>;
}

/// Hands out strictly increasing `client_order_id`s for one client.
/// Concrete strategies are not required to use this type, but it is
/// the one piece of the monotonicity contract (§4.11) worth not
/// reimplementing per strategy.
#[derive(Debug, Default)]
pub struct ClientOrderIdSequence {
    next: OrderId,
}

impl ClientOrderIdSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next `client_order_id` and advances the sequence.
    pub fn next(&mut self) -> OrderId {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_order_ids_increase_monotonically_from_one() {
        let mut seq = ClientOrderIdSequence::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.next(), 3);
    }
}
