// nexus_core/src/risk/mod.rs
//
// Pre-trade risk contract (§4.11, §7). Position and PnL bookkeeping is
// explicitly out of scope for the core — the strategy side owns that
// ledger. This module only defines the limits a ticker is configured
// with and the pure check against caller-supplied position/loss state,
// so the core and the strategy agree on one vocabulary for "why was
// this rejected" without the core tracking any account state itself.

use crate::types::{Price, Qty, Side};

/// Per-(client, ticker) limits, loaded from `ClientConfig` (§4.11,
/// "order clip size, signal threshold, risk limits").
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub max_order_size: Qty,
    /// Maximum absolute net position, in contracts.
    pub max_position: i64,
    /// Maximum combined realized + unrealized loss, fixed-point.
    pub max_loss: Price,
}

/// Logical outcome of a pre-trade risk check (§7 "Strategy risk
/// rejection"). Reported back to the strategy only — never reaches the
/// exchange or other clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCheckResult {
    Allowed,
    OrderTooLarge,
    PositionTooLarge,
    LossTooLarge,
}

impl RiskCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RiskCheckResult::Allowed)
    }
}

/// Evaluate one proposed order against `limits` and the strategy's
/// current book-keeping. `current_position` and `current_loss` are
/// owned and maintained entirely by the caller (§4.11 "specified only
/// as a contract consumed by the strategy side") — this function holds
/// no state of its own.
pub fn check(
    limits: &RiskLimits,
    order_qty: Qty,
    order_side: Side,
    current_position: i64,
    current_loss: Price,
) -> RiskCheckResult {
    if order_qty > limits.max_order_size {
        return RiskCheckResult::OrderTooLarge;
    }

    let signed_qty = order_qty.raw() as i64 * order_side.sign() as i64;
    let projected_position = current_position + signed_qty;
    if projected_position.abs() > limits.max_position {
        return RiskCheckResult::PositionTooLarge;
    }

    if current_loss.raw() > limits.max_loss.raw() {
        return RiskCheckResult::LossTooLarge;
    }

    RiskCheckResult::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_order_size: Qty::new(100),
            max_position: 500,
            max_loss: Price::new(10_000 * crate::types::SCALE),
        }
    }

    #[test]
    fn order_within_all_limits_is_allowed() {
        let result = check(&limits(), Qty::new(10), Side::Buy, 0, Price::new(0));
        assert_eq!(result, RiskCheckResult::Allowed);
    }

    #[test]
    fn order_larger_than_clip_is_rejected() {
        let result = check(&limits(), Qty::new(101), Side::Buy, 0, Price::new(0));
        assert_eq!(result, RiskCheckResult::OrderTooLarge);
    }

    #[test]
    fn order_that_would_breach_net_position_is_rejected() {
        let result = check(&limits(), Qty::new(50), Side::Buy, 470, Price::new(0));
        assert_eq!(result, RiskCheckResult::PositionTooLarge);
    }

    #[test]
    fn existing_loss_beyond_the_limit_blocks_all_further_orders() {
        let result = check(&limits(), Qty::new(1), Side::Sell, 0, Price::new(20_000 * crate::types::SCALE));
        assert_eq!(result, RiskCheckResult::LossTooLarge);
    }
}
