// nexus_core/src/types/ids.rs
//
// Dense small-integer identifiers. Kept as thin newtypes over the
// primitive rather than bare `u32`/`u64` so a ticker id and a client id
// can never be swapped at a call site by accident — the compiler
// rejects it.

use std::fmt;

/// Upper bound on distinct instruments. Also the size of every
/// per-ticker array (order books, market-data state) allocated at
/// startup — see §5 "Resource discipline".
pub const MAX_TICKERS: usize = 8;

/// Upper bound on distinct clients connected to one exchange process.
pub const MAX_CLIENTS: usize = 256;

/// Direct-indexed price level table size per order book (§4.3). Chosen
/// comfortably larger than any realistic tick range so that
/// `price mod MAX_PRICE_LEVELS` collisions, while possible in theory,
/// do not occur for valid input.
pub const MAX_PRICE_LEVELS: usize = 1 << 18;

/// Per-book order pool capacity (§4.2).
pub const MAX_ORDERS: usize = 1 << 20;

/// Dense instrument identifier, `0..MAX_TICKERS`.
pub type TickerId = u32;
pub const TICKER_ID_INVALID: TickerId = TickerId::MAX;

/// Dense per-process client identifier, `0..MAX_CLIENTS`.
pub type ClientId = u32;
pub const CLIENT_ID_INVALID: ClientId = ClientId::MAX;

/// Exchange-assigned order identifier. Monotonic within one order book;
/// also reused as the client-order-id type on the wire (both are
/// 64-bit).
pub type OrderId = u64;
pub const ORDER_ID_INVALID: OrderId = OrderId::MAX;

/// FIFO priority within a price level. Strictly increasing in
/// insertion order (§3 "Priorities within a price level are strictly
/// monotone").
pub type Priority = u64;
pub const PRIORITY_INVALID: Priority = 0;

/// A monotone sequence number stamped on market-data and order-flow
/// wire messages (§4.7, §4.6).
pub type SeqNum = u64;

pub fn is_valid_ticker(ticker: TickerId) -> bool {
    (ticker as usize) < MAX_TICKERS
}

pub fn is_valid_client(client: ClientId) -> bool {
    (client as usize) < MAX_CLIENTS
}

/// Thin wrapper purely so `{:#?}` debug output on ids reads naturally;
/// not used on the hot path.
pub struct DisplayId(pub u64);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == u64::MAX {
            write!(f, "INVALID")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
