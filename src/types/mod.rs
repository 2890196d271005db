// nexus_core/src/types/mod.rs
//
// Re-export the data-model primitives of §3 from a single module.

pub mod fixed_point;
pub mod ids;
pub mod side;

pub use fixed_point::{Price, Qty, PRICE_INVALID, QTY_INVALID, SCALE};
pub use ids::{
    is_valid_client, is_valid_ticker, ClientId, DisplayId, OrderId, Priority, SeqNum, TickerId,
    CLIENT_ID_INVALID, MAX_CLIENTS, MAX_ORDERS, MAX_PRICE_LEVELS, MAX_TICKERS, ORDER_ID_INVALID,
    PRIORITY_INVALID, TICKER_ID_INVALID,
};
pub use side::Side;
