// nexus_core/src/client/mod.rs
//
// Client-side components (§4.9–§4.10): market-data consumer with gap
// recovery, and order-gateway TCP framing.

pub mod market_data_consumer;
pub mod order_gateway;

pub use market_data_consumer::MarketDataConsumer;
pub use order_gateway::OrderGateway;
