// nexus_core/src/exchange/mod.rs
//
// Exchange-side components (§4.6–§4.8): TCP order-entry framing,
// incremental market-data publishing, and periodic snapshot synthesis.

pub mod market_data_publisher;
pub mod order_server;
pub mod snapshot_synthesizer;

pub use market_data_publisher::MarketDataPublisher;
pub use order_server::OrderServer;
pub use snapshot_synthesizer::SnapshotSynthesizer;
