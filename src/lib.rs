// nexus_core/src/lib.rs
//
// Nexus — a low-latency exchange matching core and trading-client
// gateway. See SPEC_FULL.md for the full module map; `src/bin/exchange.rs`
// and `src/bin/client.rs` wire these modules into the two processes
// described there.

pub mod book;
pub mod client;
pub mod config;
pub mod exchange;
pub mod matching_engine;
pub mod mem_pool;
pub mod net;
pub mod ring_buffer;
pub mod risk;
pub mod sequencer;
pub mod strategy;
pub mod types;
pub mod wire;

pub use book::{MatchingEventSink, OrderBook};
pub use client::{MarketDataConsumer, OrderGateway};
pub use config::{ClientConfig, ExchangeConfig};
pub use exchange::{MarketDataPublisher, OrderServer, SnapshotSynthesizer};
pub use matching_engine::MatchingEngine;
pub use mem_pool::{MemPool, PoolIndex};
pub use ring_buffer::SpscRingBuffer;
pub use risk::{check as check_risk, RiskCheckResult, RiskLimits};
pub use sequencer::FifoSequencer;
pub use types::{ClientId, OrderId, Price, Priority, Qty, Side, TickerId};
