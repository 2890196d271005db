// nexus_core/src/bin/client.rs
//
// Trading-client process entry point: wires up the market-data consumer
// (§4.9) and the order gateway (§4.10) into one busy-poll loop, driving
// a `Strategy` (§4.11, contract only — concrete strategies are out of
// scope). `NullStrategy` below exists purely so this binary has
// something to drive; it never trades and is not an example strategy
// in the market-maker/liquidity-taker/random sense §1 excludes.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};

use nexus_core::client::order_gateway::OrderGateway;
use nexus_core::config::ClientConfig;
use nexus_core::net::multicast::McastSocket;
use nexus_core::strategy::{ClientOrderIdSequence, Strategy};
use nexus_core::wire::messages::WireMessage;
use nexus_core::wire::{MDPMarketUpdate, MEClientRequest, MEClientResponse, MEMarketUpdate};
use nexus_core::MarketDataConsumer;

const RECV_BUF_SIZE: usize = 4096;
const GATEWAY_QUEUE_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "client", about = "Nexus trading client: market-data consumer and order gateway")]
struct Args {
    /// Path to a TOML client configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

/// A strategy that watches the market and never trades. `poll` always
/// returns empty; `on_market_update`/`on_response` only log. Stands in
/// for the concrete strategy §4.11 deliberately leaves unspecified, so
/// this binary demonstrates the wiring without inventing trading logic.
struct NullStrategy {
    order_ids: ClientOrderIdSequence,
}

impl NullStrategy {
    fn new() -> Self {
        Self { order_ids: ClientOrderIdSequence::new() }
    }
}

impl Strategy for NullStrategy {
    fn on_market_update(&mut self, update: MEMarketUpdate) {
        let _ = self.order_ids;
        tracing::debug!(?update, "market update observed");
    }

    fn on_response(&mut self, response: MEClientResponse) {
        tracing::debug!(?response, "own response observed");
    }

    fn poll(&mut self) -> Vec<MEClientRequest> {
        Vec::new()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.config).unwrap_or_else(|e| {
        eprintln!("failed to read config file {:?}: {e}", args.config);
        std::process::exit(1);
    });
    let config = ClientConfig::from_toml_str(&raw).unwrap_or_else(|e| {
        eprintln!("invalid client configuration: {e}");
        std::process::exit(1);
    });

    let mut stream = TcpStream::connect(&config.tcp_connect_addr).unwrap_or_else(|e| {
        eprintln!("failed to connect to exchange at {}: {e}", config.tcp_connect_addr);
        std::process::exit(1);
    });
    stream.set_nonblocking(true).expect("failed to set order-entry stream non-blocking");

    let incremental_socket = McastSocket::join(config.incremental.group, config.incremental.port, config.interface)
        .expect("failed to join incremental multicast group");
    let mut snapshot_socket: Option<McastSocket> = None;

    let mut consumer = MarketDataConsumer::new();
    let mut gateway = OrderGateway::new(config.client_id, nexus_core::SpscRingBuffer::new(GATEWAY_QUEUE_CAPACITY), GATEWAY_QUEUE_CAPACITY);
    let mut strategy = NullStrategy::new();

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        running_handler.store(false, Ordering::SeqCst);
    })
    .expect("failed to install signal handler");

    let clock = Instant::now();
    let mut recv_buf = [0u8; RECV_BUF_SIZE];
    let mut forwarded = Vec::new();

    info!(client_id = config.client_id, exchange = %config.tcp_connect_addr, "trading client started");

    while running.load(Ordering::Relaxed) {
        loop {
            match incremental_socket.try_recv(&mut recv_buf) {
                Ok(Some(n)) => {
                    let Some(msg) = MDPMarketUpdate::from_bytes(&recv_buf[..n]) else {
                        warn!("dropping malformed incremental market-data datagram");
                        continue;
                    };
                    consumer.on_incremental(msg, &mut forwarded);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "incremental multicast receive failed");
                    break;
                }
            }
        }

        match (consumer.in_recovery(), snapshot_socket.is_some()) {
            (true, false) => {
                info!("entering recovery: joining snapshot multicast group");
                snapshot_socket = McastSocket::join(config.snapshot.group, config.snapshot.port, config.interface).ok();
            }
            (false, true) => {
                info!("recovery complete: leaving snapshot multicast group");
                if let Some(socket) = snapshot_socket.take() {
                    let _ = socket.leave();
                }
            }
            _ => {}
        }

        if let Some(socket) = &snapshot_socket {
            loop {
                match socket.try_recv(&mut recv_buf) {
                    Ok(Some(n)) => {
                        let Some(msg) = MDPMarketUpdate::from_bytes(&recv_buf[..n]) else {
                            warn!("dropping malformed snapshot datagram");
                            continue;
                        };
                        consumer.on_snapshot(msg, &mut forwarded);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "snapshot multicast receive failed");
                        break;
                    }
                }
            }
        }

        for update in forwarded.drain(..) {
            strategy.on_market_update(update);
        }

        loop {
            match stream.read(&mut recv_buf) {
                Ok(0) => break,
                Ok(n) => gateway.on_recv(&recv_buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "order-entry read failed");
                    break;
                }
            }
        }

        while let Some(response) = gateway.strategy_responses().pop() {
            strategy.on_response(response);
        }

        for request in strategy.poll() {
            gateway.enqueue_request(request);
        }
        gateway.drain_outbound(|bytes| {
            if let Err(e) = stream.write_all(bytes) {
                warn!(error = %e, "order-entry write failed");
            }
        });

        let _ = clock.elapsed();
    }

    info!("draining in-flight work before shutdown");
    std::thread::sleep(Duration::from_millis(200));
    let _ = incremental_socket.leave();
    if let Some(socket) = snapshot_socket.take() {
        let _ = socket.leave();
    }
    info!("trading client stopped");
}
