// nexus_core/src/bin/exchange.rs
//
// Exchange process entry point: wires up the order server (§4.6), the
// matching engine (§4.4), the market-data publisher (§4.7), and the
// snapshot synthesizer (§4.8) into one busy-poll loop.
//
// §1 names "process bootstrap/CLI" and "TCP socket bytewise read/write"
// as external collaborators the core is specified only at the edge of
// — this binary is that collaborator. It runs every component on a
// single OS thread rather than the "handful of long-lived... pinned"
// threads of §5: the components' state (order books, socket tables,
// snapshot replica) is already partitioned so that splitting this loop
// across real threads later is purely a wiring change, not a data-model one.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info, warn};

use nexus_core::config::ExchangeConfig;
use nexus_core::exchange::market_data_publisher::IncrementalSink;
use nexus_core::exchange::order_server::ConnId;
use nexus_core::net::multicast::McastSocket;
use nexus_core::wire::messages::WireMessage;
use nexus_core::{MarketDataPublisher, MatchingEngine, OrderServer, SnapshotSynthesizer};

const RECV_BUF_SIZE: usize = 4096;
const SEQUENCER_CAPACITY: usize = 4096;
const QUEUE_CAPACITY: usize = 1 << 16;
const SNAPSHOT_QUEUE_CAPACITY: usize = 1 << 16;

#[derive(Parser, Debug)]
#[command(name = "exchange", about = "Nexus exchange: order server, matching engine, market data")]
struct Args {
    /// Path to a TOML exchange configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

struct McastIncrementalSink {
    socket: McastSocket,
    port: u16,
}

impl IncrementalSink for McastIncrementalSink {
    fn publish(&mut self, msg: nexus_core::wire::MDPMarketUpdate) {
        if let Err(e) = self.socket.send_to(msg.as_bytes(), self.port) {
            error!(error = %e, "failed to publish incremental market update");
        }
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
    let config = ExchangeConfig::from_toml_str(&raw).unwrap_or_else(|e| {
        eprintln!("invalid exchange configuration: {e}");
        std::process::exit(1);
    });

    let listener = TcpListener::bind(&config.tcp_bind_addr).unwrap_or_else(|e| {
        eprintln!("failed to bind order-entry listener on {}: {e}", config.tcp_bind_addr);
        std::process::exit(1);
    });
    listener.set_nonblocking(true).expect("failed to set listener non-blocking");

    let incremental_socket = McastSocket::join(config.incremental.group, config.incremental.port, config.interface)
        .expect("failed to join incremental multicast group");
    let snapshot_socket = McastSocket::join(config.snapshot.group, config.snapshot.port, config.interface)
        .expect("failed to join snapshot multicast group");

    let mut matching_engine =
        MatchingEngine::new(nexus_core::SpscRingBuffer::new(QUEUE_CAPACITY), nexus_core::SpscRingBuffer::new(QUEUE_CAPACITY), nexus_core::SpscRingBuffer::new(QUEUE_CAPACITY));
    let mut order_server = OrderServer::new(nexus_core::SpscRingBuffer::new(QUEUE_CAPACITY), SEQUENCER_CAPACITY);
    let mut publisher = MarketDataPublisher::new(nexus_core::SpscRingBuffer::new(QUEUE_CAPACITY), SNAPSHOT_QUEUE_CAPACITY);
    let mut synthesizer = SnapshotSynthesizer::new(config.snapshot_interval_ns);
    let mut incremental_sink = McastIncrementalSink { socket: incremental_socket, port: config.incremental.port };

    let mut connections: HashMap<ConnId, std::net::TcpStream> = HashMap::new();
    let mut next_conn_id: ConnId = 0;

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        running_handler.store(false, Ordering::SeqCst);
    })
    .expect("failed to install signal handler");

    let clock = Instant::now();
    let mut recv_buf = [0u8; RECV_BUF_SIZE];

    info!(tcp = %config.tcp_bind_addr, "exchange process started");

    while running.load(Ordering::Relaxed) {
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    stream.set_nonblocking(true).expect("failed to set accepted stream non-blocking");
                    let conn_id = next_conn_id;
                    next_conn_id += 1;
                    info!(conn_id, %addr, "accepted order-entry connection");
                    connections.insert(conn_id, stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "order-entry accept failed");
                    break;
                }
            }
        }

        for (&conn_id, stream) in connections.iter_mut() {
            loop {
                match stream.read(&mut recv_buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        let rx_time = clock.elapsed().as_nanos() as u64;
                        order_server.on_recv(conn_id, &recv_buf[..n], rx_time);
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        warn!(conn_id, error = %e, "order-entry read failed");
                        break;
                    }
                }
            }
        }

        order_server.end_of_cycle(matching_engine.client_requests());
        matching_engine.drain();

        while let Some(response) = matching_engine.client_responses().pop() {
            order_server.enqueue_response(response);
        }
        while let Some(update) = matching_engine.market_updates().pop() {
            publisher.enqueue_market_update(update);
        }

        order_server.drain_responses(|conn_id, bytes| {
            if let Some(stream) = connections.get_mut(&conn_id) {
                if let Err(e) = stream.write_all(bytes) {
                    warn!(conn_id, error = %e, "order-entry write failed");
                }
            }
        });

        publisher.drain(&mut incremental_sink);

        while let Some(msg) = publisher.snapshot_queue().pop() {
            synthesizer.apply(msg);
        }

        let now_ns = clock.elapsed().as_nanos() as u64;
        if let Some(snapshot) = synthesizer.maybe_publish(now_ns) {
            info!(records = snapshot.len(), "publishing snapshot cycle");
            for msg in snapshot {
                if let Err(e) = snapshot_socket.send_to(msg.as_bytes(), config.snapshot.port) {
                    error!(error = %e, "failed to publish snapshot record");
                }
            }
        }
    }

    info!("draining in-flight work before shutdown");
    std::thread::sleep(Duration::from_millis(200));
    let _ = incremental_sink.socket.leave();
    let _ = snapshot_socket.leave();
    info!("exchange process stopped");
}
