// nexus_core/src/exchange/order_server.rs
//
// §4.6 exchange order server: TCP order-entry framing, per-client
// inbound sequence validation, socket binding, and the FIFO sequencer
// handoff (§4.5) into the matching engine's queue. Outbound: drains the
// matching engine's response queue and frames each response with the
// per-client outbound sequence number.
//
// Deliberately socket-agnostic (§1 "TCP socket bytewise read/write" is
// an external collaborator): connections are addressed by an opaque
// `ConnId` the binary assigns when `accept()` returns a new fd. This
// keeps the framing/sequencing state machine — the part of §4.6 that is
// actually core — unit-testable without a real socket.

use std::collections::HashMap;

use tracing::warn;

use crate::net::framing::PartialFrameBuffer;
use crate::ring_buffer::SpscRingBuffer;
use crate::sequencer::{FifoSequencer, RxTime};
use crate::types::{is_valid_client, ClientId, MAX_CLIENTS};
use crate::wire::messages::WireMessage;
use crate::wire::{MEClientRequest, MEClientResponse, OMClientRequest, OMClientResponse};

/// Caller-assigned handle for one accepted TCP connection. Opaque to
/// this module — typically a raw fd or an index into the binary's
/// connection table.
pub type ConnId = usize;

struct ClientState {
    conn: Option<ConnId>,
    expected_inbound_seq: u64,
    next_outbound_seq: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            conn: None,
            expected_inbound_seq: 1,
            next_outbound_seq: 1,
        }
    }
}

pub struct OrderServer {
    clients: Vec<ClientState>,
    frame_buffers: HashMap<ConnId, PartialFrameBuffer>,
    sequencer: FifoSequencer,
    client_responses: SpscRingBuffer<MEClientResponse>,
}

const REQUEST_FRAME_SIZE: usize = std::mem::size_of::<OMClientRequest>();

impl OrderServer {
    pub fn new(client_responses: SpscRingBuffer<MEClientResponse>, sequencer_capacity: usize) -> Self {
        Self {
            clients: (0..MAX_CLIENTS).map(|_| ClientState::default()).collect(),
            frame_buffers: HashMap::new(),
            sequencer: FifoSequencer::new(sequencer_capacity),
            client_responses,
        }
    }

    /// §4.6 "Inbound path": feed freshly-read bytes from `conn`. Complete
    /// `OMClientRequest` frames are parsed and validated immediately;
    /// any trailing partial frame is kept for the next call.
    pub fn on_recv(&mut self, conn: ConnId, bytes: &[u8], rx_time: RxTime) {
        let buf = self.frame_buffers.entry(conn).or_default();
        buf.ingest(bytes);
        for frame in buf.drain_frames(REQUEST_FRAME_SIZE) {
            self.handle_frame(conn, &frame, rx_time);
        }
    }

    fn handle_frame(&mut self, conn: ConnId, frame: &[u8], rx_time: RxTime) {
        let Some(framed) = OMClientRequest::from_bytes(frame) else {
            warn!(conn, "dropping malformed order-entry frame");
            return;
        };
        let client = framed.body.client;
        let seq = framed.seq_num;

        if !is_valid_client(client) {
            warn!(client, conn, "dropping request from out-of-range client id");
            return;
        }

        let state = &mut self.clients[client as usize];
        match state.conn {
            None => state.conn = Some(conn),
            Some(bound) if bound != conn => {
                warn!(client, conn, bound_conn = bound, "rejecting request on an unbound socket for this client");
                return;
            }
            _ => {}
        }

        if seq != state.expected_inbound_seq {
            warn!(
                client,
                expected = state.expected_inbound_seq,
                got = seq,
                "rejecting out-of-sequence order-entry frame"
            );
            return;
        }
        state.expected_inbound_seq += 1;

        self.sequencer.add(rx_time, framed.body);
    }

    /// Called exactly once after a polling pass has drained every
    /// socket (§4.5): releases this cycle's requests into the matching
    /// engine's queue in ascending receive-time order.
    pub fn end_of_cycle(&mut self, matching_queue: &SpscRingBuffer<MEClientRequest>) {
        self.sequencer.flush(|request| matching_queue.push(request));
    }

    /// Stage one matching-engine response for framing on its client's
    /// connection. A process running the matching engine and order
    /// server in the same busy-poll loop calls this once per response
    /// popped off `MatchingEngine::client_responses` before calling
    /// `drain_responses` (§4.6).
    pub fn enqueue_response(&self, response: MEClientResponse) {
        self.client_responses.push(response);
    }

    /// §4.6 "Outbound path": drain the matching engine's response queue
    /// and hand each framed `{seq, response}` byte buffer to `send`
    /// along with the connection it belongs on. Responses for a client
    /// whose socket was never learned (no inbound message yet) are
    /// dropped — the matching engine should never produce one before
    /// that client has sent a request.
    pub fn drain_responses(&mut self, mut send: impl FnMut(ConnId, &[u8])) {
        while let Some(response) = self.client_responses.pop() {
            let client = response.client;
            if !is_valid_client(client) {
                warn!(client, "dropping response for out-of-range client id");
                continue;
            }
            let state = &mut self.clients[client as usize];
            let Some(conn) = state.conn else {
                warn!(client, "dropping response for a client with no bound socket");
                continue;
            };
            let seq = state.next_outbound_seq;
            state.next_outbound_seq += 1;
            let framed = OMClientResponse::new(seq, response);
            send(conn, framed.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Qty, Side};
    use crate::wire::ClientResponseType;

    fn request_bytes(client: ClientId, seq: u64, client_order_id: u64) -> Vec<u8> {
        let body = MEClientRequest::new_order(client, 0, client_order_id, Side::Buy, Price::new(100), Qty::new(10));
        OMClientRequest::new(seq, body).as_bytes().to_vec()
    }

    fn server() -> OrderServer {
        OrderServer::new(SpscRingBuffer::new(64), 64)
    }

    #[test]
    fn well_formed_frame_reaches_the_matching_queue_after_end_of_cycle() {
        let mut srv = server();
        srv.on_recv(7, &request_bytes(1, 1, 100), 10);
        let matching_queue = SpscRingBuffer::new(8);
        srv.end_of_cycle(&matching_queue);

        assert_eq!(matching_queue.size(), 1);
        let popped = matching_queue.pop().unwrap();
        assert_eq!(popped.client, 1);
    }

    #[test]
    fn out_of_sequence_frame_is_dropped() {
        let mut srv = server();
        srv.on_recv(7, &request_bytes(1, 2, 100), 10);
        let matching_queue = SpscRingBuffer::new(8);
        srv.end_of_cycle(&matching_queue);
        assert_eq!(matching_queue.size(), 0);
    }

    #[test]
    fn second_connection_for_a_bound_client_is_rejected() {
        let mut srv = server();
        srv.on_recv(7, &request_bytes(1, 1, 100), 10);
        srv.on_recv(8, &request_bytes(1, 2, 101), 11);

        let matching_queue = SpscRingBuffer::new(8);
        srv.end_of_cycle(&matching_queue);
        assert_eq!(matching_queue.size(), 1);
    }

    #[test]
    fn fifo_sequencer_reorders_within_one_cycle() {
        let mut srv = server();
        srv.on_recv(1, &request_bytes(1, 1, 1), 101);
        srv.on_recv(2, &request_bytes(2, 1, 2), 99);
        srv.on_recv(3, &request_bytes(3, 1, 3), 100);

        let matching_queue = SpscRingBuffer::new(8);
        srv.end_of_cycle(&matching_queue);

        let order: Vec<_> = std::iter::from_fn(|| matching_queue.pop())
            .map(|r| r.client_order_id)
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn partial_frame_is_assembled_across_two_recv_calls() {
        let mut srv = server();
        let bytes = request_bytes(1, 1, 5);
        let (head, tail) = bytes.split_at(5);
        srv.on_recv(1, head, 10);
        let matching_queue = SpscRingBuffer::new(8);
        srv.end_of_cycle(&matching_queue);
        assert_eq!(matching_queue.size(), 0);

        srv.on_recv(1, tail, 10);
        srv.end_of_cycle(&matching_queue);
        assert_eq!(matching_queue.size(), 1);
    }

    #[test]
    fn response_is_framed_with_the_clients_bound_connection_and_outbound_seq() {
        let client_responses = SpscRingBuffer::new(8);
        client_responses.push(MEClientResponse::new(
            ClientResponseType::Accepted,
            1,
            0,
            100,
            1,
            Side::Buy,
            Price::new(100),
            Qty::new(0),
            Qty::new(10),
        ));
        let mut srv = OrderServer::new(client_responses, 8);
        srv.on_recv(42, &request_bytes(1, 1, 100), 10);

        let mut sent = Vec::new();
        srv.drain_responses(|conn, bytes| sent.push((conn, bytes.to_vec())));

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        let framed = OMClientResponse::from_bytes(&sent[0].1).unwrap();
        let seq = framed.seq_num;
        assert_eq!(seq, 1);
    }
}
