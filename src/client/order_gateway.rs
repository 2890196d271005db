// nexus_core/src/client/order_gateway.rs
//
// §4.10 client order gateway: the single TCP connection a trading
// client keeps open to the exchange. Outbound: frame every request the
// strategy emits with this client's own monotone sequence number.
// Inbound: parse fixed-size response frames, validate they're actually
// addressed to this client, and forward them to the strategy.
//
// §13 open-question decision #1: unlike the order server's ingress
// validation (§4.6, log-and-discard), a sequence gap on *this* stream
// is treated as fatal. TCP is presumed reliable and this component has
// no resynchronization protocol to fall back on — a gap here means the
// exchange and this client have desynced in a way silently skipping a
// fill notification would make worse, not better.

use tracing::warn;

use crate::net::framing::PartialFrameBuffer;
use crate::ring_buffer::SpscRingBuffer;
use crate::types::{ClientId, SeqNum};
use crate::wire::messages::WireMessage;
use crate::wire::{MEClientRequest, MEClientResponse, OMClientRequest, OMClientResponse};

const RESPONSE_FRAME_SIZE: usize = std::mem::size_of::<OMClientResponse>();

pub struct OrderGateway {
    client_id: ClientId,
    next_outbound_seq: SeqNum,
    next_expected_inbound_seq: SeqNum,
    frame_buffer: PartialFrameBuffer,
    strategy_requests: SpscRingBuffer<MEClientRequest>,
    strategy_responses: SpscRingBuffer<MEClientResponse>,
}

impl OrderGateway {
    pub fn new(
        client_id: ClientId,
        strategy_requests: SpscRingBuffer<MEClientRequest>,
        strategy_responses_capacity: usize,
    ) -> Self {
        Self {
            client_id,
            next_outbound_seq: 1,
            next_expected_inbound_seq: 1,
            frame_buffer: PartialFrameBuffer::new(),
            strategy_requests,
            strategy_responses: SpscRingBuffer::new(strategy_responses_capacity),
        }
    }

    /// Stage one request the strategy wants sent this cycle. A process
    /// running the strategy and order gateway in the same busy-poll
    /// loop calls this once per request returned from `Strategy::poll`
    /// before calling `drain_outbound`.
    pub fn enqueue_request(&self, request: MEClientRequest) {
        self.strategy_requests.push(request);
    }

    /// §4.10 "Outbound": drain the strategy's request queue, framing
    /// each as `{next_outbound_seq, request}`, and hand the raw bytes
    /// to `send` for writing to the TCP socket.
    pub fn drain_outbound(&mut self, mut send: impl FnMut(&[u8])) {
        while let Some(request) = self.strategy_requests.pop() {
            let seq = self.next_outbound_seq;
            self.next_outbound_seq += 1;
            let framed = OMClientRequest::new(seq, request);
            send(framed.as_bytes());
        }
    }

    /// §4.10 "Inbound": feed freshly-read bytes from the exchange
    /// connection. Complete response frames are validated and, if
    /// valid, forwarded onto `strategy_responses()`.
    pub fn on_recv(&mut self, bytes: &[u8]) {
        self.frame_buffer.ingest(bytes);
        let frames = self.frame_buffer.drain_frames(RESPONSE_FRAME_SIZE);
        for frame in frames {
            self.handle_frame(&frame);
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        let Some(framed) = OMClientResponse::from_bytes(frame) else {
            warn!("dropping malformed order-entry response frame");
            return;
        };

        let client = framed.body.client;
        if client != self.client_id {
            warn!(client, expected = self.client_id, "dropping response addressed to a different client");
            return;
        }

        let seq = framed.seq_num;
        assert_eq!(
            seq, self.next_expected_inbound_seq,
            "order-entry response stream desynced: expected seq {}, got {}",
            self.next_expected_inbound_seq, seq
        );
        self.next_expected_inbound_seq += 1;

        self.strategy_responses.push(framed.body);
    }

    pub fn strategy_responses(&self) -> &SpscRingBuffer<MEClientResponse> {
        &self.strategy_responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Qty, Side};
    use crate::wire::ClientResponseType;

    fn response_bytes(client: ClientId, seq: SeqNum, client_order_id: u64) -> Vec<u8> {
        let body = MEClientResponse::new(
            ClientResponseType::Accepted,
            client,
            0,
            client_order_id,
            1,
            Side::Buy,
            Price::new(100),
            Qty::new(0),
            Qty::new(10),
        );
        OMClientResponse::new(seq, body).as_bytes().to_vec()
    }

    #[test]
    fn outbound_requests_are_framed_with_increasing_sequence_numbers() {
        let strategy_requests = SpscRingBuffer::new(8);
        strategy_requests.push(MEClientRequest::new_order(1, 0, 100, Side::Buy, Price::new(100), Qty::new(10)));
        strategy_requests.push(MEClientRequest::new_order(1, 0, 101, Side::Sell, Price::new(101), Qty::new(5)));
        let mut gw = OrderGateway::new(1, strategy_requests, 8);

        let mut sent = Vec::new();
        gw.drain_outbound(|bytes| sent.push(bytes.to_vec()));

        assert_eq!(sent.len(), 2);
        let first = OMClientRequest::from_bytes(&sent[0]).unwrap();
        let second = OMClientRequest::from_bytes(&sent[1]).unwrap();
        assert_eq!(first.seq_num, 1);
        assert_eq!(second.seq_num, 2);
    }

    #[test]
    fn well_sequenced_response_is_forwarded_to_the_strategy() {
        let mut gw = OrderGateway::new(1, SpscRingBuffer::new(8), 8);
        gw.on_recv(&response_bytes(1, 1, 100));

        assert_eq!(gw.strategy_responses().size(), 1);
        let resp = gw.strategy_responses().pop().unwrap();
        assert_eq!(resp.client_order_id, 100);
    }

    #[test]
    fn response_addressed_to_another_client_is_dropped_not_fatal() {
        let mut gw = OrderGateway::new(1, SpscRingBuffer::new(8), 8);
        gw.on_recv(&response_bytes(2, 1, 100));
        assert_eq!(gw.strategy_responses().size(), 0);
    }

    #[test]
    #[should_panic(expected = "desynced")]
    fn a_sequence_gap_on_the_response_stream_is_fatal() {
        let mut gw = OrderGateway::new(1, SpscRingBuffer::new(8), 8);
        gw.on_recv(&response_bytes(1, 2, 100));
    }

    #[test]
    fn a_response_frame_split_across_two_recv_calls_is_assembled() {
        let mut gw = OrderGateway::new(1, SpscRingBuffer::new(8), 8);
        let bytes = response_bytes(1, 1, 100);
        let (head, tail) = bytes.split_at(10);
        gw.on_recv(head);
        assert_eq!(gw.strategy_responses().size(), 0);
        gw.on_recv(tail);
        assert_eq!(gw.strategy_responses().size(), 1);
    }
}
