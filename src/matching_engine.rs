// nexus_core/src/matching_engine.rs
//
// §4.4 matching engine: owns one `OrderBook` per ticker and is the sole
// writer into the client-response and market-update ring buffers. Reads
// `MEClientRequest`s already in FIFO-sequenced order (the sequencer has
// already run) and routes each to the book named by its ticker.

use tracing::{error, warn};

use crate::book::{MatchingEventSink, OrderBook};
use crate::ring_buffer::SpscRingBuffer;
use crate::types::{is_valid_client, is_valid_ticker, MAX_TICKERS};
use crate::wire::{ClientRequestType, MEClientRequest, MEClientResponse, MEMarketUpdate};

/// Forwards responses and updates straight into the two outbound ring
/// buffers. A thin adapter so `OrderBook` stays ignorant of ring-buffer
/// types — its `MatchingEventSink` trait only knows about wire structs.
struct RingBufferSink<'a> {
    client_responses: &'a SpscRingBuffer<MEClientResponse>,
    market_updates: &'a SpscRingBuffer<MEMarketUpdate>,
}

impl MatchingEventSink for RingBufferSink<'_> {
    fn send_client_response(&mut self, response: MEClientResponse) {
        self.client_responses.push(response);
    }

    fn send_market_update(&mut self, update: MEMarketUpdate) {
        self.market_updates.push(update);
    }
}

/// One `OrderBook` per ticker (§5 "fixed, pre-sized per-instrument
/// state"), driven by a single thread reading off `client_requests`.
pub struct MatchingEngine {
    books: Vec<Option<OrderBook>>,
    client_requests: SpscRingBuffer<MEClientRequest>,
    client_responses: SpscRingBuffer<MEClientResponse>,
    market_updates: SpscRingBuffer<MEMarketUpdate>,
}

impl MatchingEngine {
    pub fn new(
        client_requests: SpscRingBuffer<MEClientRequest>,
        client_responses: SpscRingBuffer<MEClientResponse>,
        market_updates: SpscRingBuffer<MEMarketUpdate>,
    ) -> Self {
        let books = (0..MAX_TICKERS).map(|t| Some(OrderBook::new(t as u32))).collect();
        Self {
            books,
            client_requests,
            client_responses,
            market_updates,
        }
    }

    /// The queue this engine polls its input from. Exposed so a process
    /// wiring this engine up to an `OrderServer` running the same
    /// busy-poll loop can hand the order server's `end_of_cycle` a
    /// reference into the very queue this engine drains (§4.5, §4.6) —
    /// both sides need the same physical instance, and this engine owns it.
    pub fn client_requests(&self) -> &SpscRingBuffer<MEClientRequest> {
        &self.client_requests
    }

    /// The queue this engine's responses land on, for forwarding to
    /// whatever owns the per-client outbound framing (§4.6).
    pub fn client_responses(&self) -> &SpscRingBuffer<MEClientResponse> {
        &self.client_responses
    }

    /// The queue this engine's market updates land on, for forwarding
    /// to the market-data publisher (§4.7).
    pub fn market_updates(&self) -> &SpscRingBuffer<MEMarketUpdate> {
        &self.market_updates
    }

    /// Process every request currently sitting in `client_requests`.
    /// Called once per busy-poll iteration of the exchange main loop.
    pub fn drain(&mut self) {
        while let Some(request) = self.client_requests.pop() {
            self.process(request);
        }
    }

    fn process(&mut self, request: MEClientRequest) {
        let client = request.client;
        let ticker = request.ticker;
        let client_order_id = request.client_order_id;

        if !is_valid_client(client) {
            warn!(client, "dropping request from out-of-range client id");
            return;
        }
        if !is_valid_ticker(ticker) {
            warn!(ticker, "dropping request for out-of-range ticker id");
            return;
        }

        let Some(book) = self.books[ticker as usize].as_mut() else {
            error!(ticker, "order book missing for a valid ticker id");
            return;
        };
        let mut sink = RingBufferSink {
            client_responses: &self.client_responses,
            market_updates: &self.market_updates,
        };

        match request.request_type() {
            Some(ClientRequestType::New) => {
                book.add(&mut sink, client, client_order_id, request.side(), request.price(), request.qty());
            }
            Some(ClientRequestType::Cancel) => {
                book.cancel(&mut sink, client, client_order_id);
            }
            Some(ClientRequestType::Invalid) | None => {
                error!(client, client_order_id, "matching queue carried a request with an invalid type byte");
                panic!("invalid request type reached the matching engine: ingress validation should never let this through");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Qty, Side};

    fn engine() -> MatchingEngine {
        MatchingEngine::new(SpscRingBuffer::new(64), SpscRingBuffer::new(64), SpscRingBuffer::new(64))
    }

    #[test]
    fn new_order_produces_an_accepted_response_and_an_add_update() {
        let mut eng = engine();
        eng.client_requests.push(MEClientRequest::new_order(1, 0, 1, Side::Buy, Price::new(100), Qty::new(10)));
        eng.drain();

        assert_eq!(eng.client_responses.size(), 1);
        assert_eq!(eng.market_updates.size(), 1);
    }

    #[test]
    fn out_of_range_ticker_is_dropped_without_touching_any_book() {
        let mut eng = engine();
        eng.client_requests.push(MEClientRequest::new_order(1, 99, 1, Side::Buy, Price::new(100), Qty::new(10)));
        eng.drain();

        assert_eq!(eng.client_responses.size(), 0);
        assert_eq!(eng.market_updates.size(), 0);
    }

    #[test]
    #[should_panic(expected = "invalid request type")]
    fn a_request_with_an_invalid_type_byte_reaching_the_queue_is_fatal() {
        let mut eng = engine();
        let mut request = MEClientRequest::new_order(1, 0, 1, Side::Buy, Price::new(100), Qty::new(10));
        request.r#type = 0;
        eng.client_requests.push(request);
        eng.drain();
    }

    #[test]
    fn cancel_of_unknown_order_yields_a_single_rejection() {
        let mut eng = engine();
        eng.client_requests.push(MEClientRequest::cancel(1, 0, 42));
        eng.drain();

        assert_eq!(eng.client_responses.size(), 1);
        assert_eq!(eng.market_updates.size(), 0);
    }
}
