// nexus_core/src/exchange/market_data_publisher.rs
//
// §4.7 market-data publisher: the sole writer of the incremental
// multicast stream's sequence numbers. Reads `MEMarketUpdate`s off the
// matching engine's outbound queue, stamps each with the process-wide
// monotone `next_inc_seq`, hands it to the incremental transport, and
// mirrors the same sequenced record onto the snapshot synthesizer's
// input queue (§4.8) so both downstream consumers see an identical,
// gap-free view of the incremental stream.

use crate::ring_buffer::SpscRingBuffer;
use crate::types::SeqNum;
use crate::wire::{MDPMarketUpdate, MEMarketUpdate};

/// Where stamped incremental updates go out. The exchange binary
/// implements this over `net::multicast::McastSocket`; tests implement
/// it over a `Vec` to assert on sequencing and content.
pub trait IncrementalSink {
    fn publish(&mut self, msg: MDPMarketUpdate);
}

/// §4.7: owns the process-wide incremental sequence counter and the
/// queue that feeds the snapshot synthesizer. One instance per exchange
/// process.
pub struct MarketDataPublisher {
    market_updates: SpscRingBuffer<MEMarketUpdate>,
    snapshot_queue: SpscRingBuffer<MDPMarketUpdate>,
    next_inc_seq: SeqNum,
}

impl MarketDataPublisher {
    pub fn new(market_updates: SpscRingBuffer<MEMarketUpdate>, snapshot_queue_capacity: usize) -> Self {
        Self {
            market_updates,
            snapshot_queue: SpscRingBuffer::new(snapshot_queue_capacity),
            next_inc_seq: 1,
        }
    }

    /// Stage one matching-engine market update for publication. A
    /// process running the matching engine and publisher in the same
    /// busy-poll loop calls this once per update popped off
    /// `MatchingEngine::market_updates` before calling `drain`.
    pub fn enqueue_market_update(&self, update: MEMarketUpdate) {
        self.market_updates.push(update);
    }

    /// Publish every update currently sitting in the matching engine's
    /// outbound queue. Called once per busy-poll iteration of the
    /// publisher thread.
    pub fn drain(&mut self, sink: &mut impl IncrementalSink) {
        while let Some(body) = self.market_updates.pop() {
            let msg = MDPMarketUpdate::new(self.next_inc_seq, body);
            sink.publish(msg);
            self.snapshot_queue.push(msg);
            self.next_inc_seq += 1;
        }
    }

    /// The queue the snapshot synthesizer thread drains from (§4.8).
    pub fn snapshot_queue(&self) -> &SpscRingBuffer<MDPMarketUpdate> {
        &self.snapshot_queue
    }

    pub fn next_inc_seq(&self) -> SeqNum {
        self.next_inc_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Qty, Side};
    use crate::wire::MarketUpdateType;

    #[derive(Default)]
    struct RecordingSink {
        published: Vec<MDPMarketUpdate>,
    }

    impl IncrementalSink for RecordingSink {
        fn publish(&mut self, msg: MDPMarketUpdate) {
            self.published.push(msg);
        }
    }

    fn update(order_id: u64) -> MEMarketUpdate {
        MEMarketUpdate::new(MarketUpdateType::Add, order_id, 0, Side::Buy, Price::new(100), Qty::new(10), 1)
    }

    #[test]
    fn drain_stamps_sequence_numbers_starting_at_one() {
        let queue = SpscRingBuffer::new(8);
        queue.push(update(1));
        queue.push(update(2));
        let mut publisher = MarketDataPublisher::new(queue, 8);
        let mut sink = RecordingSink::default();

        publisher.drain(&mut sink);

        let seqs: Vec<SeqNum> = sink.published.iter().map(|m| m.seq_num()).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(publisher.next_inc_seq(), 3);
    }

    #[test]
    fn every_published_update_is_mirrored_onto_the_snapshot_queue() {
        let queue = SpscRingBuffer::new(8);
        queue.push(update(1));
        let mut publisher = MarketDataPublisher::new(queue, 8);
        let mut sink = RecordingSink::default();

        publisher.drain(&mut sink);

        assert_eq!(publisher.snapshot_queue().size(), 1);
        let mirrored = publisher.snapshot_queue().pop().unwrap();
        assert_eq!(mirrored.seq_num(), sink.published[0].seq_num());
    }
}
