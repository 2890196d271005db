// nexus_core/src/sequencer.rs
//
// §4.5 FIFO sequencer: the order gateway hands every inbound client
// request to this structure tagged with its receive timestamp, rather
// than pushing straight to the matching engine. Several TCP connections
// are read by the gateway in round-robin order within one poll cycle,
// so without a sequencer, request order within a cycle would depend on
// connection iteration order rather than arrival time. `flush` restores
// arrival-time order before anything reaches the matching engine.

use crate::wire::MEClientRequest;

/// Nanosecond (or any monotone) receive timestamp, paired with the
/// request it was stamped on.
pub type RxTime = u64;

#[derive(Clone, Copy)]
struct PendingRequest {
    rx_time: RxTime,
    request: MEClientRequest,
}

/// Buffers one poll cycle's worth of inbound requests and releases them
/// in receive-time order. Bounded by `capacity`; exceeding it inside a
/// single cycle is a caller bug (the gateway is expected to flush at
/// least once per poll iteration, §4.5 "Failure semantics").
pub struct FifoSequencer {
    pending: Vec<PendingRequest>,
    capacity: usize,
}

impl FifoSequencer {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Stage a request received at `rx_time`. Does not publish it yet.
    pub fn add(&mut self, rx_time: RxTime, request: MEClientRequest) {
        assert!(
            self.pending.len() < self.capacity,
            "fifo sequencer overrun: more than {} requests staged in one cycle",
            self.capacity
        );
        self.pending.push(PendingRequest { rx_time, request });
    }

    /// Sort the staged requests by receive time (stable: ties keep
    /// their arrival order, §13 open-question decision) and push them
    /// onto `out` in that order, then clear the staging buffer.
    pub fn flush(&mut self, mut publish: impl FnMut(MEClientRequest)) {
        self.pending.sort_by_key(|p| p.rx_time);
        for pending in self.pending.drain(..) {
            publish(pending.request);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Qty, Side};

    fn req(client_order_id: u64) -> MEClientRequest {
        MEClientRequest::new_order(1, 0, client_order_id, Side::Buy, Price::new(100), Qty::new(1))
    }

    #[test]
    fn flush_publishes_in_receive_time_order_regardless_of_staging_order() {
        let mut seq = FifoSequencer::new(8);
        seq.add(30, req(3));
        seq.add(10, req(1));
        seq.add(20, req(2));

        let mut order = Vec::new();
        seq.flush(|r| order.push(r.client_order_id));

        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(seq.pending_len(), 0);
    }

    #[test]
    fn ties_preserve_staging_order() {
        let mut seq = FifoSequencer::new(8);
        seq.add(10, req(1));
        seq.add(10, req(2));

        let mut order = Vec::new();
        seq.flush(|r| order.push(r.client_order_id));

        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    #[should_panic(expected = "overrun")]
    fn exceeding_capacity_in_one_cycle_is_fatal() {
        let mut seq = FifoSequencer::new(1);
        seq.add(1, req(1));
        seq.add(2, req(2));
    }
}
