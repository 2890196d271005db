// nexus_core/src/client/market_data_consumer.rs
//
// §4.9 market-data consumer: the gap-recovery state machine that turns
// two best-effort UDP multicast streams (incremental + snapshot) into a
// gap-free, ordered feed for the strategy. This is the client-side
// mirror of §4.8 — where the exchange's snapshot synthesizer only ever
// sees a gap-free feed (because it reads off the publisher's private
// queue), this component is the one place in the whole system that
// actually has to cope with real packet loss.
//
// Socket I/O is out of scope (§1): callers feed every received
// `MDPMarketUpdate` in as it arrives via `on_incremental`/`on_snapshot`,
// and consult `in_recovery()` to decide whether to join/leave the
// snapshot multicast group (§4.9 "A snapshot socket that is subscribed
// only while in_recovery").

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::types::SeqNum;
use crate::wire::{MDPMarketUpdate, MEMarketUpdate, MarketUpdateType};

pub struct MarketDataConsumer {
    next_expected_inc_seq: SeqNum,
    in_recovery: bool,
    snapshot_queue: BTreeMap<SeqNum, MEMarketUpdate>,
    incremental_queue: BTreeMap<SeqNum, MEMarketUpdate>,
}

impl Default for MarketDataConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataConsumer {
    pub fn new() -> Self {
        Self {
            next_expected_inc_seq: 1,
            in_recovery: false,
            snapshot_queue: BTreeMap::new(),
            incremental_queue: BTreeMap::new(),
        }
    }

    /// Whether the caller should be subscribed to the snapshot
    /// multicast group right now (§4.9).
    pub fn in_recovery(&self) -> bool {
        self.in_recovery
    }

    pub fn next_expected_inc_seq(&self) -> SeqNum {
        self.next_expected_inc_seq
    }

    /// Feed one message received on the incremental stream. Anything
    /// forwardable to the strategy is appended to `out`, in order.
    pub fn on_incremental(&mut self, msg: MDPMarketUpdate, out: &mut Vec<MEMarketUpdate>) {
        if !self.in_recovery {
            if msg.seq_num() == self.next_expected_inc_seq {
                out.push(msg.body);
                self.next_expected_inc_seq += 1;
                return;
            }
            warn!(
                expected = self.next_expected_inc_seq,
                got = msg.seq_num(),
                "incremental sequence gap detected, entering recovery"
            );
            info!("market data recovery entered");
            self.enter_recovery();
        }
        self.incremental_queue.insert(msg.seq_num(), msg.body);
        self.reconcile(out);
    }

    /// Feed one message received on the snapshot stream. Only
    /// meaningful while `in_recovery()`; callers should not be
    /// subscribed to the snapshot group otherwise.
    pub fn on_snapshot(&mut self, msg: MDPMarketUpdate, out: &mut Vec<MEMarketUpdate>) {
        debug_assert!(self.in_recovery, "snapshot message received while not in recovery");
        if self.snapshot_queue.contains_key(&msg.seq_num()) {
            warn!(seq = msg.seq_num(), "duplicated snapshot sequence number, discarding snapshot buffer");
            self.snapshot_queue.clear();
            return;
        }
        self.snapshot_queue.insert(msg.seq_num(), msg.body);
        self.reconcile(out);
    }

    fn enter_recovery(&mut self) {
        self.in_recovery = true;
        self.snapshot_queue.clear();
        self.incremental_queue.clear();
    }

    /// §4.9 "Recovery operation", steps 1-9. Attempts to combine a
    /// complete, contiguous snapshot with a contiguous incremental tail
    /// into a gap-free replay, forwarded to `out` in order. Leaves
    /// `self` still `in_recovery` (buffering) on any abort.
    fn reconcile(&mut self, out: &mut Vec<MEMarketUpdate>) {
        if !self.in_recovery {
            return;
        }

        let Some(first) = self.snapshot_queue.values().next() else {
            return;
        };
        if first.update_type() != Some(MarketUpdateType::SnapshotStart) {
            return;
        }

        let mut prev_seq: Option<SeqNum> = None;
        for &seq in self.snapshot_queue.keys() {
            if let Some(p) = prev_seq {
                if seq != p + 1 {
                    warn!("gap inside buffered snapshot, discarding and waiting for the next one");
                    self.snapshot_queue.clear();
                    return;
                }
            }
            prev_seq = Some(seq);
        }

        let last = self.snapshot_queue.values().next_back().unwrap();
        if last.update_type() != Some(MarketUpdateType::SnapshotEnd) {
            return;
        }
        let sync_point = last.order_id;

        let body_len = self.snapshot_queue.len().saturating_sub(2);
        let replay_prefix: Vec<MEMarketUpdate> =
            self.snapshot_queue.values().skip(1).take(body_len).copied().collect();

        let mut replay_tail = Vec::new();
        let mut expected = sync_point + 1;
        for (&seq, body) in self.incremental_queue.iter() {
            if seq <= sync_point {
                continue;
            }
            if seq != expected {
                warn!(expected, got = seq, "gap in buffered incrementals past the sync point, waiting for the next snapshot");
                self.snapshot_queue.clear();
                return;
            }
            replay_tail.push(*body);
            expected += 1;
        }

        out.extend(replay_prefix);
        out.extend(replay_tail);

        self.next_expected_inc_seq = expected;
        self.snapshot_queue.clear();
        self.incremental_queue.clear();
        self.in_recovery = false;
        info!(next_expected = self.next_expected_inc_seq, "market data recovery complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Qty, Side};

    fn add(ticker: u32, mid: u64, side: Side, price: i64, qty: u32, priority: u64) -> MEMarketUpdate {
        MEMarketUpdate::new(MarketUpdateType::Add, mid, ticker, side, Price::new(price), Qty::new(qty), priority)
    }

    fn sentinel(t: MarketUpdateType, sync_point: u64) -> MEMarketUpdate {
        MEMarketUpdate::new(t, sync_point, u32::MAX, Side::Invalid, Price::default(), Qty::new(0), 0)
    }

    #[test]
    fn normal_operation_forwards_in_sequence_messages_directly() {
        let mut c = MarketDataConsumer::new();
        let mut out = Vec::new();
        c.on_incremental(MDPMarketUpdate::new(1, add(0, 1, Side::Buy, 100, 10, 1)), &mut out);
        c.on_incremental(MDPMarketUpdate::new(2, add(0, 2, Side::Buy, 101, 5, 2)), &mut out);

        assert_eq!(out.len(), 2);
        assert!(!c.in_recovery());
        assert_eq!(c.next_expected_inc_seq(), 3);
    }

    #[test]
    fn gap_triggers_recovery_and_clean_snapshot_then_contiguous_tail_reconciles() {
        let mut c = MarketDataConsumer::new();
        let mut out = Vec::new();

        c.on_incremental(MDPMarketUpdate::new(1, add(0, 1, Side::Buy, 100, 10, 1)), &mut out);
        c.on_incremental(MDPMarketUpdate::new(2, add(0, 2, Side::Buy, 100, 10, 2)), &mut out);
        out.clear();

        // seq 5 arrives: gap (expected 3)
        c.on_incremental(MDPMarketUpdate::new(5, add(0, 5, Side::Buy, 100, 10, 5)), &mut out);
        assert!(c.in_recovery());
        assert!(out.is_empty());

        // buffer incrementals 6, 7 while waiting on the snapshot
        c.on_incremental(MDPMarketUpdate::new(6, add(0, 6, Side::Buy, 100, 10, 6)), &mut out);
        c.on_incremental(MDPMarketUpdate::new(7, add(0, 7, Side::Buy, 100, 10, 7)), &mut out);
        assert!(out.is_empty());

        // snapshot with sync_point = 6, body = [one ADD]
        c.on_snapshot(MDPMarketUpdate::new(0, sentinel(MarketUpdateType::SnapshotStart, 6)), &mut out);
        c.on_snapshot(MDPMarketUpdate::new(1, add(0, 1, Side::Buy, 100, 10, 1)), &mut out);
        c.on_snapshot(MDPMarketUpdate::new(2, sentinel(MarketUpdateType::SnapshotEnd, 6)), &mut out);

        assert!(!c.in_recovery());
        // snapshot body (1 ADD) followed by incrementals 7 (5 and 6 <= sync_point are dropped)
        assert_eq!(out.len(), 2);
        let forwarded_ids: Vec<u64> = out.iter().map(|u| u.order_id).collect();
        assert_eq!(forwarded_ids, vec![1, 7]);
        assert_eq!(c.next_expected_inc_seq(), 8);
    }

    #[test]
    fn gap_in_incrementals_past_sync_point_aborts_reconcile_and_stays_in_recovery() {
        let mut c = MarketDataConsumer::new();
        let mut out = Vec::new();

        c.on_incremental(MDPMarketUpdate::new(1, add(0, 1, Side::Buy, 100, 10, 1)), &mut out);
        out.clear();
        // gap: expected 2, got 4 -> jumps from 4 straight to 7 later
        c.on_incremental(MDPMarketUpdate::new(4, add(0, 4, Side::Buy, 100, 10, 4)), &mut out);
        c.on_incremental(MDPMarketUpdate::new(7, add(0, 7, Side::Buy, 100, 10, 7)), &mut out);

        // snapshot sync_point = 3, but incrementals buffered are 4 and 7: gap between 4 and 7
        c.on_snapshot(MDPMarketUpdate::new(0, sentinel(MarketUpdateType::SnapshotStart, 3)), &mut out);
        c.on_snapshot(MDPMarketUpdate::new(1, sentinel(MarketUpdateType::SnapshotEnd, 3)), &mut out);

        assert!(c.in_recovery());
        assert!(out.is_empty());
    }

    #[test]
    fn internal_gap_in_snapshot_sequence_discards_the_snapshot_buffer() {
        let mut c = MarketDataConsumer::new();
        let mut out = Vec::new();
        c.on_incremental(MDPMarketUpdate::new(1, add(0, 1, Side::Buy, 100, 10, 1)), &mut out);
        out.clear();
        c.on_incremental(MDPMarketUpdate::new(3, add(0, 3, Side::Buy, 100, 10, 3)), &mut out);

        c.on_snapshot(MDPMarketUpdate::new(0, sentinel(MarketUpdateType::SnapshotStart, 2)), &mut out);
        // gap at snapshot seq 1 -> jumps to seq 2 (missing 1)
        c.on_snapshot(MDPMarketUpdate::new(2, sentinel(MarketUpdateType::SnapshotEnd, 2)), &mut out);

        assert!(c.in_recovery());
        assert!(out.is_empty());
    }

    #[test]
    fn duplicate_snapshot_sequence_clears_the_snapshot_buffer() {
        let mut c = MarketDataConsumer::new();
        let mut out = Vec::new();
        c.on_incremental(MDPMarketUpdate::new(1, add(0, 1, Side::Buy, 100, 10, 1)), &mut out);
        out.clear();
        c.on_incremental(MDPMarketUpdate::new(3, add(0, 3, Side::Buy, 100, 10, 3)), &mut out);

        c.on_snapshot(MDPMarketUpdate::new(0, sentinel(MarketUpdateType::SnapshotStart, 2)), &mut out);
        c.on_snapshot(MDPMarketUpdate::new(0, sentinel(MarketUpdateType::SnapshotStart, 2)), &mut out);
        assert!(c.in_recovery());
        assert!(out.is_empty());
    }
}
