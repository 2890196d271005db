// nexus_core/src/exchange/snapshot_synthesizer.rs
//
// §4.8 snapshot synthesizer: maintains a full replica of every live
// order in every book by replaying the incremental stream, and
// periodically emits a complete, self-contained snapshot bracketed by
// SNAPSHOT_START/SNAPSHOT_END sentinels carrying the sync point (§9
// "sync-point encoding" — reused `order_id` field).
//
// Driven from `MarketDataPublisher`'s snapshot queue (§4.7): every
// record this component sees already carries the publisher's own
// `seq_num`, so gaps here are a logic bug in this process, not a
// network event — hence the `assert_eq!` in `apply` rather than any
// gap-recovery machinery (that machinery lives client-side, §4.9).

use std::collections::HashMap;

use crate::mem_pool::{MemPool, PoolIndex, POOL_INDEX_INVALID};
use crate::types::{
    OrderId, Price, Priority, Qty, SeqNum, Side, TickerId, MAX_ORDERS, MAX_TICKERS,
    ORDER_ID_INVALID, PRIORITY_INVALID, TICKER_ID_INVALID,
};
use crate::wire::{MDPMarketUpdate, MEMarketUpdate, MarketUpdateType};

#[derive(Clone, Copy)]
struct ReplicaOrder {
    ticker: TickerId,
    market_order_id: OrderId,
    side: Side,
    price: Price,
    qty: Qty,
    priority: Priority,
}

impl Default for ReplicaOrder {
    fn default() -> Self {
        Self {
            ticker: TICKER_ID_INVALID,
            market_order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: Price::default(),
            qty: Qty::default(),
            priority: PRIORITY_INVALID,
        }
    }
}

/// One ticker's full-book replica: a pool of resting orders plus a
/// dense `market_order_id -> PoolIndex` map (§4.8 "State").
struct TickerReplica {
    pool: MemPool<ReplicaOrder>,
    index: HashMap<OrderId, PoolIndex>,
}

impl TickerReplica {
    fn new(order_capacity: usize) -> Self {
        Self {
            pool: MemPool::new(order_capacity),
            index: HashMap::new(),
        }
    }
}

pub struct SnapshotSynthesizer {
    replicas: Vec<TickerReplica>,
    last_inc_seq: SeqNum,
    last_publish_ns: u64,
    publish_interval_ns: u64,
}

impl SnapshotSynthesizer {
    pub fn new(publish_interval_ns: u64) -> Self {
        Self::with_capacity(MAX_TICKERS, MAX_ORDERS, publish_interval_ns)
    }

    pub fn with_capacity(tickers: usize, order_capacity: usize, publish_interval_ns: u64) -> Self {
        Self {
            replicas: (0..tickers).map(|_| TickerReplica::new(order_capacity)).collect(),
            last_inc_seq: 0,
            last_publish_ns: 0,
            publish_interval_ns,
        }
    }

    pub fn last_inc_seq(&self) -> SeqNum {
        self.last_inc_seq
    }

    /// Apply one sequenced incremental (§4.8 "Incremental application").
    /// The incoming stream is gap-free by construction (it is read off
    /// the publisher's own outbound queue), so any gap here is fatal.
    pub fn apply(&mut self, msg: MDPMarketUpdate) {
        assert_eq!(
            msg.seq_num(),
            self.last_inc_seq + 1,
            "snapshot synthesizer observed a gap in its own incremental feed"
        );

        let body = msg.body;
        let ticker = body.ticker as usize;
        match body.update_type() {
            Some(MarketUpdateType::Add) => {
                let replica = &mut self.replicas[ticker];
                assert!(
                    !replica.index.contains_key(&body.order_id),
                    "ADD for an order id already present in the snapshot replica"
                );
                let idx = replica.pool.allocate(ReplicaOrder {
                    ticker: body.ticker,
                    market_order_id: body.order_id,
                    side: body.side(),
                    price: body.price(),
                    qty: body.qty(),
                    priority: body.priority,
                });
                replica.index.insert(body.order_id, idx);
            }
            Some(MarketUpdateType::Modify) => {
                let replica = &mut self.replicas[ticker];
                let idx = *replica
                    .index
                    .get(&body.order_id)
                    .expect("MODIFY for an order id absent from the snapshot replica");
                let order = replica.pool.get_mut(idx);
                assert_eq!(order.side, body.side(), "MODIFY changed an order's side");
                order.qty = body.qty();
                order.price = body.price();
            }
            Some(MarketUpdateType::Cancel) => {
                let replica = &mut self.replicas[ticker];
                let idx = replica
                    .index
                    .remove(&body.order_id)
                    .expect("CANCEL for an order id absent from the snapshot replica");
                replica.pool.deallocate(idx);
            }
            Some(MarketUpdateType::Trade)
            | Some(MarketUpdateType::Clear)
            | Some(MarketUpdateType::SnapshotStart)
            | Some(MarketUpdateType::SnapshotEnd)
            | Some(MarketUpdateType::Invalid)
            | None => {
                // TRADE effects are already reflected via the paired
                // MODIFY/CANCEL (§4.3 "Ordering guarantees"); CLEAR and
                // the snapshot sentinels never appear on the incremental
                // stream this component reads from.
            }
        }

        self.last_inc_seq = msg.seq_num();
    }

    /// If at least `publish_interval_ns` have elapsed since the last
    /// cycle, emit a full snapshot: SNAPSHOT_START, then a CLEAR + one
    /// ADD per live order for every ticker, then SNAPSHOT_END — each
    /// carrying its own 0-indexed per-snapshot sequence number (§4.8
    /// "Publishing cadence"). `now_ns` is supplied by the caller so this
    /// component owns no clock of its own (§11 "kept as a testable,
    /// deterministic unit").
    pub fn maybe_publish(&mut self, now_ns: u64) -> Option<Vec<MDPMarketUpdate>> {
        if now_ns.saturating_sub(self.last_publish_ns) < self.publish_interval_ns {
            return None;
        }
        self.last_publish_ns = now_ns;

        let sync_point = self.last_inc_seq;
        let mut snap_seq: SeqNum = 0;
        let mut out = Vec::new();

        out.push(MDPMarketUpdate::new(snap_seq, sentinel(MarketUpdateType::SnapshotStart, sync_point)));
        snap_seq += 1;

        for (ticker, replica) in self.replicas.iter().enumerate() {
            out.push(MDPMarketUpdate::new(
                snap_seq,
                MEMarketUpdate::new(
                    MarketUpdateType::Clear,
                    ORDER_ID_INVALID,
                    ticker as TickerId,
                    Side::Invalid,
                    Price::default(),
                    Qty::new(0),
                    PRIORITY_INVALID,
                ),
            ));
            snap_seq += 1;

            for order in replica.index.values().map(|&idx| replica.pool.get(idx)) {
                out.push(MDPMarketUpdate::new(
                    snap_seq,
                    MEMarketUpdate::new(
                        MarketUpdateType::Add,
                        order.market_order_id,
                        order.ticker,
                        order.side,
                        order.price,
                        order.qty,
                        order.priority,
                    ),
                ));
                snap_seq += 1;
            }
        }

        out.push(MDPMarketUpdate::new(snap_seq, sentinel(MarketUpdateType::SnapshotEnd, sync_point)));
        Some(out)
    }
}

/// A SNAPSHOT_START/SNAPSHOT_END sentinel: every field except `type`
/// and `order_id` is meaningless (§9 "sync-point encoding").
fn sentinel(update_type: MarketUpdateType, sync_point: SeqNum) -> MEMarketUpdate {
    MEMarketUpdate::new(
        update_type,
        sync_point,
        TICKER_ID_INVALID,
        Side::Invalid,
        Price::default(),
        Qty::new(0),
        PRIORITY_INVALID,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(seq: SeqNum, body: MEMarketUpdate) -> MDPMarketUpdate {
        MDPMarketUpdate::new(seq, body)
    }

    fn add(ticker: TickerId, mid: OrderId, side: Side, price: i64, qty: u32, priority: Priority) -> MEMarketUpdate {
        MEMarketUpdate::new(MarketUpdateType::Add, mid, ticker, side, Price::new(price), Qty::new(qty), priority)
    }

    #[test]
    fn apply_rejects_a_gap_in_its_own_feed() {
        let mut synth = SnapshotSynthesizer::with_capacity(1, 16, 1_000);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut s = synth;
            s.apply(update(2, add(0, 1, Side::Buy, 100, 10, 1)));
        }));
        assert!(result.is_err());
        synth = SnapshotSynthesizer::with_capacity(1, 16, 1_000);
        synth.apply(update(1, add(0, 1, Side::Buy, 100, 10, 1)));
        assert_eq!(synth.last_inc_seq(), 1);
    }

    #[test]
    fn snapshot_reflects_live_orders_after_add_modify_cancel() {
        let mut synth = SnapshotSynthesizer::with_capacity(1, 16, 1_000);
        synth.apply(update(1, add(0, 100, Side::Buy, 150_00, 10, 1)));
        synth.apply(update(2, add(0, 101, Side::Sell, 151_00, 5, 1)));
        synth.apply(update(
            3,
            MEMarketUpdate::new(MarketUpdateType::Modify, 100, 0, Side::Buy, Price::new(150_00), Qty::new(4), 1),
        ));
        synth.apply(update(
            4,
            MEMarketUpdate::new(MarketUpdateType::Cancel, 101, 0, Side::Sell, Price::new(151_00), Qty::new(0), 1),
        ));

        let snap = synth.maybe_publish(1_000).unwrap();
        assert_eq!(snap.first().unwrap().body.update_type(), Some(MarketUpdateType::SnapshotStart));
        assert_eq!(snap.last().unwrap().body.update_type(), Some(MarketUpdateType::SnapshotEnd));

        let adds: Vec<_> = snap
            .iter()
            .filter(|m| m.body.update_type() == Some(MarketUpdateType::Add))
            .collect();
        assert_eq!(adds.len(), 1);
        let order_id = adds[0].body.order_id;
        assert_eq!(order_id, 100);
        assert_eq!(adds[0].body.qty(), Qty::new(4));

        let sync_point = snap.first().unwrap().body.order_id;
        assert_eq!(sync_point, 4);
    }

    #[test]
    fn maybe_publish_respects_the_interval() {
        let mut synth = SnapshotSynthesizer::with_capacity(1, 16, 1_000);
        synth.apply(update(1, add(0, 1, Side::Buy, 100, 10, 1)));
        assert!(synth.maybe_publish(500).is_none());
        assert!(synth.maybe_publish(1_000).is_some());
    }

    #[test]
    fn snapshot_sequence_numbers_are_zero_indexed_and_contiguous() {
        let mut synth = SnapshotSynthesizer::with_capacity(1, 16, 1_000);
        synth.apply(update(1, add(0, 1, Side::Buy, 100, 10, 1)));
        synth.apply(update(2, add(0, 2, Side::Buy, 101, 5, 2)));

        let snap = synth.maybe_publish(1_000).unwrap();
        let seqs: Vec<SeqNum> = snap.iter().map(|m| m.seq_num()).collect();
        assert_eq!(seqs, (0..seqs.len() as u64).collect::<Vec<_>>());
    }
}
