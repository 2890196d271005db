// nexus_core/src/book/mod.rs
//
// §4.3 limit order book: price-time priority matching for a single
// ticker. Orders and price levels live in `MemPool`s so the matching
// thread never touches the allocator after startup; both are linked
// into circular doubly-linked lists addressed by `PoolIndex` rather
// than raw pointers (`Order::{prev,next}` chain the FIFO queue at one
// price level, `PriceLevel::{prev,next}` chain price levels on one
// side sorted by aggressiveness). The price-to-level lookup is the
// direct-indexed `price mod MAX_PRICE_LEVELS` table from §4.3.

use std::collections::HashMap;

use crate::mem_pool::{MemPool, PoolIndex, POOL_INDEX_INVALID};
use crate::types::{
    ClientId, MAX_CLIENTS, MAX_ORDERS, MAX_PRICE_LEVELS, OrderId, Price, Priority, Qty, Side,
    TickerId,
};
use crate::wire::{ClientResponseType, MEClientResponse, MEMarketUpdate, MarketUpdateType};

/// Sink the book publishes client responses and market updates into.
/// The matching engine implements this over its two outbound ring
/// buffers; tests implement it over a `Vec` to assert on emission order.
pub trait MatchingEventSink {
    fn send_client_response(&mut self, response: MEClientResponse);
    fn send_market_update(&mut self, update: MEMarketUpdate);
}

#[derive(Clone, Copy)]
struct Order {
    client: ClientId,
    client_order_id: OrderId,
    market_order_id: OrderId,
    side: Side,
    price: Price,
    qty: Qty,
    priority: Priority,
    prev: PoolIndex,
    next: PoolIndex,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            client: ClientId::MAX,
            client_order_id: OrderId::MAX,
            market_order_id: OrderId::MAX,
            side: Side::Invalid,
            price: Price::default(),
            qty: Qty::default(),
            priority: 0,
            prev: POOL_INDEX_INVALID,
            next: POOL_INDEX_INVALID,
        }
    }
}

#[derive(Clone, Copy)]
struct PriceLevel {
    side: Side,
    price: Price,
    first_order: PoolIndex,
    prev: PoolIndex,
    next: PoolIndex,
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self {
            side: Side::Invalid,
            price: Price::default(),
            first_order: POOL_INDEX_INVALID,
            prev: POOL_INDEX_INVALID,
            next: POOL_INDEX_INVALID,
        }
    }
}

/// The limit order book for one ticker. Holds its own order pool, its
/// own price-level pool, and the direct-indexed price table — nothing
/// here is shared across tickers (§5 "one book per instrument, no
/// cross-ticker state").
pub struct OrderBook {
    ticker: TickerId,
    order_pool: MemPool<Order>,
    level_pool: MemPool<PriceLevel>,
    best_bid: PoolIndex,
    best_ask: PoolIndex,
    price_to_level: Vec<PoolIndex>,
    client_order_map: Vec<HashMap<OrderId, PoolIndex>>,
    next_market_order_id: OrderId,
}

impl OrderBook {
    pub fn new(ticker: TickerId) -> Self {
        Self::with_capacity(ticker, MAX_ORDERS, MAX_PRICE_LEVELS)
    }

    pub fn with_capacity(ticker: TickerId, order_capacity: usize, price_level_capacity: usize) -> Self {
        Self {
            ticker,
            order_pool: MemPool::new(order_capacity),
            level_pool: MemPool::new(price_level_capacity),
            best_bid: POOL_INDEX_INVALID,
            best_ask: POOL_INDEX_INVALID,
            price_to_level: vec![POOL_INDEX_INVALID; price_level_capacity],
            client_order_map: vec![HashMap::new(); MAX_CLIENTS],
            next_market_order_id: 1,
        }
    }

    /// §4.3 NEW: accept, attempt to match against the opposite side, and
    /// rest whatever quantity remains.
    pub fn add(
        &mut self,
        sink: &mut impl MatchingEventSink,
        client: ClientId,
        client_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
    ) {
        let market_order_id = self.next_market_order_id;
        self.next_market_order_id += 1;

        sink.send_client_response(MEClientResponse::new(
            ClientResponseType::Accepted,
            client,
            self.ticker,
            client_order_id,
            market_order_id,
            side,
            price,
            Qty::new(0),
            qty,
        ));

        let mut leaves = qty;
        self.check_for_match(sink, client, client_order_id, market_order_id, side, price, &mut leaves);

        if !leaves.is_zero() {
            let priority = self.next_priority(price);
            let order = Order {
                client,
                client_order_id,
                market_order_id,
                side,
                price,
                qty: leaves,
                priority,
                prev: POOL_INDEX_INVALID,
                next: POOL_INDEX_INVALID,
            };
            let order_idx = self.order_pool.allocate(order);
            self.link_order_into_price_level(side, price, order_idx);
            self.client_order_map[client as usize].insert(client_order_id, order_idx);

            sink.send_market_update(MEMarketUpdate::new(
                MarketUpdateType::Add,
                market_order_id,
                self.ticker,
                side,
                price,
                leaves,
                priority,
            ));
        }
    }

    /// §4.3 CANCEL: reject if the (client, client_order_id) pair is
    /// unknown, otherwise remove the resting order and publish both the
    /// CANCELED response and the CANCEL market update.
    pub fn cancel(
        &mut self,
        sink: &mut impl MatchingEventSink,
        client: ClientId,
        client_order_id: OrderId,
    ) {
        let order_idx = self.client_order_map[client as usize].get(&client_order_id).copied();

        let Some(order_idx) = order_idx else {
            sink.send_client_response(MEClientResponse::cancel_rejected(client, self.ticker, client_order_id));
            return;
        };

        let (market_order_id, side, price, remaining_qty, priority) = {
            let order = self.order_pool.get(order_idx);
            (
                order.market_order_id,
                order.side,
                order.price,
                order.qty,
                order.priority,
            )
        };

        sink.send_client_response(MEClientResponse::new(
            ClientResponseType::Canceled,
            client,
            self.ticker,
            client_order_id,
            market_order_id,
            side,
            price,
            Qty::new(0),
            remaining_qty,
        ));
        sink.send_market_update(MEMarketUpdate::new(
            MarketUpdateType::Cancel,
            market_order_id,
            self.ticker,
            side,
            price,
            Qty::new(0),
            priority,
        ));

        self.remove_order(order_idx);
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.level_price(self.best_bid)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.level_price(self.best_ask)
    }

    fn level_price(&self, level_idx: PoolIndex) -> Option<Price> {
        if level_idx == POOL_INDEX_INVALID {
            None
        } else {
            Some(self.level_pool.get(level_idx).price)
        }
    }

    // -- matching --------------------------------------------------------

    /// Sweeps the opposite side while the incoming order's price still
    /// crosses the opposite best price and quantity remains, executing
    /// one resting order at a time (price-time priority, §4.3).
    #[allow(clippy::too_many_arguments)]
    fn check_for_match(
        &mut self,
        sink: &mut impl MatchingEventSink,
        aggressor_client: ClientId,
        aggressor_client_order_id: OrderId,
        aggressor_market_order_id: OrderId,
        aggressor_side: Side,
        aggressor_price: Price,
        leaves: &mut Qty,
    ) {
        while !leaves.is_zero() {
            let Some(passive_idx) = self.best_opposite_order_if_compatible(aggressor_side, aggressor_price)
            else {
                break;
            };
            self.execute_match(
                sink,
                aggressor_client,
                aggressor_client_order_id,
                aggressor_market_order_id,
                aggressor_side,
                passive_idx,
                leaves,
            );
        }
    }

    fn best_opposite_order_if_compatible(&self, side: Side, price: Price) -> Option<PoolIndex> {
        let level_idx = match side {
            Side::Buy => self.best_ask,
            Side::Sell => self.best_bid,
            Side::Invalid => POOL_INDEX_INVALID,
        };
        if level_idx == POOL_INDEX_INVALID {
            return None;
        }
        let level = self.level_pool.get(level_idx);
        let compatible = match side {
            Side::Buy => price >= level.price,
            Side::Sell => price <= level.price,
            Side::Invalid => false,
        };
        if !compatible {
            return None;
        }
        Some(level.first_order)
    }

    /// Executes one fill between the incoming aggressor and the given
    /// resting (passive) order at the front of its price level's FIFO
    /// queue. Price improvement accrues to the aggressor: execution
    /// price is always the passive order's resting price.
    #[allow(clippy::too_many_arguments)]
    fn execute_match(
        &mut self,
        sink: &mut impl MatchingEventSink,
        aggressor_client: ClientId,
        aggressor_client_order_id: OrderId,
        aggressor_market_order_id: OrderId,
        aggressor_side: Side,
        passive_idx: PoolIndex,
        leaves: &mut Qty,
    ) {
        let (passive_client, passive_coid, passive_mid, passive_side, passive_price, fill_qty, new_qty, priority) = {
            let passive = self.order_pool.get_mut(passive_idx);
            let fill_qty = (*leaves).min(passive.qty);
            passive.qty = passive.qty - fill_qty;
            (
                passive.client,
                passive.client_order_id,
                passive.market_order_id,
                passive.side,
                passive.price,
                fill_qty,
                passive.qty,
                passive.priority,
            )
        };
        *leaves = *leaves - fill_qty;

        sink.send_client_response(MEClientResponse::new(
            ClientResponseType::Filled,
            aggressor_client,
            self.ticker,
            aggressor_client_order_id,
            aggressor_market_order_id,
            aggressor_side,
            passive_price,
            fill_qty,
            *leaves,
        ));
        sink.send_client_response(MEClientResponse::new(
            ClientResponseType::Filled,
            passive_client,
            self.ticker,
            passive_coid,
            passive_mid,
            passive_side,
            passive_price,
            fill_qty,
            new_qty,
        ));
        sink.send_market_update(MEMarketUpdate::new(
            MarketUpdateType::Trade,
            crate::types::ORDER_ID_INVALID,
            self.ticker,
            aggressor_side,
            passive_price,
            fill_qty,
            crate::types::PRIORITY_INVALID,
        ));

        if new_qty.is_zero() {
            sink.send_market_update(MEMarketUpdate::new(
                MarketUpdateType::Cancel,
                passive_mid,
                self.ticker,
                passive_side,
                passive_price,
                Qty::new(0),
                priority,
            ));
            self.remove_order(passive_idx);
        } else {
            sink.send_market_update(MEMarketUpdate::new(
                MarketUpdateType::Modify,
                passive_mid,
                self.ticker,
                passive_side,
                passive_price,
                new_qty,
                priority,
            ));
        }
    }

    // -- price-level and order linked lists -------------------------------

    fn price_index(&self, price: Price) -> usize {
        let capacity = self.price_to_level.len() as i64;
        price.raw().rem_euclid(capacity) as usize
    }

    fn next_priority(&self, price: Price) -> Priority {
        let bucket = self.price_index(price);
        let level_idx = self.price_to_level[bucket];
        if level_idx == POOL_INDEX_INVALID {
            return 1;
        }
        let level = self.level_pool.get(level_idx);
        debug_assert_eq!(level.price, price, "price-level index collision");
        let first = level.first_order;
        if first == POOL_INDEX_INVALID {
            return 1;
        }
        let tail = self.order_pool.get(first).prev;
        self.order_pool.get(tail).priority + 1
    }

    fn link_order_into_price_level(&mut self, side: Side, price: Price, order_idx: PoolIndex) {
        let bucket = self.price_index(price);
        let mut level_idx = self.price_to_level[bucket];
        if level_idx == POOL_INDEX_INVALID {
            let level = PriceLevel {
                side,
                price,
                first_order: POOL_INDEX_INVALID,
                prev: POOL_INDEX_INVALID,
                next: POOL_INDEX_INVALID,
            };
            level_idx = self.level_pool.allocate(level);
            self.price_to_level[bucket] = level_idx;
            self.insert_level(side, level_idx);
        }
        self.append_order_to_level(level_idx, order_idx);
    }

    /// Removes a resting order from the book entirely: unlinks it from
    /// its price level's FIFO queue, drops it from the client-order
    /// map, frees its pool cell, and tears down the price level too if
    /// it's now empty.
    fn remove_order(&mut self, order_idx: PoolIndex) {
        let (side, price, client, client_order_id) = {
            let order = self.order_pool.get(order_idx);
            (order.side, order.price, order.client, order.client_order_id)
        };
        let bucket = self.price_index(price);
        let level_idx = self.price_to_level[bucket];
        debug_assert!(level_idx != POOL_INDEX_INVALID, "price level missing for a live order");

        self.detach_order_from_level(level_idx, order_idx);
        self.client_order_map[client as usize].remove(&client_order_id);
        self.order_pool.deallocate(order_idx);

        if self.level_pool.get(level_idx).first_order == POOL_INDEX_INVALID {
            self.remove_level(side, level_idx);
        }
    }

    fn append_order_to_level(&mut self, level_idx: PoolIndex, order_idx: PoolIndex) {
        let first = self.level_pool.get(level_idx).first_order;
        if first == POOL_INDEX_INVALID {
            self.order_pool.get_mut(order_idx).prev = order_idx;
            self.order_pool.get_mut(order_idx).next = order_idx;
            self.level_pool.get_mut(level_idx).first_order = order_idx;
        } else {
            let tail = self.order_pool.get(first).prev;
            self.order_pool.get_mut(order_idx).prev = tail;
            self.order_pool.get_mut(order_idx).next = first;
            self.order_pool.get_mut(tail).next = order_idx;
            self.order_pool.get_mut(first).prev = order_idx;
        }
    }

    fn detach_order_from_level(&mut self, level_idx: PoolIndex, order_idx: PoolIndex) {
        let (prev, next) = {
            let order = self.order_pool.get(order_idx);
            (order.prev, order.next)
        };
        if next == order_idx {
            self.level_pool.get_mut(level_idx).first_order = POOL_INDEX_INVALID;
        } else {
            self.order_pool.get_mut(prev).next = next;
            self.order_pool.get_mut(next).prev = prev;
            if self.level_pool.get(level_idx).first_order == order_idx {
                self.level_pool.get_mut(level_idx).first_order = next;
            }
        }
    }

    fn head(&self, side: Side) -> PoolIndex {
        match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
            Side::Invalid => POOL_INDEX_INVALID,
        }
    }

    fn set_head(&mut self, side: Side, idx: PoolIndex) {
        match side {
            Side::Buy => self.best_bid = idx,
            Side::Sell => self.best_ask = idx,
            Side::Invalid => {}
        }
    }

    /// True if `a` is strictly more aggressive than `b` for `side`:
    /// higher for bids, lower for asks.
    fn better(side: Side, a: Price, b: Price) -> bool {
        match side {
            Side::Buy => a > b,
            Side::Sell => a < b,
            Side::Invalid => false,
        }
    }

    /// Inserts a newly-allocated, as-yet-unlinked price level into the
    /// sorted circular list for `side`. Walks from the current best,
    /// which is worst-case O(distinct price levels on that side) but
    /// touches no memory outside the pool (§4.3 "price levels kept
    /// sorted by aggressiveness").
    fn insert_level(&mut self, side: Side, new_idx: PoolIndex) {
        let head = self.head(side);
        if head == POOL_INDEX_INVALID {
            self.level_pool.get_mut(new_idx).prev = new_idx;
            self.level_pool.get_mut(new_idx).next = new_idx;
            self.set_head(side, new_idx);
            return;
        }

        let new_price = self.level_pool.get(new_idx).price;
        let head_price = self.level_pool.get(head).price;

        if Self::better(side, new_price, head_price) {
            let tail = self.level_pool.get(head).prev;
            self.level_pool.get_mut(new_idx).prev = tail;
            self.level_pool.get_mut(new_idx).next = head;
            self.level_pool.get_mut(tail).next = new_idx;
            self.level_pool.get_mut(head).prev = new_idx;
            self.set_head(side, new_idx);
            return;
        }

        let mut cur = head;
        loop {
            let next = self.level_pool.get(cur).next;
            if next == head {
                self.level_pool.get_mut(new_idx).prev = cur;
                self.level_pool.get_mut(new_idx).next = head;
                self.level_pool.get_mut(cur).next = new_idx;
                self.level_pool.get_mut(head).prev = new_idx;
                return;
            }
            let next_price = self.level_pool.get(next).price;
            if Self::better(side, new_price, next_price) {
                self.level_pool.get_mut(new_idx).prev = cur;
                self.level_pool.get_mut(new_idx).next = next;
                self.level_pool.get_mut(cur).next = new_idx;
                self.level_pool.get_mut(next).prev = new_idx;
                return;
            }
            cur = next;
        }
    }

    fn remove_level(&mut self, side: Side, level_idx: PoolIndex) {
        let (prev, next) = {
            let level = self.level_pool.get(level_idx);
            (level.prev, level.next)
        };
        if next == level_idx {
            self.set_head(side, POOL_INDEX_INVALID);
        } else {
            self.level_pool.get_mut(prev).next = next;
            self.level_pool.get_mut(next).prev = prev;
            if self.head(side) == level_idx {
                self.set_head(side, next);
            }
        }

        let price = self.level_pool.get(level_idx).price;
        let bucket = self.price_index(price);
        self.price_to_level[bucket] = POOL_INDEX_INVALID;
        self.level_pool.deallocate(level_idx);
    }
}
