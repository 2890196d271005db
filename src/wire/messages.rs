// nexus_core/src/wire/messages.rs
//
// §6 wire formats. Every message here is `#[repr(C, packed)]`: fields lay
// out in declaration order with zero padding, so a socket buffer can be
// reinterpreted in place with no parsing step. Because the structs are
// packed, references to individual fields are potentially unaligned —
// always copy a field to a local before using it (matches the discipline
// used throughout this crate's tests and the order-server/gateway framing
// code that reads these off the wire).

use crate::types::{ClientId, OrderId, Price, Priority, Qty, Side, SeqNum, TickerId};
use std::fmt;

// ---------------------------------------------------------------------------
// Type enums (§6)
// ---------------------------------------------------------------------------

/// `ClientRequestType`: `0:INVALID, 1:NEW, 2:CANCEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientRequestType {
    Invalid = 0,
    New = 1,
    Cancel = 2,
}

impl ClientRequestType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Invalid),
            1 => Some(Self::New),
            2 => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// `ClientResponseType`: `0:INVALID, 1:ACCEPTED, 2:CANCELED, 3:FILLED, 4:CANCEL_REJECTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientResponseType {
    Invalid = 0,
    Accepted = 1,
    Canceled = 2,
    Filled = 3,
    CancelRejected = 4,
}

impl ClientResponseType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Invalid),
            1 => Some(Self::Accepted),
            2 => Some(Self::Canceled),
            3 => Some(Self::Filled),
            4 => Some(Self::CancelRejected),
            _ => None,
        }
    }
}

/// `MarketUpdateType`: `0:INVALID, 1:CLEAR, 2:ADD, 3:MODIFY, 4:CANCEL, 5:TRADE,
/// 6:SNAPSHOT_START, 7:SNAPSHOT_END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MarketUpdateType {
    Invalid = 0,
    Clear = 1,
    Add = 2,
    Modify = 3,
    Cancel = 4,
    Trade = 5,
    SnapshotStart = 6,
    SnapshotEnd = 7,
}

impl MarketUpdateType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Invalid),
            1 => Some(Self::Clear),
            2 => Some(Self::Add),
            3 => Some(Self::Modify),
            4 => Some(Self::Cancel),
            5 => Some(Self::Trade),
            6 => Some(Self::SnapshotStart),
            7 => Some(Self::SnapshotEnd),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// MEMarketUpdate / MDPMarketUpdate
// ---------------------------------------------------------------------------

/// `{uint8 type, uint64 order_id, uint32 ticker, uint8 side, int64 price,
/// uint32 qty, uint64 priority}` — 34 bytes, no padding.
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct MEMarketUpdate {
    pub r#type: u8,
    pub order_id: OrderId,
    pub ticker: TickerId,
    pub side: u8,
    pub price: i64,
    pub qty: u32,
    pub priority: Priority,
}

impl MEMarketUpdate {
    pub fn new(
        update_type: MarketUpdateType,
        order_id: OrderId,
        ticker: TickerId,
        side: Side,
        price: Price,
        qty: Qty,
        priority: Priority,
    ) -> Self {
        Self {
            r#type: update_type as u8,
            order_id,
            ticker,
            side: side.as_u8(),
            price: price.raw(),
            qty: qty.raw(),
            priority,
        }
    }

    pub fn update_type(&self) -> Option<MarketUpdateType> {
        MarketUpdateType::from_u8(self.r#type)
    }

    pub fn side(&self) -> Side {
        Side::from_u8(self.side).unwrap_or(Side::Invalid)
    }

    pub fn price(&self) -> Price {
        Price::new(self.price)
    }

    pub fn qty(&self) -> Qty {
        Qty::new(self.qty)
    }
}

impl Default for MEMarketUpdate {
    fn default() -> Self {
        Self {
            r#type: MarketUpdateType::Invalid as u8,
            order_id: crate::types::ORDER_ID_INVALID,
            ticker: crate::types::TICKER_ID_INVALID,
            side: Side::Invalid.as_u8(),
            price: crate::types::PRICE_INVALID.raw(),
            qty: 0,
            priority: crate::types::PRIORITY_INVALID,
        }
    }
}

impl fmt::Debug for MEMarketUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order_id = self.order_id;
        let ticker = self.ticker;
        let price = self.price();
        let qty = self.qty();
        let priority = self.priority;
        f.debug_struct("MEMarketUpdate")
            .field("type", &self.update_type())
            .field("order_id", &order_id)
            .field("ticker", &ticker)
            .field("side", &self.side())
            .field("price", &price)
            .field("qty", &qty)
            .field("priority", &priority)
            .finish()
    }
}

/// `{uint64 seq_num, MEMarketUpdate body}` — the message actually carried on
/// the incremental and snapshot multicast streams.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct MDPMarketUpdate {
    pub seq_num: SeqNum,
    pub body: MEMarketUpdate,
}

impl MDPMarketUpdate {
    pub fn new(seq_num: SeqNum, body: MEMarketUpdate) -> Self {
        Self { seq_num, body }
    }

    pub fn seq_num(&self) -> SeqNum {
        self.seq_num
    }
}

impl Default for MDPMarketUpdate {
    fn default() -> Self {
        Self { seq_num: 0, body: MEMarketUpdate::default() }
    }
}

// ---------------------------------------------------------------------------
// MEClientRequest / OMClientRequest
// ---------------------------------------------------------------------------

/// `{uint8 type, uint32 client, uint32 ticker, uint64 client_order_id,
/// uint8 side, int64 price, uint32 qty}` — 30 bytes, no padding.
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct MEClientRequest {
    pub r#type: u8,
    pub client: ClientId,
    pub ticker: TickerId,
    pub client_order_id: OrderId,
    pub side: u8,
    pub price: i64,
    pub qty: u32,
}

impl MEClientRequest {
    pub fn new_order(
        client: ClientId,
        ticker: TickerId,
        client_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
    ) -> Self {
        Self {
            r#type: ClientRequestType::New as u8,
            client,
            ticker,
            client_order_id,
            side: side.as_u8(),
            price: price.raw(),
            qty: qty.raw(),
        }
    }

    pub fn cancel(client: ClientId, ticker: TickerId, client_order_id: OrderId) -> Self {
        Self {
            r#type: ClientRequestType::Cancel as u8,
            client,
            ticker,
            client_order_id,
            side: Side::Invalid.as_u8(),
            price: crate::types::PRICE_INVALID.raw(),
            qty: 0,
        }
    }

    pub fn request_type(&self) -> Option<ClientRequestType> {
        ClientRequestType::from_u8(self.r#type)
    }

    pub fn side(&self) -> Side {
        Side::from_u8(self.side).unwrap_or(Side::Invalid)
    }

    pub fn price(&self) -> Price {
        Price::new(self.price)
    }

    pub fn qty(&self) -> Qty {
        Qty::new(self.qty)
    }
}

impl Default for MEClientRequest {
    fn default() -> Self {
        Self {
            r#type: ClientRequestType::Invalid as u8,
            client: crate::types::CLIENT_ID_INVALID,
            ticker: crate::types::TICKER_ID_INVALID,
            client_order_id: crate::types::ORDER_ID_INVALID,
            side: Side::Invalid.as_u8(),
            price: crate::types::PRICE_INVALID.raw(),
            qty: 0,
        }
    }
}

impl fmt::Debug for MEClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let client = self.client;
        let ticker = self.ticker;
        let coid = self.client_order_id;
        let price = self.price();
        let qty = self.qty();
        f.debug_struct("MEClientRequest")
            .field("type", &self.request_type())
            .field("client", &client)
            .field("ticker", &ticker)
            .field("client_order_id", &coid)
            .field("side", &self.side())
            .field("price", &price)
            .field("qty", &qty)
            .finish()
    }
}

/// `{uint64 seq_num, MEClientRequest body}` — framed on the order-entry TCP
/// connection, fixed-size, no length prefix (§4.6, §4.10).
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct OMClientRequest {
    pub seq_num: SeqNum,
    pub body: MEClientRequest,
}

impl OMClientRequest {
    pub fn new(seq_num: SeqNum, body: MEClientRequest) -> Self {
        Self { seq_num, body }
    }
}

impl Default for OMClientRequest {
    fn default() -> Self {
        Self { seq_num: 0, body: MEClientRequest::default() }
    }
}

// ---------------------------------------------------------------------------
// MEClientResponse / OMClientResponse
// ---------------------------------------------------------------------------

/// `{uint8 type, uint32 client, uint32 ticker, uint64 client_order_id,
/// uint64 market_order_id, uint8 side, int64 price, uint32 exec_qty,
/// uint32 leaves_qty}` — 42 bytes, no padding.
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct MEClientResponse {
    pub r#type: u8,
    pub client: ClientId,
    pub ticker: TickerId,
    pub client_order_id: OrderId,
    pub market_order_id: OrderId,
    pub side: u8,
    pub price: i64,
    pub exec_qty: u32,
    pub leaves_qty: u32,
}

impl MEClientResponse {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        response_type: ClientResponseType,
        client: ClientId,
        ticker: TickerId,
        client_order_id: OrderId,
        market_order_id: OrderId,
        side: Side,
        price: Price,
        exec_qty: Qty,
        leaves_qty: Qty,
    ) -> Self {
        Self {
            r#type: response_type as u8,
            client,
            ticker,
            client_order_id,
            market_order_id,
            side: side.as_u8(),
            price: price.raw(),
            exec_qty: exec_qty.raw(),
            leaves_qty: leaves_qty.raw(),
        }
    }

    /// A `CANCEL_REJECTED` carrying the INVALID sentinels §8 scenario 4
    /// requires: no market-order-id, no side/price/qty were ever assigned.
    pub fn cancel_rejected(client: ClientId, ticker: TickerId, client_order_id: OrderId) -> Self {
        Self {
            r#type: ClientResponseType::CancelRejected as u8,
            client,
            ticker,
            client_order_id,
            market_order_id: crate::types::ORDER_ID_INVALID,
            side: Side::Invalid.as_u8(),
            price: crate::types::PRICE_INVALID.raw(),
            exec_qty: 0,
            leaves_qty: 0,
        }
    }

    pub fn response_type(&self) -> Option<ClientResponseType> {
        ClientResponseType::from_u8(self.r#type)
    }

    pub fn side(&self) -> Side {
        Side::from_u8(self.side).unwrap_or(Side::Invalid)
    }

    pub fn price(&self) -> Price {
        Price::new(self.price)
    }

    pub fn exec_qty(&self) -> Qty {
        Qty::new(self.exec_qty)
    }

    pub fn leaves_qty(&self) -> Qty {
        Qty::new(self.leaves_qty)
    }
}

impl Default for MEClientResponse {
    fn default() -> Self {
        Self {
            r#type: ClientResponseType::Invalid as u8,
            client: crate::types::CLIENT_ID_INVALID,
            ticker: crate::types::TICKER_ID_INVALID,
            client_order_id: crate::types::ORDER_ID_INVALID,
            market_order_id: crate::types::ORDER_ID_INVALID,
            side: Side::Invalid.as_u8(),
            price: crate::types::PRICE_INVALID.raw(),
            exec_qty: 0,
            leaves_qty: 0,
        }
    }
}

impl fmt::Debug for MEClientResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let client = self.client;
        let ticker = self.ticker;
        let coid = self.client_order_id;
        let mid = self.market_order_id;
        let price = self.price();
        let exec_qty = self.exec_qty();
        let leaves_qty = self.leaves_qty();
        f.debug_struct("MEClientResponse")
            .field("type", &self.response_type())
            .field("client", &client)
            .field("ticker", &ticker)
            .field("client_order_id", &coid)
            .field("market_order_id", &mid)
            .field("side", &self.side())
            .field("price", &price)
            .field("exec_qty", &exec_qty)
            .field("leaves_qty", &leaves_qty)
            .finish()
    }
}

/// `{uint64 seq_num, MEClientResponse body}`, sequenced per-client (§4.6
/// outbound path).
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct OMClientResponse {
    pub seq_num: SeqNum,
    pub body: MEClientResponse,
}

impl OMClientResponse {
    pub fn new(seq_num: SeqNum, body: MEClientResponse) -> Self {
        Self { seq_num, body }
    }
}

impl Default for OMClientResponse {
    fn default() -> Self {
        Self { seq_num: 0, body: MEClientResponse::default() }
    }
}

// ---------------------------------------------------------------------------
// Byte (de)serialization — zero-copy cast to/from the raw socket buffer.
// ---------------------------------------------------------------------------

/// Reinterpret a `#[repr(C, packed)]` wire type as its raw byte
/// representation, and back. Safe because every wire type here is
/// `Copy`, contains only integers (no padding, no pointers, no
/// niches), and has no alignment requirement greater than 1 thanks to
/// `packed`.
pub trait WireMessage: Sized + Copy {
    fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts((self as *const Self) as *const u8, std::mem::size_of::<Self>())
        }
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < std::mem::size_of::<Self>() {
            return None;
        }
        let mut value = std::mem::MaybeUninit::<Self>::uninit();
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                value.as_mut_ptr() as *mut u8,
                std::mem::size_of::<Self>(),
            );
            Some(value.assume_init())
        }
    }
}

impl WireMessage for MEMarketUpdate {}
impl WireMessage for MDPMarketUpdate {}
impl WireMessage for MEClientRequest {}
impl WireMessage for OMClientRequest {}
impl WireMessage for MEClientResponse {}
impl WireMessage for OMClientResponse {}

// ---------------------------------------------------------------------------
// Compile-time size assertions — the byte-for-byte contract of §6.
// ---------------------------------------------------------------------------

const _: () = assert!(std::mem::size_of::<MEMarketUpdate>() == 34);
const _: () = assert!(std::mem::size_of::<MDPMarketUpdate>() == 42);
const _: () = assert!(std::mem::size_of::<MEClientRequest>() == 30);
const _: () = assert!(std::mem::size_of::<OMClientRequest>() == 38);
const _: () = assert!(std::mem::size_of::<MEClientResponse>() == 42);
const _: () = assert!(std::mem::size_of::<OMClientResponse>() == 50);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Qty;

    #[test]
    fn me_market_update_roundtrip() {
        let update = MEMarketUpdate::new(
            MarketUpdateType::Add,
            42,
            3,
            Side::Buy,
            Price::new(150_00),
            Qty::new(100),
            1,
        );
        let bytes = update.as_bytes().to_vec();
        let back = MEMarketUpdate::from_bytes(&bytes).unwrap();
        let order_id = back.order_id;
        assert_eq!(order_id, 42);
        assert_eq!(back.update_type(), Some(MarketUpdateType::Add));
        assert_eq!(back.side(), Side::Buy);
        assert_eq!(back.price(), Price::new(150_00));
        assert_eq!(back.qty(), Qty::new(100));
    }

    #[test]
    fn me_client_request_cancel_has_invalid_side_and_price() {
        let req = MEClientRequest::cancel(7, 0, 999);
        assert_eq!(req.request_type(), Some(ClientRequestType::Cancel));
        assert_eq!(req.side(), Side::Invalid);
        assert!(!req.price().is_valid());
    }

    #[test]
    fn cancel_rejected_carries_invalid_sentinels() {
        let resp = MEClientResponse::cancel_rejected(7, 0, 999);
        assert_eq!(resp.response_type(), Some(ClientResponseType::CancelRejected));
        let mid = resp.market_order_id;
        assert_eq!(mid, crate::types::ORDER_ID_INVALID);
        assert_eq!(resp.side(), Side::Invalid);
        assert!(!resp.price().is_valid());
        assert_eq!(resp.exec_qty(), Qty::new(0));
        assert_eq!(resp.leaves_qty(), Qty::new(0));
    }

    #[test]
    fn om_client_request_wraps_seq_and_body() {
        let body = MEClientRequest::new_order(1, 0, 5, Side::Sell, Price::new(100), Qty::new(10));
        let wrapped = OMClientRequest::new(9, body);
        let seq = wrapped.seq_num;
        assert_eq!(seq, 9);
        let bytes = wrapped.as_bytes().to_vec();
        let back = OMClientRequest::from_bytes(&bytes).unwrap();
        let back_seq = back.seq_num;
        assert_eq!(back_seq, 9);
    }
}
