// nexus_core/src/wire/mod.rs
//
// Wire formats (§6): fixed-size, tightly packed, host-endian binary structs.
// Byte-for-byte layout is the cross-implementation contract — these types
// are `#[repr(C, packed)]` with fields declared in the exact order of §6.

pub mod messages;

pub use messages::{
    ClientRequestType, ClientResponseType, MarketUpdateType, MDPMarketUpdate, MEClientRequest,
    MEClientResponse, MEMarketUpdate, OMClientRequest, OMClientResponse,
};
