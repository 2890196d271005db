// nexus_core/src/net/mod.rs
//
// Transport glue (§6 "Transports", §11 supplemented features). Kept
// separate from `exchange`/`client` so the framing state machine and
// the multicast socket wrapper can be unit-tested without any real
// network I/O.

pub mod framing;
pub mod multicast;

pub use framing::PartialFrameBuffer;
pub use multicast::McastSocket;
