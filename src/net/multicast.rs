// nexus_core/src/net/multicast.rs
//
// §6 "Transports": incremental and snapshot market data each ride a
// distinct UDP multicast group/port. `McastSocket` wraps a non-blocking
// `UdpSocket` with the join/leave calls and the oversized receive/send
// buffers §11 calls for (the original pre-sizes socket buffers to tens
// of MiB to absorb multicast bursts without kernel-level drops).

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::warn;

/// Socket buffers are best-effort sized to this many bytes; the OS may
/// cap the request lower, which is logged but not fatal.
const MULTICAST_BUFFER_BYTES: usize = 16 * 1024 * 1024;

pub struct McastSocket {
    socket: UdpSocket,
    group: Ipv4Addr,
    interface: Ipv4Addr,
}

impl McastSocket {
    /// Bind to `port` on all interfaces and join `group` via `interface`.
    /// Subscribers hold this open for the life of the process
    /// (incremental stream) or only while in recovery (snapshot
    /// stream, §4.9).
    pub fn join(group: Ipv4Addr, port: u16, interface: Ipv4Addr) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;
        socket.join_multicast_v4(&group, &interface)?;

        if let Err(e) = socket.set_recv_buffer_size(MULTICAST_BUFFER_BYTES) {
            warn!(error = %e, "could not size multicast receive buffer");
        }
        if let Err(e) = socket.set_send_buffer_size(MULTICAST_BUFFER_BYTES) {
            warn!(error = %e, "could not size multicast send buffer");
        }
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket: socket.into(),
            group,
            interface,
        })
    }

    pub fn send_to(&self, bytes: &[u8], port: u16) -> io::Result<usize> {
        self.socket.send_to(bytes, (self.group, port))
    }

    /// Non-blocking receive. `Ok(None)` means no datagram was waiting.
    pub fn try_recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn leave(&self) -> io::Result<()> {
        self.socket.leave_multicast_v4(&self.group, &self.interface)
    }
}
