// nexus_core/src/net/framing.rs
//
// §4.6/§4.10: fixed-size binary framing with no length prefix. A `recv`
// can hand back any number of bytes, including a trailing partial
// frame — `PartialFrameBuffer` is the per-socket byte accumulator that
// keeps that tail across poll calls until the rest of the frame
// arrives.

/// Accumulates raw bytes from non-blocking socket reads and yields
/// complete `frame_size`-byte frames as they become available.
#[derive(Default)]
pub struct PartialFrameBuffer {
    buf: Vec<u8>,
}

impl PartialFrameBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append freshly read bytes.
    pub fn ingest(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Split off every complete `frame_size`-byte frame currently
    /// buffered, leaving any trailing partial frame in place for the
    /// next call.
    pub fn drain_frames(&mut self, frame_size: usize) -> Vec<Vec<u8>> {
        assert!(frame_size > 0, "frame size must be positive");
        let complete = self.buf.len() / frame_size;
        let consumed = complete * frame_size;
        let frames = self.buf[..consumed]
            .chunks_exact(frame_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        self.buf.drain(..consumed);
        frames
    }

    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}
