//! Frame reassembly for fragmented stream transports.
//!
//! The hub link is an ordered byte stream with no message boundaries, so
//! any packet may arrive split across reads. [`FrameBuffer`] accumulates
//! raw reads and yields whole packets, treating
//! [`ProtocolError::Incomplete`] as "keep the prefix, wait for more".

use super::protocol::{HEADER_SIZE, Packet, ProtocolError};

/// Reassembly buffer between the transport and the codec.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    /// Bytes of a skipped frame that have not arrived yet; swallowed on
    /// receipt so they are never misread as fresh headers.
    pending_discard: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes read from the transport.
    pub fn extend(&mut self, mut bytes: &[u8]) {
        if self.pending_discard > 0 {
            let n = self.pending_discard.min(bytes.len());
            self.pending_discard -= n;
            bytes = &bytes[n..];
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Decode the next whole packet, if the buffer holds one.
    ///
    /// `Ok(None)` means the buffered prefix is an incomplete frame; the
    /// buffer is left intact for the next read. On success the decoded
    /// frame's bytes are consumed. On any other decode error the buffer
    /// is also left intact so the caller can decide how to resynchronize
    /// (see [`FrameBuffer::skip_frame`]).
    pub fn next_packet(&mut self) -> Result<Option<Packet>, ProtocolError> {
        match Packet::decode(&self.buf) {
            Ok((packet, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(packet))
            }
            Err(e) if e.is_incomplete() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Drop the frame at the front of the buffer after a decode error.
    ///
    /// The header's declared length bounds the frame, so exactly that
    /// frame is discarded; if its tail has not arrived yet the deficit is
    /// remembered and swallowed as the bytes come in. Used by the
    /// degraded path to resume on the next frame boundary.
    pub fn skip_frame(&mut self) {
        if self.buf.len() >= HEADER_SIZE {
            let declared = u16::from_le_bytes([self.buf[1], self.buf[2]]) as usize;
            let frame = HEADER_SIZE + declared;
            if frame <= self.buf.len() {
                self.buf.drain(..frame);
            } else {
                self.pending_discard = frame - self.buf.len();
                self.buf.clear();
            }
            return;
        }
        self.buf.clear();
    }

    /// Discard everything buffered, including any pending deficit.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.pending_discard = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinlink_shared::{BoneKind, Pose};

    fn pose_update() -> Packet {
        Packet::PoseUpdate {
            bone: BoneKind::AnkleL,
            pose: Pose::IDENTITY,
        }
    }

    #[test]
    fn test_whole_packet_in_one_read() {
        let mut fb = FrameBuffer::new();
        fb.extend(&pose_update().encode().unwrap());
        assert_eq!(fb.next_packet().unwrap(), Some(pose_update()));
        assert!(fb.is_empty());
        assert_eq!(fb.next_packet().unwrap(), None);
    }

    #[test]
    fn test_packet_split_byte_by_byte() {
        let bytes = pose_update().encode().unwrap();
        let mut fb = FrameBuffer::new();
        for &b in &bytes[..bytes.len() - 1] {
            fb.extend(&[b]);
            assert_eq!(fb.next_packet().unwrap(), None);
        }
        fb.extend(&bytes[bytes.len() - 1..]);
        assert_eq!(fb.next_packet().unwrap(), Some(pose_update()));
    }

    #[test]
    fn test_two_packets_in_one_read() {
        let mut bytes = Packet::Heartbeat.encode().unwrap();
        bytes.extend_from_slice(&pose_update().encode().unwrap());
        let mut fb = FrameBuffer::new();
        fb.extend(&bytes);
        assert_eq!(fb.next_packet().unwrap(), Some(Packet::Heartbeat));
        assert_eq!(fb.next_packet().unwrap(), Some(pose_update()));
        assert_eq!(fb.next_packet().unwrap(), None);
    }

    #[test]
    fn test_error_leaves_buffer_for_resync() {
        let mut fb = FrameBuffer::new();
        // Unknown discriminant with a complete (empty) payload, followed
        // by a good packet.
        fb.extend(&[200, 0, 0]);
        fb.extend(&Packet::Heartbeat.encode().unwrap());
        assert!(fb.next_packet().is_err());
        fb.skip_frame();
        assert_eq!(fb.next_packet().unwrap(), Some(Packet::Heartbeat));
    }

    #[test]
    fn test_skip_frame_without_full_header_clears() {
        let mut fb = FrameBuffer::new();
        fb.extend(&[200]);
        fb.skip_frame();
        assert!(fb.is_empty());
    }

    #[test]
    fn test_skip_frame_swallows_late_tail() {
        let mut fb = FrameBuffer::new();
        // Bad frame declaring 4 payload bytes, only 1 arrived.
        fb.extend(&[200, 4, 0, 0xAA]);
        assert!(fb.next_packet().is_err());
        fb.skip_frame();
        assert!(fb.is_empty());
        // The bad frame's remaining 3 bytes trickle in; none of them may
        // be mistaken for a fresh header.
        fb.extend(&[0xBB, 0xCC]);
        assert_eq!(fb.next_packet().unwrap(), None);
        fb.extend(&[0xDD]);
        assert!(fb.is_empty());
        // The next real frame decodes cleanly.
        fb.extend(&Packet::Heartbeat.encode().unwrap());
        assert_eq!(fb.next_packet().unwrap(), Some(Packet::Heartbeat));
    }

    #[test]
    fn test_clear_drops_pending_deficit() {
        let mut fb = FrameBuffer::new();
        fb.extend(&[200, 0xF4, 0x01]); // declares 500 bytes, none arrived
        fb.skip_frame();
        fb.clear();
        fb.extend(&Packet::Heartbeat.encode().unwrap());
        assert_eq!(fb.next_packet().unwrap(), Some(Packet::Heartbeat));
    }
}
