//! Kinlink hub wire protocol.
//!
//! Length-framed binary packets carried over an ordered byte stream. All
//! multi-byte fields are little-endian with fixed widths; nothing in the
//! codec truncates silently, and decode is total: any byte slice yields
//! either a packet plus its consumed length or a typed [`ProtocolError`].
//!
//! # Wire Format
//!
//! ```text
//! Header (3 bytes):
//! 0x00: packet type discriminant u8
//! 0x01: payload length u16 LE
//!
//! Payload, fixed per discriminant:
//! PoseUpdate     (0): bone code u8, pose 28 bytes (pos 3xf32, quat 4xf32)
//! TopologyChange (1): entry count u8, then count x 3 bytes:
//!                     child code u8, parent code u8 (0xFF = root),
//!                     edge kind u8 (ignored for root entries)
//! Heartbeat      (2): empty
//! Error          (3): code u16 LE, UTF-8 message (rest of payload)
//! ```
//!
//! [`ProtocolError::Incomplete`] is a recoverable condition meaning "wait
//! for more bytes"; stream transports deliver partial frames and the
//! caller buffers until the frame completes.

use kinlink_shared::{BoneKind, DecodeError, Pose};
use thiserror::Error;

use crate::model::{GraphError, Skeleton, SkeletonEdgeKind};

/// Header size: discriminant (1) + payload length (2).
pub const HEADER_SIZE: usize = 3;

/// Largest payload a frame can declare.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Parent code marking a topology entry as a root.
const ROOT_PARENT_CODE: u8 = 0xFF;

/// Size of one topology entry on the wire.
const TOPOLOGY_ENTRY_SIZE: usize = 3;

/// Framing and payload validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Not enough bytes for the header or the declared payload. This is
    /// the recoverable "buffer more bytes" condition, never fatal.
    #[error("incomplete frame: need at least {needed} more bytes")]
    Incomplete { needed: usize },
    /// The header declared a discriminant outside the enumerated range.
    #[error("unknown packet type discriminant {0}")]
    UnknownPacketType(u8),
    /// The payload failed type-specific validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// A bone or edge-kind code failed taxonomy decoding.
    #[error(transparent)]
    Taxonomy(#[from] DecodeError),
}

impl ProtocolError {
    /// Whether this is the recoverable wait-for-more-bytes condition.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}

/// Packet type discriminants as they appear on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    PoseUpdate = 0,
    TopologyChange = 1,
    Heartbeat = 2,
    Error = 3,
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Self::PoseUpdate),
            1 => Ok(Self::TopologyChange),
            2 => Ok(Self::Heartbeat),
            3 => Ok(Self::Error),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

/// One bone slot in a topology announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyEntry {
    pub child: BoneKind,
    /// `None` marks a root bone.
    pub parent: Option<BoneKind>,
    pub kind: SkeletonEdgeKind,
}

/// Full topology carried by a [`Packet::TopologyChange`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySpec {
    pub entries: Vec<TopologyEntry>,
}

impl TopologySpec {
    /// Materialize a fresh skeleton from this spec.
    ///
    /// Either returns a valid forest or fails; a partially wired graph is
    /// never observable.
    pub fn build_skeleton(&self) -> Result<Skeleton, GraphError> {
        let mut skeleton = Skeleton::new();
        for entry in &self.entries {
            skeleton.add_bone(entry.child);
            if let Some(parent) = entry.parent {
                skeleton.add_bone(parent);
            }
        }
        for entry in &self.entries {
            if let Some(parent) = entry.parent {
                skeleton.add_edge(parent, entry.child, entry.kind)?;
            }
        }
        Ok(skeleton)
    }
}

/// A decoded, typed unit of protocol data.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// New local pose for a single bone.
    PoseUpdate { bone: BoneKind, pose: Pose },
    /// The hub's bone set changed; the whole skeleton is replaced.
    TopologyChange(TopologySpec),
    /// Link keepalive; carries no data.
    Heartbeat,
    /// Advisory error reported by the hub.
    Error { code: u16, message: String },
}

impl Packet {
    /// Wire discriminant of this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::PoseUpdate { .. } => PacketType::PoseUpdate,
            Packet::TopologyChange(_) => PacketType::TopologyChange,
            Packet::Heartbeat => PacketType::Heartbeat,
            Packet::Error { .. } => PacketType::Error,
        }
    }

    /// Serialize with framing.
    ///
    /// Fails rather than wrapping when a field exceeds its wire range
    /// (topology with more than 255 entries, error message overflowing
    /// the payload length field).
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.encode_payload()?;
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.push(self.packet_type() as u8);
        bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    fn encode_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Packet::PoseUpdate { bone, pose } => {
                let mut payload = Vec::with_capacity(1 + Pose::WIRE_SIZE);
                payload.push(u8::from(*bone));
                payload.extend_from_slice(&pose.to_bytes());
                Ok(payload)
            }
            Packet::TopologyChange(spec) => {
                let count = u8::try_from(spec.entries.len()).map_err(|_| {
                    ProtocolError::InvalidPayload(format!(
                        "topology entry count {} exceeds u8 range",
                        spec.entries.len()
                    ))
                })?;
                let mut payload = Vec::with_capacity(1 + spec.entries.len() * TOPOLOGY_ENTRY_SIZE);
                payload.push(count);
                for entry in &spec.entries {
                    payload.push(u8::from(entry.child));
                    payload.push(entry.parent.map_or(ROOT_PARENT_CODE, u8::from));
                    payload.push(entry.kind as u8);
                }
                Ok(payload)
            }
            Packet::Heartbeat => Ok(Vec::new()),
            Packet::Error { code, message } => {
                let len = 2 + message.len();
                if len > MAX_PAYLOAD {
                    return Err(ProtocolError::InvalidPayload(format!(
                        "error message of {} bytes exceeds payload capacity",
                        message.len()
                    )));
                }
                let mut payload = Vec::with_capacity(len);
                payload.extend_from_slice(&code.to_le_bytes());
                payload.extend_from_slice(message.as_bytes());
                Ok(payload)
            }
        }
    }

    /// Decode one frame from the front of `bytes`.
    ///
    /// Returns the packet and the number of bytes consumed (header plus
    /// payload). [`ProtocolError::Incomplete`] means the caller should
    /// buffer more input and retry with the same prefix intact.
    pub fn decode(bytes: &[u8]) -> Result<(Packet, usize), ProtocolError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::Incomplete {
                needed: HEADER_SIZE - bytes.len(),
            });
        }
        let packet_type = PacketType::try_from(bytes[0])?;
        let declared = u16::from_le_bytes([bytes[1], bytes[2]]) as usize;
        let available = bytes.len() - HEADER_SIZE;
        if available < declared {
            return Err(ProtocolError::Incomplete {
                needed: declared - available,
            });
        }
        let payload = &bytes[HEADER_SIZE..HEADER_SIZE + declared];
        let packet = Self::decode_payload(packet_type, payload)?;
        Ok((packet, HEADER_SIZE + declared))
    }

    fn decode_payload(packet_type: PacketType, payload: &[u8]) -> Result<Packet, ProtocolError> {
        match packet_type {
            PacketType::PoseUpdate => {
                if payload.len() != 1 + Pose::WIRE_SIZE {
                    return Err(ProtocolError::InvalidPayload(format!(
                        "pose update payload is {} bytes, expected {}",
                        payload.len(),
                        1 + Pose::WIRE_SIZE
                    )));
                }
                let bone = BoneKind::try_from(payload[0])?;
                // Length was checked above, so the pose slice is complete.
                let pose = Pose::from_bytes(&payload[1..]).unwrap();
                Ok(Packet::PoseUpdate { bone, pose })
            }
            PacketType::TopologyChange => {
                let Some((&count, rest)) = payload.split_first() else {
                    return Err(ProtocolError::InvalidPayload(
                        "topology payload missing entry count".into(),
                    ));
                };
                let expected = count as usize * TOPOLOGY_ENTRY_SIZE;
                if rest.len() != expected {
                    return Err(ProtocolError::InvalidPayload(format!(
                        "topology payload is {} bytes, expected {} for {} entries",
                        rest.len(),
                        expected,
                        count
                    )));
                }
                let mut entries = Vec::with_capacity(count as usize);
                for chunk in rest.chunks_exact(TOPOLOGY_ENTRY_SIZE) {
                    let child = BoneKind::try_from(chunk[0])?;
                    let parent = match chunk[1] {
                        ROOT_PARENT_CODE => None,
                        code => Some(BoneKind::try_from(code)?),
                    };
                    let kind = if parent.is_none() {
                        // Edge kind byte is meaningless for roots.
                        SkeletonEdgeKind::Rigid
                    } else {
                        SkeletonEdgeKind::try_from(chunk[2])?
                    };
                    entries.push(TopologyEntry {
                        child,
                        parent,
                        kind,
                    });
                }
                Ok(Packet::TopologyChange(TopologySpec { entries }))
            }
            PacketType::Heartbeat => {
                if !payload.is_empty() {
                    return Err(ProtocolError::InvalidPayload(format!(
                        "heartbeat carries {} unexpected payload bytes",
                        payload.len()
                    )));
                }
                Ok(Packet::Heartbeat)
            }
            PacketType::Error => {
                if payload.len() < 2 {
                    return Err(ProtocolError::InvalidPayload(
                        "error payload shorter than its code field".into(),
                    ));
                }
                let code = u16::from_le_bytes([payload[0], payload[1]]);
                let message = std::str::from_utf8(&payload[2..])
                    .map_err(|e| {
                        ProtocolError::InvalidPayload(format!("error message is not UTF-8: {e}"))
                    })?
                    .to_owned();
                Ok(Packet::Error { code, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn sample_pose() -> Pose {
        Pose::new(
            Vec3::new(0.1, 1.6, -0.25),
            Quat::from_xyzw(0.0, 0.7071, 0.0, 0.7071),
        )
    }

    fn sample_topology() -> TopologySpec {
        TopologySpec {
            entries: vec![
                TopologyEntry {
                    child: BoneKind::Head,
                    parent: None,
                    kind: SkeletonEdgeKind::Rigid,
                },
                TopologyEntry {
                    child: BoneKind::Neck,
                    parent: Some(BoneKind::Head),
                    kind: SkeletonEdgeKind::Rigid,
                },
                TopologyEntry {
                    child: BoneKind::UpperArmL,
                    parent: Some(BoneKind::Neck),
                    kind: SkeletonEdgeKind::LengthConstrained,
                },
            ],
        }
    }

    #[test]
    fn test_pose_update_roundtrip() {
        let packet = Packet::PoseUpdate {
            bone: BoneKind::ForearmR,
            pose: sample_pose(),
        };
        let bytes = packet.encode().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 1 + Pose::WIRE_SIZE);
        assert_eq!(Packet::decode(&bytes).unwrap(), (packet, bytes.len()));
    }

    #[test]
    fn test_topology_roundtrip() {
        let packet = Packet::TopologyChange(sample_topology());
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), (packet, bytes.len()));
    }

    #[test]
    fn test_heartbeat_and_error_roundtrip() {
        for packet in [
            Packet::Heartbeat,
            Packet::Error {
                code: 404,
                message: "tracker went away".into(),
            },
        ] {
            let bytes = packet.encode().unwrap();
            assert_eq!(Packet::decode(&bytes).unwrap(), (packet, bytes.len()));
        }
    }

    #[test]
    fn test_decode_consumes_only_one_frame() {
        let mut bytes = Packet::Heartbeat.encode().unwrap();
        let second = Packet::PoseUpdate {
            bone: BoneKind::Hip,
            pose: sample_pose(),
        };
        bytes.extend_from_slice(&second.encode().unwrap());
        let (first, consumed) = Packet::decode(&bytes).unwrap();
        assert_eq!(first, Packet::Heartbeat);
        assert_eq!(consumed, HEADER_SIZE);
        let (rest, _) = Packet::decode(&bytes[consumed..]).unwrap();
        assert_eq!(rest, second);
    }

    #[test]
    fn test_incomplete_header() {
        let err = Packet::decode(&[0u8, 5]).unwrap_err();
        assert_eq!(err, ProtocolError::Incomplete { needed: 1 });
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_incomplete_payload_then_complete() {
        // Header declares 10 payload bytes but only 4 arrive.
        let packet = Packet::Error {
            code: 1,
            message: "overload".into(),
        };
        let bytes = packet.encode().unwrap();
        let err = Packet::decode(&bytes[..HEADER_SIZE + 4]).unwrap_err();
        assert_eq!(err, ProtocolError::Incomplete { needed: 6 });
        // The full buffer decodes.
        assert_eq!(Packet::decode(&bytes).unwrap(), (packet, bytes.len()));
    }

    #[test]
    fn test_unknown_discriminant() {
        let bytes = [99u8, 0, 0];
        assert_eq!(
            Packet::decode(&bytes),
            Err(ProtocolError::UnknownPacketType(99))
        );
    }

    #[test]
    fn test_bone_code_out_of_range() {
        let mut bytes = Packet::PoseUpdate {
            bone: BoneKind::Head,
            pose: Pose::IDENTITY,
        }
        .encode()
        .unwrap();
        bytes[HEADER_SIZE] = 200;
        assert_eq!(
            Packet::decode(&bytes),
            Err(ProtocolError::Taxonomy(DecodeError::UnknownBoneCode(200)))
        );
    }

    #[test]
    fn test_wrong_payload_sizes_rejected() {
        // Pose update with a short payload but a consistent header.
        let bytes = [0u8, 4, 0, 1, 2, 3, 4];
        assert!(matches!(
            Packet::decode(&bytes),
            Err(ProtocolError::InvalidPayload(_))
        ));
        // Heartbeat with stray payload bytes.
        let bytes = [2u8, 1, 0, 0xAB];
        assert!(matches!(
            Packet::decode(&bytes),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_topology_count_mismatch_rejected() {
        // Declares 2 entries but carries bytes for 1.
        let payload = [2u8, 0, 0xFF, 0];
        let mut bytes = vec![1u8, payload.len() as u8, 0];
        bytes.extend_from_slice(&payload);
        assert!(matches!(
            Packet::decode(&bytes),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_encode_rejects_oversize_fields() {
        let message = "x".repeat(MAX_PAYLOAD);
        let packet = Packet::Error { code: 0, message };
        assert!(matches!(
            packet.encode(),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_decode_total_on_arbitrary_input() {
        // A spread of adversarial prefixes must all produce typed errors.
        let cases: &[&[u8]] = &[
            &[],
            &[0],
            &[0, 255, 255],
            &[3, 1, 0, 0xC0], // error packet with invalid UTF-8 after code? short code
            &[1, 1, 0, 9],
            &[255, 0, 0],
        ];
        for case in cases {
            let _ = Packet::decode(case); // must return, never panic
        }
    }

    #[test]
    fn test_build_skeleton_from_topology() {
        let skeleton = sample_topology().build_skeleton().unwrap();
        assert_eq!(skeleton.len(), 3);
        assert_eq!(skeleton.roots().collect::<Vec<_>>(), vec![BoneKind::Head]);
        assert_eq!(
            skeleton.edge(BoneKind::UpperArmL).unwrap().kind,
            SkeletonEdgeKind::LengthConstrained
        );
    }

    #[test]
    fn test_build_skeleton_rejects_bad_forest() {
        // Two parents for the same child.
        let spec = TopologySpec {
            entries: vec![
                TopologyEntry {
                    child: BoneKind::Chest,
                    parent: Some(BoneKind::Head),
                    kind: SkeletonEdgeKind::Rigid,
                },
                TopologyEntry {
                    child: BoneKind::Chest,
                    parent: Some(BoneKind::Neck),
                    kind: SkeletonEdgeKind::Rigid,
                },
            ],
        };
        assert_eq!(
            spec.build_skeleton(),
            Err(GraphError::DuplicateParent {
                child: BoneKind::Chest
            })
        );
    }
}
