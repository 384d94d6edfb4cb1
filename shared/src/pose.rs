//! Local bone pose (position + orientation).
//!
//! POD type with an explicit little-endian wire form, shared between the
//! protocol codec and the skeleton model.
//!
//! # Wire layout (28 bytes)
//! ```text
//! 0x00: position  [f32; 3] LE (x, y, z)
//! 0x0C: orientation [f32; 4] LE (x, y, z, w)
//! ```

use glam::{Quat, Vec3};

/// Local transform of a single bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Translation relative to the parent bone, meters.
    pub position: Vec3,
    /// Orientation relative to the parent bone.
    pub orientation: Quat,
}

impl Pose {
    /// Size of the wire form in bytes.
    pub const WIRE_SIZE: usize = 28;

    /// Identity pose (no translation, no rotation).
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Write the pose to its 28-byte wire form.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        let fields = [
            self.position.x,
            self.position.y,
            self.position.z,
            self.orientation.x,
            self.orientation.y,
            self.orientation.z,
            self.orientation.w,
        ];
        for (i, f) in fields.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes
    }

    /// Read a pose from its wire form. Returns `None` on short input.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::WIRE_SIZE {
            return None;
        }
        let mut fields = [0f32; 7];
        for (i, f) in fields.iter_mut().enumerate() {
            *f = f32::from_le_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ]);
        }
        Some(Self {
            position: Vec3::new(fields[0], fields[1], fields[2]),
            orientation: Quat::from_xyzw(fields[3], fields[4], fields[5], fields[6]),
        })
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_roundtrip() {
        let pose = Pose::new(
            Vec3::new(0.5, 1.25, -3.0),
            Quat::from_xyzw(0.0, 0.7071, 0.0, 0.7071),
        );
        let bytes = pose.to_bytes();
        assert_eq!(bytes.len(), Pose::WIRE_SIZE);
        let parsed = Pose::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, pose);
    }

    #[test]
    fn test_identity_roundtrip() {
        let bytes = Pose::IDENTITY.to_bytes();
        assert_eq!(Pose::from_bytes(&bytes), Some(Pose::IDENTITY));
    }

    #[test]
    fn test_from_short_bytes() {
        assert!(Pose::from_bytes(&[0u8; 27]).is_none());
        assert!(Pose::from_bytes(&[]).is_none());
    }

    #[test]
    fn test_from_bytes_ignores_trailing() {
        let mut bytes = Pose::IDENTITY.to_bytes().to_vec();
        bytes.extend_from_slice(&[0xAA; 8]);
        assert_eq!(Pose::from_bytes(&bytes), Some(Pose::IDENTITY));
    }
}
