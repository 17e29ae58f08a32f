//! Transform codec: live poses to flat serializable records and back.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Flat record form of a [`Pose`]: `[px, py, pz, qx, qy, qz, qw]`.
pub type PoseRecord = [f32; 7];

/// 3D position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation quaternion.
///
/// Stored exactly as sampled; never re-normalized, so drift in the source
/// data is carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Squared norm; close to 1.0 for a valid rotation.
    #[inline]
    pub fn norm_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// World-space position and orientation of an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    /// Size of an encoded pose in bytes (7 little-endian f32).
    pub const SIZE: usize = 28;

    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// A pose at `position` with identity rotation.
    pub const fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Quat::IDENTITY)
    }

    /// Flatten into a record. Lossless.
    #[inline]
    pub fn to_record(&self) -> PoseRecord {
        let Self { position: p, rotation: q } = *self;
        [p.x, p.y, p.z, q.x, q.y, q.z, q.w]
    }

    /// Rebuild from a record. Lossless.
    #[inline]
    pub fn from_record(record: PoseRecord) -> Self {
        let [px, py, pz, qx, qy, qz, qw] = record;
        Self::new(Vec3::new(px, py, pz), Quat::new(qx, qy, qz, qw))
    }

    /// Write the pose record to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for v in self.to_record() {
            w.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read a pose record from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut record = [0.0f32; 7];
        let mut buf4 = [0u8; 4];
        for v in &mut record {
            r.read_exact(&mut buf4)?;
            *v = f32::from_le_bytes(buf4);
        }
        Ok(Self::from_record(record))
    }
}

impl From<Pose> for PoseRecord {
    fn from(pose: Pose) -> Self {
        pose.to_record()
    }
}

impl From<PoseRecord> for Pose {
    fn from(record: PoseRecord) -> Self {
        Pose::from_record(record)
    }
}
