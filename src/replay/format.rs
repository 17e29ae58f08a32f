//! Binary format definitions for replay files.

use std::io::{self, Read, Write};

use crate::capture::FrameSequence;
use crate::schema::{
    ChildPartSnapshot, CosmeticSelection, EntitySnapshot, FrameSnapshot, Identity, Pose, Team,
};

/// Magic bytes identifying a replay file.
pub const REPLAY_MAGIC: &[u8; 4] = b"PKRP";

/// Current format version.
pub const REPLAY_VERSION: u16 = 1;

/// Longest string accepted when decoding.
const MAX_STRING_LEN: usize = 1 << 16;

/// Upper bound on speculative preallocation from untrusted counts.
const MAX_PREALLOC: usize = 1024;

const IDENTITY_TEAM: u8 = 1 << 0;
const IDENTITY_NAME: u8 = 1 << 1;
const IDENTITY_HANDED: u8 = 1 << 2;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// File header for replay files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayHeader {
    /// Total number of frames.
    pub frame_count: u64,
    /// Seconds between recorded frames.
    pub interval_secs: f32,
}

impl ReplayHeader {
    /// Size of header in bytes.
    /// Magic(4) + Version(2) + Flags(2) + FrameCount(8) + Interval(4) + Reserved(16) = 36
    pub const SIZE: usize = 36;

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(REPLAY_MAGIC)?;
        w.write_all(&REPLAY_VERSION.to_le_bytes())?;
        // Flags, none defined yet
        w.write_all(&0u16.to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        w.write_all(&self.interval_secs.to_le_bytes())?;
        // Reserved bytes
        w.write_all(&[0u8; 16])?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != REPLAY_MAGIC {
            return Err(invalid("Invalid replay magic bytes"));
        }

        let mut buf2 = [0u8; 2];
        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];

        r.read_exact(&mut buf2)?;
        let version = u16::from_le_bytes(buf2);
        if version != REPLAY_VERSION {
            return Err(invalid(format!("Unsupported replay version: {}", version)));
        }

        // Flags
        r.read_exact(&mut buf2)?;

        r.read_exact(&mut buf8)?;
        let frame_count = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf4)?;
        let interval_secs = f32::from_le_bytes(buf4);

        // Skip reserved bytes
        let mut reserved = [0u8; 16];
        r.read_exact(&mut reserved)?;

        Ok(Self {
            frame_count,
            interval_secs,
        })
    }
}

fn write_u32<W: Write>(w: &mut W, v: usize) -> io::Result<()> {
    let v = u32::try_from(v).map_err(|_| invalid("Count exceeds u32 range"))?;
    w.write_all(&v.to_le_bytes())
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<usize> {
    let mut buf4 = [0u8; 4];
    r.read_exact(&mut buf4)?;
    Ok(u32::from_le_bytes(buf4) as usize)
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    if s.len() > MAX_STRING_LEN {
        return Err(invalid(format!("String of {} bytes is too long", s.len())));
    }
    write_u32(w, s.len())?;
    w.write_all(s.as_bytes())
}

fn read_str<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u32(r)?;
    if len > MAX_STRING_LEN {
        return Err(invalid(format!("String length {} exceeds limit", len)));
    }
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
}

fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(invalid(format!("Invalid bool byte {}", other))),
    }
}

fn write_identity<W: Write>(w: &mut W, identity: &Identity) -> io::Result<()> {
    let mut mask = 0u8;
    if identity.team.is_some() {
        mask |= IDENTITY_TEAM;
    }
    if identity.display_name.is_some() {
        mask |= IDENTITY_NAME;
    }
    if identity.right_handed.is_some() {
        mask |= IDENTITY_HANDED;
    }
    w.write_all(&[mask])?;

    if let Some(team) = identity.team {
        w.write_all(&team.0.to_le_bytes())?;
    }
    if let Some(name) = &identity.display_name {
        write_str(w, name)?;
    }
    if let Some(right_handed) = identity.right_handed {
        w.write_all(&[right_handed as u8])?;
    }
    Ok(())
}

fn read_identity<R: Read>(r: &mut R) -> io::Result<Identity> {
    let mask = read_u8(r)?;
    if mask & !(IDENTITY_TEAM | IDENTITY_NAME | IDENTITY_HANDED) != 0 {
        return Err(invalid(format!("Invalid identity mask {:#04x}", mask)));
    }

    let team = if mask & IDENTITY_TEAM != 0 {
        let mut buf4 = [0u8; 4];
        r.read_exact(&mut buf4)?;
        Some(Team(i32::from_le_bytes(buf4)))
    } else {
        None
    };
    let display_name = if mask & IDENTITY_NAME != 0 {
        Some(read_str(r)?)
    } else {
        None
    };
    let right_handed = if mask & IDENTITY_HANDED != 0 {
        Some(read_bool(r)?)
    } else {
        None
    };

    Ok(Identity {
        team,
        display_name,
        right_handed,
    })
}

/// Write one entity record.
pub fn write_entity<W: Write>(w: &mut W, entity: &EntitySnapshot) -> io::Result<()> {
    entity.pose.write_to(w)?;

    write_u32(w, entity.children.len())?;
    for child in &entity.children {
        write_str(w, &child.name)?;
        child.pose.write_to(w)?;
    }

    write_u32(w, entity.cosmetics.len())?;
    for cosmetic in &entity.cosmetics {
        write_str(w, &cosmetic.slot)?;
        write_str(w, &cosmetic.item)?;
        write_str(w, &cosmetic.variant)?;
    }

    write_identity(w, &entity.identity)
}

/// Read one entity record.
pub fn read_entity<R: Read>(r: &mut R) -> io::Result<EntitySnapshot> {
    let pose = Pose::read_from(r)?;

    let child_count = read_u32(r)?;
    let mut children = Vec::with_capacity(child_count.min(MAX_PREALLOC));
    for _ in 0..child_count {
        let name = read_str(r)?;
        let pose = Pose::read_from(r)?;
        children.push(ChildPartSnapshot { name, pose });
    }

    let cosmetic_count = read_u32(r)?;
    let mut cosmetics = Vec::with_capacity(cosmetic_count.min(MAX_PREALLOC));
    for _ in 0..cosmetic_count {
        let slot = read_str(r)?;
        let item = read_str(r)?;
        let variant = read_str(r)?;
        cosmetics.push(CosmeticSelection {
            slot,
            item,
            variant,
        });
    }

    let identity = read_identity(r)?;

    Ok(EntitySnapshot {
        pose,
        children,
        cosmetics,
        identity,
    })
}

/// Write one frame record.
pub fn write_frame<W: Write>(w: &mut W, frame: &FrameSnapshot) -> io::Result<()> {
    match &frame.puck {
        Some(pose) => {
            w.write_all(&[1])?;
            pose.write_to(w)?;
        }
        None => w.write_all(&[0])?,
    }

    write_u32(w, frame.entities.len())?;
    for entity in &frame.entities {
        write_entity(w, entity)?;
    }
    Ok(())
}

/// Read one frame record.
pub fn read_frame<R: Read>(r: &mut R) -> io::Result<FrameSnapshot> {
    let puck = if read_bool(r)? {
        Some(Pose::read_from(r)?)
    } else {
        None
    };

    let entity_count = read_u32(r)?;
    let mut entities = Vec::with_capacity(entity_count.min(MAX_PREALLOC));
    for _ in 0..entity_count {
        entities.push(read_entity(r)?);
    }

    Ok(FrameSnapshot { entities, puck })
}

/// Write a complete replay: header followed by every frame.
pub fn write_sequence<W: Write>(
    w: &mut W,
    sequence: &FrameSequence,
    interval_secs: f32,
) -> io::Result<()> {
    let header = ReplayHeader {
        frame_count: sequence.len() as u64,
        interval_secs,
    };
    header.write_to(w)?;
    for frame in sequence {
        write_frame(w, frame)?;
    }
    Ok(())
}

/// Read a complete replay.
///
/// Fails on truncated input and on bytes left over after the last frame.
pub fn read_sequence<R: Read>(r: &mut R) -> io::Result<(ReplayHeader, FrameSequence)> {
    let header = ReplayHeader::read_from(r)?;
    let count = usize::try_from(header.frame_count)
        .map_err(|_| invalid("Frame count exceeds address space"))?;

    let mut sequence = FrameSequence::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        sequence.push(read_frame(r)?);
    }

    let mut trailing = [0u8; 1];
    if r.read(&mut trailing)? != 0 {
        return Err(invalid("Trailing bytes after last frame"));
    }

    Ok((header, sequence))
}

/// Encode a replay into memory.
pub fn encode_sequence(sequence: &FrameSequence, interval_secs: f32) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_sequence(&mut buf, sequence, interval_secs)?;
    Ok(buf)
}

/// Decode a replay from memory.
pub fn decode_sequence(bytes: &[u8]) -> io::Result<(ReplayHeader, FrameSequence)> {
    let mut cursor = io::Cursor::new(bytes);
    read_sequence(&mut cursor)
}
