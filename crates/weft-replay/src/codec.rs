//! Binary encode/decode for the trace format.
//!
//! All integers are little-endian. There is no compression, no alignment
//! padding and no self-describing schema: a header followed by tagged
//! fixed-size records.

use std::io::{ErrorKind, Read, Write};

use weft_core::ActorId;

use crate::error::ReplayError;
use crate::types::{Record, Transition};
use crate::{FORMAT_VERSION, MAGIC};

/// Record tag for [`Record::Draw`].
pub const TAG_DRAW: u8 = 1;
/// Record tag for [`Record::Transition`].
pub const TAG_TRANSITION: u8 = 2;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), ReplayError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, ReplayError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ReplayError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ReplayError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, ReplayError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

// ── Header ──────────────────────────────────────────────────────

/// Encode the stream header (magic, version, seed).
pub fn encode_header(w: &mut dyn Write, seed: u64) -> Result<(), ReplayError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u64_le(w, seed)?;
    Ok(())
}

/// Decode and validate the stream header, returning the seed.
pub fn decode_header(r: &mut dyn Read) -> Result<u64, ReplayError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(ReplayError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion { found: version });
    }
    read_u64_le(r)
}

// ── Records ─────────────────────────────────────────────────────

/// Encode a single record.
pub fn encode_record(w: &mut dyn Write, record: &Record) -> Result<(), ReplayError> {
    match record {
        Record::Draw(v) => {
            write_u8(w, TAG_DRAW)?;
            write_i32_le(w, *v)?;
        }
        Record::Transition(t) => {
            write_u8(w, TAG_TRANSITION)?;
            write_u32_le(w, t.actor.0)?;
            write_i32_le(w, t.value)?;
        }
    }
    Ok(())
}

/// Decode the next record, or `None` on a clean end of stream.
///
/// End of stream is only clean at a record boundary; a tag without its
/// body is reported as [`ReplayError::MalformedRecord`].
pub fn decode_record(r: &mut dyn Read) -> Result<Option<Record>, ReplayError> {
    let mut tag = [0u8; 1];
    loop {
        match r.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReplayError::Io(e)),
        }
    }
    let truncated = |e: ReplayError| match e {
        ReplayError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
            ReplayError::MalformedRecord {
                detail: format!("truncated record with tag {}", tag[0]),
            }
        }
        other => other,
    };
    match tag[0] {
        TAG_DRAW => Ok(Some(Record::Draw(read_i32_le(r).map_err(truncated)?))),
        TAG_TRANSITION => {
            let actor = ActorId(read_u32_le(r).map_err(truncated)?);
            let value = read_i32_le(r).map_err(truncated)?;
            Ok(Some(Record::Transition(Transition { actor, value })))
        }
        other => Err(ReplayError::MalformedRecord {
            detail: format!("unknown record tag {other}"),
        }),
    }
}
