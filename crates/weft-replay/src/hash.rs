//! Hashing utilities for history comparison.
//!
//! Uses FNV-1a for fast, deterministic hashing of scheduling histories.
//! These hashes are not cryptographically secure; they are used for
//! fast equality checks between runs.

use weft_core::{ActorId, CallKind};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Hash a history of `(actor, call_kind)` pairs.
///
/// Order matters. Returns `FNV_OFFSET` (non-zero) for an empty history.
pub fn history_hash(history: &[(ActorId, CallKind)]) -> u64 {
    history.iter().fold(FNV_OFFSET, |hash, (actor, kind)| {
        fnv1a_byte(fnv1a_u32(hash, actor.0), kind.code())
    })
}
