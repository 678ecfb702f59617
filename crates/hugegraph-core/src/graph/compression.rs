//! Delta + varint compression for adjacency lists.
//!
//! Targets are stored in insertion order, so deltas can be negative. Each
//! delta is zig-zag mapped to an unsigned value and written as a LEB128
//! varint. The first delta is taken relative to the source node, which keeps
//! local neighbourhoods in one or two bytes per relationship.

use super::NodeId;

/// Map a signed delta onto an unsigned value (0, -1, 1, -2, ... -> 0, 1, 2, 3, ...)
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`]
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Append `value` as a LEB128 varint
#[inline]
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        output.push(byte);

        if val == 0 {
            break;
        }
    }
}

/// Read one varint from a byte stream.
///
/// Returns `None` if the stream ends early or the varint exceeds 64 bits.
#[inline]
pub fn decode_varint(input: &mut impl Iterator<Item = u8>) -> Option<u64> {
    let mut result = 0u64;
    let mut shift = 0;

    loop {
        let byte = input.next()?;
        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Some(result);
        }

        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
}

/// Append the compressed target list of `source` to `output`
pub fn encode_targets(source: NodeId, targets: &[NodeId], output: &mut Vec<u8>) {
    let mut previous = source;
    for &target in targets {
        let delta = target.wrapping_sub(previous) as i64;
        encode_varint(zigzag_encode(delta), output);
        previous = target;
    }
}

/// Apply a decoded delta to the previous target
#[inline]
pub fn apply_delta(previous: NodeId, encoded: u64) -> NodeId {
    previous.wrapping_add(zigzag_decode(encoded) as u64)
}
