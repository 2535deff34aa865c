//! Lexicographic successor and predecessor of byte strings.
//!
//! Name scans hand out the neighbour of the last name they returned as the
//! next page's starting point. Both functions work like carry/borrow on a
//! big-endian number of fixed width. The only exception is overflow: an
//! all-`0xFF` input grows by a `0x00` byte and an all-`0x00` input loses its
//! last byte, so the result always lies on the correct side of the input.

/// Increment `key` as a big-endian number, carrying from the last byte.
///
/// `[0xFF; n]` maps to `[0xFF; n] ‖ 0x00`.
#[must_use]
pub fn next_key(key: &[u8]) -> Vec<u8> {
    let mut out = key.to_vec();
    for byte in out.iter_mut().rev() {
        let (value, carried) = byte.overflowing_add(1);
        *byte = value;
        if !carried {
            return out;
        }
    }

    let mut grown = key.to_vec();
    grown.push(0);
    grown
}

/// Decrement `key` as a big-endian number, borrowing from the last byte.
///
/// `[0x00; n]` maps to `[0x00; n - 1]`; the empty string maps to itself.
#[must_use]
pub fn prev_key(key: &[u8]) -> Vec<u8> {
    let mut out = key.to_vec();
    for byte in out.iter_mut().rev() {
        let (value, borrowed) = byte.overflowing_sub(1);
        *byte = value;
        if !borrowed {
            return out;
        }
    }

    let mut shrunk = key.to_vec();
    shrunk.pop();
    shrunk
}
