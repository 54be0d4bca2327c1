//! Payload checksums for change detection.
//!
//! The checksum is a 32-bit rolling hash (`h * 31 + unit`) over the UTF-16 code
//! units of the compact JSON encoding of a payload, rendered in base 36. It is
//! stable across devices and cheap to compute, but it is not collision
//! resistant and must not be used for tamper evidence.

use serde_json::Value;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute the checksum of a payload.
pub fn checksum(payload: &Value) -> String {
    let hash = payload
        .to_string()
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });
    to_base36(hash)
}

fn to_base36(value: i32) -> String {
    let mut magnitude = i64::from(value).unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % 36) as usize]);
        magnitude /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}
