//! Value-index token codec.
//!
//! Node values are not stored in the network file. Each possible value is
//! a short printable *token*: a base-85 rendering (RFC 1924 alphabet) of a
//! big-endian unsigned integer, which indexes the `values.json` dictionary.
//!
//! # Layout
//!
//! Encoding groups bytes 4-at-a-time into 5 characters; the final group
//! drops one character per padding byte, so a 2-byte index is a 3-character
//! token. Decoding pads the final group with the highest alphabet character
//! and drops the same number of bytes, which makes the round trip exact.
//!
//! Tokens are compared as plain strings everywhere inside the network;
//! decoding happens only when a value has to cross the API boundary.

use crate::error::ModelError;

/// The 85-character alphabet, in value order.
const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

/// Reverse lookup table: byte → alphabet value, `0xFF` for invalid bytes.
const fn reverse_table() -> [u8; 256] {
    let mut table = [0xFF_u8; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

const REVERSE: [u8; 256] = reverse_table();

/// Decode a token into its dictionary index.
///
/// The empty token decodes to 0 (an empty byte string).
///
/// # Errors
///
/// Returns [`ModelError::BadToken`] for bytes outside the alphabet, a
/// trailing group of one character, or a payload wider than a `u64`.
pub fn decode(token: &str) -> Result<u64, ModelError> {
    let bad = || ModelError::BadToken {
        token: token.to_string(),
    };

    let mut bytes: Vec<u8> = Vec::with_capacity(token.len());
    for chunk in token.as_bytes().chunks(5) {
        if chunk.len() == 1 {
            return Err(bad());
        }
        let padding = 5 - chunk.len();
        let mut acc: u64 = 0;
        for slot in 0..5 {
            let value = match chunk.get(slot) {
                Some(&byte) => {
                    let v = REVERSE[byte as usize];
                    if v == 0xFF {
                        return Err(bad());
                    }
                    u64::from(v)
                }
                None => 84, // pad with the highest character
            };
            acc = acc * 85 + value;
        }
        if acc > u64::from(u32::MAX) {
            return Err(bad());
        }
        let group = (acc as u32).to_be_bytes();
        bytes.extend_from_slice(&group[..4 - padding]);
    }

    // Strip leading zero bytes so wide-but-small payloads still fit.
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
    if significant.len() > 8 {
        return Err(bad());
    }
    let mut index: u64 = 0;
    for byte in significant {
        index = (index << 8) | u64::from(byte);
    }
    Ok(index)
}

/// Encode a dictionary index as its minimal token.
///
/// The inverse of [`decode`]: `decode(&encode(i)) == Ok(i)` for every `i`.
/// Used by asset tooling and test fixtures; the library itself only decodes.
#[must_use]
pub fn encode(index: u64) -> String {
    // Minimal big-endian byte string, at least one byte.
    let wide = index.to_be_bytes();
    let skip = wide.iter().take_while(|&&b| b == 0).count().min(7);
    let bytes = &wide[skip..];

    let mut out = String::new();
    for chunk in bytes.chunks(4) {
        let padding = 4 - chunk.len();
        let mut group = [0_u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut acc = u32::from_be_bytes(group);
        let mut chars = [0_u8; 5];
        for slot in chars.iter_mut().rev() {
            *slot = ALPHABET[(acc % 85) as usize];
            acc /= 85;
        }
        for &c in &chars[..5 - padding] {
            out.push(c as char);
        }
    }
    out
}
