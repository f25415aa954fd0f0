//! RFC 4648 Base32 codec for shared secrets.
//!
//! Encoding emits no `=` padding; a partial trailing group is filled with
//! zero bits before its final symbol. Decoding ignores case and whitespace,
//! and drops leftover bits that do not make up a whole byte.

use thiserror::Error;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Malformed Base32 input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Base32Error {
    #[error("invalid base32 character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

/// Upper-case and strip all whitespace. Authenticator apps show secrets in
/// spaced groups; this is the form written into `otpauth://` URIs.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn encode(bytes: &[u8]) -> String {
    let mut output = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits_left = 0u32;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits_left += 8;
        while bits_left >= 5 {
            bits_left -= 5;
            output.push(ALPHABET[((buffer >> bits_left) & 0x1f) as usize] as char);
        }
        // Only the low `bits_left` bits are still pending.
        buffer &= (1 << bits_left) - 1;
    }

    if bits_left > 0 {
        output.push(ALPHABET[((buffer << (5 - bits_left)) & 0x1f) as usize] as char);
    }
    output
}

pub fn decode(text: &str) -> Result<Vec<u8>, Base32Error> {
    let mut bytes = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits_left = 0u32;

    for (position, character) in text.chars().enumerate() {
        if character.is_whitespace() {
            continue;
        }
        let value = symbol_value(character)
            .ok_or(Base32Error::InvalidCharacter { character, position })?;
        buffer = (buffer << 5) | value;
        bits_left += 5;
        if bits_left >= 8 {
            bits_left -= 8;
            bytes.push(((buffer >> bits_left) & 0xff) as u8);
        }
        buffer &= (1 << bits_left) - 1;
    }
    Ok(bytes)
}

fn symbol_value(character: char) -> Option<u32> {
    match character.to_ascii_uppercase() {
        c @ 'A'..='Z' => Some(c as u32 - 'A' as u32),
        c @ '2'..='7' => Some(c as u32 - '2' as u32 + 26),
        _ => None,
    }
}
