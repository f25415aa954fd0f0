//! HOTP (RFC 4226) and TOTP (RFC 6238) over HMAC-SHA1.
//!
//! Codes must match what real authenticator apps produce, so the
//! truncation below follows RFC 4226 §5.3 exactly.
//!
//! ## Usage
//!
//! ```ignore
//! let secret = generate_secret(20)?;
//! let code = generate_totp(&secret, now_ms, &TotpParams::default(), 0)?;
//! assert!(verify_totp(&secret, &code, now_ms, &TotpParams::default()));
//! ```

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::base32;
use crate::error::{CoreError, Result};

pub const DEFAULT_STEP_SECONDS: u64 = 30;
pub const DEFAULT_DIGITS: u32 = 6;
pub const DEFAULT_TOLERANCE_WINDOW: u32 = 1;
/// Widest skew tolerance accepted, in steps either side.
pub const MAX_TOLERANCE_WINDOW: u32 = 10;
pub const DEFAULT_SECRET_BYTES: usize = 20;

type HmacSha1 = Hmac<Sha1>;

/// Time-step, length and skew tolerance shared by generation and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpParams {
    pub step_seconds: u64,
    pub digits: u32,
    /// Number of steps accepted on either side of the current one.
    pub tolerance_window: u32,
}

impl Default for TotpParams {
    fn default() -> Self {
        Self {
            step_seconds: DEFAULT_STEP_SECONDS,
            digits: DEFAULT_DIGITS,
            tolerance_window: DEFAULT_TOLERANCE_WINDOW,
        }
    }
}

/// Generate a fresh Base32 secret of `byte_length` bytes from the OS CSPRNG.
pub fn generate_secret(byte_length: usize) -> Result<String> {
    let mut bytes = vec![0u8; byte_length];
    getrandom::getrandom(&mut bytes).map_err(|e| CoreError::Entropy(e.to_string()))?;
    Ok(base32::encode(&bytes))
}

/// RFC 4226 HOTP value for `counter`, zero-padded to `digits`.
pub fn hotp(secret: &str, counter: u64, digits: u32) -> Result<String> {
    let key = base32::decode(secret)?;
    Ok(hotp_raw(&key, counter, digits))
}

fn hotp_raw(key: &[u8], counter: u64, digits: u32) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take keys of any size");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    let value = match 10u64.checked_pow(digits) {
        Some(modulus) => u64::from(binary) % modulus,
        None => u64::from(binary),
    };
    format!("{value:0>width$}", width = digits as usize)
}

/// Counter for the step containing `timestamp_ms`, shifted by `window_offset` steps.
pub fn time_counter(timestamp_ms: i64, step_seconds: u64, window_offset: i64) -> u64 {
    let step_ms = (step_seconds.max(1) as i64).saturating_mul(1000);
    let counter = timestamp_ms.div_euclid(step_ms).saturating_add(window_offset);
    counter.max(0) as u64
}

/// TOTP code for the step containing `timestamp_ms`, shifted by `window_offset` steps.
pub fn generate_totp(
    secret: &str,
    timestamp_ms: i64,
    params: &TotpParams,
    window_offset: i64,
) -> Result<String> {
    let counter = time_counter(timestamp_ms, params.step_seconds, window_offset);
    hotp(secret, counter, params.digits)
}

/// Check `submitted` against every step in `[-tolerance, +tolerance]` around `now_ms`.
///
/// Returns `false` (never an error) for empty or wrong-length codes and for
/// secrets that are not valid Base32.
pub fn verify_totp(secret: &str, submitted: &str, now_ms: i64, params: &TotpParams) -> bool {
    let code = submitted.trim();
    if code.is_empty() || code.chars().count() != params.digits as usize {
        return false;
    }
    let Ok(key) = base32::decode(&base32::normalize(secret)) else {
        return false;
    };

    let window = i64::from(params.tolerance_window.min(MAX_TOLERANCE_WINDOW));
    let mut matched = false;
    for offset in -window..=window {
        let counter = time_counter(now_ms, params.step_seconds, offset);
        let candidate = hotp_raw(&key, counter, params.digits);
        // No early exit: all candidates are compared.
        matched |= constant_time_eq(code.as_bytes(), candidate.as_bytes());
    }
    matched
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Build the `otpauth://totp/...` provisioning URI scanned by authenticator apps.
pub fn build_otpauth_uri(secret: &str, label: &str, issuer: &str) -> String {
    build_otpauth_uri_with(secret, label, issuer, &TotpParams::default())
}

/// [`build_otpauth_uri`] advertising non-default digits or period.
pub fn build_otpauth_uri_with(secret: &str, label: &str, issuer: &str, params: &TotpParams) -> String {
    format!(
        "otpauth://totp/{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(label),
        base32::normalize(secret),
        urlencoding::encode(issuer),
        params.digits,
        params.step_seconds,
    )
}
