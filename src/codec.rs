//! Fixed-width numeric encoding shared with the peer firmware.
//!
//! Integers and floats travel as exactly four raw bytes, least significant
//! byte first. Floats are IEEE-754 single precision, bit-for-bit.
//!
//! The decoders are lenient: any buffer that is not exactly four bytes long
//! decodes to zero instead of failing. Existing callers rely on that, but it
//! also hides short reads, so prefer [`try_bytes_to_int32`] and
//! [`try_bytes_to_float32`] in new code.

/// Width in bytes of every numeric frame on the wire.
pub const WORD_LEN: usize = 4;

/// Decode a little-endian `i32`. Returns `0` unless `bytes` is exactly 4 long.
pub fn bytes_to_int32(bytes: &[u8]) -> i32 {
    try_bytes_to_int32(bytes).unwrap_or(0)
}

/// Encode an `i32` as four little-endian bytes.
pub fn int32_to_bytes(value: i32) -> [u8; WORD_LEN] {
    value.to_le_bytes()
}

/// Decode a little-endian IEEE-754 `f32`. Returns `0.0` unless `bytes` is exactly 4 long.
pub fn bytes_to_float32(bytes: &[u8]) -> f32 {
    try_bytes_to_float32(bytes).unwrap_or(0.0)
}

/// Encode an `f32` as its four little-endian IEEE-754 bytes.
pub fn float32_to_bytes(value: f32) -> [u8; WORD_LEN] {
    value.to_le_bytes()
}

/// Strict variant of [`bytes_to_int32`]: `None` on a length mismatch.
pub fn try_bytes_to_int32(bytes: &[u8]) -> Option<i32> {
    word(bytes).map(i32::from_le_bytes)
}

/// Strict variant of [`bytes_to_float32`]: `None` on a length mismatch.
pub fn try_bytes_to_float32(bytes: &[u8]) -> Option<f32> {
    word(bytes).map(f32::from_le_bytes)
}

fn word(bytes: &[u8]) -> Option<[u8; WORD_LEN]> {
    <[u8; WORD_LEN]>::try_from(bytes).ok()
}
