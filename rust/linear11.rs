//! PMBus LINEAR11 decoding
//!
//! Telemetry words are 16 bits wide:
//!   15-11  - Exponent N (5-bit two's complement)
//!   10-0   - Mantissa Y (11-bit two's complement)
//!
//! Value = Y × 2^N. Called for almost every sensor read, so it stays
//! integer-only: the mantissa is multiplied by the output scale first and the
//! exponent is applied as a shift afterwards. Shifting first would throw away
//! the fractional bits for negative exponents.

/// Output scale factors.
pub mod scale {
    /// Whole units (RPM). Treated as a factor of 1.
    pub const UNITS: i64 = 0;
    /// Milli-units: mV, mA, m°C.
    pub const MILLI: i64 = 1_000;
    /// Micro-units: µW.
    pub const MICRO: i64 = 1_000_000;
}

/// Sign-extended 11-bit mantissa.
#[inline]
pub fn mantissa(value: u16) -> i64 {
    // Move bit 10 into the sign position, then shift back arithmetically.
    (((value << 5) as i16) >> 5) as i64
}

/// Sign-extended 5-bit exponent.
#[inline]
pub fn exponent(value: u16) -> i32 {
    ((value as i16) >> 11) as i32
}

/// Decode a LINEAR11 word into an integer in the requested unit.
///
/// `scale` is the number of output units per whole unit (1000 for milli,
/// 1_000_000 for micro). A scale of 0 returns whole units.
#[inline]
pub fn decode(value: u16, scale: i64) -> i64 {
    let factor = if scale == 0 { 1 } else { scale };
    let scaled = mantissa(value) * factor;
    let exp = exponent(value);

    if exp >= 0 {
        scaled << exp
    } else {
        scaled >> -exp
    }
}

/// Decode a little-endian LINEAR11 payload.
#[inline]
pub fn decode_le(bytes: [u8; 2], scale: i64) -> i64 {
    decode(u16::from_le_bytes(bytes), scale)
}
