//! Overflow-safe fixed-point primitives.
//!
//! Every numeric stage of the engine goes through these helpers. Additions
//! clamp to the representable range instead of wrapping; multiplications
//! return the high half of the full-precision product.

/// Saturating signed 8-bit add.
#[inline]
pub fn sat_add8(a: i8, b: i8) -> i8 {
    a.saturating_add(b)
}

/// Saturating signed 16-bit add.
#[inline]
pub fn sat_add16(a: i16, b: i16) -> i16 {
    a.saturating_add(b)
}

/// Saturating signed 32-bit add.
#[inline]
pub fn sat_add32(a: i32, b: i32) -> i32 {
    a.saturating_add(b)
}

/// High 16 bits of the 24-bit product `a * b`.
///
/// Scales a 16-bit ramp by an 8-bit level: `mul_high_u16_u8(0xffff, 255)`
/// is `0xfeff`, i.e. just under `255 << 8`.
#[inline]
pub fn mul_high_u16_u8(a: u16, b: u8) -> u16 {
    ((a as u32 * b as u32) >> 8) as u16
}

/// High 16 bits of the 32-bit product `a * b`.
#[inline]
pub fn mul_high_u16_u16(a: u16, b: u16) -> u16 {
    ((a as u32 * b as u32) >> 16) as u16
}

/// High 16 bits of the signed 32-bit product `a * b`.
///
/// Rounds toward negative infinity, so `mul_high_s16_u16(-1, 1)` is `-1`.
#[inline]
pub fn mul_high_s16_u16(a: i16, b: u16) -> i16 {
    ((a as i32 * b as i32) >> 16) as i16
}
