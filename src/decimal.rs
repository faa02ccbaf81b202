//! 16-byte packed decimal values
//!
//! A [`Decimal`] is a 96-bit unsigned magnitude together with a sign and a
//! base-10 scale in `0..=28`, packed into four 32-bit words in the order
//! `[lo, mid, hi, flags]`. The flags word holds the scale in bits 16..24 and
//! the sign in bit 31; every other bit is zero.
//!
//! On the wire a `Decimal` is the four words, each little-endian, in that
//! order. It is four integers, not one 128-bit integer.

use std::fmt::{Display, Formatter, Result as FmtResult};

const SCALE_SHIFT: u32 = 16;
const SCALE_MASK: u32 = 0x00ff_0000;
const SIGN_MASK: u32 = 0x8000_0000;

/// Largest scale a `Decimal` may carry
pub const MAX_SCALE: u8 = 28;

/// Fixed-point decimal stored as four 32-bit words
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Decimal {
    words: [u32; 4],
}

/// Reasons a set of words is not a well-formed `Decimal`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DecimalError {
    ScaleOutOfRange(u8),
    ReservedBits(u32),
}

impl Display for DecimalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DecimalError::ScaleOutOfRange(scale) => {
                write!(f, "decimal scale {scale} exceeds maximum of {MAX_SCALE}")
            }
            DecimalError::ReservedBits(flags) => {
                write!(f, "decimal flags word 0x{flags:08x} sets reserved bits")
            }
        }
    }
}

impl std::error::Error for DecimalError {}

impl Decimal {
    /// Builds a `Decimal` from its magnitude words, sign, and scale
    pub fn from_parts(
        lo: u32,
        mid: u32,
        hi: u32,
        negative: bool,
        scale: u8,
    ) -> Result<Self, DecimalError> {
        if scale > MAX_SCALE {
            return Err(DecimalError::ScaleOutOfRange(scale));
        }
        let mut flags = u32::from(scale) << SCALE_SHIFT;
        if negative {
            flags |= SIGN_MASK;
        }
        Ok(Self {
            words: [lo, mid, hi, flags],
        })
    }

    /// Validates and adopts raw `[lo, mid, hi, flags]` words
    pub fn from_words(words: [u32; 4]) -> Result<Self, DecimalError> {
        let flags = words[3];
        if flags & !(SCALE_MASK | SIGN_MASK) != 0 {
            return Err(DecimalError::ReservedBits(flags));
        }
        let scale = ((flags & SCALE_MASK) >> SCALE_SHIFT) as u8;
        if scale > MAX_SCALE {
            return Err(DecimalError::ScaleOutOfRange(scale));
        }
        Ok(Self { words })
    }

    /// Builds an integral `Decimal` (scale 0) from an `i64`
    #[must_use]
    pub fn from_i64(val: i64) -> Self {
        let magnitude = val.unsigned_abs();
        let mut flags = 0;
        if val < 0 {
            flags |= SIGN_MASK;
        }
        Self {
            words: [magnitude as u32, (magnitude >> 32) as u32, 0, flags],
        }
    }

    #[must_use]
    pub fn words(&self) -> [u32; 4] {
        self.words
    }

    /// 96-bit unsigned magnitude
    #[must_use]
    pub fn mantissa(&self) -> u128 {
        u128::from(self.words[0]) | u128::from(self.words[1]) << 32 | u128::from(self.words[2]) << 64
    }

    #[must_use]
    pub fn scale(&self) -> u8 {
        ((self.words[3] & SCALE_MASK) >> SCALE_SHIFT) as u8
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.words[3] & SIGN_MASK != 0
    }
}

impl From<i64> for Decimal {
    fn from(val: i64) -> Self {
        Self::from_i64(val)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let digits = self.mantissa().to_string();
        let scale = usize::from(self.scale());
        let sign = if self.is_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scaled() {
        let d = Decimal::from_parts(12345, 0, 0, true, 3).unwrap();
        assert_eq!(d.to_string(), "-12.345");
        let small = Decimal::from_parts(5, 0, 0, false, 2).unwrap();
        assert_eq!(small.to_string(), "0.05");
    }

    #[test]
    fn reserved_bits_rejected() {
        assert_eq!(
            Decimal::from_words([0, 0, 0, 1]),
            Err(DecimalError::ReservedBits(1))
        );
        assert_eq!(
            Decimal::from_parts(0, 0, 0, false, 29),
            Err(DecimalError::ScaleOutOfRange(29))
        );
    }

    #[test]
    fn from_i64_magnitude() {
        let d = Decimal::from(-0x1_0000_0002i64);
        assert_eq!(d.words(), [2, 1, 0, SIGN_MASK]);
        assert_eq!(d.mantissa(), 0x1_0000_0002);
    }
}
