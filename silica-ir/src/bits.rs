//! Semantic bit-vector type

use crate::error::WidthError;
use std::fmt;

/// Semantic type of a signal: a width in bits plus a signedness flag.
///
/// Signedness influences extension, comparison and printing, never storage:
/// an `i8` wire holds the same eight bits whether it is interpreted as
/// signed or unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitVec {
    width: u32,
    signed: bool,
}

impl BitVec {
    /// Create an unsigned bit-vector type. Width must be strictly positive.
    pub fn unsigned(width: u32) -> Result<Self, WidthError> {
        Self::new(width, false)
    }

    /// Create a signed bit-vector type. Width must be strictly positive.
    pub fn signed(width: u32) -> Result<Self, WidthError> {
        Self::new(width, true)
    }

    /// Create a bit-vector type with explicit signedness.
    pub fn new(width: u32, signed: bool) -> Result<Self, WidthError> {
        if width == 0 {
            return Err(WidthError::ZeroWidth);
        }
        Ok(Self { width, signed })
    }

    /// The 1-bit unsigned type used for conditions, enables and flags.
    pub fn bool() -> Self {
        Self {
            width: 1,
            signed: false,
        }
    }

    /// Width in bits, always strictly positive.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Whether signed-sensitive operations interpret this wire in two's
    /// complement.
    pub const fn is_signed(&self) -> bool {
        self.signed
    }

    /// The same width with the signedness flag cleared.
    pub const fn as_unsigned(&self) -> Self {
        Self {
            width: self.width,
            signed: false,
        }
    }

    /// The same width with the signedness flag set.
    pub const fn as_signed(&self) -> Self {
        Self {
            width: self.width,
            signed: true,
        }
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_is_rejected() {
        assert_eq!(BitVec::unsigned(0), Err(WidthError::ZeroWidth));
        assert_eq!(BitVec::signed(0), Err(WidthError::ZeroWidth));
    }

    #[test]
    fn display_prints_the_width_without_signedness() {
        let u = BitVec::unsigned(8).unwrap();
        let s = BitVec::signed(8).unwrap();
        assert_eq!(u.to_string(), "i8");
        assert_eq!(s.to_string(), "i8");
        assert_ne!(u, s);
    }

    #[test]
    fn signedness_conversions_preserve_the_width() {
        let t = BitVec::signed(13).unwrap();
        assert_eq!(t.as_unsigned(), BitVec::unsigned(13).unwrap());
        assert_eq!(t.as_unsigned().as_signed(), t);
    }
}
