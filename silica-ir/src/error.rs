//! Width validation error variants

use thiserror::Error;

/// A node constructor rejected its operand widths or attributes.
///
/// Every variant carries enough detail to point at the offending operand
/// without access to the graph that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidthError {
    /// A bit-vector type was requested with width zero.
    #[error("bit-vector width must be strictly positive")]
    ZeroWidth,

    /// Binary operands of an equal-width opcode differ in width.
    #[error("operand width mismatch for {op}: {left} vs {right}")]
    Mismatch {
        /// Opcode mnemonic.
        op: &'static str,
        /// Left operand width.
        left: u32,
        /// Right operand width.
        right: u32,
    },

    /// A 1-bit wire was required (select condition, write enable).
    #[error("{op} requires a 1-bit operand, got i{width}")]
    NonBool {
        /// Opcode mnemonic.
        op: &'static str,
        /// Offending operand width.
        width: u32,
    },

    /// Slice bounds violate `0 <= lo < hi <= width`.
    #[error("slice [{lo}:{hi}) out of range for i{width}")]
    BadSlice {
        /// Inclusive low bound.
        lo: u32,
        /// Exclusive high bound.
        hi: u32,
        /// Operand width.
        width: u32,
    },

    /// Bit index past the end of the operand.
    #[error("bit index {index} out of range for i{width}")]
    BadBitIndex {
        /// Requested bit position.
        index: u32,
        /// Operand width.
        width: u32,
    },

    /// Extension to a narrower width.
    #[error("{op} target width i{to} is narrower than operand i{from}")]
    ExtNarrow {
        /// Opcode mnemonic.
        op: &'static str,
        /// Operand width.
        from: u32,
        /// Requested target width.
        to: u32,
    },

    /// Constant value does not fit the requested width.
    #[error("constant {value} out of range for i{width} (signed={signed})")]
    ConstRange {
        /// Requested value.
        value: i128,
        /// Requested width.
        width: u32,
        /// Whether the constant was requested as signed.
        signed: bool,
    },

    /// Constant payloads are stored in 128 bits; wider constants cannot be
    /// represented (wider wires exist only as non-constant nodes).
    #[error("constant width i{width} exceeds the 128-bit constant storage")]
    ConstTooWide {
        /// Requested width.
        width: u32,
    },

    /// Per-byte write strobe does not match the write-data width.
    #[error("write strobe i{strobe} does not match write data i{data}")]
    StrobeMismatch {
        /// Strobe width.
        strobe: u32,
        /// Write-data width.
        data: u32,
    },

    /// Concatenation result width does not fit `u32`.
    #[error("concatenation width {hi} + {lo} overflows")]
    WidthOverflow {
        /// High operand width.
        hi: u32,
        /// Low operand width.
        lo: u32,
    },
}
