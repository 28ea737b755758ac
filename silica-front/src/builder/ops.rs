//! Combinational operations
//!
//! Thin wrappers over the graph constructors: ownership is checked here,
//! width rules and interning live in `silica-ir`. Variable-amount shifts
//! have no dedicated node; they desugar into the constant-shift ladder
//! selected by the bits of the amount.

use super::ModuleCtx;
use crate::error::{DesignError, Error};
use crate::module::Wire;

use silica_ir::CmpVariant;

impl ModuleCtx<'_> {
    /// Bitwise complement.
    pub fn not(&mut self, a: Wire) -> Result<Wire, Error> {
        let a = self.own(a)?;
        let id = self.core.graph.not(a)?;
        Ok(self.wire(id))
    }

    fn binary(
        &mut self,
        a: Wire,
        b: Wire,
        f: fn(&mut silica_ir::Graph, silica_ir::SigId, silica_ir::SigId) -> Result<silica_ir::SigId, silica_ir::WidthError>,
    ) -> Result<Wire, Error> {
        let a = self.own(a)?;
        let b = self.own(b)?;
        let id = f(&mut self.core.graph, a, b)?;
        Ok(self.wire(id))
    }

    /// Bitwise AND.
    pub fn and(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::and)
    }

    /// Bitwise OR.
    pub fn or(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::or)
    }

    /// Bitwise XOR.
    pub fn xor(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::xor)
    }

    /// Wrapping addition.
    pub fn add(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::add)
    }

    /// Wrapping subtraction.
    pub fn sub(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::sub)
    }

    /// Wrapping multiplication.
    pub fn mul(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::mul)
    }

    /// Unsigned division.
    pub fn udiv(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::udiv)
    }

    /// Unsigned remainder.
    pub fn urem(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::urem)
    }

    /// Signed division, truncated.
    pub fn sdiv(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::sdiv)
    }

    /// Signed remainder.
    pub fn srem(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.binary(a, b, silica_ir::Graph::srem)
    }

    /// Left shift by a constant amount.
    pub fn shl(&mut self, value: Wire, amount: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.shl_const(v, amount)?;
        Ok(self.wire(id))
    }

    /// Logical right shift by a constant amount.
    pub fn lshr(&mut self, value: Wire, amount: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.lshr_const(v, amount)?;
        Ok(self.wire(id))
    }

    /// Arithmetic right shift by a constant amount.
    pub fn ashr(&mut self, value: Wire, amount: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.ashr_const(v, amount)?;
        Ok(self.wire(id))
    }

    /// Comparison by variant.
    pub fn cmp(&mut self, variant: CmpVariant, a: Wire, b: Wire) -> Result<Wire, Error> {
        let a = self.own(a)?;
        let b = self.own(b)?;
        let id = self.core.graph.cmp(variant, a, b)?;
        Ok(self.wire(id))
    }

    /// Equality.
    pub fn eq(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Eq, a, b)
    }

    /// Inequality.
    pub fn ne(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Ne, a, b)
    }

    /// Unsigned less than.
    pub fn ult(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Ult, a, b)
    }

    /// Unsigned less than or equal.
    pub fn ule(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Ule, a, b)
    }

    /// Unsigned greater than.
    pub fn ugt(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Ugt, a, b)
    }

    /// Unsigned greater than or equal.
    pub fn uge(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Uge, a, b)
    }

    /// Signed less than.
    pub fn slt(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Slt, a, b)
    }

    /// Signed less than or equal.
    pub fn sle(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Sle, a, b)
    }

    /// Signed greater than.
    pub fn sgt(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Sgt, a, b)
    }

    /// Signed greater than or equal.
    pub fn sge(&mut self, a: Wire, b: Wire) -> Result<Wire, Error> {
        self.cmp(CmpVariant::Sge, a, b)
    }

    /// Single bit at `index`, width 1.
    pub fn bit(&mut self, value: Wire, index: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.bit(v, index)?;
        Ok(self.wire(id))
    }

    /// Bit range `[lo, hi)`.
    pub fn slice(&mut self, value: Wire, lo: u32, hi: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.slice(v, lo, hi)?;
        Ok(self.wire(id))
    }

    /// Concatenate wires left-to-right, high-to-low.
    pub fn cat(&mut self, parts: &[Wire]) -> Result<Wire, Error> {
        let mut iter = parts.iter();
        let first = iter.next().ok_or(DesignError::EmptyConcat)?;
        let mut acc = self.own(*first)?;
        for part in iter {
            let low = self.own(*part)?;
            acc = self.core.graph.concat(acc, low)?;
        }
        Ok(self.wire(acc))
    }

    /// Zero extension; the result is unsigned.
    pub fn zext(&mut self, value: Wire, width: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.zext(v, width)?;
        Ok(self.wire(id))
    }

    /// Sign extension; the result is signed.
    pub fn sext(&mut self, value: Wire, width: u32) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let id = self.core.graph.sext(v, width)?;
        Ok(self.wire(id))
    }

    /// 1-bit condition choosing between two equal-width wires.
    pub fn select(&mut self, cond: Wire, on_true: Wire, on_false: Wire) -> Result<Wire, Error> {
        let c = self.own(cond)?;
        let t = self.own(on_true)?;
        let f = self.own(on_false)?;
        let id = self.core.graph.select(c, t, f)?;
        Ok(self.wire(id))
    }

    /// Left shift by a signal amount: a ladder of constant shifts, one
    /// stage per amount bit, with any bit past the ladder forcing zero.
    pub fn shl_by(&mut self, value: Wire, amount: Wire) -> Result<Wire, Error> {
        self.shift_by(value, amount, ShiftKind::Shl)
    }

    /// Logical right shift by a signal amount.
    pub fn lshr_by(&mut self, value: Wire, amount: Wire) -> Result<Wire, Error> {
        self.shift_by(value, amount, ShiftKind::Lshr)
    }

    /// Arithmetic right shift by a signal amount.
    pub fn ashr_by(&mut self, value: Wire, amount: Wire) -> Result<Wire, Error> {
        self.shift_by(value, amount, ShiftKind::Ashr)
    }

    fn shift_by(&mut self, value: Wire, amount: Wire, kind: ShiftKind) -> Result<Wire, Error> {
        let v = self.own(value)?;
        let a = self.own(amount)?;
        let width = value.width();
        let stages = if width <= 1 {
            0
        } else {
            32 - (width - 1).leading_zeros()
        };
        let g = &mut self.core.graph;
        let mut out = v;
        for i in 0..stages.min(amount.width()) {
            let bit = g.bit(a, i)?;
            let step = 1u32 << i;
            let shifted = match kind {
                ShiftKind::Shl => g.shl_const(out, step)?,
                ShiftKind::Lshr => g.lshr_const(out, step)?,
                ShiftKind::Ashr => g.ashr_const(out, step)?,
            };
            out = g.select(bit, shifted, out)?;
        }
        // Amount bits the ladder cannot express mean a shift past the
        // width: zero for logical shifts, sign fill for arithmetic.
        if amount.width() > stages {
            let high = g.slice(a, stages, amount.width())?;
            let zero = g.constant(0, g.ty(high))?;
            let past = g.cmp(CmpVariant::Ne, high, zero)?;
            let fill = match kind {
                ShiftKind::Shl | ShiftKind::Lshr => g.constant(0, value.ty().as_unsigned())?,
                ShiftKind::Ashr => g.ashr_const(v, width.saturating_sub(1))?,
            };
            out = g.select(past, fill, out)?;
        }
        Ok(self.wire(out))
    }
}

#[derive(Clone, Copy)]
enum ShiftKind {
    Shl,
    Lshr,
    Ashr,
}
