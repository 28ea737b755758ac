//! Interning signal graph
//!
//! One [`Graph`] per module under construction. Every constructor checks
//! the opcode's width rules, folds all-constant operands, applies the
//! mandatory identity simplifications and finally interns the node in the
//! structural-hash table, so semantically identical wires always share one
//! [`SigId`].

use crate::bits::BitVec;
use crate::error::WidthError;
use crate::fold;
use crate::node::{CmpVariant, InstId, MemId, Node, Op, RegId, SigId};

use std::collections::HashMap;

/// SSA expression graph of one module.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    interned: HashMap<Node, SigId>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, including folded constants.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node storage in creation order.
    pub fn node(&self, id: SigId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Derived type of a node.
    pub fn ty(&self, id: SigId) -> BitVec {
        self.nodes[id.index()].ty
    }

    /// Iterate nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SigId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (SigId::new(i), n))
    }

    /// The masked payload of a node, when it is a constant.
    pub fn const_value(&self, id: SigId) -> Option<u128> {
        match self.node(id).op {
            Op::Const { value } => Some(value),
            _ => None,
        }
    }

    fn intern(&mut self, op: Op, ty: BitVec) -> SigId {
        let node = Node { op, ty };
        if let Some(&id) = self.interned.get(&node) {
            return id;
        }
        let id = SigId::new(self.nodes.len());
        self.nodes.push(node.clone());
        self.interned.insert(node, id);
        id
    }

    /// Fold, simplify and intern a type-checked node.
    fn build(&mut self, op: Op, ty: BitVec) -> SigId {
        if let Some(value) = self.try_fold(&op, ty) {
            return self.intern(Op::Const { value }, ty);
        }
        match self.simplify(&op, ty) {
            Simplified::Existing(id) => id,
            Simplified::Rewrite(op, ty) => self.build(op, ty),
            Simplified::Keep => self.intern(op, ty),
        }
    }

    fn try_fold(&self, op: &Op, ty: BitVec) -> Option<u128> {
        if !op.is_pure() {
            return None;
        }
        let mut values = Vec::new();
        let mut widths = Vec::new();
        for operand in operands(op) {
            values.push(self.const_value(operand)?);
            widths.push(self.ty(operand).width());
        }
        fold::eval(op, &values, &widths, ty.width())
    }

    fn is_const(&self, id: SigId, value: u128) -> bool {
        self.const_value(id) == Some(value)
    }

    fn simplify(&self, op: &Op, ty: BitVec) -> Simplified {
        use Simplified::{Existing, Keep, Rewrite};
        match *op {
            Op::And(a, b) | Op::Or(a, b) if a == b => Existing(a),
            Op::Xor(a, b) if a == b => Rewrite(Op::Const { value: 0 }, ty),
            Op::And(a, b) if self.is_const(b, fold::mask(ty.width())) => Existing(a),
            Op::And(a, b) if self.is_const(a, fold::mask(ty.width())) => Existing(b),
            Op::Or(a, b) | Op::Xor(a, b) if self.is_const(b, 0) => Existing(a),
            Op::Or(a, b) | Op::Xor(a, b) if self.is_const(a, 0) => Existing(b),
            Op::Add(a, b) | Op::Sub(a, b) if self.is_const(b, 0) => Existing(a),
            Op::Add(a, b) if self.is_const(a, 0) => Existing(b),
            Op::Mul(a, b) if self.is_const(b, 1) => Existing(a),
            Op::Mul(a, b) if self.is_const(a, 1) => Existing(b),
            Op::Mul(a, b) if self.is_const(a, 0) || self.is_const(b, 0) => {
                Rewrite(Op::Const { value: 0 }, ty)
            }
            Op::ShlConst { value, amount: 0 }
            | Op::LshrConst { value, amount: 0 }
            | Op::AshrConst { value, amount: 0 } => Existing(value),
            Op::Select {
                on_true, on_false, ..
            } if on_true == on_false => Existing(on_true),
            Op::Select {
                cond,
                on_true,
                on_false,
            } => match self.const_value(cond) {
                Some(0) => Existing(on_false),
                Some(_) => Existing(on_true),
                None => Keep,
            },
            // Concatenation of adjacent slices of one signal covers the
            // joint range.
            Op::Concat { hi, lo } => {
                let (hi_op, lo_op) = (&self.node(hi).op, &self.node(lo).op);
                if let (
                    &Op::Slice {
                        value: hv,
                        lo: hlo,
                        hi: hhi,
                    },
                    &Op::Slice {
                        value: lv,
                        lo: llo,
                        hi: lhi,
                    },
                ) = (hi_op, lo_op)
                {
                    if hv == lv && lhi == hlo {
                        return Rewrite(
                            Op::Slice {
                                value: hv,
                                lo: llo,
                                hi: hhi,
                            },
                            ty,
                        );
                    }
                }
                Keep
            }
            Op::Slice { value, lo, hi }
                if lo == 0 && hi == self.ty(value).width() && !self.ty(value).is_signed() =>
            {
                Existing(value)
            }
            // Slicing a concatenation along the seam recovers an operand.
            Op::Slice { value, lo, hi } => {
                if let Op::Concat { hi: top, lo: bottom } = self.node(value).op {
                    let bottom_width = self.ty(bottom).width();
                    if lo == 0 && hi == bottom_width && !self.ty(bottom).is_signed() {
                        return Existing(bottom);
                    }
                    if lo == bottom_width
                        && hi == bottom_width + self.ty(top).width()
                        && !self.ty(top).is_signed()
                    {
                        return Existing(top);
                    }
                }
                Keep
            }
            Op::Zext { value, width } => {
                let vty = self.ty(value);
                if width == vty.width() && !vty.is_signed() {
                    return Existing(value);
                }
                if let Op::Zext { value: inner, .. } = self.node(value).op {
                    return Rewrite(Op::Zext { value: inner, width }, ty);
                }
                Keep
            }
            Op::Sext { value, width } => {
                let vty = self.ty(value);
                if width == vty.width() && vty.is_signed() {
                    return Existing(value);
                }
                if let Op::Sext { value: inner, .. } = self.node(value).op {
                    return Rewrite(Op::Sext { value: inner, width }, ty);
                }
                Keep
            }
            _ => Keep,
        }
    }
}

impl Graph {
    /// Create or dedupe a constant. Negative values require a signed type;
    /// out-of-range values fail.
    pub fn constant(&mut self, value: i128, ty: BitVec) -> Result<SigId, WidthError> {
        let payload = fold::encode_const(value, ty)?;
        Ok(self.intern(Op::Const { value: payload }, ty))
    }

    /// Declare an input port wire.
    pub fn input(&mut self, name: &str, ty: BitVec) -> SigId {
        self.intern(Op::Input { name: name.to_string() }, ty)
    }

    /// Declare a clock port wire, width 1.
    pub fn clock(&mut self, name: &str) -> SigId {
        self.intern(Op::Clock { name: name.to_string() }, BitVec::bool())
    }

    /// Declare a reset port wire, width 1.
    pub fn reset(&mut self, name: &str) -> SigId {
        self.intern(Op::Reset { name: name.to_string() }, BitVec::bool())
    }

    /// Read side of a register.
    pub fn reg_q(&mut self, reg: RegId, ty: BitVec) -> SigId {
        self.intern(Op::RegQ { reg }, ty)
    }

    /// Registered read data of a memory.
    pub fn mem_read(&mut self, mem: MemId, ty: BitVec) -> SigId {
        self.intern(Op::MemRead { mem }, ty)
    }

    /// One result port of a submodule instance.
    pub fn inst_out(&mut self, inst: InstId, port: u32, ty: BitVec) -> SigId {
        self.intern(Op::InstOut { inst, port }, ty)
    }

    /// Bitwise complement.
    pub fn not(&mut self, a: SigId) -> Result<SigId, WidthError> {
        let ty = self.ty(a);
        Ok(self.build(Op::Not(a), ty))
    }

    fn binary(
        &mut self,
        name: &'static str,
        make: fn(SigId, SigId) -> Op,
        a: SigId,
        b: SigId,
    ) -> Result<SigId, WidthError> {
        let (lt, rt) = (self.ty(a), self.ty(b));
        if lt.width() != rt.width() {
            return Err(WidthError::Mismatch {
                op: name,
                left: lt.width(),
                right: rt.width(),
            });
        }
        let ty = BitVec::new(lt.width(), lt.is_signed() && rt.is_signed())?;
        Ok(self.build(make(a, b), ty))
    }

    /// Bitwise AND of equal-width operands.
    pub fn and(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("and", Op::And, a, b)
    }

    /// Bitwise OR of equal-width operands.
    pub fn or(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("or", Op::Or, a, b)
    }

    /// Bitwise XOR of equal-width operands.
    pub fn xor(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("xor", Op::Xor, a, b)
    }

    /// Wrapping addition of equal-width operands.
    pub fn add(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("add", Op::Add, a, b)
    }

    /// Wrapping subtraction of equal-width operands.
    pub fn sub(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("sub", Op::Sub, a, b)
    }

    /// Wrapping multiplication of equal-width operands.
    pub fn mul(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("mul", Op::Mul, a, b)
    }

    /// Unsigned division; division by a zero constant is kept as a node.
    pub fn udiv(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("udiv", Op::Udiv, a, b)
    }

    /// Unsigned remainder.
    pub fn urem(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("urem", Op::Urem, a, b)
    }

    /// Signed division, truncated.
    pub fn sdiv(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("sdiv", Op::Sdiv, a, b)
    }

    /// Signed remainder.
    pub fn srem(&mut self, a: SigId, b: SigId) -> Result<SigId, WidthError> {
        self.binary("srem", Op::Srem, a, b)
    }

    /// Left shift by a constant amount.
    pub fn shl_const(&mut self, value: SigId, amount: u32) -> Result<SigId, WidthError> {
        let ty = self.ty(value);
        Ok(self.build(Op::ShlConst { value, amount }, ty))
    }

    /// Logical right shift by a constant amount.
    pub fn lshr_const(&mut self, value: SigId, amount: u32) -> Result<SigId, WidthError> {
        let ty = self.ty(value);
        Ok(self.build(Op::LshrConst { value, amount }, ty))
    }

    /// Arithmetic right shift by a constant amount.
    pub fn ashr_const(&mut self, value: SigId, amount: u32) -> Result<SigId, WidthError> {
        let ty = self.ty(value);
        Ok(self.build(Op::AshrConst { value, amount }, ty))
    }

    /// Comparison of equal-width operands, producing a 1-bit wire.
    pub fn cmp(&mut self, variant: CmpVariant, lhs: SigId, rhs: SigId) -> Result<SigId, WidthError> {
        let (lt, rt) = (self.ty(lhs), self.ty(rhs));
        if lt.width() != rt.width() {
            return Err(WidthError::Mismatch {
                op: variant.into(),
                left: lt.width(),
                right: rt.width(),
            });
        }
        Ok(self.build(Op::Cmp { variant, lhs, rhs }, BitVec::bool()))
    }

    /// Bit range `[lo, hi)` of a wire.
    pub fn slice(&mut self, value: SigId, lo: u32, hi: u32) -> Result<SigId, WidthError> {
        let width = self.ty(value).width();
        if lo >= hi || hi > width {
            return Err(WidthError::BadSlice { lo, hi, width });
        }
        let ty = BitVec::unsigned(hi - lo)?;
        Ok(self.build(Op::Slice { value, lo, hi }, ty))
    }

    /// Single bit of a wire, interned as the 1-wide slice at that position.
    pub fn bit(&mut self, value: SigId, index: u32) -> Result<SigId, WidthError> {
        let width = self.ty(value).width();
        if index >= width {
            return Err(WidthError::BadBitIndex { index, width });
        }
        self.slice(value, index, index + 1)
    }

    /// Concatenation; `hi` lands in the most significant bits.
    pub fn concat(&mut self, hi: SigId, lo: SigId) -> Result<SigId, WidthError> {
        let (hw, lw) = (self.ty(hi).width(), self.ty(lo).width());
        let width = hw
            .checked_add(lw)
            .ok_or(WidthError::WidthOverflow { hi: hw, lo: lw })?;
        let ty = BitVec::unsigned(width)?;
        Ok(self.build(Op::Concat { hi, lo }, ty))
    }

    /// Zero extension; the result is unsigned.
    pub fn zext(&mut self, value: SigId, width: u32) -> Result<SigId, WidthError> {
        let from = self.ty(value).width();
        if width < from {
            return Err(WidthError::ExtNarrow {
                op: "zext",
                from,
                to: width,
            });
        }
        let ty = BitVec::unsigned(width)?;
        Ok(self.build(Op::Zext { value, width }, ty))
    }

    /// Sign extension; the result is signed.
    pub fn sext(&mut self, value: SigId, width: u32) -> Result<SigId, WidthError> {
        let from = self.ty(value).width();
        if width < from {
            return Err(WidthError::ExtNarrow {
                op: "sext",
                from,
                to: width,
            });
        }
        let ty = BitVec::signed(width)?;
        Ok(self.build(Op::Sext { value, width }, ty))
    }

    /// 1-bit condition choosing between two equal-width wires.
    pub fn select(
        &mut self,
        cond: SigId,
        on_true: SigId,
        on_false: SigId,
    ) -> Result<SigId, WidthError> {
        let cw = self.ty(cond).width();
        if cw != 1 {
            return Err(WidthError::NonBool {
                op: "select",
                width: cw,
            });
        }
        let (tt, ft) = (self.ty(on_true), self.ty(on_false));
        if tt.width() != ft.width() {
            return Err(WidthError::Mismatch {
                op: "select",
                left: tt.width(),
                right: ft.width(),
            });
        }
        let ty = BitVec::new(tt.width(), tt.is_signed() && ft.is_signed())?;
        Ok(self.build(
            Op::Select {
                cond,
                on_true,
                on_false,
            },
            ty,
        ))
    }
}

enum Simplified {
    /// The node reduces to an existing signal.
    Existing(SigId),
    /// The node reduces to a different node; re-enter the build pipeline.
    Rewrite(Op, BitVec),
    /// No reduction applies.
    Keep,
}

fn operands(op: &Op) -> Vec<SigId> {
    match *op {
        Op::Const { .. }
        | Op::Input { .. }
        | Op::Clock { .. }
        | Op::Reset { .. }
        | Op::RegQ { .. }
        | Op::MemRead { .. }
        | Op::InstOut { .. } => Vec::new(),
        Op::Not(a)
        | Op::ShlConst { value: a, .. }
        | Op::LshrConst { value: a, .. }
        | Op::AshrConst { value: a, .. }
        | Op::Slice { value: a, .. }
        | Op::Zext { value: a, .. }
        | Op::Sext { value: a, .. } => vec![a],
        Op::And(a, b)
        | Op::Or(a, b)
        | Op::Xor(a, b)
        | Op::Add(a, b)
        | Op::Sub(a, b)
        | Op::Mul(a, b)
        | Op::Udiv(a, b)
        | Op::Urem(a, b)
        | Op::Sdiv(a, b)
        | Op::Srem(a, b)
        | Op::Cmp { lhs: a, rhs: b, .. }
        | Op::Concat { hi: a, lo: b } => vec![a, b],
        Op::Select {
            cond,
            on_true,
            on_false,
        } => vec![cond, on_true, on_false],
    }
}
