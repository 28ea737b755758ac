//! Stateful elements
//!
//! Registers carry an ordered pending-writes list; the fold into the
//! next-state select chain happens at module finalization. Byte memories
//! are declared with all their ports up front and expose only the
//! registered read-data wire.

use super::ModuleCtx;
use crate::error::{DesignError, Error};
use crate::module::{MemRecord, Reg, RegRecord, Wire};

use silica_ir::{encode_const, BitVec, MemId, RegId, WidthError};

/// Register declaration.
#[derive(Debug, Clone, Copy)]
pub struct RegSpec {
    /// Clock wire, width 1.
    pub clock: Wire,
    /// Active-high synchronous reset wire, width 1.
    pub reset: Wire,
    /// Register width.
    pub width: u32,
    /// Reset value, a constant of the register's width.
    pub init: i128,
    /// Optional default enable; when present it gates every write.
    pub enable: Option<Wire>,
}

/// Byte-addressable memory declaration. Reads return one cycle later;
/// writes land when `wvalid` is high, one per cycle, updating the strobed
/// bytes.
#[derive(Debug, Clone, Copy)]
pub struct MemSpec {
    /// Clock wire, width 1.
    pub clock: Wire,
    /// Reset wire, width 1.
    pub reset: Wire,
    /// Read address.
    pub raddr: Wire,
    /// Write valid, width 1.
    pub wvalid: Wire,
    /// Write address.
    pub waddr: Wire,
    /// Write data; the width must be a whole number of bytes.
    pub wdata: Wire,
    /// Per-byte write strobe, one bit per data byte.
    pub wstrb: Wire,
    /// Depth in bytes.
    pub depth: u64,
}

impl ModuleCtx<'_> {
    fn bool_wire(&self, wire: Wire, op: &'static str) -> Result<silica_ir::SigId, Error> {
        let id = self.own(wire)?;
        if wire.width() != 1 {
            return Err(WidthError::NonBool {
                op,
                width: wire.width(),
            }
            .into());
        }
        Ok(id)
    }

    /// Declare a register and return its handle; the `q` side reads the
    /// previously committed cycle's value.
    pub fn register(&mut self, name: &str, spec: RegSpec) -> Result<Reg, Error> {
        self.core.check_unfrozen()?;
        let clock = self.bool_wire(spec.clock, "register clock")?;
        let reset = self.bool_wire(spec.reset, "register reset")?;
        let enable = match spec.enable {
            Some(wire) => Some(self.bool_wire(wire, "register enable")?),
            None => None,
        };
        let ty = BitVec::unsigned(spec.width)?;
        let init = encode_const(spec.init, ty)?;
        let full_name = self.core.scoped_name(name);
        let index = self.core.regs.len();
        let q = self.core.graph.reg_q(RegId::new(index as u32), ty);
        self.core.regs.push(RegRecord {
            name: full_name,
            clock,
            reset,
            ty,
            init,
            enable,
            q,
            writes: Vec::new(),
            next: None,
        });
        Ok(Reg {
            module: self.core.uid,
            index,
            q: self.wire(q),
        })
    }

    /// Unconditional write: sugar for a write whose condition is constant
    /// one. Later writes override earlier ones on the same cycle.
    pub fn reg_set(&mut self, reg: Reg, data: Wire) -> Result<(), Error> {
        let one = self.lit(1, 1)?;
        self.reg_set_when(reg, data, one)
    }

    /// Conditional write. Inside a conditional region the branch's path
    /// condition is AND-combined into `when`.
    pub fn reg_set_when(&mut self, reg: Reg, data: Wire, when: Wire) -> Result<(), Error> {
        self.core.check_unfrozen()?;
        if reg.module != self.core.uid {
            return Err(DesignError::ForeignWire {
                module: self.core.symbol.clone(),
            }
            .into());
        }
        let data_id = self.own(data)?;
        let when_id = self.bool_wire(when, "register write enable")?;
        let reg_ty = self.core.regs[reg.index].ty;
        if data.width() != reg_ty.width() {
            return Err(WidthError::Mismatch {
                op: "reg.set",
                left: reg_ty.width(),
                right: data.width(),
            }
            .into());
        }
        let cond = match self.path_cond()? {
            Some(path) => self.core.graph.and(path, when_id)?,
            None => when_id,
        };
        self.core.regs[reg.index].writes.push((cond, data_id));
        Ok(())
    }

    /// Declare a byte-addressable memory and return its read-data wire.
    pub fn byte_mem(&mut self, name: &str, spec: MemSpec) -> Result<Wire, Error> {
        self.core.check_unfrozen()?;
        let clock = self.bool_wire(spec.clock, "memory clock")?;
        let reset = self.bool_wire(spec.reset, "memory reset")?;
        let raddr = self.own(spec.raddr)?;
        let wvalid = self.bool_wire(spec.wvalid, "memory write valid")?;
        let waddr = self.own(spec.waddr)?;
        let wdata = self.own(spec.wdata)?;
        let wstrb = self.own(spec.wstrb)?;
        let data_width = spec.wdata.width();
        if data_width % 8 != 0 || spec.wstrb.width() != data_width / 8 {
            return Err(WidthError::StrobeMismatch {
                strobe: spec.wstrb.width(),
                data: data_width,
            }
            .into());
        }
        if spec.depth == 0 {
            return Err(DesignError::BadDepth {
                name: name.to_string(),
            }
            .into());
        }
        let data_ty = BitVec::unsigned(data_width)?;
        let full_name = self.core.scoped_name(name);
        let index = self.core.mems.len();
        let rdata = self.core.graph.mem_read(MemId::new(index as u32), data_ty);
        self.core.mems.push(MemRecord {
            name: full_name,
            clock,
            reset,
            raddr,
            wvalid,
            waddr,
            wdata,
            wstrb,
            depth: spec.depth,
            rdata,
            data_ty,
        });
        Ok(self.wire(rdata))
    }
}
