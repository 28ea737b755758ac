//! Per-module scratch state
//!
//! One [`ModuleCore`] accumulates everything a builder declares: ports,
//! output sinks, registers, memories, submodule instances and the cosmetic
//! name-scope stack. Finalization freezes the pending register writes into
//! their next-state fold; a frozen module only serves emission.

use crate::error::{DesignError, Error, JitError};

use silica_ir::{BitVec, Graph, SigId};

/// A signal handle scoped to its owning module.
///
/// Wires are plain copies of a handle plus the derived type; passing a
/// wire into another module fails, hierarchy goes through instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    pub(crate) module: u64,
    pub(crate) id: SigId,
    pub(crate) ty: BitVec,
}

impl Wire {
    /// Width in bits.
    pub fn width(&self) -> u32 {
        self.ty.width()
    }

    /// Whether signed-sensitive operations interpret this wire in two's
    /// complement.
    pub fn is_signed(&self) -> bool {
        self.ty.is_signed()
    }

    /// The semantic bit-vector type.
    pub fn ty(&self) -> BitVec {
        self.ty
    }
}

/// A register handle. `q` is the read side: the previously committed
/// cycle's value, with no same-cycle fall-through.
#[derive(Debug, Clone, Copy)]
pub struct Reg {
    pub(crate) module: u64,
    pub(crate) index: usize,
    pub(crate) q: Wire,
}

impl Reg {
    /// The register's read-side wire.
    pub fn q(&self) -> Wire {
        self.q
    }
}

/// A mutable variable handle used by the control-flow lowerer to capture
/// assignments made under signal conditions.
#[derive(Debug, Clone, Copy)]
pub struct Var {
    pub(crate) module: u64,
    pub(crate) index: usize,
}

/// Role of a module argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// Clock port, width 1.
    Clock,
    /// Active-high synchronous reset port, width 1.
    Reset,
    /// Data input port.
    Data,
}

/// One declared module argument.
#[derive(Debug, Clone)]
pub struct PortDecl {
    /// Port name.
    pub name: String,
    /// Port type.
    pub ty: BitVec,
    /// Port role.
    pub kind: PortKind,
    /// Backing signal node.
    pub(crate) sig: SigId,
}

#[derive(Debug, Clone)]
pub(crate) struct RegRecord {
    pub name: String,
    pub clock: SigId,
    pub reset: SigId,
    pub ty: BitVec,
    pub init: u128,
    pub enable: Option<SigId>,
    pub q: SigId,
    /// Ordered pending writes; later entries override earlier ones on the
    /// same cycle.
    pub writes: Vec<(SigId, SigId)>,
    /// Frozen next-state fold, present after finalization.
    pub next: Option<SigId>,
}

#[derive(Debug, Clone)]
pub(crate) struct MemRecord {
    pub name: String,
    pub clock: SigId,
    pub reset: SigId,
    pub raddr: SigId,
    pub wvalid: SigId,
    pub waddr: SigId,
    pub wdata: SigId,
    pub wstrb: SigId,
    pub depth: u64,
    pub rdata: SigId,
    pub data_ty: BitVec,
}

#[derive(Debug, Clone)]
pub(crate) struct InstRecord {
    pub symbol: String,
    pub args: Vec<SigId>,
    /// Result ports: name, type and the `InstOut` node carrying the value.
    pub results: Vec<(String, BitVec, SigId)>,
}

/// Scratch state of one module under construction.
#[derive(Debug, Clone)]
pub(crate) struct ModuleCore {
    pub symbol: String,
    pub uid: u64,
    pub graph: Graph,
    pub args: Vec<PortDecl>,
    pub results: Vec<(String, SigId)>,
    pub scopes: Vec<String>,
    pub regs: Vec<RegRecord>,
    pub mems: Vec<MemRecord>,
    pub insts: Vec<InstRecord>,
    pub attrs: Vec<(String, String)>,
    pub frozen: bool,
}

impl ModuleCore {
    pub fn new(symbol: &str, uid: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            uid,
            graph: Graph::new(),
            args: Vec::new(),
            results: Vec::new(),
            scopes: Vec::new(),
            regs: Vec::new(),
            mems: Vec::new(),
            insts: Vec::new(),
            attrs: Vec::new(),
            frozen: false,
        }
    }

    /// Fully qualified name of a declaration under the current scope
    /// stack, dot-joined. Purely cosmetic for IR naming.
    pub fn scoped_name(&self, name: &str) -> String {
        if self.scopes.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.scopes.join("."), name)
        }
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
            return;
        }
        self.attrs.push((key.to_string(), value.to_string()));
    }

    pub fn check_unfrozen(&self) -> Result<(), Error> {
        if self.frozen {
            return Err(DesignError::FrozenModule {
                module: self.symbol.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Freeze the module: fold every register's pending writes into its
    /// next-state select chain, last write winning, and gate the fold with
    /// the default enable when one was declared.
    pub fn finalize(&mut self) -> Result<(), Error> {
        self.check_unfrozen()?;
        if !self.scopes.is_empty() {
            return Err(JitError::UnbalancedScope {
                module: self.symbol.clone(),
            }
            .into());
        }
        for index in 0..self.regs.len() {
            let q = self.regs[index].q;
            let writes = self.regs[index].writes.clone();
            let enable = self.regs[index].enable;
            let mut next = q;
            for (cond, data) in writes {
                next = self.graph.select(cond, data, next)?;
            }
            if let Some(enable) = enable {
                next = self.graph.select(enable, next, q)?;
            }
            self.regs[index].next = Some(next);
        }
        self.frozen = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_ir::{BitVec, Op, RegId};

    fn u8ty() -> BitVec {
        BitVec::unsigned(8).unwrap()
    }

    #[test]
    fn register_fold_is_last_write_wins() {
        let mut core = ModuleCore::new("m", 0);
        let clk = core.graph.clock("clk");
        let rst = core.graph.reset("rst");
        let a = core.graph.input("a", u8ty());
        let b = core.graph.input("b", u8ty());
        let c = core.graph.input("c", u8ty());
        let cond_b = core.graph.input("cond_b", BitVec::bool());
        let cond_c = core.graph.input("cond_c", BitVec::bool());
        let one = core.graph.constant(1, BitVec::bool()).unwrap();
        let q = core.graph.reg_q(RegId::new(0), u8ty());
        core.regs.push(RegRecord {
            name: "r".to_string(),
            clock: clk,
            reset: rst,
            ty: u8ty(),
            init: 0,
            enable: None,
            q,
            writes: vec![(one, a), (cond_b, b), (cond_c, c)],
            next: None,
        });
        core.finalize().unwrap();

        // select(cond_c, c, select(cond_b, b, a)): the unconditional first
        // write collapses select(1, a, q) to a.
        let next = core.regs[0].next.unwrap();
        let &Op::Select {
            cond,
            on_true,
            on_false,
        } = &core.graph.node(next).op
        else {
            panic!("next-state is not a select");
        };
        assert_eq!(cond, cond_c);
        assert_eq!(on_true, c);
        let &Op::Select {
            cond,
            on_true,
            on_false,
        } = &core.graph.node(on_false).op
        else {
            panic!("inner next-state is not a select");
        };
        assert_eq!(cond, cond_b);
        assert_eq!(on_true, b);
        assert_eq!(on_false, a);
    }

    #[test]
    fn default_enable_gates_the_whole_fold() {
        let mut core = ModuleCore::new("m", 0);
        let clk = core.graph.clock("clk");
        let rst = core.graph.reset("rst");
        let d = core.graph.input("d", u8ty());
        let en = core.graph.input("en", BitVec::bool());
        let one = core.graph.constant(1, BitVec::bool()).unwrap();
        let q = core.graph.reg_q(RegId::new(0), u8ty());
        core.regs.push(RegRecord {
            name: "r".to_string(),
            clock: clk,
            reset: rst,
            ty: u8ty(),
            init: 5,
            enable: Some(en),
            q,
            writes: vec![(one, d)],
            next: None,
        });
        core.finalize().unwrap();

        let next = core.regs[0].next.unwrap();
        let &Op::Select {
            cond,
            on_true,
            on_false,
        } = &core.graph.node(next).op
        else {
            panic!("next-state is not a select");
        };
        assert_eq!(cond, en);
        assert_eq!(on_true, d);
        assert_eq!(on_false, q);
    }

    #[test]
    fn register_with_no_writes_holds_its_value() {
        let mut core = ModuleCore::new("m", 0);
        let clk = core.graph.clock("clk");
        let rst = core.graph.reset("rst");
        let q = core.graph.reg_q(RegId::new(0), u8ty());
        core.regs.push(RegRecord {
            name: "r".to_string(),
            clock: clk,
            reset: rst,
            ty: u8ty(),
            init: 0,
            enable: None,
            q,
            writes: Vec::new(),
            next: None,
        });
        core.finalize().unwrap();
        assert_eq!(core.regs[0].next, Some(q));
    }

    #[test]
    fn scoped_names_join_with_dots() {
        let mut core = ModuleCore::new("m", 0);
        assert_eq!(core.scoped_name("r"), "r");
        core.scopes.push("fe".to_string());
        core.scopes.push("dec".to_string());
        assert_eq!(core.scoped_name("r"), "fe.dec.r");
    }

    #[test]
    fn finalize_rejects_unbalanced_scopes() {
        let mut core = ModuleCore::new("m", 0);
        core.scopes.push("left_open".to_string());
        assert!(core.finalize().is_err());
    }

    #[test]
    fn frozen_modules_reject_further_changes() {
        let mut core = ModuleCore::new("m", 0);
        core.finalize().unwrap();
        assert!(core.check_unfrozen().is_err());
        assert!(core.finalize().is_err());
    }
}
