//! Module builder context
//!
//! [`ModuleCtx`] is what a builder function sees: the module under
//! construction plus a handle back into the design context so submodule
//! instantiation can re-enter the specialization pipeline. The context
//! runs in one of two modes. In the lowering mode conditional regions over
//! signals are captured and merged into multiplexer networks; in the
//! elaboration fallback only straight data flow is available.

mod control;
mod hierarchy;
mod ops;
mod state;

pub use hierarchy::InstanceOuts;
pub use state::{MemSpec, RegSpec};

use crate::component::BuilderOut;
use crate::design::DesignContext;
use crate::error::{DesignError, Error};
use crate::module::{ModuleCore, PortDecl, PortKind, Var, Wire};
use crate::params::{PortSpec, PortSpecs};

use control::{CondFrame, VarSlot};
use silica_ir::{BitVec, SigId};

/// Which execution path is driving the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LowerMode {
    /// Control-flow lowering: conditionals over signals become mux trees.
    Jit,
    /// Elaboration fallback: plain host execution, data flow only.
    Elab,
}

/// The builder-facing view of one module under construction.
pub struct ModuleCtx<'c> {
    pub(crate) ctx: &'c mut DesignContext,
    pub(crate) core: ModuleCore,
    mode: LowerMode,
    frames: Vec<CondFrame>,
    vars: Vec<VarSlot>,
}

impl<'c> ModuleCtx<'c> {
    pub(crate) fn new(
        ctx: &'c mut DesignContext,
        symbol: &str,
        uid: u64,
        mode: LowerMode,
    ) -> Self {
        Self {
            ctx,
            core: ModuleCore::new(symbol, uid),
            mode,
            frames: Vec::new(),
            vars: Vec::new(),
        }
    }

    /// Symbol of the module under construction.
    pub fn symbol(&self) -> &str {
        &self.core.symbol
    }

    pub(crate) fn mode(&self) -> LowerMode {
        self.mode
    }

    pub(crate) fn frames(&self) -> &[CondFrame] {
        &self.frames
    }

    pub(crate) fn frames_mut(&mut self) -> &mut Vec<CondFrame> {
        &mut self.frames
    }

    pub(crate) fn vars_mut(&mut self) -> &mut Vec<VarSlot> {
        &mut self.vars
    }

    pub(crate) fn vars(&self) -> &[VarSlot] {
        &self.vars
    }

    /// Reject wires owned by a different module.
    pub(crate) fn own(&self, wire: Wire) -> Result<SigId, Error> {
        if wire.module != self.core.uid {
            return Err(DesignError::ForeignWire {
                module: self.core.symbol.clone(),
            }
            .into());
        }
        Ok(wire.id)
    }

    pub(crate) fn own_var(&self, var: Var) -> Result<usize, Error> {
        if var.module != self.core.uid {
            return Err(DesignError::ForeignWire {
                module: self.core.symbol.clone(),
            }
            .into());
        }
        Ok(var.index)
    }

    pub(crate) fn wire(&self, id: SigId) -> Wire {
        Wire {
            module: self.core.uid,
            id,
            ty: self.core.graph.ty(id),
        }
    }

    fn declare_port(&mut self, name: &str, ty: BitVec, kind: PortKind) -> Result<Wire, Error> {
        self.core.check_unfrozen()?;
        if self.core.args.iter().any(|port| port.name == name) {
            return Err(DesignError::DuplicatePort {
                name: name.to_string(),
                module: self.core.symbol.clone(),
            }
            .into());
        }
        let sig = match kind {
            PortKind::Clock => self.core.graph.clock(name),
            PortKind::Reset => self.core.graph.reset(name),
            PortKind::Data => self.core.graph.input(name, ty),
        };
        self.core.args.push(PortDecl {
            name: name.to_string(),
            ty,
            kind,
            sig,
        });
        Ok(self.wire(sig))
    }

    /// Declare an unsigned input port.
    pub fn input(&mut self, name: &str, width: u32) -> Result<Wire, Error> {
        let ty = BitVec::unsigned(width)?;
        self.declare_port(name, ty, PortKind::Data)
    }

    /// Declare a signed input port.
    pub fn input_signed(&mut self, name: &str, width: u32) -> Result<Wire, Error> {
        let ty = BitVec::signed(width)?;
        self.declare_port(name, ty, PortKind::Data)
    }

    /// Declare a clock port, width 1.
    pub fn clock(&mut self, name: &str) -> Result<Wire, Error> {
        self.declare_port(name, BitVec::bool(), PortKind::Clock)
    }

    /// Declare an active-high synchronous reset port, width 1.
    pub fn reset(&mut self, name: &str) -> Result<Wire, Error> {
        self.declare_port(name, BitVec::bool(), PortKind::Reset)
    }

    /// Look up an already-declared argument, e.g. a signature-bound port.
    pub fn arg(&self, name: &str) -> Result<Wire, Error> {
        let port = self
            .core
            .args
            .iter()
            .find(|port| port.name == name)
            .ok_or_else(|| DesignError::UnknownPort {
                name: name.to_string(),
                symbol: self.core.symbol.clone(),
            })?;
        Ok(self.wire(port.sig))
    }

    /// Append an output sink. Duplicate names fail.
    pub fn output(&mut self, name: &str, value: Wire) -> Result<(), Error> {
        self.core.check_unfrozen()?;
        let id = self.own(value)?;
        if self.core.results.iter().any(|(n, _)| n == name) {
            return Err(DesignError::DuplicateOutput {
                name: name.to_string(),
                module: self.core.symbol.clone(),
            }
            .into());
        }
        self.core.results.push((name.to_string(), id));
        Ok(())
    }

    /// An unsigned constant wire.
    pub fn lit(&mut self, value: i128, width: u32) -> Result<Wire, Error> {
        let ty = BitVec::unsigned(width)?;
        let id = self.core.graph.constant(value, ty)?;
        Ok(self.wire(id))
    }

    /// A signed constant wire; negative values are in range.
    pub fn lit_signed(&mut self, value: i128, width: u32) -> Result<Wire, Error> {
        let ty = BitVec::signed(width)?;
        let id = self.core.graph.constant(value, ty)?;
        Ok(self.wire(id))
    }

    /// Push a name-scope component; registers and memories declared while
    /// it is active pick it up in their qualified names.
    pub fn enter_scope(&mut self, name: &str) {
        self.core.scopes.push(name.to_string());
    }

    /// Pop the innermost name-scope component.
    pub fn leave_scope(&mut self) -> Result<(), Error> {
        if self.core.scopes.pop().is_none() {
            return Err(crate::error::JitError::UnbalancedScope {
                module: self.core.symbol.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Run a closure under a pushed name scope, leaving it on every exit
    /// path.
    pub fn scoped<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.enter_scope(name);
        let out = f(self);
        self.core.scopes.pop();
        out
    }

    /// Pre-declare signature-bound ports from a specialization request.
    pub(crate) fn declare_spec_ports(&mut self, specs: Option<&PortSpecs>) -> Result<(), Error> {
        let Some(specs) = specs else {
            return Ok(());
        };
        for (name, spec) in specs {
            match spec {
                PortSpec::Clock => {
                    self.clock(name)?;
                }
                PortSpec::Reset => {
                    self.reset(name)?;
                }
                PortSpec::Wire { width, signed } => {
                    let ty = BitVec::new(*width, *signed).map_err(|_| {
                        DesignError::UnsupportedPortSpec {
                            name: name.clone(),
                            detail: format!("invalid integer width i{width}"),
                        }
                    })?;
                    self.declare_port(name, ty, PortKind::Data)?;
                }
            }
        }
        Ok(())
    }

    /// Bind wires returned by the builder to default-named outputs when no
    /// outputs were declared explicitly. Declared outputs win.
    pub(crate) fn absorb(&mut self, out: BuilderOut) -> Result<(), Error> {
        if !self.core.results.is_empty() {
            return Ok(());
        }
        match out {
            BuilderOut::Unit => Ok(()),
            BuilderOut::Wire(w) => self.output("out", w),
            BuilderOut::Wires(ws) => {
                for (i, w) in ws.into_iter().enumerate() {
                    self.output(&format!("out{i}"), w)?;
                }
                Ok(())
            }
        }
    }

    /// Finalize and release the module scratch state.
    pub(crate) fn finish(mut self) -> Result<ModuleCore, Error> {
        self.core.finalize()?;
        Ok(self.core)
    }
}
