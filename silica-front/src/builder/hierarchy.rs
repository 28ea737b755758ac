//! Submodule instantiation
//!
//! Instantiating a component re-enters the compile pipeline through the
//! design context: the child is specialized (or fetched from the cache),
//! the connections are checked against its compiled port signature and one
//! result wire is produced per child output.

use super::ModuleCtx;
use crate::component::Component;
use crate::error::{DesignError, Error};
use crate::module::{InstRecord, Wire};
use crate::params::{Params, PortSpecs};

use silica_ir::{InstId, WidthError};

/// Result ports of one submodule instance, in the child's output order.
#[derive(Debug, Clone)]
pub struct InstanceOuts {
    symbol: String,
    outs: Vec<(String, Wire)>,
}

impl InstanceOuts {
    /// Look up a result port by name.
    pub fn get(&self, name: &str) -> Result<Wire, Error> {
        self.outs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, w)| *w)
            .ok_or_else(|| {
                DesignError::UnknownPort {
                    name: name.to_string(),
                    symbol: self.symbol.clone(),
                }
                .into()
            })
    }

    /// The single result port of a one-output child.
    pub fn only(&self) -> Result<Wire, Error> {
        match self.outs.as_slice() {
            [(_, wire)] => Ok(*wire),
            _ => Err(DesignError::UnknownPort {
                name: "out".to_string(),
                symbol: self.symbol.clone(),
            }
            .into()),
        }
    }

    /// Iterate result ports in the child's output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Wire)> {
        self.outs.iter().map(|(n, w)| (n.as_str(), *w))
    }

    /// Number of result ports.
    pub fn len(&self) -> usize {
        self.outs.len()
    }

    /// Whether the child has no outputs.
    pub fn is_empty(&self) -> bool {
        self.outs.is_empty()
    }
}

impl ModuleCtx<'_> {
    /// Instantiate a component with the given parameters, connecting every
    /// child port by name. The child is compiled at most once per design
    /// for a given parameter set.
    pub fn instance(
        &mut self,
        comp: &Component,
        params: Params,
        conns: &[(&str, Wire)],
    ) -> Result<InstanceOuts, Error> {
        self.instance_full(comp, params, None, None, conns)
    }

    /// Instantiate under an explicit child symbol instead of the derived
    /// `base__p<hash>` name. Two different builders requesting the same
    /// symbol within one design fail.
    pub fn instance_as(
        &mut self,
        comp: &Component,
        module_name: &str,
        params: Params,
        conns: &[(&str, Wire)],
    ) -> Result<InstanceOuts, Error> {
        self.instance_full(comp, params, Some(module_name), None, conns)
    }

    /// The full instantiation form: optional explicit symbol and optional
    /// signature-bound port specs, both part of the specialization key.
    pub fn instance_full(
        &mut self,
        comp: &Component,
        params: Params,
        module_name: Option<&str>,
        port_specs: Option<&PortSpecs>,
        conns: &[(&str, Wire)],
    ) -> Result<InstanceOuts, Error> {
        self.core.check_unfrozen()?;
        let compiled = self.ctx.specialize(comp, &params, module_name, port_specs)?;

        for (i, (name, _)) in conns.iter().enumerate() {
            if conns[..i].iter().any(|(n, _)| n == name) {
                return Err(DesignError::DuplicatePort {
                    name: name.to_string(),
                    module: self.core.symbol.clone(),
                }
                .into());
            }
            if !compiled.args().iter().any(|port| port.name == *name) {
                return Err(DesignError::UnknownPort {
                    name: name.to_string(),
                    symbol: compiled.sym_name().to_string(),
                }
                .into());
            }
        }

        let mut args = Vec::with_capacity(compiled.args().len());
        for port in compiled.args() {
            let Some((_, wire)) = conns.iter().find(|(n, _)| *n == port.name) else {
                return Err(DesignError::MissingConnection {
                    name: port.name.clone(),
                    symbol: compiled.sym_name().to_string(),
                }
                .into());
            };
            let id = self.own(*wire)?;
            if wire.width() != port.ty.width() {
                return Err(WidthError::Mismatch {
                    op: "instance port",
                    left: port.ty.width(),
                    right: wire.width(),
                }
                .into());
            }
            args.push(id);
        }

        let inst = InstId::new(self.core.insts.len() as u32);
        let mut results = Vec::with_capacity(compiled.results().len());
        let mut outs = Vec::with_capacity(compiled.results().len());
        for (port, (name, ty)) in compiled.results().iter().enumerate() {
            let sig = self.core.graph.inst_out(inst, port as u32, *ty);
            results.push((name.clone(), *ty, sig));
            outs.push((name.clone(), self.wire(sig)));
        }
        self.core.insts.push(InstRecord {
            symbol: compiled.sym_name().to_string(),
            args,
            results,
        });
        Ok(InstanceOuts {
            symbol: compiled.sym_name().to_string(),
            outs,
        })
    }
}
