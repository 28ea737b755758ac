//! Builder registration
//!
//! A [`Component`] pairs a builder function with its declared parameter
//! signature. The descriptor replaces signature reflection: declared names
//! and defaults drive parameter binding, and the builder function pointer
//! is the function identity the specialization cache keys on.

use crate::builder::ModuleCtx;
use crate::error::{DesignError, Error};
use crate::module::Wire;
use crate::params::{ParamValue, Params};

use itertools::Itertools;
use std::collections::HashSet;

/// Builder entry point: elaborates one module against the given context
/// and bound parameters.
pub type BuildFn = fn(&mut ModuleCtx<'_>, &Params) -> Result<BuilderOut, Error>;

/// One declared parameter of a component.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Default value; a parameter without one must be supplied.
    pub default: Option<ParamValue>,
}

/// A registered design builder.
#[derive(Debug, Clone)]
pub struct Component {
    name: &'static str,
    params: Vec<ParamSpec>,
    build: BuildFn,
    elaborate_only: bool,
}

impl Component {
    /// Register a builder under a stable logical base name.
    pub fn new(name: &'static str, build: BuildFn) -> Self {
        Self {
            name,
            params: Vec::new(),
            build,
            elaborate_only: false,
        }
    }

    /// Mark the builder as outside the lowering subset: compilation skips
    /// the lowering attempt and elaborates it directly. Conditional
    /// regions over signals are unavailable to such builders.
    pub fn elaborate_only(mut self) -> Self {
        self.elaborate_only = true;
        self
    }

    pub(crate) fn is_elaborate_only(&self) -> bool {
        self.elaborate_only
    }

    /// Declare a required parameter.
    pub fn param(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            default: None,
        });
        self
    }

    /// Declare a parameter with a default value.
    pub fn param_default(mut self, name: &'static str, default: impl Into<ParamValue>) -> Self {
        self.params.push(ParamSpec {
            name,
            default: Some(default.into()),
        });
        self
    }

    /// The stable logical base name used to derive specialized symbols.
    pub fn base_name(&self) -> &str {
        self.name
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn build_fn(&self) -> BuildFn {
        self.build
    }

    /// The function identity the specialization cache keys on.
    pub(crate) fn fn_id(&self) -> usize {
        self.build as usize
    }

    /// Resolve supplied values against the declared signature: apply
    /// defaults, skip signature-bound port names and reject unknown or
    /// missing parameters early to avoid silent mismatches.
    pub(crate) fn bind(
        &self,
        provided: &Params,
        port_names: &HashSet<&str>,
    ) -> Result<Params, Error> {
        let mut bound = Params::new();
        for spec in &self.params {
            if port_names.contains(spec.name) {
                continue;
            }
            match provided.get(spec.name) {
                Some(value) => bound.set(spec.name, value.clone()),
                None => match &spec.default {
                    Some(default) => bound.set(spec.name, default.clone()),
                    None => {
                        return Err(DesignError::MissingParam {
                            name: spec.name.to_string(),
                            component: self.name.to_string(),
                        }
                        .into())
                    }
                },
            }
        }
        let declared: HashSet<&str> = self
            .params
            .iter()
            .map(|spec| spec.name)
            .filter(|name| !port_names.contains(name))
            .collect();
        let extra = provided
            .iter()
            .map(|(name, _)| name)
            .filter(|name| !declared.contains(name))
            .sorted()
            .join(", ");
        if !extra.is_empty() {
            return Err(DesignError::UnknownParam {
                component: self.name.to_string(),
                names: extra,
            }
            .into());
        }
        Ok(bound)
    }
}

/// What a builder hands back: output ports may be declared explicitly
/// through [`ModuleCtx::output`], or returned as wires that the pipeline
/// binds to default names (`out`, `out0`, `out1`, ...). Explicitly
/// declared outputs win.
#[derive(Debug, Clone)]
pub enum BuilderOut {
    /// All outputs were declared explicitly (or the module has none).
    Unit,
    /// A single wire, bound to `out`.
    Wire(Wire),
    /// Several wires, bound to `out0`, `out1`, ...
    Wires(Vec<Wire>),
}

impl From<Wire> for BuilderOut {
    fn from(w: Wire) -> Self {
        BuilderOut::Wire(w)
    }
}

impl From<Vec<Wire>> for BuilderOut {
    fn from(ws: Vec<Wire>) -> Self {
        BuilderOut::Wires(ws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_: &mut ModuleCtx<'_>, _: &Params) -> Result<BuilderOut, Error> {
        Ok(BuilderOut::Unit)
    }

    #[test]
    fn binding_applies_defaults_in_declaration_order() {
        let comp = Component::new("adder", nop)
            .param("width")
            .param_default("stages", 3);
        let bound = comp
            .bind(&Params::new().with("width", 8), &HashSet::new())
            .unwrap();
        assert_eq!(bound.u32("width").unwrap(), 8);
        assert_eq!(bound.u32("stages").unwrap(), 3);
    }

    #[test]
    fn binding_rejects_missing_required_params() {
        let comp = Component::new("adder", nop).param("width");
        let err = comp.bind(&Params::new(), &HashSet::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Design(DesignError::MissingParam { .. })
        ));
    }

    #[test]
    fn binding_rejects_unknown_params_sorted() {
        let comp = Component::new("adder", nop).param_default("width", 8);
        let err = comp
            .bind(
                &Params::new().with("zz", 1).with("aa", 2).with("width", 4),
                &HashSet::new(),
            )
            .unwrap_err();
        match err {
            Error::Design(DesignError::UnknownParam { names, .. }) => {
                assert_eq!(names, "aa, zz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn signature_bound_port_names_are_skipped() {
        let comp = Component::new("adder", nop).param("x");
        let ports: HashSet<&str> = ["x"].into_iter().collect();
        let bound = comp.bind(&Params::new(), &ports).unwrap();
        assert!(bound.get("x").is_none());
    }
}
