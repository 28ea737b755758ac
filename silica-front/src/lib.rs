//! Silica hardware frontend
//!
//! Builders author synchronous digital circuits as plain functions over a
//! [`builder::ModuleCtx`]; the frontend lowers each design to a textual
//! SSA-form IR unit. Compilation runs the builder on the control-flow
//! lowering path first, falling back to plain elaboration when the
//! lowerer rejects a construct, and caches every module specialization by
//! (function identity, canonical parameters, canonical port specs,
//! optional name) so hierarchical designs never emit a module twice.
//!
//! ```
//! use silica_front::prelude::*;
//!
//! fn max(m: &mut ModuleCtx<'_>, p: &Params) -> Result<BuilderOut, Error> {
//!     let width = p.u32("width")?;
//!     let x = m.input("x", width)?;
//!     let y = m.input("y", width)?;
//!     let r = m.var("r", x)?;
//!     let lt = m.ult(x, y)?;
//!     m.if_(lt, |m| m.assign(r, y))?;
//!     let out = m.read(r)?;
//!     m.output("out", out)?;
//!     Ok(BuilderOut::Unit)
//! }
//!
//! let comp = Component::new("max", max).param_default("width", 8);
//! let design = compile_design(&comp, "Max", Params::new()).unwrap();
//! assert!(design.emit_ir().contains("hw.select"));
//! ```

pub mod builder;
pub mod component;
pub mod design;
mod emit;
pub mod error;
pub mod module;
pub mod params;

pub use design::compile_design;

pub mod prelude {
    //! The common frontend surface.

    pub use crate::builder::{InstanceOuts, MemSpec, ModuleCtx, RegSpec};
    pub use crate::component::{BuildFn, BuilderOut, Component, ParamSpec};
    pub use crate::design::{compile_design, CompiledModule, Design};
    pub use crate::error::{DesignError, Error, JitError};
    pub use crate::module::{PortKind, Reg, Var, Wire};
    pub use crate::params::{ParamValue, Params, PortSpec, PortSpecs};

    pub use silica_ir::{BitVec, CmpVariant, WidthError};
}
