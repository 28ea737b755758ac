//! Frontend error taxonomy
//!
//! [`JitError`] is the only locally recovered error: the specialization
//! entry point catches it, rolls the caches back and retries the builder
//! through the elaboration fallback. Everything else unwinds to the caller
//! of [`compile_design`](crate::design::compile_design).

use silica_ir::WidthError;
use thiserror::Error;

/// Static design validation failure, fatal at the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesignError {
    /// A module symbol is already taken within the design.
    #[error("duplicate module symbol: {symbol:?}")]
    DuplicateSymbol {
        /// The contested symbol.
        symbol: String,
    },

    /// An output name was declared twice on one module.
    #[error("duplicate output {name:?} in module {module:?}")]
    DuplicateOutput {
        /// Output name.
        name: String,
        /// Module symbol.
        module: String,
    },

    /// A port name was declared twice on one module.
    #[error("duplicate port {name:?} in module {module:?}")]
    DuplicatePort {
        /// Port name.
        name: String,
        /// Module symbol.
        module: String,
    },

    /// Parameters were supplied that the component does not declare.
    #[error("unknown module param(s) for {component:?}: {names}")]
    UnknownParam {
        /// Component base name.
        component: String,
        /// Comma-separated offending names, sorted.
        names: String,
    },

    /// A declared parameter has neither a supplied value nor a default.
    #[error("missing module param {name:?} for {component:?}")]
    MissingParam {
        /// Parameter name.
        name: String,
        /// Component base name.
        component: String,
    },

    /// A builder read a parameter that was never bound.
    #[error("param {name:?} is not bound")]
    UnboundParam {
        /// Parameter name.
        name: String,
    },

    /// A bound parameter does not have the requested shape.
    #[error("param {name:?} is not {expected}")]
    BadParamType {
        /// Parameter name.
        name: String,
        /// Requested shape, e.g. `"a u32"`.
        expected: &'static str,
    },

    /// A signature-bound port spec cannot be applied.
    #[error("unsupported port spec for {name:?}: {detail}")]
    UnsupportedPortSpec {
        /// Port name.
        name: String,
        /// What was wrong with it.
        detail: String,
    },

    /// An instance connection names a port the child module does not have,
    /// or a builder looked up an argument that was never declared.
    #[error("unknown port {name:?} on {symbol:?}")]
    UnknownPort {
        /// Port name.
        name: String,
        /// Module symbol.
        symbol: String,
    },

    /// An instance left one of the child module's ports unconnected.
    #[error("missing connection for port {name:?} of {symbol:?}")]
    MissingConnection {
        /// Port name.
        name: String,
        /// Child module symbol.
        symbol: String,
    },

    /// A wire, register or variable from another module was used here.
    /// Hierarchical composition happens through instances, never through
    /// shared nodes.
    #[error("value does not belong to module {module:?}")]
    ForeignWire {
        /// Module symbol that rejected the value.
        module: String,
    },

    /// The module was already finalized; its statements are frozen.
    #[error("module {module:?} is frozen")]
    FrozenModule {
        /// Module symbol.
        module: String,
    },

    /// Concatenation of an empty operand list.
    #[error("cat requires at least one operand")]
    EmptyConcat,

    /// A memory was declared with a zero byte depth.
    #[error("memory {name:?} must have a positive depth")]
    BadDepth {
        /// Memory name.
        name: String,
    },
}

/// The control-flow lowerer rejected a construct.
///
/// Internal to the compile pipeline: triggers the elaboration fallback
/// after a cache rollback and is surfaced only when the fallback fails too.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JitError {
    /// A loop condition involves a signal; the graph has no notion of
    /// dynamic iteration.
    #[error("dynamic loop over a signal in module {module:?}")]
    DynamicLoop {
        /// Module symbol.
        module: String,
    },

    /// A variable first bound inside a conditional branch was read after
    /// the branch closed.
    #[error("binding {name:?} escapes its conditional branch in module {module:?}")]
    EscapedBinding {
        /// Variable name.
        name: String,
        /// Module symbol.
        module: String,
    },

    /// Name scopes were not entered and left in balanced pairs.
    #[error("unbalanced name scope in module {module:?}")]
    UnbalancedScope {
        /// Module symbol.
        module: String,
    },

    /// The builder opted out of the lowering path.
    #[error("lowering does not apply to the builder of module {module:?}")]
    Unsupported {
        /// Module symbol.
        module: String,
    },
}

/// Frontend compilation error.
#[derive(Debug, Error)]
pub enum Error {
    /// A node constructor rejected its operand widths.
    #[error(transparent)]
    Width(#[from] WidthError),

    /// Static design validation failed.
    #[error(transparent)]
    Design(#[from] DesignError),

    /// The control-flow lowerer rejected a construct.
    #[error(transparent)]
    Jit(#[from] JitError),

    /// The builder itself failed during elaboration.
    #[error("builder failed: {0}")]
    Builder(String),
}

impl Error {
    /// Whether this error is the lowerer rejecting a construct, i.e. the
    /// signal to retry through the elaboration fallback.
    pub fn is_jit(&self) -> bool {
        matches!(self, Error::Jit(_))
    }
}
