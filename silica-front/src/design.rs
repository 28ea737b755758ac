//! Design unit and specialization cache
//!
//! A [`Design`] is an ordered collection of compiled modules with a
//! designated top symbol. The [`DesignContext`] owns the specialization
//! cache mapping (function identity, canonical parameters, canonical port
//! specs, optional name) to a compiled module, and enforces symbol
//! uniqueness within the design.
//!
//! Compilation of one module first runs the builder on the lowering path.
//! When the lowerer rejects a construct the caches, used-symbol set and
//! module map are restored from a structural snapshot and the builder is
//! re-run through the elaboration fallback on a fresh module, so a failed
//! attempt never leaks partial child specializations.

use crate::builder::{LowerMode, ModuleCtx};
use crate::component::Component;
use crate::emit;
use crate::error::{DesignError, Error};
use crate::module::{ModuleCore, PortDecl};
use crate::params::{cache_sig, port_specs_text, symbol_for, Params, PortSpecs};

use indexmap::IndexMap;
use silica_ir::BitVec;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, trace};

/// One compiled module: the frozen scratch state plus the identity and
/// canonical parameter text it was specialized from.
#[derive(Debug)]
pub struct CompiledModule {
    sym_name: String,
    base_name: String,
    params_json: String,
    fn_id: usize,
    args: Vec<PortDecl>,
    results: Vec<(String, BitVec)>,
    pub(crate) core: ModuleCore,
}

impl CompiledModule {
    /// The module's symbol within the design.
    pub fn sym_name(&self) -> &str {
        &self.sym_name
    }

    /// The builder's stable logical base name.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Canonical text of the parameters the module was specialized with.
    pub fn params_json(&self) -> &str {
        &self.params_json
    }

    /// Identity of the builder function.
    pub fn fn_id(&self) -> usize {
        self.fn_id
    }

    /// Ordered argument signature: clock, reset and input ports.
    pub fn args(&self) -> &[PortDecl] {
        &self.args
    }

    /// Ordered result signature.
    pub fn results(&self) -> &[(String, BitVec)] {
        &self.results
    }
}

/// A multi-module compilation unit emitted as one textual IR document.
#[derive(Debug, Default)]
pub struct Design {
    top: String,
    modules: IndexMap<String, Rc<CompiledModule>>,
}

impl Design {
    fn new(top: &str) -> Self {
        Self {
            top: top.to_string(),
            modules: IndexMap::new(),
        }
    }

    /// The designated top symbol.
    pub fn top(&self) -> &str {
        &self.top
    }

    /// Compiled modules in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = &Rc<CompiledModule>> {
        self.modules.values()
    }

    /// Number of compiled modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the design holds no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Look up a module by symbol.
    pub fn lookup(&self, sym_name: &str) -> Option<&Rc<CompiledModule>> {
        self.modules.get(sym_name)
    }

    /// Emit the textual IR unit. Repeatable and read-only; identical
    /// designs emit byte-identical text.
    pub fn emit_ir(&self) -> String {
        emit::emit_design(self)
    }
}

type CacheKey = (usize, String, String, Option<String>);

/// Structural snapshot of the transactional state around one lowering
/// attempt: values are copied, compiled modules are shared immutably.
#[derive(Clone)]
struct Snapshot {
    cache: HashMap<CacheKey, Rc<CompiledModule>>,
    used_symbols: HashSet<String>,
    modules: IndexMap<String, Rc<CompiledModule>>,
}

/// Specialization cache and registry for a design's compiled modules.
pub struct DesignContext {
    design: Design,
    cache: HashMap<CacheKey, Rc<CompiledModule>>,
    used_symbols: HashSet<String>,
    next_uid: u64,
}

impl DesignContext {
    fn new(top: &str) -> Self {
        Self {
            design: Design::new(top),
            cache: HashMap::new(),
            used_symbols: HashSet::new(),
            next_uid: 0,
        }
    }

    fn fresh_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            cache: self.cache.clone(),
            used_symbols: self.used_symbols.clone(),
            modules: self.design.modules.clone(),
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.cache = snapshot.cache.clone();
        self.used_symbols = snapshot.used_symbols.clone();
        self.design.modules = snapshot.modules.clone();
    }

    /// Compile one module for a component: specialize the cache key, pick
    /// the symbol, and run the builder with lowering, falling back to
    /// plain elaboration when the lowerer rejects a construct.
    #[tracing::instrument(name = "specialize", skip_all, fields(base = comp.base_name()))]
    pub(crate) fn specialize(
        &mut self,
        comp: &Component,
        params: &Params,
        module_name: Option<&str>,
        port_specs: Option<&PortSpecs>,
    ) -> Result<Rc<CompiledModule>, Error> {
        let port_names: HashSet<&str> = port_specs
            .map(|specs| specs.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let bound = comp.bind(params, &port_names)?;
        let t_params = bound.canon_text();
        let t_ports = port_specs_text(port_specs);
        let key: CacheKey = (
            comp.fn_id(),
            t_params.clone(),
            t_ports.clone(),
            module_name.map(str::to_string),
        );
        if let Some(hit) = self.cache.get(&key) {
            trace!(sym = %hit.sym_name(), "specialization cache hit");
            return Ok(hit.clone());
        }

        let sig = cache_sig(&t_params, &t_ports);
        let symbol = symbol_for(comp.base_name(), &sig, module_name);
        if self.used_symbols.contains(&symbol) {
            // Same content under a different key, e.g. equivalent
            // parameter mappings, resolves to the existing module. A
            // different builder claiming the symbol is a collision.
            if let Some(existing) = self.design.lookup(&symbol) {
                if existing.fn_id() == comp.fn_id() {
                    let existing = existing.clone();
                    self.cache.insert(key, existing.clone());
                    return Ok(existing);
                }
            }
            return Err(DesignError::DuplicateSymbol { symbol }.into());
        }

        let snapshot = self.snapshot();
        self.used_symbols.insert(symbol.clone());
        debug!(sym = %symbol, "compiling specialization");
        let core = match self.build_module(comp, &symbol, &bound, port_specs, LowerMode::Jit) {
            Ok(core) => core,
            Err(Error::Jit(jit)) => {
                debug!(sym = %symbol, error = %jit, "lowering rejected, retrying via elaboration");
                self.restore(&snapshot);
                self.used_symbols.insert(symbol.clone());
                match self.build_module(comp, &symbol, &bound, port_specs, LowerMode::Elab) {
                    Ok(core) => core,
                    Err(err) => {
                        self.restore(&snapshot);
                        return Err(err);
                    }
                }
            }
            Err(err) => {
                self.restore(&snapshot);
                return Err(err);
            }
        };
        let compiled = self.finish_compiled(comp, core, &t_params);
        self.design
            .modules
            .insert(compiled.sym_name().to_string(), compiled.clone());
        self.cache.insert(key, compiled.clone());
        Ok(compiled)
    }

    /// Register the design's top module under an explicit symbol.
    pub(crate) fn register_top(
        &mut self,
        comp: &Component,
        sym_name: &str,
        params: &Params,
    ) -> Result<Rc<CompiledModule>, Error> {
        let bound = comp.bind(params, &HashSet::new())?;
        let t_params = bound.canon_text();
        if !self.used_symbols.insert(sym_name.to_string()) {
            return Err(DesignError::DuplicateSymbol {
                symbol: sym_name.to_string(),
            }
            .into());
        }
        let snapshot = self.snapshot();
        let core = match self.build_module(comp, sym_name, &bound, None, LowerMode::Jit) {
            Ok(core) => core,
            Err(Error::Jit(jit)) => {
                debug!(sym = sym_name, error = %jit, "lowering rejected, retrying via elaboration");
                self.restore(&snapshot);
                self.build_module(comp, sym_name, &bound, None, LowerMode::Elab)?
            }
            Err(err) => return Err(err),
        };
        let compiled = self.finish_compiled(comp, core, &t_params);
        self.design
            .modules
            .insert(compiled.sym_name().to_string(), compiled.clone());
        Ok(compiled)
    }

    fn build_module(
        &mut self,
        comp: &Component,
        symbol: &str,
        params: &Params,
        port_specs: Option<&PortSpecs>,
        mode: LowerMode,
    ) -> Result<ModuleCore, Error> {
        if mode == LowerMode::Jit && comp.is_elaborate_only() {
            return Err(crate::error::JitError::Unsupported {
                module: symbol.to_string(),
            }
            .into());
        }
        let uid = self.fresh_uid();
        let mut m = ModuleCtx::new(self, symbol, uid, mode);
        m.declare_spec_ports(port_specs)?;
        let out = (comp.build_fn())(&mut m, params)?;
        m.absorb(out)?;
        m.finish()
    }

    fn finish_compiled(
        &mut self,
        comp: &Component,
        mut core: ModuleCore,
        params_json: &str,
    ) -> Rc<CompiledModule> {
        core.set_attr("source_base_name", comp.base_name());
        core.set_attr("param_json", params_json);
        let args = core.args.clone();
        let results = core
            .results
            .iter()
            .map(|(name, sig)| (name.clone(), core.graph.ty(*sig)))
            .collect();
        Rc::new(CompiledModule {
            sym_name: core.symbol.clone(),
            base_name: comp.base_name().to_string(),
            params_json: params_json.to_string(),
            fn_id: comp.fn_id(),
            args,
            results,
            core,
        })
    }

    fn into_design(self) -> Design {
        self.design
    }
}

/// Compile a component into a fresh design whose top module carries the
/// given symbol. Each call builds an independent design; nothing is shared
/// between calls.
pub fn compile_design(comp: &Component, name: &str, params: Params) -> Result<Design, Error> {
    let mut ctx = DesignContext::new(name);
    ctx.register_top(comp, name, &params)?;
    Ok(ctx.into_design())
}
