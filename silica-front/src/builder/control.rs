//! Control-flow lowering
//!
//! Conditional regions over signals are captured here instead of being
//! evaluated: every variable assignment made inside a branch is merged
//! after the region into a `select` tree keyed on the branch condition,
//! and register writes pick up the branch's path condition. Variables
//! assigned in only some branches keep their prior value in the others.
//!
//! The elaboration fallback runs with these regions disabled; a purely
//! data-flow builder behaves identically on both paths.

use super::{LowerMode, ModuleCtx};
use crate::error::{Error, JitError};
use crate::module::{Var, Wire};

use indexmap::IndexMap;
use silica_ir::{BitVec, SigId, WidthError};

/// Mutable-variable slot. Slots created inside a conditional branch die
/// when the branch closes; reading a dead slot is a lowering error.
#[derive(Debug, Clone)]
pub(crate) struct VarSlot {
    pub name: String,
    pub value: SigId,
    pub ty: BitVec,
    pub live: bool,
}

/// One open conditional region.
#[derive(Debug, Clone)]
pub(crate) struct CondFrame {
    /// The region's branch condition.
    pub cond: SigId,
    /// Whether the region covers the false side of the condition.
    pub negated: bool,
    /// Pre-region value of every variable assigned inside, keyed by slot
    /// index in first-assignment order.
    pub saved: IndexMap<usize, SigId>,
    /// Slots first bound inside the region.
    pub created: Vec<usize>,
}

impl CondFrame {
    fn new(cond: SigId, negated: bool) -> Self {
        Self {
            cond,
            negated,
            saved: IndexMap::new(),
            created: Vec::new(),
        }
    }
}

impl ModuleCtx<'_> {
    /// Declare a mutable variable with an initial wire value.
    pub fn var(&mut self, name: &str, init: Wire) -> Result<Var, Error> {
        let value = self.own(init)?;
        let index = self.vars().len();
        self.vars_mut().push(VarSlot {
            name: name.to_string(),
            value,
            ty: init.ty(),
            live: true,
        });
        if let Some(frame) = self.frames_mut().last_mut() {
            frame.created.push(index);
        }
        Ok(Var {
            module: self.core.uid,
            index,
        })
    }

    /// Current value of a variable.
    pub fn read(&mut self, var: Var) -> Result<Wire, Error> {
        let index = self.own_var(var)?;
        let slot = &self.vars()[index];
        if !slot.live {
            return Err(JitError::EscapedBinding {
                name: slot.name.clone(),
                module: self.core.symbol.clone(),
            }
            .into());
        }
        Ok(self.wire(slot.value))
    }

    /// Assign a new value to a variable. Inside a conditional region the
    /// assignment is provisional until the region merges.
    pub fn assign(&mut self, var: Var, value: Wire) -> Result<(), Error> {
        let index = self.own_var(var)?;
        let id = self.own(value)?;
        let slot = &self.vars()[index];
        if !slot.live {
            return Err(JitError::EscapedBinding {
                name: slot.name.clone(),
                module: self.core.symbol.clone(),
            }
            .into());
        }
        if slot.ty.width() != value.width() {
            return Err(WidthError::Mismatch {
                op: "assign",
                left: slot.ty.width(),
                right: value.width(),
            }
            .into());
        }
        let previous = slot.value;
        if let Some(frame) = self.frames_mut().last_mut() {
            frame.saved.entry(index).or_insert(previous);
        }
        self.vars_mut()[index].value = id;
        Ok(())
    }

    /// Conditional region without an else branch; variables assigned
    /// inside keep their prior value when the condition is low.
    pub fn if_(
        &mut self,
        cond: Wire,
        then: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.if_else(cond, then, |_| Ok(()))
    }

    /// Conditional region with both branches.
    pub fn if_else(
        &mut self,
        cond: Wire,
        then: impl FnOnce(&mut Self) -> Result<(), Error>,
        otherwise: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if self.mode() == LowerMode::Elab {
            return Err(Error::Builder(format!(
                "conditional branch over a signal in module {:?} is only \
                 available on the lowering path",
                self.core.symbol
            )));
        }
        let c = self.own(cond)?;
        if cond.width() != 1 {
            return Err(WidthError::NonBool {
                op: "if",
                width: cond.width(),
            }
            .into());
        }

        self.frames_mut().push(CondFrame::new(c, false));
        then(self)?;
        let then_frame = self.close_frame()?;
        let then_vals = self.capture_and_restore(&then_frame);

        self.frames_mut().push(CondFrame::new(c, true));
        otherwise(self)?;
        let else_frame = self.close_frame()?;
        let else_vals = self.capture_and_restore(&else_frame);

        // Merge in lexical order: variables touched by the then branch
        // first, else-only variables after.
        let mut order: Vec<usize> = then_vals.keys().copied().collect();
        order.extend(
            else_vals
                .keys()
                .filter(|idx| !then_vals.contains_key(*idx))
                .copied(),
        );
        for index in order {
            if !self.vars()[index].live {
                continue;
            }
            let prior = self.vars()[index].value;
            let on_true = then_vals.get(&index).copied().unwrap_or(prior);
            let on_false = else_vals.get(&index).copied().unwrap_or(prior);
            let merged = self.core.graph.select(c, on_true, on_false)?;
            if let Some(outer) = self.frames_mut().last_mut() {
                outer.saved.entry(index).or_insert(prior);
            }
            self.vars_mut()[index].value = merged;
        }
        Ok(())
    }

    /// A loop whose condition involves a signal has no straight-line
    /// lowering: the graph has no notion of dynamic iteration. Loops over
    /// host-language bounds are ordinary `for` loops and unroll by
    /// construction.
    pub fn while_signal(
        &mut self,
        cond: Wire,
        _body: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.own(cond)?;
        match self.mode() {
            LowerMode::Jit => Err(JitError::DynamicLoop {
                module: self.core.symbol.clone(),
            }
            .into()),
            LowerMode::Elab => Err(Error::Builder(format!(
                "dynamic iteration: loop condition in module {:?} depends on a signal",
                self.core.symbol
            ))),
        }
    }

    fn close_frame(&mut self) -> Result<CondFrame, Error> {
        self.frames_mut().pop().ok_or_else(|| {
            Error::Builder("conditional region frame imbalance".to_string())
        })
    }

    /// Record the branch-exit value of every variable the frame touched,
    /// restore the pre-region values and kill slots created inside.
    fn capture_and_restore(&mut self, frame: &CondFrame) -> IndexMap<usize, SigId> {
        let mut exit_vals = IndexMap::new();
        for (&index, &previous) in &frame.saved {
            exit_vals.insert(index, self.vars()[index].value);
            self.vars_mut()[index].value = previous;
        }
        for &index in &frame.created {
            self.vars_mut()[index].live = false;
        }
        exit_vals
    }

    /// AND of the conditions of every open region, used to gate register
    /// writes made inside conditional branches.
    pub(crate) fn path_cond(&mut self) -> Result<Option<SigId>, Error> {
        let mut acc: Option<SigId> = None;
        for i in 0..self.frames().len() {
            let frame = &self.frames()[i];
            let (cond, negated) = (frame.cond, frame.negated);
            let leg = if negated {
                self.core.graph.not(cond)?
            } else {
                cond
            };
            acc = Some(match acc {
                None => leg,
                Some(prev) => self.core.graph.and(prev, leg)?,
            });
        }
        Ok(acc)
    }
}
