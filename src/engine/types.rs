use crate::arena::{Graph, NodeId};
use crate::error::EvalError;
use crate::trace::StepTrace;
use rustc_hash::FxHashMap;
use std::sync::atomic::AtomicU64;

/// Spine-forcing cap; an infinite list stops being forced past this.
pub const DEFAULT_SPINE_LIMIT: usize = 200_000;

/// Interval override for progress diagnostics, settable from tests.
/// `u64::MAX` means "no override, consult the environment".
pub static PROGRESS_STEPS_OVERRIDE: AtomicU64 = AtomicU64::new(u64::MAX);

/// Per-evaluation state: the bindings table, the step and spine caps, the
/// fresh-variable counter and an optional step trace. One context drives
/// one top-level reduction; it is not shared.
pub struct EvalContext<'a> {
    pub defs: &'a FxHashMap<String, NodeId>,
    /// Reducer entries allowed; 0 means unlimited.
    pub step_limit: usize,
    /// Cons-cell slots forced during spine evaluation.
    pub spine_limit: usize,
    /// Reducer entries so far.
    pub steps: usize,
    pub trace: Option<&'a mut StepTrace>,
    fresh: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(defs: &'a FxHashMap<String, NodeId>) -> Self {
        Self {
            defs,
            step_limit: 0,
            spine_limit: DEFAULT_SPINE_LIMIT,
            steps: 0,
            trace: None,
            fresh: 0,
        }
    }

    /// Next lambda variable name. The `X` prefix cannot collide with user
    /// references, which all begin with `:`.
    pub fn fresh_var(&mut self) -> String {
        let name = format!("X{}", self.fresh);
        self.fresh += 1;
        name
    }

    pub(crate) fn count_step(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.step_limit > 0 && self.steps > self.step_limit {
            return Err(EvalError::StepLimitExceeded(self.step_limit));
        }
        Ok(())
    }

    pub(crate) fn record(&mut self, g: &Graph) {
        let step = self.steps;
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.record(g, step);
        }
    }

    pub(crate) fn set_trace_root(&mut self, root: NodeId) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.set_root(root);
        }
    }
}
