//! None-state flow analysis.
//!
//! Every binding carries one of four states. States are propagated over the
//! control-flow graph with a worklist until no block's entry state changes,
//! then each block is replayed once to check every use against the state it
//! sees.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::trace;

use crate::ast::SourceSpan;
use crate::cfg::{BindingId, BlockId, ControlFlowGraph, FlowOp, UseKind, ValueSource};
use crate::diagnostics::{Diagnostic, DiagnosticCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoneState {
    /// Declared but never assigned.
    Unknown,
    DefinitelyNone,
    DefinitelyNotNone,
    /// None on at least one path into this point.
    MaybeNone,
}

impl NoneState {
    /// Merge at a control-flow join. Paths that agree keep their state; any
    /// disagreement may still be None.
    pub fn join(self, other: NoneState) -> NoneState {
        if self == other {
            self
        } else {
            NoneState::MaybeNone
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub binding: BindingId,
    pub state: NoneState,
    pub kind: UseKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowViolation {
    pub binding: BindingId,
    pub name: String,
    pub state: NoneState,
    pub kind: UseKind,
    pub span: SourceSpan,
}

impl FlowViolation {
    pub fn code(&self) -> DiagnosticCode {
        match self.state {
            NoneState::Unknown => DiagnosticCode::UseBeforeAssignment,
            NoneState::DefinitelyNone => DiagnosticCode::NoneUseError,
            _ => DiagnosticCode::NoneUseWarning,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match self.state {
            NoneState::Unknown => format!("'{}' is used before it is assigned", self.name),
            NoneState::DefinitelyNone => {
                format!("'{}' is None when {}", self.name, self.kind.describe())
            }
            _ => format!("'{}' may be None when {}", self.name, self.kind.describe()),
        };
        Diagnostic::new(self.code(), message).with_span(Some(self.span))
    }
}

#[derive(Debug, Clone)]
pub struct FlowAnalysis {
    entry_states: Vec<Option<Vec<NoneState>>>,
    pub observations: Vec<Observation>,
    pub violations: Vec<FlowViolation>,
}

impl FlowAnalysis {
    /// States of every binding right before op `index` of `block`, or `None`
    /// when the block is unreachable.
    pub fn state_at(
        &self,
        cfg: &ControlFlowGraph,
        block: BlockId,
        index: usize,
    ) -> Option<Vec<NoneState>> {
        let mut state = self.entry_states.get(block.0)?.clone()?;
        for op in cfg.block(block).ops.iter().take(index) {
            apply(&mut state, op);
        }
        Some(state)
    }

    pub fn state_at_exit(&self, binding: BindingId) -> Option<NoneState> {
        self.entry_states
            .get(ControlFlowGraph::EXIT.0)?
            .as_ref()?
            .get(binding.0)
            .copied()
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        matches!(self.entry_states.get(block.0), Some(Some(_)))
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.violations
            .iter()
            .map(FlowViolation::to_diagnostic)
            .collect()
    }
}

pub fn analyze(cfg: &ControlFlowGraph) -> FlowAnalysis {
    let mut entry_states: Vec<Option<Vec<NoneState>>> = vec![None; cfg.blocks.len()];
    entry_states[ControlFlowGraph::ENTRY.0] = Some(vec![NoneState::Unknown; cfg.bindings.len()]);

    let mut worklist = VecDeque::from([ControlFlowGraph::ENTRY]);
    let mut iterations = 0usize;
    while let Some(block) = worklist.pop_front() {
        iterations += 1;
        let Some(mut state) = entry_states[block.0].clone() else {
            continue;
        };
        for op in &cfg.block(block).ops {
            apply(&mut state, op);
        }
        for successor in &cfg.block(block).successors {
            let merged = match &entry_states[successor.0] {
                Some(existing) => join_states(existing, &state),
                None => state.clone(),
            };
            if entry_states[successor.0].as_ref() != Some(&merged) {
                entry_states[successor.0] = Some(merged);
                worklist.push_back(*successor);
            }
        }
    }
    trace!(iterations, blocks = cfg.blocks.len(), "flow fixpoint reached");

    let mut observations = Vec::new();
    let mut violations = Vec::new();
    for (index, entry) in entry_states.iter().enumerate() {
        let Some(mut state) = entry.clone() else {
            continue;
        };
        for op in &cfg.block(BlockId(index)).ops {
            if let FlowOp::Use {
                binding,
                kind,
                span,
            } = op
            {
                let current = state[binding.0];
                observations.push(Observation {
                    binding: *binding,
                    state: current,
                    kind: *kind,
                    span: *span,
                });
                if is_violation(current, *kind) {
                    violations.push(FlowViolation {
                        binding: *binding,
                        name: cfg.binding(*binding).name.clone(),
                        state: current,
                        kind: *kind,
                        span: *span,
                    });
                }
            }
            apply(&mut state, op);
        }
    }
    violations.sort_by_key(|violation| (violation.span.line, violation.span.column));

    FlowAnalysis {
        entry_states,
        observations,
        violations,
    }
}

fn is_violation(state: NoneState, kind: UseKind) -> bool {
    match state {
        NoneState::Unknown => true,
        NoneState::DefinitelyNone | NoneState::MaybeNone => kind.requires_value(),
        NoneState::DefinitelyNotNone => false,
    }
}

fn apply(state: &mut [NoneState], op: &FlowOp) {
    match op {
        FlowOp::Declare { binding, value } => {
            state[binding.0] = match value {
                Some(value) => evaluate(state, *value),
                None => NoneState::Unknown,
            };
        }
        FlowOp::Assign { binding, value } => state[binding.0] = evaluate(state, *value),
        FlowOp::Assume { binding, state: assumed } => state[binding.0] = *assumed,
        FlowOp::Use { .. } => {}
    }
}

fn evaluate(state: &[NoneState], value: ValueSource) -> NoneState {
    match value {
        ValueSource::None => NoneState::DefinitelyNone,
        ValueSource::NotNone => NoneState::DefinitelyNotNone,
        ValueSource::Binding(binding) => state[binding.0],
    }
}

fn join_states(left: &[NoneState], right: &[NoneState]) -> Vec<NoneState> {
    left.iter()
        .zip(right)
        .map(|(left, right)| left.join(*right))
        .collect()
}
