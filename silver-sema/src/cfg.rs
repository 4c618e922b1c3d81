//! Control-flow graphs over function bodies.
//!
//! The graph only records what flow analysis needs: where bindings are
//! declared, assigned, narrowed and used. Names are resolved lexically while
//! building, so every `let` gets its own [`BindingId`] even when it shadows
//! an outer name.

use std::collections::HashMap;

use crate::ast::{
    BinaryOperator, Block, Expression, ExpressionKind, IfExpression, Literal, SourceSpan,
    Statement,
};
use crate::flow::NoneState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseKind {
    Read,
    Receiver,
    FieldAccess,
    Argument,
    /// Operand of an arithmetic or ordering operator.
    Operand,
}

impl UseKind {
    /// Whether this use needs an actual value rather than a possibly-None slot.
    pub fn requires_value(self) -> bool {
        !matches!(self, UseKind::Read)
    }

    pub fn describe(self) -> &'static str {
        match self {
            UseKind::Read => "read",
            UseKind::Receiver => "used as a method receiver",
            UseKind::FieldAccess => "used for field access",
            UseKind::Argument => "passed as an argument",
            UseKind::Operand => "used as an operand",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    None,
    NotNone,
    Binding(BindingId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowOp {
    /// `value` is `None` for a declaration without initializer.
    Declare {
        binding: BindingId,
        value: Option<ValueSource>,
    },
    Assign {
        binding: BindingId,
        value: ValueSource,
    },
    /// Narrowing from a `== None` / `!= None` guard.
    Assume {
        binding: BindingId,
        state: NoneState,
    },
    Use {
        binding: BindingId,
        kind: UseKind,
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub ops: Vec<FlowOp>,
    pub successors: Vec<BlockId>,
}

#[derive(Debug, Clone)]
pub struct BindingInfo {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub blocks: Vec<BasicBlock>,
    pub bindings: Vec<BindingInfo>,
}

impl ControlFlowGraph {
    pub const ENTRY: BlockId = BlockId(0);
    pub const EXIT: BlockId = BlockId(1);

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn binding(&self, id: BindingId) -> &BindingInfo {
        &self.bindings[id.0]
    }

    /// The last binding declared under `name`.
    pub fn binding_named(&self, name: &str) -> Option<BindingId> {
        self.bindings
            .iter()
            .rposition(|binding| binding.name == name)
            .map(BindingId)
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.successors.contains(&id))
            .map(|(index, _)| BlockId(index))
            .collect()
    }
}

/// Builds the graph of a body whose `parameters` are bound on entry.
pub fn build(parameters: &[(String, SourceSpan)], body: &Block) -> ControlFlowGraph {
    let mut builder = CfgBuilder::new();
    for (name, span) in parameters {
        let binding = builder.new_binding(name, *span);
        builder.emit(FlowOp::Declare {
            binding,
            value: Some(ValueSource::NotNone),
        });
        builder.bind(name, binding);
    }
    builder.statements(&body.statements);
    builder.edge(builder.current, ControlFlowGraph::EXIT);
    ControlFlowGraph {
        blocks: builder.blocks,
        bindings: builder.bindings,
    }
}

struct CfgBuilder {
    blocks: Vec<BasicBlock>,
    bindings: Vec<BindingInfo>,
    scopes: Vec<HashMap<String, BindingId>>,
    current: BlockId,
}

impl CfgBuilder {
    fn new() -> Self {
        Self {
            blocks: vec![BasicBlock::default(), BasicBlock::default()],
            bindings: Vec::new(),
            scopes: vec![HashMap::new()],
            current: ControlFlowGraph::ENTRY,
        }
    }

    fn new_block(&mut self) -> BlockId {
        self.blocks.push(BasicBlock::default());
        BlockId(self.blocks.len() - 1)
    }

    fn edge(&mut self, from: BlockId, to: BlockId) {
        let successors = &mut self.blocks[from.0].successors;
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    fn emit(&mut self, op: FlowOp) {
        self.blocks[self.current.0].ops.push(op);
    }

    fn new_binding(&mut self, name: &str, span: SourceSpan) -> BindingId {
        self.bindings.push(BindingInfo {
            name: name.to_string(),
            span,
        });
        BindingId(self.bindings.len() - 1)
    }

    fn bind(&mut self, name: &str, binding: BindingId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), binding);
        }
    }

    fn lookup(&self, name: &str) -> Option<BindingId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Let(statement) => {
                let binding = self.new_binding(&statement.name, statement.span);
                match &statement.initializer {
                    Some(Expression {
                        kind: ExpressionKind::If(branch),
                        ..
                    }) => {
                        self.emit(FlowOp::Declare {
                            binding,
                            value: None,
                        });
                        self.branch(branch, Some(binding));
                    }
                    Some(initializer) => {
                        let value = self.expression(initializer, UseKind::Read);
                        self.emit(FlowOp::Declare {
                            binding,
                            value: Some(value),
                        });
                    }
                    None => self.emit(FlowOp::Declare {
                        binding,
                        value: None,
                    }),
                }
                self.bind(&statement.name, binding);
            }
            Statement::Expression(expression) => {
                self.expression(expression, UseKind::Read);
            }
            Statement::Return(statement) => {
                if let Some(expression) = &statement.expression {
                    self.expression(expression, UseKind::Read);
                }
                self.edge(self.current, ControlFlowGraph::EXIT);
                // Anything after a return is unreachable.
                self.current = self.new_block();
            }
        }
    }

    fn assign(&mut self, binding: BindingId, value: &Expression) {
        if let ExpressionKind::If(branch) = &value.kind {
            self.branch(branch, Some(binding));
            return;
        }
        let value = self.expression(value, UseKind::Read);
        self.emit(FlowOp::Assign { binding, value });
    }

    fn expression(&mut self, expression: &Expression, kind: UseKind) -> ValueSource {
        match &expression.kind {
            ExpressionKind::Literal(Literal::None) => ValueSource::None,
            ExpressionKind::Literal(_) => ValueSource::NotNone,
            ExpressionKind::Variable(name) => match self.lookup(name) {
                Some(binding) => {
                    self.emit(FlowOp::Use {
                        binding,
                        kind,
                        span: expression.span,
                    });
                    ValueSource::Binding(binding)
                }
                None => ValueSource::NotNone,
            },
            ExpressionKind::Tuple(items) | ExpressionKind::List(items) => {
                for item in items {
                    self.expression(item, UseKind::Read);
                }
                ValueSource::NotNone
            }
            ExpressionKind::Dict(entries) => {
                for entry in entries {
                    self.expression(&entry.key, UseKind::Read);
                    self.expression(&entry.value, UseKind::Read);
                }
                ValueSource::NotNone
            }
            ExpressionKind::Assignment(assignment) => {
                match &assignment.target.kind {
                    ExpressionKind::Variable(name) => match self.lookup(name) {
                        Some(binding) => self.assign(binding, &assignment.value),
                        None => {
                            self.expression(&assignment.value, UseKind::Read);
                        }
                    },
                    _ => {
                        self.expression(&assignment.value, UseKind::Read);
                        self.target(&assignment.target);
                    }
                }
                ValueSource::NotNone
            }
            ExpressionKind::Call(call) => {
                match &call.callee.kind {
                    ExpressionKind::Field(field) => {
                        self.expression(&field.object, UseKind::Receiver);
                    }
                    _ => {
                        self.expression(&call.callee, UseKind::Read);
                    }
                }
                for argument in &call.arguments {
                    self.expression(argument, UseKind::Argument);
                }
                ValueSource::NotNone
            }
            ExpressionKind::Field(field) => {
                self.expression(&field.object, UseKind::FieldAccess);
                ValueSource::NotNone
            }
            ExpressionKind::Binary(binary) => {
                let operand_kind = if binary.operator.is_arithmetic()
                    || binary.operator.is_ordering()
                {
                    UseKind::Operand
                } else {
                    UseKind::Read
                };
                self.expression(&binary.left, operand_kind);
                self.expression(&binary.right, operand_kind);
                ValueSource::NotNone
            }
            ExpressionKind::If(branch) => {
                self.branch(branch, None);
                ValueSource::NotNone
            }
        }
    }

    /// The object of a field assignment target is accessed, not replaced.
    fn target(&mut self, target: &Expression) {
        match &target.kind {
            ExpressionKind::Field(field) => {
                self.expression(&field.object, UseKind::FieldAccess);
            }
            _ => {
                self.expression(target, UseKind::Read);
            }
        }
    }

    /// Lowers an `if`. When `target` is given, each branch's tail value is
    /// assigned to it at the end of the branch so the join merges both.
    fn branch(&mut self, branch: &IfExpression, target: Option<BindingId>) {
        self.expression(&branch.condition, UseKind::Read);
        let narrowing = self.none_guard(&branch.condition);

        let before = self.current;
        let then_block = self.new_block();
        let else_block = self.new_block();
        let join = self.new_block();
        self.edge(before, then_block);
        self.edge(before, else_block);

        self.current = then_block;
        if let Some((binding, then_state, _)) = narrowing {
            self.emit(FlowOp::Assume {
                binding,
                state: then_state,
            });
        }
        self.branch_body(&branch.then_branch, target);
        self.edge(self.current, join);

        self.current = else_block;
        if let Some((binding, _, else_state)) = narrowing {
            self.emit(FlowOp::Assume {
                binding,
                state: else_state,
            });
        }
        if let Some(else_branch) = &branch.else_branch {
            self.branch_body(else_branch, target);
        }
        self.edge(self.current, join);

        self.current = join;
    }

    fn branch_body(&mut self, block: &Block, target: Option<BindingId>) {
        self.scopes.push(HashMap::new());
        match (target, block.statements.split_last()) {
            (Some(binding), Some((Statement::Expression(tail), leading))) => {
                self.statements(leading);
                self.assign(binding, tail);
            }
            _ => self.statements(&block.statements),
        }
        self.scopes.pop();
    }

    /// `x == None` narrows `x` to None in the then-branch and to not-None in
    /// the else-branch; `!=` the other way round.
    fn none_guard(&self, condition: &Expression) -> Option<(BindingId, NoneState, NoneState)> {
        let ExpressionKind::Binary(binary) = &condition.kind else {
            return None;
        };
        let name = match (binary.left.as_variable(), binary.right.as_variable()) {
            (Some(name), _) if binary.right.is_none_literal() => name,
            (_, Some(name)) if binary.left.is_none_literal() => name,
            _ => return None,
        };
        let binding = self.lookup(name)?;
        match binary.operator {
            BinaryOperator::Equal => Some((
                binding,
                NoneState::DefinitelyNone,
                NoneState::DefinitelyNotNone,
            )),
            BinaryOperator::NotEqual => Some((
                binding,
                NoneState::DefinitelyNotNone,
                NoneState::DefinitelyNone,
            )),
            _ => None,
        }
    }
}
