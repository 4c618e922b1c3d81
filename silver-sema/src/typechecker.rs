//! Expression and body checking.
//!
//! Every signature is lowered and every struct's composition resolved before
//! a body is checked, so checking one body only reads shared state and only
//! writes its own diagnostics. Bodies are independent and may be checked in
//! any order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::ast::{
    BinaryExpression, BinaryOperator, Block, CallExpression, Expression, ExpressionKind,
    FieldExpression, FunctionDecl, IfExpression, LetStatement, Literal, SourceSpan, Statement,
    TypeExpression,
};
use crate::builtins;
use crate::cfg;
use crate::composition::{Resolution, ResolvedStruct};
use crate::constraints::{ConstraintSolver, MethodTable, UnifyError, Unifier};
use crate::declarations::{
    generic_scope, DeclarationTable, FunctionDef, FunctionId, PendingBound, Signature, StructDef,
    Symbol, TypeResolver,
};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::enums::EnumRegistry;
use crate::flow;
use crate::options::CheckOptions;
use crate::source::ModulePath;
use crate::typed::{
    Callee, StructRef, TypedBlock, TypedExpression, TypedExpressionKind, TypedField,
    TypedFunction, TypedStatement, TypedStruct,
};
use crate::types::{
    BoundRef, EnumId, NameLookup, PrimitiveKind, StructId, Type, TypeGraph, TypeId,
};

/// Read-only view of everything collected before bodies are checked.
pub struct CheckContext<'a> {
    pub graph: &'a TypeGraph,
    pub table: &'a DeclarationTable,
    pub enums: &'a EnumRegistry,
    pub solver: &'a ConstraintSolver,
    pub compositions: &'a HashMap<StructId, Resolution>,
    pub options: &'a CheckOptions,
}

impl<'a> CheckContext<'a> {
    pub fn resolved(&self, id: StructId) -> Option<&Arc<ResolvedStruct>> {
        self.compositions.get(&id).map(Resolution::resolved)
    }

    pub fn struct_ref(&self, id: StructId) -> StructRef {
        StructRef {
            id,
            concrete: self
                .compositions
                .get(&id)
                .map(Resolution::is_concrete)
                .unwrap_or(false),
        }
    }

    pub fn describe(&self, ty: TypeId) -> String {
        self.graph.describe(ty, self.table)
    }

    fn instantiation(&self, id: StructId, arguments: &[TypeId]) -> HashMap<String, TypeId> {
        self.table
            .struct_def(id)
            .map(|def| def.instantiation(self.graph, arguments))
            .unwrap_or_default()
    }

    /// Whether a value of type `actual` may be stored where `expected` is
    /// required: equal types, or a struct upcast to one of its ancestors.
    pub fn is_assignable(&self, expected: TypeId, actual: TypeId) -> bool {
        let graph = self.graph;
        if expected == actual || graph.is_error(expected) || graph.is_error(actual) {
            return true;
        }
        match (graph.lookup(expected), graph.lookup(actual)) {
            (_, Type::Struct(id, arguments)) => {
                let Some(resolved) = self.resolved(id) else {
                    return false;
                };
                let mapping = self.instantiation(id, &arguments);
                let vars = HashMap::new();
                resolved
                    .ancestors
                    .iter()
                    .any(|ancestor| graph.substitute(*ancestor, &mapping, &vars) == expected)
            }
            (Type::Tuple(left), Type::Tuple(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(&right)
                        .all(|(left, right)| self.is_assignable(*left, *right))
            }
            _ => false,
        }
    }

    /// The method `name` of struct type `receiver` with the receiver's type
    /// arguments substituted, and the struct that implements it.
    pub fn struct_method(&self, receiver: TypeId, name: &str) -> Option<(StructId, Signature)> {
        let Type::Struct(id, arguments) = self.graph.lookup(receiver) else {
            return None;
        };
        let method = self.resolved(id)?.method(name)?;
        let mapping = self.instantiation(id, &arguments);
        Some((method.origin, method.signature.substitute(self.graph, &mapping)))
    }
}

impl MethodTable for CheckContext<'_> {
    fn method_type(&self, receiver: TypeId, name: &str) -> Option<TypeId> {
        match self.graph.lookup(receiver) {
            Type::Struct(..) => self
                .struct_method(receiver, name)
                .map(|(_, signature)| signature.ty),
            Type::Generic {
                bound: Some(bound),
                ..
            } => self.solver.bound_method(self.graph, &bound, name),
            _ => builtins::method_type(self.graph, receiver, name),
        }
    }
}

impl NameLookup for CheckContext<'_> {
    fn struct_name(&self, id: StructId) -> String {
        self.table.struct_name(id)
    }

    fn enum_name(&self, id: EnumId) -> String {
        self.table.enum_name(id)
    }
}

/// Checks a struct type applied to explicit arguments against the bounds of
/// the struct's type parameters.
pub fn check_pending_bound(ctx: &CheckContext<'_>, pending: &PendingBound) -> Vec<Diagnostic> {
    let graph = ctx.graph;
    let Some(def) = ctx.table.struct_def(pending.owner) else {
        return Vec::new();
    };
    let mapping = def.instantiation(graph, &pending.arguments);
    let vars = HashMap::new();

    let mut diagnostics = Vec::new();
    for (parameter, argument) in def.type_parameters.iter().zip(&pending.arguments) {
        let Type::Generic {
            name,
            bound: Some(bound),
        } = graph.lookup(*parameter)
        else {
            continue;
        };
        let instantiated = BoundRef {
            name: bound.name.clone(),
            arguments: bound
                .arguments
                .iter()
                .map(|argument| graph.substitute(*argument, &mapping, &vars))
                .collect(),
        };
        if let Err(error) = ctx.solver.check(graph, ctx, *argument, &instantiated) {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::ConstraintViolation,
                    format!(
                        "{} does not satisfy bound '{}' of type parameter '{name}' of '{}': {error}",
                        ctx.describe(*argument),
                        bound.name,
                        def.decl.name
                    ),
                )
                .with_span(Some(pending.span)),
            );
        }
    }
    diagnostics
}

pub fn check_function(
    ctx: &CheckContext<'_>,
    def: &FunctionDef,
) -> (TypedFunction, Vec<Diagnostic>) {
    let generics = generic_scope(ctx.graph, &def.signature.type_parameters);
    let mut checker = BodyChecker::new(ctx, &def.module, generics);
    let body = checker.function_body(&def.decl, &def.signature, None);
    trace!(function = %def.name, "checked function body");

    let function = TypedFunction {
        name: def.name.clone(),
        owner: None,
        type_parameters: def.signature.type_parameters.clone(),
        params: def.signature.params.clone(),
        returns: def.signature.returns.clone(),
        body,
        generic: def.signature.is_generic(),
        span: def.decl.span,
    };
    let diagnostics = checker.finish(def);
    (function, diagnostics)
}

pub fn check_struct(ctx: &CheckContext<'_>, def: &StructDef) -> (TypedStruct, Vec<Diagnostic>) {
    let graph = ctx.graph;
    let reference = ctx.struct_ref(def.id);
    let struct_generics = def.generic_scope(graph);
    let mut checker = BodyChecker::new(ctx, &def.module, struct_generics.clone());

    let mut defaults: HashMap<String, TypedExpression> = HashMap::new();
    for (decl, field) in def.decl.fields.iter().zip(&def.fields) {
        let Some(default) = &decl.default else {
            continue;
        };
        let typed = checker.expression(default, Some(field.ty));
        checker.ensure_assignable(
            field.ty,
            typed.ty,
            &format!("default of field '{}'", field.name),
            default.span,
        );
        defaults.insert(field.name.clone(), typed);
    }

    let fields = match ctx.resolved(def.id) {
        Some(resolved) => resolved
            .fields
            .iter()
            .map(|field| TypedField {
                name: field.name.clone(),
                ty: field.ty,
                origin: field.origin,
                default: if field.origin == def.id {
                    defaults.remove(&field.name)
                } else {
                    None
                },
            })
            .collect(),
        None => Vec::new(),
    };

    let self_type = def.self_type(graph);
    let mut methods = Vec::with_capacity(def.methods.len());
    for (decl, method) in def.decl.methods.iter().zip(&def.methods) {
        let mut generics = struct_generics.clone();
        generics.extend(generic_scope(graph, &method.signature.type_parameters));
        checker.generics = generics;
        let body = checker.function_body(decl, &method.signature, Some(self_type));
        methods.push(TypedFunction {
            name: method.name.clone(),
            owner: Some(reference),
            type_parameters: method.signature.type_parameters.clone(),
            params: method.signature.params.clone(),
            returns: method.signature.returns.clone(),
            body,
            generic: !def.type_parameters.is_empty() || method.signature.is_generic(),
            span: method.span,
        });
    }
    trace!(name = %def.name, methods = methods.len(), "checked struct");

    let typed = TypedStruct {
        name: def.name.clone(),
        reference,
        ty: self_type,
        type_parameters: def.type_parameters.clone(),
        fields,
        methods,
    };
    let diagnostics = checker
        .diagnostics
        .into_iter()
        .map(|diagnostic| diagnostic.in_source(def.unit))
        .collect();
    (typed, diagnostics)
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Statement,
    /// The tail expression is the block's value, checked against the type if known.
    Value(Option<TypeId>),
}

/// What a call site is checked against.
struct CallShape<'s> {
    name: &'s str,
    type_parameters: &'s [TypeId],
    params: &'s [TypeId],
    returns: &'s [TypeId],
    /// Leading parameters that must be supplied; the rest have defaults.
    required: usize,
}

struct CallOutcome {
    arguments: Vec<TypedExpression>,
    type_arguments: Vec<TypeId>,
    result: TypeId,
}

struct BodyChecker<'a> {
    ctx: &'a CheckContext<'a>,
    module: &'a ModulePath,
    generics: Vec<(String, TypeId)>,
    scopes: Vec<HashMap<String, TypeId>>,
    result: TypeId,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> BodyChecker<'a> {
    fn new(
        ctx: &'a CheckContext<'a>,
        module: &'a ModulePath,
        generics: Vec<(String, TypeId)>,
    ) -> Self {
        Self {
            ctx,
            module,
            generics,
            scopes: vec![HashMap::new()],
            result: ctx.graph.unit(),
            diagnostics: Vec::new(),
        }
    }

    fn finish(self, def: &FunctionDef) -> Vec<Diagnostic> {
        self.diagnostics
            .into_iter()
            .map(|diagnostic| diagnostic.in_source(def.unit))
            .collect()
    }

    fn report<S: Into<String>>(&mut self, code: DiagnosticCode, message: S, span: SourceSpan) {
        self.diagnostics
            .push(Diagnostic::new(code, message).with_span(Some(span)));
    }

    fn describe(&self, ty: TypeId) -> String {
        self.ctx.describe(ty)
    }

    fn declare(&mut self, name: &str, ty: TypeId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn lookup_local(&self, name: &str) -> Option<TypeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn lookup_symbol(&self, name: &str) -> Option<Symbol> {
        self.ctx
            .table
            .resolve_name(self.module, name)
            .map(|(_, symbol)| symbol)
    }

    fn enum_named(&self, expression: &Expression) -> Option<EnumId> {
        let name = expression.as_variable()?;
        if self.lookup_local(name).is_some() {
            return None;
        }
        match self.lookup_symbol(name)? {
            Symbol::Enum(id) => Some(id),
            _ => None,
        }
    }

    fn lower_type(&mut self, expression: &TypeExpression) -> Option<TypeId> {
        let ctx = self.ctx;
        let mut resolver = TypeResolver::new(ctx.graph, ctx.table, self.module)
            .with_generics(self.generics.clone());
        let lowered = resolver.lower_reported(expression, &mut self.diagnostics);
        for pending in resolver.take_pending() {
            let diagnostics = check_pending_bound(ctx, &pending);
            self.diagnostics.extend(diagnostics);
        }
        lowered
    }

    fn ensure_assignable(
        &mut self,
        expected: TypeId,
        actual: TypeId,
        context: &str,
        span: SourceSpan,
    ) -> bool {
        let ctx = self.ctx;
        if ctx.is_assignable(expected, actual) {
            return true;
        }
        match (ctx.graph.lookup(expected), ctx.graph.lookup(actual)) {
            (Type::Tuple(left), Type::Tuple(right)) if left.len() != right.len() => self.report(
                DiagnosticCode::TupleArityMismatch,
                format!(
                    "{context}: expected {} with {} slot(s), found {} with {}",
                    self.describe(expected),
                    left.len(),
                    self.describe(actual),
                    right.len()
                ),
                span,
            ),
            _ => self.report(
                DiagnosticCode::TypeMismatch,
                format!(
                    "{context}: expected {}, found {}",
                    self.describe(expected),
                    self.describe(actual)
                ),
                span,
            ),
        }
        false
    }

    fn report_unify(&mut self, error: UnifyError, context: &str, span: SourceSpan) {
        match error {
            UnifyError::TupleArity { expected, found } => self.report(
                DiagnosticCode::TupleArityMismatch,
                format!(
                    "{context}: expected {}, found {}",
                    self.describe(expected),
                    self.describe(found)
                ),
                span,
            ),
            UnifyError::Mismatch { expected, found } | UnifyError::Occurs { expected, found } => {
                self.report(
                    DiagnosticCode::TypeMismatch,
                    format!(
                        "{context}: expected {}, found {}",
                        self.describe(expected),
                        self.describe(found)
                    ),
                    span,
                )
            }
        }
    }

    fn function_body(
        &mut self,
        decl: &FunctionDecl,
        signature: &Signature,
        self_type: Option<TypeId>,
    ) -> Option<TypedBlock> {
        let body = decl.body.as_ref()?;
        let graph = self.ctx.graph;

        self.scopes = vec![HashMap::new()];
        let mut parameters = Vec::new();
        if let Some(self_type) = self_type {
            self.declare("self", self_type);
            parameters.push(("self".to_string(), decl.span));
        }
        for (parameter, (name, ty)) in decl.parameters.iter().zip(&signature.params) {
            self.declare(name, *ty);
            parameters.push((name.clone(), parameter.span));
        }

        self.result = signature.result(graph);
        let typed = if self.result == graph.unit() {
            self.block(body, Mode::Statement)
        } else {
            let result = self.result;
            let typed = self.block(body, Mode::Value(Some(result)));
            if !typed.diverges {
                match body.tail() {
                    Some(tail) => {
                        self.ensure_assignable(result, typed.ty, "return value", tail.span);
                    }
                    None => self.report(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "function '{}' may exit without returning a value of type {}",
                            decl.name,
                            self.describe(result)
                        ),
                        decl.span,
                    ),
                }
            }
            typed
        };

        let control_flow = cfg::build(&parameters, body);
        let analysis = flow::analyze(&control_flow);
        trace!(
            function = %decl.name,
            violations = analysis.violations.len(),
            "flow analysed"
        );
        self.diagnostics.extend(analysis.diagnostics());
        Some(typed)
    }

    fn block(&mut self, block: &Block, mode: Mode) -> TypedBlock {
        self.scopes.push(HashMap::new());
        let mut statements = Vec::with_capacity(block.statements.len());
        let mut ty = self.ctx.graph.unit();
        let mut diverges = false;

        let count = block.statements.len();
        for (index, statement) in block.statements.iter().enumerate() {
            let is_tail = index + 1 == count;
            let typed = match (statement, mode) {
                (Statement::Expression(expression), Mode::Value(expected)) if is_tail => {
                    let typed = self.expression(expression, expected);
                    ty = typed.ty;
                    TypedStatement::Expression(typed)
                }
                _ => self.statement(statement),
            };
            diverges = diverges || statement_diverges(&typed);
            statements.push(typed);
        }

        self.scopes.pop();
        TypedBlock {
            statements,
            ty,
            diverges,
        }
    }

    fn statement(&mut self, statement: &Statement) -> TypedStatement {
        match statement {
            Statement::Let(statement) => self.let_statement(statement),
            Statement::Expression(expression) => {
                let typed = match &expression.kind {
                    ExpressionKind::If(branch) => {
                        self.if_expression(branch, expression.span, Mode::Statement)
                    }
                    _ => self.expression(expression, None),
                };
                TypedStatement::Expression(typed)
            }
            Statement::Return(statement) => {
                let result = self.result;
                let value = statement
                    .expression
                    .as_ref()
                    .map(|expression| self.expression(expression, Some(result)));
                let found = value
                    .as_ref()
                    .map(|value| value.ty)
                    .unwrap_or_else(|| self.ctx.graph.unit());
                self.ensure_assignable(result, found, "return value", statement.span);
                TypedStatement::Return {
                    value,
                    span: statement.span,
                }
            }
        }
    }

    fn let_statement(&mut self, statement: &LetStatement) -> TypedStatement {
        let graph = self.ctx.graph;
        let declared = statement
            .type_annotation
            .as_ref()
            .map(|annotation| self.lower_type(annotation));
        let expected = declared.flatten();
        let initializer = statement
            .initializer
            .as_ref()
            .map(|initializer| self.expression(initializer, expected));

        let ty = match (declared, &initializer) {
            (Some(Some(declared)), Some(initializer)) => {
                self.ensure_assignable(
                    declared,
                    initializer.ty,
                    &format!("initializer of '{}'", statement.name),
                    initializer.span,
                );
                declared
            }
            (Some(Some(declared)), None) => declared,
            // The annotation was reported when lowering failed.
            (Some(None), _) => graph.error(),
            (None, Some(initializer)) => initializer.ty,
            (None, None) => {
                self.report(
                    DiagnosticCode::UnresolvedType,
                    format!(
                        "cannot infer the type of '{}' without an annotation or initializer",
                        statement.name
                    ),
                    statement.span,
                );
                graph.error()
            }
        };
        self.declare(&statement.name, ty);
        TypedStatement::Let {
            name: statement.name.clone(),
            ty,
            initializer,
            span: statement.span,
        }
    }

    fn expression(&mut self, expression: &Expression, expected: Option<TypeId>) -> TypedExpression {
        let graph = self.ctx.graph;
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::Literal(literal) => {
                let ty = self.literal(literal, expected, span);
                TypedExpression::new(TypedExpressionKind::Literal(literal.clone()), ty, span)
            }
            ExpressionKind::Tuple(items) => {
                let slots = expected.and_then(|ty| match graph.lookup(ty) {
                    Type::Tuple(slots) if slots.len() == items.len() => Some(slots),
                    _ => None,
                });
                let typed: Vec<TypedExpression> = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let slot = slots.as_ref().map(|slots| slots[index]);
                        self.expression(item, slot)
                    })
                    .collect();
                let ty = graph.tuple(typed.iter().map(|item| item.ty).collect());
                TypedExpression::new(TypedExpressionKind::Tuple(typed), ty, span)
            }
            ExpressionKind::List(items) => self.list(items, expected, span),
            ExpressionKind::Dict(entries) => self.dict(entries, expected, span),
            ExpressionKind::Variable(name) => self.variable(name, span),
            ExpressionKind::Assignment(assignment) => {
                let target = self.expression(&assignment.target, None);
                let context = match &target.kind {
                    TypedExpressionKind::Variable(name) => Some(format!("assignment to '{name}'")),
                    TypedExpressionKind::Field { field, .. } => {
                        Some(format!("assignment to field '{field}'"))
                    }
                    TypedExpressionKind::TupleSlot { .. } => {
                        self.report(
                            DiagnosticCode::ImmutableTupleSlot,
                            "tuple slots cannot be reassigned after construction",
                            assignment.target.span,
                        );
                        None
                    }
                    _ => {
                        self.report(
                            DiagnosticCode::TypeMismatch,
                            "invalid assignment target",
                            assignment.target.span,
                        );
                        None
                    }
                };
                let value = self.expression(&assignment.value, Some(target.ty));
                if let Some(context) = context {
                    self.ensure_assignable(target.ty, value.ty, &context, assignment.value.span);
                }
                TypedExpression::new(
                    TypedExpressionKind::Assignment {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    graph.unit(),
                    span,
                )
            }
            ExpressionKind::Call(call) => self.call(call, span),
            ExpressionKind::Field(field) => self.field(field, span),
            ExpressionKind::Binary(binary) => self.binary(binary, span),
            ExpressionKind::If(branch) => self.if_expression(branch, span, Mode::Value(expected)),
        }
    }

    fn literal(&mut self, literal: &Literal, expected: Option<TypeId>, span: SourceSpan) -> TypeId {
        let graph = self.ctx.graph;
        let options = self.ctx.options;
        let expected_kind = expected.and_then(|ty| graph.primitive_kind(ty));
        match literal {
            Literal::Integer(value) => {
                let kind = match expected_kind {
                    Some(kind) if kind.is_numeric() => kind,
                    _ => options.default_integer,
                };
                if let Some((min, max)) = kind.integer_range() {
                    let value = *value;
                    if value < min || value > max {
                        self.report(
                            DiagnosticCode::TypeMismatch,
                            format!("integer literal {value} does not fit in {kind}"),
                            span,
                        );
                    }
                }
                graph.primitive(kind)
            }
            Literal::Float(_) => {
                let kind = match expected_kind {
                    Some(kind) if kind.is_float() => kind,
                    _ => options.default_float,
                };
                graph.primitive(kind)
            }
            Literal::String(_) => graph.primitive(PrimitiveKind::Str),
            Literal::Boolean(_) => graph.primitive(PrimitiveKind::Bool),
            Literal::None => match expected {
                Some(ty) => ty,
                None => {
                    self.report(
                        DiagnosticCode::UnresolvedType,
                        "None needs a known type here; add a type annotation",
                        span,
                    );
                    graph.error()
                }
            },
        }
    }

    fn list(
        &mut self,
        items: &[Expression],
        expected: Option<TypeId>,
        span: SourceSpan,
    ) -> TypedExpression {
        let graph = self.ctx.graph;
        let mut element = expected.and_then(|ty| match graph.lookup(ty) {
            Type::List(element) => Some(element),
            _ => None,
        });
        let mut typed = Vec::with_capacity(items.len());
        for item in items {
            let value = self.expression(item, element);
            match element {
                Some(element) => {
                    self.ensure_assignable(element, value.ty, "list element", item.span);
                }
                None => element = Some(value.ty),
            }
            typed.push(value);
        }
        let element = element.unwrap_or_else(|| {
            self.report(
                DiagnosticCode::UnresolvedType,
                "cannot infer the element type of an empty list",
                span,
            );
            graph.error()
        });
        TypedExpression::new(TypedExpressionKind::List(typed), graph.list(element), span)
    }

    fn dict(
        &mut self,
        entries: &[crate::ast::DictEntry],
        expected: Option<TypeId>,
        span: SourceSpan,
    ) -> TypedExpression {
        let graph = self.ctx.graph;
        let (mut key, mut value) = match expected.map(|ty| graph.lookup(ty)) {
            Some(Type::Dict(key, value)) => (Some(key), Some(value)),
            _ => (None, None),
        };
        let mut typed = Vec::with_capacity(entries.len());
        for entry in entries {
            let typed_key = self.expression(&entry.key, key);
            let typed_value = self.expression(&entry.value, value);
            match key {
                Some(key) => {
                    self.ensure_assignable(key, typed_key.ty, "dict key", entry.key.span);
                }
                None => key = Some(typed_key.ty),
            }
            match value {
                Some(value) => {
                    self.ensure_assignable(value, typed_value.ty, "dict value", entry.value.span);
                }
                None => value = Some(typed_value.ty),
            }
            typed.push((typed_key, typed_value));
        }
        let ty = match (key, value) {
            (Some(key), Some(value)) => graph.dict(key, value),
            _ => {
                self.report(
                    DiagnosticCode::UnresolvedType,
                    "cannot infer the key and value types of an empty dict",
                    span,
                );
                graph.error()
            }
        };
        TypedExpression::new(TypedExpressionKind::Dict(typed), ty, span)
    }

    fn variable(&mut self, name: &str, span: SourceSpan) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        if let Some(ty) = self.lookup_local(name) {
            return TypedExpression::new(TypedExpressionKind::Variable(name.to_string()), ty, span);
        }
        let ty = match self.lookup_symbol(name) {
            Some(Symbol::Function(id)) => match ctx.table.function(id) {
                Some(def) if def.signature.is_generic() => {
                    self.report(
                        DiagnosticCode::UnresolvedType,
                        format!(
                            "generic function '{name}' must be called so its type arguments can be inferred"
                        ),
                        span,
                    );
                    graph.error()
                }
                Some(def) => {
                    return TypedExpression::new(
                        TypedExpressionKind::FunctionRef(id),
                        def.signature.ty,
                        span,
                    )
                }
                None => graph.error(),
            },
            Some(_) => {
                self.report(
                    DiagnosticCode::TypeMismatch,
                    format!("'{name}' is a type, not a value"),
                    span,
                );
                graph.error()
            }
            None => {
                self.report(
                    DiagnosticCode::UnresolvedName,
                    format!("unknown name '{name}'"),
                    span,
                );
                graph.error()
            }
        };
        TypedExpression::new(TypedExpressionKind::Variable(name.to_string()), ty, span)
    }

    fn field(&mut self, field: &FieldExpression, span: SourceSpan) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        if let Some(id) = self.enum_named(&field.object) {
            return self.enum_variant(id, &field.field, span);
        }

        let object = self.expression(&field.object, None);
        let error = graph.error();
        match graph.lookup(object.ty) {
            Type::Struct(id, arguments) => {
                let resolved = ctx.resolved(id);
                let ty = match resolved.and_then(|resolved| resolved.field(&field.field)) {
                    Some(member) => {
                        let mapping = ctx.instantiation(id, &arguments);
                        graph.substitute(member.ty, &mapping, &HashMap::new())
                    }
                    None => {
                        let message = if resolved
                            .and_then(|resolved| resolved.method(&field.field))
                            .is_some()
                        {
                            format!(
                                "method '{}' of {} must be called",
                                field.field,
                                self.describe(object.ty)
                            )
                        } else {
                            format!(
                                "{} has no field '{}'",
                                self.describe(object.ty),
                                field.field
                            )
                        };
                        self.report(DiagnosticCode::UnknownMember, message, span);
                        error
                    }
                };
                TypedExpression::new(
                    TypedExpressionKind::Field {
                        object: Box::new(object),
                        field: field.field.clone(),
                    },
                    ty,
                    span,
                )
            }
            Type::Tuple(slots) => match field.field.parse::<usize>() {
                Ok(index) if index < slots.len() => TypedExpression::new(
                    TypedExpressionKind::TupleSlot {
                        tuple: Box::new(object),
                        index,
                    },
                    slots[index],
                    span,
                ),
                _ => {
                    self.report(
                        DiagnosticCode::UnknownMember,
                        format!(
                            "{} has no slot '{}'",
                            self.describe(object.ty),
                            field.field
                        ),
                        span,
                    );
                    TypedExpression::new(
                        TypedExpressionKind::Field {
                            object: Box::new(object),
                            field: field.field.clone(),
                        },
                        error,
                        span,
                    )
                }
            },
            other => {
                if other != Type::Error {
                    self.report(
                        DiagnosticCode::UnknownMember,
                        format!(
                            "{} has no field '{}'",
                            self.describe(object.ty),
                            field.field
                        ),
                        span,
                    );
                }
                TypedExpression::new(
                    TypedExpressionKind::Field {
                        object: Box::new(object),
                        field: field.field.clone(),
                    },
                    error,
                    span,
                )
            }
        }
    }

    fn enum_variant(&mut self, id: EnumId, variant: &str, span: SourceSpan) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let kind = TypedExpressionKind::EnumVariant {
            id,
            variant: variant.to_string(),
            index: 0,
        };
        // A rejected enum has already been reported.
        let Some(info) = ctx.enums.get(id) else {
            return TypedExpression::new(kind, graph.error(), span);
        };
        match info.variant(variant) {
            Some((index, _)) => TypedExpression::new(
                TypedExpressionKind::EnumVariant {
                    id,
                    variant: variant.to_string(),
                    index,
                },
                graph.enum_type(id),
                span,
            ),
            None => {
                self.report(
                    DiagnosticCode::UnknownMember,
                    format!("enum '{}' has no variant '{variant}'", info.name),
                    span,
                );
                TypedExpression::new(kind, graph.error(), span)
            }
        }
    }

    fn call(&mut self, call: &CallExpression, span: SourceSpan) -> TypedExpression {
        let graph = self.ctx.graph;
        match &call.callee.kind {
            ExpressionKind::Field(field) if self.enum_named(&field.object).is_none() => {
                return self.method_call(field, call, span);
            }
            ExpressionKind::Variable(name) if self.lookup_local(name).is_none() => {
                match self.lookup_symbol(name) {
                    Some(Symbol::Struct(id)) => return self.construct(id, call, span),
                    Some(Symbol::Function(id)) => return self.function_call(id, call, span),
                    _ => {}
                }
            }
            _ => {}
        }

        let callee = self.expression(&call.callee, None);
        match graph.lookup(callee.ty) {
            Type::Function { params, returns } => {
                let shape = CallShape {
                    name: "function value",
                    type_parameters: &[],
                    params: &params,
                    returns: &returns,
                    required: params.len(),
                };
                let outcome = self.apply(&shape, &call.type_arguments, &call.arguments, span);
                call_expression(Callee::Value(Box::new(callee)), outcome, span)
            }
            other => {
                if other != Type::Error {
                    self.report(
                        DiagnosticCode::TypeMismatch,
                        format!("{} is not callable", self.describe(callee.ty)),
                        call.callee.span,
                    );
                }
                self.unchecked_call(Callee::Value(Box::new(callee)), call, span)
            }
        }
    }

    /// Checks the arguments of a call whose callee could not be resolved.
    fn unchecked_call(
        &mut self,
        callee: Callee,
        call: &CallExpression,
        span: SourceSpan,
    ) -> TypedExpression {
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.expression(argument, None))
            .collect();
        TypedExpression::new(
            TypedExpressionKind::Call {
                callee,
                type_arguments: Vec::new(),
                arguments,
            },
            self.ctx.graph.error(),
            span,
        )
    }

    fn method_call(
        &mut self,
        field: &FieldExpression,
        call: &CallExpression,
        span: SourceSpan,
    ) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let receiver = self.expression(&field.object, None);
        let receiver_ty = receiver.ty;
        let name = field.field.as_str();

        let (callee, method) = match graph.lookup(receiver.ty) {
            Type::Struct(..) => match ctx.struct_method(receiver.ty, name) {
                Some((origin, signature)) => (
                    Callee::Method {
                        receiver: Box::new(receiver),
                        origin,
                        name: name.to_string(),
                    },
                    Some(signature),
                ),
                None => return self.field_value_call(receiver, field, call, span),
            },
            Type::Generic {
                bound: Some(bound),
                ..
            } => {
                let signature = ctx
                    .solver
                    .bound_method(graph, &bound, name)
                    .and_then(|ty| function_signature(graph, ty));
                (
                    Callee::BoundMethod {
                        receiver: Box::new(receiver),
                        name: name.to_string(),
                    },
                    signature,
                )
            }
            Type::Error => {
                return self.unchecked_call(Callee::Value(Box::new(receiver)), call, span);
            }
            _ => {
                let signature = builtins::method_type(graph, receiver.ty, name)
                    .and_then(|ty| function_signature(graph, ty));
                (
                    Callee::Builtin {
                        receiver: Box::new(receiver),
                        name: name.to_string(),
                    },
                    signature,
                )
            }
        };

        let Some(signature) = method else {
            self.report(
                DiagnosticCode::UnknownMember,
                format!("{} has no method '{name}'", self.describe(receiver_ty)),
                span,
            );
            return self.unchecked_call(callee, call, span);
        };

        let params: Vec<TypeId> = signature.params.iter().map(|(_, ty)| *ty).collect();
        let shape = CallShape {
            name,
            type_parameters: &signature.type_parameters,
            params: &params,
            returns: &signature.returns,
            required: params.len(),
        };
        let outcome = self.apply(&shape, &call.type_arguments, &call.arguments, span);
        call_expression(callee, outcome, span)
    }

    /// `object.callback(..)` where `callback` is a function-typed field.
    fn field_value_call(
        &mut self,
        receiver: TypedExpression,
        field: &FieldExpression,
        call: &CallExpression,
        span: SourceSpan,
    ) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let field_ty = match graph.lookup(receiver.ty) {
            Type::Struct(id, arguments) => ctx
                .resolved(id)
                .and_then(|resolved| resolved.field(&field.field))
                .map(|member| {
                    graph.substitute(member.ty, &ctx.instantiation(id, &arguments), &HashMap::new())
                }),
            _ => None,
        };
        let receiver_ty = receiver.ty;
        let value = TypedExpression::new(
            TypedExpressionKind::Field {
                object: Box::new(receiver),
                field: field.field.clone(),
            },
            field_ty.unwrap_or_else(|| graph.error()),
            call.callee.span,
        );
        match field_ty.map(|ty| graph.lookup(ty)) {
            Some(Type::Function { params, returns }) => {
                let shape = CallShape {
                    name: &field.field,
                    type_parameters: &[],
                    params: &params,
                    returns: &returns,
                    required: params.len(),
                };
                let outcome = self.apply(&shape, &call.type_arguments, &call.arguments, span);
                call_expression(Callee::Value(Box::new(value)), outcome, span)
            }
            _ => {
                self.report(
                    DiagnosticCode::UnknownMember,
                    format!(
                        "{} has no method '{}'",
                        self.describe(receiver_ty),
                        field.field
                    ),
                    span,
                );
                self.unchecked_call(Callee::Value(Box::new(value)), call, span)
            }
        }
    }

    fn function_call(
        &mut self,
        id: FunctionId,
        call: &CallExpression,
        span: SourceSpan,
    ) -> TypedExpression {
        let ctx = self.ctx;
        let Some(def) = ctx.table.function(id) else {
            return self.unchecked_call(Callee::Function(id), call, span);
        };
        let params: Vec<TypeId> = def.signature.params.iter().map(|(_, ty)| *ty).collect();
        let shape = CallShape {
            name: &def.decl.name,
            type_parameters: &def.signature.type_parameters,
            params: &params,
            returns: &def.signature.returns,
            required: params.len(),
        };
        let outcome = self.apply(&shape, &call.type_arguments, &call.arguments, span);
        call_expression(Callee::Function(id), outcome, span)
    }

    fn construct(
        &mut self,
        id: StructId,
        call: &CallExpression,
        span: SourceSpan,
    ) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let reference = ctx.struct_ref(id);
        let (Some(def), Some(resolved)) = (ctx.table.struct_def(id), ctx.resolved(id)) else {
            return self.unchecked_call(Callee::Construct(reference), call, span);
        };

        if !reference.concrete {
            let unmet: Vec<&str> = resolved
                .abstract_methods()
                .map(|method| method.name.as_str())
                .collect();
            let detail = if unmet.is_empty() {
                String::new()
            } else {
                format!("; abstract method(s): {}", unmet.join(", "))
            };
            self.report(
                DiagnosticCode::NotConstructible,
                format!(
                    "struct '{}' is not concrete and cannot be constructed{detail}",
                    def.decl.name
                ),
                span,
            );
        }

        let params: Vec<TypeId> = resolved.fields.iter().map(|field| field.ty).collect();
        let returns = [def.self_type(graph)];
        let shape = CallShape {
            name: &def.decl.name,
            type_parameters: &def.type_parameters,
            params: &params,
            returns: &returns,
            required: resolved.required_arity(),
        };
        let outcome = self.apply(&shape, &call.type_arguments, &call.arguments, span);
        call_expression(Callee::Construct(reference), outcome, span)
    }

    /// Checks a call against `shape`: arity, explicit and inferred type
    /// arguments, argument types and the bounds of the type parameters.
    fn apply(
        &mut self,
        shape: &CallShape<'_>,
        type_arguments: &[TypeExpression],
        arguments: &[Expression],
        span: SourceSpan,
    ) -> CallOutcome {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let no_vars = HashMap::new();

        if arguments.len() < shape.required || arguments.len() > shape.params.len() {
            let expected = if shape.required == shape.params.len() {
                shape.params.len().to_string()
            } else {
                format!("{} to {}", shape.required, shape.params.len())
            };
            self.report(
                DiagnosticCode::ArgumentCountMismatch,
                format!(
                    "'{}' expects {expected} argument(s), found {}",
                    shape.name,
                    arguments.len()
                ),
                span,
            );
        }

        let mut unifier = Unifier::new(graph);
        let mapping = unifier.instantiate(shape.type_parameters);
        if !type_arguments.is_empty() {
            if type_arguments.len() != shape.type_parameters.len() {
                self.report(
                    DiagnosticCode::ArgumentCountMismatch,
                    format!(
                        "'{}' expects {} type argument(s), found {}",
                        shape.name,
                        shape.type_parameters.len(),
                        type_arguments.len()
                    ),
                    span,
                );
            } else {
                for (parameter, argument) in shape.type_parameters.iter().zip(type_arguments) {
                    let slot = parameter_name(graph, *parameter)
                        .and_then(|name| mapping.get(&name).copied());
                    if let (Some(slot), Some(ty)) = (slot, self.lower_type(argument)) {
                        if let Err(error) = unifier.unify(slot, ty) {
                            self.report_unify(error, "type argument", argument.span);
                        }
                    }
                }
            }
        }

        let params: Vec<TypeId> = shape
            .params
            .iter()
            .map(|param| graph.substitute(*param, &mapping, &no_vars))
            .collect();
        let mut typed = Vec::with_capacity(arguments.len());
        for (index, argument) in arguments.iter().enumerate() {
            let parameter = params.get(index).copied();
            let expected = parameter
                .map(|parameter| unifier.resolve(parameter))
                .filter(|parameter| !unifier.is_unbound(*parameter));

            if argument.is_none_literal() {
                self.report(
                    DiagnosticCode::NoneUseError,
                    format!("None passed as argument {} of '{}'", index + 1, shape.name),
                    argument.span,
                );
                typed.push(TypedExpression::new(
                    TypedExpressionKind::Literal(Literal::None),
                    expected.unwrap_or_else(|| graph.error()),
                    argument.span,
                ));
                continue;
            }

            let value = self.expression(argument, expected);
            if let Some(parameter) = parameter {
                let context = format!("argument {} of '{}'", index + 1, shape.name);
                if let Err(error) = unifier.unify(parameter, value.ty) {
                    let resolved = unifier.resolve(parameter);
                    let upcast =
                        !unifier.is_unbound(resolved) && ctx.is_assignable(resolved, value.ty);
                    if !upcast {
                        self.report_unify(error, &context, argument.span);
                    }
                }
            }
            typed.push(value);
        }

        self.check_call_bounds(shape, &mut unifier, &mapping, span);

        let mut resolved_arguments = Vec::with_capacity(shape.type_parameters.len());
        for parameter in shape.type_parameters {
            let Some(name) = parameter_name(graph, *parameter) else {
                continue;
            };
            let Some(slot) = mapping.get(&name) else {
                continue;
            };
            let resolved = unifier.resolve(*slot);
            if unifier.is_unbound(resolved) {
                self.report(
                    DiagnosticCode::UnresolvedType,
                    format!(
                        "cannot infer type parameter '{name}' of '{}'; pass it explicitly",
                        shape.name
                    ),
                    span,
                );
                resolved_arguments.push(graph.error());
            } else {
                resolved_arguments.push(resolved);
            }
        }

        let returns: Vec<TypeId> = shape
            .returns
            .iter()
            .map(|ty| unifier.resolve(graph.substitute(*ty, &mapping, &no_vars)))
            .collect();
        let result = graph.returns_as_value(&returns);
        let result = if unifier.is_unbound(result) {
            graph.error()
        } else {
            result
        };

        CallOutcome {
            arguments: typed,
            type_arguments: resolved_arguments,
            result,
        }
    }

    /// Checks every bounded type parameter once its slot is bound. A
    /// structural bound may bind the slot of another parameter, as
    /// `C: Collection[I]` binds `I`, so checking repeats while it makes
    /// progress.
    fn check_call_bounds(
        &mut self,
        shape: &CallShape<'_>,
        unifier: &mut Unifier<'_>,
        mapping: &HashMap<String, TypeId>,
        span: SourceSpan,
    ) {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let no_vars = HashMap::new();

        let mut pending: Vec<(String, TypeId, BoundRef)> = shape
            .type_parameters
            .iter()
            .filter_map(|parameter| match graph.lookup(*parameter) {
                Type::Generic {
                    name,
                    bound: Some(bound),
                } => {
                    let slot = *mapping.get(&name)?;
                    Some((name, slot, bound))
                }
                _ => None,
            })
            .collect();

        loop {
            let before = pending.len();
            let mut index = 0;
            while index < pending.len() {
                let candidate = unifier.resolve(pending[index].1);
                if unifier.is_unbound(candidate) {
                    index += 1;
                    continue;
                }
                let (parameter, _, bound) = pending.remove(index);
                let arguments: Vec<TypeId> = bound
                    .arguments
                    .iter()
                    .map(|argument| unifier.resolve(graph.substitute(*argument, mapping, &no_vars)))
                    .collect();
                let instantiated = BoundRef {
                    name: bound.name.clone(),
                    arguments: arguments.clone(),
                };
                match ctx.solver.check(graph, ctx, candidate, &instantiated) {
                    Ok(bindings) => {
                        for (argument, binding) in arguments.iter().zip(bindings) {
                            if graph.is_error(binding) {
                                continue;
                            }
                            if let Err(error) = unifier.unify(*argument, binding) {
                                let context = format!("bound '{}' of '{parameter}'", bound.name);
                                self.report_unify(error, &context, span);
                            }
                        }
                    }
                    Err(error) => self.report(
                        DiagnosticCode::ConstraintViolation,
                        format!(
                            "{} does not satisfy bound '{}' of type parameter '{parameter}' of '{}': {error}",
                            self.describe(candidate),
                            bound.name,
                            shape.name
                        ),
                        span,
                    ),
                }
            }
            if pending.len() == before {
                break;
            }
        }
    }

    fn binary(&mut self, binary: &BinaryExpression, span: SourceSpan) -> TypedExpression {
        let ctx = self.ctx;
        let graph = ctx.graph;
        let operator = binary.operator;
        let bool_ty = graph.primitive(PrimitiveKind::Bool);

        let (left, right, ty) = if matches!(operator, BinaryOperator::And | BinaryOperator::Or) {
            let left = self.expression(&binary.left, Some(bool_ty));
            let right = self.expression(&binary.right, Some(bool_ty));
            let context = format!("operand of '{}'", operator.symbol());
            self.ensure_assignable(bool_ty, left.ty, &context, binary.left.span);
            self.ensure_assignable(bool_ty, right.ty, &context, binary.right.span);
            (left, right, bool_ty)
        } else {
            let (left, right) = self.operands(binary);
            let either_error = graph.is_error(left.ty) || graph.is_error(right.ty);
            if operator.is_equality() {
                if !ctx.is_assignable(left.ty, right.ty) && !ctx.is_assignable(right.ty, left.ty) {
                    self.report(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "cannot compare {} with {}",
                            self.describe(left.ty),
                            self.describe(right.ty)
                        ),
                        span,
                    );
                }
                (left, right, bool_ty)
            } else {
                let same = either_error || left.ty == right.ty;
                if !same {
                    self.report(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "operator '{}': expected {}, found {}",
                            operator.symbol(),
                            self.describe(left.ty),
                            self.describe(right.ty)
                        ),
                        span,
                    );
                }
                if operator.is_ordering() {
                    if same
                        && !either_error
                        && !ctx.solver.satisfies(graph, ctx, left.ty, "Ordered")
                    {
                        self.report(
                            DiagnosticCode::TypeMismatch,
                            format!(
                                "operator '{}' requires ordered operands, found {}",
                                operator.symbol(),
                                self.describe(left.ty)
                            ),
                            span,
                        );
                    }
                    (left, right, bool_ty)
                } else {
                    let concatenation = operator == BinaryOperator::Add
                        && graph.primitive_kind(left.ty) == Some(PrimitiveKind::Str);
                    if same
                        && !either_error
                        && !concatenation
                        && !ctx.solver.satisfies(graph, ctx, left.ty, "Numeric")
                    {
                        self.report(
                            DiagnosticCode::TypeMismatch,
                            format!(
                                "operator '{}' requires numeric operands, found {}",
                                operator.symbol(),
                                self.describe(left.ty)
                            ),
                            span,
                        );
                    }
                    let ty = if same { left.ty } else { graph.error() };
                    (left, right, ty)
                }
            }
        };

        TypedExpression::new(
            TypedExpressionKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        )
    }

    /// Types both operands; a literal takes its type from the other side.
    fn operands(&mut self, binary: &BinaryExpression) -> (TypedExpression, TypedExpression) {
        let is_literal =
            |expression: &Expression| matches!(expression.kind, ExpressionKind::Literal(_));
        if is_literal(&binary.left) && !is_literal(&binary.right) {
            let right = self.expression(&binary.right, None);
            let left = self.expression(&binary.left, Some(right.ty));
            (left, right)
        } else {
            let left = self.expression(&binary.left, None);
            let right = self.expression(&binary.right, Some(left.ty));
            (left, right)
        }
    }

    fn if_expression(
        &mut self,
        branch: &IfExpression,
        span: SourceSpan,
        mode: Mode,
    ) -> TypedExpression {
        let graph = self.ctx.graph;
        let bool_ty = graph.primitive(PrimitiveKind::Bool);
        let condition = self.expression(&branch.condition, Some(bool_ty));
        self.ensure_assignable(bool_ty, condition.ty, "if condition", branch.condition.span);

        let (then_branch, else_branch, ty) = match mode {
            Mode::Statement => {
                let then_branch = self.block(&branch.then_branch, Mode::Statement);
                let else_branch = branch
                    .else_branch
                    .as_ref()
                    .map(|block| self.block(block, Mode::Statement));
                (then_branch, else_branch, graph.unit())
            }
            Mode::Value(expected) => {
                let then_branch = self.block(&branch.then_branch, Mode::Value(expected));
                match &branch.else_branch {
                    None => {
                        self.report(
                            DiagnosticCode::TypeMismatch,
                            "an if used as a value needs an else branch",
                            span,
                        );
                        (then_branch, None, graph.error())
                    }
                    Some(else_block) => {
                        let else_expected =
                            expected.or((!then_branch.diverges).then_some(then_branch.ty));
                        let else_branch = self.block(else_block, Mode::Value(else_expected));
                        let then_span = branch_span(&branch.then_branch, span);
                        let else_span = branch_span(else_block, span);
                        let ty = match (then_branch.diverges, else_branch.diverges) {
                            (true, true) => expected.unwrap_or_else(|| graph.unit()),
                            (true, false) => else_branch.ty,
                            (false, true) => then_branch.ty,
                            (false, false) => {
                                let target = expected.unwrap_or(then_branch.ty);
                                if expected.is_some() {
                                    self.ensure_assignable(
                                        target,
                                        then_branch.ty,
                                        "then branch",
                                        then_span,
                                    );
                                }
                                self.ensure_assignable(
                                    target,
                                    else_branch.ty,
                                    "else branch",
                                    else_span,
                                );
                                target
                            }
                        };
                        (then_branch, Some(else_branch), ty)
                    }
                }
            }
        };

        TypedExpression::new(
            TypedExpressionKind::If {
                condition: Box::new(condition),
                then_branch,
                else_branch,
            },
            ty,
            span,
        )
    }
}

fn call_expression(callee: Callee, outcome: CallOutcome, span: SourceSpan) -> TypedExpression {
    TypedExpression::new(
        TypedExpressionKind::Call {
            callee,
            type_arguments: outcome.type_arguments,
            arguments: outcome.arguments,
        },
        outcome.result,
        span,
    )
}

fn statement_diverges(statement: &TypedStatement) -> bool {
    match statement {
        TypedStatement::Return { .. } => true,
        TypedStatement::Expression(TypedExpression {
            kind:
                TypedExpressionKind::If {
                    then_branch,
                    else_branch: Some(else_branch),
                    ..
                },
            ..
        }) => then_branch.diverges && else_branch.diverges,
        _ => false,
    }
}

fn branch_span(block: &Block, fallback: SourceSpan) -> SourceSpan {
    block.tail().map(|tail| tail.span).unwrap_or(fallback)
}

fn parameter_name(graph: &TypeGraph, parameter: TypeId) -> Option<String> {
    match graph.lookup(parameter) {
        Type::Generic { name, .. } => Some(name),
        _ => None,
    }
}

/// Reads a builtin or bound method's function type back as a signature.
fn function_signature(graph: &TypeGraph, ty: TypeId) -> Option<Signature> {
    match graph.lookup(ty) {
        Type::Function { params, returns } => Some(Signature::new(
            graph,
            Vec::new(),
            params
                .into_iter()
                .enumerate()
                .map(|(index, ty)| (format!("arg{index}"), ty))
                .collect(),
            returns,
        )),
        _ => None,
    }
}
