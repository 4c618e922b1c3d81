//! The typed program handed to code generation.
//!
//! Mirrors the input tree with a resolved [`TypeId`] on every expression and
//! a concrete/non-concrete classification on every struct reference.

use serde::Serialize;

use crate::ast::{BinaryOperator, Literal, SourceSpan};
use crate::declarations::FunctionId;
use crate::enums::EnumVariant;
use crate::types::{EnumId, PrimitiveKind, StructId, TypeGraph, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StructRef {
    pub id: StructId,
    pub concrete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TypedProgram {
    pub structs: Vec<TypedStruct>,
    pub enums: Vec<TypedEnum>,
    pub functions: Vec<TypedFunction>,
}

#[derive(Debug, Clone)]
pub struct TypedStruct {
    pub name: String,
    pub reference: StructRef,
    /// The struct applied to its own type parameters.
    pub ty: TypeId,
    pub type_parameters: Vec<TypeId>,
    /// Effective fields in initialization order, inherited ones first.
    pub fields: Vec<TypedField>,
    pub methods: Vec<TypedFunction>,
}

#[derive(Debug, Clone)]
pub struct TypedField {
    pub name: String,
    pub ty: TypeId,
    pub origin: StructId,
    /// Only present on the struct that declares the field.
    pub default: Option<TypedExpression>,
}

#[derive(Debug, Clone)]
pub struct TypedEnum {
    pub id: EnumId,
    pub name: String,
    pub ty: TypeId,
    pub backing: PrimitiveKind,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone)]
pub struct TypedFunction {
    pub name: String,
    pub owner: Option<StructRef>,
    pub type_parameters: Vec<TypeId>,
    pub params: Vec<(String, TypeId)>,
    pub returns: Vec<TypeId>,
    /// `None` for abstract methods.
    pub body: Option<TypedBlock>,
    /// Whether type parameters of the function or its owner are in scope.
    pub generic: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct TypedBlock {
    pub statements: Vec<TypedStatement>,
    /// Type of the tail expression when the block is used as a value, else `()`.
    pub ty: TypeId,
    /// Every path through the block ends in `return`.
    pub diverges: bool,
}

#[derive(Debug, Clone)]
pub enum TypedStatement {
    Let {
        name: String,
        ty: TypeId,
        initializer: Option<TypedExpression>,
        span: SourceSpan,
    },
    Expression(TypedExpression),
    Return {
        value: Option<TypedExpression>,
        span: SourceSpan,
    },
}

#[derive(Debug, Clone)]
pub struct TypedExpression {
    pub kind: TypedExpressionKind,
    pub ty: TypeId,
    pub span: SourceSpan,
}

impl TypedExpression {
    pub fn new(kind: TypedExpressionKind, ty: TypeId, span: SourceSpan) -> Self {
        Self { kind, ty, span }
    }
}

#[derive(Debug, Clone)]
pub enum TypedExpressionKind {
    Literal(Literal),
    EnumVariant {
        id: EnumId,
        variant: String,
        index: usize,
    },
    Tuple(Vec<TypedExpression>),
    List(Vec<TypedExpression>),
    Dict(Vec<(TypedExpression, TypedExpression)>),
    Variable(String),
    /// A top-level function used as a value.
    FunctionRef(FunctionId),
    Assignment {
        target: Box<TypedExpression>,
        value: Box<TypedExpression>,
    },
    Call {
        callee: Callee,
        type_arguments: Vec<TypeId>,
        arguments: Vec<TypedExpression>,
    },
    Field {
        object: Box<TypedExpression>,
        field: String,
    },
    TupleSlot {
        tuple: Box<TypedExpression>,
        index: usize,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<TypedExpression>,
        right: Box<TypedExpression>,
    },
    If {
        condition: Box<TypedExpression>,
        then_branch: TypedBlock,
        else_branch: Option<TypedBlock>,
    },
}

#[derive(Debug, Clone)]
pub enum Callee {
    Function(FunctionId),
    Method {
        receiver: Box<TypedExpression>,
        /// The struct whose body implements the method.
        origin: StructId,
        name: String,
    },
    Builtin {
        receiver: Box<TypedExpression>,
        name: String,
    },
    /// A method a generic parameter gains from its structural bound.
    BoundMethod {
        receiver: Box<TypedExpression>,
        name: String,
    },
    Construct(StructRef),
    Value(Box<TypedExpression>),
}

impl TypedProgram {
    /// The first type that is not allowed to reach code generation: the
    /// error sentinel, an unbound slot, or a generic parameter outside a
    /// generic owner.
    pub fn find_unresolved(&self, graph: &TypeGraph) -> Option<(TypeId, SourceSpan)> {
        let mut found = None;
        let mut check = |ty: TypeId, span: SourceSpan, allow_generics: bool| {
            if found.is_none() && graph.contains_unresolved(ty, allow_generics) {
                found = Some((ty, span));
            }
        };

        for def in &self.structs {
            let generic = !def.type_parameters.is_empty();
            for field in &def.fields {
                check(field.ty, SourceSpan::default(), generic);
                if let Some(default) = &field.default {
                    default.visit_types(&mut |ty, span| check(ty, span, generic));
                }
            }
            for method in &def.methods {
                method.visit_types(&mut |ty, span, generic| check(ty, span, generic));
            }
        }
        for function in &self.functions {
            function.visit_types(&mut |ty, span, generic| check(ty, span, generic));
        }
        found
    }

    pub fn function(&self, name: &str) -> Option<&TypedFunction> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn struct_named(&self, name: &str) -> Option<&TypedStruct> {
        self.structs.iter().find(|def| def.name == name)
    }
}

impl TypedFunction {
    fn visit_types(&self, visit: &mut dyn FnMut(TypeId, SourceSpan, bool)) {
        let generic = self.generic;
        for (_, ty) in &self.params {
            visit(*ty, self.span, generic);
        }
        for ty in &self.returns {
            visit(*ty, self.span, generic);
        }
        if let Some(body) = &self.body {
            body.visit_types(&mut |ty, span| visit(ty, span, generic));
        }
    }
}

impl TypedBlock {
    pub fn visit_types(&self, visit: &mut dyn FnMut(TypeId, SourceSpan)) {
        for statement in &self.statements {
            match statement {
                TypedStatement::Let {
                    ty,
                    initializer,
                    span,
                    ..
                } => {
                    visit(*ty, *span);
                    if let Some(initializer) = initializer {
                        initializer.visit_types(visit);
                    }
                }
                TypedStatement::Expression(expression) => expression.visit_types(visit),
                TypedStatement::Return { value, .. } => {
                    if let Some(value) = value {
                        value.visit_types(visit);
                    }
                }
            }
        }
    }
}

impl TypedExpression {
    pub fn visit_types(&self, visit: &mut dyn FnMut(TypeId, SourceSpan)) {
        visit(self.ty, self.span);
        match &self.kind {
            TypedExpressionKind::Literal(_)
            | TypedExpressionKind::EnumVariant { .. }
            | TypedExpressionKind::Variable(_)
            | TypedExpressionKind::FunctionRef(_) => {}
            TypedExpressionKind::Tuple(items) | TypedExpressionKind::List(items) => {
                for item in items {
                    item.visit_types(visit);
                }
            }
            TypedExpressionKind::Dict(entries) => {
                for (key, value) in entries {
                    key.visit_types(visit);
                    value.visit_types(visit);
                }
            }
            TypedExpressionKind::Assignment { target, value } => {
                target.visit_types(visit);
                value.visit_types(visit);
            }
            TypedExpressionKind::Call {
                callee,
                type_arguments,
                arguments,
            } => {
                match callee {
                    Callee::Method { receiver, .. }
                    | Callee::Builtin { receiver, .. }
                    | Callee::BoundMethod { receiver, .. }
                    | Callee::Value(receiver) => receiver.visit_types(visit),
                    Callee::Function(_) | Callee::Construct(_) => {}
                }
                for ty in type_arguments {
                    visit(*ty, self.span);
                }
                for argument in arguments {
                    argument.visit_types(visit);
                }
            }
            TypedExpressionKind::Field { object, .. } => object.visit_types(visit),
            TypedExpressionKind::TupleSlot { tuple, .. } => tuple.visit_types(visit),
            TypedExpressionKind::Binary { left, right, .. } => {
                left.visit_types(visit);
                right.visit_types(visit);
            }
            TypedExpressionKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.visit_types(visit);
                then_branch.visit_types(visit);
                if let Some(else_branch) = else_branch {
                    else_branch.visit_types(visit);
                }
            }
        }
    }
}
