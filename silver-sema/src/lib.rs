mod builtins;
mod composition;
mod constraints;
mod declarations;
mod diagnostics;
mod enums;
mod options;
mod session;
mod source;
mod typechecker;
mod typed;
mod types;

pub use crate::ast::{
    AssignmentExpression, BinaryExpression, BinaryOperator, Block, BoundExpression,
    CallExpression, Declaration, DictEntry, EnumDecl, Expression, ExpressionKind, FieldDecl,
    FieldExpression, FunctionDecl, IfExpression, LetStatement, Literal, Parameter,
    ReturnStatement, SourceSpan, Statement, StructDecl, TypeAliasDecl, TypeExpression,
    TypeExpressionKind, TypeParameter, VariantDecl,
};
pub use crate::builtins::{find_method, BuiltinReceiver, BuiltinSlot};
pub use crate::composition::{
    render_method, CompositionIssue, Resolution, ResolvedField, ResolvedMethod, ResolvedStruct,
};
pub use crate::constraints::{
    Bound, BoundSlot, ConstraintError, ConstraintSolver, MethodTable, RequiredMethod, UnifyError,
    Unifier,
};
pub use crate::declarations::{DeclarationTable, FunctionId, Signature, Symbol};
pub use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLevel, Diagnostics};
pub use crate::enums::{
    EnumDef, EnumError, EnumInfo, EnumRegistry, EnumValue, EnumVariant, VariantDef,
};
pub use crate::flow::{FlowAnalysis, FlowViolation, NoneState};
pub use crate::options::CheckOptions;
pub use crate::session::{CheckOutput, QueryError, Session};
pub use crate::source::{CompilationUnit, LoadError, ModulePath, SourceId};
pub use crate::typed::{
    Callee, StructRef, TypedBlock, TypedEnum, TypedExpression, TypedExpressionKind, TypedField,
    TypedFunction, TypedProgram, TypedStatement, TypedStruct,
};
pub use crate::types::{
    AliasTarget, BoundRef, EnumId, NameLookup, PrimitiveKind, ResolveError, StructId, Type,
    TypeGraph, TypeId,
};

pub mod ast;
pub mod cfg;
pub mod flow;
