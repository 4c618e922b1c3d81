//! Declaration table and lowering of type expressions.
//!
//! Declarations are collected in two steps. [`DeclarationTable::declare_unit`]
//! registers every qualified name so references across units resolve
//! regardless of order, then [`DeclarationTable::lower_unit`] lowers the
//! signatures of one unit against the finished name table. Lowering only
//! reads the table and writes to the concurrent [`TypeGraph`], so units lower
//! in parallel and are installed back in unit order.

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

use crate::ast::{
    BoundExpression, Declaration, EnumDecl, FunctionDecl, SourceSpan, StructDecl, TypeExpression,
    TypeExpressionKind, TypeParameter,
};
use crate::constraints::ConstraintSolver;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::enums::{EnumDef, EnumError, EnumInfo, EnumRegistry, VariantDef};
use crate::source::{CompilationUnit, ModulePath, SourceId};
use crate::types::{
    AliasTarget, BoundRef, EnumId, NameLookup, PrimitiveKind, ResolveError, StructId, Type,
    TypeGraph, TypeId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Struct(StructId),
    Enum(EnumId),
    Function(FunctionId),
    Alias,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub type_parameters: Vec<TypeId>,
    pub params: Vec<(String, TypeId)>,
    pub returns: Vec<TypeId>,
    /// `fn(params) -> returns` as interned in the graph.
    pub ty: TypeId,
}

impl Signature {
    pub fn new(
        graph: &TypeGraph,
        type_parameters: Vec<TypeId>,
        params: Vec<(String, TypeId)>,
        returns: Vec<TypeId>,
    ) -> Self {
        let ty = graph.function(
            params.iter().map(|(_, ty)| *ty).collect(),
            returns.clone(),
        );
        Self {
            type_parameters,
            params,
            returns,
            ty,
        }
    }

    pub fn result(&self, graph: &TypeGraph) -> TypeId {
        graph.returns_as_value(&self.returns)
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }

    pub fn substitute(&self, graph: &TypeGraph, mapping: &HashMap<String, TypeId>) -> Self {
        if mapping.is_empty() {
            return self.clone();
        }
        let vars = HashMap::new();
        let params = self
            .params
            .iter()
            .map(|(name, ty)| (name.clone(), graph.substitute(*ty, mapping, &vars)))
            .collect();
        let returns = self
            .returns
            .iter()
            .map(|ty| graph.substitute(*ty, mapping, &vars))
            .collect();
        Self::new(graph, self.type_parameters.clone(), params, returns)
    }
}

#[derive(Debug, Clone)]
pub struct ComposedParent {
    pub id: StructId,
    /// The parent as named in the composition list, including type arguments.
    pub ty: TypeId,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeId,
    pub has_default: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub signature: Signature,
    pub has_body: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub id: StructId,
    pub name: String,
    pub unit: SourceId,
    pub module: ModulePath,
    pub decl: StructDecl,
    pub type_parameters: Vec<TypeId>,
    pub composes: Vec<ComposedParent>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl StructDef {
    /// The struct applied to its own type parameters, as seen from inside it.
    pub fn self_type(&self, graph: &TypeGraph) -> TypeId {
        graph.struct_type(self.id, self.type_parameters.clone())
    }

    pub fn generic_scope(&self, graph: &TypeGraph) -> Vec<(String, TypeId)> {
        generic_scope(graph, &self.type_parameters)
    }

    /// Maps the struct's type parameter names onto `arguments`.
    pub fn instantiation(
        &self,
        graph: &TypeGraph,
        arguments: &[TypeId],
    ) -> HashMap<String, TypeId> {
        self.generic_scope(graph)
            .into_iter()
            .map(|(name, _)| name)
            .zip(arguments.iter().copied())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub id: FunctionId,
    pub name: String,
    pub unit: SourceId,
    pub module: ModulePath,
    pub decl: FunctionDecl,
    pub signature: Signature,
}

#[derive(Debug, Clone)]
pub struct EnumSource {
    pub id: EnumId,
    pub name: String,
    pub unit: SourceId,
    pub module: ModulePath,
    pub decl: EnumDecl,
}

#[derive(Debug, Clone)]
pub struct AliasSource {
    pub name: String,
    pub unit: SourceId,
    pub span: SourceSpan,
}

/// A struct type applied to explicit arguments, checked against the struct's
/// bounds once every declaration has been lowered.
#[derive(Debug, Clone)]
pub struct PendingBound {
    pub owner: StructId,
    pub arguments: Vec<TypeId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
struct StructShape {
    type_parameters: Vec<TypeId>,
    composes: Vec<ComposedParent>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
}

/// Signatures of one unit, lowered but not yet installed.
#[derive(Debug)]
pub struct LoweredUnit {
    pub unit: SourceId,
    structs: Vec<(StructId, StructShape)>,
    functions: Vec<(FunctionId, Signature)>,
    enums: Vec<(EnumId, Result<EnumInfo, EnumError>)>,
    pub pending: Vec<PendingBound>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
pub struct DeclarationTable {
    symbols: HashMap<String, Symbol>,
    units: Vec<SourceId>,
    structs: Vec<StructDef>,
    functions: Vec<FunctionDef>,
    enums: Vec<EnumSource>,
    aliases: Vec<AliasSource>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the qualified names of `unit`. The first declaration of a
    /// name wins; later ones are reported and skipped.
    pub fn declare_unit(
        &mut self,
        unit: &CompilationUnit,
        graph: &TypeGraph,
        enums: &mut EnumRegistry,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.units.push(unit.id);

        for declaration in &unit.declarations {
            let name = unit.module.qualify(declaration.name());
            if self.symbols.contains_key(&name) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateDeclaration,
                        format!("'{name}' is declared more than once"),
                    )
                    .with_span(Some(declaration.span())),
                );
                continue;
            }
            if graph.has_alias(&name) || PrimitiveKind::from_name(&name).is_some() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateDeclaration,
                        format!("'{name}' is a built-in type and cannot be redeclared"),
                    )
                    .with_span(Some(declaration.span())),
                );
                continue;
            }

            let symbol = match declaration {
                Declaration::Struct(decl) => {
                    let id = StructId(self.structs.len() as u32);
                    self.structs.push(StructDef {
                        id,
                        name: name.clone(),
                        unit: unit.id,
                        module: unit.module.clone(),
                        decl: decl.clone(),
                        type_parameters: Vec::new(),
                        composes: Vec::new(),
                        fields: Vec::new(),
                        methods: Vec::new(),
                    });
                    Symbol::Struct(id)
                }
                Declaration::Enum(decl) => {
                    let id = enums.reserve(name.clone());
                    self.enums.push(EnumSource {
                        id,
                        name: name.clone(),
                        unit: unit.id,
                        module: unit.module.clone(),
                        decl: decl.clone(),
                    });
                    Symbol::Enum(id)
                }
                Declaration::Function(decl) => {
                    let id = FunctionId(self.functions.len() as u32);
                    self.functions.push(FunctionDef {
                        id,
                        name: name.clone(),
                        unit: unit.id,
                        module: unit.module.clone(),
                        decl: decl.clone(),
                        signature: Signature::new(graph, Vec::new(), Vec::new(), Vec::new()),
                    });
                    Symbol::Function(id)
                }
                Declaration::TypeAlias(decl) => {
                    graph.define_alias(
                        name.clone(),
                        AliasTarget::Expression {
                            expression: decl.target.clone(),
                            module: unit.module.clone(),
                        },
                    );
                    self.aliases.push(AliasSource {
                        name: name.clone(),
                        unit: unit.id,
                        span: decl.span,
                    });
                    Symbol::Alias
                }
            };
            trace!(name = %name, "declared");
            self.symbols.insert(name, symbol);
        }

        diagnostics
            .into_iter()
            .map(|diagnostic| diagnostic.in_source(unit.id))
            .collect()
    }

    /// Resolves every declared alias to its final target, reporting each
    /// broken chain once. A cycle is reported at the alias that closes it;
    /// aliases that only lead into a cycle resolve to the error type silently.
    pub fn resolve_aliases(&self, graph: &TypeGraph) -> (Vec<PendingBound>, Vec<Diagnostic>) {
        let mut pending = Vec::new();
        let mut diagnostics = Vec::new();
        for alias in &self.aliases {
            let module = ModulePath::root();
            let mut resolver = TypeResolver::new(graph, self, &module);
            if let Err(error) = resolver.resolve_alias(&alias.name) {
                let anchor = match &error {
                    ResolveError::AliasCycle { members } => members
                        .first()
                        .and_then(|first| self.aliases.iter().find(|source| &source.name == first))
                        .unwrap_or(alias),
                    _ => alias,
                };
                diagnostics.push(
                    resolve_diagnostic(&error, anchor.span).in_source(anchor.unit),
                );
            }
            pending.append(&mut resolver.pending);
        }
        (pending, diagnostics)
    }

    pub fn units(&self) -> &[SourceId] {
        &self.units
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    /// Resolves `name` as referenced from `module`: unit-local first, then as
    /// a fully qualified name.
    pub fn resolve_name(&self, module: &ModulePath, name: &str) -> Option<(String, Symbol)> {
        module
            .candidates(name)
            .into_iter()
            .find_map(|candidate| self.lookup(&candidate).map(|symbol| (candidate, symbol)))
    }

    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }

    pub fn struct_def(&self, id: StructId) -> Option<&StructDef> {
        self.structs.get(id.0 as usize)
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDef> {
        self.functions.get(id.0 as usize)
    }

    pub fn enum_sources(&self) -> &[EnumSource] {
        &self.enums
    }

    pub fn enum_source(&self, id: EnumId) -> Option<&EnumSource> {
        self.enums.iter().find(|source| source.id == id)
    }

    /// Lowers the signatures of every declaration that belongs to `unit`.
    pub fn lower_unit(
        &self,
        unit: SourceId,
        graph: &TypeGraph,
        solver: &ConstraintSolver,
    ) -> LoweredUnit {
        let mut lowered = LoweredUnit {
            unit,
            structs: Vec::new(),
            functions: Vec::new(),
            enums: Vec::new(),
            pending: Vec::new(),
            diagnostics: Vec::new(),
        };

        for def in self.structs.iter().filter(|def| def.unit == unit) {
            let shape = self.lower_struct(def, graph, solver, &mut lowered);
            lowered.structs.push((def.id, shape));
        }

        for def in self.functions.iter().filter(|def| def.unit == unit) {
            let mut resolver = TypeResolver::new(graph, self, &def.module);
            let signature =
                resolver.lower_signature(&def.decl, solver, &mut lowered.diagnostics);
            lowered.pending.append(&mut resolver.pending);
            lowered.functions.push((def.id, signature));
        }

        for source in self.enums.iter().filter(|source| source.unit == unit) {
            let validated = self.lower_enum(source, graph, &mut lowered.diagnostics);
            if let Some(validated) = validated {
                lowered.enums.push((source.id, validated));
            }
        }

        lowered.diagnostics = lowered
            .diagnostics
            .into_iter()
            .map(|diagnostic| diagnostic.in_source(unit))
            .collect();
        lowered
    }

    /// Installs lowered signatures; returns the enum validation failures.
    pub fn install(&mut self, lowered: LoweredUnit, enums: &mut EnumRegistry) -> Vec<Diagnostic> {
        for (id, shape) in lowered.structs {
            if let Some(def) = self.structs.get_mut(id.0 as usize) {
                def.type_parameters = shape.type_parameters;
                def.composes = shape.composes;
                def.fields = shape.fields;
                def.methods = shape.methods;
            }
        }
        for (id, signature) in lowered.functions {
            if let Some(def) = self.functions.get_mut(id.0 as usize) {
                def.signature = signature;
            }
        }

        let mut diagnostics = Vec::new();
        for (id, validated) in lowered.enums {
            if let Err(error) = enums.install(id, validated) {
                diagnostics.push(
                    Diagnostic::new(error.code(), error.to_string())
                        .with_span(Some(error.span()))
                        .in_source(lowered.unit),
                );
            }
        }
        diagnostics
    }

    fn lower_struct(
        &self,
        def: &StructDef,
        graph: &TypeGraph,
        solver: &ConstraintSolver,
        lowered: &mut LoweredUnit,
    ) -> StructShape {
        let diagnostics = &mut lowered.diagnostics;
        let mut resolver = TypeResolver::new(graph, self, &def.module);
        let type_parameters =
            resolver.declare_type_parameters(&def.decl.type_parameters, solver, diagnostics);

        let mut composes = Vec::new();
        for parent in &def.decl.composes {
            let Some(ty) = resolver.lower_reported(parent, diagnostics) else {
                continue;
            };
            match graph.lookup(ty) {
                Type::Struct(id, _) => composes.push(ComposedParent {
                    id,
                    ty,
                    span: parent.span,
                }),
                _ => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "struct '{}' can only compose structs, found {}",
                            def.name,
                            graph.describe(ty, self)
                        ),
                    )
                    .with_span(Some(parent.span)),
                ),
            }
        }

        let fields = def
            .decl
            .fields
            .iter()
            .map(|field| FieldDef {
                name: field.name.clone(),
                ty: resolver
                    .lower_reported(&field.type_annotation, diagnostics)
                    .unwrap_or_else(|| graph.error()),
                has_default: field.default.is_some(),
                span: field.span,
            })
            .collect();

        let methods = def
            .decl
            .methods
            .iter()
            .map(|method| MethodDef {
                name: method.name.clone(),
                signature: resolver.lower_signature(method, solver, diagnostics),
                has_body: method.body.is_some(),
                span: method.span,
            })
            .collect();

        lowered.pending.append(&mut resolver.pending);
        StructShape {
            type_parameters,
            composes,
            fields,
            methods,
        }
    }

    fn lower_enum(
        &self,
        source: &EnumSource,
        graph: &TypeGraph,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Result<EnumInfo, EnumError>> {
        let mut resolver = TypeResolver::new(graph, self, &source.module);
        let backing = resolver.lower_reported(&source.decl.backing, diagnostics)?;
        let Some(kind) = graph.primitive_kind(backing) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::EnumValueMismatch,
                    format!(
                        "enum '{}' must be backed by a primitive type, found {}",
                        source.name,
                        graph.describe(backing, self)
                    ),
                )
                .with_span(Some(source.decl.backing.span)),
            );
            return None;
        };
        let def = EnumDef {
            name: source.name.clone(),
            backing: kind,
            variants: source
                .decl
                .variants
                .iter()
                .map(|variant| VariantDef {
                    name: variant.name.clone(),
                    value: variant.value.clone(),
                    span: variant.span,
                })
                .collect(),
            span: source.decl.span,
        };
        Some(EnumRegistry::validate(&def))
    }
}

impl NameLookup for DeclarationTable {
    fn struct_name(&self, id: StructId) -> String {
        self.struct_def(id)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| format!("<struct {}>", id.0))
    }

    fn enum_name(&self, id: EnumId) -> String {
        self.enum_source(id)
            .map(|source| source.name.clone())
            .unwrap_or_else(|| format!("<enum {}>", id.0))
    }
}

pub fn generic_scope(graph: &TypeGraph, parameters: &[TypeId]) -> Vec<(String, TypeId)> {
    parameters
        .iter()
        .filter_map(|id| match graph.lookup(*id) {
            Type::Generic { name, .. } => Some((name, *id)),
            _ => None,
        })
        .collect()
}

pub fn resolve_diagnostic(error: &ResolveError, span: SourceSpan) -> Diagnostic {
    Diagnostic::new(error.code(), error.to_string()).with_span(Some(span))
}

/// Lowers type expressions written inside one module.
pub struct TypeResolver<'a> {
    graph: &'a TypeGraph,
    table: &'a DeclarationTable,
    module: &'a ModulePath,
    generics: Vec<(String, TypeId)>,
    pending: Vec<PendingBound>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(graph: &'a TypeGraph, table: &'a DeclarationTable, module: &'a ModulePath) -> Self {
        Self {
            graph,
            table,
            module,
            generics: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn with_generics(mut self, generics: Vec<(String, TypeId)>) -> Self {
        self.generics = generics;
        self
    }

    pub fn take_pending(&mut self) -> Vec<PendingBound> {
        std::mem::take(&mut self.pending)
    }

    pub fn lower(&mut self, expression: &TypeExpression) -> Result<TypeId, ResolveError> {
        match &expression.kind {
            TypeExpressionKind::Named { name, arguments } => {
                self.lower_named(name, arguments, expression.span)
            }
            TypeExpressionKind::Tuple(elements) => {
                let elements = self.lower_all(elements)?;
                Ok(self.graph.tuple(elements))
            }
            TypeExpressionKind::RepeatedTuple { element, arity } => {
                let element = self.lower(element)?;
                Ok(self.graph.tuple(vec![element; *arity]))
            }
            TypeExpressionKind::Function {
                parameters,
                returns,
            } => {
                let parameters = self.lower_all(parameters)?;
                let returns = self.lower_all(returns)?;
                Ok(self.graph.function(parameters, returns))
            }
        }
    }

    /// Lowers `expression`, turning a failure into a diagnostic.
    pub fn lower_reported(
        &mut self,
        expression: &TypeExpression,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<TypeId> {
        match self.lower(expression) {
            Ok(id) => Some(id),
            Err(error) => {
                diagnostics.push(resolve_diagnostic(&error, expression.span));
                None
            }
        }
    }

    fn lower_all(&mut self, expressions: &[TypeExpression]) -> Result<Vec<TypeId>, ResolveError> {
        expressions
            .iter()
            .map(|expression| self.lower(expression))
            .collect()
    }

    fn lower_named(
        &mut self,
        name: &str,
        arguments: &[TypeExpression],
        span: SourceSpan,
    ) -> Result<TypeId, ResolveError> {
        if let Some((_, id)) = self.generics.iter().rev().find(|(generic, _)| generic == name) {
            let id = *id;
            expect_arguments(name, arguments, 0)?;
            return Ok(id);
        }
        if let Some(kind) = PrimitiveKind::from_name(name) {
            expect_arguments(name, arguments, 0)?;
            return Ok(self.graph.primitive(kind));
        }
        match name {
            "List" => {
                expect_arguments(name, arguments, 1)?;
                let element = self.lower(&arguments[0])?;
                return Ok(self.graph.list(element));
            }
            "Dict" => {
                expect_arguments(name, arguments, 2)?;
                let key = self.lower(&arguments[0])?;
                let value = self.lower(&arguments[1])?;
                return Ok(self.graph.dict(key, value));
            }
            _ => {}
        }

        if let Some((qualified, symbol)) = self.table.resolve_name(self.module, name) {
            return match symbol {
                Symbol::Struct(id) => {
                    let expected = self
                        .table
                        .struct_def(id)
                        .map(|def| def.decl.type_parameters.len())
                        .unwrap_or(0);
                    expect_arguments(name, arguments, expected)?;
                    let arguments = self.lower_all(arguments)?;
                    if !arguments.is_empty() {
                        self.pending.push(PendingBound {
                            owner: id,
                            arguments: arguments.clone(),
                            span,
                        });
                    }
                    Ok(self.graph.struct_type(id, arguments))
                }
                Symbol::Enum(id) => {
                    expect_arguments(name, arguments, 0)?;
                    Ok(self.graph.enum_type(id))
                }
                Symbol::Alias => {
                    expect_arguments(name, arguments, 0)?;
                    self.resolve_alias(&qualified)
                }
                Symbol::Function(_) => Err(ResolveError::Unresolved {
                    name: name.to_string(),
                }),
            };
        }

        if self.graph.has_alias(name) {
            expect_arguments(name, arguments, 0)?;
            return self.resolve_alias(name);
        }

        Err(ResolveError::Unresolved {
            name: name.to_string(),
        })
    }

    fn resolve_alias(&mut self, qualified: &str) -> Result<TypeId, ResolveError> {
        let graph = self.graph;
        let table = self.table;
        let pending = &mut self.pending;
        graph.resolve_alias(qualified, |target| match target {
            AliasTarget::Type(id) => Ok(*id),
            AliasTarget::Expression { expression, module } => {
                let mut nested = TypeResolver::new(graph, table, module);
                let lowered = nested.lower(expression);
                pending.append(&mut nested.pending);
                lowered
            }
        })
    }

    /// Brings `parameters` into scope and returns their generic type ids.
    ///
    /// Every name is visible before any bound is lowered, so a bound may
    /// mention a sibling parameter, as in `C: Collection[I]`.
    pub fn declare_type_parameters(
        &mut self,
        parameters: &[TypeParameter],
        solver: &ConstraintSolver,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<TypeId> {
        let start = self.generics.len();
        for parameter in parameters {
            let id = self.graph.generic(&parameter.name, None);
            self.generics.push((parameter.name.clone(), id));
        }

        let mut ids = Vec::with_capacity(parameters.len());
        for (offset, parameter) in parameters.iter().enumerate() {
            let bound = parameter.bound.as_ref().and_then(|bound| {
                match self.lower_bound(bound, solver) {
                    Ok(bound) => Some(bound),
                    Err(error) => {
                        diagnostics.push(resolve_diagnostic(&error, bound.span));
                        None
                    }
                }
            });
            let id = self.graph.generic(&parameter.name, bound);
            self.generics[start + offset].1 = id;
            ids.push(id);
        }
        ids
    }

    fn lower_bound(
        &mut self,
        bound: &BoundExpression,
        solver: &ConstraintSolver,
    ) -> Result<BoundRef, ResolveError> {
        let Some(expected) = solver.parameter_count(&bound.name) else {
            return Err(ResolveError::UnknownBound {
                name: bound.name.clone(),
            });
        };
        expect_arguments(&bound.name, &bound.arguments, expected)?;
        Ok(BoundRef {
            name: bound.name.clone(),
            arguments: self.lower_all(&bound.arguments)?,
        })
    }

    /// Lowers a function or method signature; failed parts become the error type.
    pub fn lower_signature(
        &mut self,
        decl: &FunctionDecl,
        solver: &ConstraintSolver,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Signature {
        let scope = self.generics.len();
        let type_parameters =
            self.declare_type_parameters(&decl.type_parameters, solver, diagnostics);
        let error = self.graph.error();
        let params = decl
            .parameters
            .iter()
            .map(|parameter| {
                let ty = self
                    .lower_reported(&parameter.type_annotation, diagnostics)
                    .unwrap_or(error);
                (parameter.name.clone(), ty)
            })
            .collect();
        let returns = decl
            .returns
            .iter()
            .map(|ty| self.lower_reported(ty, diagnostics).unwrap_or(error))
            .collect();
        self.generics.truncate(scope);
        Signature::new(self.graph, type_parameters, params, returns)
    }
}

fn expect_arguments(
    name: &str,
    arguments: &[TypeExpression],
    expected: usize,
) -> Result<(), ResolveError> {
    if arguments.len() == expected {
        Ok(())
    } else {
        Err(ResolveError::ArgumentCount {
            name: name.to_string(),
            expected,
            found: arguments.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeAliasDecl;

    fn alias(name: &str, target: TypeExpression) -> Declaration {
        Declaration::TypeAlias(TypeAliasDecl {
            name: name.to_string(),
            target,
            span: SourceSpan::default(),
        })
    }

    fn declare(declarations: Vec<Declaration>, module: &str) -> (TypeGraph, DeclarationTable) {
        let graph = TypeGraph::new();
        let mut table = DeclarationTable::new();
        let mut enums = EnumRegistry::new();
        let unit = CompilationUnit::new(SourceId(0), ModulePath::new(module), declarations);
        let diagnostics = table.declare_unit(&unit, &graph, &mut enums);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        (graph, table)
    }

    #[test]
    fn aliases_resolve_through_module_qualified_names() {
        let (graph, table) = declare(
            vec![
                alias("Id", TypeExpression::named("Key")),
                alias("Key", TypeExpression::named("uint")),
            ],
            "app.ids",
        );
        let (_, diagnostics) = table.resolve_aliases(&graph);
        assert!(diagnostics.is_empty());

        let module = ModulePath::new("app.ids");
        let mut resolver = TypeResolver::new(&graph, &table, &module);
        let id = resolver.lower(&TypeExpression::named("Id")).unwrap();
        assert_eq!(id, graph.primitive(PrimitiveKind::UInt64));

        let root = ModulePath::root();
        let mut outside = TypeResolver::new(&graph, &table, &root);
        assert_eq!(
            outside.lower(&TypeExpression::named("app.ids.Id")).unwrap(),
            id
        );
    }

    #[test]
    fn two_alias_cycle_is_reported_once() {
        let (graph, table) = declare(
            vec![
                alias("A", TypeExpression::named("B")),
                alias("B", TypeExpression::named("A")),
            ],
            "",
        );
        let (_, diagnostics) = table.resolve_aliases(&graph);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::AliasCycle);
        assert!(diagnostics[0].message.contains("A -> B"));
    }

    #[test]
    fn list_requires_one_argument() {
        let (graph, table) = declare(Vec::new(), "");
        let module = ModulePath::root();
        let mut resolver = TypeResolver::new(&graph, &table, &module);
        let error = resolver.lower(&TypeExpression::named("List")).unwrap_err();
        assert_eq!(
            error,
            ResolveError::ArgumentCount {
                name: "List".to_string(),
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn duplicate_names_are_reported() {
        let graph = TypeGraph::new();
        let mut table = DeclarationTable::new();
        let mut enums = EnumRegistry::new();
        let unit = CompilationUnit::new(
            SourceId(0),
            ModulePath::root(),
            vec![
                alias("A", TypeExpression::named("int")),
                alias("A", TypeExpression::named("str")),
            ],
        );
        let diagnostics = table.declare_unit(&unit, &graph, &mut enums);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::DuplicateDeclaration);
    }
}
