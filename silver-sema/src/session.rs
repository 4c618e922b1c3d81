use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::composition::{self, Resolution, ResolvedStruct};
use crate::constraints::ConstraintSolver;
use crate::declarations::{DeclarationTable, LoweredUnit, PendingBound, Symbol};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::enums::EnumRegistry;
use crate::options::CheckOptions;
use crate::source::CompilationUnit;
use crate::typechecker::{check_function, check_pending_bound, check_struct, CheckContext};
use crate::typed::{TypedEnum, TypedFunction, TypedProgram, TypedStruct};
use crate::types::{PrimitiveKind, StructId, TypeGraph, TypeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no type named '{name}'")]
    NotFound { name: String },
    #[error("'{name}' names a function, not a type")]
    NotAType { name: String },
    #[error("'{name}' did not resolve to a valid type")]
    Unresolved { name: String },
}

pub struct Session {
    options: CheckOptions,
}

impl Session {
    pub fn new(options: CheckOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Runs both phases over `units` and gates the result for code generation.
    pub fn check(&self, units: &[CompilationUnit]) -> CheckOutput {
        let options = &self.options;
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let mut enums = EnumRegistry::new();
        let mut table = DeclarationTable::new();
        let mut diagnostics = Diagnostics::with_limit(options.max_diagnostics);

        // Phase 1: names, aliases, then signatures per unit.
        for unit in units {
            diagnostics.extend(table.declare_unit(unit, &graph, &mut enums));
        }
        let (mut pending, alias_diagnostics) = table.resolve_aliases(&graph);
        diagnostics.extend(alias_diagnostics);

        let lower = |unit: &CompilationUnit| table.lower_unit(unit.id, &graph, &solver);
        let lowered: Vec<LoweredUnit> = if options.parallel {
            units.par_iter().map(lower).collect()
        } else {
            units.iter().map(lower).collect()
        };
        for mut lowered in lowered {
            pending.append(&mut lowered.pending);
            diagnostics.extend(std::mem::take(&mut lowered.diagnostics));
            diagnostics.extend(table.install(lowered, &mut enums));
        }
        debug!(
            units = units.len(),
            structs = table.structs().len(),
            functions = table.functions().len(),
            enums = enums.len(),
            types = graph.len(),
            "declarations collected"
        );

        // Phase 2: composition, deferred bounds, bodies.
        let (compositions, composition_diagnostics) =
            composition::resolve_all(&graph, &table, options.parallel);
        diagnostics.extend(composition_diagnostics);
        debug!(structs = compositions.len(), "composition resolved");

        let program = {
            let ctx = CheckContext {
                graph: &graph,
                table: &table,
                enums: &enums,
                solver: &solver,
                compositions: &compositions,
                options,
            };
            diagnostics.extend(check_bounds(&ctx, &pending));
            let program = check_bodies(&ctx, &mut diagnostics);
            debug!(
                structs = program.structs.len(),
                functions = program.functions.len(),
                "bodies checked"
            );
            program
        };

        if let Some((ty, span)) = program.find_unresolved(&graph) {
            if !diagnostics.has_errors() {
                diagnostics.report(
                    Diagnostic::new(
                        DiagnosticCode::Internal,
                        format!(
                            "unresolved type {} reached the typed program",
                            graph.describe(ty, &table)
                        ),
                    )
                    .with_span(Some(span)),
                );
            }
        }

        CheckOutput {
            graph,
            table,
            compositions,
            program,
            diagnostics,
            warnings_as_errors: options.warnings_as_errors,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CheckOptions::default())
    }
}

fn check_bounds(ctx: &CheckContext<'_>, pending: &[PendingBound]) -> Vec<Diagnostic> {
    pending
        .iter()
        .flat_map(|bound| check_pending_bound(ctx, bound))
        .collect()
}

fn check_bodies(ctx: &CheckContext<'_>, diagnostics: &mut Diagnostics) -> TypedProgram {
    let table = ctx.table;
    let (structs, functions): (
        Vec<(TypedStruct, Vec<Diagnostic>)>,
        Vec<(TypedFunction, Vec<Diagnostic>)>,
    ) = if ctx.options.parallel {
        (
            table.structs().par_iter().map(|def| check_struct(ctx, def)).collect(),
            table
                .functions()
                .par_iter()
                .map(|def| check_function(ctx, def))
                .collect(),
        )
    } else {
        (
            table.structs().iter().map(|def| check_struct(ctx, def)).collect(),
            table
                .functions()
                .iter()
                .map(|def| check_function(ctx, def))
                .collect(),
        )
    };

    let mut program = TypedProgram::default();
    for (typed, found) in structs {
        diagnostics.extend(found);
        program.structs.push(typed);
    }
    for (typed, found) in functions {
        diagnostics.extend(found);
        program.functions.push(typed);
    }
    program.enums = table
        .enum_sources()
        .iter()
        .filter_map(|source| {
            let info = ctx.enums.get(source.id)?;
            Some(TypedEnum {
                id: source.id,
                name: source.name.clone(),
                ty: ctx.graph.enum_type(source.id),
                backing: info.backing,
                variants: info.variants.clone(),
            })
        })
        .collect();
    program
}

/// The result of a check: the typed program, its diagnostics and the
/// query surface over the declarations it was checked against.
pub struct CheckOutput {
    graph: TypeGraph,
    table: DeclarationTable,
    compositions: HashMap<StructId, Resolution>,
    program: TypedProgram,
    diagnostics: Diagnostics,
    warnings_as_errors: bool,
}

impl CheckOutput {
    pub fn program(&self) -> &TypedProgram {
        &self.program
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Whether code generation may proceed.
    pub fn is_eligible(&self) -> bool {
        !self.diagnostics.has_errors()
            && !(self.warnings_as_errors && self.diagnostics.has_warnings())
    }

    pub fn into_program(self) -> Result<TypedProgram> {
        if !self.is_eligible() {
            bail!(
                "type checking failed with {} error(s) and {} diagnostic(s) in total",
                self.diagnostics.error_count(),
                self.diagnostics.entries().len()
            );
        }
        Ok(self.program)
    }

    /// Looks up a type by fully qualified name, following aliases.
    pub fn resolve_type(&self, name: &str) -> Result<TypeId, QueryError> {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Ok(self.graph.primitive(kind));
        }
        let resolved = match self.table.lookup(name) {
            Some(Symbol::Struct(id)) => match self.table.struct_def(id) {
                Some(def) => def.self_type(&self.graph),
                None => self.graph.error(),
            },
            Some(Symbol::Enum(id)) => self.graph.enum_type(id),
            Some(Symbol::Function(_)) => {
                return Err(QueryError::NotAType {
                    name: name.to_string(),
                })
            }
            Some(Symbol::Alias) | None if self.graph.has_alias(name) => self
                .graph
                .resolve_alias(name, |_| {
                    Err(crate::types::ResolveError::Unresolved {
                        name: name.to_string(),
                    })
                })
                .unwrap_or_else(|_| self.graph.error()),
            _ => {
                return Err(QueryError::NotFound {
                    name: name.to_string(),
                })
            }
        };
        if self.graph.is_error(resolved) {
            return Err(QueryError::Unresolved {
                name: name.to_string(),
            });
        }
        Ok(resolved)
    }

    pub fn describe(&self, ty: TypeId) -> String {
        self.graph.describe(ty, &self.table)
    }

    /// The effective layout of a struct, by fully qualified name.
    pub fn get_struct(&self, name: &str) -> Result<Arc<ResolvedStruct>, QueryError> {
        match self.table.lookup(name) {
            Some(Symbol::Struct(id)) => self
                .compositions
                .get(&id)
                .map(|resolution| Arc::clone(resolution.resolved()))
                .ok_or_else(|| QueryError::Unresolved {
                    name: name.to_string(),
                }),
            _ => Err(QueryError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    pub fn resolution(&self, name: &str) -> Option<&Resolution> {
        match self.table.lookup(name)? {
            Symbol::Struct(id) => self.compositions.get(&id),
            _ => None,
        }
    }
}
