//! Struct composition.
//!
//! Composition is a DAG over struct declarations. Resolving a struct walks
//! its composition list depth first, memoizing every finished struct, and
//! flattens the parents' fields and methods in list order ahead of the
//! struct's own members. A struct whose effective method set still contains
//! a bodyless method is non-concrete: usable as a parameter type but never
//! constructible.
//!
//! Structs that never compose one another cannot influence each other, so
//! the graph is split into connected components that resolve independently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::ast::SourceSpan;
use crate::declarations::{DeclarationTable, Signature, StructDef};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::types::{NameLookup, StructId, Type, TypeGraph, TypeId};

#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub ty: TypeId,
    /// The struct that declared the field.
    pub origin: StructId,
    pub has_default: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub name: String,
    pub signature: Signature,
    pub origin: StructId,
    pub has_body: bool,
    pub span: SourceSpan,
}

/// A struct's effective layout, expressed in terms of its own type parameters.
#[derive(Debug, Clone)]
pub struct ResolvedStruct {
    pub id: StructId,
    pub name: String,
    pub fields: Vec<ResolvedField>,
    pub methods: Vec<ResolvedMethod>,
    /// Every struct type reachable through the composition list.
    pub ancestors: Vec<TypeId>,
    pub concrete: bool,
}

impl ResolvedStruct {
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&ResolvedMethod> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn abstract_methods(&self) -> impl Iterator<Item = &ResolvedMethod> {
        self.methods.iter().filter(|method| !method.has_body)
    }

    /// Fields that construction must supply, in initialization order.
    pub fn required_arity(&self) -> usize {
        self.fields
            .iter()
            .rposition(|field| !field.has_default)
            .map(|index| index + 1)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(Arc<ResolvedStruct>),
    MissingOverride {
        resolved: Arc<ResolvedStruct>,
        unmet: Vec<String>,
    },
    /// `fallback` holds only the struct's own members and is never concrete.
    Cycle {
        members: Vec<StructId>,
        fallback: Arc<ResolvedStruct>,
    },
}

impl Resolution {
    pub fn resolved(&self) -> &Arc<ResolvedStruct> {
        match self {
            Resolution::Resolved(resolved) | Resolution::MissingOverride { resolved, .. } => {
                resolved
            }
            Resolution::Cycle { fallback, .. } => fallback,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.resolved().concrete
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionIssue {
    Cycle {
        members: Vec<StructId>,
    },
    DuplicateField {
        owner: StructId,
        field: String,
        span: SourceSpan,
    },
    MissingOverride {
        owner: StructId,
        unmet: Vec<String>,
    },
    OverrideMismatch {
        owner: StructId,
        method: String,
        expected: TypeId,
        found: TypeId,
        span: SourceSpan,
    },
    AmbiguousMethod {
        owner: StructId,
        method: String,
        origins: Vec<StructId>,
    },
}

impl CompositionIssue {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            CompositionIssue::Cycle { .. } => DiagnosticCode::CompositionCycle,
            CompositionIssue::DuplicateField { .. } => DiagnosticCode::DuplicateField,
            CompositionIssue::MissingOverride { .. } => DiagnosticCode::MissingOverride,
            CompositionIssue::OverrideMismatch { .. } => DiagnosticCode::TypeMismatch,
            CompositionIssue::AmbiguousMethod { .. } => DiagnosticCode::AmbiguousMethod,
        }
    }

    fn owner(&self) -> StructId {
        match self {
            CompositionIssue::Cycle { members } => members[0],
            CompositionIssue::DuplicateField { owner, .. }
            | CompositionIssue::MissingOverride { owner, .. }
            | CompositionIssue::OverrideMismatch { owner, .. }
            | CompositionIssue::AmbiguousMethod { owner, .. } => *owner,
        }
    }

    pub fn to_diagnostic(&self, graph: &TypeGraph, table: &DeclarationTable) -> Diagnostic {
        let owner = table.struct_def(self.owner());
        let owner_name = table.struct_name(self.owner());
        let message = match self {
            CompositionIssue::Cycle { members } => {
                let mut names: Vec<String> =
                    members.iter().map(|id| table.struct_name(*id)).collect();
                names.push(names[0].clone());
                format!("composition cycle: {}", names.join(" -> "))
            }
            CompositionIssue::DuplicateField { field, .. } => {
                format!("struct '{owner_name}' has more than one member named '{field}'")
            }
            CompositionIssue::MissingOverride { unmet, .. } => format!(
                "struct '{owner_name}' must override abstract method(s): {}",
                unmet.join(", ")
            ),
            CompositionIssue::OverrideMismatch {
                method,
                expected,
                found,
                ..
            } => format!(
                "method '{method}' of struct '{owner_name}': expected {}, found {}",
                graph.describe(*expected, table),
                graph.describe(*found, table)
            ),
            CompositionIssue::AmbiguousMethod {
                method, origins, ..
            } => {
                let origins: Vec<String> =
                    origins.iter().map(|id| table.struct_name(*id)).collect();
                format!(
                    "struct '{owner_name}' inherits '{method}' from {}; override it to choose",
                    origins.join(" and ")
                )
            }
        };

        let span = match self {
            CompositionIssue::DuplicateField { span, .. }
            | CompositionIssue::OverrideMismatch { span, .. } => Some(*span),
            _ => owner.map(|def| def.decl.span),
        };
        let diagnostic = Diagnostic::new(self.code(), message).with_span(span);
        match owner {
            Some(def) => diagnostic.in_source(def.unit),
            None => diagnostic,
        }
    }
}

pub struct CompositionResolver<'a> {
    graph: &'a TypeGraph,
    table: &'a DeclarationTable,
    memo: HashMap<StructId, Resolution>,
    stack: Vec<StructId>,
    cyclic: HashSet<StructId>,
    reported: HashSet<Vec<StructId>>,
    issues: Vec<CompositionIssue>,
}

impl<'a> CompositionResolver<'a> {
    pub fn new(graph: &'a TypeGraph, table: &'a DeclarationTable) -> Self {
        Self {
            graph,
            table,
            memo: HashMap::new(),
            stack: Vec::new(),
            cyclic: HashSet::new(),
            reported: HashSet::new(),
            issues: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (HashMap<StructId, Resolution>, Vec<CompositionIssue>) {
        (self.memo, self.issues)
    }

    pub fn resolve(&mut self, id: StructId) -> Resolution {
        if let Some(done) = self.memo.get(&id) {
            trace!(id = id.0, "composition memo hit");
            return done.clone();
        }

        let table = self.table;
        let Some(def) = table.struct_def(id) else {
            return Resolution::Cycle {
                members: vec![id],
                fallback: Arc::new(ResolvedStruct {
                    id,
                    name: table.struct_name(id),
                    fields: Vec::new(),
                    methods: Vec::new(),
                    ancestors: Vec::new(),
                    concrete: false,
                }),
            };
        };

        if let Some(position) = self.stack.iter().position(|entry| *entry == id) {
            let members = self.stack[position..].to_vec();
            self.report_cycle(&members);
            self.cyclic.extend(members.iter().copied());
            return Resolution::Cycle {
                members,
                fallback: self.fallback(def),
            };
        }

        self.stack.push(id);
        let mut parents = Vec::new();
        let mut tainted: Option<Vec<StructId>> = None;
        for parent in &def.composes {
            match self.resolve(parent.id) {
                Resolution::Cycle { members, .. } => {
                    tainted.get_or_insert(members);
                }
                other => parents.push((parent.ty, other.resolved().clone())),
            }
        }
        self.stack.pop();

        let resolution = if self.cyclic.contains(&id) {
            Resolution::Cycle {
                members: tainted.unwrap_or_else(|| vec![id]),
                fallback: self.fallback(def),
            }
        } else {
            self.merge(def, &parents, tainted.is_some())
        };
        self.memo.insert(id, resolution.clone());
        resolution
    }

    fn report_cycle(&mut self, members: &[StructId]) {
        let mut key = members.to_vec();
        key.sort();
        if self.reported.insert(key) {
            debug!(members = members.len(), "composition cycle");
            self.issues.push(CompositionIssue::Cycle {
                members: members.to_vec(),
            });
        }
    }

    fn fallback(&self, def: &StructDef) -> Arc<ResolvedStruct> {
        Arc::new(ResolvedStruct {
            id: def.id,
            name: def.name.clone(),
            fields: own_fields(def),
            methods: own_methods(def),
            ancestors: Vec::new(),
            concrete: false,
        })
    }

    fn merge(
        &mut self,
        def: &StructDef,
        parents: &[(TypeId, Arc<ResolvedStruct>)],
        tainted: bool,
    ) -> Resolution {
        let graph = self.graph;
        let vars = HashMap::new();
        let mut fields: Vec<ResolvedField> = Vec::new();
        let mut methods: Vec<ResolvedMethod> = Vec::new();
        let mut ancestors: Vec<TypeId> = Vec::new();
        let mut ambiguous: Vec<(String, Vec<StructId>)> = Vec::new();

        for (parent_ty, parent) in parents {
            let mapping = match graph.lookup(*parent_ty) {
                Type::Struct(parent_id, arguments) => self
                    .table
                    .struct_def(parent_id)
                    .map(|parent_def| parent_def.instantiation(graph, &arguments))
                    .unwrap_or_default(),
                _ => HashMap::new(),
            };
            let span = def
                .composes
                .iter()
                .find(|composed| composed.ty == *parent_ty)
                .map(|composed| composed.span)
                .unwrap_or(def.decl.span);

            push_unique(&mut ancestors, *parent_ty);
            for ancestor in &parent.ancestors {
                push_unique(&mut ancestors, graph.substitute(*ancestor, &mapping, &vars));
            }

            for field in &parent.fields {
                let ty = graph.substitute(field.ty, &mapping, &vars);
                match fields.iter().find(|existing| existing.name == field.name) {
                    Some(existing) if existing.origin == field.origin && existing.ty == ty => {}
                    Some(_) => self.issues.push(CompositionIssue::DuplicateField {
                        owner: def.id,
                        field: field.name.clone(),
                        span,
                    }),
                    None => fields.push(ResolvedField {
                        ty,
                        ..field.clone()
                    }),
                }
            }

            for method in &parent.methods {
                let incoming = ResolvedMethod {
                    signature: method.signature.substitute(graph, &mapping),
                    ..method.clone()
                };
                let Some(index) = methods.iter().position(|m| m.name == method.name) else {
                    methods.push(incoming);
                    continue;
                };
                let existing = &methods[index];
                if existing.origin == incoming.origin {
                    continue;
                }
                match (existing.has_body, incoming.has_body) {
                    (true, true) => {
                        match ambiguous.iter_mut().find(|(name, _)| *name == method.name) {
                            Some((_, origins)) => origins.push(incoming.origin),
                            None => ambiguous.push((
                                method.name.clone(),
                                vec![existing.origin, incoming.origin],
                            )),
                        }
                    }
                    (false, true) | (true, false) => {
                        if existing.signature.ty != incoming.signature.ty {
                            self.issues.push(CompositionIssue::OverrideMismatch {
                                owner: def.id,
                                method: method.name.clone(),
                                expected: existing.signature.ty,
                                found: incoming.signature.ty,
                                span,
                            });
                        }
                        if incoming.has_body {
                            methods[index] = incoming;
                        }
                    }
                    (false, false) => {}
                }
            }
        }

        for field in own_fields(def) {
            if fields.iter().any(|existing| existing.name == field.name) {
                self.issues.push(CompositionIssue::DuplicateField {
                    owner: def.id,
                    field: field.name.clone(),
                    span: field.span,
                });
                continue;
            }
            fields.push(field);
        }

        let mut declared: HashSet<String> = HashSet::new();
        for method in own_methods(def) {
            let duplicate = !declared.insert(method.name.clone())
                || fields.iter().any(|field| field.name == method.name);
            if duplicate {
                self.issues.push(CompositionIssue::DuplicateField {
                    owner: def.id,
                    field: method.name.clone(),
                    span: method.span,
                });
                continue;
            }
            ambiguous.retain(|(name, _)| *name != method.name);
            match methods.iter().position(|m| m.name == method.name) {
                Some(index) => {
                    let inherited = &methods[index];
                    if inherited.signature.ty != method.signature.ty {
                        self.issues.push(CompositionIssue::OverrideMismatch {
                            owner: def.id,
                            method: method.name.clone(),
                            expected: inherited.signature.ty,
                            found: method.signature.ty,
                            span: method.span,
                        });
                    }
                    methods[index] = method;
                }
                None => methods.push(method),
            }
        }

        for (method, origins) in ambiguous {
            self.issues.push(CompositionIssue::AmbiguousMethod {
                owner: def.id,
                method,
                origins,
            });
        }

        let concrete = !tainted && methods.iter().all(|method| method.has_body);
        let unmet: Vec<String> = methods
            .iter()
            .filter(|method| !method.has_body && method.origin != def.id)
            .map(|method| render_method(graph, self.table, method))
            .collect();

        let resolved = Arc::new(ResolvedStruct {
            id: def.id,
            name: def.name.clone(),
            fields,
            methods,
            ancestors,
            concrete,
        });
        trace!(name = %def.name, concrete, "resolved composition");

        if unmet.is_empty() {
            Resolution::Resolved(resolved)
        } else {
            self.issues.push(CompositionIssue::MissingOverride {
                owner: def.id,
                unmet: unmet.clone(),
            });
            Resolution::MissingOverride { resolved, unmet }
        }
    }
}

fn own_fields(def: &StructDef) -> Vec<ResolvedField> {
    def.fields
        .iter()
        .map(|field| ResolvedField {
            name: field.name.clone(),
            ty: field.ty,
            origin: def.id,
            has_default: field.has_default,
            span: field.span,
        })
        .collect()
}

fn own_methods(def: &StructDef) -> Vec<ResolvedMethod> {
    def.methods
        .iter()
        .map(|method| ResolvedMethod {
            name: method.name.clone(),
            signature: method.signature.clone(),
            origin: def.id,
            has_body: method.has_body,
            span: method.span,
        })
        .collect()
}

fn push_unique(ids: &mut Vec<TypeId>, id: TypeId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// `name(param: T, ...) -> R`, as quoted in diagnostics.
pub fn render_method(graph: &TypeGraph, names: &dyn NameLookup, method: &ResolvedMethod) -> String {
    let params = method
        .signature
        .params
        .iter()
        .map(|(name, ty)| format!("{name}: {}", graph.describe(*ty, names)))
        .collect::<Vec<_>>()
        .join(", ");
    match method.signature.returns.as_slice() {
        [] => format!("{}({params})", method.name),
        returns => {
            let result = graph.returns_as_value(returns);
            format!("{}({params}) -> {}", method.name, graph.describe(result, names))
        }
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }
}

/// Groups structs that are linked through composition, each group sorted by
/// id and groups ordered by their smallest member.
pub fn components(table: &DeclarationTable) -> Vec<Vec<StructId>> {
    let count = table.structs().len();
    let mut sets = UnionFind::new(count);
    for def in table.structs() {
        for parent in &def.composes {
            let parent = parent.id.0 as usize;
            if parent < count {
                sets.union(def.id.0 as usize, parent);
            }
        }
    }

    let mut groups: Vec<Vec<StructId>> = Vec::new();
    let mut index_of_root: HashMap<usize, usize> = HashMap::new();
    for node in 0..count {
        let root = sets.find(node);
        let slot = *index_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(StructId(node as u32));
    }
    groups
}

/// Resolves every struct, one connected component per task when `parallel`.
pub fn resolve_all(
    graph: &TypeGraph,
    table: &DeclarationTable,
    parallel: bool,
) -> (HashMap<StructId, Resolution>, Vec<Diagnostic>) {
    let groups = components(table);
    debug!(components = groups.len(), "resolving composition");

    let resolve_group = |group: &Vec<StructId>| {
        let mut resolver = CompositionResolver::new(graph, table);
        for id in group {
            resolver.resolve(*id);
        }
        resolver.into_parts()
    };
    let results: Vec<_> = if parallel {
        groups.par_iter().map(resolve_group).collect()
    } else {
        groups.iter().map(resolve_group).collect()
    };

    let mut resolutions = HashMap::new();
    let mut diagnostics = Vec::new();
    for (memo, issues) in results {
        resolutions.extend(memo);
        diagnostics.extend(
            issues
                .iter()
                .map(|issue| issue.to_diagnostic(graph, table)),
        );
    }
    (resolutions, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_find_keeps_smallest_root() {
        let mut sets = UnionFind::new(5);
        sets.union(3, 1);
        sets.union(4, 3);
        assert_eq!(sets.find(4), 1);
        assert_eq!(sets.find(0), 0);
        assert_ne!(sets.find(2), sets.find(1));
    }
}
