//! Canonical type storage.
//!
//! Every type the checker reasons about lives in a [`TypeGraph`] and is referred
//! to by an opaque [`TypeId`]. Structural types (tuples, lists, dicts, function
//! signatures) are deduplicated on insertion, so two equal shapes always share
//! an id and identity comparison replaces structural comparison. Named types
//! carry the id of their declaration plus their type arguments, which keeps
//! `Box[int32]` and `Box[str]` apart while sharing one declaration.
//!
//! The graph is append-only. Interning goes through a sharded map, so units
//! collected in parallel only contend when they insert the same shape.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::ast::TypeExpression;
use crate::diagnostics::DiagnosticCode;
use crate::source::ModulePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StructId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Float64,
    Bool,
    Str,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 12] = [
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::UInt8,
        PrimitiveKind::UInt16,
        PrimitiveKind::UInt32,
        PrimitiveKind::UInt64,
        PrimitiveKind::Float,
        PrimitiveKind::Float64,
        PrimitiveKind::Bool,
        PrimitiveKind::Str,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::UInt32 => "uint32",
            PrimitiveKind::UInt64 => "uint64",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Str => "str",
        }
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::UInt8
                | PrimitiveKind::UInt16
                | PrimitiveKind::UInt32
                | PrimitiveKind::UInt64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Float64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Inclusive value range of an integer kind.
    pub fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            PrimitiveKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
            PrimitiveKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            PrimitiveKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            PrimitiveKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            PrimitiveKind::UInt8 => (0, u8::MAX as i128),
            PrimitiveKind::UInt16 => (0, u16::MAX as i128),
            PrimitiveKind::UInt32 => (0, u32::MAX as i128),
            PrimitiveKind::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A generic bound as it appears on a type parameter: `Signed`, `Collection[I]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundRef {
    pub name: String,
    pub arguments: Vec<TypeId>,
}

impl BoundRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveKind),
    /// Element types in slot order; the arity is part of the identity.
    Tuple(Vec<TypeId>),
    List(TypeId),
    Dict(TypeId, TypeId),
    Struct(StructId, Vec<TypeId>),
    Enum(EnumId),
    Function {
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
    },
    Generic {
        name: String,
        bound: Option<BoundRef>,
    },
    TypeVar(u32),
    Error,
}

/// Resolves declaration ids back to their names for [`TypeGraph::describe`].
pub trait NameLookup {
    fn struct_name(&self, id: StructId) -> String;
    fn enum_name(&self, id: EnumId) -> String;
}

/// Where an alias points before it has been resolved.
#[derive(Debug, Clone)]
pub enum AliasTarget {
    Type(TypeId),
    Expression {
        expression: TypeExpression,
        module: ModulePath,
    },
}

#[derive(Debug, Clone)]
enum AliasSlot {
    Pending(AliasTarget),
    InProgress,
    Resolved(TypeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown type '{name}'")]
    Unresolved { name: String },
    #[error("type alias cycle: {}", members.join(" -> "))]
    AliasCycle { members: Vec<String> },
    #[error("'{name}' expects {expected} type argument(s), found {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("unknown bound '{name}'")]
    UnknownBound { name: String },
}

impl ResolveError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ResolveError::AliasCycle { .. } => DiagnosticCode::AliasCycle,
            _ => DiagnosticCode::UnresolvedType,
        }
    }
}

pub struct TypeGraph {
    types: boxcar::Vec<Type>,
    ids: DashMap<Type, TypeId>,
    aliases: DashMap<String, AliasSlot>,
    next_var: AtomicU32,
}

impl TypeGraph {
    pub fn new() -> Self {
        let graph = Self {
            types: boxcar::Vec::new(),
            ids: DashMap::new(),
            aliases: DashMap::new(),
            next_var: AtomicU32::new(0),
        };
        // The error sentinel always occupies the first slot.
        graph.intern(Type::Error);
        for kind in PrimitiveKind::ALL {
            graph.intern(Type::Primitive(kind));
        }
        graph.intern(Type::Tuple(Vec::new()));

        let builtin_aliases = [
            ("int", PrimitiveKind::Int64),
            ("uint", PrimitiveKind::UInt64),
            ("float32", PrimitiveKind::Float),
            ("string", PrimitiveKind::Str),
        ];
        for (name, kind) in builtin_aliases {
            graph.alias(name, graph.primitive(kind));
        }
        graph
    }

    /// Returns the id of `ty`, inserting it if no equal type exists yet.
    pub fn intern(&self, ty: Type) -> TypeId {
        if let Some(existing) = self.ids.get(&ty) {
            return *existing;
        }
        match self.ids.entry(ty) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.types.push(entry.key().clone());
                let id = TypeId(index as u32);
                entry.insert(id);
                id
            }
        }
    }

    pub fn lookup(&self, id: TypeId) -> Type {
        self.types.get(id.index()).cloned().unwrap_or(Type::Error)
    }

    pub fn len(&self) -> usize {
        self.types.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn error(&self) -> TypeId {
        TypeId(0)
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id == self.error()
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.intern(Type::Primitive(kind))
    }

    pub fn unit(&self) -> TypeId {
        self.intern(Type::Tuple(Vec::new()))
    }

    pub fn tuple(&self, elements: Vec<TypeId>) -> TypeId {
        self.intern(Type::Tuple(elements))
    }

    pub fn list(&self, element: TypeId) -> TypeId {
        self.intern(Type::List(element))
    }

    pub fn dict(&self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(Type::Dict(key, value))
    }

    pub fn function(&self, params: Vec<TypeId>, returns: Vec<TypeId>) -> TypeId {
        self.intern(Type::Function { params, returns })
    }

    pub fn struct_type(&self, id: StructId, arguments: Vec<TypeId>) -> TypeId {
        self.intern(Type::Struct(id, arguments))
    }

    pub fn enum_type(&self, id: EnumId) -> TypeId {
        self.intern(Type::Enum(id))
    }

    pub fn generic(&self, name: impl Into<String>, bound: Option<BoundRef>) -> TypeId {
        self.intern(Type::Generic {
            name: name.into(),
            bound,
        })
    }

    /// A unification slot that no other call will ever hand out.
    pub fn fresh_var(&self) -> TypeId {
        let slot = self.next_var.fetch_add(1, Ordering::Relaxed);
        self.intern(Type::TypeVar(slot))
    }

    pub fn primitive_kind(&self, id: TypeId) -> Option<PrimitiveKind> {
        match self.lookup(id) {
            Type::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// The value type of a call: nothing, the single result, or a tuple of results.
    pub fn returns_as_value(&self, returns: &[TypeId]) -> TypeId {
        match returns {
            [] => self.unit(),
            [single] => *single,
            many => self.tuple(many.to_vec()),
        }
    }

    /// True when `id` mentions the error sentinel, an unbound slot, or a generic parameter.
    pub fn contains_unresolved(&self, id: TypeId, allow_generics: bool) -> bool {
        match self.lookup(id) {
            Type::Error | Type::TypeVar(_) => true,
            Type::Generic { .. } => !allow_generics,
            Type::Primitive(_) | Type::Enum(_) => false,
            Type::Tuple(elements) | Type::Struct(_, elements) => elements
                .iter()
                .any(|element| self.contains_unresolved(*element, allow_generics)),
            Type::List(element) => self.contains_unresolved(element, allow_generics),
            Type::Dict(key, value) => {
                self.contains_unresolved(key, allow_generics)
                    || self.contains_unresolved(value, allow_generics)
            }
            Type::Function { params, returns } => params
                .iter()
                .chain(returns.iter())
                .any(|part| self.contains_unresolved(*part, allow_generics)),
        }
    }

    /// Records `name` as a pure redirection to an already-known type.
    pub fn alias(&self, name: impl Into<String>, target: TypeId) -> TypeId {
        self.aliases.insert(name.into(), AliasSlot::Resolved(target));
        target
    }

    /// Records `name` as an alias whose target still has to be lowered.
    pub fn define_alias(&self, name: impl Into<String>, target: AliasTarget) {
        self.aliases.insert(name.into(), AliasSlot::Pending(target));
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Follows `name` to its final non-alias target.
    ///
    /// `lower` turns a pending target into a type and may itself resolve
    /// further aliases; a chain that leads back to an alias still being
    /// resolved is reported as [`ResolveError::AliasCycle`], with the path
    /// running from the repeated alias back to itself. Every alias on a
    /// resolved chain caches the final id, so repeated lookups are O(1). A
    /// failed chain caches the error sentinel so the failure surfaces once.
    pub fn resolve_alias<F>(&self, name: &str, mut lower: F) -> Result<TypeId, ResolveError>
    where
        F: FnMut(&AliasTarget) -> Result<TypeId, ResolveError>,
    {
        let slot = match self.aliases.get(name) {
            Some(slot) => slot.clone(),
            None => {
                return Err(ResolveError::Unresolved {
                    name: name.to_string(),
                })
            }
        };

        let target = match slot {
            AliasSlot::Resolved(id) => return Ok(id),
            AliasSlot::InProgress => {
                return Err(ResolveError::AliasCycle {
                    members: vec![name.to_string()],
                })
            }
            AliasSlot::Pending(target) => target,
        };

        trace!(alias = name, "resolving alias");
        self.aliases.insert(name.to_string(), AliasSlot::InProgress);
        // The path grows while unwinding until it reaches the alias that
        // closed it; aliases further out only lead into the cycle.
        let outcome = lower(&target).map_err(|error| match error {
            ResolveError::AliasCycle { mut members } if !is_closed(&members) => {
                members.insert(0, name.to_string());
                ResolveError::AliasCycle { members }
            }
            other => other,
        });

        let cached = match &outcome {
            Ok(id) => *id,
            Err(_) => self.error(),
        };
        self.aliases
            .insert(name.to_string(), AliasSlot::Resolved(cached));
        outcome
    }

    /// Human-readable rendering of a type, e.g. `Dict[str, (int32: 3)]`.
    pub fn describe(&self, id: TypeId, names: &dyn NameLookup) -> String {
        match self.lookup(id) {
            Type::Primitive(kind) => kind.name().to_string(),
            Type::Tuple(elements) => {
                if elements.len() > 1 && elements.iter().all(|element| *element == elements[0]) {
                    format!("({}: {})", self.describe(elements[0], names), elements.len())
                } else {
                    format!("({})", self.describe_list(&elements, names))
                }
            }
            Type::List(element) => format!("List[{}]", self.describe(element, names)),
            Type::Dict(key, value) => format!(
                "Dict[{}, {}]",
                self.describe(key, names),
                self.describe(value, names)
            ),
            Type::Struct(struct_id, arguments) => {
                let name = names.struct_name(struct_id);
                if arguments.is_empty() {
                    name
                } else {
                    format!("{name}[{}]", self.describe_list(&arguments, names))
                }
            }
            Type::Enum(enum_id) => names.enum_name(enum_id),
            Type::Function { params, returns } => {
                let params = self.describe_list(&params, names);
                match returns.as_slice() {
                    [] => format!("fn({params})"),
                    [single] => format!("fn({params}) -> {}", self.describe(*single, names)),
                    many => format!("fn({params}) -> ({})", self.describe_list(many, names)),
                }
            }
            Type::Generic { name, .. } => name,
            Type::TypeVar(slot) => format!("?{slot}"),
            Type::Error => "<error>".to_string(),
        }
    }

    fn describe_list(&self, ids: &[TypeId], names: &dyn NameLookup) -> String {
        ids.iter()
            .map(|id| self.describe(*id, names))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Replaces generic parameters by name and unification slots by number.
    pub fn substitute(
        &self,
        id: TypeId,
        params: &HashMap<String, TypeId>,
        vars: &HashMap<u32, TypeId>,
    ) -> TypeId {
        if params.is_empty() && vars.is_empty() {
            return id;
        }
        match self.lookup(id) {
            Type::Generic { name, .. } => params.get(&name).copied().unwrap_or(id),
            Type::TypeVar(slot) => match vars.get(&slot) {
                Some(bound) if *bound != id => self.substitute(*bound, params, vars),
                _ => id,
            },
            Type::Tuple(elements) => {
                let elements = self.substitute_all(&elements, params, vars);
                self.tuple(elements)
            }
            Type::List(element) => {
                let element = self.substitute(element, params, vars);
                self.list(element)
            }
            Type::Dict(key, value) => {
                let key = self.substitute(key, params, vars);
                let value = self.substitute(value, params, vars);
                self.dict(key, value)
            }
            Type::Struct(struct_id, arguments) => {
                let arguments = self.substitute_all(&arguments, params, vars);
                self.struct_type(struct_id, arguments)
            }
            Type::Function {
                params: fn_params,
                returns,
            } => {
                let fn_params = self.substitute_all(&fn_params, params, vars);
                let returns = self.substitute_all(&returns, params, vars);
                self.function(fn_params, returns)
            }
            Type::Primitive(_) | Type::Enum(_) | Type::Error => id,
        }
    }

    fn substitute_all(
        &self,
        ids: &[TypeId],
        params: &HashMap<String, TypeId>,
        vars: &HashMap<u32, TypeId>,
    ) -> Vec<TypeId> {
        ids.iter()
            .map(|id| self.substitute(*id, params, vars))
            .collect()
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn is_closed(members: &[String]) -> bool {
    members.len() > 1 && members.first() == members.last()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoNames;

    impl NameLookup for NoNames {
        fn struct_name(&self, id: StructId) -> String {
            format!("S{}", id.0)
        }

        fn enum_name(&self, id: EnumId) -> String {
            format!("E{}", id.0)
        }
    }

    #[test]
    fn structural_types_are_deduplicated() {
        let graph = TypeGraph::new();
        let int = graph.primitive(PrimitiveKind::Int32);
        let a = graph.tuple(vec![int, int]);
        let b = graph.tuple(vec![int, int]);
        assert_eq!(a, b);
        assert_ne!(a, graph.tuple(vec![int, int, int]));
    }

    #[test]
    fn error_is_first_slot() {
        let graph = TypeGraph::new();
        assert_eq!(graph.lookup(graph.error()), Type::Error);
        assert!(graph.is_error(graph.intern(Type::Error)));
    }

    #[test]
    fn describes_repeated_tuples_compactly() {
        let graph = TypeGraph::new();
        let int = graph.primitive(PrimitiveKind::Int32);
        let tuple = graph.tuple(vec![int; 5]);
        assert_eq!(graph.describe(tuple, &NoNames), "(int32: 5)");
        let func = graph.function(vec![tuple], vec![int]);
        assert_eq!(graph.describe(func, &NoNames), "fn((int32: 5)) -> int32");
    }

    #[test]
    fn fresh_vars_never_collide() {
        let graph = TypeGraph::new();
        assert_ne!(graph.fresh_var(), graph.fresh_var());
    }

    #[test]
    fn builtin_aliases_resolve_to_primitives() {
        let graph = TypeGraph::new();
        let resolved = graph
            .resolve_alias("int", |_| unreachable!("builtin aliases are pre-resolved"))
            .unwrap();
        assert_eq!(resolved, graph.primitive(PrimitiveKind::Int64));
    }

    #[test]
    fn self_referential_alias_reports_cycle_once() {
        let graph = TypeGraph::new();
        let expression = TypeExpression::named("Loop");
        graph.define_alias(
            "Loop",
            AliasTarget::Expression {
                expression,
                module: ModulePath::root(),
            },
        );
        let first = graph.resolve_alias("Loop", |_| {
            graph.resolve_alias("Loop", |_| unreachable!("slot is in progress"))
        });
        assert_eq!(
            first,
            Err(ResolveError::AliasCycle {
                members: vec!["Loop".to_string(), "Loop".to_string()]
            })
        );
        let second = graph.resolve_alias("Loop", |_| unreachable!("slot is cached"));
        assert_eq!(second, Ok(graph.error()));
    }
}
