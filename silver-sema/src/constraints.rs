//! Generic bounds and unification.
//!
//! A bound either admits a fixed set of primitive kinds (`Signed`,
//! `Ordered`) or requires a method set (`Collection[I]`). Structural bounds
//! are checked against a [`MethodTable`] and report what their parameters
//! were bound to, so the caller can unify them with the bound's arguments.

use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use crate::types::{BoundRef, PrimitiveKind, Type, TypeGraph, TypeId};

/// Answers which methods a type exposes, already specialised to the type's
/// own arguments.
pub trait MethodTable {
    fn method_type(&self, receiver: TypeId, name: &str) -> Option<TypeId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSlot {
    /// The bound's `n`th type argument.
    Parameter(usize),
    Primitive(PrimitiveKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredMethod {
    pub name: String,
    pub params: Vec<BoundSlot>,
    pub returns: Vec<BoundSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Kinds {
        kinds: Vec<PrimitiveKind>,
        admits_enums: bool,
    },
    Structural {
        parameters: usize,
        methods: Vec<RequiredMethod>,
    },
}

impl Bound {
    pub fn parameter_count(&self) -> usize {
        match self {
            Bound::Kinds { .. } => 0,
            Bound::Structural { parameters, .. } => *parameters,
        }
    }
}

struct KindBound {
    name: &'static str,
    kinds: &'static [PrimitiveKind],
    admits_enums: bool,
}

const fn kind_bound(
    name: &'static str,
    kinds: &'static [PrimitiveKind],
    admits_enums: bool,
) -> KindBound {
    KindBound {
        name,
        kinds,
        admits_enums,
    }
}

use PrimitiveKind::{Float, Float64, Int16, Int32, Int64, Int8, UInt16, UInt32, UInt64, UInt8};

const SIGNED: &[PrimitiveKind] = &[Int8, Int16, Int32, Int64];
const UNSIGNED: &[PrimitiveKind] = &[UInt8, UInt16, UInt32, UInt64];
const INTEGER: &[PrimitiveKind] = &[Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64];
const FLOATING: &[PrimitiveKind] = &[Float, Float64];
const NUMERIC: &[PrimitiveKind] = &[
    Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64, Float, Float64,
];

const KIND_BOUNDS: &[KindBound] = &[
    kind_bound("Signed", SIGNED, false),
    kind_bound("Unsigned", UNSIGNED, false),
    kind_bound("Integer", INTEGER, false),
    kind_bound("Floating", FLOATING, false),
    kind_bound("Numeric", NUMERIC, false),
    kind_bound("Ordered", NUMERIC, true),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("unknown bound '{name}'")]
    UnknownBound { name: String },
    #[error("it is not admitted by '{bound}'")]
    NotAdmitted { bound: String },
    #[error("'{bound}' requires a method '{method}'")]
    MissingMethod { bound: String, method: String },
    #[error("method '{method}' does not have the shape '{bound}' requires")]
    MethodShape { bound: String, method: String },
    #[error("the methods bind parameter {parameter} of '{bound}' inconsistently")]
    Inconsistent { bound: String, parameter: usize },
}

#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    bounds: HashMap<String, Bound>,
}

impl ConstraintSolver {
    pub fn new() -> Self {
        let mut bounds = HashMap::new();
        for entry in KIND_BOUNDS {
            bounds.insert(
                entry.name.to_string(),
                Bound::Kinds {
                    kinds: entry.kinds.to_vec(),
                    admits_enums: entry.admits_enums,
                },
            );
        }
        bounds.insert(
            "Collection".to_string(),
            Bound::Structural {
                parameters: 1,
                methods: vec![
                    RequiredMethod {
                        name: "len".to_string(),
                        params: Vec::new(),
                        returns: vec![BoundSlot::Primitive(Int64)],
                    },
                    RequiredMethod {
                        name: "get".to_string(),
                        params: vec![BoundSlot::Primitive(Int64)],
                        returns: vec![BoundSlot::Parameter(0)],
                    },
                ],
            },
        );
        Self { bounds }
    }

    pub fn register(&mut self, name: impl Into<String>, bound: Bound) {
        self.bounds.insert(name.into(), bound);
    }

    pub fn bound(&self, name: &str) -> Option<&Bound> {
        self.bounds.get(name)
    }

    pub fn parameter_count(&self, name: &str) -> Option<usize> {
        self.bound(name).map(Bound::parameter_count)
    }

    /// Whether `ty` satisfies the bound called `name`, with the bound's own
    /// parameters left free.
    pub fn satisfies(
        &self,
        graph: &TypeGraph,
        methods: &dyn MethodTable,
        ty: TypeId,
        name: &str,
    ) -> bool {
        self.check(graph, methods, ty, &BoundRef::named(name)).is_ok()
    }

    /// Checks `ty` against `bound` and returns what each of the bound's
    /// parameters was bound to. Concrete bound arguments must match them.
    ///
    /// The error type and unbound slots pass without a check; whatever made
    /// them is reported elsewhere.
    pub fn check(
        &self,
        graph: &TypeGraph,
        methods: &dyn MethodTable,
        ty: TypeId,
        bound: &BoundRef,
    ) -> Result<Vec<TypeId>, ConstraintError> {
        let Some(required) = self.bounds.get(&bound.name) else {
            return Err(ConstraintError::UnknownBound {
                name: bound.name.clone(),
            });
        };
        trace!(bound = %bound.name, ty = %ty, "checking bound");

        let bindings = match graph.lookup(ty) {
            Type::Error | Type::TypeVar(_) => return Ok(Vec::new()),
            Type::Generic {
                bound: Some(own), ..
            } => self.generic_satisfies(&own, required, &bound.name)?,
            candidate => match required {
                Bound::Kinds {
                    kinds,
                    admits_enums,
                } => {
                    let admitted = match candidate {
                        Type::Primitive(kind) => kinds.contains(&kind),
                        Type::Enum(_) => *admits_enums,
                        _ => false,
                    };
                    if !admitted {
                        return Err(ConstraintError::NotAdmitted {
                            bound: bound.name.clone(),
                        });
                    }
                    Vec::new()
                }
                Bound::Structural {
                    parameters,
                    methods: required_methods,
                } => self.structural_bindings(
                    graph,
                    methods,
                    ty,
                    &bound.name,
                    *parameters,
                    required_methods,
                )?,
            },
        };

        for (index, (argument, binding)) in bound.arguments.iter().zip(&bindings).enumerate() {
            let argument_is_free = matches!(
                graph.lookup(*argument),
                Type::TypeVar(_) | Type::Error
            );
            if !argument_is_free && argument != binding && !graph.is_error(*binding) {
                return Err(ConstraintError::Inconsistent {
                    bound: bound.name.clone(),
                    parameter: index,
                });
            }
        }
        Ok(bindings)
    }

    fn generic_satisfies(
        &self,
        own: &BoundRef,
        required: &Bound,
        required_name: &str,
    ) -> Result<Vec<TypeId>, ConstraintError> {
        if own.name == required_name {
            return Ok(own.arguments.clone());
        }
        let not_admitted = || ConstraintError::NotAdmitted {
            bound: required_name.to_string(),
        };
        match (self.bounds.get(&own.name), required) {
            (
                Some(Bound::Kinds {
                    kinds: own_kinds,
                    admits_enums: own_enums,
                }),
                Bound::Kinds {
                    kinds,
                    admits_enums,
                },
            ) => {
                let subset = own_kinds.iter().all(|kind| kinds.contains(kind))
                    && (!own_enums || *admits_enums);
                if subset {
                    Ok(Vec::new())
                } else {
                    Err(not_admitted())
                }
            }
            _ => Err(not_admitted()),
        }
    }

    fn structural_bindings(
        &self,
        graph: &TypeGraph,
        methods: &dyn MethodTable,
        ty: TypeId,
        bound: &str,
        parameters: usize,
        required_methods: &[RequiredMethod],
    ) -> Result<Vec<TypeId>, ConstraintError> {
        let mut bindings: Vec<Option<TypeId>> = vec![None; parameters];
        for required in required_methods {
            let shape_error = || ConstraintError::MethodShape {
                bound: bound.to_string(),
                method: required.name.clone(),
            };
            let found = methods.method_type(ty, &required.name).ok_or_else(|| {
                ConstraintError::MissingMethod {
                    bound: bound.to_string(),
                    method: required.name.clone(),
                }
            })?;
            let Type::Function { params, returns } = graph.lookup(found) else {
                return Err(shape_error());
            };
            if params.len() != required.params.len() || returns.len() != required.returns.len() {
                return Err(shape_error());
            }

            let slots = required.params.iter().chain(&required.returns);
            let actuals = params.iter().chain(&returns);
            for (slot, actual) in slots.zip(actuals) {
                match slot {
                    BoundSlot::Primitive(kind) => {
                        if *actual != graph.primitive(*kind) {
                            return Err(shape_error());
                        }
                    }
                    BoundSlot::Parameter(index) => match bindings.get(*index).copied().flatten() {
                        None => {
                            if let Some(binding) = bindings.get_mut(*index) {
                                *binding = Some(*actual);
                            }
                        }
                        Some(existing) if existing == *actual => {}
                        Some(_) => {
                            return Err(ConstraintError::Inconsistent {
                                bound: bound.to_string(),
                                parameter: *index,
                            })
                        }
                    },
                }
            }
        }
        Ok(bindings
            .into_iter()
            .map(|binding| binding.unwrap_or_else(|| graph.error()))
            .collect())
    }

    /// The method a generic parameter gains from its structural bound.
    pub fn bound_method(&self, graph: &TypeGraph, bound: &BoundRef, name: &str) -> Option<TypeId> {
        let Bound::Structural { methods, .. } = self.bounds.get(&bound.name)? else {
            return None;
        };
        let method = methods.iter().find(|method| method.name == name)?;
        let fill = |slot: &BoundSlot| match slot {
            BoundSlot::Parameter(index) => bound
                .arguments
                .get(*index)
                .copied()
                .unwrap_or_else(|| graph.error()),
            BoundSlot::Primitive(kind) => graph.primitive(*kind),
        };
        Some(graph.function(
            method.params.iter().map(fill).collect(),
            method.returns.iter().map(fill).collect(),
        ))
    }
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnifyError {
    #[error("tuple arity mismatch")]
    TupleArity { expected: TypeId, found: TypeId },
    #[error("type mismatch")]
    Mismatch { expected: TypeId, found: TypeId },
    #[error("type would contain itself")]
    Occurs { expected: TypeId, found: TypeId },
}

/// Binds unification slots while matching an expected shape against an actual one.
pub struct Unifier<'g> {
    graph: &'g TypeGraph,
    bindings: HashMap<u32, TypeId>,
}

impl<'g> Unifier<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self {
            graph,
            bindings: HashMap::new(),
        }
    }

    /// Gives every type parameter a fresh slot, keyed by parameter name.
    pub fn instantiate(&mut self, type_parameters: &[TypeId]) -> HashMap<String, TypeId> {
        type_parameters
            .iter()
            .filter_map(|id| match self.graph.lookup(*id) {
                Type::Generic { name, .. } => Some((name, self.graph.fresh_var())),
                _ => None,
            })
            .collect()
    }

    pub fn resolve(&self, id: TypeId) -> TypeId {
        if self.bindings.is_empty() {
            return id;
        }
        self.graph.substitute(id, &HashMap::new(), &self.bindings)
    }

    /// True when `id` still mentions a slot nothing has been bound to.
    pub fn is_unbound(&self, id: TypeId) -> bool {
        let resolved = self.resolve(id);
        self.mentions_var(resolved)
    }

    pub fn unify(&mut self, expected: TypeId, actual: TypeId) -> Result<(), UnifyError> {
        let expected = self.resolve(expected);
        let actual = self.resolve(actual);
        if expected == actual {
            return Ok(());
        }
        let mismatch = UnifyError::Mismatch {
            expected,
            found: actual,
        };

        match (self.graph.lookup(expected), self.graph.lookup(actual)) {
            (Type::Error, _) | (_, Type::Error) => Ok(()),
            (Type::TypeVar(slot), _) => self.bind(slot, expected, actual),
            (_, Type::TypeVar(slot)) => self.bind(slot, actual, expected),
            (Type::Tuple(left), Type::Tuple(right)) => {
                if left.len() != right.len() {
                    return Err(UnifyError::TupleArity {
                        expected,
                        found: actual,
                    });
                }
                self.unify_all(&left, &right).map_err(|_| mismatch)
            }
            (Type::List(left), Type::List(right)) => {
                self.unify(left, right).map_err(|_| mismatch)
            }
            (Type::Dict(left_key, left_value), Type::Dict(right_key, right_value)) => self
                .unify(left_key, right_key)
                .and_then(|_| self.unify(left_value, right_value))
                .map_err(|_| mismatch),
            (
                Type::Function {
                    params: left_params,
                    returns: left_returns,
                },
                Type::Function {
                    params: right_params,
                    returns: right_returns,
                },
            ) => {
                if left_params.len() != right_params.len()
                    || left_returns.len() != right_returns.len()
                {
                    return Err(mismatch);
                }
                self.unify_all(&left_params, &right_params)
                    .and_then(|_| self.unify_all(&left_returns, &right_returns))
                    .map_err(|_| mismatch)
            }
            (Type::Struct(left, left_args), Type::Struct(right, right_args))
                if left == right && left_args.len() == right_args.len() =>
            {
                self.unify_all(&left_args, &right_args).map_err(|_| mismatch)
            }
            _ => Err(mismatch),
        }
    }

    fn unify_all(&mut self, expected: &[TypeId], actual: &[TypeId]) -> Result<(), UnifyError> {
        for (expected, actual) in expected.iter().zip(actual) {
            self.unify(*expected, *actual)?;
        }
        Ok(())
    }

    fn bind(&mut self, slot: u32, var: TypeId, ty: TypeId) -> Result<(), UnifyError> {
        if self.occurs(slot, ty) {
            return Err(UnifyError::Occurs {
                expected: var,
                found: ty,
            });
        }
        trace!(slot, ty = %ty, "binding slot");
        self.bindings.insert(slot, ty);
        Ok(())
    }

    fn occurs(&self, slot: u32, id: TypeId) -> bool {
        match self.graph.lookup(id) {
            Type::TypeVar(other) => other == slot,
            Type::Tuple(elements) | Type::Struct(_, elements) => {
                elements.iter().any(|element| self.occurs(slot, *element))
            }
            Type::List(element) => self.occurs(slot, element),
            Type::Dict(key, value) => self.occurs(slot, key) || self.occurs(slot, value),
            Type::Function { params, returns } => params
                .iter()
                .chain(&returns)
                .any(|part| self.occurs(slot, *part)),
            Type::Primitive(_) | Type::Enum(_) | Type::Generic { .. } | Type::Error => false,
        }
    }

    fn mentions_var(&self, id: TypeId) -> bool {
        match self.graph.lookup(id) {
            Type::TypeVar(_) => true,
            Type::Tuple(elements) | Type::Struct(_, elements) => {
                elements.iter().any(|element| self.mentions_var(*element))
            }
            Type::List(element) => self.mentions_var(element),
            Type::Dict(key, value) => self.mentions_var(key) || self.mentions_var(value),
            Type::Function { params, returns } => params
                .iter()
                .chain(&returns)
                .any(|part| self.mentions_var(*part)),
            Type::Primitive(_) | Type::Enum(_) | Type::Generic { .. } | Type::Error => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::types::EnumId;

    struct Builtins<'g>(&'g TypeGraph);

    impl MethodTable for Builtins<'_> {
        fn method_type(&self, receiver: TypeId, name: &str) -> Option<TypeId> {
            builtins::method_type(self.0, receiver, name)
        }
    }

    #[test]
    fn str_is_not_ordered() {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let methods = Builtins(&graph);
        let str_ty = graph.primitive(PrimitiveKind::Str);
        assert!(!solver.satisfies(&graph, &methods, str_ty, "Ordered"));
    }

    #[test]
    fn enums_are_ordered_but_not_numeric() {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let methods = Builtins(&graph);
        let color = graph.enum_type(EnumId(0));
        assert!(solver.satisfies(&graph, &methods, color, "Ordered"));
        assert!(!solver.satisfies(&graph, &methods, color, "Numeric"));
    }

    #[test]
    fn generic_parameter_satisfies_wider_bound() {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let methods = Builtins(&graph);
        let signed = graph.generic("T", Some(BoundRef::named("Signed")));
        assert!(solver.satisfies(&graph, &methods, signed, "Numeric"));
        assert!(solver.satisfies(&graph, &methods, signed, "Ordered"));
        assert!(!solver.satisfies(&graph, &methods, signed, "Unsigned"));

        let ordered = graph.generic("U", Some(BoundRef::named("Ordered")));
        assert!(!solver.satisfies(&graph, &methods, ordered, "Numeric"));
    }

    #[test]
    fn list_is_a_collection_of_its_elements() {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let methods = Builtins(&graph);
        let int = graph.primitive(PrimitiveKind::Int32);
        let list = graph.list(int);
        let bound = BoundRef {
            name: "Collection".to_string(),
            arguments: vec![int],
        };
        assert_eq!(solver.check(&graph, &methods, list, &bound), Ok(vec![int]));

        let wrong = BoundRef {
            name: "Collection".to_string(),
            arguments: vec![graph.primitive(PrimitiveKind::Str)],
        };
        assert!(matches!(
            solver.check(&graph, &methods, list, &wrong),
            Err(ConstraintError::Inconsistent { .. })
        ));
    }

    #[test]
    fn dict_is_not_a_collection() {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let methods = Builtins(&graph);
        let str_ty = graph.primitive(PrimitiveKind::Str);
        let dict = graph.dict(str_ty, str_ty);
        assert!(matches!(
            solver.check(&graph, &methods, dict, &BoundRef::named("Collection")),
            Err(ConstraintError::MethodShape { .. })
        ));
    }

    #[test]
    fn unify_binds_slots_through_lists() {
        let graph = TypeGraph::new();
        let mut unifier = Unifier::new(&graph);
        let var = graph.fresh_var();
        let str_ty = graph.primitive(PrimitiveKind::Str);
        unifier.unify(graph.list(var), graph.list(str_ty)).unwrap();
        assert_eq!(unifier.resolve(var), str_ty);
        assert!(!unifier.is_unbound(graph.list(var)));
    }

    #[test]
    fn unify_reports_tuple_arity() {
        let graph = TypeGraph::new();
        let mut unifier = Unifier::new(&graph);
        let int = graph.primitive(PrimitiveKind::Int32);
        let five = graph.tuple(vec![int; 5]);
        let three = graph.tuple(vec![int; 3]);
        assert!(matches!(
            unifier.unify(five, three),
            Err(UnifyError::TupleArity { .. })
        ));
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let graph = TypeGraph::new();
        let mut unifier = Unifier::new(&graph);
        let var = graph.fresh_var();
        assert!(matches!(
            unifier.unify(var, graph.list(var)),
            Err(UnifyError::Occurs { .. })
        ));
    }
}
