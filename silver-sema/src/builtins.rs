//! Type signatures of the methods the container primitives expose.
//!
//! Only shapes matter here; behavior belongs to the core library.

use crate::types::{PrimitiveKind, Type, TypeGraph, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinReceiver {
    List,
    Dict,
    Str,
}

/// A position in a builtin signature, filled in from the receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinSlot {
    /// Element type of a `List`.
    Element,
    Key,
    Value,
    Primitive(PrimitiveKind),
}

#[derive(Clone, Copy, Debug)]
pub struct BuiltinMethod {
    pub receiver: BuiltinReceiver,
    pub name: &'static str,
    pub params: &'static [BuiltinSlot],
    pub returns: &'static [BuiltinSlot],
}

const fn builtin_method(
    receiver: BuiltinReceiver,
    name: &'static str,
    params: &'static [BuiltinSlot],
    returns: &'static [BuiltinSlot],
) -> BuiltinMethod {
    BuiltinMethod {
        receiver,
        name,
        params,
        returns,
    }
}

const INT64: BuiltinSlot = BuiltinSlot::Primitive(PrimitiveKind::Int64);
const BOOL: BuiltinSlot = BuiltinSlot::Primitive(PrimitiveKind::Bool);

pub static BUILTIN_METHODS: &[BuiltinMethod] = &[
    builtin_method(BuiltinReceiver::List, "len", &[], &[INT64]),
    builtin_method(
        BuiltinReceiver::List,
        "get",
        &[INT64],
        &[BuiltinSlot::Element],
    ),
    builtin_method(BuiltinReceiver::List, "push", &[BuiltinSlot::Element], &[]),
    builtin_method(BuiltinReceiver::Dict, "len", &[], &[INT64]),
    builtin_method(
        BuiltinReceiver::Dict,
        "get",
        &[BuiltinSlot::Key],
        &[BuiltinSlot::Value],
    ),
    builtin_method(
        BuiltinReceiver::Dict,
        "insert",
        &[BuiltinSlot::Key, BuiltinSlot::Value],
        &[],
    ),
    builtin_method(
        BuiltinReceiver::Dict,
        "contains",
        &[BuiltinSlot::Key],
        &[BOOL],
    ),
    builtin_method(BuiltinReceiver::Str, "len", &[], &[INT64]),
];

pub fn find_method(receiver: BuiltinReceiver, name: &str) -> Option<&'static BuiltinMethod> {
    BUILTIN_METHODS
        .iter()
        .find(|method| method.receiver == receiver && method.name == name)
}

/// The function type of `name` on `receiver`, specialised to the receiver's
/// element types, or `None` when the receiver has no such builtin.
pub fn method_type(graph: &TypeGraph, receiver: TypeId, name: &str) -> Option<TypeId> {
    let (kind, element, key, value) = match graph.lookup(receiver) {
        Type::List(element) => (BuiltinReceiver::List, Some(element), None, None),
        Type::Dict(key, value) => (BuiltinReceiver::Dict, None, Some(key), Some(value)),
        Type::Primitive(PrimitiveKind::Str) => (BuiltinReceiver::Str, None, None, None),
        _ => return None,
    };
    let method = find_method(kind, name)?;
    let fill = |slot: &BuiltinSlot| -> TypeId {
        let filled = match slot {
            BuiltinSlot::Element => element,
            BuiltinSlot::Key => key,
            BuiltinSlot::Value => value,
            BuiltinSlot::Primitive(kind) => Some(graph.primitive(*kind)),
        };
        filled.unwrap_or_else(|| graph.error())
    };
    let params = method.params.iter().map(fill).collect();
    let returns = method.returns.iter().map(fill).collect();
    Some(graph.function(params, returns))
}
