mod common;

use common::*;
use proptest::prelude::*;
use silver_sema::{
    Declaration, DiagnosticCode, PrimitiveKind, SourceSpan, Type, TypeAliasDecl, TypeGraph,
};

fn alias_chain(length: usize) -> Vec<Declaration> {
    let mut declarations: Vec<Declaration> = (1..length)
        .map(|index| alias(&format!("A{index}"), ty(&format!("A{}", index - 1))))
        .collect();
    declarations.push(alias("A0", ty("int")));
    // Declared newest first so every link is a forward reference.
    declarations.reverse();
    declarations.rotate_left(length / 2);
    declarations
}

fn any_primitive() -> impl Strategy<Value = PrimitiveKind> {
    proptest::sample::select(PrimitiveKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn alias_chains_resolve_to_their_root(length in 1usize..12) {
        let output = check(alias_chain(length));
        prop_assert!(output.diagnostics().is_empty());
        let int64 = output.resolve_type("int64").unwrap();
        for index in 0..length {
            prop_assert_eq!(output.resolve_type(&format!("A{index}")).unwrap(), int64);
        }
    }

    #[test]
    fn interning_is_structural(kinds in proptest::collection::vec(any_primitive(), 0..6)) {
        let graph = TypeGraph::new();
        let elements: Vec<_> = kinds.iter().map(|kind| graph.primitive(*kind)).collect();
        let first = graph.tuple(elements.clone());
        let before = graph.len();
        let second = graph.tuple(elements.clone());
        prop_assert_eq!(first, second);
        prop_assert_eq!(graph.len(), before);
        prop_assert_eq!(graph.lookup(first), Type::Tuple(elements));
    }

    #[test]
    fn tuple_arity_is_part_of_identity(kind in any_primitive(), arity in 1usize..8) {
        let graph = TypeGraph::new();
        let element = graph.primitive(kind);
        let shorter = graph.tuple(vec![element; arity]);
        let longer = graph.tuple(vec![element; arity + 1]);
        prop_assert_ne!(shorter, longer);
    }
}

#[test]
fn list_instantiations_are_distinct() {
    let graph = TypeGraph::new();
    let ints = graph.list(graph.primitive(PrimitiveKind::Int64));
    let strs = graph.list(graph.primitive(PrimitiveKind::Str));
    assert_ne!(ints, strs);
    assert_eq!(ints, graph.list(graph.primitive(PrimitiveKind::Int64)));
}

#[test]
fn alias_cycle_is_reported_once() {
    let output = check(vec![alias("A", ty("B")), alias("B", ty("A"))]);
    assert_eq!(codes(&output), vec![DiagnosticCode::AliasCycle]);
    assert!(output.resolve_type("A").is_err());
}

#[test]
fn alias_leading_into_a_cycle_is_not_part_of_it() {
    let at_line = |name: &str, target: &str, line: usize| {
        Declaration::TypeAlias(TypeAliasDecl {
            name: name.to_string(),
            target: ty(target),
            span: SourceSpan::single_point(line, 1),
        })
    };
    let output = check(vec![at_line("C", "A", 1), at_line("A", "B", 2), at_line("B", "A", 3)]);

    assert_eq!(codes(&output), vec![DiagnosticCode::AliasCycle]);
    let diagnostic = &output.diagnostics().entries()[0];
    assert_eq!(diagnostic.message, "type alias cycle: A -> B -> A");
    assert_eq!(diagnostic.span, Some(SourceSpan::single_point(2, 1)));
    for name in ["A", "B", "C"] {
        assert!(output.resolve_type(name).is_err(), "{name} should not resolve");
    }
}

#[test]
fn builtin_names_cannot_be_redeclared() {
    let output = check(vec![
        alias("int", ty("str")),
        alias("string", ty("int32")),
        person(),
    ]);
    assert_eq!(
        codes(&output),
        vec![
            DiagnosticCode::DuplicateDeclaration,
            DiagnosticCode::DuplicateDeclaration
        ]
    );
    assert!(messages(&output)[0].contains("'int' is a built-in type"));
    assert_eq!(
        output.resolve_type("int").unwrap(),
        output.resolve_type("int64").unwrap()
    );

    let modules = check_units(vec![unit(0, "app", vec![alias("int", ty("int32"))])]);
    assert!(modules.diagnostics().is_empty(), "{:?}", messages(&modules));
    assert_eq!(
        modules.resolve_type("app.int").unwrap(),
        modules.resolve_type("int32").unwrap()
    );
}

#[test]
fn alias_of_a_generic_instantiation() {
    let output = check(vec![
        alias("Names", generic_ty("List", vec![ty("str")])),
        Declaration::Function(function(
            "main",
            vec![param("names", ty("Names"))],
            vec![ty("int")],
            vec![stmt(method(var("names"), "len", Vec::new()))],
        )),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
    let names = output.resolve_type("Names").unwrap();
    assert_eq!(output.describe(names), "List[str]");
}

#[test]
fn aliases_are_transparent_in_assignments() {
    let output = check(vec![
        alias("Count", ty("int32")),
        Declaration::Function(function(
            "main",
            vec![param("n", ty("Count"))],
            Vec::new(),
            vec![let_("m", Some(ty("int32")), Some(var("n")))],
        )),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}
