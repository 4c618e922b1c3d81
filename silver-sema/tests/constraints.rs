mod common;

use common::*;
use proptest::prelude::*;
use silver_sema::{
    BinaryOperator, Bound, ConstraintSolver, Declaration, DiagnosticCode, FunctionDecl,
    MethodTable, PrimitiveKind, TypeGraph, TypeId,
};

struct NoMethods;

impl MethodTable for NoMethods {
    fn method_type(&self, _receiver: TypeId, _name: &str) -> Option<TypeId> {
        None
    }
}

fn any_primitive() -> impl Strategy<Value = PrimitiveKind> {
    proptest::sample::select(PrimitiveKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn signed_admits_exactly_the_signed_integers(kind in any_primitive()) {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let ty = graph.primitive(kind);
        let expected = matches!(
            kind,
            PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64
        );
        prop_assert_eq!(solver.satisfies(&graph, &NoMethods, ty, "Signed"), expected);
    }

    #[test]
    fn ordered_admits_every_numeric_kind(kind in any_primitive()) {
        let graph = TypeGraph::new();
        let solver = ConstraintSolver::new();
        let ty = graph.primitive(kind);
        prop_assert_eq!(
            solver.satisfies(&graph, &NoMethods, ty, "Ordered"),
            kind.is_integer() || kind.is_float()
        );
    }
}

/// `def smaller[T: Ordered](a: T, b: T) -> T`
fn smaller() -> Declaration {
    Declaration::Function(FunctionDecl {
        type_parameters: vec![type_param("T", Some("Ordered"))],
        ..function(
            "smaller",
            vec![param("a", ty("T")), param("b", ty("T"))],
            vec![ty("T")],
            vec![stmt(if_else(
                binary(BinaryOperator::Less, var("a"), var("b")),
                vec![stmt(var("a"))],
                Some(vec![stmt(var("b"))]),
            ))],
        )
    })
}

fn main_returning(result: &str, value: silver_sema::Expression) -> Declaration {
    Declaration::Function(function("main", Vec::new(), vec![ty(result)], vec![stmt(value)]))
}

#[test]
fn generic_call_infers_and_substitutes_the_result() {
    let output = check(vec![
        smaller(),
        main_returning("int64", call(var("smaller"), vec![int(1), int(2)])),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
    assert!(output.program().function("smaller").unwrap().generic);
}

#[test]
fn generic_call_rejects_arguments_outside_the_bound() {
    let output = check(vec![
        smaller(),
        main_returning("str", call(var("smaller"), vec![string("a"), string("b")])),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::ConstraintViolation]);
    let message = &messages(&output)[0];
    assert!(message.contains("str does not satisfy bound 'Ordered'"), "{message}");
}

#[test]
fn explicit_type_arguments_bind_the_parameter() {
    let output = check(vec![
        smaller(),
        main_returning(
            "int8",
            call_with_types(var("smaller"), vec![ty("int8")], vec![int(1), int(2)]),
        ),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

#[test]
fn generic_arguments_must_agree() {
    let output = check(vec![
        smaller(),
        main_returning("int64", call(var("smaller"), vec![int(1), string("b")])),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::TypeMismatch]);
    assert!(messages(&output)[0].contains("argument 2 of 'smaller'"));
}

#[test]
fn generic_parameter_satisfies_a_wider_bound() {
    let widen = Declaration::Function(FunctionDecl {
        type_parameters: vec![type_param("T", Some("Signed"))],
        ..function(
            "widen",
            vec![param("a", ty("T")), param("b", ty("T"))],
            vec![ty("T")],
            vec![stmt(call(var("smaller"), vec![var("a"), var("b")]))],
        )
    });
    let output = check(vec![smaller(), widen]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

#[test]
fn generic_parameter_with_a_narrower_bound_is_rejected() {
    let loose = Declaration::Function(FunctionDecl {
        type_parameters: vec![type_param("T", None)],
        ..function(
            "loose",
            vec![param("a", ty("T"))],
            vec![ty("T")],
            vec![stmt(call(var("smaller"), vec![var("a"), var("a")]))],
        )
    });
    let output = check(vec![smaller(), loose]);
    assert_eq!(codes(&output), vec![DiagnosticCode::ConstraintViolation]);
}

#[test]
fn bounded_struct_parameters_are_checked_where_applied() {
    let boxed = Declaration::Struct(silver_sema::StructDecl {
        name: "Counter".to_string(),
        type_parameters: vec![type_param("T", Some("Integer"))],
        composes: Vec::new(),
        fields: vec![field_decl("value", ty("T"))],
        methods: Vec::new(),
        span: Default::default(),
    });
    let output = check(vec![
        boxed,
        Declaration::Function(function(
            "main",
            vec![
                param("good", generic_ty("Counter", vec![ty("int32")])),
                param("bad", generic_ty("Counter", vec![ty("float64")])),
            ],
            Vec::new(),
            Vec::new(),
        )),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::ConstraintViolation]);
    assert!(messages(&output)[0].contains("float64"));
}

#[test]
fn collection_bound_is_met_by_lists() {
    let count = Declaration::Function(FunctionDecl {
        type_parameters: vec![
            type_param("I", None),
            silver_sema::TypeParameter {
                name: "C".to_string(),
                bound: Some(silver_sema::BoundExpression {
                    name: "Collection".to_string(),
                    arguments: vec![ty("I")],
                    span: Default::default(),
                }),
                span: Default::default(),
            },
        ],
        ..function(
            "head",
            vec![param("items", ty("C"))],
            vec![ty("I")],
            vec![stmt(method(var("items"), "get", vec![int(0)]))],
        )
    });
    let output = check(vec![
        count,
        Declaration::Function(function(
            "main",
            vec![param("names", generic_ty("List", vec![ty("str")]))],
            vec![ty("str")],
            vec![stmt(call(var("head"), vec![var("names")]))],
        )),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

#[test]
fn registered_bounds_are_checked_like_builtin_ones() {
    let graph = TypeGraph::new();
    let mut solver = ConstraintSolver::new();
    let text = graph.primitive(PrimitiveKind::Str);
    let count = graph.primitive(PrimitiveKind::Int64);
    assert!(!solver.satisfies(&graph, &NoMethods, text, "Textual"));

    solver.register(
        "Textual",
        Bound::Kinds {
            kinds: vec![PrimitiveKind::Str],
            admits_enums: false,
        },
    );
    assert_eq!(solver.parameter_count("Textual"), Some(0));
    assert!(solver.satisfies(&graph, &NoMethods, text, "Textual"));
    assert!(!solver.satisfies(&graph, &NoMethods, count, "Textual"));
    assert!(!solver.satisfies(&graph, &NoMethods, graph.list(text), "Textual"));
}
