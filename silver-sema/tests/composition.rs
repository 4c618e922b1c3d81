mod common;

use common::*;
use silver_sema::{Declaration, DiagnosticCode, Resolution};

fn composable_a() -> Declaration {
    struct_decl("A", &[], Vec::new(), vec![abstract_method("f", Vec::new(), Vec::new())])
}

#[test]
fn overriding_every_abstract_method_makes_a_struct_concrete() {
    let output = check(vec![
        composable_a(),
        struct_decl(
            "B",
            &["A"],
            Vec::new(),
            vec![function("f", Vec::new(), Vec::new(), Vec::new())],
        ),
    ]);
    assert!(
        output.diagnostics().is_empty(),
        "unexpected diagnostics: {:?}",
        messages(&output)
    );
    let b = output.get_struct("B").unwrap();
    assert!(b.concrete);
    assert!(b.method("f").unwrap().has_body);
    assert!(matches!(output.resolution("B"), Some(Resolution::Resolved(_))));
    assert!(!output.get_struct("A").unwrap().concrete);
}

#[test]
fn missing_override_names_the_abstract_method() {
    let output = check(vec![composable_a(), struct_decl("C", &["A"], Vec::new(), Vec::new())]);
    assert_eq!(output.diagnostics().count_code(DiagnosticCode::MissingOverride), 1);
    let messages = messages(&output);
    assert!(
        messages
            .iter()
            .any(|msg| msg.contains("'C'") && msg.contains("f(")),
        "expected MissingOverride naming f, found {:?}",
        messages
    );
    match output.resolution("C") {
        Some(Resolution::MissingOverride { unmet, .. }) => {
            assert_eq!(unmet, &vec!["f()".to_string()])
        }
        other => panic!("expected MissingOverride, found {other:?}"),
    }
}

#[test]
fn redeclaring_an_abstract_method_defers_the_obligation() {
    let output = check(vec![
        composable_a(),
        struct_decl("Mid", &["A"], Vec::new(), vec![abstract_method("f", Vec::new(), Vec::new())]),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
    assert!(!output.get_struct("Mid").unwrap().concrete);
}

#[test]
fn mutual_composition_reports_one_cycle() {
    let output = check(vec![
        struct_decl("X", &["Y"], Vec::new(), Vec::new()),
        struct_decl("Y", &["X"], Vec::new(), Vec::new()),
    ]);
    assert_eq!(output.diagnostics().count_code(DiagnosticCode::CompositionCycle), 1);
    assert!(matches!(output.resolution("X"), Some(Resolution::Cycle { .. })));
    assert!(matches!(output.resolution("Y"), Some(Resolution::Cycle { .. })));
    assert!(!output.is_eligible());
}

#[test]
fn cycle_does_not_block_unrelated_structs() {
    let output = check(vec![
        struct_decl("X", &["X"], Vec::new(), Vec::new()),
        person(),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::CompositionCycle]);
    assert!(output.get_struct("Person").unwrap().concrete);
}

#[test]
fn overriding_with_a_different_signature_is_a_mismatch() {
    let output = check(vec![
        composable_a(),
        struct_decl(
            "B",
            &["A"],
            Vec::new(),
            vec![function("f", vec![param("x", ty("int32"))], Vec::new(), Vec::new())],
        ),
    ]);
    assert_eq!(output.diagnostics().count_code(DiagnosticCode::TypeMismatch), 1);
}

#[test]
fn diamond_contributes_shared_fields_once() {
    let output = check(vec![
        struct_decl("Base", &[], vec![field_decl("x", ty("int32"))], Vec::new()),
        struct_decl("Left", &["Base"], Vec::new(), Vec::new()),
        struct_decl("Right", &["Base"], Vec::new(), Vec::new()),
        struct_decl("Both", &["Left", "Right"], vec![field_decl("y", ty("str"))], Vec::new()),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
    let both = output.get_struct("Both").unwrap();
    let names: Vec<&str> = both.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(both.ancestors.len(), 3);
}

#[test]
fn conflicting_fields_from_two_parents_are_duplicates() {
    let output = check(vec![
        struct_decl("P", &[], vec![field_decl("x", ty("int32"))], Vec::new()),
        struct_decl("Q", &[], vec![field_decl("x", ty("str"))], Vec::new()),
        struct_decl("R", &["P", "Q"], Vec::new(), Vec::new()),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::DuplicateField]);
}

#[test]
fn two_inherited_bodies_are_ambiguous_until_overridden() {
    let g = || function("g", Vec::new(), Vec::new(), Vec::new());
    let ambiguous = check(vec![
        struct_decl("P", &[], Vec::new(), vec![g()]),
        struct_decl("Q", &[], Vec::new(), vec![g()]),
        struct_decl("R", &["P", "Q"], Vec::new(), Vec::new()),
    ]);
    assert_eq!(codes(&ambiguous), vec![DiagnosticCode::AmbiguousMethod]);

    let resolved = check(vec![
        struct_decl("P", &[], Vec::new(), vec![g()]),
        struct_decl("Q", &[], Vec::new(), vec![g()]),
        struct_decl("R", &["P", "Q"], Vec::new(), vec![g()]),
    ]);
    assert!(resolved.diagnostics().is_empty(), "{:?}", messages(&resolved));
}

#[test]
fn composed_struct_upcasts_to_its_parent() {
    let output = check(vec![
        composable_a(),
        struct_decl(
            "B",
            &["A"],
            Vec::new(),
            vec![function("f", Vec::new(), Vec::new(), Vec::new())],
        ),
        Declaration::Function(function(
            "run",
            vec![param("a", ty("A"))],
            Vec::new(),
            vec![stmt(method(var("a"), "f", Vec::new()))],
        )),
        Declaration::Function(function(
            "main",
            Vec::new(),
            Vec::new(),
            vec![
                let_("b", None, Some(call(var("B"), Vec::new()))),
                stmt(call(var("run"), vec![var("b")])),
            ],
        )),
    ]);
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

#[test]
fn parent_does_not_downcast_to_child() {
    let output = check(vec![
        struct_decl("Base", &[], Vec::new(), Vec::new()),
        struct_decl("Child", &["Base"], Vec::new(), Vec::new()),
        Declaration::Function(function(
            "main",
            Vec::new(),
            Vec::new(),
            vec![
                let_("base", None, Some(call(var("Base"), Vec::new()))),
                let_("child", Some(ty("Child")), Some(var("base"))),
            ],
        )),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::TypeMismatch]);
}

#[test]
fn constructing_a_composable_with_abstract_methods_is_rejected() {
    let output = check(vec![
        composable_a(),
        Declaration::Function(function(
            "main",
            Vec::new(),
            Vec::new(),
            vec![stmt(call(var("A"), Vec::new()))],
        )),
    ]);
    assert_eq!(codes(&output), vec![DiagnosticCode::NotConstructible]);
    assert!(messages(&output)[0].contains("abstract method(s): f"));
}
