mod common;

use common::*;
use silver_sema::{CheckOutput, Declaration, QueryError};

fn shapes_and_app() -> CheckOutput {
    let shapes = unit(
        0,
        "shapes",
        vec![
            struct_decl(
                "Circle",
                &[],
                vec![field_decl("radius", ty("float64"))],
                Vec::new(),
            ),
            alias("Radii", generic_ty("List", vec![ty("float64")])),
            Declaration::Function(function(
                "area",
                vec![param("circle", ty("Circle"))],
                vec![ty("float64")],
                vec![stmt(field(var("circle"), "radius"))],
            )),
        ],
    );
    let app = unit(
        1,
        "app",
        vec![
            struct_decl(
                "Badge",
                &["shapes.Circle"],
                vec![field_decl("label", ty("str"))],
                Vec::new(),
            ),
            Declaration::Function(function(
                "main",
                vec![param("badge", ty("Badge"))],
                vec![ty("float64")],
                vec![stmt(call(var("shapes.area"), vec![var("badge")]))],
            )),
        ],
    );
    check_units(vec![shapes, app])
}

#[test]
fn declarations_are_reachable_by_qualified_name() {
    let output = shapes_and_app();
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));

    let circle = output.resolve_type("shapes.Circle").unwrap();
    assert_eq!(output.describe(circle), "shapes.Circle");

    let radii = output.resolve_type("shapes.Radii").unwrap();
    assert_eq!(output.describe(radii), "List[float64]");
}

#[test]
fn composed_layout_spans_modules() {
    let output = shapes_and_app();
    let badge = output.get_struct("app.Badge").unwrap();
    let names: Vec<&str> = badge.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["radius", "label"]);
    assert!(badge.concrete);
}

#[test]
fn unknown_names_are_not_found() {
    let output = shapes_and_app();
    assert_eq!(
        output.resolve_type("shapes.Square"),
        Err(QueryError::NotFound {
            name: "shapes.Square".to_string()
        })
    );
    // Unqualified lookups do not search modules.
    assert!(output.get_struct("Circle").is_err());
}

#[test]
fn functions_are_not_types() {
    let output = shapes_and_app();
    let error = output.resolve_type("shapes.area").unwrap_err();
    assert!(matches!(error, QueryError::NotAType { .. }));
    assert_eq!(error.to_string(), "'shapes.area' names a function, not a type");
}

#[test]
fn primitive_names_resolve_directly() {
    let output = check(Vec::new());
    let int64 = output.resolve_type("int64").unwrap();
    assert_eq!(output.resolve_type("int").unwrap(), int64);
    assert_eq!(output.describe(int64), "int64");
}
