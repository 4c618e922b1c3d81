mod common;

use common::*;
use silver_sema::cfg::{self, BlockId, ControlFlowGraph, FlowOp, UseKind};
use silver_sema::{
    flow, BinaryOperator, Declaration, DiagnosticCode, DiagnosticLevel, NoneState, Statement,
};

fn main_with(parameters: Vec<silver_sema::Parameter>, body: Vec<Statement>) -> Vec<Declaration> {
    vec![
        person(),
        Declaration::Function(function("main", parameters, Vec::new(), body)),
    ]
}

fn new_person() -> silver_sema::Expression {
    call(var("Person"), vec![string("a"), int(1)])
}

#[test]
fn explicit_none_then_method_call_is_an_error() {
    let output = check(main_with(
        Vec::new(),
        vec![
            let_("person", Some(ty("Person")), Some(none())),
            stmt(method(var("person"), "work", Vec::new())),
        ],
    ));
    assert_eq!(codes(&output), vec![DiagnosticCode::NoneUseError]);
    assert!(output.diagnostics().entries()[0].is_error());
    assert!(messages(&output)[0].contains("'person' is None"));
    assert!(!output.is_eligible());
}

#[test]
fn constructed_value_can_be_used() {
    let output = check(main_with(
        Vec::new(),
        vec![
            let_("person", Some(ty("Person")), Some(new_person())),
            stmt(method(var("person"), "work", Vec::new())),
        ],
    ));
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
    assert!(output.is_eligible());
}

#[test]
fn reassignment_after_none_clears_the_state() {
    let output = check(main_with(
        Vec::new(),
        vec![
            let_("person", Some(ty("Person")), Some(none())),
            stmt(assign(var("person"), new_person())),
            stmt(method(var("person"), "work", Vec::new())),
        ],
    ));
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

#[test]
fn one_none_branch_makes_the_join_maybe_none() {
    let output = check(main_with(
        vec![param("flag", ty("bool"))],
        vec![
            let_(
                "person",
                Some(ty("Person")),
                Some(if_else(
                    var("flag"),
                    vec![stmt(new_person())],
                    Some(vec![stmt(none())]),
                )),
            ),
            stmt(field(var("person"), "name")),
        ],
    ));
    assert_eq!(codes(&output), vec![DiagnosticCode::NoneUseWarning]);
    assert_eq!(
        output.diagnostics().entries()[0].level,
        DiagnosticLevel::Warning
    );
    assert!(output.is_eligible());
    assert!(output.into_program().is_ok());
}

#[test]
fn warnings_block_when_promoted() {
    let declarations = main_with(
        vec![param("flag", ty("bool"))],
        vec![
            let_(
                "person",
                Some(ty("Person")),
                Some(if_else(
                    var("flag"),
                    vec![stmt(new_person())],
                    Some(vec![stmt(none())]),
                )),
            ),
            stmt(method(var("person"), "work", Vec::new())),
        ],
    );
    let options = silver_sema::CheckOptions {
        parallel: false,
        warnings_as_errors: true,
        ..Default::default()
    };
    let output = silver_sema::Session::new(options).check(&[unit(0, "", declarations)]);
    assert!(!output.is_eligible());
    assert!(output.into_program().is_err());
}

#[test]
fn none_guard_with_early_return_narrows_the_rest_of_the_body() {
    let output = check(main_with(
        Vec::new(),
        vec![
            let_("person", Some(ty("Person")), Some(none())),
            stmt(if_else(
                binary(BinaryOperator::Equal, var("person"), none()),
                vec![ret(None)],
                None,
            )),
            stmt(method(var("person"), "work", Vec::new())),
        ],
    ));
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

#[test]
fn none_literal_passed_as_argument_is_an_error() {
    let mut declarations = main_with(
        Vec::new(),
        vec![stmt(call(var("greet"), vec![none()]))],
    );
    declarations.push(Declaration::Function(function(
        "greet",
        vec![param("who", ty("Person"))],
        Vec::new(),
        Vec::new(),
    )));
    let output = check(declarations);
    assert_eq!(codes(&output), vec![DiagnosticCode::NoneUseError]);
    assert!(messages(&output)[0].contains("argument 1 of 'greet'"));
}

#[test]
fn declared_but_unassigned_binding_is_used_before_assignment() {
    let output = check(main_with(
        Vec::new(),
        vec![
            let_("person", Some(ty("Person")), None),
            stmt(method(var("person"), "work", Vec::new())),
        ],
    ));
    assert_eq!(codes(&output), vec![DiagnosticCode::UseBeforeAssignment]);
}

#[test]
fn reading_none_into_another_binding_is_allowed() {
    let output = check(main_with(
        Vec::new(),
        vec![
            let_("first", Some(ty("Person")), Some(none())),
            let_("second", Some(ty("Person")), Some(var("first"))),
        ],
    ));
    assert!(output.diagnostics().is_empty(), "{:?}", messages(&output));
}

fn guarded_body() -> silver_sema::Block {
    silver_sema::Block::new(vec![
        let_(
            "person",
            None,
            Some(if_else(
                boolean(true),
                vec![stmt(new_person())],
                Some(vec![stmt(none())]),
            )),
        ),
        stmt(if_else(
            binary(BinaryOperator::Equal, var("person"), none()),
            vec![ret(None)],
            None,
        )),
        stmt(field(var("person"), "name")),
    ])
}

fn block_using(graph: &ControlFlowGraph, kind: UseKind) -> BlockId {
    let index = graph
        .blocks
        .iter()
        .position(|block| {
            block
                .ops
                .iter()
                .any(|op| matches!(op, FlowOp::Use { kind: used, .. } if *used == kind))
        })
        .unwrap();
    BlockId(index)
}

#[test]
fn block_states_before_and_after_a_none_guard() {
    let graph = cfg::build(&[], &guarded_body());
    let analysis = flow::analyze(&graph);
    let person = graph.binding_named("person").unwrap();

    let guard = block_using(&graph, UseKind::Read);
    let before = analysis.state_at(&graph, guard, 0).unwrap();
    assert_eq!(before[person.0], NoneState::MaybeNone);

    let access = block_using(&graph, UseKind::FieldAccess);
    let after = analysis.state_at(&graph, access, 0).unwrap();
    assert_eq!(after[person.0], NoneState::DefinitelyNotNone);
    assert!(analysis.violations.is_empty());
}

#[test]
fn code_after_a_return_is_unreachable() {
    let graph = cfg::build(&[], &guarded_body());
    let analysis = flow::analyze(&graph);

    let orphan = (0..graph.blocks.len())
        .map(BlockId)
        .find(|&id| id != ControlFlowGraph::ENTRY && graph.predecessors(id).is_empty())
        .unwrap();
    assert!(!analysis.is_reachable(orphan));
    assert_eq!(analysis.state_at(&graph, orphan, 0), None);
    assert!(analysis.is_reachable(ControlFlowGraph::ENTRY));
    assert!(analysis.is_reachable(ControlFlowGraph::EXIT));
}
