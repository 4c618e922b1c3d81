#![allow(dead_code)]

use silver_sema::{
    AssignmentExpression, BinaryExpression, BinaryOperator, Block, BoundExpression,
    CallExpression, CheckOptions, CheckOutput, CompilationUnit, Declaration, DiagnosticCode,
    EnumDecl, Expression, ExpressionKind, FieldDecl, FieldExpression, FunctionDecl, IfExpression,
    LetStatement, Literal, ModulePath, Parameter, ReturnStatement, Session, SourceId, SourceSpan,
    Statement, StructDecl, TypeAliasDecl, TypeExpression, TypeExpressionKind, TypeParameter,
    VariantDecl,
};

pub fn ty(name: &str) -> TypeExpression {
    TypeExpression::named(name)
}

pub fn generic_ty(name: &str, arguments: Vec<TypeExpression>) -> TypeExpression {
    TypeExpression::generic(name, arguments)
}

pub fn repeated_tuple_ty(element: TypeExpression, arity: usize) -> TypeExpression {
    TypeExpression::new(
        TypeExpressionKind::RepeatedTuple {
            element: Box::new(element),
            arity,
        },
        SourceSpan::default(),
    )
}

pub fn type_param(name: &str, bound: Option<&str>) -> TypeParameter {
    TypeParameter {
        name: name.to_string(),
        bound: bound.map(|bound| BoundExpression {
            name: bound.to_string(),
            arguments: Vec::new(),
            span: SourceSpan::default(),
        }),
        span: SourceSpan::default(),
    }
}

fn expr(kind: ExpressionKind) -> Expression {
    Expression::new(kind, SourceSpan::default())
}

pub fn at(mut expression: Expression, line: usize) -> Expression {
    expression.span = SourceSpan::single_point(line, 1);
    expression
}

pub fn int(value: i128) -> Expression {
    expr(ExpressionKind::Literal(Literal::Integer(value)))
}

pub fn string(value: &str) -> Expression {
    expr(ExpressionKind::Literal(Literal::String(value.to_string())))
}

pub fn boolean(value: bool) -> Expression {
    expr(ExpressionKind::Literal(Literal::Boolean(value)))
}

pub fn none() -> Expression {
    expr(ExpressionKind::Literal(Literal::None))
}

pub fn var(name: &str) -> Expression {
    expr(ExpressionKind::Variable(name.to_string()))
}

pub fn tuple(items: Vec<Expression>) -> Expression {
    expr(ExpressionKind::Tuple(items))
}

pub fn list(items: Vec<Expression>) -> Expression {
    expr(ExpressionKind::List(items))
}

pub fn field(object: Expression, name: &str) -> Expression {
    expr(ExpressionKind::Field(FieldExpression {
        object: Box::new(object),
        field: name.to_string(),
    }))
}

pub fn call(callee: Expression, arguments: Vec<Expression>) -> Expression {
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(callee),
        type_arguments: Vec::new(),
        arguments,
    }))
}

pub fn call_with_types(
    callee: Expression,
    type_arguments: Vec<TypeExpression>,
    arguments: Vec<Expression>,
) -> Expression {
    expr(ExpressionKind::Call(CallExpression {
        callee: Box::new(callee),
        type_arguments,
        arguments,
    }))
}

pub fn method(receiver: Expression, name: &str, arguments: Vec<Expression>) -> Expression {
    call(field(receiver, name), arguments)
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    expr(ExpressionKind::Assignment(AssignmentExpression {
        target: Box::new(target),
        value: Box::new(value),
    }))
}

pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    expr(ExpressionKind::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }))
}

pub fn if_else(
    condition: Expression,
    then_branch: Vec<Statement>,
    else_branch: Option<Vec<Statement>>,
) -> Expression {
    expr(ExpressionKind::If(IfExpression {
        condition: Box::new(condition),
        then_branch: Block::new(then_branch),
        else_branch: else_branch.map(Block::new),
    }))
}

pub fn let_(
    name: &str,
    annotation: Option<TypeExpression>,
    initializer: Option<Expression>,
) -> Statement {
    Statement::Let(LetStatement {
        name: name.to_string(),
        type_annotation: annotation,
        initializer,
        span: SourceSpan::default(),
    })
}

pub fn stmt(expression: Expression) -> Statement {
    Statement::Expression(expression)
}

pub fn ret(expression: Option<Expression>) -> Statement {
    Statement::Return(ReturnStatement {
        expression,
        span: SourceSpan::default(),
    })
}

pub fn param(name: &str, annotation: TypeExpression) -> Parameter {
    Parameter {
        name: name.to_string(),
        type_annotation: annotation,
        span: SourceSpan::default(),
    }
}

pub fn function(
    name: &str,
    parameters: Vec<Parameter>,
    returns: Vec<TypeExpression>,
    body: Vec<Statement>,
) -> FunctionDecl {
    FunctionDecl {
        name: name.to_string(),
        type_parameters: Vec::new(),
        parameters,
        returns,
        body: Some(Block::new(body)),
        span: SourceSpan::default(),
    }
}

pub fn abstract_method(
    name: &str,
    parameters: Vec<Parameter>,
    returns: Vec<TypeExpression>,
) -> FunctionDecl {
    FunctionDecl {
        body: None,
        ..function(name, parameters, returns, Vec::new())
    }
}

pub fn field_decl(name: &str, annotation: TypeExpression) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        type_annotation: annotation,
        default: None,
        span: SourceSpan::default(),
    }
}

pub fn struct_decl(
    name: &str,
    composes: &[&str],
    fields: Vec<FieldDecl>,
    methods: Vec<FunctionDecl>,
) -> Declaration {
    Declaration::Struct(StructDecl {
        name: name.to_string(),
        type_parameters: Vec::new(),
        composes: composes.iter().map(|parent| ty(parent)).collect(),
        fields,
        methods,
        span: SourceSpan::default(),
    })
}

pub fn enum_decl(name: &str, backing: &str, variants: Vec<(&str, Option<Literal>)>) -> Declaration {
    Declaration::Enum(EnumDecl {
        name: name.to_string(),
        backing: ty(backing),
        variants: variants
            .into_iter()
            .map(|(name, value)| VariantDecl {
                name: name.to_string(),
                value,
                span: SourceSpan::default(),
            })
            .collect(),
        span: SourceSpan::default(),
    })
}

pub fn alias(name: &str, target: TypeExpression) -> Declaration {
    Declaration::TypeAlias(TypeAliasDecl {
        name: name.to_string(),
        target,
        span: SourceSpan::default(),
    })
}

/// `struct Person { name: str, age: int32, def work() }`
pub fn person() -> Declaration {
    struct_decl(
        "Person",
        &[],
        vec![field_decl("name", ty("str")), field_decl("age", ty("int32"))],
        vec![function("work", Vec::new(), Vec::new(), Vec::new())],
    )
}

pub fn unit(id: u32, module: &str, declarations: Vec<Declaration>) -> CompilationUnit {
    CompilationUnit::new(SourceId(id), ModulePath::new(module), declarations)
}

pub fn check(declarations: Vec<Declaration>) -> CheckOutput {
    check_units(vec![unit(0, "", declarations)])
}

pub fn check_units(units: Vec<CompilationUnit>) -> CheckOutput {
    let options = CheckOptions {
        parallel: false,
        ..CheckOptions::default()
    };
    Session::new(options).check(&units)
}

pub fn codes(output: &CheckOutput) -> Vec<DiagnosticCode> {
    output
        .diagnostics()
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.code)
        .collect()
}

pub fn messages(output: &CheckOutput) -> Vec<String> {
    output
        .diagnostics()
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.message.clone())
        .collect()
}
