use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }
}

/// A top-level entry of the declaration table handed over by import resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Declaration {
    Struct(StructDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),
    TypeAlias(TypeAliasDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Struct(decl) => &decl.name,
            Declaration::Enum(decl) => &decl.name,
            Declaration::Function(decl) => &decl.name,
            Declaration::TypeAlias(decl) => &decl.name,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            Declaration::Struct(decl) => decl.span,
            Declaration::Enum(decl) => decl.span,
            Declaration::Function(decl) => decl.span,
            Declaration::TypeAlias(decl) => decl.span,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExpression {
    pub kind: TypeExpressionKind,
    #[serde(default)]
    pub span: SourceSpan,
}

impl TypeExpression {
    pub fn new(kind: TypeExpressionKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::generic(name, Vec::new())
    }

    pub fn generic(name: impl Into<String>, arguments: Vec<TypeExpression>) -> Self {
        Self::new(
            TypeExpressionKind::Named {
                name: name.into(),
                arguments,
            },
            SourceSpan::default(),
        )
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExpressionKind {
    /// `int32`, `Person`, `List[int]`, `Dict[str, int]`, `Box[T]`.
    Named {
        name: String,
        #[serde(default)]
        arguments: Vec<TypeExpression>,
    },
    /// `(int, str)`
    Tuple(Vec<TypeExpression>),
    /// `(T: 5)`
    RepeatedTuple {
        element: Box<TypeExpression>,
        arity: usize,
    },
    Function {
        parameters: Vec<TypeExpression>,
        #[serde(default)]
        returns: Vec<TypeExpression>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: String,
    #[serde(default)]
    pub bound: Option<BoundExpression>,
    #[serde(default)]
    pub span: SourceSpan,
}

/// `Signed`, `Ordered`, `Collection[I]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundExpression {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<TypeExpression>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameter>,
    #[serde(default)]
    pub composes: Vec<TypeExpression>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<FunctionDecl>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_annotation: TypeExpression,
    #[serde(default)]
    pub default: Option<Expression>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub backing: TypeExpression,
    pub variants: Vec<VariantDecl>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    #[serde(default)]
    pub value: Option<Literal>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameter>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub returns: Vec<TypeExpression>,
    /// `None` marks an abstract method of a composable struct.
    #[serde(default)]
    pub body: Option<Block>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: TypeExpression,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: String,
    pub target: TypeExpression,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// The expression whose value the block produces when used as an `if` branch.
    pub fn tail(&self) -> Option<&Expression> {
        match self.statements.last() {
            Some(Statement::Expression(expression)) => Some(expression),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Let(LetStatement),
    Expression(Expression),
    Return(ReturnStatement),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetStatement {
    pub name: String,
    #[serde(default)]
    pub type_annotation: Option<TypeExpression>,
    #[serde(default)]
    pub initializer: Option<Expression>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStatement {
    #[serde(default)]
    pub expression: Option<Expression>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Wide enough for every value of every integer kind, `uint64` included.
    Integer(i128),
    Float(f64),
    String(String),
    Boolean(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Equal | BinaryOperator::NotEqual)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    #[serde(default)]
    pub span: SourceSpan,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    pub fn is_none_literal(&self) -> bool {
        matches!(self.kind, ExpressionKind::Literal(Literal::None))
    }

    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Variable(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpressionKind {
    Literal(Literal),
    Tuple(Vec<Expression>),
    List(Vec<Expression>),
    Dict(Vec<DictEntry>),
    Variable(String),
    Assignment(AssignmentExpression),
    Call(CallExpression),
    Field(FieldExpression),
    Binary(BinaryExpression),
    If(IfExpression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictEntry {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentExpression {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    #[serde(default)]
    pub type_arguments: Vec<TypeExpression>,
    #[serde(default)]
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldExpression {
    pub object: Box<Expression>,
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfExpression {
    pub condition: Box<Expression>,
    pub then_branch: Block,
    #[serde(default)]
    pub else_branch: Option<Block>,
}
