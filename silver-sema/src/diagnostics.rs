use std::fmt;

use serde::Serialize;

use crate::ast::SourceSpan;
use crate::source::SourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    UnresolvedType,
    AliasCycle,
    ConstraintViolation,
    MissingOverride,
    CompositionCycle,
    DuplicateVariant,
    TupleArityMismatch,
    NoneUseError,
    NoneUseWarning,
    DuplicateField,
    DuplicateDeclaration,
    TypeMismatch,
    UnresolvedName,
    UnknownMember,
    ArgumentCountMismatch,
    NotConstructible,
    EnumValueMismatch,
    AmbiguousMethod,
    ImmutableTupleSlot,
    UseBeforeAssignment,
    DiagnosticLimit,
    Internal,
}

impl DiagnosticCode {
    pub fn default_level(self) -> DiagnosticLevel {
        match self {
            DiagnosticCode::NoneUseWarning | DiagnosticCode::DiagnosticLimit => {
                DiagnosticLevel::Warning
            }
            _ => DiagnosticLevel::Error,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticCode::UnresolvedType => "UnresolvedType",
            DiagnosticCode::AliasCycle => "AliasCycle",
            DiagnosticCode::ConstraintViolation => "ConstraintViolation",
            DiagnosticCode::MissingOverride => "MissingOverride",
            DiagnosticCode::CompositionCycle => "CompositionCycle",
            DiagnosticCode::DuplicateVariant => "DuplicateVariant",
            DiagnosticCode::TupleArityMismatch => "TupleArityMismatch",
            DiagnosticCode::NoneUseError => "NoneUseError",
            DiagnosticCode::NoneUseWarning => "NoneUseWarning",
            DiagnosticCode::DuplicateField => "DuplicateField",
            DiagnosticCode::DuplicateDeclaration => "DuplicateDeclaration",
            DiagnosticCode::TypeMismatch => "TypeMismatch",
            DiagnosticCode::UnresolvedName => "UnresolvedName",
            DiagnosticCode::UnknownMember => "UnknownMember",
            DiagnosticCode::ArgumentCountMismatch => "ArgumentCountMismatch",
            DiagnosticCode::NotConstructible => "NotConstructible",
            DiagnosticCode::EnumValueMismatch => "EnumValueMismatch",
            DiagnosticCode::AmbiguousMethod => "AmbiguousMethod",
            DiagnosticCode::ImmutableTupleSlot => "ImmutableTupleSlot",
            DiagnosticCode::UseBeforeAssignment => "UseBeforeAssignment",
            DiagnosticCode::DiagnosticLimit => "DiagnosticLimit",
            DiagnosticCode::Internal => "Internal",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub span: Option<SourceSpan>,
    pub source: Option<SourceId>,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(code: DiagnosticCode, message: S) -> Self {
        Self {
            message: message.into(),
            level: code.default_level(),
            code,
            span: None,
            source: None,
        }
    }

    pub fn with_span(mut self, span: Option<SourceSpan>) -> Self {
        self.span = span;
        self
    }

    pub fn in_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        write!(f, "{level}[{}]: {}", self.code, self.message)?;
        if let Some(span) = self.span {
            write!(f, " at {}:{}", span.line, span.column)?;
        }
        Ok(())
    }
}

/// Ordered diagnostics sink with an optional cap against error cascades.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    limit: Option<usize>,
    suppressed: usize,
    suppressed_errors: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            limit: None,
            suppressed: 0,
            suppressed_errors: 0,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    pub fn push<S: Into<String>>(
        &mut self,
        code: DiagnosticCode,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.report(Diagnostic::new(code, message).with_span(span));
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                if self.suppressed == 0 {
                    self.entries.push(Diagnostic::new(
                        DiagnosticCode::DiagnosticLimit,
                        format!("too many diagnostics; stopped reporting after {limit}"),
                    ));
                }
                self.suppressed += 1;
                if diagnostic.is_error() {
                    self.suppressed_errors += 1;
                }
                return;
            }
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in other {
            self.report(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.suppressed_errors > 0 || self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.suppressed_errors + self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }
}
