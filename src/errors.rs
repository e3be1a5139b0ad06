//! Sedra Error Handling - Unified Encapsulated API
//!
//! Every failure in the pipeline is a `SedraError`: a closed `ErrorKind` plus
//! optional source attachment for miette rendering. Errors are raised at the
//! point of detection and propagate to the compile entry point; nothing is
//! caught and downgraded along the way.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use thiserror::Error;

use crate::syntax::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source context for error reporting: the compilation unit's name and text.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting.
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

// ============================================================================
// ERROR KIND - the spec taxonomy as a closed enum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    /// Malformed token stream: unbalanced delimiters, invalid tokens.
    #[error("read error: {message}")]
    Read { message: String },

    /// Structurally invalid special form (malformed declaration, bad shape).
    #[error("invalid {construct}: {message}")]
    Syntax { construct: String, message: String },

    /// No pattern-rule matched, malformed define-syntax, or a procedural
    /// macro rejected its input.
    #[error("macro '{macro_name}': {message}")]
    Macro { macro_name: String, message: String },

    /// Datum or form with no handler. Floating-point literals land here
    /// deliberately.
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: String },

    /// include!/interface! recursion, carrying the offending path and the
    /// in-progress stack at the point of detection.
    #[error("circular dependency: {path} is already being processed")]
    CircularDependency { path: PathBuf, stack: Vec<PathBuf> },

    /// Malformed or missing type annotation on a declaration or argument.
    #[error("type annotation error: {message}")]
    TypeAnnotation { message: String },
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Read { .. } => "sedra::read",
            ErrorKind::Syntax { .. } => "sedra::syntax",
            ErrorKind::Macro { .. } => "sedra::macro",
            ErrorKind::Unsupported { .. } => "sedra::unsupported",
            ErrorKind::CircularDependency { .. } => "sedra::circular_dependency",
            ErrorKind::TypeAnnotation { .. } => "sedra::type_annotation",
        }
    }
}

// ============================================================================
// SEDRA ERROR
// ============================================================================

/// The single error type: what went wrong, and where.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct SedraError {
    pub kind: ErrorKind,
    /// Attached at the compile entry point, where the full source is known.
    pub source_code: Option<Arc<NamedSource<String>>>,
    pub span: Option<Span>,
}

impl SedraError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            source_code: None,
            span,
        }
    }

    /// Attach the compilation unit's source so miette can render a snippet.
    /// Deep construction sites only know spans; the entry point knows text.
    pub fn with_source(mut self, ctx: &SourceContext) -> Self {
        if self.source_code.is_none() {
            self.source_code = Some(ctx.to_named_source());
        }
        self
    }
}

impl Diagnostic for SedraError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        let label = match &self.kind {
            ErrorKind::Read { .. } => "invalid syntax here",
            ErrorKind::Syntax { .. } => "in this form",
            ErrorKind::Macro { .. } => "in this macro call",
            ErrorKind::Unsupported { .. } => "unsupported here",
            ErrorKind::CircularDependency { .. } => "included from here",
            ErrorKind::TypeAnnotation { .. } => "annotation here",
        };
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label.to_string()),
            to_source_span(span),
        ))))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.kind {
            ErrorKind::CircularDependency { stack, .. } => {
                let chain = stack
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                Some(Box::new(format!("in-progress files: {chain}")))
            }
            ErrorKind::Unsupported { .. } => {
                Some(Box::new("this datum has no target-AST equivalent"))
            }
            _ => None,
        }
    }
}

pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), span.end.saturating_sub(span.start))
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

pub fn read_error(message: impl Into<String>, span: Option<Span>) -> SedraError {
    SedraError::new(
        ErrorKind::Read {
            message: message.into(),
        },
        span,
    )
}

pub fn syntax_error(
    construct: impl Into<String>,
    message: impl Into<String>,
    span: Option<Span>,
) -> SedraError {
    SedraError::new(
        ErrorKind::Syntax {
            construct: construct.into(),
            message: message.into(),
        },
        span,
    )
}

pub fn macro_error(
    macro_name: impl Into<String>,
    message: impl Into<String>,
    span: Option<Span>,
) -> SedraError {
    SedraError::new(
        ErrorKind::Macro {
            macro_name: macro_name.into(),
            message: message.into(),
        },
        span,
    )
}

pub fn unsupported_error(construct: impl Into<String>, span: Option<Span>) -> SedraError {
    SedraError::new(
        ErrorKind::Unsupported {
            construct: construct.into(),
        },
        span,
    )
}

pub fn circular_dependency_error(
    path: PathBuf,
    stack: Vec<PathBuf>,
    span: Option<Span>,
) -> SedraError {
    SedraError::new(ErrorKind::CircularDependency { path, stack }, span)
}

pub fn type_annotation_error(message: impl Into<String>, span: Option<Span>) -> SedraError {
    SedraError::new(
        ErrorKind::TypeAnnotation {
            message: message.into(),
        },
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        let err = read_error("unbalanced parens", None);
        assert_eq!(err.kind.code(), "sedra::read");
        let err = unsupported_error("float literal", None);
        assert_eq!(err.kind.code(), "sedra::unsupported");
    }

    #[test]
    fn circular_dependency_carries_stack() {
        let err = circular_dependency_error(
            PathBuf::from("a.sedra"),
            vec![PathBuf::from("a.sedra"), PathBuf::from("b.sedra")],
            None,
        );
        let ErrorKind::CircularDependency { path, stack } = &err.kind else {
            panic!("wrong kind");
        };
        assert_eq!(path, &PathBuf::from("a.sedra"));
        assert_eq!(stack.len(), 2);
    }
}
