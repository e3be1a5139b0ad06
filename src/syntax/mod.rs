//! Syntax layer: the reader's datum type, source spans, and the scope-marked
//! `Syntax` wrapper used during macro expansion.
//!
//! `SyntaxForm` values are immutable once the reader produces them. Macro
//! expansion always builds new forms; nothing in the pipeline mutates a form
//! in place.

use serde::{Deserialize, Serialize};

pub mod reader;

pub use reader::read_all;

// ============================================================================
// SPAN
// ============================================================================

/// Source location: byte offsets for miette, line/column (1-based) for the
/// target AST's position metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    /// Span covering both inputs. Used when a synthesized form wraps several
    /// read forms.
    pub fn merge(self, other: Span) -> Span {
        let (start, start_line, start_col) = if self.start <= other.start {
            (self.start, self.start_line, self.start_col)
        } else {
            (other.start, other.start_line, other.start_col)
        };
        let (end, end_line, end_col) = if self.end >= other.end {
            (self.end, self.end_line, self.end_col)
        } else {
            (other.end, other.end_line, other.end_col)
        };
        Span {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

// ============================================================================
// SYNTAX FORM
// ============================================================================

/// One parsed syntactic unit. Equality is structural and ignores spans, so a
/// macro pattern read from one location matches input read from another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyntaxForm {
    Symbol(String, Span),
    Keyword(String, Span),
    Int(i128, Span),
    /// Decimal literal wider than i128 (uint256-range constants), kept as the
    /// verbatim digit string.
    BigInt(String, Span),
    /// Readable but never buildable: the AST builder rejects floats.
    Float(String, Span),
    Str(String, Span),
    Bytes(Vec<u8>, Span),
    /// Parenthesized form.
    List(Vec<SyntaxForm>, Span),
    /// Bracketed form.
    Vector(Vec<SyntaxForm>, Span),
}

impl SyntaxForm {
    pub fn span(&self) -> Span {
        match self {
            SyntaxForm::Symbol(_, span)
            | SyntaxForm::Keyword(_, span)
            | SyntaxForm::Int(_, span)
            | SyntaxForm::BigInt(_, span)
            | SyntaxForm::Float(_, span)
            | SyntaxForm::Str(_, span)
            | SyntaxForm::Bytes(_, span)
            | SyntaxForm::List(_, span)
            | SyntaxForm::Vector(_, span) => *span,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SyntaxForm::Symbol(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol() == Some(name)
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            SyntaxForm::Keyword(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SyntaxForm]> {
        match self {
            SyntaxForm::List(items, _) => Some(items),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[SyntaxForm]> {
        match self {
            SyntaxForm::Vector(items, _) => Some(items),
            _ => None,
        }
    }

    /// Items of a list or vector, when either shape is acceptable.
    pub fn as_sequence(&self) -> Option<&[SyntaxForm]> {
        match self {
            SyntaxForm::List(items, _) | SyntaxForm::Vector(items, _) => Some(items),
            _ => None,
        }
    }

    /// Head symbol of a list form, if any.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    // Utility: pretty printing for error messages and traces.
    pub fn pretty(&self) -> String {
        match self {
            SyntaxForm::Symbol(s, _) => s.clone(),
            SyntaxForm::Keyword(s, _) => format!(":{s}"),
            SyntaxForm::Int(n, _) => n.to_string(),
            SyntaxForm::BigInt(raw, _) => raw.clone(),
            SyntaxForm::Float(raw, _) => raw.clone(),
            SyntaxForm::Str(s, _) => format!("{s:?}"),
            SyntaxForm::Bytes(b, _) => format!("b\"{}\"", String::from_utf8_lossy(b)),
            SyntaxForm::List(items, _) => {
                let inner = items.iter().map(|e| e.pretty()).collect::<Vec<_>>();
                format!("({})", inner.join(" "))
            }
            SyntaxForm::Vector(items, _) => {
                let inner = items.iter().map(|e| e.pretty()).collect::<Vec<_>>();
                format!("[{}]", inner.join(" "))
            }
        }
    }
}

impl PartialEq for SyntaxForm {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SyntaxForm::Symbol(a, _), SyntaxForm::Symbol(b, _)) => a == b,
            (SyntaxForm::Keyword(a, _), SyntaxForm::Keyword(b, _)) => a == b,
            (SyntaxForm::Int(a, _), SyntaxForm::Int(b, _)) => a == b,
            (SyntaxForm::BigInt(a, _), SyntaxForm::BigInt(b, _)) => a == b,
            (SyntaxForm::Float(a, _), SyntaxForm::Float(b, _)) => a == b,
            (SyntaxForm::Str(a, _), SyntaxForm::Str(b, _)) => a == b,
            (SyntaxForm::Bytes(a, _), SyntaxForm::Bytes(b, _)) => a == b,
            (SyntaxForm::List(a, _), SyntaxForm::List(b, _)) => a == b,
            (SyntaxForm::Vector(a, _), SyntaxForm::Vector(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SyntaxForm {}

// ============================================================================
// FORM CONSTRUCTORS
// ============================================================================

pub fn symbol(name: impl Into<String>, span: Span) -> SyntaxForm {
    SyntaxForm::Symbol(name.into(), span)
}

pub fn keyword(name: impl Into<String>, span: Span) -> SyntaxForm {
    SyntaxForm::Keyword(name.into(), span)
}

pub fn list(items: Vec<SyntaxForm>, span: Span) -> SyntaxForm {
    SyntaxForm::List(items, span)
}

pub fn vector(items: Vec<SyntaxForm>, span: Span) -> SyntaxForm {
    SyntaxForm::Vector(items, span)
}

// ============================================================================
// SCOPE MARKS - partial hygiene
// ============================================================================

/// A form paired with the scope marks it has accumulated. Marks record syntax
/// provenance only; no alpha-renaming happens. Completing this into full
/// hygiene would change observable binding semantics that downstream macro
/// code relies on, so the partiality is intentional.
#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    pub datum: SyntaxForm,
    pub scopes: Vec<u64>,
}

impl Syntax {
    pub fn new(datum: SyntaxForm) -> Self {
        Self {
            datum,
            scopes: Vec::new(),
        }
    }

    pub fn with_scopes(datum: SyntaxForm, scopes: Vec<u64>) -> Self {
        Self { datum, scopes }
    }

    /// Append a mark. Scope sequences only ever grow; a form's marks are
    /// never removed or reordered as it passes through nested expansions.
    pub fn add_mark(&self, mark: u64) -> Syntax {
        let mut scopes = self.scopes.clone();
        scopes.push(mark);
        Syntax {
            datum: self.datum.clone(),
            scopes,
        }
    }

    pub fn span(&self) -> Span {
        self.datum.span()
    }
}

/// Two identifiers are the same binding when both name and scope sequence
/// agree.
pub fn same_identifier(a: &Syntax, b: &Syntax) -> bool {
    matches!(
        (&a.datum, &b.datum),
        (SyntaxForm::Symbol(x, _), SyntaxForm::Symbol(y, _)) if x == y
    ) && a.scopes == b.scopes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_spans() {
        let a = symbol("foo", Span::default());
        let b = symbol(
            "foo",
            Span {
                start: 10,
                end: 13,
                start_line: 2,
                start_col: 1,
                end_line: 2,
                end_col: 4,
            },
        );
        assert_eq!(a, b);
    }

    #[test]
    fn add_mark_appends_only() {
        let stx = Syntax::new(symbol("x", Span::default()));
        let marked = stx.add_mark(1).add_mark(2);
        assert_eq!(marked.scopes, vec![1, 2]);
        // original untouched
        assert!(stx.scopes.is_empty());
    }

    #[test]
    fn same_identifier_requires_matching_scopes() {
        let plain = Syntax::new(symbol("x", Span::default()));
        let marked = plain.add_mark(7);
        assert!(same_identifier(&plain, &plain.clone()));
        assert!(!same_identifier(&plain, &marked));
    }
}
