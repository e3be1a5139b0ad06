//! Sedra Reader - Clean, Minimal Implementation
//!
//! Converts Sedra source text into `SyntaxForm` values with source location
//! tracking. The reader is purely syntactic: no macro expansion, no node
//! synthesis. Its one deliberate lexical override is that hex-shaped tokens
//! (`0x` + hex digits) read as symbols rather than integers.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::errors::{read_error, SedraError};
use crate::syntax::{Span, SyntaxForm};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct SedraReader;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Read every form in the source text, in order.
pub fn read_all(source_text: &str) -> Result<Vec<SyntaxForm>, SedraError> {
    if source_text.trim().is_empty() {
        return Ok(vec![]);
    }

    let pairs = SedraReader::parse(Rule::program, source_text).map_err(convert_parse_error)?;

    let program = pairs.peek().expect("pest guarantees the program rule");

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_form)
        .collect()
}

/// Read exactly one form; fails when the text holds zero or several.
pub fn read_one(source_text: &str) -> Result<SyntaxForm, SedraError> {
    let mut forms = read_all(source_text)?;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        n => Err(read_error(
            format!("expected exactly one form, found {n}"),
            None,
        )),
    }
}

// ============================================================================
// FORM BUILDERS
// ============================================================================

fn build_form(pair: Pair<Rule>) -> Result<SyntaxForm, SedraError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::list => {
            let items: Result<Vec<_>, _> = pair.into_inner().map(build_form).collect();
            Ok(SyntaxForm::List(items?, span))
        }

        Rule::vector => {
            let items: Result<Vec<_>, _> = pair.into_inner().map(build_form).collect();
            Ok(SyntaxForm::Vector(items?, span))
        }

        Rule::quoted => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| read_error("expected form after quote", Some(span)))?;
            let quoted = build_form(inner)?;
            Ok(SyntaxForm::List(
                vec![SyntaxForm::Symbol("quote".into(), span), quoted],
                span,
            ))
        }

        Rule::int => {
            let text = pair.as_str();
            // uint256-range literals exceed i128; keep the digits verbatim.
            match text.parse::<i128>() {
                Ok(value) => Ok(SyntaxForm::Int(value, span)),
                Err(_) => Ok(SyntaxForm::BigInt(text.to_string(), span)),
            }
        }

        // Floats read fine; the AST builder rejects them later with a
        // precise "unsupported construct" error carrying this span.
        Rule::float => Ok(SyntaxForm::Float(pair.as_str().to_string(), span)),

        Rule::hex_symbol => Ok(SyntaxForm::Symbol(pair.as_str().to_string(), span)),

        Rule::symbol => Ok(SyntaxForm::Symbol(pair.as_str().to_string(), span)),

        Rule::keyword => {
            let text = &pair.as_str()[1..];
            Ok(SyntaxForm::Keyword(text.to_string(), span))
        }

        Rule::string => Ok(SyntaxForm::Str(unescape_string(pair.as_str()), span)),

        Rule::bytes_lit => {
            let text = pair.as_str();
            // strip the leading `b` and surrounding quotes
            let content = unescape_string(&text[1..]);
            Ok(SyntaxForm::Bytes(content.into_bytes(), span))
        }

        rule => Err(read_error(
            format!("unexpected token: {rule:?}"),
            Some(span),
        )),
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    let (start_line, start_col) = span.start_pos().line_col();
    let (end_line, end_col) = span.end_pos().line_col();
    Span {
        start: span.start(),
        end: span.end(),
        start_line,
        start_col,
        end_line,
        end_col,
    }
}

fn unescape_string(text: &str) -> String {
    // Remove surrounding quotes
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn convert_parse_error(error: pest::error::Error<Rule>) -> SedraError {
    let (start, end) = match error.location {
        pest::error::InputLocation::Pos(pos) => (pos, pos),
        pest::error::InputLocation::Span((start, end)) => (start, end),
    };
    let (start_line, start_col) = match error.line_col {
        pest::error::LineColLocation::Pos((line, col)) => (line, col),
        pest::error::LineColLocation::Span((line, col), _) => (line, col),
    };

    let rendered = error.to_string();
    let message = if rendered.contains("expected \")\"") {
        "missing closing parenthesis"
    } else if rendered.contains("expected \"]\"") {
        "missing closing bracket"
    } else if rendered.contains("expected \"\\\"\"") {
        "missing closing quote"
    } else {
        "invalid token"
    };

    read_error(
        message,
        Some(Span {
            start,
            end,
            start_line,
            start_col,
            end_line: start_line,
            end_col: start_col,
        }),
    )
}
