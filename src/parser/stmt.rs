//! Statement and access-form handlers: control flow, assignment, and the
//! attribute/subscript/tuple forms.

use crate::ast::{BinOpKind, Node, NodeKind};
use crate::errors::{syntax_error, SedraError};
use crate::macros::MacroEnv;
use crate::parser::context::ParseContext;
use crate::parser::{parse_call_args, parse_expr_node, parse_node, Built};
use crate::syntax::{Span, SyntaxForm};

// ============================================================================
// BODIES
// ============================================================================

/// Parse a statement sequence: `do` blocks and multi-form macro results
/// splice flat, context-only declarations vanish, and bare calls get wrapped
/// into expression statements.
pub fn parse_statements(
    forms: &[SyntaxForm],
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Vec<Node>, SedraError> {
    let mut nodes = Vec::with_capacity(forms.len());
    for form in forms {
        match parse_node(form, ctx, env)? {
            Built::Node(n) => nodes.push(n),
            Built::Nodes(ns) => nodes.extend(ns),
            Built::None => {}
            Built::Settings(_) => {
                return Err(syntax_error(
                    "pragma",
                    "only allowed at module top level",
                    Some(form.span()),
                ))
            }
        }
    }
    Ok(wrap_bare_calls(nodes, ctx))
}

/// A call in statement position becomes an expression statement.
fn wrap_bare_calls(nodes: Vec<Node>, ctx: &mut ParseContext) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|n| match n.kind {
            NodeKind::Call { .. } => {
                let span = n.span;
                Node::new(
                    ctx.next_node_id(),
                    NodeKind::ExprStmt { value: Box::new(n) },
                    span,
                )
            }
            _ => n,
        })
        .collect()
}

// ============================================================================
// CONTROL FLOW
// ============================================================================

pub fn parse_if(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    if items.len() < 3 || items.len() > 4 {
        return Err(syntax_error(
            "if",
            "expected (if test then) or (if test then else)",
            Some(span),
        ));
    }

    let test = parse_expr_node(&items[1], ctx, env)?;

    // `(if test None else)` from unless: an empty then-branch needs a pass.
    let body = if items[2].is_symbol("None") {
        vec![Node::new(ctx.next_node_id(), NodeKind::Pass, items[2].span())]
    } else {
        parse_statements(std::slice::from_ref(&items[2]), ctx, env)?
    };

    let orelse = match items.get(3) {
        None => vec![],
        Some(f) if f.is_symbol("None") => vec![],
        Some(f) => parse_statements(std::slice::from_ref(f), ctx, env)?,
    };

    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::If {
            test: Box::new(test),
            body,
            orelse,
        },
        span,
    )))
}

pub fn parse_do(
    items: &[SyntaxForm],
    _span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    parse_statements(&items[1..], ctx, env).map(Built::Nodes)
}

pub fn parse_for(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    // (for [x xs] body ...)
    let binding = items
        .get(1)
        .and_then(SyntaxForm::as_sequence)
        .filter(|b| b.len() == 2)
        .ok_or_else(|| {
            syntax_error(
                "for",
                "expected a [target iterable] binding",
                Some(span),
            )
        })?;

    let target = parse_expr_node(&binding[0], ctx, env)?;
    let iter = parse_expr_node(&binding[1], ctx, env)?;
    let body = parse_statements(&items[2..], ctx, env)?;

    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::For {
            target: Box::new(target),
            iter: Box::new(iter),
            body,
        },
        span,
    )))
}

pub fn parse_return(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let value = match items {
        [_] => None,
        [_, v] => Some(Box::new(parse_expr_node(v, ctx, env)?)),
        _ => {
            return Err(syntax_error(
                "return",
                "takes at most one value",
                Some(span),
            ))
        }
    };
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Return { value },
        span,
    )))
}

pub fn parse_assert(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, test_form, rest @ ..] = items else {
        return Err(syntax_error("assert", "requires a condition", Some(span)));
    };
    let test = parse_expr_node(test_form, ctx, env)?;
    let msg = match rest {
        [] => None,
        [m] => Some(Box::new(parse_expr_node(m, ctx, env)?)),
        _ => {
            return Err(syntax_error(
                "assert",
                "takes a condition and an optional message",
                Some(span),
            ))
        }
    };
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Assert {
            test: Box::new(test),
            msg,
        },
        span,
    )))
}

pub fn parse_raise(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let exc = match items {
        [_] => None,
        [_, e] => Some(Box::new(parse_expr_node(e, ctx, env)?)),
        _ => {
            return Err(syntax_error(
                "raise",
                "takes at most one message",
                Some(span),
            ))
        }
    };
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Raise { exc },
        span,
    )))
}

pub fn parse_log(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, event] = items else {
        return Err(syntax_error(
            "log",
            "requires exactly one event call",
            Some(span),
        ));
    };
    let value = parse_expr_node(event, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Log {
            value: Box::new(value),
        },
        span,
    )))
}

pub fn parse_pass(
    _items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    _env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    Ok(Built::Node(Node::new(ctx.next_node_id(), NodeKind::Pass, span)))
}

pub fn parse_break(
    _items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    _env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    Ok(Built::Node(Node::new(ctx.next_node_id(), NodeKind::Break, span)))
}

pub fn parse_continue(
    _items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    _env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Continue,
        span,
    )))
}

// ============================================================================
// ASSIGNMENT
// ============================================================================

pub fn parse_assign(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, target_form, value_form] = items else {
        return Err(syntax_error(
            "set",
            "expected (set target value)",
            Some(span),
        ));
    };
    let target = parse_expr_node(target_form, ctx, env)?;
    let value = parse_expr_node(value_form, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        },
        span,
    )))
}

pub fn parse_augassign(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [head, target_form, value_form] = items else {
        return Err(syntax_error(
            "augmented assignment",
            "expected (op= target value)",
            Some(span),
        ));
    };
    let op = head
        .as_symbol()
        .and_then(|s| s.strip_suffix('='))
        .and_then(BinOpKind::from_symbol)
        .ok_or_else(|| {
            syntax_error("augmented assignment", "unknown operator", Some(span))
        })?;
    let target = parse_expr_node(target_form, ctx, env)?;
    let value = parse_expr_node(value_form, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::AugAssign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        },
        span,
    )))
}

// ============================================================================
// ACCESS FORMS
// ============================================================================

/// `(. obj attr)` builds an attribute access; extra arguments turn it into a
/// method call on that attribute.
pub fn parse_attribute(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, value_form, attr_form, rest @ ..] = items else {
        return Err(syntax_error(
            "attribute",
            "expected (. object attribute)",
            Some(span),
        ));
    };
    let attr = attr_form
        .as_symbol()
        .or_else(|| attr_form.as_keyword())
        .ok_or_else(|| {
            syntax_error(
                "attribute",
                "attribute name must be a symbol",
                Some(attr_form.span()),
            )
        })?
        .to_string();

    let value = parse_expr_node(value_form, ctx, env)?;
    let attr_node = Node::new(
        ctx.next_node_id(),
        NodeKind::Attribute {
            value: Box::new(value),
            attr,
        },
        span,
    );

    if rest.is_empty() {
        return Ok(Built::Node(attr_node));
    }

    let (args, keywords) = parse_call_args(rest, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Call {
            func: Box::new(attr_node),
            args,
            keywords,
        },
        span,
    )))
}

pub fn parse_subscript(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, value_form, index_form] = items else {
        return Err(syntax_error(
            "subscript",
            "expected (subscript value index)",
            Some(span),
        ));
    };
    let value = parse_expr_node(value_form, ctx, env)?;
    let index = parse_expr_node(index_form, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        },
        span,
    )))
}

/// `'(a b)` and `(tuple a b)` both build tuple nodes.
pub fn parse_tuple(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let element_forms: &[SyntaxForm] = match items {
        [_, single] if single.as_sequence().is_some() => {
            single.as_sequence().unwrap_or_default()
        }
        _ => &items[1..],
    };
    let elements = element_forms
        .iter()
        .map(|f| parse_expr_node(f, ctx, env))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Tuple { elements },
        span,
    )))
}
