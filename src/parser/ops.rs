//! Operator forms: arithmetic, comparison, boolean, and unary heads.
//!
//! Variadic arithmetic folds to the right: `(+ a b c)` becomes `a + (b + c)`.
//! Chained comparisons expand pairwise under `and`: `(< a b c)` becomes
//! `(a < b) and (b < c)`.

use crate::ast::{BinOpKind, BoolOpKind, CmpOpKind, Node, NodeKind, UnaryOpKind};
use crate::errors::{syntax_error, SedraError};
use crate::macros::MacroEnv;
use crate::parser::context::ParseContext;
use crate::parser::parse_expr_node;
use crate::syntax::{Span, SyntaxForm};

pub fn is_op(name: &str) -> bool {
    BinOpKind::from_symbol(name).is_some()
        || CmpOpKind::from_symbol(name).is_some()
        || BoolOpKind::from_symbol(name).is_some()
        || UnaryOpKind::from_symbol(name).is_some()
}

pub fn parse_op(
    name: &str,
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    let operands = &items[1..];

    if let Some(kind) = BinOpKind::from_symbol(name) {
        if operands.len() < 2 {
            return Err(syntax_error(
                name,
                "requires at least two operands",
                Some(span),
            ));
        }
        return fold_binop(kind, operands, span, ctx, env);
    }

    if let Some(kind) = CmpOpKind::from_symbol(name) {
        return parse_comparison(name, kind, operands, span, ctx, env);
    }

    if let Some(kind) = BoolOpKind::from_symbol(name) {
        if operands.len() < 2 {
            return Err(syntax_error(
                name,
                "requires at least two operands",
                Some(span),
            ));
        }
        let values = operands
            .iter()
            .map(|o| parse_expr_node(o, ctx, env))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Node::new(
            ctx.next_node_id(),
            NodeKind::BoolOp { op: kind, values },
            span,
        ));
    }

    if let Some(kind) = UnaryOpKind::from_symbol(name) {
        let [operand] = operands else {
            return Err(syntax_error(name, "requires exactly one operand", Some(span)));
        };
        let operand = parse_expr_node(operand, ctx, env)?;
        return Ok(Node::new(
            ctx.next_node_id(),
            NodeKind::UnaryOp {
                op: kind,
                operand: Box::new(operand),
            },
            span,
        ));
    }

    Err(syntax_error(name, "not an operator", Some(span)))
}

fn fold_binop(
    kind: BinOpKind,
    operands: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    let left = parse_expr_node(&operands[0], ctx, env)?;
    let right = if operands.len() == 2 {
        parse_expr_node(&operands[1], ctx, env)?
    } else {
        fold_binop(kind, &operands[1..], span, ctx, env)?
    };
    Ok(Node::new(
        ctx.next_node_id(),
        NodeKind::BinOp {
            op: kind,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    ))
}

fn parse_comparison(
    name: &str,
    kind: CmpOpKind,
    operands: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    match operands.len() {
        0 | 1 => Err(syntax_error(
            name,
            "requires at least two operands",
            Some(span),
        )),
        2 => compare_pair(kind, &operands[0], &operands[1], span, ctx, env),
        // Membership tests have no chained reading.
        _ if matches!(kind, CmpOpKind::In | CmpOpKind::NotIn) => Err(syntax_error(
            name,
            "requires exactly two operands",
            Some(span),
        )),
        _ => {
            let mut values = Vec::with_capacity(operands.len() - 1);
            for pair in operands.windows(2) {
                values.push(compare_pair(kind, &pair[0], &pair[1], span, ctx, env)?);
            }
            Ok(Node::new(
                ctx.next_node_id(),
                NodeKind::BoolOp {
                    op: BoolOpKind::And,
                    values,
                },
                span,
            ))
        }
    }
}

fn compare_pair(
    kind: CmpOpKind,
    left: &SyntaxForm,
    right: &SyntaxForm,
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    let left = parse_expr_node(left, ctx, env)?;
    let right = parse_expr_node(right, ctx, env)?;
    Ok(Node::new(
        ctx.next_node_id(),
        NodeKind::Compare {
            op: kind,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    ))
}
