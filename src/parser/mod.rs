//! Node synthesis: turns expanded forms into target-AST nodes.
//!
//! Dispatch for a list form runs in a fixed order: alias canonicalization,
//! operator heads, the closed special-form handler table, a late
//! macro-expansion check, dotted-call shorthand, and finally the generic call
//! fallback. Every handler allocates child node ids before the parent's,
//! except the pre-reserved function and module ids.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{Node, NodeKind};
use crate::errors::{syntax_error, unsupported_error, SedraError};
use crate::macros::env::Expansion;
use crate::macros::{expander, MacroEnv};
use crate::syntax::{list, symbol, Span, SyntaxForm};

pub mod context;
pub mod decl;
pub mod interface;
pub mod ops;
pub mod stmt;

pub use context::{ParseContext, Settings};

use context::ConstEntry;

// ============================================================================
// BUILT - handler results
// ============================================================================

/// What parsing one form yields. Most forms build one node; `do` bodies and
/// `defvars` build several; declarations that only update the context build
/// nothing; `pragma` builds settings.
#[derive(Debug)]
pub enum Built {
    Node(Node),
    Nodes(Vec<Node>),
    Settings(Settings),
    None,
}

// ============================================================================
// DISPATCH TABLES
// ============================================================================

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (".", "attribute"),
        ("quote", "tuple"),
        ("array", "subscript"),
        ("defvar", "annassign"),
        ("def", "annassign"),
        ("setv", "assign"),
        ("set", "assign"),
        ("defimm", "defimmutable"),
    ])
});

pub(crate) type Handler =
    fn(&[SyntaxForm], Span, &mut ParseContext, &mut MacroEnv) -> Result<Built, SedraError>;

static HANDLERS: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Handler> = HashMap::new();
    m.insert("if", stmt::parse_if);
    m.insert("do", stmt::parse_do);
    m.insert("for", stmt::parse_for);
    m.insert("return", stmt::parse_return);
    m.insert("assert", stmt::parse_assert);
    m.insert("raise", stmt::parse_raise);
    m.insert("log", stmt::parse_log);
    m.insert("pass", stmt::parse_pass);
    m.insert("break", stmt::parse_break);
    m.insert("continue", stmt::parse_continue);
    m.insert("assign", stmt::parse_assign);
    m.insert("+=", stmt::parse_augassign);
    m.insert("-=", stmt::parse_augassign);
    m.insert("*=", stmt::parse_augassign);
    m.insert("/=", stmt::parse_augassign);
    m.insert("attribute", stmt::parse_attribute);
    m.insert("subscript", stmt::parse_subscript);
    m.insert("tuple", stmt::parse_tuple);
    m.insert("defn", decl::parse_defn);
    m.insert("annassign", decl::parse_annassign);
    m.insert("defvars", decl::parse_defvars);
    m.insert("defconst", decl::parse_defconst);
    m.insert("defimmutable", decl::parse_defimmutable);
    m.insert("defstruct", decl::parse_defstruct);
    m.insert("defevent", decl::parse_defevent);
    m.insert("definterface", decl::parse_definterface);
    m.insert("pragma", decl::parse_pragma);
    m.insert("hash-map", decl::parse_hash_map);
    m.insert("dyn-array", decl::parse_dyn_array);
    m.insert("string", decl::parse_string_type);
    m.insert("bytes", decl::parse_bytes_type);
    m
});

// ============================================================================
// NODE SYNTHESIS
// ============================================================================

pub fn parse_node(
    form: &SyntaxForm,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let span = form.span();
    match form {
        SyntaxForm::List(items, _) => {
            if items.is_empty() {
                return Err(syntax_error("expression", "empty form", Some(span)));
            }
            parse_expr(items, span, ctx, env)
        }

        SyntaxForm::Symbol(name, _) => parse_symbol(name, span, ctx, env),

        SyntaxForm::Keyword(name, _) => Ok(Built::Node(Node::new(
            ctx.next_node_id(),
            NodeKind::Name { id: name.clone() },
            span,
        ))),

        SyntaxForm::Int(value, _) => Ok(Built::Node(Node::new(
            ctx.next_node_id(),
            NodeKind::Int { value: *value },
            span,
        ))),

        SyntaxForm::BigInt(raw, _) => Ok(Built::Node(Node::new(
            ctx.next_node_id(),
            NodeKind::BigInt { value: raw.clone() },
            span,
        ))),

        SyntaxForm::Float(raw, _) => Err(unsupported_error(
            format!("floating-point literal {raw}"),
            Some(span),
        )),

        SyntaxForm::Str(value, _) => Ok(Built::Node(Node::new(
            ctx.next_node_id(),
            NodeKind::Str {
                value: value.clone(),
            },
            span,
        ))),

        SyntaxForm::Bytes(value, _) => Ok(Built::Node(Node::new(
            ctx.next_node_id(),
            NodeKind::Bytes {
                value: value.clone(),
            },
            span,
        ))),

        // Bracketed literals build list nodes element by element.
        SyntaxForm::Vector(items, _) => {
            let elements = items
                .iter()
                .map(|i| parse_expr_node(i, ctx, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Built::Node(Node::new(
                ctx.next_node_id(),
                NodeKind::List { elements },
                span,
            )))
        }
    }
}

/// Parse a form that must yield exactly one node.
pub fn parse_expr_node(
    form: &SyntaxForm,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    match parse_node(form, ctx, env)? {
        Built::Node(node) => Ok(node),
        _ => Err(syntax_error(
            "expression",
            format!("expected a single expression, got {}", form.pretty()),
            Some(form.span()),
        )),
    }
}

fn parse_expr(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let Some(head) = items[0].as_symbol() else {
        return parse_call(items, span, ctx, env).map(Built::Node);
    };

    let cmd = ALIASES.get(head).copied().unwrap_or(head);

    if ops::is_op(cmd) {
        return ops::parse_op(cmd, items, span, ctx, env).map(Built::Node);
    }

    if let Some(handler) = HANDLERS.get(cmd) {
        return handler(items, span, ctx, env);
    }

    // Late macro check: forms synthesized during parsing may carry macro
    // heads that never went through module expansion. Consulted before the
    // dotted-call rewrite, so a macro named `.foo` wins over the sugar.
    if env.is_defined(cmd) {
        let form = SyntaxForm::List(items.to_vec(), span);
        return match expander::expand(&form, env, ctx)? {
            Expansion::One(f) => parse_node(&f, ctx, env),
            Expansion::Many(fs) => {
                let mut nodes = Vec::new();
                for f in &fs {
                    match parse_node(f, ctx, env)? {
                        Built::Node(n) => nodes.push(n),
                        Built::Nodes(ns) => nodes.extend(ns),
                        Built::None => {}
                        Built::Settings(_) => {
                            return Err(syntax_error(
                                "pragma",
                                "only allowed at module top level",
                                Some(f.span()),
                            ))
                        }
                    }
                }
                Ok(Built::Nodes(nodes))
            }
        };
    }

    // (.method obj args) sugar for ((. obj method) args)
    if let Some(method) = cmd.strip_prefix('.') {
        if !method.is_empty() && items.len() >= 2 {
            let inner = list(
                vec![
                    symbol(".", items[0].span()),
                    items[1].clone(),
                    symbol(method, items[0].span()),
                ],
                span,
            );
            let mut outer = vec![inner];
            outer.extend_from_slice(&items[2..]);
            return parse_node(&SyntaxForm::List(outer, span), ctx, env);
        }
    }

    parse_call(items, span, ctx, env).map(Built::Node)
}

fn parse_symbol(
    name: &str,
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    if let Some(entry) = ctx.constants.get(name).cloned() {
        return match entry {
            // Substitute the stored value form at the use site.
            ConstEntry::Value(form) => parse_node(&form, ctx, env),
            ConstEntry::Immutable => Ok(Built::Node(Node::new(
                ctx.next_node_id(),
                NodeKind::Name { id: name.into() },
                span,
            ))),
        };
    }

    match name {
        "True" | "False" => {
            return Ok(Built::Node(Node::new(
                ctx.next_node_id(),
                NodeKind::NameConstant {
                    value: Some(name == "True"),
                },
                span,
            )))
        }
        "None" => {
            return Ok(Built::Node(Node::new(
                ctx.next_node_id(),
                NodeKind::NameConstant { value: None },
                span,
            )))
        }
        _ => {}
    }

    if name.starts_with("0x") {
        return Ok(Built::Node(Node::new(
            ctx.next_node_id(),
            NodeKind::Hex { value: name.into() },
            span,
        )));
    }

    // self/balance reads as (. self balance); chains split at the last slash.
    if let Some((target, attr)) = name.rsplit_once('/') {
        if !target.is_empty() && !attr.is_empty() {
            let form = list(
                vec![symbol(".", span), symbol(target, span), symbol(attr, span)],
                span,
            );
            return parse_node(&form, ctx, env);
        }
    }

    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::Name { id: name.into() },
        span,
    )))
}

// ============================================================================
// GENERIC CALLS
// ============================================================================

/// Split call arguments into positional and keyword nodes. A keyword
/// followed by a value form reads as a named argument; a trailing keyword
/// reads as a positional type name.
pub(crate) fn parse_call_args(
    items: &[SyntaxForm],
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<(Vec<Node>, Vec<Node>), SedraError> {
    let mut args = Vec::new();
    let mut keywords = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if let SyntaxForm::Keyword(name, kspan) = &items[i] {
            if i + 1 < items.len() {
                let value = parse_expr_node(&items[i + 1], ctx, env)?;
                keywords.push(Node::new(
                    ctx.next_node_id(),
                    NodeKind::Keyword {
                        arg: name.clone(),
                        value: Box::new(value),
                    },
                    kspan.merge(items[i + 1].span()),
                ));
                i += 2;
                continue;
            }
        }
        args.push(parse_expr_node(&items[i], ctx, env)?);
        i += 1;
    }
    Ok((args, keywords))
}

fn parse_call(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    let func = parse_expr_node(&items[0], ctx, env)?;
    let (args, keywords) = parse_call_args(&items[1..], ctx, env)?;
    Ok(Node::new(
        ctx.next_node_id(),
        NodeKind::Call {
            func: Box::new(func),
            args,
            keywords,
        },
        span,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::reader::read_one;

    fn setup() -> (ParseContext, MacroEnv) {
        (ParseContext::new("", None), MacroEnv::with_builtins())
    }

    fn parse_str(src: &str) -> Node {
        let (mut ctx, mut env) = setup();
        let form = read_one(src).unwrap();
        parse_expr_node(&form, &mut ctx, &mut env).unwrap()
    }

    #[test]
    fn atoms_build_leaf_nodes() {
        assert!(matches!(parse_str("42").kind, NodeKind::Int { value: 42 }));
        assert!(matches!(parse_str("x").kind, NodeKind::Name { .. }));
        assert!(matches!(parse_str("\"hi\"").kind, NodeKind::Str { .. }));
        assert!(matches!(parse_str("b\"raw\"").kind, NodeKind::Bytes { .. }));
        assert!(matches!(parse_str(":uint256").kind, NodeKind::Name { .. }));
    }

    #[test]
    fn name_constants() {
        assert!(matches!(
            parse_str("True").kind,
            NodeKind::NameConstant { value: Some(true) }
        ));
        assert!(matches!(
            parse_str("False").kind,
            NodeKind::NameConstant { value: Some(false) }
        ));
        assert!(matches!(
            parse_str("None").kind,
            NodeKind::NameConstant { value: None }
        ));
    }

    #[test]
    fn hex_symbols_build_hex_nodes() {
        let node = parse_str("0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B");
        assert!(matches!(node.kind, NodeKind::Hex { ref value } if value.starts_with("0x")));
    }

    #[test]
    fn slash_symbols_read_as_attribute_access() {
        let node = parse_str("self/balance");
        let NodeKind::Attribute { value, attr } = node.kind else {
            panic!("expected Attribute");
        };
        assert_eq!(attr, "balance");
        assert!(matches!(value.kind, NodeKind::Name { ref id } if id == "self"));
    }

    #[test]
    fn slash_chains_split_at_the_last_slash() {
        let node = parse_str("self/pair/token");
        let NodeKind::Attribute { value, attr } = node.kind else {
            panic!("expected Attribute");
        };
        assert_eq!(attr, "token");
        assert!(matches!(value.kind, NodeKind::Attribute { .. }));
    }

    #[test]
    fn floats_are_rejected() {
        let (mut ctx, mut env) = setup();
        let form = read_one("3.14").unwrap();
        let err = parse_expr_node(&form, &mut ctx, &mut env).unwrap_err();
        assert_eq!(err.kind.code(), "sedra::unsupported");
    }

    #[test]
    fn generic_call_with_keyword_arguments() {
        let node = parse_str("(send recipient :value amount)");
        let NodeKind::Call { func, args, keywords } = node.kind else {
            panic!("expected Call");
        };
        assert!(matches!(func.kind, NodeKind::Name { ref id } if id == "send"));
        assert_eq!(args.len(), 1);
        assert_eq!(keywords.len(), 1);
        assert!(
            matches!(&keywords[0].kind, NodeKind::Keyword { arg, .. } if arg == "value")
        );
    }

    #[test]
    fn trailing_keyword_is_a_positional_type_name() {
        let node = parse_str("(convert x :uint256)");
        let NodeKind::Call { args, keywords, .. } = node.kind else {
            panic!("expected Call");
        };
        assert_eq!(args.len(), 2);
        assert!(keywords.is_empty());
        assert!(matches!(args[1].kind, NodeKind::Name { ref id } if id == "uint256"));
    }

    #[test]
    fn dotted_call_sugar() {
        let node = parse_str("(.append self/nums 5)");
        let NodeKind::Call { func, args, .. } = node.kind else {
            panic!("expected Call");
        };
        let NodeKind::Attribute { attr, .. } = func.kind else {
            panic!("expected Attribute func");
        };
        assert_eq!(attr, "append");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn macros_win_over_dotted_call_sugar() {
        let (mut ctx, mut env) = setup();
        let def = read_one(
            "(define-syntax .scaled (syntax-rules () ((.scaled x f) (* x f))))",
        )
        .unwrap();
        crate::macros::expander::compile_define_syntax(&def, &mut env).unwrap();
        let node =
            parse_expr_node(&read_one("(.scaled y 10)").unwrap(), &mut ctx, &mut env).unwrap();
        assert!(matches!(node.kind, NodeKind::BinOp { .. }));
    }

    #[test]
    fn constants_substitute_their_value_form() {
        let (mut ctx, mut env) = setup();
        let def = read_one("(defconst FEE 300)").unwrap();
        parse_node(&def, &mut ctx, &mut env).unwrap();
        let node = parse_expr_node(&read_one("FEE").unwrap(), &mut ctx, &mut env).unwrap();
        assert!(matches!(node.kind, NodeKind::Int { value: 300 }));
    }

    #[test]
    fn immutables_stay_plain_names() {
        let (mut ctx, mut env) = setup();
        let def = read_one("(defimmutable OWNER)").unwrap();
        parse_node(&def, &mut ctx, &mut env).unwrap();
        let node = parse_expr_node(&read_one("OWNER").unwrap(), &mut ctx, &mut env).unwrap();
        assert!(matches!(node.kind, NodeKind::Name { ref id } if id == "OWNER"));
    }

    #[test]
    fn vector_literals_build_list_nodes() {
        let node = parse_str("[1 2 3]");
        let NodeKind::List { elements } = node.kind else {
            panic!("expected List");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn empty_form_is_an_error() {
        let (mut ctx, mut env) = setup();
        let form = read_one("()").unwrap();
        assert!(parse_node(&form, &mut ctx, &mut env).is_err());
    }

    #[test]
    fn node_ids_are_unique_across_a_form() {
        let node = parse_str("(+ (* a b) (get-at m k))");
        let mut ids = Vec::new();
        node.walk(&mut |n| ids.push(n.id));
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }
}
