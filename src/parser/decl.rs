//! Declaration handlers: functions, state variables, structs, events,
//! interfaces, pragma, and the parameterized type constructors.

use crate::ast::{Node, NodeKind};
use crate::errors::{syntax_error, type_annotation_error, SedraError};
use crate::macros::MacroEnv;
use crate::parser::context::{ConstEntry, ParseContext, Settings};
use crate::parser::{parse_expr_node, stmt, Built};
use crate::syntax::{Span, SyntaxForm};

// ============================================================================
// FUNCTIONS
// ============================================================================

/// `(defn name [args] returns? visibility body ...)`
///
/// The function's node id is reserved before any child parses, so the parent
/// id precedes its subtree. When a return type is declared and the last body
/// form is not a return, the form's value is wrapped in an implicit return.
pub fn parse_defn(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let fn_id = ctx.next_node_id();

    let name = items
        .get(1)
        .and_then(SyntaxForm::as_symbol)
        .ok_or_else(|| syntax_error("defn", "function name must be a symbol", Some(span)))?
        .to_string();

    let arg_items = items
        .get(2)
        .and_then(SyntaxForm::as_vector)
        .ok_or_else(|| {
            syntax_error("defn", "argument list must be a vector", Some(span))
        })?;

    let rest = &items[3..];
    let (returns_form, vis_form, body) = if rest.len() >= 2 && is_visibility_spec(&rest[1]) {
        (Some(&rest[0]), &rest[1], &rest[2..])
    } else if !rest.is_empty() && is_visibility_spec(&rest[0]) {
        (None, &rest[0], &rest[1..])
    } else {
        return Err(syntax_error(
            "defn",
            "missing visibility keyword (e.g. :external)",
            Some(span),
        ));
    };

    let args = parse_args_list(arg_items, items[2].span(), ctx, env)?;
    let returns = returns_form
        .map(|f| parse_expr_node(f, ctx, env))
        .transpose()?
        .map(Box::new);
    let decorators = parse_decorators(vis_form, ctx)?;

    let fn_body = match body.split_last() {
        None => vec![],
        Some((last, init)) => {
            let mut nodes = stmt::parse_statements(init, ctx, env)?;
            if returns.is_some() && !has_return(last) {
                let value = parse_expr_node(last, ctx, env)?;
                nodes.push(Node::new(
                    ctx.next_node_id(),
                    NodeKind::Return {
                        value: Some(Box::new(value)),
                    },
                    last.span(),
                ));
            } else {
                nodes.extend(stmt::parse_statements(std::slice::from_ref(last), ctx, env)?);
            }
            nodes
        }
    };

    Ok(Built::Node(Node::new(
        fn_id,
        NodeKind::FunctionDef {
            name,
            args: Box::new(args),
            returns,
            decorators,
            body: fn_body,
        },
        span,
    )))
}

/// Visibility is a keyword (`:external`) or a vector of keywords
/// (`[:external :payable]`).
fn is_visibility_spec(form: &SyntaxForm) -> bool {
    match form {
        SyntaxForm::Keyword(..) => true,
        SyntaxForm::Vector(items, _) => {
            !items.is_empty() && items.iter().all(|i| i.as_keyword().is_some())
        }
        _ => false,
    }
}

fn parse_decorators(
    vis_form: &SyntaxForm,
    ctx: &mut ParseContext,
) -> Result<Vec<Node>, SedraError> {
    let names: Vec<(&str, Span)> = match vis_form {
        SyntaxForm::Keyword(name, span) => vec![(name, *span)],
        SyntaxForm::Vector(items, _) => items
            .iter()
            .filter_map(|i| i.as_keyword().map(|k| (k, i.span())))
            .collect(),
        _ => {
            return Err(syntax_error(
                "defn",
                "visibility must be a keyword or vector of keywords",
                Some(vis_form.span()),
            ))
        }
    };
    Ok(names
        .into_iter()
        .map(|(name, span)| {
            Node::new(
                ctx.next_node_id(),
                NodeKind::Name { id: name.into() },
                span,
            )
        })
        .collect())
}

/// Typed argument groups: an annotation (keyword or type form) applies to
/// every following name until the next annotation. `[:uint256 x y :address a]`
/// gives x and y the first type and a the second.
fn parse_args_list(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    let mut args = Vec::new();
    let mut current: Option<&SyntaxForm> = None;

    for item in items {
        match item {
            SyntaxForm::Keyword(..) | SyntaxForm::List(..) => current = Some(item),
            SyntaxForm::Symbol(name, arg_span) => {
                let Some(annotation_form) = current else {
                    return Err(type_annotation_error(
                        format!("argument '{name}' has no type annotation"),
                        Some(*arg_span),
                    ));
                };
                // fresh annotation nodes per argument
                let annotation = parse_expr_node(annotation_form, ctx, env)?;
                args.push(Node::new(
                    ctx.next_node_id(),
                    NodeKind::Arg {
                        name: name.clone(),
                        annotation: Box::new(annotation),
                    },
                    *arg_span,
                ));
            }
            other => {
                return Err(syntax_error(
                    "defn",
                    format!("unexpected argument form {}", other.pretty()),
                    Some(other.span()),
                ))
            }
        }
    }

    Ok(Node::new(
        ctx.next_node_id(),
        NodeKind::Arguments { args },
        span,
    ))
}

/// Does any form in this subtree return?
fn has_return(form: &SyntaxForm) -> bool {
    match form {
        SyntaxForm::List(items, _) => {
            if items.first().is_some_and(|h| h.is_symbol("return")) {
                return true;
            }
            items.iter().any(has_return)
        }
        SyntaxForm::Vector(items, _) => items.iter().any(has_return),
        _ => false,
    }
}

// ============================================================================
// VARIABLES AND CONSTANTS
// ============================================================================

/// `(defvar name annotation value?)` builds an annotated assignment; the
/// module assembler promotes top-level ones to variable declarations.
pub fn parse_annassign(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let (target_form, annotation_form, value_form) = match items {
        [_, t, a] => (t, a, None),
        [_, t, a, v] => (t, a, Some(v)),
        _ => {
            return Err(syntax_error(
                "defvar",
                "expected (defvar name annotation value?)",
                Some(span),
            ))
        }
    };
    let target = parse_expr_node(target_form, ctx, env)?;
    let annotation = parse_expr_node(annotation_form, ctx, env)?;
    let value = value_form
        .map(|v| parse_expr_node(v, ctx, env))
        .transpose()?
        .map(Box::new);
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::AnnAssign {
            target: Box::new(target),
            annotation: Box::new(annotation),
            value,
        },
        span,
    )))
}

/// `(defvars name1 type1 name2 type2 ...)` declares several state variables
/// at once.
pub fn parse_defvars(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let pairs = &items[1..];
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(syntax_error(
            "defvars",
            "expected name/type pairs",
            Some(span),
        ));
    }

    let mut decls = Vec::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks(2) {
        decls.push(variable_decl(&pair[0], &pair[1], ctx, env)?);
    }
    Ok(Built::Nodes(decls))
}

/// Build one VariableDecl, deriving visibility flags from a wrapping
/// `(public ...)`, `(immutable ...)`, or `(constant ...)` annotation. The
/// wrapper stays part of the annotation node.
fn variable_decl(
    name_form: &SyntaxForm,
    type_form: &SyntaxForm,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Node, SedraError> {
    let (is_public, is_immutable, is_constant) = match type_form.head_symbol() {
        Some("public") => (true, false, false),
        Some("immutable") => (false, true, false),
        Some("constant") => (false, false, true),
        _ => (false, false, false),
    };
    let target = parse_expr_node(name_form, ctx, env)?;
    let annotation = parse_expr_node(type_form, ctx, env)?;
    let span = name_form.span().merge(type_form.span());
    Ok(Node::new(
        ctx.next_node_id(),
        NodeKind::VariableDecl {
            target: Box::new(target),
            annotation: Box::new(annotation),
            value: None,
            is_constant,
            is_public,
            is_immutable,
        },
        span,
    ))
}

/// `(defconst NAME value)` registers a compile-time substitution and builds
/// nothing.
pub fn parse_defconst(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    _env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, name_form, value_form] = items else {
        return Err(syntax_error(
            "defconst",
            "expected (defconst NAME value)",
            Some(span),
        ));
    };
    let name = name_form.as_symbol().ok_or_else(|| {
        syntax_error(
            "defconst",
            "constant name must be a symbol",
            Some(name_form.span()),
        )
    })?;
    ctx.constants
        .insert(name.to_string(), ConstEntry::Value(value_form.clone()));
    Ok(Built::None)
}

/// `(defimmutable NAME)` reserves a name whose references stay plain; the
/// downstream compiler resolves them.
pub fn parse_defimmutable(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    _env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let name_form = match items {
        [_, n] | [_, n, _] => n,
        _ => {
            return Err(syntax_error(
                "defimmutable",
                "expected (defimmutable NAME type?)",
                Some(span),
            ))
        }
    };
    let name = name_form.as_symbol().ok_or_else(|| {
        syntax_error(
            "defimmutable",
            "immutable name must be a symbol",
            Some(name_form.span()),
        )
    })?;
    ctx.constants
        .insert(name.to_string(), ConstEntry::Immutable);
    Ok(Built::None)
}

// ============================================================================
// AGGREGATES
// ============================================================================

fn parse_fields(
    construct: &str,
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<(String, Vec<Node>), SedraError> {
    let name = items
        .get(1)
        .and_then(SyntaxForm::as_symbol)
        .ok_or_else(|| syntax_error(construct, "name must be a symbol", Some(span)))?
        .to_string();

    let pairs = &items[2..];
    if pairs.len() % 2 != 0 {
        return Err(syntax_error(
            construct,
            "expected field/type pairs",
            Some(span),
        ));
    }

    let mut body = Vec::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks(2) {
        let target = parse_expr_node(&pair[0], ctx, env)?;
        let annotation = parse_expr_node(&pair[1], ctx, env)?;
        let field_span = pair[0].span().merge(pair[1].span());
        body.push(Node::new(
            ctx.next_node_id(),
            NodeKind::AnnAssign {
                target: Box::new(target),
                annotation: Box::new(annotation),
                value: None,
            },
            field_span,
        ));
    }
    Ok((name, body))
}

pub fn parse_defstruct(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let (name, body) = parse_fields("defstruct", items, span, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::StructDef { name, body },
        span,
    )))
}

pub fn parse_defevent(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let (name, body) = parse_fields("defevent", items, span, ctx, env)?;
    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::EventDef { name, body },
        span,
    )))
}

/// `(definterface Name (defn view-fn [...] :uint256 :view) ...)`
pub fn parse_definterface(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let name = items
        .get(1)
        .and_then(SyntaxForm::as_symbol)
        .ok_or_else(|| {
            syntax_error("definterface", "name must be a symbol", Some(span))
        })?
        .to_string();

    let mut body = Vec::with_capacity(items.len() - 2);
    for form in &items[2..] {
        let Some(fn_items) = form.as_list().filter(|l| l.first().is_some_and(|h| h.is_symbol("defn"))) else {
            return Err(syntax_error(
                "definterface",
                "interface body must be defn forms",
                Some(form.span()),
            ));
        };
        match parse_defn(fn_items, form.span(), ctx, env)? {
            Built::Node(n) => body.push(n),
            _ => unreachable!("defn builds a single node"),
        }
    }

    Ok(Built::Node(Node::new(
        ctx.next_node_id(),
        NodeKind::InterfaceDef { name, body },
        span,
    )))
}

// ============================================================================
// PRAGMA
// ============================================================================

/// `(pragma :evm-version "cancun")` sets compilation settings and builds no
/// node.
pub fn parse_pragma(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    _env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let options = &items[1..];
    if options.is_empty() || options.len() % 2 != 0 {
        return Err(syntax_error(
            "pragma",
            "expected option/value pairs",
            Some(span),
        ));
    }

    let mut settings: Settings = ctx.settings.clone();
    for pair in options.chunks(2) {
        let key = pair[0].as_keyword().ok_or_else(|| {
            syntax_error("pragma", "option must be a keyword", Some(pair[0].span()))
        })?;
        let value = match &pair[1] {
            SyntaxForm::Str(s, _) => s.clone(),
            SyntaxForm::Symbol(s, _) => s.clone(),
            other => {
                return Err(syntax_error(
                    "pragma",
                    format!("invalid option value {}", other.pretty()),
                    Some(other.span()),
                ))
            }
        };
        match key {
            "evm-version" => settings.evm_version = Some(value),
            other => {
                return Err(syntax_error(
                    "pragma",
                    format!("unknown option :{other}"),
                    Some(pair[0].span()),
                ))
            }
        }
    }
    Ok(Built::Settings(settings))
}

// ============================================================================
// TYPE CONSTRUCTORS
// ============================================================================

fn subscript_type(
    type_name: &str,
    index: Node,
    span: Span,
    ctx: &mut ParseContext,
) -> Node {
    let name = Node::new(
        ctx.next_node_id(),
        NodeKind::Name {
            id: type_name.into(),
        },
        span,
    );
    Node::new(
        ctx.next_node_id(),
        NodeKind::Subscript {
            value: Box::new(name),
            index: Box::new(index),
        },
        span,
    )
}

/// `(hash-map :address :uint256)` builds `HashMap[address, uint256]`.
pub fn parse_hash_map(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, key_form, value_form] = items else {
        return Err(syntax_error(
            "hash-map",
            "expected (hash-map key-type value-type)",
            Some(span),
        ));
    };
    let key = parse_expr_node(key_form, ctx, env)?;
    let value = parse_expr_node(value_form, ctx, env)?;
    let index = Node::new(
        ctx.next_node_id(),
        NodeKind::Tuple {
            elements: vec![key, value],
        },
        span,
    );
    Ok(Built::Node(subscript_type("HashMap", index, span, ctx)))
}

/// `(dyn-array :uint256 10)` builds `DynArray[uint256, 10]`.
pub fn parse_dyn_array(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, elem_form, cap_form] = items else {
        return Err(syntax_error(
            "dyn-array",
            "expected (dyn-array element-type capacity)",
            Some(span),
        ));
    };
    let elem = parse_expr_node(elem_form, ctx, env)?;
    let cap = parse_expr_node(cap_form, ctx, env)?;
    let index = Node::new(
        ctx.next_node_id(),
        NodeKind::Tuple {
            elements: vec![elem, cap],
        },
        span,
    );
    Ok(Built::Node(subscript_type("DynArray", index, span, ctx)))
}

/// `(string 100)` builds `String[100]`.
pub fn parse_string_type(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    sized_type("string", "String", items, span, ctx, env)
}

/// `(bytes 32)` builds `Bytes[32]`.
pub fn parse_bytes_type(
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    sized_type("bytes", "Bytes", items, span, ctx, env)
}

fn sized_type(
    construct: &str,
    type_name: &str,
    items: &[SyntaxForm],
    span: Span,
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<Built, SedraError> {
    let [_, size_form] = items else {
        return Err(syntax_error(
            construct,
            format!("expected ({construct} max-size)"),
            Some(span),
        ));
    };
    let size = parse_expr_node(size_form, ctx, env)?;
    Ok(Built::Node(subscript_type(type_name, size, span, ctx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_node;
    use crate::syntax::reader::read_one;

    fn setup() -> (ParseContext, MacroEnv) {
        (ParseContext::new("", None), MacroEnv::with_builtins())
    }

    fn parse_str(src: &str) -> Node {
        let (mut ctx, mut env) = setup();
        parse_expr_node(&read_one(src).unwrap(), &mut ctx, &mut env).unwrap()
    }

    #[test]
    fn defn_with_return_type_and_visibility() {
        let node = parse_str("(defn plus [:uint256 x y] :uint256 :external (+ x y))");
        let NodeKind::FunctionDef {
            name,
            args,
            returns,
            decorators,
            body,
        } = node.kind
        else {
            panic!("expected FunctionDef");
        };
        assert_eq!(name, "plus");
        let NodeKind::Arguments { args } = args.kind else {
            panic!("expected Arguments");
        };
        assert_eq!(args.len(), 2);
        assert!(returns.is_some());
        assert!(matches!(decorators[0].kind, NodeKind::Name { ref id } if id == "external"));
        // implicit return wraps the trailing expression
        assert!(matches!(body.last().unwrap().kind, NodeKind::Return { .. }));
    }

    #[test]
    fn defn_id_precedes_its_children() {
        let node = parse_str("(defn f [] :external (pass))");
        let mut min_child = u64::MAX;
        for child in node.children() {
            child.walk(&mut |n| min_child = min_child.min(n.id));
        }
        assert!(node.id < min_child);
    }

    #[test]
    fn defn_without_return_type_keeps_the_last_statement() {
        let node = parse_str("(defn store [:uint256 x] :external (set self/x x))");
        let NodeKind::FunctionDef { returns, body, .. } = node.kind else {
            panic!("expected FunctionDef");
        };
        assert!(returns.is_none());
        assert!(matches!(body.last().unwrap().kind, NodeKind::Assign { .. }));
    }

    #[test]
    fn defn_explicit_return_is_not_double_wrapped() {
        let node = parse_str("(defn f [] :uint256 :external (return 1))");
        let NodeKind::FunctionDef { body, .. } = node.kind else {
            panic!("expected FunctionDef");
        };
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0].kind, NodeKind::Return { value: Some(_) }));
    }

    #[test]
    fn defn_visibility_vector() {
        let node = parse_str("(defn pay [] [:external :payable] (pass))");
        let NodeKind::FunctionDef { decorators, .. } = node.kind else {
            panic!("expected FunctionDef");
        };
        assert_eq!(decorators.len(), 2);
    }

    #[test]
    fn argument_groups_share_the_annotation() {
        let node = parse_str("(defn f [:uint256 x y :address a] :external (pass))");
        let NodeKind::FunctionDef { args, .. } = node.kind else {
            panic!("expected FunctionDef");
        };
        let NodeKind::Arguments { args } = args.kind else {
            panic!("expected Arguments");
        };
        let types: Vec<_> = args
            .iter()
            .map(|a| {
                let NodeKind::Arg { annotation, .. } = &a.kind else {
                    panic!("expected Arg");
                };
                let NodeKind::Name { id } = &annotation.kind else {
                    panic!("expected Name annotation");
                };
                id.clone()
            })
            .collect();
        assert_eq!(types, vec!["uint256", "uint256", "address"]);
    }

    #[test]
    fn untyped_argument_is_an_annotation_error() {
        let (mut ctx, mut env) = setup();
        let form = read_one("(defn f [x] :external (pass))").unwrap();
        let err = parse_node(&form, &mut ctx, &mut env).unwrap_err();
        assert_eq!(err.kind.code(), "sedra::type_annotation");
    }

    #[test]
    fn missing_visibility_is_a_syntax_error() {
        let (mut ctx, mut env) = setup();
        let form = read_one("(defn f [] (pass))").unwrap();
        let err = parse_node(&form, &mut ctx, &mut env).unwrap_err();
        assert_eq!(err.kind.code(), "sedra::syntax");
    }

    #[test]
    fn defvar_builds_an_annotated_assignment() {
        let node = parse_str("(defvar balance :uint256)");
        let NodeKind::AnnAssign { value, .. } = node.kind else {
            panic!("expected AnnAssign");
        };
        assert!(value.is_none());
    }

    #[test]
    fn defvars_builds_one_decl_per_pair() {
        let (mut ctx, mut env) = setup();
        let form =
            read_one("(defvars owner (public :address) balance :uint256)").unwrap();
        let Built::Nodes(nodes) = parse_node(&form, &mut ctx, &mut env).unwrap() else {
            panic!("expected Nodes");
        };
        assert_eq!(nodes.len(), 2);
        let NodeKind::VariableDecl {
            is_public,
            ref annotation,
            ..
        } = nodes[0].kind
        else {
            panic!("expected VariableDecl");
        };
        assert!(is_public);
        // the wrapper call stays part of the annotation
        assert!(matches!(annotation.kind, NodeKind::Call { .. }));
        assert!(
            matches!(nodes[1].kind, NodeKind::VariableDecl { is_public: false, .. })
        );
    }

    #[test]
    fn defstruct_fields_are_annotated_assignments() {
        let node = parse_str("(defstruct Person age :uint256 name (string 100))");
        let NodeKind::StructDef { name, body } = node.kind else {
            panic!("expected StructDef");
        };
        assert_eq!(name, "Person");
        assert_eq!(body.len(), 2);
        assert!(body
            .iter()
            .all(|f| matches!(f.kind, NodeKind::AnnAssign { .. })));
    }

    #[test]
    fn defevent_with_indexed_field() {
        let node = parse_str("(defevent Transfer sender (indexed :address) amount :uint256)");
        let NodeKind::EventDef { body, .. } = node.kind else {
            panic!("expected EventDef");
        };
        let NodeKind::AnnAssign { ref annotation, .. } = body[0].kind else {
            panic!("expected AnnAssign");
        };
        assert!(matches!(annotation.kind, NodeKind::Call { .. }));
    }

    #[test]
    fn definterface_with_mutability_decorators() {
        let node = parse_str(
            "(definterface Token (defn balanceOf [:address who] :uint256 :view) (defn transfer [:address to :uint256 amt] :bool :nonpayable))",
        );
        let NodeKind::InterfaceDef { name, body } = node.kind else {
            panic!("expected InterfaceDef");
        };
        assert_eq!(name, "Token");
        assert_eq!(body.len(), 2);
        assert!(body
            .iter()
            .all(|f| matches!(f.kind, NodeKind::FunctionDef { .. })));
    }

    #[test]
    fn pragma_sets_evm_version() {
        let (mut ctx, mut env) = setup();
        let form = read_one("(pragma :evm-version \"cancun\")").unwrap();
        let Built::Settings(settings) = parse_node(&form, &mut ctx, &mut env).unwrap() else {
            panic!("expected Settings");
        };
        assert_eq!(settings.evm_version.as_deref(), Some("cancun"));
    }

    #[test]
    fn unknown_pragma_option_is_rejected() {
        let (mut ctx, mut env) = setup();
        let form = read_one("(pragma :optimizer :gas)").unwrap();
        assert!(parse_node(&form, &mut ctx, &mut env).is_err());
    }

    #[test]
    fn hash_map_builds_a_two_type_subscript() {
        let node = parse_str("(hash-map :address :uint256)");
        let NodeKind::Subscript { value, index } = node.kind else {
            panic!("expected Subscript");
        };
        assert!(matches!(value.kind, NodeKind::Name { ref id } if id == "HashMap"));
        let NodeKind::Tuple { elements } = index.kind else {
            panic!("expected Tuple index");
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn sized_string_and_bytes_types() {
        let node = parse_str("(string 100)");
        let NodeKind::Subscript { value, .. } = node.kind else {
            panic!("expected Subscript");
        };
        assert!(matches!(value.kind, NodeKind::Name { ref id } if id == "String"));

        let node = parse_str("(bytes 32)");
        let NodeKind::Subscript { value, .. } = node.kind else {
            panic!("expected Subscript");
        };
        assert!(matches!(value.kind, NodeKind::Name { ref id } if id == "Bytes"));
    }

    #[test]
    fn dyn_array_type() {
        let node = parse_str("(dyn-array :uint256 10)");
        let NodeKind::Subscript { value, index } = node.kind else {
            panic!("expected Subscript");
        };
        assert!(matches!(value.kind, NodeKind::Name { ref id } if id == "DynArray"));
        assert!(matches!(index.kind, NodeKind::Tuple { .. }));
    }
}
