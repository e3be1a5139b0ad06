//! External-interface synthesis for `interface!`: renders a compiled
//! module's external surface back into a `definterface` source form.

use std::path::Path;

use crate::ast::{Node, NodeKind};
use crate::errors::{unsupported_error, SedraError};
use crate::syntax::{keyword, list, symbol, Span, SyntaxForm};

const MUTABILITIES: [&str; 3] = ["view", "pure", "payable"];

/// Build `(definterface Name (defn f [...] ret :mutability) ...)` covering
/// every external function of `module` except the constructor.
pub fn external_interface_form(
    module: &Node,
    path: &Path,
    span: Span,
) -> Result<SyntaxForm, SedraError> {
    let NodeKind::Module { body, .. } = &module.kind else {
        return Err(unsupported_error("interface target is not a module", Some(span)));
    };

    let mut items = vec![
        symbol("definterface", span),
        symbol(contract_name(path), span),
    ];

    for node in body {
        let NodeKind::FunctionDef {
            name,
            args,
            returns,
            decorators,
            ..
        } = &node.kind
        else {
            continue;
        };
        if name == "__init__" || !has_decorator(decorators, "external") {
            continue;
        }

        let mut fn_items = vec![symbol("defn", span), symbol(name.clone(), span)];
        fn_items.push(args_vector(args, span)?);
        if let Some(ret) = returns {
            fn_items.push(type_form(ret, span)?);
        }
        fn_items.push(keyword(mutability(decorators), span));
        items.push(list(fn_items, span));
    }

    Ok(list(items, span))
}

/// `my_token.sedra` names the interface `MyToken`; stems without underscores
/// keep their spelling.
fn contract_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.contains('_') {
        stem.split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    } else {
        stem
    }
}

fn has_decorator(decorators: &[Node], name: &str) -> bool {
    decorators
        .iter()
        .any(|d| matches!(&d.kind, NodeKind::Name { id } if id == name))
}

fn mutability(decorators: &[Node]) -> String {
    for m in MUTABILITIES {
        if has_decorator(decorators, m) {
            return m.to_string();
        }
    }
    "nonpayable".to_string()
}

/// Render the argument list, grouping consecutive arguments that share a
/// type under one annotation.
fn args_vector(args: &Node, span: Span) -> Result<SyntaxForm, SedraError> {
    let NodeKind::Arguments { args } = &args.kind else {
        return Err(unsupported_error("malformed argument list", Some(span)));
    };

    let mut out = Vec::new();
    let mut current: Option<String> = None;
    for arg in args {
        let NodeKind::Arg { name, annotation } = &arg.kind else {
            return Err(unsupported_error("malformed argument", Some(span)));
        };
        let tf = type_form(annotation, span)?;
        let rendered = tf.pretty();
        if current.as_deref() != Some(&rendered) {
            out.push(tf);
            current = Some(rendered);
        }
        out.push(symbol(name.clone(), span));
    }
    Ok(SyntaxForm::Vector(out, span))
}

/// Render a type annotation node back into source syntax: `:uint256`,
/// `(string 100)`, `(array :uint8 3)`, and the like.
fn type_form(node: &Node, span: Span) -> Result<SyntaxForm, SedraError> {
    match &node.kind {
        NodeKind::Name { id } => Ok(keyword(id.clone(), span)),
        NodeKind::Subscript { value, index } => {
            let NodeKind::Name { id } = &value.kind else {
                return Err(unsupported_error(
                    "interface rendering of this type",
                    Some(span),
                ));
            };
            match id.as_str() {
                "String" => Ok(list(
                    vec![symbol("string", span), index_form(index, span)?],
                    span,
                )),
                "Bytes" => Ok(list(
                    vec![symbol("bytes", span), index_form(index, span)?],
                    span,
                )),
                "DynArray" => {
                    let NodeKind::Tuple { elements } = &index.kind else {
                        return Err(unsupported_error(
                            "interface rendering of this type",
                            Some(span),
                        ));
                    };
                    let mut items = vec![symbol("dyn-array", span)];
                    for e in elements {
                        items.push(index_form(e, span)?);
                    }
                    Ok(list(items, span))
                }
                _ => Ok(list(
                    vec![
                        symbol("array", span),
                        keyword(id.clone(), span),
                        index_form(index, span)?,
                    ],
                    span,
                )),
            }
        }
        _ => Err(unsupported_error(
            "interface rendering of this type",
            Some(span),
        )),
    }
}

fn index_form(node: &Node, span: Span) -> Result<SyntaxForm, SedraError> {
    match &node.kind {
        NodeKind::Int { value } => Ok(SyntaxForm::Int(*value, span)),
        NodeKind::Name { id } => Ok(keyword(id.clone(), span)),
        NodeKind::Subscript { .. } => type_form(node, span),
        _ => Err(unsupported_error(
            "interface rendering of this type",
            Some(span),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_src;

    fn interface_for(src: &str, file: &str) -> String {
        let compiled = compile_src(src, None).unwrap();
        external_interface_form(&compiled.module, Path::new(file), Span::default())
            .unwrap()
            .pretty()
    }

    #[test]
    fn renders_external_functions_only() {
        let out = interface_for(
            "(defn getOwner [] :address :external (return self/owner)) \
             (defn helper [] :uint256 :internal (return 1)) \
             (defvars owner (public :address))",
            "vault.sedra",
        );
        assert!(out.starts_with("(definterface vault"));
        assert!(out.contains("(defn getOwner [] :address :nonpayable)"));
        assert!(!out.contains("helper"));
    }

    #[test]
    fn constructor_is_skipped() {
        let out = interface_for(
            "(defn __init__ [:address owner] :external (set self/owner owner)) \
             (defvars owner :address)",
            "vault.sedra",
        );
        assert!(!out.contains("__init__"));
    }

    #[test]
    fn mutability_comes_from_decorators() {
        let out = interface_for(
            "(defn peek [] :uint256 [:external :view] (return 1))",
            "box.sedra",
        );
        assert!(out.contains("(defn peek [] :uint256 :view)"));
    }

    #[test]
    fn underscored_stems_capitalize() {
        assert_eq!(contract_name(Path::new("my_token.sedra")), "MyToken");
        assert_eq!(contract_name(Path::new("vault.sedra")), "vault");
    }

    #[test]
    fn argument_type_groups_collapse() {
        let out = interface_for(
            "(defn take [:uint256 a b :address who] :bool :external (return True))",
            "taker.sedra",
        );
        assert!(out.contains("[:uint256 a b :address who]"));
    }

    #[test]
    fn sized_types_render_as_constructors() {
        let out = interface_for(
            "(defn label [] (string 64) :external (return self/name)) \
             (defvars name (string 64))",
            "labeled.sedra",
        );
        assert!(out.contains("(defn label [] (string 64) :nonpayable)"));
    }
}
