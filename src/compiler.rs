//! Compile entry points: source text in, module tree and settings out.
//!
//! The pipeline is read, expand, synthesize, assemble. Assembly partitions
//! top-level nodes into declarations and functions, promotes annotated
//! assignments to variable declarations, and emits the module body with all
//! declarations ahead of all functions.

use std::path::Path;

use crate::ast::{Node, NodeKind};
use crate::errors::{read_error, syntax_error, SedraError, SourceContext};
use crate::macros::{expander, MacroEnv};
use crate::parser::context::ParseContext;
use crate::parser::{self, Built, Settings};
use crate::syntax::{reader, Span};

/// Result of compiling one source unit.
#[derive(Debug)]
pub struct Compilation {
    pub module: Node,
    pub settings: Settings,
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

pub fn compile_src(src: &str, path: Option<&Path>) -> Result<Compilation, SedraError> {
    let mut ctx = ParseContext::new(src, path);
    let mut env = MacroEnv::with_builtins();

    let unit_name = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string());

    match parse_with_context(&mut ctx, &mut env) {
        Ok((module, settings)) => Ok(Compilation { module, settings }),
        Err(e) => Err(e.with_source(&SourceContext::from_file(unit_name, src))),
    }
}

pub fn compile_file(path: &Path) -> Result<Compilation, SedraError> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| read_error(format!("cannot read {}: {e}", path.display()), None))?;
    compile_src(&src, Some(path))
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Run the full pipeline inside an existing context. `interface!` uses this
/// for its nested compilations.
pub fn parse_with_context(
    ctx: &mut ParseContext,
    env: &mut MacroEnv,
) -> Result<(Node, Settings), SedraError> {
    // The module owns id 0; everything else comes after.
    let module_id = ctx.next_node_id();

    let source = ctx.source_text.clone();
    let forms = reader::read_all(&source)?;
    let expanded = expander::expand_forms(&forms, env, ctx)?;

    let mut decls = Vec::new();
    let mut fns = Vec::new();
    for form in &expanded {
        let built = parser::parse_node(form, ctx, env)?;
        partition(built, form.span(), ctx, &mut decls, &mut fns)?;
    }

    let span = forms
        .first()
        .map(|f| f.span())
        .unwrap_or_default()
        .merge(forms.last().map(|f| f.span()).unwrap_or_default());

    let body: Vec<Node> = decls
        .into_iter()
        .chain(fns)
        .map(|n| n.with_source(source.clone()))
        .collect();

    let module = Node::new(
        module_id,
        NodeKind::Module {
            name: module_name(ctx),
            doc_string: String::new(),
            body,
        },
        span,
    )
    .with_source(source);

    Ok((module, ctx.settings.clone()))
}

fn module_name(ctx: &ParseContext) -> String {
    ctx.source_path
        .as_deref()
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sort one parse result into the declaration or function section, promoting
/// top-level annotated assignments to variable declarations.
fn partition(
    built: Built,
    span: Span,
    ctx: &mut ParseContext,
    decls: &mut Vec<Node>,
    fns: &mut Vec<Node>,
) -> Result<(), SedraError> {
    match built {
        Built::None => {}
        Built::Settings(settings) => ctx.settings = settings,
        Built::Nodes(nodes) => {
            for node in nodes {
                partition(Built::Node(node), span, ctx, decls, fns)?;
            }
        }
        Built::Node(node) => {
            let node_span = node.span;
            match node.kind {
                NodeKind::AnnAssign {
                    target,
                    annotation,
                    value,
                } => {
                    let (is_public, is_immutable, is_constant) =
                        annotation_flags(&annotation);
                    decls.push(Node::new(
                        ctx.next_node_id(),
                        NodeKind::VariableDecl {
                            target,
                            annotation,
                            value,
                            is_constant,
                            is_public,
                            is_immutable,
                        },
                        node_span,
                    ));
                }
                NodeKind::VariableDecl { .. }
                | NodeKind::StructDef { .. }
                | NodeKind::EventDef { .. }
                | NodeKind::InterfaceDef { .. } => decls.push(node),
                NodeKind::FunctionDef { .. } => fns.push(node),
                _ => {
                    return Err(syntax_error(
                        "module",
                        "unrecognized top-level form",
                        Some(span),
                    ))
                }
            }
        }
    }
    Ok(())
}

fn annotation_flags(annotation: &Node) -> (bool, bool, bool) {
    let NodeKind::Call { func, .. } = &annotation.kind else {
        return (false, false, false);
    };
    let NodeKind::Name { id } = &func.kind else {
        return (false, false, false);
    };
    match id.as_str() {
        "public" => (true, false, false),
        "immutable" => (false, true, false),
        "constant" => (false, false, true),
        _ => (false, false, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_body(src: &str) -> Vec<Node> {
        let compiled = compile_src(src, None).unwrap();
        let NodeKind::Module { body, .. } = compiled.module.kind else {
            panic!("expected Module");
        };
        body
    }

    #[test]
    fn module_owns_node_id_zero() {
        let compiled = compile_src("(defvars x :uint256)", None).unwrap();
        assert_eq!(compiled.module.id, 0);
    }

    #[test]
    fn declarations_precede_functions() {
        let body = module_body(
            "(defn get [] :uint256 :external (return self/x)) (defvars x :uint256)",
        );
        assert!(matches!(body[0].kind, NodeKind::VariableDecl { .. }));
        assert!(matches!(body[1].kind, NodeKind::FunctionDef { .. }));
    }

    #[test]
    fn top_level_defvar_promotes_to_variable_decl() {
        let body = module_body("(defvar fee (public :uint256))");
        let NodeKind::VariableDecl { is_public, .. } = body[0].kind else {
            panic!("expected VariableDecl");
        };
        assert!(is_public);
    }

    #[test]
    fn pragma_feeds_settings() {
        let compiled =
            compile_src("(pragma :evm-version \"paris\") (defvars x :uint256)", None).unwrap();
        assert_eq!(compiled.settings.evm_version.as_deref(), Some("paris"));
    }

    #[test]
    fn stray_expression_at_top_level_is_rejected() {
        let err = compile_src("(+ 1 2)", None).unwrap_err();
        assert_eq!(err.kind.code(), "sedra::syntax");
    }

    #[test]
    fn errors_carry_attached_source() {
        let err = compile_src("(defn broken [x] :external (pass))", None).unwrap_err();
        assert!(err.source_code.is_some());
    }

    #[test]
    fn module_name_comes_from_the_path_stem() {
        let compiled =
            compile_src("(defvars x :uint256)", Some(Path::new("contracts/vault.sedra")))
                .unwrap();
        let NodeKind::Module { name, .. } = compiled.module.kind else {
            panic!("expected Module");
        };
        assert_eq!(name, "vault");
    }
}
