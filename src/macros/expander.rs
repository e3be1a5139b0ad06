//! Expansion driver. Walks forms outside-in: a list whose head names a
//! transformer is rewritten and the result re-expanded (to a fixpoint, under
//! a depth bound); everything else is walked structurally. A transformer that
//! returns several forms has them spliced into the surrounding sequence.
//!
//! Each transformer invocation gets a fresh scope mark from the parse
//! context, and forms that pass through it accumulate that mark.

use crate::errors::{macro_error, syntax_error, SedraError};
use crate::macros::env::{Expansion, MacroEnv, Transformer};
use crate::macros::rules::{PatternRule, RulesMacro};
use crate::parser::context::ParseContext;
use crate::syntax::{Syntax, SyntaxForm};

/// Nested rewrites beyond this depth are reported as runaway recursion.
pub const MAX_EXPANSION_DEPTH: usize = 128;

// ============================================================================
// EXPANSION
// ============================================================================

/// Fully expand one form.
pub fn expand(
    form: &SyntaxForm,
    env: &mut MacroEnv,
    ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    expand_at(form, &[], env, ctx, 0)
}

/// Fully expand one form, requiring a single-form result.
pub fn expand_one(
    form: &SyntaxForm,
    env: &mut MacroEnv,
    ctx: &mut ParseContext,
) -> Result<SyntaxForm, SedraError> {
    match expand(form, env, ctx)? {
        Expansion::One(f) => Ok(f),
        Expansion::Many(_) => Err(macro_error(
            "expansion",
            "macro produced several forms in a single-form position",
            Some(form.span()),
        )),
    }
}

/// Expand a module-level form sequence: `define-syntax` forms register their
/// macro and vanish, everything else expands with splicing.
pub fn expand_forms(
    forms: &[SyntaxForm],
    env: &mut MacroEnv,
    ctx: &mut ParseContext,
) -> Result<Vec<SyntaxForm>, SedraError> {
    let mut out = Vec::with_capacity(forms.len());
    for form in forms {
        if form.head_symbol() == Some("define-syntax") {
            compile_define_syntax(form, env)?;
            continue;
        }
        match expand(form, env, ctx)? {
            Expansion::One(f) => out.push(f),
            Expansion::Many(fs) => out.extend(fs),
        }
    }
    Ok(out)
}

fn expand_at(
    form: &SyntaxForm,
    scopes: &[u64],
    env: &mut MacroEnv,
    ctx: &mut ParseContext,
    depth: usize,
) -> Result<Expansion, SedraError> {
    if depth > MAX_EXPANSION_DEPTH {
        return Err(macro_error(
            "expansion",
            format!("recursion limit of {MAX_EXPANSION_DEPTH} exceeded"),
            Some(form.span()),
        ));
    }

    // Macro definitions are data, not calls; their patterns and templates
    // must not expand.
    if form.head_symbol() == Some("define-syntax") {
        return Ok(Expansion::One(form.clone()));
    }

    if let Some(name) = form.head_symbol() {
        if let Some(transformer) = env.lookup(name).cloned() {
            let mark = ctx.next_mark();
            let stx = Syntax::with_scopes(form.clone(), scopes.to_vec());
            let result = match transformer {
                Transformer::Rules(m) => Expansion::One(m.expand(&stx)?),
                Transformer::Native(f) => f(&stx, env, ctx)?,
            };
            let mut inner_scopes = scopes.to_vec();
            inner_scopes.push(mark);
            return match result {
                Expansion::One(f) => expand_at(&f, &inner_scopes, env, ctx, depth + 1),
                Expansion::Many(fs) => {
                    let mut out = Vec::with_capacity(fs.len());
                    for f in &fs {
                        match expand_at(f, &inner_scopes, env, ctx, depth + 1)? {
                            Expansion::One(e) => out.push(e),
                            Expansion::Many(es) => out.extend(es),
                        }
                    }
                    Ok(Expansion::Many(out))
                }
            };
        }
    }

    match form {
        SyntaxForm::List(items, span) => {
            let expanded = expand_elements(items, scopes, env, ctx, depth)?;
            Ok(Expansion::One(SyntaxForm::List(expanded, *span)))
        }
        SyntaxForm::Vector(items, span) => {
            let expanded = expand_elements(items, scopes, env, ctx, depth)?;
            Ok(Expansion::One(SyntaxForm::Vector(expanded, *span)))
        }
        other => Ok(Expansion::One(other.clone())),
    }
}

/// Expand every element of a sequence, splicing multi-form results in place.
fn expand_elements(
    items: &[SyntaxForm],
    scopes: &[u64],
    env: &mut MacroEnv,
    ctx: &mut ParseContext,
    depth: usize,
) -> Result<Vec<SyntaxForm>, SedraError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match expand_at(item, scopes, env, ctx, depth)? {
            Expansion::One(f) => out.push(f),
            Expansion::Many(fs) => out.extend(fs),
        }
    }
    Ok(out)
}

// ============================================================================
// DEFINE-SYNTAX
// ============================================================================

/// Compile `(define-syntax NAME (syntax-rules (lit ...) (pattern template) ...))`
/// into a registered pattern macro.
pub fn compile_define_syntax(
    form: &SyntaxForm,
    env: &mut MacroEnv,
) -> Result<(), SedraError> {
    let span = form.span();
    let Some([_, name_form, spec]) = form.as_list() else {
        return Err(syntax_error(
            "define-syntax",
            "requires a name and a syntax-rules specification",
            Some(span),
        ));
    };
    let Some(name) = name_form.as_symbol() else {
        return Err(syntax_error(
            "define-syntax",
            "macro name must be a symbol",
            Some(name_form.span()),
        ));
    };
    let Some(spec_items) = spec.as_list() else {
        return Err(syntax_error(
            "define-syntax",
            "specification must be a syntax-rules form",
            Some(spec.span()),
        ));
    };
    if spec_items.first().and_then(SyntaxForm::as_symbol) != Some("syntax-rules") {
        return Err(syntax_error(
            "define-syntax",
            "only syntax-rules specifications are supported",
            Some(spec.span()),
        ));
    }

    let mut rest = &spec_items[1..];
    let mut literals = Vec::new();
    if let Some(lits) = rest.first().and_then(SyntaxForm::as_sequence) {
        literals = lits
            .iter()
            .filter_map(|l| l.as_symbol().map(String::from))
            .collect();
        rest = &rest[1..];
    }

    let mut rules = Vec::with_capacity(rest.len());
    for clause in rest {
        let Some([pattern, template]) = clause.as_list() else {
            return Err(syntax_error(
                "define-syntax",
                "each syntax-rules clause must be a (pattern template) pair",
                Some(clause.span()),
            ));
        };
        rules.push(PatternRule {
            pattern: pattern.clone(),
            template: template.clone(),
        });
    }

    env.define(name, Transformer::Rules(RulesMacro::new(name, literals, rules)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::reader::{read_all, read_one};

    fn env_and_ctx() -> (MacroEnv, ParseContext) {
        (MacroEnv::with_builtins(), ParseContext::new("", None))
    }

    fn expand_str(env: &mut MacroEnv, ctx: &mut ParseContext, src: &str) -> String {
        let form = read_one(src).unwrap();
        expand_one(&form, env, ctx).unwrap().pretty()
    }

    #[test]
    fn non_macro_forms_pass_through() {
        let (mut env, mut ctx) = env_and_ctx();
        assert_eq!(expand_str(&mut env, &mut ctx, "(+ 1 2)"), "(+ 1 2)");
        assert_eq!(expand_str(&mut env, &mut ctx, "x"), "x");
    }

    #[test]
    fn macros_expand_in_nested_positions() {
        let (mut env, mut ctx) = env_and_ctx();
        assert_eq!(
            expand_str(&mut env, &mut ctx, "(defn f [] (when a b))"),
            "(defn f [] (if a (do b)))"
        );
    }

    #[test]
    fn expansion_reaches_a_fixpoint() {
        let (mut env, mut ctx) = env_and_ctx();
        // cond expands to if-of-cond; the inner cond must expand too.
        assert_eq!(
            expand_str(&mut env, &mut ctx, "(cond a 1 b 2 c 3)"),
            "(if a 1 (if b 2 (if c 3)))"
        );
    }

    #[test]
    fn define_syntax_registers_and_vanishes() {
        let (mut env, mut ctx) = env_and_ctx();
        let forms = read_all(
            "(define-syntax double (syntax-rules () ((double x) (+ x x)))) (double y)",
        )
        .unwrap();
        let out = expand_forms(&forms, &mut env, &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pretty(), "(+ y y)");
    }

    #[test]
    fn user_macros_shadow_builtins() {
        let (mut env, mut ctx) = env_and_ctx();
        let forms =
            read_all("(define-syntax when (syntax-rules () ((when t b) (only-if t b)))) (when x y)")
                .unwrap();
        let out = expand_forms(&forms, &mut env, &mut ctx).unwrap();
        assert_eq!(out[0].pretty(), "(only-if x y)");
    }

    #[test]
    fn self_recursive_macro_hits_the_depth_bound() {
        let (mut env, mut ctx) = env_and_ctx();
        let forms = read_all("(define-syntax loop (syntax-rules () ((loop x) (loop x))))").unwrap();
        expand_forms(&forms, &mut env, &mut ctx).unwrap();
        let call = read_one("(loop 1)").unwrap();
        let err = expand_one(&call, &mut env, &mut ctx).unwrap_err();
        assert!(err.to_string().contains("recursion limit"));
    }

    #[test]
    fn malformed_define_syntax_is_rejected() {
        let (mut env, _) = env_and_ctx();
        let form = read_one("(define-syntax 42 (syntax-rules ()))").unwrap();
        assert!(compile_define_syntax(&form, &mut env).is_err());
        let form = read_one("(define-syntax m (not-syntax-rules))").unwrap();
        assert!(compile_define_syntax(&form, &mut env).is_err());
    }

    #[test]
    fn marks_advance_per_transformer_invocation() {
        let (mut env, mut ctx) = env_and_ctx();
        let before = ctx.next_mark();
        let form = read_one("(when a (when b c))").unwrap();
        expand_one(&form, &mut env, &mut ctx).unwrap();
        let after = ctx.next_mark();
        // two invocations happened in between
        assert!(after >= before + 3);
    }
}
