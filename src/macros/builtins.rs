//! The builtin macro set: pattern macros defined in a source prelude, plus
//! procedural macros (threading, doto, set-self, include!, interface!) that
//! need real computation or filesystem access.

use std::path::PathBuf;

use crate::errors::{circular_dependency_error, macro_error, SedraError};
use crate::macros::env::{Expansion, MacroEnv, Transformer};
use crate::macros::expander;
use crate::parser::context::{absolute, ParseContext};
use crate::syntax::reader::read_all;
use crate::syntax::{symbol, Syntax, SyntaxForm};

// ============================================================================
// PATTERN-MACRO PRELUDE
// ============================================================================

/// Builtins that are ordinary `syntax-rules` macros, written as source.
/// Rule order matters: the first matching pattern wins, so terminal cases
/// precede recursive ones.
const PRELUDE: &str = r#"
(define-syntax cond
  (syntax-rules (else)
    ((cond :else e) e)
    ((cond test expr) (if test expr))
    ((cond test expr :else e) (if test expr e))
    ((cond test expr rest ...) (if test expr (cond rest ...)))))

(define-syntax when
  (syntax-rules ()
    ((when test body ...) (if test (do body ...)))))

(define-syntax unless
  (syntax-rules ()
    ((unless test body ...) (if test None (do body ...)))))

(define-syntax let
  (syntax-rules ()
    ((let [] body ...) (do body ...))
    ((let [x v rest ...] body ...)
     (do (defvar x v) (let [rest ...] body ...)))))

(define-syntax set-in
  (syntax-rules ()
    ((set-in obj field new) (set (. obj field) new))))

(define-syntax get-at
  (syntax-rules ()
    ((get-at obj key) (subscript obj key))
    ((get-at obj key rest ...) (get-at (subscript obj key) rest ...))))

(define-syntax get-at!
  (syntax-rules ()
    ((get-at! obj []) obj)
    ((get-at! obj [k]) (subscript obj k))
    ((get-at! obj [k rest ...]) (get-at! (subscript obj k) [rest ...]))))

(define-syntax set-at
  (syntax-rules ()
    ((set-at obj key value) (set (subscript obj key) value))
    ((set-at obj key rest ... value)
     (set-at (subscript obj key) rest ... value))))

(define-syntax set-at!
  (syntax-rules ()
    ((set-at! obj keys val) (set (get-at! obj keys) val))))
"#;

/// Install the full builtin set into `env`. User `define-syntax` may shadow
/// any of these later.
pub fn install_builtins(env: &mut MacroEnv) {
    let forms = read_all(PRELUDE).expect("builtin macro prelude is well-formed");
    for form in forms {
        expander::compile_define_syntax(&form, env)
            .expect("builtin macro prelude compiles");
    }

    env.define("->", Transformer::Native(thread_first));
    env.define("->>", Transformer::Native(thread_last));
    env.define("doto", Transformer::Native(doto));
    env.define("set-self", Transformer::Native(set_self));
    env.define("include!", Transformer::Native(include_file));
    env.define("interface!", Transformer::Native(interface_of));
}

// ============================================================================
// THREADING MACROS
// ============================================================================

/// `(-> x (f a) g)` pipes `x` through each step as the FIRST argument:
/// `(g (f x a))`.
fn thread_first(
    call: &Syntax,
    _env: &mut MacroEnv,
    _ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    thread(call, "->", |step_head, acc, rest| {
        let mut items = vec![step_head, acc];
        items.extend(rest);
        items
    })
}

/// `(->> x (f a) g)` pipes `x` through each step as the LAST argument:
/// `(g (f a x))`.
fn thread_last(
    call: &Syntax,
    _env: &mut MacroEnv,
    _ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    thread(call, "->>", |step_head, acc, rest| {
        let mut items = vec![step_head];
        items.extend(rest);
        items.push(acc);
        items
    })
}

fn thread(
    call: &Syntax,
    name: &str,
    weave: impl Fn(SyntaxForm, SyntaxForm, Vec<SyntaxForm>) -> Vec<SyntaxForm>,
) -> Result<Expansion, SedraError> {
    let span = call.span();
    let Some([_, seed, steps @ ..]) = call.datum.as_list() else {
        return Err(macro_error(name, "requires an initial value", Some(span)));
    };

    let mut acc = seed.clone();
    for step in steps {
        acc = match step.as_list() {
            Some([head, rest @ ..]) => SyntaxForm::List(
                weave(head.clone(), acc, rest.to_vec()),
                step.span(),
            ),
            // A bare name threads as a one-argument call.
            _ => SyntaxForm::List(vec![step.clone(), acc], step.span()),
        };
    }
    Ok(Expansion::One(acc))
}

// ============================================================================
// DOTO / SET-SELF
// ============================================================================

/// `(doto obj (f a) g)` runs each step with `obj` spliced in as the first
/// argument and wraps the calls in a `(do ...)`.
fn doto(
    call: &Syntax,
    _env: &mut MacroEnv,
    _ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    let span = call.span();
    let Some([_, obj, steps @ ..]) = call.datum.as_list() else {
        return Err(macro_error("doto", "requires a target object", Some(span)));
    };

    let mut calls = vec![symbol("do", span)];
    for step in steps {
        let call_form = match step.as_list() {
            Some([head, rest @ ..]) => {
                let mut items = vec![head.clone(), obj.clone()];
                items.extend(rest.iter().cloned());
                SyntaxForm::List(items, step.span())
            }
            _ => SyntaxForm::List(vec![step.clone(), obj.clone()], step.span()),
        };
        calls.push(call_form);
    }
    Ok(Expansion::One(SyntaxForm::List(calls, span)))
}

/// `(set-self a b)` expands to `(do (set (. self a) a) (set (. self b) b))`,
/// the constructor idiom for copying arguments into storage.
fn set_self(
    call: &Syntax,
    _env: &mut MacroEnv,
    _ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    let span = call.span();
    let Some([_, names @ ..]) = call.datum.as_list() else {
        return Err(macro_error("set-self", "expected a call form", Some(span)));
    };

    let mut assigns = vec![symbol("do", span)];
    for name in names {
        let target = SyntaxForm::List(
            vec![symbol(".", name.span()), symbol("self", name.span()), name.clone()],
            name.span(),
        );
        assigns.push(SyntaxForm::List(
            vec![symbol("set", name.span()), target, name.clone()],
            name.span(),
        ));
    }
    Ok(Expansion::One(SyntaxForm::List(assigns, span)))
}

// ============================================================================
// FILE MACROS
// ============================================================================

fn filename_argument<'a>(
    call: &'a Syntax,
    name: &str,
) -> Result<&'a str, SedraError> {
    let span = call.span();
    let Some([_, arg]) = call.datum.as_list() else {
        return Err(macro_error(
            name,
            "requires exactly one filename argument",
            Some(span),
        ));
    };
    let SyntaxForm::Str(fname, _) = arg else {
        return Err(macro_error(
            name,
            "filename must be a string literal",
            Some(span),
        ));
    };
    Ok(fname)
}

fn check_cycle(
    ctx: &ParseContext,
    path: &std::path::Path,
    call: &Syntax,
) -> Result<PathBuf, SedraError> {
    let abs = absolute(path);
    if ctx.include_stack.contains(&abs) {
        let mut stack: Vec<PathBuf> = ctx.include_stack.iter().cloned().collect();
        stack.sort();
        return Err(circular_dependency_error(
            path.to_path_buf(),
            stack,
            Some(call.span()),
        ));
    }
    Ok(abs)
}

/// `(include! "file.sedra")` reads the target and splices its expanded forms
/// into the including module. The target stays on the include stack while its
/// own forms expand, so cycles through any chain of includes are caught.
fn include_file(
    call: &Syntax,
    env: &mut MacroEnv,
    ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    let fname = filename_argument(call, "include!")?;
    let path = ctx.resolve_path(fname);
    let abs = check_cycle(ctx, &path, call)?;

    let src = std::fs::read_to_string(&path).map_err(|e| {
        macro_error(
            "include!",
            format!("cannot read {}: {e}", path.display()),
            Some(call.span()),
        )
    })?;
    let forms = read_all(&src)?;

    ctx.include_stack.insert(abs.clone());
    let expanded = expander::expand_forms(&forms, env, ctx);
    ctx.include_stack.remove(&abs);

    expanded.map(Expansion::Many)
}

/// `(interface! "file.sedra")` compiles the target in a nested context and
/// expands to a `definterface` form describing its external surface.
fn interface_of(
    call: &Syntax,
    _env: &mut MacroEnv,
    ctx: &mut ParseContext,
) -> Result<Expansion, SedraError> {
    let fname = filename_argument(call, "interface!")?;
    let path = ctx.resolve_path(fname);
    check_cycle(ctx, &path, call)?;

    let src = std::fs::read_to_string(&path).map_err(|e| {
        macro_error(
            "interface!",
            format!("cannot read {}: {e}", path.display()),
            Some(call.span()),
        )
    })?;

    let mut sub_ctx = ctx.sub_context(&src, &path);
    let mut sub_env = MacroEnv::with_builtins();
    let (module, _) = crate::compiler::parse_with_context(&mut sub_ctx, &mut sub_env)?;

    let form = crate::parser::interface::external_interface_form(&module, &path, call.span())?;
    Ok(Expansion::One(form))
}
