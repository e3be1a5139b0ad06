//! Pattern/template rewriting for `syntax-rules` macros.
//!
//! Matching is structural and span-insensitive. `...` after a subpattern
//! matches a greedy run: the matcher tries the longest run first and
//! backtracks until the rest of the sequence matches, so a trailing fixed
//! element (as in `(set-at target key ... value)`) anchors correctly.

use std::collections::{HashMap, HashSet};

use crate::errors::{macro_error, SedraError};
use crate::syntax::{Span, Syntax, SyntaxForm};

pub const ELLIPSIS: &str = "...";

/// Pattern variables captured during a match. Each variable accumulates the
/// forms it bound, in input order; ellipsis variables may bind zero.
pub type Bindings = HashMap<String, Vec<SyntaxForm>>;

// ============================================================================
// RULES MACRO
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    pub pattern: SyntaxForm,
    pub template: SyntaxForm,
}

/// A compiled `syntax-rules` transformer: an ordered rule list plus the
/// literal identifiers that must match themselves instead of binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RulesMacro {
    pub name: String,
    pub literals: HashSet<String>,
    pub rules: Vec<PatternRule>,
}

impl RulesMacro {
    pub fn new(
        name: impl Into<String>,
        literals: impl IntoIterator<Item = String>,
        rules: Vec<PatternRule>,
    ) -> Self {
        Self {
            name: name.into(),
            literals: literals.into_iter().collect(),
            rules,
        }
    }

    /// Expand one invocation. Rules are tried in order; the first match wins.
    pub fn expand(&self, call: &Syntax) -> Result<SyntaxForm, SedraError> {
        for rule in &self.rules {
            if let Some(binds) = self.try_rule(rule, call) {
                return substitute(&rule.template, &binds, &self.name);
            }
        }
        Err(macro_error(
            &self.name,
            format!("no pattern matched {}", call.datum.pretty()),
            Some(call.span()),
        ))
    }

    fn try_rule(&self, rule: &PatternRule, call: &Syntax) -> Option<Bindings> {
        let (pattern, input) = strip_macro_head(&self.name, &rule.pattern, &call.datum);

        let binds = match_form(&pattern, &input, &self.literals, Bindings::new())?;

        // A nominal match that bound nothing, where both sides are one
        // nested sequence deep, usually means the rule was written one level
        // inward. Retry against the inner forms before accepting it.
        if binds.is_empty() {
            if let (Some([inner_p]), Some([inner_d])) =
                (pattern.as_sequence(), input.as_sequence())
            {
                if inner_p.as_sequence().is_some() && inner_d.as_sequence().is_some() {
                    if let Some(inner) =
                        match_form(inner_p, inner_d, &self.literals, Bindings::new())
                    {
                        return Some(inner);
                    }
                }
            }
        }

        Some(binds)
    }
}

/// When the rule pattern opens with the macro's own name, drop that head from
/// both pattern and input so the rule body matches the arguments.
fn strip_macro_head(
    name: &str,
    pattern: &SyntaxForm,
    input: &SyntaxForm,
) -> (SyntaxForm, SyntaxForm) {
    let (Some(p_items), Some(d_items)) = (pattern.as_list(), input.as_list()) else {
        return (pattern.clone(), input.clone());
    };
    let (Some(p_head), Some(d_head)) = (p_items.first(), d_items.first()) else {
        return (pattern.clone(), input.clone());
    };
    if p_head.as_symbol() == Some(name) && d_head.as_symbol() == Some(name) {
        return (
            SyntaxForm::List(p_items[1..].to_vec(), pattern.span()),
            SyntaxForm::List(d_items[1..].to_vec(), input.span()),
        );
    }
    (pattern.clone(), input.clone())
}

// ============================================================================
// MATCHING
// ============================================================================

fn is_ellipsis(form: &SyntaxForm) -> bool {
    form.is_symbol(ELLIPSIS)
}

/// Match one pattern against one input form, extending `binds` on success.
pub fn match_form(
    pattern: &SyntaxForm,
    input: &SyntaxForm,
    literals: &HashSet<String>,
    mut binds: Bindings,
) -> Option<Bindings> {
    match pattern {
        SyntaxForm::Symbol(name, _) => {
            if literals.contains(name) {
                return (input.as_symbol() == Some(name.as_str())).then_some(binds);
            }
            binds.entry(name.clone()).or_default().push(input.clone());
            Some(binds)
        }

        SyntaxForm::List(p_items, _) => {
            let d_items = input.as_list()?;
            match_seq(p_items, d_items, 0, 0, literals, binds)
        }

        SyntaxForm::Vector(p_items, _) => {
            let d_items = input.as_vector()?;
            match_seq(p_items, d_items, 0, 0, literals, binds)
        }

        // Keywords, numbers, strings: match on structural equality.
        other => (other == input).then_some(binds),
    }
}

/// Match `pattern[i..]` against `input[j..]`. Ellipsis runs are greedy with
/// backtracking: the longest candidate run is tried first.
fn match_seq(
    pattern: &[SyntaxForm],
    input: &[SyntaxForm],
    i: usize,
    j: usize,
    literals: &HashSet<String>,
    binds: Bindings,
) -> Option<Bindings> {
    if i >= pattern.len() {
        return (j >= input.len()).then_some(binds);
    }

    if pattern.get(i + 1).is_some_and(is_ellipsis) {
        for k in (j..=input.len()).rev() {
            let Some(run) = try_run(&pattern[i], &input[j..k], literals, binds.clone()) else {
                continue;
            };
            if let Some(done) = match_seq(pattern, input, i + 2, k, literals, run) {
                return Some(done);
            }
        }
        return None;
    }

    if j >= input.len() {
        return None;
    }
    let binds = match_form(&pattern[i], &input[j], literals, binds)?;
    match_seq(pattern, input, i + 1, j + 1, literals, binds)
}

fn try_run(
    pattern: &SyntaxForm,
    run: &[SyntaxForm],
    literals: &HashSet<String>,
    mut binds: Bindings,
) -> Option<Bindings> {
    // An ellipsis variable that captures nothing must still be known to the
    // template, so record it with zero forms.
    if let SyntaxForm::Symbol(name, _) = pattern {
        if !literals.contains(name) {
            binds.entry(name.clone()).or_default();
        }
    }
    for item in run {
        binds = match_form(pattern, item, literals, binds)?;
    }
    Some(binds)
}

// ============================================================================
// SUBSTITUTION
// ============================================================================

/// Instantiate a template under a set of bindings. A variable bound once
/// substitutes its form; a variable bound several times without an ellipsis
/// substitutes the list of its forms; `var ...` splices the run in place.
pub fn substitute(
    template: &SyntaxForm,
    binds: &Bindings,
    macro_name: &str,
) -> Result<SyntaxForm, SedraError> {
    match template {
        SyntaxForm::Symbol(name, span) => match binds.get(name) {
            Some(forms) if forms.len() == 1 => Ok(forms[0].clone()),
            Some(forms) => Ok(SyntaxForm::List(forms.clone(), *span)),
            None => Ok(template.clone()),
        },

        SyntaxForm::List(items, span) => Ok(SyntaxForm::List(
            substitute_seq(items, binds, macro_name, *span)?,
            *span,
        )),

        SyntaxForm::Vector(items, span) => Ok(SyntaxForm::Vector(
            substitute_seq(items, binds, macro_name, *span)?,
            *span,
        )),

        other => Ok(other.clone()),
    }
}

fn substitute_seq(
    items: &[SyntaxForm],
    binds: &Bindings,
    macro_name: &str,
    span: Span,
) -> Result<Vec<SyntaxForm>, SedraError> {
    let mut out = Vec::with_capacity(items.len());
    let mut i = 0;
    while i < items.len() {
        if items.get(i + 1).is_some_and(is_ellipsis) {
            let SyntaxForm::Symbol(name, _) = &items[i] else {
                return Err(macro_error(
                    macro_name,
                    "`...` in a template must follow a pattern variable",
                    Some(span),
                ));
            };
            if let Some(forms) = binds.get(name) {
                out.extend(forms.iter().cloned());
            }
            i += 2;
            continue;
        }
        out.push(substitute(&items[i], binds, macro_name)?);
        i += 1;
    }
    Ok(out)
}
