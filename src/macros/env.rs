//! Macro environment: a stack of lexical frames mapping names to
//! transformers. `define` writes the innermost frame, `lookup` searches
//! innermost-to-outermost (shadowing), `push`/`pop` bracket a lexical extent.

use std::collections::HashMap;

use crate::errors::SedraError;
use crate::macros::rules::RulesMacro;
use crate::parser::context::ParseContext;
use crate::syntax::{Syntax, SyntaxForm};

// ============================================================================
// TRANSFORMER
// ============================================================================

/// What a transformer hands back: one replacement form, or several to splice
/// into the surrounding sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    One(SyntaxForm),
    Many(Vec<SyntaxForm>),
}

/// Procedural macro: a native function from the call form to its expansion.
/// Gets the environment (so it can re-enter expansion) and the parse context
/// (paths, include guard).
pub type NativeFn =
    fn(&Syntax, &mut MacroEnv, &mut ParseContext) -> Result<Expansion, SedraError>;

#[derive(Debug, Clone)]
pub enum Transformer {
    /// Compiled pattern/template macro (define-syntax).
    Rules(RulesMacro),
    /// Built-in procedural macro.
    Native(NativeFn),
}

// ============================================================================
// MACRO ENV
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MacroEnv {
    frames: Vec<HashMap<String, Transformer>>,
}

impl MacroEnv {
    /// Empty environment with a single root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    /// Fresh environment with the builtin macro set installed. User
    /// `define-syntax` may shadow any builtin by a later `define`.
    pub fn with_builtins() -> Self {
        let mut env = Self::new();
        crate::macros::builtins::install_builtins(&mut env);
        env
    }

    /// Defines in the innermost frame only.
    pub fn define(&mut self, name: impl Into<String>, transformer: Transformer) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), transformer);
        }
    }

    /// Innermost-to-outermost search; inner definitions shadow outer ones.
    pub fn lookup(&self, name: &str) -> Option<&Transformer> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        // The root frame stays.
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{symbol, Span};

    fn dummy(
        stx: &Syntax,
        _env: &mut MacroEnv,
        _ctx: &mut ParseContext,
    ) -> Result<Expansion, SedraError> {
        Ok(Expansion::One(stx.datum.clone()))
    }

    fn other(
        _stx: &Syntax,
        _env: &mut MacroEnv,
        _ctx: &mut ParseContext,
    ) -> Result<Expansion, SedraError> {
        Ok(Expansion::One(symbol("other", Span::default())))
    }

    #[test]
    fn define_and_lookup() {
        let mut env = MacroEnv::new();
        assert!(env.lookup("m").is_none());
        env.define("m", Transformer::Native(dummy));
        assert!(env.lookup("m").is_some());
    }

    #[test]
    fn inner_frames_shadow_outer() {
        let mut env = MacroEnv::new();
        env.define("m", Transformer::Native(dummy));
        env.push();
        env.define("m", Transformer::Native(other));
        let Some(Transformer::Native(f)) = env.lookup("m") else {
            panic!("expected native transformer");
        };
        assert_eq!(*f as usize, other as usize);
        env.pop();
        let Some(Transformer::Native(f)) = env.lookup("m") else {
            panic!("expected native transformer");
        };
        assert_eq!(*f as usize, dummy as usize);
    }

    #[test]
    fn root_frame_survives_extra_pops() {
        let mut env = MacroEnv::new();
        env.define("m", Transformer::Native(dummy));
        env.pop();
        env.pop();
        assert!(env.lookup("m").is_some());
    }
}
