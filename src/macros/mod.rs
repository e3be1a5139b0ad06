//! Macro layer: environment, pattern-rule engine, builtin set, and the
//! expansion driver.

pub mod builtins;
pub mod env;
pub mod expander;
pub mod rules;

pub use env::{Expansion, MacroEnv, Transformer};
pub use expander::{expand, expand_forms, MAX_EXPANSION_DEPTH};
pub use rules::RulesMacro;
