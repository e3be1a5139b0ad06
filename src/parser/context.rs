//! Per-compilation state, threaded explicitly through reading, expansion, and
//! node synthesis. Nothing here is process-wide: independent compilations own
//! independent contexts, which is what keeps node ids unique and include-cycle
//! detection correct when compilations run concurrently.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::syntax::SyntaxForm;

// ============================================================================
// NODE ID ALLOCATION
// ============================================================================

/// Monotonic node-id source. Ids are unique within one compilation and
/// strictly increasing in allocation order.
#[derive(Debug, Default)]
pub struct NodeIdAllocator {
    next: u64,
}

impl NodeIdAllocator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Compilation settings extracted from the reserved `(pragma ...)` form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evm_version: Option<String>,
}

impl Settings {
    pub fn is_empty(&self) -> bool {
        self.evm_version.is_none()
    }
}

// ============================================================================
// CONSTANTS TABLE
// ============================================================================

/// `defconst` stores the value form for substitution at use sites.
/// `defimmutable` only reserves the name: references stay plain names for the
/// downstream compiler to resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstEntry {
    Value(SyntaxForm),
    Immutable,
}

// ============================================================================
// PARSE CONTEXT
// ============================================================================

/// State for one compilation. Owned for its lifetime; never shared across
/// compilations.
#[derive(Debug)]
pub struct ParseContext {
    pub source_path: Option<PathBuf>,
    pub source_text: Arc<str>,
    /// Base directory for resolving relative include!/interface! targets.
    pub base_dir: PathBuf,
    pub constants: HashMap<String, ConstEntry>,
    pub node_ids: NodeIdAllocator,
    /// Resolved paths currently being included; re-entry is a cycle.
    pub include_stack: HashSet<PathBuf>,
    pub settings: Settings,
    next_mark: u64,
}

impl ParseContext {
    pub fn new(source_text: &str, source_path: Option<&Path>) -> Self {
        let base_dir = source_path
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut include_stack = HashSet::new();
        // Seed with the root unit so a file including itself through any
        // chain is caught.
        if let Some(path) = source_path {
            include_stack.insert(absolute(path));
        }

        Self {
            source_path: source_path.map(Path::to_path_buf),
            source_text: Arc::from(source_text),
            base_dir,
            constants: HashMap::new(),
            node_ids: NodeIdAllocator::default(),
            include_stack,
            settings: Settings::default(),
            next_mark: 0,
        }
    }

    /// Context for a nested compilation (interface! targets). The include
    /// stack is inherited so cycles spanning files are still caught; node ids
    /// start fresh because the nested module's nodes never join this tree.
    pub fn sub_context(
        &self,
        source_text: &str,
        source_path: &Path,
    ) -> Self {
        let mut sub = ParseContext::new(source_text, Some(source_path));
        sub.include_stack
            .extend(self.include_stack.iter().cloned());
        sub
    }

    /// Resolve a path relative to the current source file's directory.
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let p = Path::new(relative);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn next_node_id(&mut self) -> u64 {
        self.node_ids.next_id()
    }

    /// Fresh scope mark for one macro-expansion step.
    pub fn next_mark(&mut self) -> u64 {
        self.next_mark += 1;
        self.next_mark
    }
}

pub fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_strictly_increasing() {
        let mut ctx = ParseContext::new("", None);
        let a = ctx.next_node_id();
        let b = ctx.next_node_id();
        let c = ctx.next_node_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn independent_contexts_do_not_share_ids() {
        let mut a = ParseContext::new("", None);
        let mut b = ParseContext::new("", None);
        assert_eq!(a.next_node_id(), 0);
        assert_eq!(b.next_node_id(), 0);
    }

    #[test]
    fn resolve_path_is_relative_to_source_dir() {
        let ctx = ParseContext::new("", Some(Path::new("contracts/token.sedra")));
        assert_eq!(
            ctx.resolve_path("util.sedra"),
            PathBuf::from("contracts/util.sedra")
        );
    }

    #[test]
    fn root_unit_is_on_the_include_stack() {
        let ctx = ParseContext::new("", Some(Path::new("contracts/token.sedra")));
        assert!(!ctx.include_stack.is_empty());
    }
}
