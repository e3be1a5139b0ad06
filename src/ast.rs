//! Target AST: the node taxonomy the downstream contract compiler consumes.
//!
//! Nodes are built children-first and constructed atomically with their final
//! child lists; ownership replaces parent back-pointers, so "a node has
//! exactly one parent" holds by construction. Nothing mutates a node after it
//! is built - fix-ups (like promoting a top-level annotated assignment to a
//! variable declaration) rebuild the node instead.
//!
//! Serialization is `ast_type`-tagged to match the downstream schema.

use std::sync::Arc;

use serde::Serialize;

use crate::syntax::Span;

// ============================================================================
// NODE
// ============================================================================

/// One element of the target AST. `id` is unique within a compilation and
/// strictly increasing in allocation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "node_id")]
    pub id: u64,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub span: Span,
    /// Full-source-text back-reference, stamped on top-level nodes.
    #[serde(skip)]
    pub source: Option<Arc<str>>,
}

impl Node {
    pub fn new(id: u64, kind: NodeKind, span: Span) -> Self {
        Self {
            id,
            kind,
            span,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Arc<str>) -> Self {
        self.source = Some(source);
        self
    }

    /// Ordered child sequence, in field-declaration order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.kind.collect_children(&mut out);
        out
    }

    /// Depth-first walk over this node and everything it owns.
    pub fn walk(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

// ============================================================================
// NODE KIND
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "ast_type")]
pub enum NodeKind {
    Module {
        name: String,
        doc_string: String,
        body: Vec<Node>,
    },
    FunctionDef {
        name: String,
        args: Box<Node>,
        returns: Option<Box<Node>>,
        #[serde(rename = "decorator_list")]
        decorators: Vec<Node>,
        body: Vec<Node>,
    },
    Arguments {
        args: Vec<Node>,
    },
    Arg {
        name: String,
        annotation: Box<Node>,
    },
    VariableDecl {
        target: Box<Node>,
        annotation: Box<Node>,
        value: Option<Box<Node>>,
        is_constant: bool,
        is_public: bool,
        is_immutable: bool,
    },
    StructDef {
        name: String,
        body: Vec<Node>,
    },
    EventDef {
        name: String,
        body: Vec<Node>,
    },
    InterfaceDef {
        name: String,
        body: Vec<Node>,
    },
    AnnAssign {
        target: Box<Node>,
        annotation: Box<Node>,
        value: Option<Box<Node>>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    AugAssign {
        op: BinOpKind,
        target: Box<Node>,
        value: Box<Node>,
    },
    If {
        test: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    For {
        target: Box<Node>,
        iter: Box<Node>,
        body: Vec<Node>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    Assert {
        test: Box<Node>,
        msg: Option<Box<Node>>,
    },
    Raise {
        exc: Option<Box<Node>>,
    },
    Log {
        value: Box<Node>,
    },
    Pass,
    Break,
    Continue,
    /// Bare expression in statement position.
    ExprStmt {
        value: Box<Node>,
    },
    BinOp {
        op: BinOpKind,
        left: Box<Node>,
        right: Box<Node>,
    },
    BoolOp {
        op: BoolOpKind,
        values: Vec<Node>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Node>,
    },
    Compare {
        op: CmpOpKind,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call {
        func: Box<Node>,
        args: Vec<Node>,
        keywords: Vec<Node>,
    },
    /// A keyword argument inside a Call.
    Keyword {
        arg: String,
        value: Box<Node>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    Tuple {
        elements: Vec<Node>,
    },
    List {
        elements: Vec<Node>,
    },
    Int {
        value: i128,
    },
    /// Decimal literal wider than i128. Same downstream tag as `Int`, with
    /// the digits carried as a string.
    #[serde(rename = "Int")]
    BigInt {
        value: String,
    },
    Str {
        value: String,
    },
    Bytes {
        value: Vec<u8>,
    },
    Hex {
        value: String,
    },
    Name {
        id: String,
    },
    /// `True`, `False`, or `None`.
    NameConstant {
        value: Option<bool>,
    },
}

impl NodeKind {
    fn collect_children<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match self {
            NodeKind::Module { body, .. }
            | NodeKind::StructDef { body, .. }
            | NodeKind::EventDef { body, .. }
            | NodeKind::InterfaceDef { body, .. } => out.extend(body.iter()),
            NodeKind::FunctionDef {
                args,
                returns,
                decorators,
                body,
                ..
            } => {
                out.push(args);
                if let Some(r) = returns {
                    out.push(r);
                }
                out.extend(decorators.iter());
                out.extend(body.iter());
            }
            NodeKind::Arguments { args } => out.extend(args.iter()),
            NodeKind::Arg { annotation, .. } => out.push(annotation),
            NodeKind::VariableDecl {
                target,
                annotation,
                value,
                ..
            }
            | NodeKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                out.push(target);
                out.push(annotation);
                if let Some(v) = value {
                    out.push(v);
                }
            }
            NodeKind::Assign { target, value } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::AugAssign { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::If { test, body, orelse } => {
                out.push(test);
                out.extend(body.iter());
                out.extend(orelse.iter());
            }
            NodeKind::For { target, iter, body } => {
                out.push(target);
                out.push(iter);
                out.extend(body.iter());
            }
            NodeKind::Return { value } => {
                if let Some(v) = value {
                    out.push(v);
                }
            }
            NodeKind::Assert { test, msg } => {
                out.push(test);
                if let Some(m) = msg {
                    out.push(m);
                }
            }
            NodeKind::Raise { exc } => {
                if let Some(e) = exc {
                    out.push(e);
                }
            }
            NodeKind::Log { value } | NodeKind::ExprStmt { value } => out.push(value),
            NodeKind::BinOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::BoolOp { values, .. } => out.extend(values.iter()),
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Compare { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::Call {
                func,
                args,
                keywords,
            } => {
                out.push(func);
                out.extend(args.iter());
                out.extend(keywords.iter());
            }
            NodeKind::Keyword { value, .. } => out.push(value),
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::Subscript { value, index } => {
                out.push(value);
                out.push(index);
            }
            NodeKind::Tuple { elements } | NodeKind::List { elements } => {
                out.extend(elements.iter())
            }
            NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Int { .. }
            | NodeKind::BigInt { .. }
            | NodeKind::Str { .. }
            | NodeKind::Bytes { .. }
            | NodeKind::Hex { .. }
            | NodeKind::Name { .. }
            | NodeKind::NameConstant { .. } => {}
        }
    }
}

// ============================================================================
// OPERATOR KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mult,
    Div,
    Pow,
    Mod,
}

impl BinOpKind {
    pub fn from_symbol(name: &str) -> Option<Self> {
        Some(match name {
            "+" => BinOpKind::Add,
            "-" => BinOpKind::Sub,
            "*" => BinOpKind::Mult,
            "/" => BinOpKind::Div,
            "**" => BinOpKind::Pow,
            "%" => BinOpKind::Mod,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CmpOpKind {
    Lt,
    LtE,
    Gt,
    GtE,
    Eq,
    NotEq,
    In,
    NotIn,
}

impl CmpOpKind {
    pub fn from_symbol(name: &str) -> Option<Self> {
        Some(match name {
            "<" => CmpOpKind::Lt,
            "<=" => CmpOpKind::LtE,
            ">" => CmpOpKind::Gt,
            ">=" => CmpOpKind::GtE,
            "==" => CmpOpKind::Eq,
            "!=" => CmpOpKind::NotEq,
            "in" => CmpOpKind::In,
            "notin" => CmpOpKind::NotIn,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoolOpKind {
    And,
    Or,
}

impl BoolOpKind {
    pub fn from_symbol(name: &str) -> Option<Self> {
        Some(match name {
            "and" => BoolOpKind::And,
            "or" => BoolOpKind::Or,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOpKind {
    Not,
    USub,
}

impl UnaryOpKind {
    pub fn from_symbol(name: &str) -> Option<Self> {
        Some(match name {
            "not" => UnaryOpKind::Not,
            "usub" => UnaryOpKind::USub,
            _ => return None,
        })
    }
}
