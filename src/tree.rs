// ============================================================================
// Syntax tree model - arena storage with explicit parent indices
// ============================================================================
//
// Trees arrive from an external parser and are read-only afterwards. Nodes
// live in a flat arena; parent/child relations are plain indices, so ancestor
// walks need no back-pointers and the structure has no ownership cycles.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Node kind of the language-agnostic tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    ClassDecl,
    InterfaceDecl,
    MethodDecl,
    CtorDecl,
    FieldDecl,
    VarDecl,
    ParamDecl,
    Block,
    IfStmt,
    ForStmt,
    WhileStmt,
    TryStmt,
    CatchClause,
    CallExpr,
    NewExpr,
    BinaryExpr,
    Identifier,
    Literal,
    NullLiteral,
}

impl NodeKind {
    /// Conditional or loop constructs that count toward nesting depth.
    pub fn is_branch_or_loop(self) -> bool {
        matches!(self, NodeKind::IfStmt | NodeKind::ForStmt | NodeKind::WhileStmt)
    }

    /// Nodes that delimit one executable body. Ancestor walks that must stay
    /// inside a single method stop here.
    pub fn is_body_boundary(self) -> bool {
        matches!(self, NodeKind::MethodDecl | NodeKind::CtorDecl)
    }
}

/// Source span, line/column based, 1-indexed lines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self { start_line, start_col, end_line, end_col }
    }

    /// Single-line convenience constructor.
    pub fn line(line: u32, start_col: u32, end_col: u32) -> Self {
        Self::new(line, start_col, line, end_col)
    }

    pub fn start(&self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    pub fn end(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// Inclusive containment: a node's span contains each of its children.
    pub fn contains(&self, other: &Span) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }
}

/// Stable handle into one tree's arena. Only valid for the tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Optional semantic attributes supplied by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs {
    /// Identifier / called name / literal lexeme.
    pub name: Option<String>,
    /// Operator symbol for binary expressions ("==", "!=", ...).
    pub operator: Option<String>,
    /// Static type hint ("String", "Vector", caught exception type, ...).
    pub type_name: Option<String>,
    /// Process-wide scoped declaration (static field).
    pub is_static: bool,
    /// Constant declaration (final / const).
    pub is_const: bool,
}

impl Attrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn operator(op: impl Into<String>) -> Self {
        Self { operator: Some(op.into()), ..Self::default() }
    }

    pub fn typed(type_name: impl Into<String>) -> Self {
        Self { type_name: Some(type_name.into()), ..Self::default() }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    span: Span,
    attrs: Attrs,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Malformed tree supplied by the parser. Fatal for that file's scan only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error(
        "child span {child_line}:{child_col} lies outside its parent span \
         (parent starts {parent_line}:{parent_col})"
    )]
    ChildOutsideParentSpan {
        parent_line: u32,
        parent_col: u32,
        child_line: u32,
        child_col: u32,
    },
}

/// Immutable, rooted, acyclic syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Read-only view of one node. Cheap to copy, borrows the tree.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SyntaxTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.data(self.id).kind
    }

    pub fn span(&self) -> Span {
        self.tree.data(self.id).span
    }

    pub fn name(&self) -> Option<&'a str> {
        self.tree.data(self.id).attrs.name.as_deref()
    }

    pub fn operator(&self) -> Option<&'a str> {
        self.tree.data(self.id).attrs.operator.as_deref()
    }

    pub fn type_name(&self) -> Option<&'a str> {
        self.tree.data(self.id).attrs.type_name.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.tree.data(self.id).attrs.is_static
    }

    pub fn is_const(&self) -> bool {
        self.tree.data(self.id).attrs.is_const
    }

    /// Weak back-reference: relation only, never ownership.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.data(self.id).parent.map(|id| self.tree.node(id))
    }

    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.data(self.id).children.iter().map(move |&id| tree.node(id))
    }

    pub fn child_count(&self) -> usize {
        self.tree.data(self.id).children.len()
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(self) -> Ancestors<'a> {
        Ancestors { tree: self.tree, next: self.tree.data(self.id).parent }
    }

    pub fn ancestors_of_kind(self, kind: NodeKind) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.ancestors().filter(move |n| n.kind() == kind)
    }

    /// Sibling nodes under the same parent, excluding this node.
    pub fn siblings(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let id = self.id;
        self.parent()
            .into_iter()
            .flat_map(|p| p.children())
            .filter(move |n| n.id != id)
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.data(id).parent;
        Some(self.tree.node(id))
    }
}

/// Builder used by the external parser. Span containment is validated once,
/// at `finish()`, never during rule evaluation.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new(root_kind: NodeKind, root_span: Span) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: root_kind,
                span: root_span,
                attrs: Attrs::default(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a child under `parent`, preserving insertion order.
    pub fn add(&mut self, parent: NodeId, kind: NodeKind, span: Span, attrs: Attrs) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData { kind, span, attrs, parent: Some(parent), children: Vec::new() });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Shorthand for attribute-free nodes.
    pub fn add_node(&mut self, parent: NodeId, kind: NodeKind, span: Span) -> NodeId {
        self.add(parent, kind, span, Attrs::default())
    }

    pub fn finish(self) -> Result<SyntaxTree, TreeError> {
        for node in &self.nodes {
            for &child in &node.children {
                let child_span = self.nodes[child.index()].span;
                if !node.span.contains(&child_span) {
                    return Err(TreeError::ChildOutsideParentSpan {
                        parent_line: node.span.start_line,
                        parent_col: node.span.start_col,
                        child_line: child_span.start_line,
                        child_col: child_span.start_col,
                    });
                }
            }
        }
        Ok(SyntaxTree { nodes: self.nodes })
    }
}
