//! Synthetic cursor trees for unit tests.

use std::path::PathBuf;
use std::rc::Rc;

use super::{Cursor, CursorKind, Span};

#[derive(Debug)]
struct Inner {
    kind: CursorKind,
    name: String,
    display: Option<String>,
    file: Option<PathBuf>,
    span: Span,
    param: Option<String>,
    reference: Option<Node>,
    children: Vec<Node>,
}

/// Immutable, cheaply clonable test cursor. Builders consume and rebuild.
#[derive(Debug, Clone)]
pub(crate) struct Node(Rc<Inner>);

impl Node {
    pub(crate) fn new(kind: CursorKind, name: &str, file: &str) -> Self {
        Node(Rc::new(Inner {
            kind,
            name: name.to_string(),
            display: None,
            file: Some(PathBuf::from(file)),
            span: Span::default(),
            param: None,
            reference: None,
            children: Vec::new(),
        }))
    }

    pub(crate) fn other(name: &str, file: &str) -> Self {
        Self::new(CursorKind::Other, name, file)
    }

    pub(crate) fn unlocated(name: &str) -> Self {
        Self::other(name, "").edit(|n| n.file = None)
    }

    /// A function declaration with no location, like a compiler builtin.
    pub(crate) fn builtin_function(name: &str) -> Self {
        Self::new(CursorKind::FunctionDecl, name, "").edit(|n| n.file = None)
    }

    /// A function declaration with display name `name(params)`.
    pub(crate) fn function(name: &str, params: &str, file: &str, line: u32) -> Self {
        let display = format!("{}({})", name, params);
        let first = params.split(',').next().map(str::trim).unwrap_or("");
        let param = (!first.is_empty() && first != "void").then(|| first.to_string());
        Self::new(CursorKind::FunctionDecl, name, file).edit(|n| {
            n.display = Some(display);
            n.span = Span::new(line, 1, line, 20);
            n.param = param;
        })
    }

    /// A call expression at `line` of `file` resolving to `target`.
    pub(crate) fn call(target: &Node, file: &str, line: u32) -> Self {
        let name = target.name().unwrap_or_default();
        Self::new(CursorKind::CallExpr, &name, file).edit(|n| {
            n.span = Span::new(line, 5, line, 15);
            n.reference = Some(target.clone());
        })
    }

    pub(crate) fn decl_ref(target: &Node, file: &str, line: u32) -> Self {
        let name = target.name().unwrap_or_default();
        Self::new(CursorKind::DeclRefExpr, &name, file).edit(|n| {
            n.span = Span::new(line, 5, line, 10);
            n.reference = Some(target.clone());
        })
    }

    pub(crate) fn with_children(self, children: Vec<Node>) -> Self {
        self.edit(|n| n.children = children)
    }

    pub(crate) fn name(&self) -> Option<String> {
        Some(self.0.name.clone())
    }

    pub(crate) fn children_vec(&self) -> Vec<Node> {
        self.0.children.clone()
    }

    fn edit(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = match Rc::try_unwrap(self.0) {
            Ok(inner) => inner,
            Err(shared) => Inner {
                kind: shared.kind,
                name: shared.name.clone(),
                display: shared.display.clone(),
                file: shared.file.clone(),
                span: shared.span,
                param: shared.param.clone(),
                reference: shared.reference.clone(),
                children: shared.children.clone(),
            },
        };
        f(&mut inner);
        Node(Rc::new(inner))
    }
}

impl Cursor for Node {
    fn kind(&self) -> CursorKind {
        self.0.kind
    }

    fn file(&self) -> Option<PathBuf> {
        self.0.file.clone()
    }

    fn extent(&self) -> Option<Span> {
        Some(self.0.span)
    }

    fn spelling(&self) -> Option<String> {
        Some(self.0.name.clone())
    }

    fn display_name(&self) -> Option<String> {
        self.0.display.clone().or_else(|| Some(self.0.name.clone()))
    }

    fn referenced(&self) -> Option<Self> {
        self.0.reference.clone()
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }

    fn first_parameter_type(&self) -> Option<String> {
        self.0.param.clone()
    }
}
