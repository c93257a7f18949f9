//! Compiled Template Representation
//!
//! The three programs a compiled template carries: node
//! construction, initial attachment, and the keyed update
//! dispatch with its computation list. Both the JavaScript
//! emitter and the in-process runtime read this form.
//!

use indexmap::IndexMap;
use std::fmt;

// ------------------------------------------------------------- Public Types

/// Position of a constructed node within one template. Slots
/// are allocated in construction order, so the n-th
/// construction entry always creates slot n.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeSlot(pub usize);

/// A generated identifier holding the current value of one
/// distinct binding path.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

/// A nested instance collection owned by one directive.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(pub usize);

/// The three control directives. Each spawns a nested
/// template and a reconciliation call.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Renders the nested template once when the value is truthy.
    ///
    If,
    /// Renders the nested template once per sequence element.
    ///
    For,
    /// Renders the nested template once when the value is
    /// non-empty, passing the whole value.
    ///
    When,
}

/// Where an attachment entry appends a node.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// The instance's own fragment.
    ///
    Root,
    Node(NodeSlot),
}

/// Node-construction program entry.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Construct {
    Element {
        slot: NodeSlot,
        tag: String,
        svg: bool,
    },
    /// Text node pre-filled with its token-free literal.
    ///
    Text { slot: NodeSlot, content: String },
    /// Empty marker that nested instances are inserted before.
    ///
    Anchor { slot: NodeSlot },
}

/// Attachment program entry. Runs once, right after
/// construction.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Attach {
    Append { parent: Parent, child: NodeSlot },
    SetAttribute {
        node: NodeSlot,
        name: String,
        value: String,
    },
    SetAttributeNs {
        node: NodeSlot,
        namespace: String,
        name: String,
        value: String,
    },
}

/// One piece of an interpolated string.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Literal(String),
    Var(VarId),
}

/// Literal text concatenated with bound values. Empty literals
/// are never stored.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interp {
    pub parts: Vec<Part>,
}

/// A derived computation. Referenced by its index in the
/// template's computation list.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    SetText {
        node: NodeSlot,
        value: Interp,
    },
    SetProperty {
        node: NodeSlot,
        name: String,
        value: Interp,
    },
    SetAttribute {
        node: NodeSlot,
        name: String,
        value: Interp,
    },
    SetAttributeNs {
        node: NodeSlot,
        namespace: String,
        name: String,
        value: Interp,
    },
    /// Removes `name` when `var` is exactly `false`, otherwise
    /// runs the wrapped setter.
    ///
    RemoveAttributeIfFalse {
        node: NodeSlot,
        name: String,
        var: VarId,
        otherwise: Box<Op>,
    },
    Reconcile {
        directive: Directive,
        template: String,
        anchor: NodeSlot,
        value: VarId,
        collection: CollectionId,
    },
}

/// Rebinds one identifier from the value passed to a dispatch
/// entry. `tail` is the path below the entry's own key.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub var: VarId,
    pub tail: Vec<String>,
}

/// The update function for one binding path.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dispatch {
    pub bindings: Vec<Binding>,
    /// Ascending, de-duplicated computation indices.
    ///
    pub computations: Vec<usize>,
}

/// A fully assembled template. Immutable once built and shared
/// through the registry.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub construction: Vec<Construct>,
    pub attachment: Vec<Attach>,
    pub computations: Vec<Op>,
    /// Keyed by full dotted path, in binding-index order.
    ///
    pub dispatch: IndexMap<String, Dispatch>,
    pub var_count: usize,
    pub collection_count: usize,
    /// First node attached to the instance root.
    ///
    pub top: Option<NodeSlot>,
}

// ------------------------------------------------------------- Public Implementations

impl Directive {
    /// Maps a markup attribute name to its directive.
    ///
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Self::If),
            "for" => Some(Self::For),
            "when" => Some(Self::When),
            _ => None,
        }
    }

    pub fn attribute(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::For => "for",
            Self::When => "when",
        }
    }

    /// Name of the runtime reconciliation function emitted code
    /// calls for this directive.
    ///
    pub fn runtime_call(self) -> &'static str {
        match self {
            Self::If => "renderChild",
            Self::For => "renderChildren",
            Self::When => "renderWhen",
        }
    }
}

impl Interp {
    /// Returns the identifier when the value is exactly one
    /// token with no literal text around it.
    ///
    pub fn single_var(&self) -> Option<VarId> {
        match self.parts.as_slice() {
            [Part::Var(var)] => Some(*var),
            _ => None,
        }
    }

    /// Identifiers referenced by this value, in order.
    ///
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.parts.iter().filter_map(|part| match part {
            Part::Var(var) => Some(*var),
            Part::Literal(_) => None,
        })
    }
}

impl Template {
    pub fn slot_count(&self) -> usize {
        self.construction.len()
    }

    /// Slots appended straight to the instance root, in
    /// attachment order.
    ///
    pub fn root_slots(&self) -> impl Iterator<Item = NodeSlot> + '_ {
        self.attachment.iter().filter_map(|entry| match entry {
            Attach::Append {
                parent: Parent::Root,
                child,
            } => Some(*child),
            _ => None,
        })
    }

    /// Collections anchored at the instance root. Once mounted,
    /// their instances sit next to the instance's own top-level
    /// nodes rather than inside them.
    ///
    pub fn root_collections(&self) -> Vec<CollectionId> {
        let roots: Vec<_> = self.root_slots().collect();

        self.computations
            .iter()
            .filter_map(|op| match op {
                Op::Reconcile {
                    anchor, collection, ..
                } if roots.contains(anchor) => Some(*collection),
                _ => None,
            })
            .collect()
    }
}

impl Construct {
    pub fn slot(&self) -> NodeSlot {
        match self {
            Self::Element { slot, .. } | Self::Text { slot, .. } | Self::Anchor { slot } => *slot,
        }
    }
}

impl fmt::Display for NodeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{:x}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ------------------------------------------------------------- Unit Tests
