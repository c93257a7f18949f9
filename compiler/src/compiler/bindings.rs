//! Variable Binding Index
//!
//! A tree keyed by path segment. Each node records the
//! identifier for the full path ending there and the indices of
//! every computation that reads that path. The flat computation
//! list lives alongside it so indices stay stable for the whole
//! compilation of one template.
//!

use super::resolver::{BindingPath, Segment};
use super::template::{Binding, Dispatch, Interp, Op, Part, VarId};
use indexmap::IndexMap;
use std::collections::BTreeSet;

// ------------------------------------------------------------- Public Types

/// Binding index plus computation list for one template. Owned
/// by a single tree compiler and consumed by `finish`.
///
#[derive(Debug, Default)]
pub struct BindingIndex {
    root: BindingNode,
    computations: Vec<Op>,
    var_count: usize,
}

/// Everything the assembler needs from the index.
///
#[derive(Debug)]
pub struct Bindings {
    pub computations: Vec<Op>,
    pub dispatch: IndexMap<String, Dispatch>,
    pub var_count: usize,
}

// ------------------------------------------------------------- Private Types

#[derive(Debug, Default)]
struct BindingNode {
    children: IndexMap<String, BindingNode>,
    /// Full dotted path to identifier, in first-seen order.
    ///
    names: IndexMap<String, VarId>,
    computations: BTreeSet<usize>,
}

// ------------------------------------------------------------- Public Implementations

impl BindingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for a path, allocating one the
    /// first time the path is seen. Later calls reuse it.
    ///
    pub fn bind(&mut self, path: &BindingPath) -> VarId {
        let next = VarId(self.var_count);
        let node = self.node_mut(path);
        let var = *node.names.entry(path.dotted()).or_insert(next);

        if var == next {
            self.var_count += 1;
        }
        var
    }

    /// Appends a computation and records its index against the
    /// node of every path it reads. Returns the index.
    ///
    pub fn register(&mut self, op: Op, paths: &[BindingPath]) -> usize {
        let index = self.computations.len();
        self.computations.push(op);

        for path in paths {
            self.node_mut(path).computations.insert(index);
        }
        index
    }

    /// Binds every token in `segments`, builds the computation
    /// from the resulting interpolation and registers it.
    ///
    pub fn collect(&mut self, segments: Vec<Segment>, build: impl FnOnce(Interp) -> Op) -> usize {
        let mut paths = Vec::new();
        let mut parts = Vec::new();

        for segment in segments {
            match segment {
                Segment::Literal(text) if text.is_empty() => {}
                Segment::Literal(text) => parts.push(Part::Literal(text)),
                Segment::Token(path) => {
                    parts.push(Part::Var(self.bind(&path)));
                    paths.push(path);
                }
            }
        }

        self.register(build(Interp { parts }), &paths)
    }

    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Emits one dispatch entry per binding node, pre-order. The
    /// entry for path P rebinds every identifier at or below P
    /// and runs every computation registered at or below P.
    ///
    pub fn finish(self) -> Bindings {
        let mut dispatch = IndexMap::new();
        let mut stack: Vec<(Vec<String>, &BindingNode)> = self
            .root
            .children
            .iter()
            .rev()
            .map(|(segment, node)| (vec![segment.clone()], node))
            .collect();

        while let Some((prefix, node)) = stack.pop() {
            dispatch.insert(prefix.join("."), subtree_dispatch(node, prefix.len()));

            for (segment, child) in node.children.iter().rev() {
                let mut path = prefix.clone();
                path.push(segment.clone());
                stack.push((path, child));
            }
        }

        Bindings {
            computations: self.computations,
            dispatch,
            var_count: self.var_count,
        }
    }
}

// ------------------------------------------------------------- Private Implementations

impl BindingIndex {
    /// Walks to the node for `path`, creating missing nodes on
    /// the way.
    ///
    fn node_mut(&mut self, path: &BindingPath) -> &mut BindingNode {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node
    }
}

// ------------------------------------------------------------- Private Functions

/// Gathers the identifiers and computations of a node and all of
/// its descendants. `depth` is the number of segments in the
/// node's own path, dropped from each identifier's path to get
/// the tail read from the dispatched value.
///
fn subtree_dispatch(node: &BindingNode, depth: usize) -> Dispatch {
    let mut bindings = Vec::new();
    let mut computations = BTreeSet::new();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        for (full, var) in &current.names {
            bindings.push(Binding {
                var: *var,
                tail: full.split('.').skip(depth).map(str::to_string).collect(),
            });
        }
        computations.extend(current.computations.iter().copied());
        stack.extend(current.children.values().rev());
    }

    Dispatch {
        bindings,
        computations: computations.into_iter().collect(),
    }
}

// ------------------------------------------------------------- Unit Tests
