//! Tree Compiler
//!
//! Walks a markup tree with an explicit work stack and produces
//! the construction and attachment programs, feeding every
//! variable reference into the binding index. Elements carrying
//! a directive are compiled into their own nested template and
//! replaced by an anchor in the parent.
//!

use super::bindings::BindingIndex;
use super::patterns::{self, XLINK_HREF, XLINK_NAMESPACE};
use super::resolver::{self, BindingPath};
use super::template::{
    Attach, CollectionId, Construct, Directive, Interp, NodeSlot, Op, Parent, Template,
};
use super::{CompileError, Registry};
use crate::markup::{Attribute, Element, Node};
use log::trace;

// ------------------------------------------------------------- Public Types

/// Compiles one template. Nested templates spawned by
/// directives get their own compiler sharing the registry.
///
pub struct TreeCompiler<'r> {
    registry: &'r mut Registry,
    index: BindingIndex,
    construction: Vec<Construct>,
    attachment: Vec<Attach>,
    collection_count: usize,
    top: Option<NodeSlot>,
    /// Whether the tree root sits inside a vector-graphics
    /// parent. Set for nested templates cut out of an `<svg>`.
    ///
    svg_context: bool,
}

// ------------------------------------------------------------- Private Types

/// One pending unit of work: a node plus the slot it attaches
/// to and the namespace inherited from that parent.
///
struct Work {
    node: Node,
    parent: Parent,
    in_svg: bool,
}

// ------------------------------------------------------------- Public Implementations

impl<'r> TreeCompiler<'r> {
    pub fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            index: BindingIndex::new(),
            construction: Vec::new(),
            attachment: Vec::new(),
            collection_count: 0,
            top: None,
            svg_context: false,
        }
    }

    fn nested(registry: &'r mut Registry, svg_context: bool) -> Self {
        Self {
            svg_context,
            ..Self::new(registry)
        }
    }

    /// Compiles `tree` and registers it as `name`, together with
    /// every nested template its directives spawn.
    ///
    pub fn compile(mut self, tree: Node, name: &str) -> Result<(), CompileError> {
        if self.registry.contains(name) {
            return Err(CompileError::DuplicateTemplate(name.to_string()));
        }
        self.registry.reserve(name);

        let mut stack = vec![Work {
            node: tree,
            parent: Parent::Root,
            in_svg: self.svg_context,
        }];

        while let Some(work) = stack.pop() {
            match work.node {
                Node::Document { children } => {
                    if let Some(content) = document_content(children) {
                        stack.push(Work {
                            node: content,
                            parent: work.parent,
                            in_svg: work.in_svg,
                        });
                    }
                }
                Node::Text(raw) => self.text(&raw, work.parent)?,
                Node::Element(element) => {
                    self.element(element, work.parent, work.in_svg, &mut stack)?;
                }
            }
        }

        let template = self.assemble(name);
        trace!(
            "compiled template {} ({} nodes, {} computations)",
            template.name,
            template.slot_count(),
            template.computations.len()
        );
        self.registry.insert(template)
    }
}

// ------------------------------------------------------------- Private Implementations

impl TreeCompiler<'_> {
    /// Allocates the next node slot. Slots follow construction
    /// order so runtimes can build nodes with a single pass.
    ///
    fn construct(&mut self, entry: impl FnOnce(NodeSlot) -> Construct) -> NodeSlot {
        let slot = NodeSlot(self.construction.len());
        self.construction.push(entry(slot));
        slot
    }

    fn append(&mut self, parent: Parent, child: NodeSlot) {
        if parent == Parent::Root && self.top.is_none() {
            self.top = Some(child);
        }
        self.attachment.push(Attach::Append { parent, child });
    }

    /// Creates the text node pre-filled with its token-free
    /// literal and, when it has references, the computation
    /// that rewrites its content.
    ///
    fn text(&mut self, raw: &str, parent: Parent) -> Result<(), CompileError> {
        let text = resolver::normalize(raw);
        let segments = resolver::scan(&text)?;
        let content = resolver::strip_tokens(&text);

        let slot = self.construct(|slot| Construct::Text { slot, content });

        if resolver::has_tokens(&segments) {
            self.index
                .collect(segments, |value| Op::SetText { node: slot, value });
        }

        self.append(parent, slot);
        Ok(())
    }

    fn element(
        &mut self,
        mut element: Element,
        parent: Parent,
        in_svg: bool,
        stack: &mut Vec<Work>,
    ) -> Result<(), CompileError> {
        let directive = element
            .attributes
            .iter()
            .find_map(|attr| Directive::from_attribute(&attr.name));

        if let Some(directive) = directive {
            return self.directive(directive, element, parent, in_svg);
        }

        let svg = in_svg || patterns::is_svg_tag(&element.tag);
        let tag = element.tag.clone();
        let slot = self.construct(|slot| Construct::Element {
            slot,
            tag: tag.clone(),
            svg,
        });

        for attribute in &element.attributes {
            self.attribute(&tag, svg, slot, attribute)?;
        }

        self.append(parent, slot);

        let children_in_svg = svg && tag != "foreignObject";
        for child in element.children.drain(..).rev() {
            stack.push(Work {
                node: child,
                parent: Parent::Node(slot),
                in_svg: children_in_svg,
            });
        }
        Ok(())
    }

    /// Chooses the setter for one attribute. Literal text is baked
    /// into the attachment program; references become a
    /// computation. A value made only of one reference removes
    /// the attribute when bound to `false`.
    ///
    fn attribute(
        &mut self,
        tag: &str,
        svg: bool,
        node: NodeSlot,
        attribute: &Attribute,
    ) -> Result<(), CompileError> {
        let text = resolver::normalize(&attribute.value);
        let segments = resolver::scan(&text)?;
        let literal = resolver::strip_tokens(&text);
        let dynamic = resolver::has_tokens(&segments);
        let name = attribute.name.clone();

        if !literal.is_empty() || !dynamic {
            self.attachment.push(if name == XLINK_HREF {
                Attach::SetAttributeNs {
                    node,
                    namespace: XLINK_NAMESPACE.to_string(),
                    name: "href".to_string(),
                    value: literal.clone(),
                }
            } else {
                Attach::SetAttribute {
                    node,
                    name: name.clone(),
                    value: literal.clone(),
                }
            });
        }

        if !dynamic {
            return Ok(());
        }

        let direct = !svg && patterns::is_direct_attribute(tag, &name);
        let guarded = literal.is_empty();

        self.index.collect(segments, |value: Interp| {
            let setter = if direct {
                Op::SetProperty {
                    node,
                    name: name.clone(),
                    value: value.clone(),
                }
            } else if name == XLINK_HREF {
                Op::SetAttributeNs {
                    node,
                    namespace: XLINK_NAMESPACE.to_string(),
                    name: "href".to_string(),
                    value: value.clone(),
                }
            } else {
                Op::SetAttribute {
                    node,
                    name: name.clone(),
                    value: value.clone(),
                }
            };

            match value.single_var() {
                Some(var) if guarded => Op::RemoveAttributeIfFalse {
                    node,
                    name,
                    var,
                    otherwise: Box::new(setter),
                },
                _ => setter,
            }
        });
        Ok(())
    }

    /// Consumes the directive attribute, compiles the remaining
    /// element as a nested template and leaves an anchor plus a
    /// reconciliation computation in this template.
    ///
    fn directive(
        &mut self,
        directive: Directive,
        mut element: Element,
        parent: Parent,
        in_svg: bool,
    ) -> Result<(), CompileError> {
        let value = element
            .remove_attribute(directive.attribute())
            .unwrap_or_default();
        let path = resolver::directive_path(&value).map_err(|_| CompileError::InvalidDirective {
            directive: directive.attribute(),
            value: value.clone(),
        })?;

        let nested_name = self.registry.nested_name(directive);
        trace!(
            "{}=\"{}\" on <{}> spawns template {}",
            directive.attribute(),
            value,
            element.tag,
            nested_name
        );
        TreeCompiler::nested(&mut *self.registry, in_svg)
            .compile(Node::Element(element), &nested_name)?;

        let anchor = self.construct(|slot| Construct::Anchor { slot });
        self.append(parent, anchor);

        let collection = CollectionId(self.collection_count);
        self.collection_count += 1;

        self.reconcile(directive, nested_name, anchor, collection, path);
        Ok(())
    }

    fn reconcile(
        &mut self,
        directive: Directive,
        template: String,
        anchor: NodeSlot,
        collection: CollectionId,
        path: BindingPath,
    ) {
        let value = self.index.bind(&path);
        self.index.register(
            Op::Reconcile {
                directive,
                template,
                anchor,
                value,
                collection,
            },
            &[path],
        );
    }

    /// Combines the binding index with the node programs into the
    /// finished template.
    ///
    fn assemble(&mut self, name: &str) -> Template {
        let bindings = std::mem::take(&mut self.index).finish();

        Template {
            name: name.to_string(),
            construction: std::mem::take(&mut self.construction),
            attachment: std::mem::take(&mut self.attachment),
            computations: bindings.computations,
            dispatch: bindings.dispatch,
            var_count: bindings.var_count,
            collection_count: self.collection_count,
            top: self.top,
        }
    }
}

// ------------------------------------------------------------- Private Functions

/// Picks the node a document compiles from: its first element,
/// or its first child when it holds no element at all.
///
fn document_content(children: Vec<Node>) -> Option<Node> {
    let mut fallback = None;
    for child in children {
        if matches!(child, Node::Element(_)) {
            return Some(child);
        }
        fallback.get_or_insert(child);
    }
    fallback
}

// ------------------------------------------------------------- Unit Tests
