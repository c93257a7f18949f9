//! Instance Pool
//!
//! Hands out template instances by name and takes them back.
//! An instance interprets its compiled template directly: the
//! construction and attachment programs run once on mount, and
//! every update key runs its dispatch entry against the
//! instance's own identifier values.
//!

use super::dom::{Document, NodeId};
use super::{RuntimeError, render_child, render_children, render_when, value};
use crate::compiler::Registry;
use crate::compiler::patterns::{SVG_NAMESPACE, XLINK_HREF, XLINK_NAMESPACE};
use crate::compiler::template::{Attach, Construct, Directive, Dispatch, Interp, Op, Parent, Part, Template};
use log::{debug, warn};
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;

// ------------------------------------------------------------- Public Types

/// Shared handle nested directives use to get and release their
/// instances. Owns the compiled templates.
///
#[derive(Debug)]
pub struct Pool {
    registry: Registry,
    created: Cell<usize>,
    released: Cell<usize>,
}

/// Counts of instances handed out and taken back.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub created: usize,
    pub released: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Nothing constructed yet.
    ///
    Unmounted,
    Mounted,
    /// Removed from its parent. Nodes are kept.
    ///
    Detached,
}

/// One live use of a compiled template.
///
#[derive(Debug)]
pub struct Instance {
    template: Rc<Template>,
    state: InstanceState,
    root: Option<NodeId>,
    nodes: Vec<NodeId>,
    values: Vec<Value>,
    collections: Vec<Vec<Instance>>,
}

// ------------------------------------------------------------- Public Implementations

impl Pool {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            created: Cell::new(0),
            released: Cell::new(0),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Creates a mounted instance of `name`, applying `data` when
    /// given.
    ///
    pub fn get(
        &self,
        doc: &mut Document,
        name: &str,
        data: Option<&Value>,
    ) -> Result<Instance, RuntimeError> {
        let template = self
            .registry
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownTemplate(name.to_string()))?;

        let mut instance = Instance::new(Rc::clone(template));
        instance.dom(doc)?;
        self.created.set(self.created.get() + 1);

        if let Some(data) = data {
            instance.update(doc, self, data)?;
        }
        Ok(instance)
    }

    /// Detaches an instance and hands it back to the caller.
    ///
    pub fn release(
        &self,
        doc: &mut Document,
        name: &str,
        mut instance: Instance,
    ) -> Result<Instance, RuntimeError> {
        debug!("releasing instance of {}", name);
        instance.remove(doc)?;
        self.released.set(self.released.get() + 1);
        Ok(instance)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.get(),
            released: self.released.get(),
        }
    }
}

impl Instance {
    pub fn new(template: Rc<Template>) -> Self {
        Self {
            values: vec![Value::String(String::new()); template.var_count],
            collections: (0..template.collection_count).map(|_| Vec::new()).collect(),
            template,
            state: InstanceState::Unmounted,
            root: None,
            nodes: Vec::new(),
        }
    }

    /// Builds the subtree on first call and returns the instance's
    /// fragment. Later calls return the same fragment without
    /// rebuilding.
    ///
    pub fn dom(&mut self, doc: &mut Document) -> Result<NodeId, RuntimeError> {
        if let Some(root) = self.root {
            return Ok(root);
        }

        let root = doc.create_fragment();
        self.nodes = self
            .template
            .construction
            .iter()
            .map(|entry| match entry {
                Construct::Element { tag, svg: true, .. } => {
                    doc.create_element_ns(SVG_NAMESPACE, tag)
                }
                Construct::Element { tag, .. } => doc.create_element(tag),
                Construct::Text { content, .. } => doc.create_text_node(content),
                Construct::Anchor { .. } => doc.create_text_node(""),
            })
            .collect();

        for entry in &self.template.attachment {
            match entry {
                Attach::Append { parent, child } => {
                    let parent = match parent {
                        Parent::Root => root,
                        Parent::Node(slot) => self.nodes[slot.0],
                    };
                    doc.append_child(parent, self.nodes[child.0])?;
                }
                Attach::SetAttribute { node, name, value } => {
                    doc.set_attribute(self.nodes[node.0], name, value)?;
                }
                Attach::SetAttributeNs {
                    node,
                    namespace,
                    name,
                    value,
                } => doc.set_attribute_ns(self.nodes[node.0], namespace, name, value)?,
            }
        }

        self.root = Some(root);
        self.state = InstanceState::Mounted;
        Ok(root)
    }

    /// Mounts if needed, then runs the dispatch entry for each key
    /// of `data`. Unknown keys are reported and skipped.
    ///
    pub fn update(
        &mut self,
        doc: &mut Document,
        pool: &Pool,
        data: &Value,
    ) -> Result<(), RuntimeError> {
        self.dom(doc)?;

        let Some(fields) = data.as_object() else {
            debug!("ignoring non-object update of {}", self.template.name);
            return Ok(());
        };

        let template = Rc::clone(&self.template);
        for (key, value) in fields {
            match template.dispatch.get(key) {
                Some(dispatch) => self.dispatch(doc, pool, &template, dispatch, value)?,
                None => warn!("Unused var: {{{}}}", key),
            }
        }
        Ok(())
    }

    /// Detaches every top-level node from its parent unless it
    /// still sits in the instance's own fragment. Instances of
    /// directives anchored at the top level are siblings of those
    /// nodes, so they are removed along with them.
    ///
    pub fn remove(&mut self, doc: &mut Document) -> Result<(), RuntimeError> {
        let template = Rc::clone(&self.template);

        for collection in template.root_collections() {
            for child in &mut self.collections[collection.0] {
                child.remove(doc)?;
            }
        }

        for slot in template.root_slots() {
            let Some(node) = self.node(slot.0) else {
                continue;
            };
            if let Some(parent) = doc.parent_node(node) {
                if Some(parent) != self.root {
                    doc.remove_child(parent, node)?;
                    self.state = InstanceState::Detached;
                }
            }
        }
        Ok(())
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn template_name(&self) -> &str {
        &self.template.name
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The first node attached to the instance root, once mounted.
    ///
    pub fn top(&self) -> Option<NodeId> {
        self.template.top.and_then(|slot| self.node(slot.0))
    }

    pub fn node(&self, slot: usize) -> Option<NodeId> {
        self.nodes.get(slot).copied()
    }

    pub fn value(&self, var: usize) -> Option<&Value> {
        self.values.get(var)
    }

    pub fn collection(&self, index: usize) -> &[Instance] {
        self.collections
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

// ------------------------------------------------------------- Private Implementations

impl Instance {
    fn dispatch(
        &mut self,
        doc: &mut Document,
        pool: &Pool,
        template: &Template,
        dispatch: &Dispatch,
        data: &Value,
    ) -> Result<(), RuntimeError> {
        for binding in &dispatch.bindings {
            self.values[binding.var.0] = value::lookup(data, &binding.tail);
        }
        for &index in &dispatch.computations {
            self.run(doc, pool, &template.computations[index])?;
        }
        Ok(())
    }

    fn run(&mut self, doc: &mut Document, pool: &Pool, op: &Op) -> Result<(), RuntimeError> {
        match op {
            Op::SetText { node, value } => {
                doc.set_text(self.nodes[node.0], &self.render(value))?;
            }
            Op::SetProperty { node, name, value } => {
                let raw = match value.single_var() {
                    Some(var) => self.values[var.0].clone(),
                    None => Value::String(self.render(value)),
                };
                doc.set_property(self.nodes[node.0], name, raw)?;
            }
            Op::SetAttribute { node, name, value } => {
                doc.set_attribute(self.nodes[node.0], name, &self.render(value))?;
            }
            Op::SetAttributeNs {
                node,
                namespace,
                name,
                value,
            } => {
                doc.set_attribute_ns(self.nodes[node.0], namespace, name, &self.render(value))?;
            }
            Op::RemoveAttributeIfFalse {
                node,
                name,
                var,
                otherwise,
            } => {
                if self.values[var.0] != Value::Bool(false) {
                    return self.run(doc, pool, otherwise);
                }

                let id = self.nodes[node.0];
                if name == XLINK_HREF {
                    doc.remove_attribute_ns(id, XLINK_NAMESPACE, "href")?;
                } else {
                    doc.remove_attribute(id, name)?;
                }
                if let Op::SetProperty { name, .. } = otherwise.as_ref() {
                    doc.remove_property(id, name)?;
                }
            }
            Op::Reconcile {
                directive,
                template,
                anchor,
                value,
                collection,
            } => {
                let anchor = self.nodes[anchor.0];
                let data = self.values[value.0].clone();
                let children = &mut self.collections[collection.0];

                match directive {
                    Directive::If => render_child(doc, pool, template, anchor, &data, children)?,
                    Directive::When => render_when(doc, pool, template, anchor, &data, children)?,
                    Directive::For => {
                        let items = match value::as_sequence(&data) {
                            Some(items) => items,
                            None => {
                                warn!("for over non-sequence value in {}: {}", template, data);
                                &[]
                            }
                        };
                        render_children(doc, pool, template, anchor, items, children)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn render(&self, value: &Interp) -> String {
        value
            .parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.clone(),
                Part::Var(var) => value::render(&self.values[var.0]),
            })
            .collect()
    }
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::markup;
    use serde_json::json;

    fn pool(source: &str) -> Pool {
        let mut registry = Registry::new();
        compile(markup::parse(source).unwrap(), "main", &mut registry).unwrap();
        Pool::new(registry)
    }

    // ----------------------------------------- get tests

    #[test]
    fn test_get_builds_prefilled_dom() {
        let pool = pool("<p class=\"note\">Hello {{name}}</p>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", None).unwrap();
        let root = instance.dom(&mut doc).unwrap();

        assert_eq!(instance.state(), InstanceState::Mounted);
        assert_eq!(doc.outer_html(root), "<p class=\"note\">Hello </p>");
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_get_with_data_updates() {
        let pool = pool("<p>Hello {{name}}</p>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", Some(&json!({"name": "Ada"}))).unwrap();
        let root = instance.dom(&mut doc).unwrap();
        assert_eq!(doc.text_content(root), "Hello Ada");
    }

    #[test]
    fn test_get_unknown_template() {
        let pool = pool("<p/>");
        let mut doc = Document::new();
        assert!(matches!(
            pool.get(&mut doc, "missing", None),
            Err(RuntimeError::UnknownTemplate(name)) if name == "missing"
        ));
    }

    // ----------------------------------------- dom tests

    #[test]
    fn test_dom_is_idempotent() {
        let pool = pool("<div><span>a</span></div>");
        let mut doc = Document::new();
        let mut instance = Instance::new(Rc::clone(pool.registry().get("main").unwrap()));

        assert_eq!(instance.state(), InstanceState::Unmounted);
        let first = instance.dom(&mut doc).unwrap();
        let size = doc.len();
        let second = instance.dom(&mut doc).unwrap();

        assert_eq!(first, second);
        assert_eq!(doc.len(), size);
    }

    #[test]
    fn test_dom_not_rebuilt_after_insertion() {
        let pool = pool("<p>x</p>");
        let mut doc = Document::new();
        let host = doc.create_element("body");
        let mut instance = pool.get(&mut doc, "main", None).unwrap();

        let root = instance.dom(&mut doc).unwrap();
        doc.append_child(host, root).unwrap();
        let size = doc.len();

        instance.dom(&mut doc).unwrap();
        assert_eq!(doc.len(), size);
        assert_eq!(doc.outer_html(host), "<body><p>x</p></body>");
    }

    // ----------------------------------------- update tests

    #[test]
    fn test_update_text_and_wildcard_property() {
        let pool = pool("<span title=\"{{name}}\">Hello {{name}}</span>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", None).unwrap();
        instance.update(&mut doc, &pool, &json!({"name": "Ada"})).unwrap();

        let span = instance.top().unwrap();
        assert_eq!(doc.text_content(span), "Hello Ada");
        assert_eq!(doc.property(span, "title"), Some(&json!("Ada")));
    }

    #[test]
    fn test_update_nested_paths() {
        let pool = pool("<p>{{user.name}} ({{user.age}})</p>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", None).unwrap();
        let p = instance.top().unwrap();

        instance
            .update(&mut doc, &pool, &json!({"user": {"name": "Bo", "age": 7}}))
            .unwrap();
        assert_eq!(doc.text_content(p), "Bo (7)");

        instance
            .update(&mut doc, &pool, &json!({"user.name": "Cy"}))
            .unwrap();
        assert_eq!(doc.text_content(p), "Cy (7)");

        instance.update(&mut doc, &pool, &json!({"user": {}})).unwrap();
        assert_eq!(doc.text_content(p), " ()");
    }

    #[test]
    fn test_update_unrelated_key_leaves_other_nodes() {
        let pool = pool("<div><b>{{a}}</b><i>{{b}}</i></div>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", Some(&json!({"a": "1", "b": "2"}))).unwrap();
        let b_text = instance.node(4).unwrap();

        doc.set_text(b_text, "touched").unwrap();
        instance.update(&mut doc, &pool, &json!({"a": "3"})).unwrap();

        assert_eq!(doc.text_content(instance.top().unwrap()), "3touched");
    }

    #[test]
    fn test_update_ignores_unknown_and_non_objects() {
        let pool = pool("<p>{{a}}</p>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", None).unwrap();

        instance.update(&mut doc, &pool, &json!({"zzz": 1})).unwrap();
        instance.update(&mut doc, &pool, &json!("text")).unwrap();
        assert_eq!(doc.text_content(instance.top().unwrap()), "");
    }

    #[test]
    fn test_update_mounts_first() {
        let pool = pool("<p>{{a}}</p>");
        let mut doc = Document::new();
        let mut instance = Instance::new(Rc::clone(pool.registry().get("main").unwrap()));

        instance.update(&mut doc, &pool, &json!({"a": "x"})).unwrap();
        assert_eq!(instance.state(), InstanceState::Mounted);
        assert_eq!(doc.text_content(instance.root().unwrap()), "x");
    }

    #[test]
    fn test_false_removes_attribute_and_property() {
        let pool = pool("<input checked=\"{{done}}\" data-x=\"{{x}}\"/>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", None).unwrap();
        let input = instance.top().unwrap();

        instance
            .update(&mut doc, &pool, &json!({"done": true, "x": "1"}))
            .unwrap();
        assert_eq!(doc.property(input, "checked"), Some(&json!(true)));
        assert_eq!(doc.attribute(input, "data-x"), Some("1"));

        doc.set_attribute(input, "checked", "").unwrap();
        instance
            .update(&mut doc, &pool, &json!({"done": false, "x": false}))
            .unwrap();
        assert_eq!(doc.property(input, "checked"), None);
        assert_eq!(doc.attribute(input, "checked"), None);
        assert_eq!(doc.attribute(input, "data-x"), None);
    }

    #[test]
    fn test_mixed_value_is_never_guarded() {
        let pool = pool("<div class=\"card {{kind}}\"/>");
        let mut doc = Document::new();
        let mut instance = pool.get(&mut doc, "main", Some(&json!({"kind": false}))).unwrap();
        assert_eq!(doc.attribute(instance.top().unwrap(), "class"), Some("card false"));

        instance.update(&mut doc, &pool, &json!({"kind": "wide"})).unwrap();
        assert_eq!(doc.attribute(instance.top().unwrap(), "class"), Some("card wide"));
    }

    #[test]
    fn test_svg_elements_and_xlink() {
        let pool = pool("<svg><use xlink:href=\"{{icon}}\"/></svg>");
        let mut doc = Document::new();
        let instance = pool.get(&mut doc, "main", Some(&json!({"icon": "#star"}))).unwrap();
        let using = instance.node(1).unwrap();

        assert_eq!(doc.namespace(using), Some(SVG_NAMESPACE));
        assert_eq!(doc.attribute_ns(using, XLINK_NAMESPACE, "href"), Some("#star"));
    }

    // ----------------------------------------- remove tests

    #[test]
    fn test_remove_detaches_from_host_only() {
        let pool = pool("<p>x</p>");
        let mut doc = Document::new();
        let host = doc.create_element("body");
        let mut instance = pool.get(&mut doc, "main", None).unwrap();

        instance.remove(&mut doc).unwrap();
        assert_eq!(instance.state(), InstanceState::Mounted);

        let root = instance.dom(&mut doc).unwrap();
        doc.append_child(host, root).unwrap();
        instance.remove(&mut doc).unwrap();

        assert_eq!(instance.state(), InstanceState::Detached);
        assert!(doc.child_nodes(host).is_empty());
    }

    #[test]
    fn test_remove_takes_top_level_directive_children() {
        let mut registry = Registry::new();
        compile(
            markup::parse("<p if=\"shown\">{{label}}</p>").unwrap(),
            "main",
            &mut registry,
        )
        .unwrap();
        let pool = Pool::new(registry);
        let mut doc = Document::new();
        let host = doc.create_element("section");

        let mut instance = pool.get(&mut doc, "main", None).unwrap();
        let root = instance.dom(&mut doc).unwrap();
        doc.append_child(host, root).unwrap();
        instance
            .update(&mut doc, &pool, &json!({"shown": {"label": "hi"}}))
            .unwrap();
        assert_eq!(instance.collection(0)[0].template_name(), "if0");
        assert_eq!(doc.outer_html(host), "<section><p>hi</p></section>");

        instance.remove(&mut doc).unwrap();

        assert!(doc.child_nodes(host).is_empty());
        assert_eq!(instance.collection(0)[0].state(), InstanceState::Detached);
    }

    #[test]
    fn test_release_counts_and_returns_instance() {
        let pool = pool("<p>x</p>");
        let mut doc = Document::new();
        let instance = pool.get(&mut doc, "main", None).unwrap();
        let instance = pool.release(&mut doc, "main", instance).unwrap();

        assert_eq!(instance.template_name(), "main");
        assert_eq!(
            pool.stats(),
            PoolStats {
                created: 1,
                released: 1
            }
        );
    }
}
