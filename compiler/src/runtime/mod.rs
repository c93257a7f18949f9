//! Instance Runtime
//!
//! Renders compiled templates into an in-memory document and
//! keeps nested instance collections in step with the data
//! their directives are bound to. Reconciliation is by
//! position: existing instances are updated in place, surplus
//! ones released from the end, and new ones inserted as one
//! batch right before the directive's anchor.
//!

pub mod dom;
pub mod pool;
pub mod value;

use dom::{Document, DomError, NodeId};
use log::trace;
use pool::{Instance, Pool};
use serde_json::Value;
use thiserror::Error;

// ------------------------------------------------------------- Public Types

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),
    /// Nested instances can only be inserted next to an anchor
    /// that has a parent.
    ///
    #[error("Anchor for template '{0}' is not attached to a parent")]
    DetachedAnchor(String),
}

// ------------------------------------------------------------- Public Functions

/// Single optional child: one instance while `value` is truthy,
/// none otherwise.
///
pub fn render_child(
    doc: &mut Document,
    pool: &Pool,
    name: &str,
    anchor: NodeId,
    value: &Value,
    children: &mut Vec<Instance>,
) -> Result<(), RuntimeError> {
    if value::is_truthy(value) {
        render_children(doc, pool, name, anchor, std::slice::from_ref(value), children)
    } else {
        render_children(doc, pool, name, anchor, &[], children)
    }
}

/// Brings `children` to exactly one instance per element of
/// `data`, reusing instances by position.
///
pub fn render_children(
    doc: &mut Document,
    pool: &Pool,
    name: &str,
    anchor: NodeId,
    data: &[Value],
    children: &mut Vec<Instance>,
) -> Result<(), RuntimeError> {
    let existing = children.len();
    trace!("reconciling {} ({} -> {})", name, existing, data.len());

    while children.len() > data.len() {
        if let Some(instance) = children.pop() {
            pool.release(doc, name, instance)?;
        }
    }

    for (instance, item) in children.iter_mut().zip(data) {
        instance.update(doc, pool, item)?;
    }

    if existing >= data.len() {
        return Ok(());
    }

    let parent = doc
        .parent_node(anchor)
        .ok_or_else(|| RuntimeError::DetachedAnchor(name.to_string()))?;
    let batch = doc.create_fragment();

    for item in &data[existing..] {
        let mut instance = pool.get(doc, name, None)?;
        let root = instance.dom(doc)?;
        doc.append_child(batch, root)?;
        instance.update(doc, pool, item)?;
        children.push(instance);
    }

    doc.insert_before(parent, batch, Some(anchor))?;
    Ok(())
}

/// Single optional child for values that must be non-empty.
/// The existing instance is updated in place while the value
/// stays non-empty.
///
pub fn render_when(
    doc: &mut Document,
    pool: &Pool,
    name: &str,
    anchor: NodeId,
    value: &Value,
    children: &mut Vec<Instance>,
) -> Result<(), RuntimeError> {
    if !value::is_present(value) {
        if let Some(instance) = children.pop() {
            pool.release(doc, name, instance)?;
        }
        return Ok(());
    }

    if let Some(instance) = children.first_mut() {
        return instance.update(doc, pool, value);
    }

    let parent = doc
        .parent_node(anchor)
        .ok_or_else(|| RuntimeError::DetachedAnchor(name.to_string()))?;
    let mut instance = pool.get(doc, name, None)?;
    let root = instance.dom(doc)?;
    doc.insert_before(parent, root, Some(anchor))?;
    instance.update(doc, pool, value)?;
    children.push(instance);
    Ok(())
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Registry, compile};
    use crate::markup;
    use serde_json::json;

    /// A pool holding a plain `item` template and a host element
    /// with an anchor to render next to.
    ///
    fn setup() -> (Pool, Document, NodeId, NodeId) {
        let mut registry = Registry::new();
        compile(
            markup::parse("<li>{{label}}</li>").unwrap(),
            "item",
            &mut registry,
        )
        .unwrap();

        let mut doc = Document::new();
        let host = doc.create_element("ul");
        let anchor = doc.create_text_node("");
        doc.append_child(host, anchor).unwrap();
        (Pool::new(registry), doc, host, anchor)
    }

    fn items(labels: &[&str]) -> Vec<Value> {
        labels.iter().map(|l| json!({ "label": l })).collect()
    }

    // ----------------------------------------- render_children tests

    #[test]
    fn test_render_children_inserts_before_anchor_in_order() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();

        render_children(&mut doc, &pool, "item", anchor, &items(&["a", "b", "c"]), &mut children)
            .unwrap();

        assert_eq!(children.len(), 3);
        assert_eq!(doc.outer_html(host), "<ul><li>a</li><li>b</li><li>c</li></ul>");
        assert_eq!(doc.child_nodes(host).last(), Some(&anchor));
    }

    #[test]
    fn test_render_children_shrinks_and_reuses() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();

        render_children(&mut doc, &pool, "item", anchor, &items(&["a", "b", "c"]), &mut children)
            .unwrap();
        let kept: Vec<_> = children.iter().take(2).map(|c| c.top()).collect();

        render_children(&mut doc, &pool, "item", anchor, &items(&["x", "y"]), &mut children)
            .unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children.iter().map(|c| c.top()).collect::<Vec<_>>(), kept);
        assert_eq!(pool.stats().released, 1);
        assert_eq!(pool.stats().created, 3);
        assert_eq!(doc.outer_html(host), "<ul><li>x</li><li>y</li></ul>");
    }

    #[test]
    fn test_render_children_grows_after_existing() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();

        render_children(&mut doc, &pool, "item", anchor, &items(&["a"]), &mut children).unwrap();
        render_children(&mut doc, &pool, "item", anchor, &items(&["b", "c", "d"]), &mut children)
            .unwrap();

        assert_eq!(children.len(), 3);
        assert_eq!(pool.stats().created, 3);
        assert_eq!(
            doc.outer_html(host),
            "<ul><li>b</li><li>c</li><li>d</li></ul>"
        );
    }

    #[test]
    fn test_render_children_empty() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();

        render_children(&mut doc, &pool, "item", anchor, &items(&["a", "b"]), &mut children)
            .unwrap();
        render_children(&mut doc, &pool, "item", anchor, &[], &mut children).unwrap();

        assert!(children.is_empty());
        assert_eq!(doc.child_nodes(host), [anchor]);
    }

    #[test]
    fn test_render_children_detached_anchor() {
        let (pool, mut doc, _, _) = setup();
        let loose = doc.create_text_node("");
        let mut children = Vec::new();

        assert_eq!(
            render_children(&mut doc, &pool, "item", loose, &items(&["a"]), &mut children),
            Err(RuntimeError::DetachedAnchor("item".to_string()))
        );
    }

    // ----------------------------------------- render_child tests

    #[test]
    fn test_render_child_toggles() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();
        let mut lengths = Vec::new();

        for value in [json!(null), json!({"label": "Bo"}), json!(null)] {
            render_child(&mut doc, &pool, "item", anchor, &value, &mut children).unwrap();
            lengths.push(children.len());
        }

        assert_eq!(lengths, vec![0, 1, 0]);
        assert_eq!(pool.stats().released, 1);
        assert_eq!(doc.child_nodes(host), [anchor]);
    }

    #[test]
    fn test_render_child_false_is_absent() {
        let (pool, mut doc, _, anchor) = setup();
        let mut children = Vec::new();

        render_child(&mut doc, &pool, "item", anchor, &json!(false), &mut children).unwrap();
        assert!(children.is_empty());
        assert_eq!(pool.stats().created, 0);
    }

    // ----------------------------------------- render_when tests

    #[test]
    fn test_render_when_updates_in_place() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();

        render_when(&mut doc, &pool, "item", anchor, &json!({"label": "a"}), &mut children)
            .unwrap();
        render_when(&mut doc, &pool, "item", anchor, &json!({"label": "b"}), &mut children)
            .unwrap();

        assert_eq!(children.len(), 1);
        assert_eq!(pool.stats().created, 1);
        assert_eq!(doc.outer_html(host), "<ul><li>b</li></ul>");
    }

    #[test]
    fn test_render_when_empty_releases() {
        let (pool, mut doc, host, anchor) = setup();
        let mut children = Vec::new();

        render_when(&mut doc, &pool, "item", anchor, &json!({"label": "a"}), &mut children)
            .unwrap();
        render_when(&mut doc, &pool, "item", anchor, &json!({}), &mut children).unwrap();

        assert!(children.is_empty());
        assert_eq!(pool.stats().released, 1);
        assert_eq!(doc.child_nodes(host), [anchor]);
    }
}
