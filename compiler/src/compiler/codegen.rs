//! JavaScript Emitter
//!
//! Renders a compiled template as the source of a constructor
//! function `function(pool){...}` returning `{dom, update,
//! remove}`. The emitted code calls the browser runtime's
//! `yate.renderChild`, `yate.renderChildren` and
//! `yate.renderWhen` for directives.
//!

use super::template::{Attach, Binding, Construct, Dispatch, Interp, Op, Parent, Part, Template};
use super::patterns::{SVG_NAMESPACE, XLINK_HREF, XLINK_NAMESPACE};
use serde_json::Value;

// ------------------------------------------------------------- Public Functions

/// Emits the constructor function for one template.
///
pub fn emit(template: &Template) -> String {
    let declarations = declarations(template);
    let funcs = template
        .computations
        .iter()
        .enumerate()
        .map(|(i, op)| format!("\t\t{}:function(){{{}}}", i, op_code(op)))
        .collect::<Vec<_>>()
        .join(",\n");
    let updates = template
        .dispatch
        .iter()
        .map(|(key, dispatch)| format!("\t\t{}:{}", quote(key), dispatch_code(dispatch)))
        .collect::<Vec<_>>()
        .join(",\n");
    let dom = template
        .construction
        .iter()
        .map(construct_code)
        .chain(template.attachment.iter().map(attach_code))
        .map(|line| format!("\t\t\t{};", line))
        .collect::<Vec<_>>()
        .join("\n");
    let remove = remove_code(template);

    format!(
        "function(pool) {{
\t'use strict';
{declarations}\tconst f = {{
{funcs}
\t}};
\tconst u = {{
{updates}
\t}};
\tconst root = document.createDocumentFragment();
\tlet mounted = false;

\tfunction createDom() {{
\t\tif (!mounted) {{
\t\t\tmounted = true;
{dom}
\t\t}}
\t\treturn root;
\t}}

\tfunction updateDom(a) {{
\t\tcreateDom();
\t\tif (a && typeof a === 'object') {{
\t\t\tObject.entries(a).forEach(([key, value]) => {{
\t\t\t\tif (u[key]) {{
\t\t\t\t\tu[key](value);
\t\t\t\t}} else {{
\t\t\t\t\tconsole.warn(`Unused var: {{${{key}}}}`);
\t\t\t\t}}
\t\t\t}});
\t\t}}
\t}}

\tfunction removeDom() {{
{remove}\t}}

\treturn {{
\t\tdom: createDom,
\t\tupdate: updateDom,
\t\tremove: removeDom
\t}};
}}"
    )
}

// ------------------------------------------------------------- Private Functions

/// Declares node slots, identifiers (as empty strings) and
/// collections (as empty arrays).
///
fn declarations(template: &Template) -> String {
    let nodes = template.construction.iter().map(|c| c.slot().to_string());
    let vars = (0..template.var_count).map(|i| format!("v{}=\"\"", i));
    let collections = (0..template.collection_count).map(|i| format!("c{}=[]", i));
    let all: Vec<_> = nodes.chain(vars).chain(collections).collect();

    if all.is_empty() {
        String::new()
    } else {
        format!("\tlet {};\n", all.join(", "))
    }
}

fn construct_code(entry: &Construct) -> String {
    match entry {
        Construct::Element { slot, tag, svg: true } => format!(
            "{}=document.createElementNS({}, {})",
            slot,
            quote(SVG_NAMESPACE),
            quote(tag)
        ),
        Construct::Element { slot, tag, .. } => {
            format!("{}=document.createElement({})", slot, quote(tag))
        }
        Construct::Text { slot, content } => {
            format!("{}=document.createTextNode({})", slot, quote(content))
        }
        Construct::Anchor { slot } => format!("{}=document.createTextNode(\"\")", slot),
    }
}

fn attach_code(entry: &Attach) -> String {
    match entry {
        Attach::Append {
            parent: Parent::Root,
            child,
        } => format!("root.appendChild({})", child),
        Attach::Append {
            parent: Parent::Node(parent),
            child,
        } => format!("{}.appendChild({})", parent, child),
        Attach::SetAttribute { node, name, value } => {
            format!("{}.setAttribute({}, {})", node, quote(name), quote(value))
        }
        Attach::SetAttributeNs {
            node,
            namespace,
            name,
            value,
        } => format!(
            "{}.setAttributeNS({}, {}, {})",
            node,
            quote(namespace),
            quote(name),
            quote(value)
        ),
    }
}

/// Removes the top-level nodes and the instances of directives
/// anchored next to them.
///
fn remove_code(template: &Template) -> String {
    let children = template
        .root_collections()
        .into_iter()
        .map(|collection| format!("\t\t{}.forEach((child) => child.remove());\n", collection));
    let nodes = template.root_slots().map(|node| {
        format!(
            "\t\tif ({node} && {node}.parentNode && {node}.parentNode !== root) {{\n\t\t\t{node}.parentNode.removeChild({node});\n\t\t}}\n"
        )
    });

    children.chain(nodes).collect()
}

fn op_code(op: &Op) -> String {
    match op {
        Op::SetText { node, value } => format!("{}.textContent={}", node, expr(value)),
        Op::SetProperty { node, name, value } => {
            let raw = match value.single_var() {
                Some(var) => var.to_string(),
                None => expr(value),
            };
            format!("{}.{}={}", node, name, raw)
        }
        Op::SetAttribute { node, name, value } => {
            format!("{}.setAttribute({},{})", node, quote(name), expr(value))
        }
        Op::SetAttributeNs {
            node,
            namespace,
            name,
            value,
        } => format!(
            "{}.setAttributeNS({},{},{})",
            node,
            quote(namespace),
            quote(name),
            expr(value)
        ),
        Op::RemoveAttributeIfFalse {
            node,
            name,
            var,
            otherwise,
        } => {
            let removal = if name == XLINK_HREF {
                format!(
                    "{}.removeAttributeNS({},{})",
                    node,
                    quote(XLINK_NAMESPACE),
                    quote("href")
                )
            } else {
                format!("{}.removeAttribute({})", node, quote(name))
            };
            let clear = match otherwise.as_ref() {
                Op::SetProperty { name, .. } => format!("yate.clear({},{});", node, quote(name)),
                _ => String::new(),
            };
            format!(
                "if ({}===false) {{{};{}return;}}{}",
                var,
                removal,
                clear,
                op_code(otherwise)
            )
        }
        Op::Reconcile {
            directive,
            template,
            anchor,
            value,
            collection,
        } => format!(
            "yate.{}({},{},{},pool,{})",
            directive.runtime_call(),
            quote(template),
            anchor,
            value,
            collection
        ),
    }
}

fn dispatch_code(dispatch: &Dispatch) -> String {
    let binds = dispatch.bindings.iter().map(binding_code);
    let calls = dispatch.computations.iter().map(|i| format!("f[{}]()", i));
    let body: Vec<_> = binds.chain(calls).collect();
    format!("function(a){{{};}}", body.join(";"))
}

/// `v3=a?.name?.first` for a binding two segments below the
/// dispatched key.
///
fn binding_code(binding: &Binding) -> String {
    let mut access = String::from("a");
    for segment in &binding.tail {
        access.push_str("?.");
        access.push_str(segment);
    }
    format!("{}={}", binding.var, access)
}

/// String concatenation of literals and rendered identifiers.
/// `yate.text` maps missing values to the empty string and
/// serializes arrays and objects. An empty interpolation is the
/// empty string literal.
///
fn expr(value: &Interp) -> String {
    if value.parts.is_empty() {
        return quote("");
    }

    value
        .parts
        .iter()
        .map(|part| match part {
            Part::Literal(text) => quote(text),
            Part::Var(var) => format!("yate.text({})", var),
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// JSON string quoting, which is also a valid JavaScript string
/// literal.
///
fn quote(text: &str) -> String {
    Value::from(text).to_string()
}

// ------------------------------------------------------------- Unit Tests
