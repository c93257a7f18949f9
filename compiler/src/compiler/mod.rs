//! Template Compiler
//!
//! Turns a markup tree into compiled templates. Every template
//! carries a node-construction program, an attachment program
//! and a dispatch table of update functions keyed by dotted
//! binding path. Directives split the tree into nested
//! templates, all registered into one shared registry.
//!

pub mod bindings;
pub mod codegen;
pub mod patterns;
pub mod resolver;
pub mod template;
pub mod walker;

use crate::markup::Node;
use indexmap::IndexMap;
use log::debug;
use std::rc::Rc;
use template::{Directive, Template};
use thiserror::Error;
use walker::TreeCompiler;

// ------------------------------------------------------------- Public Types

/// Errors raised while compiling a markup tree. Compilation
/// stops at the first one.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A `{{ ... }}` reference that is not a dotted identifier
    /// path.
    ///
    #[error("Invalid variable path '{0}'")]
    InvalidPath(String),
    #[error("Invalid value '{value}' for directive '{directive}'")]
    InvalidDirective {
        directive: &'static str,
        value: String,
    },
    /// A template name registered twice in the same registry.
    ///
    #[error("Template '{0}' is already registered")]
    DuplicateTemplate(String),
}

/// Compiled templates keyed by name. Written during the
/// compilation pass and only read afterwards.
///
#[derive(Debug, Default)]
pub struct Registry {
    templates: IndexMap<String, Rc<Template>>,
    /// Shared by every compiler in the pass so nested names stay
    /// unique across files.
    ///
    nested_counter: usize,
    /// Names of templates still being walked. Nested names must
    /// not take them.
    ///
    pending: Vec<String>,
}

// ------------------------------------------------------------- Public Implementations

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Template>> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template names in registration order. Nested templates
    /// register before the template that spawned them.
    ///
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values().map(|t| t.as_ref())
    }

    /// Synthesizes the next unused name for a directive's nested
    /// template, e.g. `for3`.
    ///
    pub fn nested_name(&mut self, directive: Directive) -> String {
        loop {
            let name = format!("{}{}", directive.attribute(), self.nested_counter);
            self.nested_counter += 1;
            if !self.contains(&name) && !self.pending.contains(&name) {
                return name;
            }
        }
    }

    /// Holds `name` for a template whose walk has started but
    /// which is not registered yet.
    ///
    pub(crate) fn reserve(&mut self, name: &str) {
        self.pending.push(name.to_string());
    }

    pub(crate) fn insert(&mut self, template: Template) -> Result<(), CompileError> {
        self.pending.retain(|name| *name != template.name);
        if self.contains(&template.name) {
            return Err(CompileError::DuplicateTemplate(template.name));
        }
        self.templates
            .insert(template.name.clone(), Rc::new(template));
        Ok(())
    }
}

// ------------------------------------------------------------- Public Functions

/// Compiles a markup tree under `name`, registering it and every
/// nested template its directives spawn.
///
pub fn compile(tree: Node, name: &str, registry: &mut Registry) -> Result<(), CompileError> {
    let before = registry.len();
    TreeCompiler::new(registry).compile(tree, name)?;
    debug!(
        "compiled {} into {} template(s)",
        name,
        registry.len() - before
    );
    Ok(())
}

// ------------------------------------------------------------- Unit Tests
