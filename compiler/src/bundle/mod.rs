//! Template Bundler
//!
//! Compiles a set of template files into one registry and wraps
//! the emitted constructor functions as a single artifact,
//! either a CommonJS module or a browser script that registers
//! a pool on `window.templates`. Template names come from file
//! names, so `card.yat` and `card.min.yat` both become `card`.
//!

pub mod config;

use crate::compiler::{self, CompileError, Registry, codegen};
use crate::markup::{self, MarkupError};
use log::debug;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ------------------------------------------------------------- Private Consts

const RUNTIME_SOURCE: &str = include_str!("../../assets/yate.js");

// ------------------------------------------------------------- Public Types

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `module.exports` of the template map, requiring the
    /// runtime as `yate`.
    ///
    Module,
    /// Assigns a ready pool to `window.templates`.
    ///
    #[default]
    Script,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot derive a template name from {}", .0.display())]
    InvalidName(PathBuf),
    #[error("Markup error in {}: {source}", .path.display())]
    Markup {
        path: PathBuf,
        #[source]
        source: MarkupError,
    },
    #[error("Compile error in {}: {source}", .path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
}

// ------------------------------------------------------------- Public Functions

/// Reads, compiles and wraps every file in `files`.
///
pub fn build<P: AsRef<Path>>(files: &[P], format: OutputFormat) -> Result<String, BuildError> {
    let registry = compile_files(files)?;
    Ok(render(&registry, format))
}

/// Compiles every file into one shared registry, in the order
/// given. Stops at the first failure.
///
pub fn compile_files<P: AsRef<Path>>(files: &[P]) -> Result<Registry, BuildError> {
    let mut registry = Registry::new();

    for file in files {
        let path = file.as_ref();
        let name =
            template_name(path).ok_or_else(|| BuildError::InvalidName(path.to_path_buf()))?;
        let source = fs::read_to_string(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = markup::parse(&source).map_err(|source| BuildError::Markup {
            path: path.to_path_buf(),
            source,
        })?;

        compiler::compile(tree, &name, &mut registry).map_err(|source| BuildError::Compile {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("{} -> {}", path.display(), name);
    }

    Ok(registry)
}

/// Wraps every template of a registry in the requested format.
///
pub fn render(registry: &Registry, format: OutputFormat) -> String {
    let pool = registry
        .iter()
        .map(|template| format!("{}:{}", Value::from(template.name.as_str()), codegen::emit(template)))
        .collect::<Vec<_>>()
        .join(",");

    match format {
        OutputFormat::Module => {
            format!("const yate = require(\"yate\");\nmodule.exports = {{{}}};\n", pool)
        }
        OutputFormat::Script => format!(
            "const templateList = {{{}}};\nwindow.templates = yate.pool(templateList);\n",
            pool
        ),
    }
}

/// The file name up to its first `.`.
///
pub fn template_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next()?;

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// The JavaScript runtime the emitted templates call into.
///
pub fn runtime_source() -> &'static str {
    RUNTIME_SOURCE
}

// ------------------------------------------------------------- Unit Tests
