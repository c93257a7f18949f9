//! Yate
//!
//! Compiles directive-driven markup templates into construction,
//! attachment and keyed update programs. The programs can be
//! emitted as JavaScript constructor functions for the browser
//! runtime, or interpreted in process against an in-memory
//! document.
//!

pub mod bundle;
pub mod common;
pub mod compiler;
pub mod markup;
pub mod runtime;
