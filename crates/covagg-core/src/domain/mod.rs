//! Data model of a multi-module build as seen by the aggregator.
//!
//! Types here are data-only: no filesystem side effects.

pub mod module;

pub use module::{DependencyRecord, DependencyScope, Module, ModuleKey};
