//! # convoy-common
//!
//! Shared types, error definitions, and naming conventions used across
//! the entire Convoy workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the foundational primitives that all other
//! crates build upon.

pub mod error;
pub mod naming;
pub mod types;
