//! # Storage Backends
//!
//! Persistent quad storage for the build graph.

mod redb_quads;

pub use redb_quads::{Quad, QuadBatch, QuadStore};
