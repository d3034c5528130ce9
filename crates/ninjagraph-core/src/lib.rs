//! # ninjagraph-core
//!
//! The persistent build-graph substrate - THE LOGIC.
//!
//! This crate ingests Ninja build descriptions, represents them as a typed
//! dependency graph in a quad-oriented store, and answers structural
//! queries over that graph.
//!
//! ## Architecture
//!
//! - `types` - entity records, identities, predicates, errors
//! - `storage` - the redb-backed quad store (three indexes, atomic batches)
//! - `model` - write operations maintaining the relational invariants
//! - `parser` - the Ninja text state machine
//! - `query` - read-side operations
//! - `analysis` - topological ordering and cycle detection
//!
//! ## Constraints
//!
//! The core is synchronous and network-free. All async, transport and CLI
//! concerns live in the app layer. The store is the only shared mutable
//! resource; every mutation is a single atomic batch.

// =============================================================================
// MODULES
// =============================================================================

pub mod analysis;
pub mod model;
pub mod parser;
pub mod query;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use model::NinjaGraph;
pub use parser::{parse, NinjaParser, ParsedBuild, ParsedFile};
pub use storage::{Quad, QuadBatch, QuadStore};
pub use types::{
    FileType, GraphError, NinjaBuild, NinjaFile, NinjaRule, NinjaTarget, ParseError, Record,
};
