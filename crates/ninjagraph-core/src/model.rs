//! # Graph Model
//!
//! Write operations that maintain the relational invariants of the build
//! graph: every output gets a target with a `build` back-edge, every input
//! and implicit dep gets a file node, and `depends_on` edges are
//! materialized at write time so queries never have to derive them.
//!
//! All writes for one operation form a single atomic batch; readers observe
//! batch boundaries only.

use crate::storage::{QuadBatch, QuadStore};
use crate::types::{
    build_identity, file_identity, target_identity, GraphError, NinjaBuild, NinjaFile, NinjaRule,
    NinjaTarget, Record, PREDICATE_DEPENDS_ON, PREDICATE_HAS_IMPLICIT_DEP, PREDICATE_HAS_INPUT,
    PREDICATE_HAS_ORDER_DEP, PREDICATE_HAS_OUTPUT, PREDICATE_LAST_MODIFIED, PREDICATE_STATUS,
};
use std::path::Path;

/// The persistent Ninja build graph.
///
/// Owns the quad store; all mutation and query entry points hang off this
/// type. Handlers share it behind a lock.
#[derive(Debug)]
pub struct NinjaGraph {
    store: QuadStore,
}

impl NinjaGraph {
    /// Open or create a build graph at the given store directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        Ok(Self {
            store: QuadStore::open(path)?,
        })
    }

    /// Access the underlying quad store.
    #[must_use]
    pub fn store(&self) -> &QuadStore {
        &self.store
    }

    /// Add (or re-create) a rule.
    ///
    /// Idempotent on identity: two writes with the same name reconcile to
    /// one node. Returns the rule identity.
    pub fn add_rule(&self, rule: &NinjaRule) -> Result<String, GraphError> {
        if rule.name.is_empty() {
            return Err(GraphError::InvalidArgument("rule name is required".into()));
        }
        if rule.command.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "rule {} requires a command",
                rule.name
            )));
        }
        self.store.write_record(rule)?;
        Ok(rule.identity())
    }

    /// Add a build statement with its inputs, outputs and dependencies.
    ///
    /// In one atomic batch this writes the build record, a target per
    /// output, a file per input and implicit dep, the
    /// `has_input`/`has_output`/`has_implicit_dep`/`has_order_dep` edges,
    /// and a `depends_on` edge from every output to every input and every
    /// implicit dep. Order-only deps get their edge but no file record and
    /// no `depends_on`.
    ///
    /// An output whose target already exists keeps its `status` and `hash`;
    /// only the producing-build back-edge is rewritten.
    ///
    /// Returns the build identity.
    pub fn add_build(
        &self,
        build: &NinjaBuild,
        inputs: &[String],
        outputs: &[String],
        implicit_deps: &[String],
        order_deps: &[String],
    ) -> Result<String, GraphError> {
        if build.build_id.is_empty() {
            return Err(GraphError::InvalidArgument("build_id is required".into()));
        }

        let build_id = build_identity(&build.build_id);
        let mut batch = QuadBatch::new();
        batch.put_record(build);

        for output in outputs {
            let target = match self.store.load_record::<NinjaTarget>(&target_identity(output)) {
                Ok(existing) => NinjaTarget {
                    path: output.clone(),
                    status: existing.status,
                    hash: existing.hash,
                    build: build_id.clone(),
                },
                Err(GraphError::NotFound(_)) => NinjaTarget::new(output.clone(), build_id.clone()),
                Err(e) => return Err(e),
            };
            batch.put_record(&target);
            batch.add(build_id.clone(), PREDICATE_HAS_OUTPUT, target_identity(output));
        }

        for input in inputs {
            batch.put_record(&NinjaFile::new(input.clone()));
            batch.add(build_id.clone(), PREDICATE_HAS_INPUT, file_identity(input));
            for output in outputs {
                batch.add(
                    target_identity(output),
                    PREDICATE_DEPENDS_ON,
                    file_identity(input),
                );
            }
        }

        for dep in implicit_deps {
            batch.put_record(&NinjaFile::new(dep.clone()));
            batch.add(build_id.clone(), PREDICATE_HAS_IMPLICIT_DEP, file_identity(dep));
            for output in outputs {
                batch.add(
                    target_identity(output),
                    PREDICATE_DEPENDS_ON,
                    file_identity(dep),
                );
            }
        }

        for dep in order_deps {
            batch.add(build_id.clone(), PREDICATE_HAS_ORDER_DEP, file_identity(dep));
        }

        self.store.apply(&batch)?;
        Ok(build_id)
    }

    /// Update a target's status.
    ///
    /// Fails with `NotFound` if the target does not exist. Swaps the status
    /// edge and stamps `last_modified` in one transaction.
    pub fn update_target_status(&self, path: &str, status: &str) -> Result<(), GraphError> {
        if status.is_empty() {
            return Err(GraphError::InvalidArgument("status must be non-empty".into()));
        }

        let identity = target_identity(path);
        let _ = self.store.load_record::<NinjaTarget>(&identity)?;

        let mut batch = QuadBatch::new();
        batch.clear_field(identity.clone(), PREDICATE_STATUS);
        batch.clear_field(identity.clone(), PREDICATE_LAST_MODIFIED);
        batch.add(identity.clone(), PREDICATE_STATUS, status);
        batch.add(
            identity,
            PREDICATE_LAST_MODIFIED,
            chrono::Utc::now().to_rfc3339(),
        );
        self.store.apply(&batch)
    }
}

// =============================================================================
// TESTS
// =============================================================================
