//! # Query Engine
//!
//! Read-side operations over the quad store: record lookups, type
//! enumeration, dependency traversal and graph statistics.
//!
//! Enumeration queries skip subjects that fail to hydrate rather than
//! failing the whole scan; a reader running concurrently with an in-flight
//! build write may observe some but not all triples of the batch, and
//! skipping tolerates that window.

use crate::model::NinjaGraph;
use crate::storage::Quad;
use crate::types::{
    build_identity, file_identity, rule_identity, target_identity, GraphError, NinjaBuild,
    NinjaFile, NinjaRule, NinjaTarget, Record, PREDICATE_DEPENDS_ON, PREDICATE_HAS_IMPLICIT_DEP,
    PREDICATE_HAS_INPUT, PREDICATE_HAS_OUTPUT, PREDICATE_TYPE, RELATIONSHIP_PREDICATES,
};
use std::collections::{BTreeMap, BTreeSet};

impl NinjaGraph {
    /// Load a rule by name.
    pub fn get_rule(&self, name: &str) -> Result<NinjaRule, GraphError> {
        self.store().load_record(&rule_identity(name))
    }

    /// Load a build by id.
    ///
    /// The id is taken verbatim: the caller-supplied `build_id` for
    /// API-created builds, the comma-join of outputs for parser-ingested
    /// ones.
    pub fn get_build(&self, id: &str) -> Result<NinjaBuild, GraphError> {
        self.store().load_record(&build_identity(id))
    }

    /// Load a target by path.
    pub fn get_target(&self, path: &str) -> Result<NinjaTarget, GraphError> {
        self.store().load_record(&target_identity(path))
    }

    /// Enumerate every target via the type-marker index.
    pub fn get_all_targets(&self) -> Result<Vec<NinjaTarget>, GraphError> {
        let subjects = self.store().subjects_by_type(NinjaTarget::TYPE_NAME)?;
        let mut targets = Vec::with_capacity(subjects.len());
        for subject in subjects {
            if let Ok(target) = self.store().load_record::<NinjaTarget>(&subject) {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    /// All targets produced by builds that invoke the named rule.
    ///
    /// Each target appears at most once.
    pub fn get_targets_by_rule(&self, rule_name: &str) -> Result<Vec<NinjaTarget>, GraphError> {
        let builds = self
            .store()
            .subjects_with("rule", &rule_identity(rule_name))?;

        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();
        for build in builds {
            for target_id in self.store().objects(&build, PREDICATE_HAS_OUTPUT)? {
                if !seen.insert(target_id.clone()) {
                    continue;
                }
                if let Ok(target) = self.store().load_record::<NinjaTarget>(&target_id) {
                    targets.push(target);
                }
            }
        }
        Ok(targets)
    }

    /// Files the target's producing build consumes: inputs plus implicit
    /// deps, duplicates suppressed. Order-only deps never appear.
    pub fn get_build_dependencies(&self, target_path: &str) -> Result<Vec<NinjaFile>, GraphError> {
        let target = self.get_target(target_path)?;

        let mut file_ids = self.store().objects(&target.build, PREDICATE_HAS_INPUT)?;
        file_ids.extend(
            self.store()
                .objects(&target.build, PREDICATE_HAS_IMPLICIT_DEP)?,
        );

        let mut seen = BTreeSet::new();
        let mut files = Vec::new();
        for file_id in file_ids {
            if !seen.insert(file_id.clone()) {
                continue;
            }
            if let Ok(file) = self.store().load_record::<NinjaFile>(&file_id) {
                files.push(file);
            }
        }
        Ok(files)
    }

    /// Targets with a `depends_on` edge to the given file.
    pub fn get_reverse_dependencies(&self, file_path: &str) -> Result<Vec<NinjaTarget>, GraphError> {
        let subjects = self
            .store()
            .incoming(&file_identity(file_path), PREDICATE_DEPENDS_ON)?;

        let mut targets = Vec::with_capacity(subjects.len());
        for subject in subjects {
            if let Ok(target) = self.store().load_record::<NinjaTarget>(&subject) {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    /// Counts of entities, triples and relationship edges.
    pub fn get_build_stats(&self) -> Result<BTreeMap<String, u64>, GraphError> {
        let mut rules = 0u64;
        let mut builds = 0u64;
        let mut targets = 0u64;
        let mut files = 0u64;
        let mut relationships = 0u64;
        let mut total = 0u64;

        for quad in self.store().scan_all()? {
            total += 1;
            if quad.predicate == PREDICATE_TYPE {
                match quad.object.as_str() {
                    "NinjaRule" => rules += 1,
                    "NinjaBuild" => builds += 1,
                    "NinjaTarget" => targets += 1,
                    "NinjaFile" => files += 1,
                    _ => {}
                }
            } else if RELATIONSHIP_PREDICATES.contains(&quad.predicate.as_str()) {
                relationships += 1;
            }
        }

        let mut stats = BTreeMap::new();
        stats.insert("rules".to_string(), rules);
        stats.insert("builds".to_string(), builds);
        stats.insert("targets".to_string(), targets);
        stats.insert("files".to_string(), files);
        stats.insert("relationships".to_string(), relationships);
        stats.insert("total_quads".to_string(), total);
        Ok(stats)
    }

    /// The first `limit` triples of the store, for inspection.
    pub fn debug_quads(&self, limit: usize) -> Result<Vec<Quad>, GraphError> {
        let mut quads = self.store().scan_all()?;
        quads.truncate(limit);
        Ok(quads)
    }
}

// =============================================================================
// TESTS
// =============================================================================
