//! # redb-backed Quad Store
//!
//! A disk-backed triple store using the redb embedded database.
//!
//! Triples `(subject, predicate, object)` are kept in three tables, one per
//! iteration order:
//! - `spo` for subject-first scans (record hydration, edge expansion)
//! - `osp` for object-first scans (reverse dependencies)
//! - `pos` for predicate-first scans (type enumeration, rule lookups)
//!
//! redb provides ACID transactions, crash safety (copy-on-write B-trees),
//! and MVCC (concurrent readers, single writer). Every mutation goes through
//! a [`QuadBatch`] applied in a single write transaction, so readers observe
//! batches atomically.
//!
//! Entity enumeration scans the `pos` index by type marker; there is no
//! per-type secondary table. Enumeration is O(N) in total triples, which is
//! acceptable for this system's working set.

use crate::types::{GraphError, Record, PREDICATE_TYPE};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Subject-first index: (subject, predicate, object) -> ().
const SPO: TableDefinition<(&str, &str, &str), ()> = TableDefinition::new("spo");

/// Object-first index: (object, subject, predicate) -> ().
const OSP: TableDefinition<(&str, &str, &str), ()> = TableDefinition::new("osp");

/// Predicate-first index: (predicate, object, subject) -> ().
const POS: TableDefinition<(&str, &str, &str), ()> = TableDefinition::new("pos");

/// Name of the database file inside the store directory.
const DB_FILE: &str = "graph.redb";

type TripleTable<'txn> = redb::Table<'txn, (&'static str, &'static str, &'static str), ()>;

fn store_err(e: impl std::fmt::Display) -> GraphError {
    GraphError::StoreUnavailable(e.to_string())
}

// =============================================================================
// QUAD
// =============================================================================

/// A single `(subject, predicate, object)` triple.
///
/// The label position of a full quad is unused; the store is effectively a
/// triple store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quad {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Quad {
    /// Create a new triple.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

// =============================================================================
// QUAD BATCH
// =============================================================================

/// A staged set of mutations applied in one atomic write transaction.
///
/// Application order is clears, then removes, then adds, so a batch may
/// overwrite a field by clearing its `(subject, predicate)` slot and adding
/// the new value.
#[derive(Debug, Default)]
pub struct QuadBatch {
    clears: Vec<(String, String)>,
    removes: Vec<Quad>,
    adds: Vec<Quad>,
}

impl QuadBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a triple for insertion.
    pub fn add(&mut self, subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> &mut Self {
        self.adds.push(Quad::new(subject, predicate, object));
        self
    }

    /// Stage an exact triple for removal.
    pub fn remove(&mut self, quad: Quad) -> &mut Self {
        self.removes.push(quad);
        self
    }

    /// Stage removal of every triple with the given subject and predicate.
    pub fn clear_field(&mut self, subject: impl Into<String>, predicate: impl Into<String>) -> &mut Self {
        self.clears.push((subject.into(), predicate.into()));
        self
    }

    /// Stage a typed record: clear each field slot, add the field triples and
    /// the type marker. Re-staging the same identity overwrites prior values.
    pub fn put_record<R: Record>(&mut self, record: &R) -> &mut Self {
        let identity = record.identity();
        for (predicate, object) in record.to_fields() {
            self.clear_field(identity.clone(), predicate);
            self.add(identity.clone(), predicate, object);
        }
        self.add(identity, PREDICATE_TYPE, R::TYPE_NAME);
        self
    }

    /// Whether the batch stages no mutations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clears.is_empty() && self.removes.is_empty() && self.adds.is_empty()
    }
}

// =============================================================================
// QUAD STORE
// =============================================================================

/// A persistent, indexed triple store.
///
/// The store owns a directory; the redb database file lives inside it. The
/// directory is never cleaned up on close.
pub struct QuadStore {
    db: Database,
}

impl std::fmt::Debug for QuadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadStore").finish_non_exhaustive()
    }
}

impl QuadStore {
    /// Open or create a store at the given directory.
    ///
    /// Fails with `StoreUnavailable` if the directory cannot be created or
    /// the backend refuses to open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let dir = path.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            GraphError::StoreUnavailable(format!(
                "cannot create store directory {}: {e}",
                dir.display()
            ))
        })?;

        let db = Database::create(dir.join(DB_FILE)).map_err(store_err)?;

        // Initialize tables so the first read transaction finds them.
        {
            let write_txn = db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(SPO).map_err(store_err)?;
            let _ = write_txn.open_table(OSP).map_err(store_err)?;
            let _ = write_txn.open_table(POS).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        Ok(Self { db })
    }

    /// Flush and release the store.
    ///
    /// Dropping the store has the same effect; the consuming signature makes
    /// double-close unrepresentable.
    pub fn close(self) {}

    /// Apply a batch atomically. On any failure the whole batch is rejected.
    pub fn apply(&self, batch: &QuadBatch) -> Result<(), GraphError> {
        if batch.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut spo = write_txn.open_table(SPO).map_err(store_err)?;
            let mut osp = write_txn.open_table(OSP).map_err(store_err)?;
            let mut pos = write_txn.open_table(POS).map_err(store_err)?;

            // Clears: collect matching triples first, then delete from all
            // three indexes.
            for (subject, predicate) in &batch.clears {
                let mut doomed = Vec::new();
                for entry in spo
                    .range((subject.as_str(), predicate.as_str(), "")..)
                    .map_err(store_err)?
                {
                    let (key, _) = entry.map_err(store_err)?;
                    let (s, p, o) = key.value();
                    if s != subject.as_str() || p != predicate.as_str() {
                        break;
                    }
                    doomed.push(Quad::new(s, p, o));
                }
                for quad in doomed {
                    remove_quad(&mut spo, &mut osp, &mut pos, &quad)?;
                }
            }

            for quad in &batch.removes {
                remove_quad(&mut spo, &mut osp, &mut pos, quad)?;
            }

            for quad in &batch.adds {
                let (s, p, o) = (quad.subject.as_str(), quad.predicate.as_str(), quad.object.as_str());
                spo.insert((s, p, o), ()).map_err(store_err)?;
                osp.insert((o, s, p), ()).map_err(store_err)?;
                pos.insert((p, o, s), ()).map_err(store_err)?;
            }
        }
        write_txn.commit().map_err(store_err)?;

        Ok(())
    }

    /// Write a typed record, overwriting prior field values for the same
    /// identity.
    pub fn write_record<R: Record>(&self, record: &R) -> Result<(), GraphError> {
        let mut batch = QuadBatch::new();
        batch.put_record(record);
        self.apply(&batch)
    }

    /// Append relationship triples atomically.
    pub fn write_quads(&self, quads: Vec<Quad>) -> Result<(), GraphError> {
        let mut batch = QuadBatch::new();
        for quad in quads {
            batch.add(quad.subject, quad.predicate, quad.object);
        }
        self.apply(&batch)
    }

    /// Atomic add/remove transaction.
    pub fn apply_transaction(&self, adds: Vec<Quad>, removes: Vec<Quad>) -> Result<(), GraphError> {
        let mut batch = QuadBatch::new();
        for quad in removes {
            batch.remove(quad);
        }
        for quad in adds {
            batch.add(quad.subject, quad.predicate, quad.object);
        }
        self.apply(&batch)
    }

    /// Load a typed record by identity.
    ///
    /// Fails with `NotFound` unless a `type` marker for `R` exists on the
    /// subject.
    pub fn load_record<R: Record>(&self, identity: &str) -> Result<R, GraphError> {
        let fields = self.fields(identity)?;
        if fields.get(PREDICATE_TYPE).map(String::as_str) != Some(R::TYPE_NAME) {
            return Err(GraphError::NotFound(identity.to_string()));
        }
        Ok(R::from_fields(identity, &fields))
    }

    /// All field values of a subject, keyed by predicate.
    ///
    /// Multi-valued predicates collapse to an arbitrary single value; record
    /// fields are single-valued by construction, so hydration is unaffected.
    pub fn fields(&self, subject: &str) -> Result<BTreeMap<String, String>, GraphError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let spo = read_txn.open_table(SPO).map_err(store_err)?;

        let mut fields = BTreeMap::new();
        for entry in spo.range((subject, "", "")..).map_err(store_err)? {
            let (key, _) = entry.map_err(store_err)?;
            let (s, p, o) = key.value();
            if s != subject {
                break;
            }
            fields.insert(p.to_string(), o.to_string());
        }
        Ok(fields)
    }

    /// All objects reachable from `subject` via `predicate`.
    pub fn objects(&self, subject: &str, predicate: &str) -> Result<Vec<String>, GraphError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let spo = read_txn.open_table(SPO).map_err(store_err)?;

        let mut objects = Vec::new();
        for entry in spo.range((subject, predicate, "")..).map_err(store_err)? {
            let (key, _) = entry.map_err(store_err)?;
            let (s, p, o) = key.value();
            if s != subject || p != predicate {
                break;
            }
            objects.push(o.to_string());
        }
        Ok(objects)
    }

    /// All subjects with a `predicate` edge to `object`.
    pub fn subjects_with(&self, predicate: &str, object: &str) -> Result<Vec<String>, GraphError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let pos = read_txn.open_table(POS).map_err(store_err)?;

        let mut subjects = Vec::new();
        for entry in pos.range((predicate, object, "")..).map_err(store_err)? {
            let (key, _) = entry.map_err(store_err)?;
            let (p, o, s) = key.value();
            if p != predicate || o != object {
                break;
            }
            subjects.push(s.to_string());
        }
        Ok(subjects)
    }

    /// All subjects carrying a type marker for `type_name`, in sorted order.
    pub fn subjects_by_type(&self, type_name: &str) -> Result<Vec<String>, GraphError> {
        self.subjects_with(PREDICATE_TYPE, type_name)
    }

    /// All subjects pointing at `object` via `predicate`, scanned through
    /// the object-first index.
    pub fn incoming(&self, object: &str, predicate: &str) -> Result<Vec<String>, GraphError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let osp = read_txn.open_table(OSP).map_err(store_err)?;

        let mut subjects = Vec::new();
        for entry in osp.range((object, "", "")..).map_err(store_err)? {
            let (key, _) = entry.map_err(store_err)?;
            let (o, s, p) = key.value();
            if o != object {
                break;
            }
            if p == predicate {
                subjects.push(s.to_string());
            }
        }
        Ok(subjects)
    }

    /// The complete triple set. Stable for a quiescent store, unordered in
    /// the contract sense.
    pub fn scan_all(&self) -> Result<Vec<Quad>, GraphError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let spo = read_txn.open_table(SPO).map_err(store_err)?;

        let mut quads = Vec::new();
        for entry in spo.iter().map_err(store_err)? {
            let (key, _) = entry.map_err(store_err)?;
            let (s, p, o) = key.value();
            quads.push(Quad::new(s, p, o));
        }
        Ok(quads)
    }

    /// Total number of stored triples.
    pub fn quad_count(&self) -> Result<u64, GraphError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let spo = read_txn.open_table(SPO).map_err(store_err)?;
        spo.len().map_err(store_err)
    }
}

fn remove_quad(
    spo: &mut TripleTable<'_>,
    osp: &mut TripleTable<'_>,
    pos: &mut TripleTable<'_>,
    quad: &Quad,
) -> Result<(), GraphError> {
    let (s, p, o) = (quad.subject.as_str(), quad.predicate.as_str(), quad.object.as_str());
    spo.remove((s, p, o)).map_err(store_err)?;
    osp.remove((o, s, p)).map_err(store_err)?;
    pos.remove((p, o, s)).map_err(store_err)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
