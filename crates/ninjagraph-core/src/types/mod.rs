//! # Core Type Definitions
//!
//! This module contains the typed records of the build graph and their
//! quad-store schema:
//! - Entity records (`NinjaRule`, `NinjaBuild`, `NinjaTarget`, `NinjaFile`)
//! - Identity derivation (`rule:<name>`, `build:<id>`, `target:<path>`,
//!   `file:<path>`)
//! - Relationship predicates
//! - The `Record` trait used by the store to (de)hydrate records
//! - Error types (`GraphError`, `ParseError`)
//!
//! ## Identity Discipline
//!
//! Identity strings are 1:1 with natural keys. A file and a target may share
//! a path; they are distinct nodes under distinct prefixes. Comparison is
//! always by identity string, never by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// PREDICATES
// =============================================================================

/// Type-marker predicate: `<identity> type <TypeName>`.
pub const PREDICATE_TYPE: &str = "type";

/// Build -> File: declared input.
pub const PREDICATE_HAS_INPUT: &str = "has_input";
/// Build -> Target: declared output.
pub const PREDICATE_HAS_OUTPUT: &str = "has_output";
/// Build -> File: implicit dependency (`| dep`).
pub const PREDICATE_HAS_IMPLICIT_DEP: &str = "has_implicit_dep";
/// Build -> File: order-only dependency (`|| dep`).
pub const PREDICATE_HAS_ORDER_DEP: &str = "has_order_dep";
/// Target -> File: materialized dependency edge.
///
/// Emitted for every (output, input) and (output, implicit dep) pair of a
/// build. Order-only deps never produce `depends_on`.
pub const PREDICATE_DEPENDS_ON: &str = "depends_on";

/// Target status attribute predicate.
pub const PREDICATE_STATUS: &str = "status";
/// Timestamp predicate written on status updates.
pub const PREDICATE_LAST_MODIFIED: &str = "last_modified";

/// Relationship predicates, for stats counting.
pub const RELATIONSHIP_PREDICATES: &[&str] = &[
    PREDICATE_HAS_INPUT,
    PREDICATE_HAS_OUTPUT,
    PREDICATE_HAS_IMPLICIT_DEP,
    PREDICATE_HAS_ORDER_DEP,
    PREDICATE_DEPENDS_ON,
];

// =============================================================================
// IDENTITY HELPERS
// =============================================================================

/// Canonical identity of a rule.
#[must_use]
pub fn rule_identity(name: &str) -> String {
    format!("rule:{name}")
}

/// Canonical identity of a build.
#[must_use]
pub fn build_identity(build_id: &str) -> String {
    format!("build:{build_id}")
}

/// Canonical identity of a target.
#[must_use]
pub fn target_identity(path: &str) -> String {
    format!("target:{path}")
}

/// Canonical identity of a file.
#[must_use]
pub fn file_identity(path: &str) -> String {
    format!("file:{path}")
}

// =============================================================================
// RECORD TRAIT
// =============================================================================

/// Schema-directed (de)hydration of a typed record to and from field triples.
///
/// A record dehydrates into one triple per field, with the record's identity
/// as subject and the field name as predicate, plus a `type` marker triple.
/// Hydration is the inverse: given the subject's field map, rebuild the
/// record. Absent optional fields hydrate to their defaults.
pub trait Record: Sized {
    /// Type-marker object value, e.g. `NinjaRule`.
    const TYPE_NAME: &'static str;

    /// The canonical identity string of this record.
    fn identity(&self) -> String;

    /// Dehydrate into `(predicate, object)` field pairs.
    ///
    /// Does not include the `type` marker; the store adds it.
    fn to_fields(&self) -> Vec<(&'static str, String)>;

    /// Hydrate from a subject's field map.
    fn from_fields(identity: &str, fields: &BTreeMap<String, String>) -> Self;
}

// =============================================================================
// VARIABLES (JSON-TEXT MAPS)
// =============================================================================

/// Serialize a string map as JSON text.
///
/// The empty map serializes to `{}`, never to the empty string, so that
/// round-trips are total.
pub fn variables_to_json(variables: &BTreeMap<String, String>) -> Result<String, GraphError> {
    if variables.is_empty() {
        return Ok("{}".to_string());
    }
    serde_json::to_string(variables).map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Deserialize a JSON-text string map.
///
/// The empty string is tolerated on input and reads as the empty map.
pub fn variables_from_json(text: &str) -> Result<BTreeMap<String, String>, GraphError> {
    if text.is_empty() || text == "{}" {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(text).map_err(|e| GraphError::Serialization(e.to_string()))
}

// =============================================================================
// FILE TYPE
// =============================================================================

/// File classification inferred from the last dotted extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Source,
    Header,
    Object,
    Library,
    Executable,
    Unknown,
}

impl FileType {
    /// Infer the file type from a path.
    ///
    /// A path with no dot has an empty extension and classifies as
    /// `Executable`.
    #[must_use]
    pub fn infer(path: &str) -> Self {
        let ext = path
            .rfind('.')
            .map(|i| path[i + 1..].to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "c" | "cc" | "cpp" | "cxx" => Self::Source,
            "h" | "hpp" | "hxx" => Self::Header,
            "o" | "obj" => Self::Object,
            "a" | "lib" => Self::Library,
            "" | "exe" => Self::Executable,
            _ => Self::Unknown,
        }
    }

    /// The stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Header => "header",
            Self::Object => "object",
            Self::Library => "library",
            Self::Executable => "executable",
            Self::Unknown => "unknown",
        }
    }

}

// =============================================================================
// RULE
// =============================================================================

/// A build rule: a named command template.
///
/// Rules are created by the parser on `rule` blocks or by explicit create.
/// Re-creating a rule with the same name reconciles to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaRule {
    /// Unique rule name; identity is `rule:<name>`.
    pub name: String,
    /// Required command template.
    pub command: String,
    /// Optional human-readable description.
    #[serde(default)]
    pub description: String,
    /// Extra rule variables, serialized as JSON text.
    #[serde(default = "empty_variables")]
    pub variables: String,
}

fn empty_variables() -> String {
    "{}".to_string()
}

impl NinjaRule {
    /// Create a rule with empty description and variables.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: String::new(),
            variables: empty_variables(),
        }
    }

    /// Set the variables map, normalizing the empty map to `{}`.
    pub fn set_variables(&mut self, variables: &BTreeMap<String, String>) -> Result<(), GraphError> {
        self.variables = variables_to_json(variables)?;
        Ok(())
    }

    /// Read the variables map back.
    pub fn get_variables(&self) -> Result<BTreeMap<String, String>, GraphError> {
        variables_from_json(&self.variables)
    }
}

impl Record for NinjaRule {
    const TYPE_NAME: &'static str = "NinjaRule";

    fn identity(&self) -> String {
        rule_identity(&self.name)
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("command", self.command.clone()),
            ("description", self.description.clone()),
            ("variables", self.variables.clone()),
        ]
    }

    fn from_fields(_identity: &str, fields: &BTreeMap<String, String>) -> Self {
        Self {
            name: fields.get("name").cloned().unwrap_or_default(),
            command: fields.get("command").cloned().unwrap_or_default(),
            description: fields.get("description").cloned().unwrap_or_default(),
            variables: fields
                .get("variables")
                .cloned()
                .unwrap_or_else(empty_variables),
        }
    }
}

// =============================================================================
// BUILD
// =============================================================================

/// A build statement: one concrete invocation of a rule.
///
/// `build_id` is the caller-supplied id for API-created builds and the
/// comma-join of outputs in source order for parser-ingested builds. Both
/// address the same namespace `build:<build_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaBuild {
    /// Unique build id; identity is `build:<build_id>`.
    pub build_id: String,
    /// Identity of the rule this build invokes (`rule:<name>`).
    pub rule: String,
    /// Pool name; the parser defaults to `default`.
    #[serde(default)]
    pub pool: String,
    /// Build variables, serialized as JSON text.
    #[serde(default = "empty_variables")]
    pub variables: String,
}

impl NinjaBuild {
    /// Create a build with empty pool and variables.
    #[must_use]
    pub fn new(build_id: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            rule: rule.into(),
            pool: String::new(),
            variables: empty_variables(),
        }
    }

    /// Set the variables map, normalizing the empty map to `{}`.
    pub fn set_variables(&mut self, variables: &BTreeMap<String, String>) -> Result<(), GraphError> {
        self.variables = variables_to_json(variables)?;
        Ok(())
    }

    /// Read the variables map back.
    pub fn get_variables(&self) -> Result<BTreeMap<String, String>, GraphError> {
        variables_from_json(&self.variables)
    }
}

impl Record for NinjaBuild {
    const TYPE_NAME: &'static str = "NinjaBuild";

    fn identity(&self) -> String {
        build_identity(&self.build_id)
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("build_id", self.build_id.clone()),
            ("rule", self.rule.clone()),
            ("pool", self.pool.clone()),
            ("variables", self.variables.clone()),
        ]
    }

    fn from_fields(_identity: &str, fields: &BTreeMap<String, String>) -> Self {
        Self {
            build_id: fields.get("build_id").cloned().unwrap_or_default(),
            rule: fields.get("rule").cloned().unwrap_or_default(),
            pool: fields.get("pool").cloned().unwrap_or_default(),
            variables: fields
                .get("variables")
                .cloned()
                .unwrap_or_else(empty_variables),
        }
    }
}

// =============================================================================
// TARGET
// =============================================================================

/// A build target: a produced artifact.
///
/// Every target carries exactly one `build` back-edge naming the build that
/// produces it. A target may coexist with a file of the same path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaTarget {
    /// Unique target path; identity is `target:<path>`.
    pub path: String,
    /// Mutable build status; defaults to `clean`.
    pub status: String,
    /// Content hash placeholder; defaults to `none`.
    pub hash: String,
    /// Identity of the producing build (`build:<id>`).
    pub build: String,
}

impl NinjaTarget {
    /// Create a fresh target produced by the given build identity.
    #[must_use]
    pub fn new(path: impl Into<String>, build: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: "clean".to_string(),
            hash: "none".to_string(),
            build: build.into(),
        }
    }
}

impl Record for NinjaTarget {
    const TYPE_NAME: &'static str = "NinjaTarget";

    fn identity(&self) -> String {
        target_identity(&self.path)
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("path", self.path.clone()),
            (PREDICATE_STATUS, self.status.clone()),
            ("hash", self.hash.clone()),
            ("build", self.build.clone()),
        ]
    }

    fn from_fields(_identity: &str, fields: &BTreeMap<String, String>) -> Self {
        Self {
            path: fields.get("path").cloned().unwrap_or_default(),
            status: fields
                .get(PREDICATE_STATUS)
                .cloned()
                .unwrap_or_else(|| "clean".to_string()),
            hash: fields
                .get("hash")
                .cloned()
                .unwrap_or_else(|| "none".to_string()),
            build: fields.get("build").cloned().unwrap_or_default(),
        }
    }
}

// =============================================================================
// FILE
// =============================================================================

/// A source file referenced as an input or implicit dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaFile {
    /// Unique file path; identity is `file:<path>`.
    pub path: String,
    /// Inferred file type.
    pub file_type: String,
}

impl NinjaFile {
    /// Create a file record with its type inferred from the path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let file_type = FileType::infer(&path).as_str().to_string();
        Self { path, file_type }
    }
}

impl Record for NinjaFile {
    const TYPE_NAME: &'static str = "NinjaFile";

    fn identity(&self) -> String {
        file_identity(&self.path)
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("path", self.path.clone()),
            ("file_type", self.file_type.clone()),
        ]
    }

    fn from_fields(_identity: &str, fields: &BTreeMap<String, String>) -> Self {
        Self {
            path: fields.get("path").cloned().unwrap_or_default(),
            file_type: fields
                .get("file_type")
                .cloned()
                .unwrap_or_else(|| FileType::Unknown.as_str().to_string()),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the Ninja text parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A rule block closed without a `command` binding.
    #[error("rule {0} is missing required command")]
    MissingCommand(String),

    /// A build statement declared no outputs.
    #[error("build statement for rule {0} has no outputs")]
    EmptyOutputs(String),
}

/// Errors that can occur across the build-graph core.
///
/// All fallible operations return `Result<T, GraphError>`; the core never
/// panics and never retries.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A request carried a malformed or missing argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested identity is not present in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Ninja text failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The store could not be opened or the backend refused an operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Topological ordering is impossible.
    #[error("circular dependency detected in build graph")]
    CycleDetected,

    /// JSON (de)serialization of a variables map failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An I/O error outside the store backend.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
