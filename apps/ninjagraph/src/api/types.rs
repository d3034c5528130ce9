//! # API Request/Response Types
//!
//! JSON structures for the HTTP surface. Shapes mirror the RPC messages so
//! the two surfaces stay equivalent.

use ninjagraph_core::{NinjaBuild, NinjaFile, NinjaRule, NinjaTarget, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ADMIN RESPONSES
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

impl HealthResponse {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Service status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub service: String,
    pub uptime: String,
}

/// Error envelope: `{error, code}` with `code` matching the HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

// =============================================================================
// ENTITY JSON FORMS
// =============================================================================

/// A rule as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleJson {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub command: String,
    pub description: String,
    pub variables: String,
}

impl From<NinjaRule> for RuleJson {
    fn from(rule: NinjaRule) -> Self {
        Self {
            id: rule.identity(),
            entity_type: NinjaRule::TYPE_NAME.to_string(),
            name: rule.name,
            command: rule.command,
            description: rule.description,
            variables: rule.variables,
        }
    }
}

/// A build as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJson {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub build_id: String,
    pub rule: String,
    pub variables: String,
    pub pool: String,
}

impl From<NinjaBuild> for BuildJson {
    fn from(build: NinjaBuild) -> Self {
        Self {
            id: build.identity(),
            entity_type: NinjaBuild::TYPE_NAME.to_string(),
            build_id: build.build_id,
            rule: build.rule,
            variables: build.variables,
            pool: build.pool,
        }
    }
}

/// A target as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetJson {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub path: String,
    pub status: String,
    pub hash: String,
    pub build: String,
}

impl From<NinjaTarget> for TargetJson {
    fn from(target: NinjaTarget) -> Self {
        Self {
            id: target.identity(),
            entity_type: NinjaTarget::TYPE_NAME.to_string(),
            path: target.path,
            status: target.status,
            hash: target.hash,
            build: target.build,
        }
    }
}

/// A file as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileJson {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub path: String,
    pub file_type: String,
}

impl From<NinjaFile> for FileJson {
    fn from(file: NinjaFile) -> Self {
        Self {
            id: file.identity(),
            entity_type: NinjaFile::TYPE_NAME.to_string(),
            path: file.path,
            file_type: file.file_type,
        }
    }
}

// =============================================================================
// BUILD REQUESTS/RESPONSES
// =============================================================================

/// Body of `POST /api/v1/builds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuildRequest {
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub implicit_deps: Vec<String>,
    #[serde(default)]
    pub order_deps: Vec<String>,
}

/// Response of `POST /api/v1/builds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuildResponse {
    pub status: String,
    pub build_id: String,
}

/// Response of `GET /api/v1/builds/order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOrderResponse {
    pub build_order: Vec<String>,
}

// =============================================================================
// RULE REQUESTS/RESPONSES
// =============================================================================

/// Body of `POST /api/v1/rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Response of `POST /api/v1/rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleResponse {
    pub status: String,
    pub name: String,
}

// =============================================================================
// TARGET LISTS
// =============================================================================

/// Response of the target list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetListResponse {
    pub targets: Vec<TargetJson>,
}

/// Response of `GET /api/v1/targets/{path}/dependencies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependenciesResponse {
    pub dependencies: Vec<FileJson>,
}

/// Response of `GET /api/v1/targets/{path}/reverse_dependencies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseDependenciesResponse {
    pub reverse_dependencies: Vec<TargetJson>,
}

/// Body of `PUT /api/v1/targets/{path}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

/// Response of `PUT /api/v1/targets/{path}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub status: String,
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// Response of `GET /api/v1/analysis/cycles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclesResponse {
    pub cycles: Vec<Vec<String>>,
    pub cycle_count: usize,
}

// =============================================================================
// LOAD
// =============================================================================

/// Body of `POST /api/v1/load`. Exactly one of the fields is required; when
/// both are present the filesystem path wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Response of `POST /api/v1/load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub status: String,
    pub message: String,
    pub stats: BTreeMap<String, u64>,
    pub build_time: String,
}
