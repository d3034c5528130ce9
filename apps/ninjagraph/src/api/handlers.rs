//! # API Endpoint Handlers
//!
//! HTTP handlers mapping request payloads onto core operations. Each
//! handler decodes its input, invokes one or a small composition of core
//! calls, and serializes the result; core errors map onto the HTTP error
//! taxonomy verbatim.

use super::{
    types::{
        BuildJson, BuildOrderResponse, CreateBuildRequest, CreateBuildResponse, CreateRuleRequest,
        CreateRuleResponse, CyclesResponse, DependenciesResponse, ErrorResponse, FileJson,
        HealthResponse, LoadRequest, LoadResponse, ReverseDependenciesResponse, RuleJson,
        StatusResponse, TargetJson, TargetListResponse, UpdateStatusRequest, UpdateStatusResponse,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ninjagraph_core::{GraphError, NinjaBuild, NinjaParser, NinjaRule};

// =============================================================================
// ERROR MAPPING
// =============================================================================

fn error_status(err: &GraphError) -> StatusCode {
    match err {
        GraphError::InvalidArgument(_) | GraphError::Parse(_) => StatusCode::BAD_REQUEST,
        GraphError::NotFound(_) => StatusCode::NOT_FOUND,
        GraphError::StoreUnavailable(_)
        | GraphError::CycleDetected
        | GraphError::Serialization(_)
        | GraphError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: GraphError) -> Response {
    let status = error_status(&err);
    let body = ErrorResponse {
        error: err.to_string(),
        code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

// =============================================================================
// ADMIN HANDLERS
// =============================================================================

/// `GET /health`
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// `GET /api/v1/status`
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        service: "ninjagraph".to_string(),
        uptime: format!("{:?}", state.started_at.elapsed()),
    })
}

// =============================================================================
// BUILD HANDLERS
// =============================================================================

/// `POST /api/v1/builds`
pub async fn create_build_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateBuildRequest>,
) -> Response {
    if request.rule.is_empty() {
        return error_response(GraphError::InvalidArgument("rule is required".into()));
    }
    if request.outputs.is_empty() {
        return error_response(GraphError::InvalidArgument(
            "at least one output is required".into(),
        ));
    }

    let mut build = NinjaBuild::new(
        request.build_id.clone(),
        ninjagraph_core::types::rule_identity(&request.rule),
    );
    build.pool = request.pool.clone();
    if let Err(e) = build.set_variables(&request.variables) {
        return error_response(e);
    }

    let graph = state.graph.write().await;
    match graph.add_build(
        &build,
        &request.inputs,
        &request.outputs,
        &request.implicit_deps,
        &request.order_deps,
    ) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(CreateBuildResponse {
                status: "created".to_string(),
                build_id: request.build_id,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/builds/{id}`
pub async fn get_build_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.get_build(&id) {
        Ok(build) => Json(BuildJson::from(build)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/builds/stats`
pub async fn build_stats_handler(State(state): State<AppState>) -> Response {
    let graph = state.graph.read().await;
    match graph.get_build_stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/builds/order`
pub async fn build_order_handler(State(state): State<AppState>) -> Response {
    let graph = state.graph.read().await;
    match graph.get_build_order() {
        Ok(build_order) => Json(BuildOrderResponse { build_order }).into_response(),
        Err(e) => error_response(e),
    }
}

// =============================================================================
// RULE HANDLERS
// =============================================================================

/// `POST /api/v1/rules`
pub async fn create_rule_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateRuleRequest>,
) -> Response {
    if request.name.is_empty() || request.command.is_empty() {
        return error_response(GraphError::InvalidArgument(
            "name and command are required".into(),
        ));
    }

    let mut rule = NinjaRule::new(request.name.clone(), request.command);
    rule.description = request.description;
    if let Err(e) = rule.set_variables(&request.variables) {
        return error_response(e);
    }

    let graph = state.graph.write().await;
    match graph.add_rule(&rule) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(CreateRuleResponse {
                status: "created".to_string(),
                name: request.name,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/rules/{name}`
pub async fn get_rule_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.get_rule(&name) {
        Ok(rule) => Json(RuleJson::from(rule)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/rules/{name}/targets`
pub async fn targets_by_rule_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.get_targets_by_rule(&name) {
        Ok(targets) => Json(TargetListResponse {
            targets: targets.into_iter().map(TargetJson::from).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

// =============================================================================
// TARGET HANDLERS
// =============================================================================

/// `GET /api/v1/targets`
pub async fn all_targets_handler(State(state): State<AppState>) -> Response {
    let graph = state.graph.read().await;
    match graph.get_all_targets() {
        Ok(targets) => Json(TargetListResponse {
            targets: targets.into_iter().map(TargetJson::from).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/targets/{path}`
pub async fn get_target_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.get_target(&path) {
        Ok(target) => Json(TargetJson::from(target)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/targets/{path}/dependencies`
pub async fn target_dependencies_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.get_build_dependencies(&path) {
        Ok(files) => Json(DependenciesResponse {
            dependencies: files.into_iter().map(FileJson::from).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /api/v1/targets/{path}/reverse_dependencies`
pub async fn target_reverse_dependencies_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.get_reverse_dependencies(&path) {
        Ok(targets) => Json(ReverseDependenciesResponse {
            reverse_dependencies: targets.into_iter().map(TargetJson::from).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// `PUT /api/v1/targets/{path}/status`
pub async fn update_target_status_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Response {
    let graph = state.graph.write().await;
    match graph.update_target_status(&path, &request.status) {
        Ok(()) => Json(UpdateStatusResponse {
            status: "updated".to_string(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

// =============================================================================
// ANALYSIS HANDLERS
// =============================================================================

/// `GET /api/v1/analysis/cycles`
pub async fn cycles_handler(State(state): State<AppState>) -> Response {
    let graph = state.graph.read().await;
    match graph.find_cycles() {
        Ok(cycles) => {
            let cycle_count = cycles.len();
            Json(CyclesResponse {
                cycles,
                cycle_count,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

// =============================================================================
// LOAD HANDLER
// =============================================================================

/// `POST /api/v1/load`
///
/// Accepts either a filesystem path or raw content; the path wins when both
/// are present. Neither is `InvalidArgument`.
pub async fn load_handler(
    State(state): State<AppState>,
    Json(request): Json<LoadRequest>,
) -> Response {
    let started = std::time::Instant::now();

    let file_path = request.file_path.as_deref().unwrap_or_default();
    let inline = request.content.as_deref().unwrap_or_default();

    let content = if !file_path.is_empty() {
        match std::fs::read_to_string(file_path) {
            Ok(text) => text,
            Err(e) => {
                return error_response(GraphError::InvalidArgument(format!(
                    "failed to read file {file_path}: {e}"
                )));
            }
        }
    } else if !inline.is_empty() {
        inline.to_string()
    } else {
        return error_response(GraphError::InvalidArgument(
            "either file_path or content must be provided".into(),
        ));
    };

    let graph = state.graph.write().await;
    if let Err(e) = NinjaParser::new(&graph).parse_and_load(&content) {
        return error_response(e);
    }

    let stats = match graph.get_build_stats() {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!("build stats unavailable after load: {e}");
            Default::default()
        }
    };

    Json(LoadResponse {
        status: "success".to_string(),
        message: "Ninja file loaded successfully".to_string(),
        stats,
        build_time: format!("{:?}", started.elapsed()),
    })
    .into_response()
}
