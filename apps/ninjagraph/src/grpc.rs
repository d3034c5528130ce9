//! # gRPC Surface
//!
//! The typed RPC equivalent of the HTTP API: one service whose methods
//! mirror the REST endpoints, plus the standard health sub-service and
//! server reflection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ninjagraph_core::{GraphError, NinjaGraph, NinjaParser, Record};
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

pub mod proto {
    tonic::include_proto!("ninjagraph.v1");

    /// Descriptor set for server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("ninjagraph_descriptor");
}

use proto::ninja_graph_service_server::{NinjaGraphService, NinjaGraphServiceServer};

/// The gRPC service implementation sharing the build graph with the rest of
/// the process.
pub struct GraphService {
    graph: Arc<RwLock<NinjaGraph>>,
    started_at: Instant,
}

impl GraphService {
    /// Create a service around a graph.
    #[must_use]
    pub fn new(graph: NinjaGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            started_at: Instant::now(),
        }
    }
}

// --- Core -> proto conversions ---

fn rule_to_proto(rule: ninjagraph_core::NinjaRule) -> proto::NinjaRule {
    proto::NinjaRule {
        id: rule.identity(),
        r#type: ninjagraph_core::NinjaRule::TYPE_NAME.to_string(),
        name: rule.name,
        command: rule.command,
        description: rule.description,
        variables: rule.variables,
    }
}

fn build_to_proto(build: ninjagraph_core::NinjaBuild) -> proto::NinjaBuild {
    proto::NinjaBuild {
        id: build.identity(),
        r#type: ninjagraph_core::NinjaBuild::TYPE_NAME.to_string(),
        build_id: build.build_id,
        rule: build.rule,
        variables: build.variables,
        pool: build.pool,
    }
}

fn target_to_proto(target: ninjagraph_core::NinjaTarget) -> proto::NinjaTarget {
    proto::NinjaTarget {
        id: target.identity(),
        r#type: ninjagraph_core::NinjaTarget::TYPE_NAME.to_string(),
        path: target.path,
        status: target.status,
        hash: target.hash,
        build: target.build,
    }
}

fn file_to_proto(file: ninjagraph_core::NinjaFile) -> proto::NinjaFile {
    proto::NinjaFile {
        id: file.identity(),
        r#type: ninjagraph_core::NinjaFile::TYPE_NAME.to_string(),
        path: file.path,
        file_type: file.file_type,
    }
}

fn stats_to_proto(stats: std::collections::BTreeMap<String, u64>) -> HashMap<String, i64> {
    stats
        .into_iter()
        .map(|(k, v)| (k, i64::try_from(v).unwrap_or(i64::MAX)))
        .collect()
}

fn status_from(err: GraphError) -> Status {
    match &err {
        GraphError::InvalidArgument(_) => Status::invalid_argument(err.to_string()),
        GraphError::NotFound(_) => Status::not_found(err.to_string()),
        GraphError::Parse(_) | GraphError::CycleDetected => {
            Status::failed_precondition(err.to_string())
        }
        GraphError::StoreUnavailable(_) | GraphError::Serialization(_) | GraphError::Io(_) => {
            Status::internal(err.to_string())
        }
    }
}

#[tonic::async_trait]
impl NinjaGraphService for GraphService {
    async fn health(
        &self,
        _request: Request<proto::HealthRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        Ok(Response::new(proto::HealthResponse {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }))
    }

    async fn status(
        &self,
        _request: Request<proto::StatusRequest>,
    ) -> Result<Response<proto::StatusResponse>, Status> {
        Ok(Response::new(proto::StatusResponse {
            service: "ninjagraph".to_string(),
            uptime: format!("{:?}", self.started_at.elapsed()),
        }))
    }

    async fn create_build(
        &self,
        request: Request<proto::CreateBuildRequest>,
    ) -> Result<Response<proto::CreateBuildResponse>, Status> {
        let req = request.into_inner();
        if req.rule.is_empty() {
            return Err(Status::invalid_argument("rule is required"));
        }
        if req.outputs.is_empty() {
            return Err(Status::invalid_argument("at least one output is required"));
        }

        let mut build = ninjagraph_core::NinjaBuild::new(
            req.build_id.clone(),
            ninjagraph_core::types::rule_identity(&req.rule),
        );
        build.pool = req.pool;
        let variables = req.variables.into_iter().collect();
        build.set_variables(&variables).map_err(status_from)?;

        let graph = self.graph.write().await;
        graph
            .add_build(
                &build,
                &req.inputs,
                &req.outputs,
                &req.implicit_deps,
                &req.order_deps,
            )
            .map_err(status_from)?;

        Ok(Response::new(proto::CreateBuildResponse {
            status: "created".to_string(),
            build_id: req.build_id,
        }))
    }

    async fn get_build(
        &self,
        request: Request<proto::GetBuildRequest>,
    ) -> Result<Response<proto::NinjaBuild>, Status> {
        let req = request.into_inner();
        let graph = self.graph.read().await;
        let build = graph.get_build(&req.id).map_err(status_from)?;
        Ok(Response::new(build_to_proto(build)))
    }

    async fn get_build_stats(
        &self,
        _request: Request<proto::BuildStatsRequest>,
    ) -> Result<Response<proto::BuildStatsResponse>, Status> {
        let graph = self.graph.read().await;
        let stats = graph.get_build_stats().map_err(status_from)?;
        Ok(Response::new(proto::BuildStatsResponse {
            stats: stats_to_proto(stats),
        }))
    }

    async fn get_build_order(
        &self,
        _request: Request<proto::BuildOrderRequest>,
    ) -> Result<Response<proto::BuildOrderResponse>, Status> {
        let graph = self.graph.read().await;
        let build_order = graph.get_build_order().map_err(status_from)?;
        Ok(Response::new(proto::BuildOrderResponse { build_order }))
    }

    async fn create_rule(
        &self,
        request: Request<proto::CreateRuleRequest>,
    ) -> Result<Response<proto::CreateRuleResponse>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() || req.command.is_empty() {
            return Err(Status::invalid_argument("name and command are required"));
        }

        let mut rule = ninjagraph_core::NinjaRule::new(req.name.clone(), req.command);
        rule.description = req.description;
        let variables = req.variables.into_iter().collect();
        rule.set_variables(&variables).map_err(status_from)?;

        let graph = self.graph.write().await;
        graph.add_rule(&rule).map_err(status_from)?;

        Ok(Response::new(proto::CreateRuleResponse {
            status: "created".to_string(),
            name: req.name,
        }))
    }

    async fn get_rule(
        &self,
        request: Request<proto::GetRuleRequest>,
    ) -> Result<Response<proto::NinjaRule>, Status> {
        let req = request.into_inner();
        let graph = self.graph.read().await;
        let rule = graph.get_rule(&req.name).map_err(status_from)?;
        Ok(Response::new(rule_to_proto(rule)))
    }

    async fn get_targets_by_rule(
        &self,
        request: Request<proto::GetTargetsByRuleRequest>,
    ) -> Result<Response<proto::GetTargetsByRuleResponse>, Status> {
        let req = request.into_inner();
        let graph = self.graph.read().await;
        let targets = graph
            .get_targets_by_rule(&req.rule_name)
            .map_err(status_from)?;
        Ok(Response::new(proto::GetTargetsByRuleResponse {
            targets: targets.into_iter().map(target_to_proto).collect(),
        }))
    }

    async fn get_all_targets(
        &self,
        _request: Request<proto::GetAllTargetsRequest>,
    ) -> Result<Response<proto::GetAllTargetsResponse>, Status> {
        let graph = self.graph.read().await;
        let targets = graph.get_all_targets().map_err(status_from)?;
        Ok(Response::new(proto::GetAllTargetsResponse {
            targets: targets.into_iter().map(target_to_proto).collect(),
        }))
    }

    async fn get_target(
        &self,
        request: Request<proto::GetTargetRequest>,
    ) -> Result<Response<proto::NinjaTarget>, Status> {
        let req = request.into_inner();
        let graph = self.graph.read().await;
        let target = graph.get_target(&req.path).map_err(status_from)?;
        Ok(Response::new(target_to_proto(target)))
    }

    async fn get_target_dependencies(
        &self,
        request: Request<proto::GetTargetDependenciesRequest>,
    ) -> Result<Response<proto::GetTargetDependenciesResponse>, Status> {
        let req = request.into_inner();
        let graph = self.graph.read().await;
        let files = graph
            .get_build_dependencies(&req.path)
            .map_err(status_from)?;
        Ok(Response::new(proto::GetTargetDependenciesResponse {
            dependencies: files.into_iter().map(file_to_proto).collect(),
        }))
    }

    async fn get_target_reverse_dependencies(
        &self,
        request: Request<proto::GetTargetReverseDependenciesRequest>,
    ) -> Result<Response<proto::GetTargetReverseDependenciesResponse>, Status> {
        let req = request.into_inner();
        let graph = self.graph.read().await;
        let targets = graph
            .get_reverse_dependencies(&req.path)
            .map_err(status_from)?;
        Ok(Response::new(proto::GetTargetReverseDependenciesResponse {
            reverse_dependencies: targets.into_iter().map(target_to_proto).collect(),
        }))
    }

    async fn update_target_status(
        &self,
        request: Request<proto::UpdateTargetStatusRequest>,
    ) -> Result<Response<proto::UpdateTargetStatusResponse>, Status> {
        let req = request.into_inner();
        let graph = self.graph.write().await;
        graph
            .update_target_status(&req.path, &req.status)
            .map_err(status_from)?;
        Ok(Response::new(proto::UpdateTargetStatusResponse {
            status: "updated".to_string(),
        }))
    }

    async fn find_cycles(
        &self,
        _request: Request<proto::FindCyclesRequest>,
    ) -> Result<Response<proto::FindCyclesResponse>, Status> {
        let graph = self.graph.read().await;
        let cycles = graph.find_cycles().map_err(status_from)?;
        let cycle_count = i32::try_from(cycles.len()).unwrap_or(i32::MAX);
        Ok(Response::new(proto::FindCyclesResponse {
            cycles: cycles
                .into_iter()
                .map(|nodes| proto::Cycle { nodes })
                .collect(),
            cycle_count,
        }))
    }

    async fn debug_quads(
        &self,
        request: Request<proto::DebugQuadsRequest>,
    ) -> Result<Response<proto::DebugQuadsResponse>, Status> {
        let req = request.into_inner();
        let limit = if req.limit > 0 { req.limit as usize } else { 100 };

        let graph = self.graph.read().await;
        let quads = graph.debug_quads(limit).map_err(status_from)?;
        let total = quads.len();

        Ok(Response::new(proto::DebugQuadsResponse {
            quads: quads
                .into_iter()
                .map(|q| proto::Quad {
                    subject: q.subject,
                    predicate: q.predicate,
                    object: q.object,
                })
                .collect(),
            message: format!("{total} quads"),
        }))
    }

    async fn load_ninja_file(
        &self,
        request: Request<proto::LoadNinjaFileRequest>,
    ) -> Result<Response<proto::LoadNinjaFileResponse>, Status> {
        let started = Instant::now();
        let req = request.into_inner();

        let content = if !req.file_path.is_empty() {
            std::fs::read_to_string(&req.file_path).map_err(|e| {
                Status::invalid_argument(format!("failed to read file {}: {e}", req.file_path))
            })?
        } else if !req.content.is_empty() {
            req.content
        } else {
            return Err(Status::invalid_argument(
                "either file_path or content must be provided",
            ));
        };

        let graph = self.graph.write().await;
        NinjaParser::new(&graph)
            .parse_and_load(&content)
            .map_err(status_from)?;

        let stats = match graph.get_build_stats() {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("build stats unavailable after load: {e}");
                Default::default()
            }
        };

        Ok(Response::new(proto::LoadNinjaFileResponse {
            status: "success".to_string(),
            message: "Ninja file loaded successfully".to_string(),
            stats: stats_to_proto(stats),
            build_time: format!("{:?}", started.elapsed()),
        }))
    }
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the gRPC server and block until shutdown.
///
/// Registers the build-graph service, the standard health sub-service, and
/// server reflection. On signal, in-flight RPCs drain before the store
/// closes.
pub async fn run_server(addr: &str, graph: NinjaGraph) -> Result<(), GraphError> {
    let addr = addr
        .parse()
        .map_err(|e| GraphError::InvalidArgument(format!("invalid address {addr}: {e}")))?;

    let service = GraphService::new(graph);

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<NinjaGraphServiceServer<GraphService>>()
        .await;

    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| GraphError::Io(format!("reflection setup failed: {e}")))?;

    tracing::info!("gRPC server listening on {addr}");

    tonic::transport::Server::builder()
        .trace_fn(|_| tracing::info_span!("grpc"))
        .add_service(health_service)
        .add_service(reflection_service)
        .add_service(NinjaGraphServiceServer::new(service))
        .serve_with_shutdown(addr, crate::api::shutdown_signal())
        .await
        .map_err(|e| GraphError::Io(format!("gRPC server error: {e}")))
}
