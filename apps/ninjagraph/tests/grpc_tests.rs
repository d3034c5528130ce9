//! Integration tests for the gRPC service.
//!
//! Invokes the tonic service trait directly against a temp-dir store; no
//! listener is started.

#![allow(clippy::unwrap_used, clippy::panic)]

use ninjagraph::grpc::proto::ninja_graph_service_server::NinjaGraphService;
use ninjagraph::grpc::{proto, GraphService};
use ninjagraph_core::NinjaGraph;
use tonic::{Code, Request};

fn create_service() -> (GraphService, tempfile::TempDir) {
    let temp = tempfile::tempdir().expect("temp dir");
    let graph = NinjaGraph::open(temp.path().join("store")).expect("open graph");
    (GraphService::new(graph), temp)
}

const CHAIN: &str = "\
rule cc
  command = gcc -c $in -o $out
build a.o: cc a.c
build prog: cc a.o
";

async fn create_loaded_service() -> (GraphService, tempfile::TempDir) {
    let (service, temp) = create_service();
    let response = service
        .load_ninja_file(Request::new(proto::LoadNinjaFileRequest {
            file_path: String::new(),
            content: CHAIN.to_string(),
        }))
        .await
        .expect("load");
    assert_eq!(response.get_ref().status, "success");
    (service, temp)
}

#[tokio::test]
async fn health_and_status() {
    let (service, _temp) = create_service();

    let health = service
        .health(Request::new(proto::HealthRequest {}))
        .await
        .expect("health");
    assert_eq!(health.get_ref().status, "healthy");
    assert!(!health.get_ref().timestamp.is_empty());

    let status = service
        .status(Request::new(proto::StatusRequest {}))
        .await
        .expect("status");
    assert_eq!(status.get_ref().service, "ninjagraph");
    assert!(!status.get_ref().uptime.is_empty());
}

#[tokio::test]
async fn create_rule_and_get() {
    let (service, _temp) = create_service();

    let created = service
        .create_rule(Request::new(proto::CreateRuleRequest {
            name: "cc".to_string(),
            command: "gcc -c $in -o $out".to_string(),
            description: "CC $out".to_string(),
            variables: Default::default(),
        }))
        .await
        .expect("create");
    assert_eq!(created.get_ref().status, "created");

    let rule = service
        .get_rule(Request::new(proto::GetRuleRequest {
            name: "cc".to_string(),
        }))
        .await
        .expect("get");
    assert_eq!(rule.get_ref().id, "rule:cc");
    assert_eq!(rule.get_ref().r#type, "NinjaRule");
    assert_eq!(rule.get_ref().variables, "{}");
}

#[tokio::test]
async fn unknown_lookups_are_not_found() {
    let (service, _temp) = create_service();

    let err = service
        .get_rule(Request::new(proto::GetRuleRequest {
            name: "missing".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = service
        .get_target(Request::new(proto::GetTargetRequest {
            path: "missing".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = service
        .get_build(Request::new(proto::GetBuildRequest {
            id: "missing".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn create_build_and_query_dependencies() {
    let (service, _temp) = create_service();

    service
        .create_build(Request::new(proto::CreateBuildRequest {
            build_id: "a.o".to_string(),
            rule: "cc".to_string(),
            variables: Default::default(),
            pool: "default".to_string(),
            inputs: vec!["a.c".to_string()],
            outputs: vec!["a.o".to_string()],
            implicit_deps: vec!["a.h".to_string()],
            order_deps: vec!["gen.h".to_string()],
        }))
        .await
        .expect("create build");

    let deps = service
        .get_target_dependencies(Request::new(proto::GetTargetDependenciesRequest {
            path: "a.o".to_string(),
        }))
        .await
        .expect("deps");
    let mut paths: Vec<String> = deps
        .get_ref()
        .dependencies
        .iter()
        .map(|f| f.path.clone())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["a.c", "a.h"]);

    let reverse = service
        .get_target_reverse_dependencies(Request::new(
            proto::GetTargetReverseDependenciesRequest {
                path: "a.c".to_string(),
            },
        ))
        .await
        .expect("reverse");
    assert_eq!(reverse.get_ref().reverse_dependencies.len(), 1);
    assert_eq!(reverse.get_ref().reverse_dependencies[0].path, "a.o");
}

#[tokio::test]
async fn create_build_without_rule_is_invalid() {
    let (service, _temp) = create_service();

    let err = service
        .create_build(Request::new(proto::CreateBuildRequest {
            build_id: "x".to_string(),
            rule: String::new(),
            variables: Default::default(),
            pool: String::new(),
            inputs: vec![],
            outputs: vec!["x".to_string()],
            implicit_deps: vec![],
            order_deps: vec![],
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn load_then_order_and_stats() {
    let (service, _temp) = create_loaded_service().await;

    let order = service
        .get_build_order(Request::new(proto::BuildOrderRequest {}))
        .await
        .expect("order");
    assert_eq!(order.get_ref().build_order, vec!["a.o", "prog"]);

    let stats = service
        .get_build_stats(Request::new(proto::BuildStatsRequest {}))
        .await
        .expect("stats");
    assert_eq!(stats.get_ref().stats["rules"], 1);
    assert_eq!(stats.get_ref().stats["builds"], 2);

    let targets = service
        .get_targets_by_rule(Request::new(proto::GetTargetsByRuleRequest {
            rule_name: "cc".to_string(),
        }))
        .await
        .expect("targets by rule");
    assert_eq!(targets.get_ref().targets.len(), 2);
}

#[tokio::test]
async fn cycles_fail_order_with_failed_precondition() {
    let (service, _temp) = create_service();
    service
        .load_ninja_file(Request::new(proto::LoadNinjaFileRequest {
            file_path: String::new(),
            content: "rule cc\n  command = gcc\nbuild a: cc b\nbuild b: cc a\n".to_string(),
        }))
        .await
        .expect("load");

    let cycles = service
        .find_cycles(Request::new(proto::FindCyclesRequest {}))
        .await
        .expect("cycles");
    assert_eq!(cycles.get_ref().cycle_count, 1);

    let err = service
        .get_build_order(Request::new(proto::BuildOrderRequest {}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn update_status_requires_non_empty() {
    let (service, _temp) = create_loaded_service().await;

    let err = service
        .update_target_status(Request::new(proto::UpdateTargetStatusRequest {
            path: "a.o".to_string(),
            status: String::new(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    service
        .update_target_status(Request::new(proto::UpdateTargetStatusRequest {
            path: "a.o".to_string(),
            status: "dirty".to_string(),
        }))
        .await
        .expect("update");

    let target = service
        .get_target(Request::new(proto::GetTargetRequest {
            path: "a.o".to_string(),
        }))
        .await
        .expect("get");
    assert_eq!(target.get_ref().status, "dirty");
}

#[tokio::test]
async fn load_requires_a_source() {
    let (service, _temp) = create_service();

    let err = service
        .load_ninja_file(Request::new(proto::LoadNinjaFileRequest {
            file_path: String::new(),
            content: String::new(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn parse_error_is_failed_precondition() {
    let (service, _temp) = create_service();

    let err = service
        .load_ninja_file(Request::new(proto::LoadNinjaFileRequest {
            file_path: String::new(),
            content: "rule broken\n  description = no command\n".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn debug_quads_respects_limit() {
    let (service, _temp) = create_loaded_service().await;

    let response = service
        .debug_quads(Request::new(proto::DebugQuadsRequest { limit: 3 }))
        .await
        .expect("debug");
    assert_eq!(response.get_ref().quads.len(), 3);

    // Limit <= 0 falls back to the default of 100.
    let response = service
        .debug_quads(Request::new(proto::DebugQuadsRequest { limit: 0 }))
        .await
        .expect("debug");
    assert!(response.get_ref().quads.len() > 3);
}
