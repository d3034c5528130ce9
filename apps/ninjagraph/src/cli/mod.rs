//! # CLI Module
//!
//! Argument parsing and startup checks for the server binary.
//!
//! ```bash
//! ninjagraph serve --http 127.0.0.1:8080 --store ninja.db
//! ninjagraph serve --grpc 127.0.0.1:50051 --store ninja.db
//! ```
//!
//! Exactly one of `--http` / `--grpc` must be given; a process serves one
//! surface. The store path must be an empty or non-existent directory, and
//! it is never cleaned on shutdown.

use clap::{ArgGroup, Parser, Subcommand};
use ninjagraph_core::{GraphError, NinjaGraph};
use std::path::{Path, PathBuf};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// ninjagraph - a persistent Ninja build-graph server.
///
/// Ingests Ninja build descriptions into a quad-oriented dependency graph
/// and answers structural queries over HTTP/JSON or gRPC.
#[derive(Parser, Debug)]
#[command(name = "ninjagraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the API server
    #[command(group(
        ArgGroup::new("surface").required(true).args(["http", "grpc"])
    ))]
    Serve {
        /// Serve the HTTP/JSON API on this address
        #[arg(long, value_name = "ADDR")]
        http: Option<String>,

        /// Serve the gRPC API on this address
        #[arg(long, value_name = "ADDR")]
        grpc: Option<String>,

        /// Store directory (must be empty or absent)
        #[arg(short, long, default_value = "ninja.db")]
        store: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Refuse a store path that already contains files.
fn check_store_path(path: &Path) -> Result<(), GraphError> {
    if !path.exists() {
        return Ok(());
    }
    if !path.is_dir() {
        return Err(GraphError::InvalidArgument(format!(
            "store path {} is not a directory",
            path.display()
        )));
    }
    let mut entries = std::fs::read_dir(path)
        .map_err(|e| GraphError::Io(format!("cannot read store path {}: {e}", path.display())))?;
    if entries.next().is_some() {
        return Err(GraphError::InvalidArgument(format!(
            "store path contains files: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), GraphError> {
    match cli.command {
        Commands::Serve { http, grpc, store } => {
            check_store_path(&store)?;
            let graph = NinjaGraph::open(&store)?;

            if let Some(addr) = grpc {
                tracing::info!("starting gRPC server on {addr}");
                crate::grpc::run_server(&addr, graph).await
            } else if let Some(addr) = http {
                tracing::info!("starting HTTP server on {addr}");
                crate::api::run_server(&addr, graph).await
            } else {
                // The arg group makes this unreachable; keep the error shape
                // anyway.
                Err(GraphError::InvalidArgument(
                    "--http or --grpc is required".into(),
                ))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_requires_a_surface() {
        let err = Cli::try_parse_from(["ninjagraph", "serve"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn serve_surfaces_are_mutually_exclusive() {
        let err = Cli::try_parse_from([
            "ninjagraph",
            "serve",
            "--http",
            "127.0.0.1:8080",
            "--grpc",
            "127.0.0.1:50051",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn serve_parses_http_with_store() {
        let cli = Cli::try_parse_from([
            "ninjagraph",
            "serve",
            "--http",
            "127.0.0.1:8080",
            "--store",
            "/tmp/graph",
        ])
        .expect("parse");
        let Commands::Serve { http, grpc, store } = cli.command;
        assert_eq!(http.as_deref(), Some("127.0.0.1:8080"));
        assert!(grpc.is_none());
        assert_eq!(store, PathBuf::from("/tmp/graph"));
    }

    #[test]
    fn store_path_with_files_is_refused() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(temp.path().join("leftover"), b"x").expect("write");

        let err = check_store_path(temp.path()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn empty_or_absent_store_path_is_accepted() {
        let temp = tempfile::tempdir().expect("temp dir");
        check_store_path(temp.path()).expect("empty dir");
        check_store_path(&temp.path().join("absent")).expect("absent dir");
    }
}
