//! # ninjagraph (app library)
//!
//! The server's modules, exposed as a library so integration tests can
//! exercise the router and the gRPC service without spawning a process.

pub mod api;
pub mod cli;
pub mod grpc;
