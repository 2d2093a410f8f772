//! Library entrypoint for godot-autodeploy.
//!
//! The primary interface is the `autodeploy` binary. This lib target exposes
//! the build, discovery and deploy steps to integration tests.

pub mod artifact;
pub mod config;
pub mod deploy;
pub mod error;
pub mod notify;
pub mod output;
pub mod platform;
pub mod runner;
pub mod toolchain;
