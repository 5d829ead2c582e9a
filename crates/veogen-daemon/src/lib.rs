//! veogen daemon library
//!
//! Core functionality for the veogen daemon:
//! - fal.ai queue client behind the `Gateway` trait
//! - Temporary image staging
//! - Per-task event registry
//! - Task relay bridging gateway jobs to subscribers
//! - axum HTTP/SSE server

pub mod gateway;
pub mod registry;
pub mod relay;
pub mod server;
pub mod staging;
