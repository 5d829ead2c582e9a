//! veogen CLI library
//!
//! Runs a single video generation in-process and optionally saves the
//! result.

pub mod download;
pub mod generate;
