//! CLI command implementations.

pub mod common;
pub mod config;
pub mod families;
pub mod generate;
pub mod render;
pub mod resolution;
