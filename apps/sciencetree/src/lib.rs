//! # Science Tree Application
//!
//! HTTP API, CLI and configuration around `sciencetree-core`.
//! The binary in `main.rs` only installs logging and dispatches to [`cli`].

pub mod api;
pub mod cli;
pub mod config;
