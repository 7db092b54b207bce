//! # competency
//!
//! Command-line front end for `competency-core`.
//!
//! This crate is the only part of the workspace that touches the filesystem,
//! the environment or the wall clock. It loads a JSON dataset or a binary
//! snapshot into a [`competency_core::Workspace`], runs one engine operation
//! and prints the result.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;

pub use config::{Config, LogFormat};
pub use dataset::{Dataset, load_workspace};
pub use error::AppError;
