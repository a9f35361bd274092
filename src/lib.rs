//! Bidirectional mapping between DFXML file-system inventories and CASE/UCO
//! evidence graphs.
//!
//! [`pipeline`] holds the file-to-file commands; the binaries in `src/bin`
//! are thin wrappers over it.

pub mod cli;
pub mod config;
pub mod dfxml;
pub mod emit;
pub mod error;
pub mod graph;
pub mod identity;
pub mod logger;
pub mod pipeline;
pub mod reconstruct;
pub mod validate;

pub use config::Config;
pub use error::AppError;
