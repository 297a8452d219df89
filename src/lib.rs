//! # reid-config: configuration bootstrap for multi-branch ReID training
//!
//! Defines every parameter the re-identification training pipeline accepts,
//! validates raw input against that schema, and derives the immutable
//! sub-configurations handed to the data manager, the optimizer, and the
//! model builder.
//!
//! ## Architecture
//!
//! - **config::schema**: Typed parameter specs and the sealed registry
//! - **config::catalog**: The ReID parameter catalog
//! - **config::parser**: Validation of raw input into a `RawConfig`
//! - **config::derived**: Pure projections into subsystem configs
//! - **config::load**: YAML configuration files
//! - **config::cli**: Command-line surface generated from the registry
//! - **config::bundle**: Every projection from one validated config

pub mod config;

pub mod error;

// Re-export commonly used types
pub use config::{parse, registry, ConfigBundle, RawConfig, RawInput, SchemaRegistry};
pub use error::{Error, Result};
