//! Data models for the batch processing driver.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`RunConfig`]: the immutable description of one invocation, built once
//!   at startup from flags, prompts, or a persisted record
//! - [`ParametersRecord`]: the flat key/value provenance record written next
//!   to every per-file output and read back when parameter reuse is enabled
//! - [`OpenerTable`]: the declarative suffix → opener dispatch table for the
//!   host imaging application, loaded from `Openers.yaml`
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: persisted structures derive `Serialize`/`Deserialize`
//! - **Order-preserving**: user-visible mappings use `IndexMap` so persisted
//!   files diff cleanly across runs
//! - **Immutable in flight**: a `RunConfig` is never mutated after startup;
//!   per-file overlays produce scoped copies instead

pub mod openers;
pub mod parameters;
pub mod run_config;

pub use openers::{OpenerSpec, OpenerTable};
pub use parameters::{PARAMETERS_FILE_NAME, ParamValue, ParametersRecord};
pub use run_config::{ConfigError, RunConfig, RunMode};
