//! Services module - the batch driver and its collaborators.
//!
//! This module contains the core logic for walking an input tree and
//! handing each matching file to a processing hook. The services are
//! framework-agnostic: no dialog or CLI code, only business logic.
//!
//! # Components
//!
//! - [`traversal::TreeWalker`]: pure, lazy, deterministic depth-first walk
//!   of the input tree, yielding directory markers (for mirroring) and
//!   [`traversal::FileTask`] values for files matching the suffix filter.
//!   Performs no writes of its own.
//!
//! - [`batch::run`]: the driver. Consumes the walker, creates mirrored
//!   output directories, persists the effective per-file parameters record,
//!   and invokes the caller's [`batch::FileProcessor`]. Per-file failures
//!   are isolated; only root-level failures abort the run. Returns a
//!   [`batch::RunReport`] and always logs a completion notice.
//!
//! - [`dispatch`]: the suffix → opener resolution and host-application
//!   command construction, plus the two stock processors
//!   ([`dispatch::HostProcessor`], [`dispatch::PlanProcessor`]).
//!
//! # Design Philosophy
//!
//! - **Synchronous**: one file at a time, in a deterministic order; a
//!   long-running processor blocks the driver by design
//! - **Separable**: traversal yields values, the driver performs I/O, so
//!   traversal is testable without touching the output tree
//! - **Throughput over fail-fast**: the batch finishes the folder and
//!   reports failures at the end rather than aborting on the first bad file

pub mod batch;
pub mod dispatch;
pub mod traversal;

pub use batch::{BatchError, FileProcessor, RunReport, run};
pub use dispatch::{DispatchError, HostProcessor, PlanProcessor};
pub use traversal::{FileTask, TreeItem, TreeWalker};
