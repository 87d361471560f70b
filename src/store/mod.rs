//! Fjall-based persistence layer for task documents
//!
//! Durable storage for the download pipeline's task state. Uses fjall (an
//! embedded LSM key-value store) with two partitions:
//!
//! - `tasks`: the task documents themselves
//! - `files`: a produced-file-name -> task-id index for collaborators that
//!   only know the artifact name (post-processing uploads)
//!
//! The store is deliberately free of business logic: status transitions are
//! enforced by the worker, and the HTTP layer decides how a missing record
//! is reported. Tasks are never expired automatically; removal happens only
//! through an explicit delete.

pub mod error;
pub mod keys;
pub mod store;

pub use error::{Result, StoreError};
pub use store::TaskStore;
