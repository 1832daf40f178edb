//! Steward - idempotent Kubernetes resource management
//!
//! Steward is a thin reconciliation layer between an application and the
//! Kubernetes API. It turns the client's create/read/patch/delete
//! primitives into idempotent "ensure present with this configuration" and
//! "ensure absent" operations for a fixed set of resource kinds, plus a few
//! read-only cluster metadata accessors.
//!
//! # Architecture
//!
//! Every ensure operation is a single read followed by at most one mutating
//! call. The read failure is classified as either "resource absent" (a 404
//! status) or "operation failed" (anything else); only the former triggers
//! the corrective create, and ensure-absent treats it as terminal success.
//! There is no caching, no watching, and no retrying at this layer.
//!
//! # Modules
//!
//! - [`kind`] - Managed resource kinds and their per-kind API metadata
//! - [`reconcile`] - The generic read-then-branch reconciliation protocol
//! - [`ops`] - Kubernetes-backed implementation of the protocol's capability set
//! - [`manager`] - Facade binding a client and namespace to per-kind operations
//! - [`error`] - Error types and the not-found classifier

#![deny(missing_docs)]

pub mod error;
pub mod kind;
pub mod manager;
pub mod ops;
pub mod reconcile;

pub use error::Error;
pub use kind::ResourceKind;
pub use manager::ResourceManager;
pub use reconcile::{FailurePolicy, Outcome};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace used when the caller does not choose one
pub const DEFAULT_NAMESPACE: &str = "default";
