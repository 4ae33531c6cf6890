//! Proxy registry
//!
//! This module owns the outbound identities used for fetching:
//! - CRUD over proxy entries, exposed only as credential-redacted views
//! - Per-user assignments, cleaned up when their proxy is deleted
//! - Resolution of a caller to a ready-to-use HTTP client
//!
//! A `"default"` entry always exists and cannot be deleted. Users without an
//! assignment, or whose assigned proxy is gone or inactive, resolve to it.

mod registry;
mod transport;
mod types;

pub use registry::{ProxyRegistry, ResolvedTransport, DEFAULT_PROXY_ID};
pub use transport::{ReqwestTransportFactory, TransportError, TransportFactory};
pub use types::{ProxyEntry, ProxySpec, ProxyUpdate, ProxyView, REDACTED};
