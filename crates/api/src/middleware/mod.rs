//! HTTP middleware and extractors.
//!
//! Authentication happens upstream: a gateway verifies the caller and
//! forwards their email in the configured identity header. The extractors
//! here only resolve that email against the user directory.

pub mod auth;

pub use auth::{AuthRejection, RequireUser};
