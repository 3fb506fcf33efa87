//! Core types for Preconfig.
//!
//! This module provides type-safe wrappers for the workflow domain.

pub mod activity;
pub mod email;
pub mod field;
pub mod id;
pub mod role;
pub mod status;

pub use activity::ActivityType;
pub use email::{Email, EmailError};
pub use field::RequestField;
pub use id::*;
pub use role::Role;
pub use status::WorkflowStatus;
