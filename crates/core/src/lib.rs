//! Preconfig Core - shared domain types for the request workflow.
//!
//! This crate provides the types used across all Preconfig components:
//! - `api` - JSON API, workflow engine and notification feed
//! - `cli` - Command-line tools for migrations and user bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Role resolution and the permission matrix live
//! here so that every caller evaluates access the same way.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, statuses and activity kinds
//! - [`access`] - The permission matrix layered over [`Role`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod types;

pub use access::RequestAccess;
pub use types::*;
