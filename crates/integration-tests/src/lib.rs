//! Integration tests for Preconfig.
//!
//! # Running Tests
//!
//! ```bash
//! # Engine scenarios and router tests (no database needed)
//! cargo test -p preconfig-integration-tests
//!
//! # Live-server smoke tests (start preconfig-api first)
//! cargo test -p preconfig-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `workflow_scenarios` - Engine and feed behavior over the memory store
//! - `api_routes` - HTTP status mapping through the axum router
//! - `live_server` - Smoke tests against a running server

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use preconfig_api::config::ApiConfig;
use preconfig_api::db::MemoryStore;
use preconfig_api::models::{CurrentUser, NewUser};
use preconfig_api::routes;
use preconfig_api::state::AppState;
use preconfig_api::store::Stores;
use preconfig_core::{Email, Role};

/// Header the gateway sets in [`ApiConfig::in_memory`].
pub const IDENTITY_HEADER: &str = "x-authenticated-email";

/// A memory-backed application with one user per role.
pub struct TestApp {
    pub memory: Arc<MemoryStore>,
    pub state: AppState,
    /// Customer (`user` role) submitting requests.
    pub customer: CurrentUser,
    /// `rakwireless` reviewer.
    pub reviewer: CurrentUser,
    /// Second `rakwireless` reviewer, used as assignee.
    pub assignee: CurrentUser,
    pub admin: CurrentUser,
    /// Customer with no relation to the requests under test.
    pub outsider: CurrentUser,
}

impl TestApp {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        let customer = seed_user(&memory, "uma@customer.com", Some("Uma Customer"), None).await;
        let reviewer = seed_user(&memory, "rex@rakwireless.com", Some("Rex Reviewer"), None).await;
        let assignee = seed_user(&memory, "tia@rakwireless.com", Some("Tia Tech"), None).await;
        let admin = seed_user(
            &memory,
            "admin@rakwireless.com",
            Some("Admin"),
            Some(Role::Admin),
        )
        .await;
        let outsider = seed_user(&memory, "otto@outside.org", None, None).await;

        let state = AppState::new(ApiConfig::in_memory(), Stores::memory(&memory));
        Self {
            memory,
            state,
            customer,
            reviewer,
            assignee,
            admin,
            outsider,
        }
    }

    /// The full router with state attached.
    pub fn router(&self) -> Router {
        routes::routes().with_state(self.state.clone())
    }

    /// Send one request through the router and decode the JSON body.
    ///
    /// `as_user` is the identity header value; `None` sends no header.
    /// Empty bodies decode to [`Value::Null`].
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        as_user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(email) = as_user {
            builder = builder.header(IDENTITY_HEADER, email);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

/// Insert a directory user and resolve it the way the auth extractor does.
pub async fn seed_user(
    memory: &MemoryStore,
    email: &str,
    name: Option<&str>,
    role: Option<Role>,
) -> CurrentUser {
    let record = memory
        .insert_user(NewUser {
            email: Email::parse(email).unwrap(),
            name: name.map(String::from),
            role,
        })
        .await
        .unwrap();
    CurrentUser::from(&record)
}
