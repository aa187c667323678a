//! # quill-api
//!
//! Service layer and HTTP server for quill. The library half exposes the
//! services (including the tag reconciliation engine) and the token
//! plumbing; the binary wires them to an axum router.

pub mod auth;
pub mod services;
