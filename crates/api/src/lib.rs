//! HTTP API layer for the appraisal service.
//!
//! - **Endpoints**: REST resources under `/api`, plus an unauthenticated `/health`
//! - **Extractors**: the authenticated [`Actor`](appraisal_core::Actor) and clamped paging
//! - **Middleware**: bearer token authentication
//! - **Response**: the uniform `{success, message, data, errors}` envelope
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{health, router};
pub use middleware::{AppState, auth_middleware};
