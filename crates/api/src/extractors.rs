//! Request extractors.

use appraisal_common::{AppError, PageRequest};
use appraisal_core::Actor;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use crate::middleware::AppState;

/// Authenticated caller extractor.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    page: Option<i64>,
    page_size: Option<i64>,
}

/// `page` / `pageSize` query parameters, clamped to the configured bounds.
#[derive(Debug, Clone, Copy)]
pub struct Paging(pub PageRequest);

impl FromRequestParts<AppState> for Paging {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        Ok(Self(PageRequest::clamped(
            query.page,
            query.page_size,
            state.config.default_page_size,
            state.config.max_page_size,
        )))
    }
}
