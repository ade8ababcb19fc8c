//! Analytics endpoints.

use super::AppState;
use super::auth::{AdminUser, AuthUser};
use crate::error::AppResult;
use crate::types::{AnalyticsFilter, FormAnalytics, OrganizationAnalytics};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Query-string form of `AnalyticsFilter`. `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub tags: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
}

impl From<AnalyticsQuery> for AnalyticsFilter {
    fn from(query: AnalyticsQuery) -> Self {
        let tags = query
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        AnalyticsFilter {
            tags,
            date_from: query.date_from,
            date_to: query.date_to,
            user_id: query.user_id,
        }
    }
}

/// GET /api/analytics/forms/{id}
pub async fn form_analytics(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(form_id): Path<i64>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<FormAnalytics>> {
    let filter = AnalyticsFilter::from(query);
    Ok(Json(state.db.form_analytics(form_id, &filter)?))
}

/// GET /api/analytics/organization
pub async fn organization_analytics(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<OrganizationAnalytics>> {
    let filter = AnalyticsFilter::from(query);
    Ok(Json(state.db.organization_analytics(&filter)?))
}
