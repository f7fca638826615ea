//! Statistics endpoint

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

#[derive(Serialize, ToSchema)]
pub struct BookStats {
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct MemberStats {
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct LoanStats {
    /// Outstanding holding edges
    pub active: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub books: BookStats,
    pub members: MemberStats,
    pub loans: LoanStats,
}

/// Library-wide counters
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse)
    )
)]
pub async fn get_stats(State(state): State<crate::AppState>) -> AppResult<Json<StatsResponse>> {
    let books = state.services.catalog.count_books().await?;
    let members = state.services.members.count_members().await?;
    let active = state.services.lending.count_active().await?;

    Ok(Json(StatsResponse {
        books: BookStats { total: books },
        members: MemberStats { total: members },
        loans: LoanStats { active },
    }))
}
