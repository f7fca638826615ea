//! Lending endpoints: the borrow/return toggle and the explicit variants.
//!
//! All three run through the same lending policy and the same transactional
//! path; they only differ in which decision rule is applied.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::book::Book};

/// Toggle a loan: borrow if the member does not hold the book, return if
/// they do. Responds with the member's held books after the mutation.
#[utoipa::path(
    patch,
    path = "/members/{member_id}/books/{book_id}",
    tag = "lending",
    params(
        ("member_id" = i32, Path, description = "Member ID"),
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Member's held books after the toggle", body = Vec<Book>),
        (status = 404, description = "Member or book not found"),
        (status = 409, description = "Book can't be borrowed, or a concurrent update won the race")
    )
)]
pub async fn toggle_loan(
    State(state): State<crate::AppState>,
    Path((member_id, book_id)): Path<(i32, i32)>,
) -> AppResult<Json<Vec<Book>>> {
    let held = state.services.lending.toggle_loan(member_id, book_id).await?;
    Ok(Json(held))
}

/// Borrow a book
#[utoipa::path(
    patch,
    path = "/members/{member_id}/books/{book_id}/borrow",
    tag = "lending",
    params(
        ("member_id" = i32, Path, description = "Member ID"),
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Member's held books after the borrow", body = Vec<Book>),
        (status = 404, description = "Member or book not found"),
        (status = 409, description = "No copies available, duplicate hold, or borrow limit reached")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    Path((member_id, book_id)): Path<(i32, i32)>,
) -> AppResult<Json<Vec<Book>>> {
    let held = state.services.lending.borrow_book(member_id, book_id).await?;
    Ok(Json(held))
}

/// Return a book
#[utoipa::path(
    patch,
    path = "/members/{member_id}/books/{book_id}/return",
    tag = "lending",
    params(
        ("member_id" = i32, Path, description = "Member ID"),
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Member's held books after the return", body = Vec<Book>),
        (status = 404, description = "Member or book not found, or book not held by member")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Path((member_id, book_id)): Path<(i32, i32)>,
) -> AppResult<Json<Vec<Book>>> {
    let held = state.services.lending.return_book(member_id, book_id).await?;
    Ok(Json(held))
}
