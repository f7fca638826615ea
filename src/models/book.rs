//! Book model and related request/response types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Title must start with a capital letter.
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z].*").unwrap());

/// Author is "Firstname Lastname", both capitalized.
static AUTHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+ [A-Z][a-z]+$").unwrap());

/// Book record.
///
/// `available` is the number of physical copies not currently held by any
/// member. The holding relation itself lives in the `member_books` table;
/// a book's holders and a member's held books are both derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// Copies on the shelf, never negative
    pub available: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(
        length(min = 3, message = "Title must be at least 3 characters"),
        regex(path = *TITLE_RE, message = "Title must start with a capital letter")
    )]
    pub title: String,
    #[validate(regex(
        path = *AUTHOR_RE,
        message = "Author must be two capitalized words separated by a space"
    ))]
    pub author: String,
}

/// Update book request (partial; absent fields keep their current value)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(
        length(min = 3, message = "Title must be at least 3 characters"),
        regex(path = *TITLE_RE, message = "Title must start with a capital letter")
    )]
    pub title: Option<String>,
    #[validate(regex(
        path = *AUTHOR_RE,
        message = "Author must be two capitalized words separated by a space"
    ))]
    pub author: Option<String>,
    #[validate(range(min = 0, message = "Available copies can't be negative"))]
    pub available: Option<i32>,
}

/// Book list query parameters
#[derive(Debug, Deserialize, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One entry of the borrowed-titles report.
///
/// `borrowed` is the number of holding edges for that title, summed across
/// all books sharing it; it is omitted from the response unless requested.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowedTitle {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrowed: Option<i64>,
}
