//! Lending repository: the transactional half of the lending engine.
//!
//! Everything that touches locks and commits lives here; what to do with a
//! given loan state is decided by the policy closure the caller passes in.
//! Swapping the policy never touches this file.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

/// Snapshot of the state a lending decision is made against.
///
/// Captured while both the member row and the book row are locked, so it
/// cannot go stale between the decision and the commit.
#[derive(Debug, Clone, Copy)]
pub struct LoanState {
    /// Copies of the book currently on the shelf
    pub available: i32,
    /// Books the member currently holds
    pub held_count: i64,
    /// Whether the member already holds this very book
    pub already_held: bool,
}

/// Direction of a lending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Borrow,
    Return,
}

#[derive(Clone)]
pub struct LendingRepository {
    pool: Pool<Postgres>,
}

impl LendingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Run one lending mutation as a single unit of work.
    ///
    /// Locks the member row, then the book row (always in that order, every
    /// lending path), snapshots the holding relation, lets `decide` pick the
    /// direction, and applies the copy-count delta together with the edge
    /// insert/delete. Either both mutations commit or neither does. A copy
    /// is thus always either counted in `available` or represented by
    /// exactly one `member_books` edge.
    ///
    /// Returns the member's held-book set as of the commit.
    pub async fn execute<F>(
        &self,
        member_id: i32,
        book_id: i32,
        decide: F,
    ) -> AppResult<Vec<Book>>
    where
        F: FnOnce(&LoanState) -> AppResult<LoanAction>,
    {
        // A lost row-lock race aborts the transaction with a store-level
        // error; surface it as a retryable conflict, never a corrupted count.
        self.execute_inner(member_id, book_id, decide)
            .await
            .map_err(AppError::remap_store)
    }

    async fn execute_inner<F>(
        &self,
        member_id: i32,
        book_id: i32,
        decide: F,
    ) -> AppResult<Vec<Book>>
    where
        F: FnOnce(&LoanState) -> AppResult<LoanAction>,
    {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(member_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member not found by id {}", member_id)))?;

        let available: i32 =
            sqlx::query_scalar("SELECT available FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Book not found by id {}", book_id)))?;

        let already_held: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM member_books WHERE member_id = $1 AND book_id = $2)",
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let held_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM member_books WHERE member_id = $1")
                .bind(member_id)
                .fetch_one(&mut *tx)
                .await?;

        let state = LoanState {
            available,
            held_count,
            already_held,
        };

        match decide(&state)? {
            LoanAction::Borrow => {
                sqlx::query(
                    "UPDATE books SET available = available - 1, updated_at = NOW() WHERE id = $1",
                )
                .bind(book_id)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO member_books (member_id, book_id, borrowed_at) VALUES ($1, $2, NOW())",
                )
                .bind(member_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            }
            LoanAction::Return => {
                sqlx::query(
                    "UPDATE books SET available = available + 1, updated_at = NOW() WHERE id = $1",
                )
                .bind(book_id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM member_books WHERE member_id = $1 AND book_id = $2")
                    .bind(member_id)
                    .bind(book_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let held = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.id, b.title, b.author, b.available, b.created_at, b.updated_at
            FROM books b
            JOIN member_books mb ON mb.book_id = b.id
            WHERE mb.member_id = $1
            ORDER BY b.title, b.author
            "#,
        )
        .bind(member_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(held)
    }

    /// Count outstanding holding edges
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM member_books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
