//! Books repository for database operations

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BorrowedTitle, UpdateBook},
};

const BOOK_COLUMNS: &str = "id, title, author, available, created_at, updated_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book not found by id {}", id)))
    }

    /// Search books with optional title/author filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        // Caller-supplied page numbers can be absurd; saturate instead of
        // overflowing into a negative OFFSET.
        let offset = page.saturating_sub(1).saturating_mul(per_page);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::text IS NULL OR title ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR author ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(&query.title)
        .bind(&query.author)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM books
            WHERE ($1::text IS NULL OR title ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR author ILIKE '%' || $2 || '%')
            ORDER BY title, author
            LIMIT $3 OFFSET $4
            "#,
            BOOK_COLUMNS
        ))
        .bind(&query.title)
        .bind(&query.author)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Create a book with merge-on-duplicate semantics.
    ///
    /// A (title, author) pair is effectively unique: if a matching book
    /// already exists its available count is incremented instead of
    /// inserting a second row. The lookup-then-branch runs in one
    /// transaction with the existing row locked, so two concurrent creates
    /// of the same pair cannot both insert.
    ///
    /// Returns the book and whether it was merged into an existing record.
    pub async fn create(&self, title: &str, author: &str) -> AppResult<(Book, bool)> {
        // Two creates racing on an absent row both pass the lookup (there is
        // no row to lock yet) and the loser's INSERT trips the uniqueness
        // constraint; map that to a typed error, not a bare store failure.
        self.create_inner(title, author)
            .await
            .map_err(|e| match e.remap_store() {
                AppError::NotUnique(_) => {
                    AppError::NotUnique("Book with given title and author already exists".to_string())
                }
                other => other,
            })
    }

    async fn create_inner(&self, title: &str, author: &str) -> AppResult<(Book, bool)> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE title = $1 AND author = $2 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(title)
        .bind(author)
        .fetch_optional(&mut *tx)
        .await?;

        let (book, merged) = if let Some(existing) = existing {
            let book = sqlx::query_as::<_, Book>(&format!(
                "UPDATE books SET available = available + 1, updated_at = NOW() WHERE id = $1 RETURNING {}",
                BOOK_COLUMNS
            ))
            .bind(existing.id)
            .fetch_one(&mut *tx)
            .await?;
            (book, true)
        } else {
            let book = sqlx::query_as::<_, Book>(&format!(
                r#"
                INSERT INTO books (title, author, available)
                VALUES ($1, $2, 1)
                RETURNING {}
                "#,
                BOOK_COLUMNS
            ))
            .bind(title)
            .bind(author)
            .fetch_one(&mut *tx)
            .await?;
            (book, false)
        };

        tx.commit().await.map_err(AppError::from_store)?;
        Ok((book, merged))
    }

    /// Update a book with partial semantics.
    ///
    /// Blank or absent title/author keep the current value; the available
    /// count is replaced only when explicitly supplied. Rejects the update
    /// when the resulting (title, author) pair collides with a different
    /// book.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        // The collision probe can lose to a concurrent commit; the UPDATE
        // then hits the uniqueness constraint instead of the probe.
        self.update_inner(id, update)
            .await
            .map_err(|e| match e.remap_store() {
                AppError::NotUnique(_) => {
                    AppError::NotUnique("Book with given title and author already exists".to_string())
                }
                other => other,
            })
    }

    async fn update_inner(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book not found by id {}", id)))?;

        let title = match update.title.as_deref() {
            Some(t) if !t.trim().is_empty() && t != current.title => t.to_string(),
            _ => current.title.clone(),
        };
        let author = match update.author.as_deref() {
            Some(a) if !a.trim().is_empty() && a != current.author => a.to_string(),
            _ => current.author.clone(),
        };

        if title != current.title || author != current.author {
            let collides: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM books WHERE title = $1 AND author = $2 AND id != $3)",
            )
            .bind(&title)
            .bind(&author)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if collides {
                return Err(AppError::NotUnique(
                    "Book with given title and author already exists".to_string(),
                ));
            }
        }

        let available = update.available.unwrap_or(current.available);
        if available < 0 {
            return Err(AppError::Validation(
                "Available copies can't be negative".to_string(),
            ));
        }

        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = $1, author = $2, available = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&title)
        .bind(&author)
        .bind(available)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(AppError::from_store)?;
        Ok(book)
    }

    /// Delete a book, refusing while any member still holds a copy.
    ///
    /// The holder check and the delete run in the same transaction with the
    /// book row locked, so a concurrent borrow either commits before the
    /// check sees it or waits and then fails on the deleted row.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book not found by id {}", id)))?;

        let holders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM member_books WHERE book_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if holders > 0 {
            return Err(AppError::CantBeDeleted(
                "Book can't be deleted because it is borrowed by a member".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(AppError::from_store)?;
        Ok(())
    }

    /// Titles with at least one holder, with holder counts summed across
    /// books sharing the same title.
    pub async fn borrowed_titles(&self) -> AppResult<Vec<BorrowedTitle>> {
        let rows = sqlx::query(
            r#"
            SELECT b.title, COUNT(*) AS borrowed
            FROM books b
            JOIN member_books mb ON mb.book_id = b.id
            GROUP BY b.title
            ORDER BY b.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| BorrowedTitle {
                title: r.get("title"),
                borrowed: Some(r.get::<i64, _>("borrowed")),
            })
            .collect())
    }

    /// Count all books
    pub async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
