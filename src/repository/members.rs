//! Members repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        member::{Member, MemberQuery, UpdateMember},
    },
};

const MEMBER_COLUMNS: &str = "id, name, joined_at, updated_at";

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member not found by id {}", id)))
    }

    /// Search members by exact name and join-date window, with pagination
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        // Caller-supplied page numbers can be absurd; saturate instead of
        // overflowing into a negative OFFSET.
        let offset = page.saturating_sub(1).saturating_mul(per_page);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM members
            WHERE ($1::text IS NULL OR name = $1)
              AND ($2::timestamptz IS NULL OR joined_at >= $2)
              AND ($3::timestamptz IS NULL OR joined_at <= $3)
            "#,
        )
        .bind(&query.name)
        .bind(query.joined_after)
        .bind(query.joined_before)
        .fetch_one(&self.pool)
        .await?;

        let members = sqlx::query_as::<_, Member>(&format!(
            r#"
            SELECT {} FROM members
            WHERE ($1::text IS NULL OR name = $1)
              AND ($2::timestamptz IS NULL OR joined_at >= $2)
              AND ($3::timestamptz IS NULL OR joined_at <= $3)
            ORDER BY name
            LIMIT $4 OFFSET $5
            "#,
            MEMBER_COLUMNS
        ))
        .bind(&query.name)
        .bind(query.joined_after)
        .bind(query.joined_before)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((members, total))
    }

    /// Create a member; the join timestamp is stamped by the store
    pub async fn create(&self, name: &str) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO members (name) VALUES ($1) RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from_store(e) {
            AppError::NotUnique(_) => {
                AppError::NotUnique(format!("Member with name '{}' already exists", name))
            }
            other => other,
        })
    }

    /// Update a member. Only the name can change; blank names are ignored.
    pub async fn update(&self, id: i32, update: &UpdateMember) -> AppResult<Member> {
        // The collision probe can lose to a concurrent commit; the UPDATE
        // then hits the uniqueness constraint instead of the probe.
        self.update_inner(id, update)
            .await
            .map_err(|e| match e.remap_store() {
                AppError::NotUnique(msg) if msg.contains("duplicate key") => {
                    AppError::NotUnique("Member with that name already exists".to_string())
                }
                other => other,
            })
    }

    async fn update_inner(&self, id: i32, update: &UpdateMember) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1 FOR UPDATE",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member not found by id {}", id)))?;

        let name = match update.name.as_deref() {
            Some(n) if !n.trim().is_empty() && n != current.name => n.to_string(),
            _ => current.name.clone(),
        };

        if name != current.name {
            let collides: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM members WHERE name = $1 AND id != $2)",
            )
            .bind(&name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if collides {
                return Err(AppError::NotUnique(format!(
                    "Member with name '{}' already exists",
                    name
                )));
            }
        }

        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET name = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(&name)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(AppError::from_store)?;
        Ok(member)
    }

    /// Delete a member, refusing while they still hold any book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member not found by id {}", id)))?;

        let held: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM member_books WHERE member_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if held > 0 {
            return Err(AppError::CantBeDeleted(
                "Member can't be deleted because they haven't returned all borrowed books yet"
                    .to_string(),
            ));
        }

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(AppError::from_store)?;
        Ok(())
    }

    /// Books currently held by a member
    pub async fn held_books(&self, member_id: i32) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.id, b.title, b.author, b.available, b.created_at, b.updated_at
            FROM books b
            JOIN member_books mb ON mb.book_id = b.id
            WHERE mb.member_id = $1
            ORDER BY b.title, b.author
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Count all members
    pub async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
