//! Membership management service

use crate::{
    error::AppResult,
    models::{
        book::Book,
        member::{CreateMember, Member, MemberQuery, UpdateMember},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get member by ID
    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Search members by name and join date
    pub async fn search_members(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        self.repository.members.search(query).await
    }

    /// Create a member; the join timestamp is stamped once, at creation
    pub async fn create_member(&self, member: CreateMember) -> AppResult<Member> {
        let created = self.repository.members.create(&member.name).await?;
        tracing::info!(member_id = created.id, "member created");
        Ok(created)
    }

    /// Update a member (name only)
    pub async fn update_member(&self, id: i32, update: UpdateMember) -> AppResult<Member> {
        self.repository.members.update(id, &update).await
    }

    /// Delete a member; fails while they hold any book
    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        self.repository.members.delete(id).await
    }

    /// Books currently held by a member
    pub async fn borrowed_books(&self, member_id: i32) -> AppResult<Vec<Book>> {
        // Verify member exists
        self.repository.members.get_by_id(member_id).await?;
        self.repository.members.held_books(member_id).await
    }

    /// Count all members
    pub async fn count_members(&self) -> AppResult<i64> {
        self.repository.members.count_all().await
    }
}
