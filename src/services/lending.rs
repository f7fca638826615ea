//! Lending service: decides whether a borrow or return may proceed and
//! applies it atomically against the store.
//!
//! The decision logic is a pure [`LendingPolicy`] over a [`LoanState`]
//! snapshot; the transaction and locking code lives in
//! [`LendingRepository`](crate::repository::lending::LendingRepository) and
//! never needs to change when the policy does.

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::book::Book,
    repository::{
        lending::{LoanAction, LoanState},
        Repository,
    },
};

/// Pure decision rules for lending mutations.
#[derive(Debug, Clone, Copy)]
pub struct LendingPolicy {
    borrow_limit: i64,
}

impl LendingPolicy {
    pub fn new(borrow_limit: i64) -> Self {
        Self { borrow_limit }
    }

    /// Infer the direction from the current holding relation: holding the
    /// book means this is a return, otherwise a borrow (subject to the
    /// borrow preconditions).
    pub fn decide_toggle(
        &self,
        member_id: i32,
        book_id: i32,
        state: &LoanState,
    ) -> AppResult<LoanAction> {
        if state.already_held {
            Ok(LoanAction::Return)
        } else {
            self.decide_borrow(member_id, book_id, state)
        }
    }

    /// Explicit borrow: rejects zero inventory, a duplicate hold, and a
    /// member already at the borrow limit.
    pub fn decide_borrow(
        &self,
        member_id: i32,
        book_id: i32,
        state: &LoanState,
    ) -> AppResult<LoanAction> {
        if state.already_held {
            return Err(AppError::CantBeBorrowed(format!(
                "Book with id {} is already borrowed by member with id {}",
                book_id, member_id
            )));
        }
        if state.available == 0 {
            return Err(AppError::CantBeBorrowed(format!(
                "Amount of books with id {} is 0",
                book_id
            )));
        }
        if state.held_count >= self.borrow_limit {
            return Err(AppError::CantBeBorrowed(format!(
                "Member with id {} borrowed max allowed ({}) amount of books",
                member_id, self.borrow_limit
            )));
        }
        Ok(LoanAction::Borrow)
    }

    /// Explicit return. Returning a book the member does not hold is
    /// refused: incrementing the count without removing an edge would mint
    /// a copy out of thin air.
    pub fn decide_return(
        &self,
        member_id: i32,
        book_id: i32,
        state: &LoanState,
    ) -> AppResult<LoanAction> {
        if !state.already_held {
            return Err(AppError::NotFound(format!(
                "Member with id {} does not hold book with id {}",
                member_id, book_id
            )));
        }
        Ok(LoanAction::Return)
    }
}

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    policy: LendingPolicy,
}

impl LendingService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self {
            repository,
            policy: LendingPolicy::new(config.borrow_limit),
        }
    }

    /// Borrow-or-return toggle. Returns the member's held books afterwards.
    pub async fn toggle_loan(&self, member_id: i32, book_id: i32) -> AppResult<Vec<Book>> {
        let policy = self.policy;
        let held = self
            .repository
            .lending
            .execute(member_id, book_id, |state| {
                policy.decide_toggle(member_id, book_id, state)
            })
            .await?;

        tracing::info!(member_id, book_id, held = held.len(), "loan toggled");
        Ok(held)
    }

    /// Explicit borrow
    pub async fn borrow_book(&self, member_id: i32, book_id: i32) -> AppResult<Vec<Book>> {
        let policy = self.policy;
        let held = self
            .repository
            .lending
            .execute(member_id, book_id, |state| {
                policy.decide_borrow(member_id, book_id, state)
            })
            .await?;

        tracing::info!(member_id, book_id, "book borrowed");
        Ok(held)
    }

    /// Explicit return
    pub async fn return_book(&self, member_id: i32, book_id: i32) -> AppResult<Vec<Book>> {
        let policy = self.policy;
        let held = self
            .repository
            .lending
            .execute(member_id, book_id, |state| {
                policy.decide_return(member_id, book_id, state)
            })
            .await?;

        tracing::info!(member_id, book_id, "book returned");
        Ok(held)
    }

    /// Count outstanding holdings
    pub async fn count_active(&self) -> AppResult<i64> {
        self.repository.lending.count_active().await
    }
}
