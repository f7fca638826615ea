//! Business logic services

pub mod catalog;
pub mod lending;
pub mod members;

use sqlx::{Pool, Postgres};

use crate::{config::LendingConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub lending: lending::LendingService,
    pool: Pool<Postgres>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, lending_config: LendingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            members: members::MembersService::new(repository.clone()),
            pool: repository.pool.clone(),
            lending: lending::LendingService::new(repository, lending_config),
        }
    }

    /// Probe the store, for readiness checks
    pub async fn ping_store(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
