//! Account repository.

use std::sync::Arc;

use crate::entities::{Account, account};
use crate::visibility;
use commune_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Account repository for database operations.
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an alive account by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<account::Model>> {
        Account::find_by_id(id)
            .filter(visibility::alive_accounts())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an alive account by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<account::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Find alive accounts by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<account::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Account::find()
            .filter(account::Column::Id.is_in(ids.to_vec()))
            .filter(visibility::alive_accounts())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Page through alive accounts drawn from `ids`, optionally narrowed by a
    /// name search, ordered by username.
    pub async fn find_by_ids_paged(
        &self,
        ids: &[String],
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut query = Account::find()
            .filter(account::Column::Id.is_in(ids.to_vec()))
            .filter(visibility::alive_accounts());

        if let Some(needle) = search {
            query = query.filter(
                Condition::any()
                    .add(account::Column::Username.contains(needle))
                    .add(account::Column::DisplayName.contains(needle)),
            );
        }

        query
            .order_by_asc(account::Column::Username)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
