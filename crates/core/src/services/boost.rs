//! Boosted post service.
//!
//! Boosts go through a review lifecycle: pending on purchase, accepted or
//! rejected by review, and expired once the promotion window passes. Expiry
//! runs as a periodic background sweep; the feed also sweeps opportunistically
//! before composing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use commune_common::{AppError, AppResult, BoostConfig, IdGenerator};
use commune_db::entities::boosted_post::{self, BoostStatus};
use commune_db::repositories::{AccountRepository, BoostedPostRepository, PostRepository};
use sea_orm::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use tracing::{info, warn};

/// Boost service for business logic.
#[derive(Clone)]
pub struct BoostService {
    boost_repo: BoostedPostRepository,
    account_repo: AccountRepository,
    post_repo: PostRepository,
    config: BoostConfig,
    id_gen: IdGenerator,
}

impl BoostService {
    /// Create a new boost service.
    #[must_use]
    pub fn new(db: Arc<sea_orm::DatabaseConnection>, config: BoostConfig) -> Self {
        Self {
            boost_repo: BoostedPostRepository::new(db.clone()),
            account_repo: AccountRepository::new(db.clone()),
            post_repo: PostRepository::new(db),
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a boost for a post, entering review as pending.
    ///
    /// Creation counts against the rolling window quota regardless of how
    /// review later turns out.
    pub async fn create_boost(
        &self,
        booster_id: &str,
        post_id: &str,
        end_date: Option<DateTimeWithTimeZone>,
    ) -> AppResult<boosted_post::Model> {
        let booster = self.account_repo.get_by_id(booster_id).await?;
        if self.config.require_pro && !booster.is_pro {
            return Err(AppError::Forbidden(
                "boosting requires a pro account".to_string(),
            ));
        }

        self.post_repo.get_by_id(post_id).await?;

        let window_days = u64::try_from(self.config.window_days).unwrap_or(7);
        let since = Utc::now()
            .checked_sub_days(Days::new(window_days))
            .unwrap_or_else(Utc::now);
        let recent = self
            .boost_repo
            .count_recent_by_user(booster_id, since.into())
            .await?;
        if recent >= self.config.weekly_limit {
            return Err(AppError::Conflict(format!(
                "boost limit of {} per {} days reached",
                self.config.weekly_limit, self.config.window_days
            )));
        }

        let model = boosted_post::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            booster_id: Set(booster_id.to_string()),
            status: Set(BoostStatus::Pending),
            end_date: Set(end_date),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        self.boost_repo.create(model).await
    }

    /// Approve a pending boost.
    pub async fn approve_boost(&self, boost_id: &str) -> AppResult<boosted_post::Model> {
        self.review(boost_id, BoostStatus::Accepted).await
    }

    /// Reject a pending boost.
    pub async fn reject_boost(&self, boost_id: &str) -> AppResult<boosted_post::Model> {
        self.review(boost_id, BoostStatus::Rejected).await
    }

    /// Expire every accepted boost whose window has passed.
    ///
    /// Safe to call repeatedly; rows already expired no longer match.
    pub async fn expire_due(&self) -> AppResult<u64> {
        let affected = self.boost_repo.expire_due(Utc::now().into()).await?;
        if affected > 0 {
            info!(count = affected, "expired boosts past their window");
        }
        Ok(affected)
    }

    /// Boosts created by an account, newest first.
    pub async fn list_for_booster(
        &self,
        booster_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<boosted_post::Model>> {
        self.boost_repo.find_by_booster(booster_id, limit, offset).await
    }

    /// Spawn the periodic expiry sweep.
    ///
    /// Runs until the returned handle is aborted or the runtime shuts down.
    #[must_use]
    pub fn spawn_expiry_sweep(self, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = self.expire_due().await {
                    warn!(error = %e, "boost expiry sweep failed");
                }
            }
        })
    }

    /// Move a pending boost to a review outcome.
    async fn review(&self, boost_id: &str, outcome: BoostStatus) -> AppResult<boosted_post::Model> {
        let boost = self.boost_repo.get_by_id(boost_id).await?;
        if boost.status != BoostStatus::Pending {
            return Err(AppError::InvalidState(
                "boost is not awaiting review".to_string(),
            ));
        }
        self.boost_repo.set_status(boost, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commune_db::entities::{account, post};
    use commune_db::test_utils::mock::{test_account, test_boost, test_post};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn pro_account(id: &str) -> account::Model {
        let mut a = test_account(id, "pro");
        a.is_pro = true;
        a
    }

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> BoostService {
        BoostService::new(db, BoostConfig::default())
    }

    #[tokio::test]
    async fn test_create_boost_requires_pro() {
        let free = test_account("u1", "alice");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[free]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.create_boost("u1", "p1", None).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_boost_post_must_exist() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pro_account("u1")]])
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.create_boost("u1", "missing", None).await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_boost_window_quota() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pro_account("u1")]])
                .append_query_results([[test_post("p1", "u1")]])
                .append_query_results([[count_row(3)]])
                .into_connection(),
        );
        let svc = service(db);

        // Three boosts this week already; the default limit is three
        let result = svc.create_boost("u1", "p1", None).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_approve_requires_pending() {
        let accepted = test_boost("b1", "p1", "u1", BoostStatus::Accepted);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[accepted]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.approve_boost("b1").await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_reject_requires_pending() {
        let expired = test_boost("b1", "p1", "u1", BoostStatus::Expired);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[expired]])
                .into_connection(),
        );
        let svc = service(db);

        let result = svc.reject_boost("b1").await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        let mut row = std::collections::BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }
}
