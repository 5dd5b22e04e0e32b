//! Account repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde_json::Value;

use super::entities::account::{self, ActiveModel, Entity as AccountEntity};
use common::{AppError, AppResult, OptionExt};
use domain::{Account, AccountChanges, MSG_ACCOUNT_IN_USE, MSG_ACCOUNT_NOT_FOUND};

#[cfg(test)]
use mockall::automock;

/// Account repository trait for dependency injection.
///
/// Lookups expect already-normalized (lowercase) usernames and emails.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find account by primary key
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>>;

    /// Find the first account (lowest id) whose username or email equals `identifier`
    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>>;

    /// Find account by username only
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    /// Find account by email only
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Insert a new account; the id is assigned by storage
    async fn create(
        &self,
        username: String,
        email: String,
        password_hash: String,
        default_model: String,
        preferences: Value,
    ) -> AppResult<Account>;

    /// Apply the supplied column changes
    async fn update(&self, id: i32, changes: AccountChanges) -> AppResult<Account>;

    /// Set the last-login timestamp
    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> AppResult<Account>;

    /// Permanently delete account by ID
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// SeaORM implementation of AccountRepository.
///
/// Generic over the connection so the same queries run on the pool or inside
/// a `DatabaseTransaction`.
pub struct AccountStore<C> {
    db: C,
}

impl<C> AccountStore<C> {
    /// Create new repository instance
    pub fn new(db: C) -> Self {
        Self { db }
    }

    /// Give back the underlying connection (e.g. to commit a transaction).
    pub fn into_inner(self) -> C {
        self.db
    }
}

impl<C: ConnectionTrait> AccountStore<C> {
    async fn find_model(&self, id: i32) -> AppResult<account::Model> {
        AccountEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found(MSG_ACCOUNT_NOT_FOUND)
    }

    async fn find_one_by(&self, column: account::Column, value: &str) -> AppResult<Option<Account>> {
        let result = AccountEntity::find()
            .filter(column.eq(value))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Account::from))
    }
}

/// Map a failed insert or update, reporting a unique index hit on username or
/// email as a duplicate account.
fn write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::warn!(%detail, "Unique constraint rejected account write");
            AppError::duplicate(MSG_ACCOUNT_IN_USE)
        }
        _ => AppError::from(err),
    }
}

#[async_trait]
impl<C> AccountRepository for AccountStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>> {
        let result = AccountEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Account::from))
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>> {
        let result = AccountEntity::find()
            .filter(
                Condition::any()
                    .add(account::Column::Username.eq(identifier))
                    .add(account::Column::Email.eq(identifier)),
            )
            .order_by_asc(account::Column::Id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Account::from))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        self.find_one_by(account::Column::Username, username).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        self.find_one_by(account::Column::Email, email).await
    }

    async fn create(
        &self,
        username: String,
        email: String,
        password_hash: String,
        default_model: String,
        preferences: Value,
    ) -> AppResult<Account> {
        let now = Utc::now();
        let active_model = ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            default_model: Set(default_model),
            preferences: Set(preferences),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await.map_err(write_error)?;
        Ok(Account::from(model))
    }

    async fn update(&self, id: i32, changes: AccountChanges) -> AppResult<Account> {
        let mut active: ActiveModel = self.find_model(id).await?.into();

        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(default_model) = changes.default_model {
            active.default_model = Set(default_model);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await.map_err(write_error)?;
        Ok(Account::from(model))
    }

    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> AppResult<Account> {
        let mut active: ActiveModel = self.find_model(id).await?.into();
        active.last_login_at = Set(Some(at));
        active.updated_at = Set(at);

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Account::from(model))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = AccountEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found(MSG_ACCOUNT_NOT_FOUND));
        }

        Ok(())
    }
}
