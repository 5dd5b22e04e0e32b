//! Unit of Work pattern implementation.
//!
//! The unit of work hands out repositories and scopes database transactions.
//! A mutating account operation acquires one [`TransactionScope`], performs
//! all of its reads and writes through it, and releases it with
//! [`TransactionScope::commit`] or [`TransactionScope::rollback`] before
//! returning. A scope dropped without either is rolled back by SeaORM.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::repository::{AccountRepository, AccountStore};
use common::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Account repository on the shared pool (one statement per call)
    fn accounts(&self) -> Arc<dyn AccountRepository>;

    /// Open a transaction scope
    async fn begin(&self) -> AppResult<Box<dyn TransactionScope>>;
}

/// Repository access bound to a single open transaction.
#[async_trait]
pub trait TransactionScope: Send + Sync {
    /// Account repository executing inside this transaction
    fn accounts(&self) -> &dyn AccountRepository;

    /// Commit and release the transaction
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Roll back and release the transaction
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Release a scope according to the outcome of the work done in it.
///
/// Commits on `Ok`, rolls back on `Err`. A failed rollback is logged and the
/// error from the work itself is returned.
pub async fn finish<T>(scope: Box<dyn TransactionScope>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            scope.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = scope.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// SeaORM implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    account_repo: Arc<AccountStore<DatabaseConnection>>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: DatabaseConnection) -> Self {
        let account_repo = Arc::new(AccountStore::new(db.clone()));
        Self { db, account_repo }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn accounts(&self) -> Arc<dyn AccountRepository> {
        self.account_repo.clone()
    }

    async fn begin(&self) -> AppResult<Box<dyn TransactionScope>> {
        let txn = self.db.begin().await.map_err(AppError::from)?;
        Ok(Box::new(SeaTransactionScope {
            store: AccountStore::new(txn),
        }))
    }
}

/// Transaction scope owning a SeaORM `DatabaseTransaction`.
struct SeaTransactionScope {
    store: AccountStore<DatabaseTransaction>,
}

#[async_trait]
impl TransactionScope for SeaTransactionScope {
    fn accounts(&self) -> &dyn AccountRepository {
        &self.store
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.store.into_inner().commit().await.map_err(AppError::from)
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.store.into_inner().rollback().await.map_err(AppError::from)
    }
}
