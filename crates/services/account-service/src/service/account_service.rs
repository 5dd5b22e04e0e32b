//! Account service - registration, login, edit, deletion and lookup.
//!
//! Every mutating operation runs in its own transaction scope obtained from
//! the unit of work, so uniqueness checks and the write that follows them
//! commit or roll back together.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use common::{AppError, AppResult, OptionExt};
use domain::{
    normalize_identifier, Account, AccountChanges, Password, RegisterAccount, UpdateAccount,
    MSG_ACCOUNT_IN_USE, MSG_ACCOUNT_NOT_FOUND, MSG_EMAIL_IN_USE, MSG_EMAIL_MATCHES_USERNAME,
    MSG_IDENTIFIER_NOT_FOUND, MSG_INCORRECT_PASSWORD, MSG_USERNAME_IN_USE,
    MSG_USERNAME_MATCHES_EMAIL,
};

use crate::infra::{finish, UnitOfWork};
use crate::repository::AccountRepository;

/// Account service trait for dependency injection.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Find account by primary key
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>>;

    /// Find account by username or email, compared case-insensitively
    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>>;

    /// Hash a plaintext password for storage
    fn hash_password(&self, plain_text: &str) -> AppResult<String>;

    /// Register a new account
    async fn register(&self, input: RegisterAccount) -> AppResult<Account>;

    /// Verify credentials and record the login time
    async fn login(&self, identifier: &str, password: &str) -> AppResult<Account>;

    /// No-op; session termination belongs to the caller
    async fn logout(&self, id: i32) -> AppResult<()>;

    /// Change username, email, password or default model
    async fn edit(&self, id: i32, changes: UpdateAccount) -> AppResult<Account>;

    /// Permanently delete an account
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Concrete implementation of AccountService using a Unit of Work.
pub struct AccountManager {
    uow: Arc<dyn UnitOfWork>,
}

impl AccountManager {
    /// Create new account service instance
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    async fn register_in(
        repo: &dyn AccountRepository,
        username: String,
        email: String,
        password_hash: String,
        input: &RegisterAccount,
    ) -> AppResult<Account> {
        // Either value taken as a username or an email by anyone is a conflict
        for value in [&username, &email] {
            if repo.find_by_username_or_email(value).await?.is_some() {
                return Err(AppError::duplicate(MSG_ACCOUNT_IN_USE));
            }
        }

        repo.create(
            username,
            email,
            password_hash,
            input.default_model_or_default(),
            input.preferences_or_default(),
        )
        .await
    }

    async fn login_in(
        repo: &dyn AccountRepository,
        identifier: &str,
        password: &str,
    ) -> AppResult<Account> {
        let account = repo
            .find_by_username_or_email(identifier)
            .await?
            .ok_or_not_found(MSG_IDENTIFIER_NOT_FOUND)?;

        if !Password::from_hash(account.password_hash.as_str()).verify(password) {
            return Err(AppError::invalid_credentials(MSG_INCORRECT_PASSWORD));
        }

        repo.record_login(account.id, Utc::now()).await
    }

    async fn edit_in(
        repo: &dyn AccountRepository,
        id: i32,
        changes: AccountChanges,
    ) -> AppResult<Account> {
        let account = repo.find_by_id(id).await?.ok_or_not_found(MSG_ACCOUNT_NOT_FOUND)?;

        if let Some(username) = &changes.username {
            if taken_by_other(repo.find_by_email(username).await?, id) {
                return Err(AppError::duplicate(MSG_USERNAME_MATCHES_EMAIL));
            }
            if taken_by_other(repo.find_by_username(username).await?, id) {
                return Err(AppError::duplicate(MSG_USERNAME_IN_USE));
            }
        }

        if let Some(email) = &changes.email {
            if taken_by_other(repo.find_by_username(email).await?, id) {
                return Err(AppError::duplicate(MSG_EMAIL_MATCHES_USERNAME));
            }
            if taken_by_other(repo.find_by_email(email).await?, id) {
                return Err(AppError::duplicate(MSG_EMAIL_IN_USE));
            }
        }

        if changes.is_empty() {
            return Ok(account);
        }

        repo.update(id, changes).await
    }
}

fn taken_by_other(found: Option<Account>, id: i32) -> bool {
    found.is_some_and(|other| other.id != id)
}

fn require(value: &str, field: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{} is required.", field)));
    }
    Ok(())
}

#[async_trait]
impl AccountService for AccountManager {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Account>> {
        tracing::debug!(id, "Looking up account by id");
        self.uow.accounts().find_by_id(id).await
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>> {
        let identifier = normalize_identifier(identifier);
        tracing::debug!(%identifier, "Looking up account by username or email");
        self.uow.accounts().find_by_username_or_email(&identifier).await
    }

    fn hash_password(&self, plain_text: &str) -> AppResult<String> {
        Ok(Password::new(plain_text)?.into_string())
    }

    async fn register(&self, input: RegisterAccount) -> AppResult<Account> {
        let username = normalize_identifier(&input.username);
        let email = normalize_identifier(&input.email);
        require(&username, "Username")?;
        require(&email, "Email")?;

        // Hash outside the transaction; argon2 is deliberately slow
        let password_hash = self.hash_password(&input.password)?;

        let scope = self.uow.begin().await?;
        let result =
            Self::register_in(scope.accounts(), username, email, password_hash, &input).await;
        let account = finish(scope, result).await?;

        tracing::info!(id = account.id, username = %account.username, "Account registered");
        Ok(account)
    }

    async fn login(&self, identifier: &str, password: &str) -> AppResult<Account> {
        let identifier = normalize_identifier(identifier);

        let scope = self.uow.begin().await?;
        let result = Self::login_in(scope.accounts(), &identifier, password).await;

        match finish(scope, result).await {
            Ok(account) => {
                tracing::info!(id = account.id, "Login successful");
                Ok(account)
            }
            Err(e) => {
                if e.is_client_error() {
                    tracing::warn!(%identifier, code = e.code(), "Login rejected");
                }
                Err(e)
            }
        }
    }

    async fn logout(&self, id: i32) -> AppResult<()> {
        tracing::debug!(id, "Logout requested");
        Ok(())
    }

    async fn edit(&self, id: i32, changes: UpdateAccount) -> AppResult<Account> {
        let password_hash = changes
            .password()
            .map(|p| self.hash_password(p))
            .transpose()?;

        let changes = AccountChanges {
            username: changes.username(),
            email: changes.email(),
            password_hash,
            default_model: changes.default_model().map(str::to_string),
        };

        let scope = self.uow.begin().await?;
        let result = Self::edit_in(scope.accounts(), id, changes).await;
        let account = finish(scope, result).await?;

        tracing::info!(id, "Account edited");
        Ok(account)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let scope = self.uow.begin().await?;
        let result = scope.accounts().delete(id).await;
        finish(scope, result).await?;

        tracing::info!(id, "Account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use mockall::predicate::eq;
    use serde_json::json;

    use crate::infra::TransactionScope;
    use crate::repository::MockAccountRepository;

    fn test_account(id: i32, username: &str, email: &str) -> Account {
        Account {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hashed".to_string(),
            default_model: "default".to_string(),
            preferences: json!({}),
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn with_password(mut account: Account, hash: &str) -> Account {
        account.password_hash = hash.to_string();
        account
    }

    #[derive(Default)]
    struct Released {
        committed: AtomicBool,
        rolled_back: AtomicBool,
    }

    /// Scope that routes every call to one mock and records how it was released
    struct TestScope {
        repo: Arc<MockAccountRepository>,
        released: Arc<Released>,
    }

    #[async_trait]
    impl TransactionScope for TestScope {
        fn accounts(&self) -> &dyn AccountRepository {
            self.repo.as_ref()
        }

        async fn commit(self: Box<Self>) -> AppResult<()> {
            self.released.committed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> AppResult<()> {
            self.released.rolled_back.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct TestUnitOfWork {
        repo: Arc<MockAccountRepository>,
        released: Arc<Released>,
    }

    #[async_trait]
    impl UnitOfWork for TestUnitOfWork {
        fn accounts(&self) -> Arc<dyn AccountRepository> {
            self.repo.clone()
        }

        async fn begin(&self) -> AppResult<Box<dyn TransactionScope>> {
            Ok(Box::new(TestScope {
                repo: self.repo.clone(),
                released: self.released.clone(),
            }))
        }
    }

    fn service(repo: MockAccountRepository) -> (AccountManager, Arc<Released>) {
        let released = Arc::new(Released::default());
        let uow = TestUnitOfWork {
            repo: Arc::new(repo),
            released: released.clone(),
        };
        (AccountManager::new(Arc::new(uow)), released)
    }

    #[tokio::test]
    async fn test_find_by_username_or_email_normalizes() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email()
            .with(eq("bob@x.com"))
            .returning(|_| Ok(Some(test_account(1, "bob", "bob@x.com"))));

        let (service, _) = service(repo);
        let found = service.find_by_username_or_email("  Bob@X.com").await.unwrap();

        assert_eq!(found.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_register_lowercases_and_hashes() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email()
            .times(2)
            .returning(|_| Ok(None));
        repo.expect_create()
            .withf(|username, email, hash, model, prefs| {
                username == "bob"
                    && email == "bob@x.com"
                    && hash.starts_with("$argon2id$")
                    && model == "default"
                    && *prefs == json!({})
            })
            .returning(|username, email, hash, model, prefs| {
                Ok(Account {
                    id: 1,
                    username,
                    email,
                    password_hash: hash,
                    default_model: model,
                    preferences: prefs,
                    last_login_at: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            });

        let (service, released) = service(repo);
        let account = service
            .register(RegisterAccount::new("Bob", "Bob@X.com", "secret"))
            .await
            .unwrap();

        assert_eq!(account.username, "bob");
        assert!(Password::from_hash(account.password_hash).verify("secret"));
        assert!(released.committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_register_duplicate_rolls_back() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email()
            .returning(|_| Ok(Some(test_account(1, "bob", "bob@x.com"))));
        repo.expect_create().never();

        let (service, released) = service(repo);
        let result = service
            .register(RegisterAccount::new("BOB", "other@x.com", "secret"))
            .await;

        assert!(matches!(result, Err(AppError::DuplicateAccount(ref m)) if m == MSG_ACCOUNT_IN_USE));
        assert!(released.rolled_back.load(Ordering::SeqCst));
        assert!(!released.committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_register_requires_username() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email().never();

        let (service, _) = service(repo);
        let result = service
            .register(RegisterAccount::new("   ", "bob@x.com", "secret"))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_identifier() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email()
            .returning(|_| Ok(None));
        repo.expect_record_login().never();

        let (service, _) = service(repo);
        let result = service.login("ghost", "pw").await;

        assert!(matches!(result, Err(AppError::NotFound(ref m)) if m == MSG_IDENTIFIER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let hash = Password::new("right").unwrap().into_string();
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email()
            .returning(move |_| {
                Ok(Some(with_password(test_account(1, "bob", "bob@x.com"), &hash)))
            });
        repo.expect_record_login().never();

        let (service, released) = service(repo);
        let result = service.login("bob", "wrong").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials(_))));
        assert!(released.rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_login_records_time() {
        let hash = Password::new("right").unwrap().into_string();
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_username_or_email()
            .with(eq("bob@x.com"))
            .returning(move |_| {
                Ok(Some(with_password(test_account(4, "bob", "bob@x.com"), &hash)))
            });
        repo.expect_record_login()
            .withf(|id, _| *id == 4)
            .returning(|id, at| {
                let mut account = test_account(id, "bob", "bob@x.com");
                account.last_login_at = Some(at);
                Ok(account)
            });

        let (service, released) = service(repo);
        let account = service.login("BOB@x.com", "right").await.unwrap();

        assert!(account.has_logged_in());
        assert!(released.committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_edit_missing_account() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_update().never();

        let (service, _) = service(repo);
        let result = service.edit(9, UpdateAccount::default()).await;

        assert!(matches!(result, Err(AppError::NotFound(ref m)) if m == MSG_ACCOUNT_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_edit_username_matching_other_email_rejected() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_account(id, "bob", "bob@x.com"))));
        repo.expect_find_by_email()
            .with(eq("alice@x.com"))
            .returning(|_| Ok(Some(test_account(2, "alice", "alice@x.com"))));
        repo.expect_update().never();

        let (service, _) = service(repo);
        let changes = UpdateAccount {
            username: Some("Alice@X.com".to_string()),
            ..Default::default()
        };
        let result = service.edit(1, changes).await;

        assert!(
            matches!(result, Err(AppError::DuplicateAccount(ref m)) if m == MSG_USERNAME_MATCHES_EMAIL)
        );
    }

    #[tokio::test]
    async fn test_edit_email_matching_other_username_rejected() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_account(id, "bob", "bob@x.com"))));
        repo.expect_find_by_username()
            .with(eq("alice"))
            .returning(|_| Ok(Some(test_account(2, "alice", "alice@x.com"))));
        repo.expect_update().never();

        let (service, _) = service(repo);
        let changes = UpdateAccount {
            email: Some("alice".to_string()),
            ..Default::default()
        };
        let result = service.edit(1, changes).await;

        assert!(
            matches!(result, Err(AppError::DuplicateAccount(ref m)) if m == MSG_EMAIL_MATCHES_USERNAME)
        );
    }

    #[tokio::test]
    async fn test_edit_email_matching_other_email_rejected() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_account(id, "bob", "bob@x.com"))));
        repo.expect_find_by_username().returning(|_| Ok(None));
        repo.expect_find_by_email()
            .with(eq("alice@x.com"))
            .returning(|_| Ok(Some(test_account(2, "alice", "alice@x.com"))));
        repo.expect_update().never();

        let (service, released) = service(repo);
        let changes = UpdateAccount {
            email: Some("ALICE@x.com".to_string()),
            ..Default::default()
        };
        let result = service.edit(1, changes).await;

        assert!(matches!(result, Err(AppError::DuplicateAccount(ref m)) if m == MSG_EMAIL_IN_USE));
        assert!(released.rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_edit_own_values_are_not_collisions() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_account(id, "bob", "bob@x.com"))));
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(test_account(1, "bob", "bob@x.com"))));
        repo.expect_find_by_username()
            .returning(|_| Ok(Some(test_account(1, "bob", "bob@x.com"))));
        repo.expect_update()
            .withf(|id, changes| *id == 1 && changes.username.as_deref() == Some("bob@x.com"))
            .returning(|id, _| Ok(test_account(id, "bob@x.com", "bob@x.com")));

        let (service, _) = service(repo);
        let changes = UpdateAccount {
            username: Some("bob@x.com".to_string()),
            ..Default::default()
        };

        assert!(service.edit(1, changes).await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_rehashes_password() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_account(id, "bob", "bob@x.com"))));
        repo.expect_update()
            .withf(|_, changes| {
                changes.username.is_none()
                    && changes
                        .password_hash
                        .as_deref()
                        .is_some_and(|h| Password::from_hash(h).verify("new"))
            })
            .returning(|id, _| Ok(test_account(id, "bob", "bob@x.com")));

        let (service, _) = service(repo);
        let changes = UpdateAccount {
            password: Some("new".to_string()),
            ..Default::default()
        };

        assert!(service.edit(1, changes).await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_without_changes_skips_write() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_account(id, "bob", "bob@x.com"))));
        repo.expect_update().never();

        let (service, _) = service(repo);
        let account = service.edit(1, UpdateAccount::default()).await.unwrap();

        assert_eq!(account.username, "bob");
    }

    #[tokio::test]
    async fn test_delete_missing_rolls_back() {
        let mut repo = MockAccountRepository::new();
        repo.expect_delete()
            .with(eq(42))
            .returning(|_| Err(AppError::not_found(MSG_ACCOUNT_NOT_FOUND)));

        let (service, released) = service(repo);
        let result = service.delete(42).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(released.rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_logout_is_noop() {
        let (service, _) = service(MockAccountRepository::new());

        assert!(service.logout(1).await.is_ok());
    }
}
