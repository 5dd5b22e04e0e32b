//! Domain layer - Core account entity and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod account;
pub mod constants;
pub mod error;
pub mod password;

pub use account::{normalize_identifier, Account, AccountChanges, RegisterAccount, UpdateAccount};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::Password;
