//! Repository layer for data access.

pub mod entities;
mod account_repository;

pub use account_repository::{AccountRepository, AccountStore};

#[cfg(test)]
pub use account_repository::MockAccountRepository;
