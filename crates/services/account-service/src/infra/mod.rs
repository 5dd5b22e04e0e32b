//! Infrastructure layer - database, migrations and transaction scoping.

mod db;
pub mod migrations;
pub mod unit_of_work;

pub use db::Database;
pub use migrations::Migrator;
pub use unit_of_work::{finish, Persistence, TransactionScope, UnitOfWork};
