// Bookstore Inventory - Core Library
// Exposes all modules for use in the CLI, the API server and tests

pub mod error;
pub mod db;
pub mod catalog;
pub mod ledger;
pub mod cash_register;
pub mod store;
pub mod seed;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{InventoryError, Result};
pub use db::{setup_database, insert_event, get_events_for_entity, Event};
pub use catalog::{Book, BookUpdate, NewBook};
pub use ledger::{NewTransaction, Transaction, TransactionType};
pub use cash_register::CashRegisterState;
pub use store::Store;
pub use seed::{default_catalog, load_books_csv, seed_books, SeedReport};
pub use config::{Config, Credentials};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
