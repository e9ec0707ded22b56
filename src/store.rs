// 🗄️ Store
// Owns the SQLite connection behind a single lock. Every catalog and ledger
// operation runs under that lock, and every mutation commits together with
// its audit event.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cash_register::{self, CashRegisterState};
use crate::catalog::{self, Book, BookUpdate, NewBook};
use crate::db::{self, insert_event, Event};
use crate::error::{InventoryError, Result};
use crate::ledger::{self, NewTransaction, Transaction};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    opening_balance: f64,
}

impl Store {
    /// Wrap an open connection, creating the schema if needed
    pub fn new(conn: Connection, opening_balance: f64) -> Result<Self> {
        db::setup_database(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            opening_balance,
        })
    }

    pub fn open(path: &Path, opening_balance: f64) -> Result<Self> {
        Self::new(Connection::open(path)?, opening_balance)
    }

    pub fn open_in_memory(opening_balance: f64) -> Result<Self> {
        Self::new(Connection::open_in_memory()?, opening_balance)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| InventoryError::Poisoned)
    }

    /// Run `f` with the raw connection (seeding, reports)
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> Result<T> {
        let conn = self.lock()?;
        Ok(f(&conn))
    }

    // ========================================================================
    // CATALOG
    // ========================================================================

    pub fn list_books(&self) -> Result<Vec<Book>> {
        let conn = self.lock()?;
        catalog::list_books(&conn)
    }

    pub fn get_book(&self, isbn: &str) -> Result<Book> {
        let conn = self.lock()?;
        catalog::get_book(&conn, isbn)
    }

    pub fn add_book(&self, new_book: NewBook, actor: &str) -> Result<Book> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let book = catalog::add_book(&tx, new_book)?;
        insert_event(
            &tx,
            &Event::new(
                "book_added",
                "book",
                &book.isbn,
                book_data(&book)?,
                actor,
            ),
        )?;
        tx.commit()?;

        tracing::info!(isbn = %book.isbn, actor, "book added");
        Ok(book)
    }

    pub fn update_book(&self, isbn: &str, update: &BookUpdate, actor: &str) -> Result<Book> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let book = catalog::update_book(&tx, isbn, update)?;
        insert_event(
            &tx,
            &Event::new(
                "book_updated",
                "book",
                &book.isbn,
                book_data(&book)?,
                actor,
            ),
        )?;
        tx.commit()?;

        tracing::info!(isbn = %book.isbn, actor, "book updated");
        Ok(book)
    }

    pub fn remove_book(&self, isbn: &str, actor: &str) -> Result<Book> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let book = catalog::remove_book(&tx, isbn)?;
        insert_event(
            &tx,
            &Event::new(
                "book_removed",
                "book",
                &book.isbn,
                serde_json::json!({ "cantidad_actual": book.quantity }),
                actor,
            ),
        )?;
        tx.commit()?;

        tracing::info!(isbn = %book.isbn, actor, "book removed");
        Ok(book)
    }

    // ========================================================================
    // LEDGER
    // ========================================================================

    pub fn register_transaction(
        &self,
        new_tx: &NewTransaction,
        actor: &str,
    ) -> Result<Transaction> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let record = match ledger::register_transaction(&tx, new_tx) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    isbn = %new_tx.isbn,
                    kind = %new_tx.kind,
                    error = %e,
                    "transaction rejected"
                );
                return Err(e);
            }
        };
        insert_event(
            &tx,
            &Event::new(
                "transaction_registered",
                "book",
                &record.isbn,
                serde_json::json!({
                    "transaction_id": record.id,
                    "tipo_transaccion": record.kind,
                    "cantidad": record.quantity,
                    "total": record.total,
                }),
                actor,
            ),
        )?;
        tx.commit()?;

        tracing::info!(
            id = %record.id,
            isbn = %record.isbn,
            kind = %record.kind,
            quantity = record.quantity,
            actor,
            "transaction registered"
        );
        Ok(record)
    }

    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        ledger::list_transactions(&conn)
    }

    pub fn transactions_for_book(&self, isbn: &str) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        ledger::transactions_for_book(&conn, isbn)
    }

    // ========================================================================
    // CASH REGISTER
    // ========================================================================

    pub fn cash_register(&self) -> Result<CashRegisterState> {
        let conn = self.lock()?;
        cash_register::current_state(&conn, self.opening_balance)
    }

    pub fn history(&self, isbn: &str) -> Result<Vec<Event>> {
        let conn = self.lock()?;
        db::get_events_for_entity(&conn, "book", isbn)
    }
}

fn book_data(book: &Book) -> Result<serde_json::Value> {
    serde_json::to_value(book).map_err(|e| InventoryError::invalid(format!("event data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionType;

    fn store() -> Store {
        Store::open_in_memory(0.0).unwrap()
    }

    fn sample_book() -> NewBook {
        NewBook {
            isbn: "1234567890".to_string(),
            title: "T".to_string(),
            purchase_price: 100.0,
            sale_price: 150.0,
            quantity: 10,
        }
    }

    #[test]
    fn test_book_lifecycle_end_to_end() {
        let store = store();

        store.add_book(sample_book(), "camila").unwrap();

        let update = BookUpdate {
            title: Some("T2".to_string()),
            quantity: Some(15),
            ..Default::default()
        };
        let updated = store.update_book("1234567890", &update, "camila").unwrap();
        assert_eq!(updated.quantity, 15);
        assert_eq!(updated.title, "T2");

        store.remove_book("1234567890", "camila").unwrap();
        assert!(store
            .list_books()
            .unwrap()
            .iter()
            .all(|b| b.isbn != "1234567890"));

        let history: Vec<String> = store
            .history("1234567890")
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(history, vec!["book_added", "book_updated", "book_removed"]);
    }

    #[test]
    fn test_rejected_transaction_leaves_no_trace() {
        let store = store();
        store.add_book(sample_book(), "camila").unwrap();

        let err = store
            .register_transaction(
                &NewTransaction::new(TransactionType::Sale, "1234567890", 11),
                "camila",
            )
            .unwrap_err();

        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert_eq!(store.get_book("1234567890").unwrap().quantity, 10);
        assert!(store.list_transactions().unwrap().is_empty());
        assert_eq!(store.history("1234567890").unwrap().len(), 1);
    }

    #[test]
    fn test_sale_updates_stock_ledger_and_register() {
        let store = store();
        store.add_book(sample_book(), "camila").unwrap();

        let record = store
            .register_transaction(
                &NewTransaction::new(TransactionType::Sale, "1234567890", 1),
                "camila",
            )
            .unwrap();

        assert_eq!(store.get_book("1234567890").unwrap().quantity, 9);
        assert_eq!(store.list_transactions().unwrap(), vec![record]);
        assert_eq!(store.cash_register().unwrap().saldo, 150.0);
    }

    #[test]
    fn test_concurrent_sales_do_not_lose_updates() {
        let store = store();
        let mut book = sample_book();
        book.quantity = 100;
        store.add_book(book, "camila").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store
                            .register_transaction(
                                &NewTransaction::new(TransactionType::Sale, "1234567890", 1),
                                "camila",
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_book("1234567890").unwrap().quantity, 60);
        assert_eq!(store.list_transactions().unwrap().len(), 40);
    }
}
