// 🌱 Seed catalog
// Load books from CSV and insert the ones the catalog does not have yet.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::io::Read;

use crate::catalog::{self, NewBook};
use crate::db::{insert_event, Event};
use crate::error::InventoryError;

/// Catalog shipped with the binaries; loaded on first start
const DEFAULT_CATALOG: &str = include_str!("../data/libros.csv");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Parse `ISBN,titulo,precio_compra,precio_venta,cantidad_actual` rows
pub fn load_books_csv<R: Read>(reader: R) -> Result<Vec<NewBook>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut books = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header row and 1-based lines
        let book: NewBook =
            result.with_context(|| format!("Failed to deserialize book at line {}", line + 2))?;
        books.push(book);
    }

    Ok(books)
}

pub fn default_catalog() -> Result<Vec<NewBook>> {
    load_books_csv(DEFAULT_CATALOG.as_bytes()).context("Built-in catalog is malformed")
}

/// Insert books, skipping ISBNs already present. All-or-nothing: a bad row
/// rolls back every book seeded before it.
pub fn seed_books(conn: &Connection, books: &[NewBook]) -> Result<SeedReport> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start seed transaction")?;
    let mut report = SeedReport::default();

    for new_book in books {
        match catalog::add_book(&tx, new_book.clone()) {
            Ok(book) => {
                report.inserted += 1;

                let event = Event::new(
                    "book_seeded",
                    "book",
                    &book.isbn,
                    serde_json::json!({
                        "titulo": book.title,
                        "cantidad_actual": book.quantity,
                    }),
                    "seed",
                );
                insert_event(&tx, &event)?;
            }
            Err(InventoryError::DuplicateKey(_)) => {
                report.skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to seed book {}", new_book.isbn))
            }
        }
    }

    tx.commit().context("Failed to commit seed transaction")?;

    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "catalog seeded"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_events_for_entity, setup_database};

    #[test]
    fn test_default_catalog_contains_reference_book() {
        let books = default_catalog().unwrap();
        assert!(books.iter().any(|b| b.isbn == "9788420471839"));
    }

    #[test]
    fn test_seed_twice_skips_existing() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let books = default_catalog().unwrap();

        let first = seed_books(&conn, &books).unwrap();
        let second = seed_books(&conn, &books).unwrap();

        assert_eq!(first.inserted, books.len());
        assert_eq!(first.skipped, 0);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, books.len());
        assert_eq!(catalog::count_books(&conn).unwrap(), books.len() as i64);

        let events = get_events_for_entity(&conn, "book", "9788420471839").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "book_seeded");
    }

    #[test]
    fn test_invalid_row_aborts_seed() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let csv = "ISBN,titulo,precio_compra,precio_venta,cantidad_actual\n\
                   110,Libro bueno,10,15,1\n\
                   111,Libro,10,-5,1\n";
        let books = load_books_csv(csv.as_bytes()).unwrap();

        assert!(seed_books(&conn, &books).is_err());
        assert_eq!(catalog::count_books(&conn).unwrap(), 0);
        assert!(get_events_for_entity(&conn, "book", "110").unwrap().is_empty());

        // A later seed with the fixed file starts from a clean catalog
        let fixed = load_books_csv(
            "ISBN,titulo,precio_compra,precio_venta,cantidad_actual\n110,Libro bueno,10,15,1\n"
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(seed_books(&conn, &fixed).unwrap().inserted, 1);
    }

    #[test]
    fn test_malformed_csv_reports_line() {
        let csv = "ISBN,titulo,precio_compra,precio_venta,cantidad_actual\n111,Libro,diez,5,1\n";
        let err = load_books_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
