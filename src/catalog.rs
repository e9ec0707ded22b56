// 📚 Book Catalog
// Book records keyed by ISBN. The catalog owns quantities; the ledger only
// changes them through `set_quantity`.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

const MAX_ISBN_LEN: usize = 32;

/// Upper bound for stock levels and transaction quantities
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Upper bound for unit prices
pub const MAX_PRICE: f64 = 1e12;

// ============================================================================
// BOOK
// ============================================================================

/// A catalog record as stored and as served on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "ISBN")]
    pub isbn: String,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "precio_compra")]
    pub purchase_price: f64,

    #[serde(rename = "precio_venta")]
    pub sale_price: f64,

    #[serde(rename = "cantidad_actual")]
    pub quantity: i64,
}

/// Input for `add_book`: every field is required
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    #[serde(rename = "ISBN")]
    pub isbn: String,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "precio_compra")]
    pub purchase_price: f64,

    #[serde(rename = "precio_venta")]
    pub sale_price: f64,

    #[serde(rename = "cantidad_actual", default)]
    pub quantity: i64,
}

impl NewBook {
    /// Validate and normalize into a storable record
    pub fn validate(self) -> Result<Book> {
        let isbn = self.isbn.trim().to_string();
        validate_isbn(&isbn)?;

        let book = Book {
            isbn,
            title: self.title.trim().to_string(),
            purchase_price: self.purchase_price,
            sale_price: self.sale_price,
            quantity: self.quantity,
        };
        validate_fields(&book)?;
        Ok(book)
    }
}

/// Input for `update_book`: absent fields keep their stored value.
/// The ISBN is the key and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    #[serde(rename = "titulo")]
    pub title: Option<String>,

    #[serde(rename = "precio_compra")]
    pub purchase_price: Option<f64>,

    #[serde(rename = "precio_venta")]
    pub sale_price: Option<f64>,

    #[serde(rename = "cantidad_actual")]
    pub quantity: Option<i64>,
}

impl BookUpdate {
    /// Merge the provided fields over an existing record
    pub fn apply_to(&self, book: &Book) -> Result<Book> {
        let merged = Book {
            isbn: book.isbn.clone(),
            title: self
                .title
                .as_ref()
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| book.title.clone()),
            purchase_price: self.purchase_price.unwrap_or(book.purchase_price),
            sale_price: self.sale_price.unwrap_or(book.sale_price),
            quantity: self.quantity.unwrap_or(book.quantity),
        };
        validate_fields(&merged)?;
        Ok(merged)
    }
}

fn validate_isbn(isbn: &str) -> Result<()> {
    if isbn.is_empty() {
        return Err(InventoryError::invalid("ISBN es obligatorio"));
    }
    if isbn.len() > MAX_ISBN_LEN {
        return Err(InventoryError::invalid(format!(
            "ISBN excede {MAX_ISBN_LEN} caracteres"
        )));
    }
    if !isbn.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(InventoryError::invalid(
            "ISBN solo admite dígitos, letras y guiones",
        ));
    }
    Ok(())
}

fn validate_fields(book: &Book) -> Result<()> {
    if book.title.is_empty() {
        return Err(InventoryError::invalid("titulo es obligatorio"));
    }
    for (field, price) in [
        ("precio_compra", book.purchase_price),
        ("precio_venta", book.sale_price),
    ] {
        if !price.is_finite() || price < 0.0 {
            return Err(InventoryError::invalid(format!(
                "{field} debe ser un número no negativo"
            )));
        }
        if price > MAX_PRICE {
            return Err(InventoryError::invalid(format!(
                "{field} excede el máximo de {MAX_PRICE}"
            )));
        }
    }
    validate_quantity(book.quantity)
}

fn validate_quantity(quantity: i64) -> Result<()> {
    if quantity < 0 {
        return Err(InventoryError::invalid(
            "cantidad_actual no puede ser negativa",
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(InventoryError::invalid(format!(
            "cantidad_actual excede el máximo de {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

fn book_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get(0)?,
        title: row.get(1)?,
        purchase_price: row.get(2)?,
        sale_price: row.get(3)?,
        quantity: row.get(4)?,
    })
}

/// All books ordered by ISBN
pub fn list_books(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(
        "SELECT isbn, title, purchase_price, sale_price, quantity
         FROM books
         ORDER BY isbn",
    )?;

    let books = stmt
        .query_map([], book_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(books)
}

pub fn find_book(conn: &Connection, isbn: &str) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            "SELECT isbn, title, purchase_price, sale_price, quantity
             FROM books
             WHERE isbn = ?1",
            [isbn],
            book_from_row,
        )
        .optional()?;

    Ok(book)
}

pub fn get_book(conn: &Connection, isbn: &str) -> Result<Book> {
    find_book(conn, isbn)?.ok_or_else(|| InventoryError::NotFound(isbn.to_string()))
}

pub fn count_books(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// MUTATIONS
// ============================================================================

/// Insert a new book; DuplicateKey if the ISBN already exists
pub fn add_book(conn: &Connection, new_book: NewBook) -> Result<Book> {
    let book = new_book.validate()?;

    let result = conn.execute(
        "INSERT INTO books (isbn, title, purchase_price, sale_price, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            book.isbn,
            book.title,
            book.purchase_price,
            book.sale_price,
            book.quantity,
        ],
    );

    match result {
        Ok(_) => Ok(book),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Err(InventoryError::DuplicateKey(book.isbn))
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge `update` into the stored record and return the result
pub fn update_book(conn: &Connection, isbn: &str, update: &BookUpdate) -> Result<Book> {
    let current = get_book(conn, isbn)?;
    let merged = update.apply_to(&current)?;

    conn.execute(
        "UPDATE books
         SET title = ?1, purchase_price = ?2, sale_price = ?3, quantity = ?4,
             updated_at = CURRENT_TIMESTAMP
         WHERE isbn = ?5",
        params![
            merged.title,
            merged.purchase_price,
            merged.sale_price,
            merged.quantity,
            merged.isbn,
        ],
    )?;

    Ok(merged)
}

pub fn remove_book(conn: &Connection, isbn: &str) -> Result<Book> {
    let book = get_book(conn, isbn)?;
    conn.execute("DELETE FROM books WHERE isbn = ?1", [isbn])?;
    Ok(book)
}

/// Overwrite the stock level; callers own the arithmetic
pub(crate) fn set_quantity(conn: &Connection, isbn: &str, quantity: i64) -> Result<()> {
    validate_quantity(quantity)?;

    let changed = conn.execute(
        "UPDATE books SET quantity = ?1, updated_at = CURRENT_TIMESTAMP WHERE isbn = ?2",
        params![quantity, isbn],
    )?;

    if changed == 0 {
        return Err(InventoryError::NotFound(isbn.to_string()));
    }
    Ok(())
}
