// 🧾 Transaction Ledger
// Append-only record of sales and purchases. Registering a transaction moves
// the referenced book's stock; the record itself never changes afterwards.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog;
use crate::db::parse_timestamp;
use crate::error::{InventoryError, Result};

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransactionTypeRepr")]
pub enum TransactionType {
    /// Stock leaves the store, revenue enters the register
    #[serde(rename = "venta")]
    Sale,

    /// Stock enters the store, cost leaves the register
    #[serde(rename = "compra")]
    Purchase,
}

impl TransactionType {
    /// Storage code
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "SALE",
            TransactionType::Purchase => "PURCHASE",
        }
    }

    /// Numeric code accepted on input: 1 = sale, 2 = purchase
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TransactionType::Sale),
            2 => Some(TransactionType::Purchase),
            _ => None,
        }
    }

    /// Signed stock change for `quantity` units
    pub fn stock_delta(&self, quantity: i64) -> i64 {
        match self {
            TransactionType::Sale => -quantity,
            TransactionType::Purchase => quantity,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" | "venta" => Ok(TransactionType::Sale),
            "purchase" | "compra" => Ok(TransactionType::Purchase),
            other => Err(format!(
                "tipo_transaccion desconocido: {other} (use 1/venta o 2/compra)"
            )),
        }
    }
}

/// Wire shape of `tipo_transaccion`: a numeric code or a name
#[derive(Deserialize)]
#[serde(untagged)]
enum TransactionTypeRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<TransactionTypeRepr> for TransactionType {
    type Error = String;

    fn try_from(repr: TransactionTypeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            TransactionTypeRepr::Code(code) => TransactionType::from_code(code).ok_or_else(|| {
                format!("tipo_transaccion desconocido: {code} (use 1 = venta, 2 = compra)")
            }),
            TransactionTypeRepr::Name(name) => name.parse(),
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,

    #[serde(rename = "tipo_transaccion")]
    pub kind: TransactionType,

    #[serde(rename = "ISBN")]
    pub isbn: String,

    #[serde(rename = "cantidad")]
    pub quantity: i64,

    /// Sale price for sales, purchase price for purchases, at registration
    #[serde(rename = "precio_unitario")]
    pub unit_price: f64,

    pub total: f64,

    #[serde(rename = "fecha")]
    pub registered_at: DateTime<Utc>,
}

/// Input for `register_transaction`
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "tipo_transaccion")]
    pub kind: TransactionType,

    #[serde(rename = "ISBN")]
    pub isbn: String,

    #[serde(rename = "cantidad")]
    pub quantity: i64,
}

impl NewTransaction {
    pub fn new(kind: TransactionType, isbn: &str, quantity: i64) -> Self {
        Self {
            kind,
            isbn: isbn.to_string(),
            quantity,
        }
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Apply the stock change and append the record.
///
/// Run inside a SQLite transaction: the stock update and the insert must
/// land together. Sales that would leave negative stock are rejected.
pub fn register_transaction(conn: &Connection, new_tx: &NewTransaction) -> Result<Transaction> {
    if new_tx.quantity <= 0 {
        return Err(InventoryError::invalid("cantidad debe ser mayor que cero"));
    }
    if new_tx.quantity > catalog::MAX_QUANTITY {
        return Err(InventoryError::invalid(format!(
            "cantidad excede el máximo de {}",
            catalog::MAX_QUANTITY
        )));
    }

    let isbn = new_tx.isbn.trim();
    let book = catalog::get_book(conn, isbn)?;

    let remaining = book
        .quantity
        .checked_add(new_tx.kind.stock_delta(new_tx.quantity))
        .ok_or_else(|| InventoryError::invalid("cantidad fuera de rango"))?;
    if remaining < 0 {
        return Err(InventoryError::InsufficientStock {
            isbn: book.isbn,
            available: book.quantity,
            requested: new_tx.quantity,
        });
    }
    if remaining > catalog::MAX_QUANTITY {
        return Err(InventoryError::invalid(format!(
            "el stock resultante excede el máximo de {}",
            catalog::MAX_QUANTITY
        )));
    }

    let unit_price = match new_tx.kind {
        TransactionType::Sale => book.sale_price,
        TransactionType::Purchase => book.purchase_price,
    };

    let total = unit_price * new_tx.quantity as f64;
    if !total.is_finite() {
        return Err(InventoryError::invalid("total de la transacción fuera de rango"));
    }

    let tx = Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        kind: new_tx.kind,
        isbn: book.isbn,
        quantity: new_tx.quantity,
        unit_price,
        total,
        registered_at: Utc::now(),
    };

    catalog::set_quantity(conn, &tx.isbn, remaining)?;

    conn.execute(
        "INSERT INTO transactions (
            tx_uuid, kind, isbn, quantity, unit_price, total, registered_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tx.id,
            tx.kind.as_str(),
            tx.isbn,
            tx.quantity,
            tx.unit_price,
            tx.total,
            tx.registered_at.to_rfc3339(),
        ],
    )?;

    Ok(tx)
}

fn transaction_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let kind_str: String = row.get(1)?;
    let registered_at: String = row.get(6)?;

    Ok(Transaction {
        id: row.get(0)?,
        kind: kind_str.parse::<TransactionType>().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?,
        isbn: row.get(2)?,
        quantity: row.get(3)?,
        unit_price: row.get(4)?,
        total: row.get(5)?,
        registered_at: parse_timestamp(6, &registered_at)?,
    })
}

/// Whole ledger in registration order
pub fn list_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT tx_uuid, kind, isbn, quantity, unit_price, total, registered_at
         FROM transactions
         ORDER BY id ASC",
    )?;

    let transactions = stmt
        .query_map([], transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn transactions_for_book(conn: &Connection, isbn: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT tx_uuid, kind, isbn, quantity, unit_price, total, registered_at
         FROM transactions
         WHERE isbn = ?1
         ORDER BY id ASC",
    )?;

    let transactions = stmt
        .query_map([isbn], transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(transactions)
}
