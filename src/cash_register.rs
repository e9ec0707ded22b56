// 💵 Cash Register State
// Read-only aggregate recomputed from the ledger on every query.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashRegisterState {
    /// opening balance + sales revenue - purchase cost
    pub saldo: f64,
    pub total_ventas: f64,
    pub total_compras: f64,
    pub unidades_vendidas: i64,
    pub unidades_compradas: i64,
    pub numero_transacciones: i64,
}

/// Aggregate the whole ledger, starting from `opening_balance`.
/// Money sums use TOTAL (floating point, never overflows); unit sums stay
/// exact because each row is bounded by `catalog::MAX_QUANTITY`.
pub fn current_state(conn: &Connection, opening_balance: f64) -> Result<CashRegisterState> {
    let (total_ventas, total_compras, unidades_vendidas, unidades_compradas, numero_transacciones) =
        conn.query_row(
            "SELECT
                TOTAL(CASE WHEN kind = 'SALE' THEN total ELSE 0 END),
                TOTAL(CASE WHEN kind = 'PURCHASE' THEN total ELSE 0 END),
                COALESCE(SUM(CASE WHEN kind = 'SALE' THEN quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'PURCHASE' THEN quantity ELSE 0 END), 0),
                COUNT(*)
             FROM transactions",
            [],
            |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

    Ok(CashRegisterState {
        saldo: round_cents(opening_balance + total_ventas - total_compras),
        total_ventas: round_cents(total_ventas),
        total_compras: round_cents(total_compras),
        unidades_vendidas,
        unidades_compradas,
        numero_transacciones,
    })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{add_book, remove_book, NewBook, MAX_PRICE};
    use crate::db::setup_database;
    use crate::ledger::{register_transaction, NewTransaction, TransactionType};

    fn conn_with_book() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        add_book(
            &conn,
            NewBook {
                isbn: "9788420471839".to_string(),
                title: "Cien años de soledad".to_string(),
                purchase_price: 80.0,
                sale_price: 120.5,
                quantity: 10,
            },
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_empty_ledger_is_opening_balance() {
        let conn = conn_with_book();
        let state = current_state(&conn, 500.0).unwrap();

        assert_eq!(state.saldo, 500.0);
        assert_eq!(state.numero_transacciones, 0);
        assert_eq!(state.total_ventas, 0.0);
    }

    #[test]
    fn test_one_sale_moves_balance_by_sale_price() {
        let conn = conn_with_book();
        let before = current_state(&conn, 0.0).unwrap();

        register_transaction(
            &conn,
            &NewTransaction::new(TransactionType::Sale, "9788420471839", 1),
        )
        .unwrap();

        let after = current_state(&conn, 0.0).unwrap();
        assert_eq!(after.saldo - before.saldo, 120.5);
        assert_eq!(after.unidades_vendidas, 1);
    }

    #[test]
    fn test_net_effect_of_sales_and_purchases() {
        let conn = conn_with_book();

        let sale = NewTransaction::new(TransactionType::Sale, "9788420471839", 2);
        let purchase = NewTransaction::new(TransactionType::Purchase, "9788420471839", 3);
        register_transaction(&conn, &sale).unwrap();
        register_transaction(&conn, &purchase).unwrap();

        let state = current_state(&conn, 100.0).unwrap();
        assert_eq!(state.total_ventas, 241.0);
        assert_eq!(state.total_compras, 240.0);
        assert_eq!(state.saldo, 101.0);
        assert_eq!(state.unidades_vendidas, 2);
        assert_eq!(state.unidades_compradas, 3);
        assert_eq!(state.numero_transacciones, 2);
    }

    #[test]
    fn test_removed_book_still_counts_toward_register() {
        let conn = conn_with_book();

        let sale = NewTransaction::new(TransactionType::Sale, "9788420471839", 1);
        register_transaction(&conn, &sale).unwrap();
        let before = current_state(&conn, 0.0).unwrap();

        remove_book(&conn, "9788420471839").unwrap();

        let after = current_state(&conn, 0.0).unwrap();
        assert_eq!(after, before);
        assert_eq!(after.saldo, 120.5);
    }

    #[test]
    fn test_large_ledger_stays_queryable() {
        let conn = conn_with_book();
        add_book(
            &conn,
            NewBook {
                isbn: "9788437604947".to_string(),
                title: "Don Quijote de la Mancha".to_string(),
                purchase_price: MAX_PRICE,
                sale_price: MAX_PRICE,
                quantity: 0,
            },
        )
        .unwrap();

        for isbn in ["9788420471839", "9788437604947"] {
            let purchase = NewTransaction::new(TransactionType::Purchase, isbn, 1_000_000_000);
            register_transaction(&conn, &purchase).unwrap();
        }

        let state = current_state(&conn, 0.0).unwrap();
        assert_eq!(state.unidades_compradas, 2_000_000_000);
        assert!(state.total_compras.is_finite());
        assert!(state.saldo.is_finite());
        assert!(state.saldo < 0.0);
    }
}
