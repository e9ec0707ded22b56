use anyhow::{bail, Context, Result};
use std::env;
use std::fs::File;
use std::path::Path;

use bookstore_inventory::{load_books_csv, logging, seed_books, Config, Store};

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let Some(csv_path) = args.get(2) else {
                bail!("usage: bookstore import <libros.csv>");
            };
            run_import(&config, Path::new(csv_path))
        }
        Some("report") => run_report(&config),
        Some("history") => {
            let Some(isbn) = args.get(2) else {
                bail!("usage: bookstore history <ISBN>");
            };
            run_history(&config, isbn)
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("bookstore {}", bookstore_inventory::VERSION);
    println!();
    println!("USAGE:");
    println!("    bookstore import <libros.csv>   Seed the catalog from a CSV file");
    println!("    bookstore report                Print catalog, ledger and cash register");
    println!("    bookstore history <ISBN>        Print the audit trail of a book");
    println!();
    println!("Database: $BOOKSTORE_DB (default bookstore.db)");
}

fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.db_path, config.opening_balance)
        .with_context(|| format!("Failed to open database {:?}", config.db_path))
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    println!("📂 Loading {:?}...", csv_path);
    let file = File::open(csv_path).with_context(|| format!("Failed to open {:?}", csv_path))?;
    let books = load_books_csv(file)?;
    println!("✓ Loaded {} books from CSV", books.len());

    let store = open_store(config)?;
    let report = store.with_connection(|conn| seed_books(conn, &books))??;

    println!("✓ Inserted: {} books", report.inserted);
    println!("✓ Skipped existing ISBNs: {}", report.skipped);

    Ok(())
}

fn run_report(config: &Config) -> Result<()> {
    let store = open_store(config)?;

    let books = store.list_books()?;
    println!("📚 Catalog ({} books)", books.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for book in &books {
        println!(
            "{:<15} {:<35} {:>5} u  compra {:>10.2}  venta {:>10.2}",
            book.isbn, book.title, book.quantity, book.purchase_price, book.sale_price
        );
    }

    let ledger = store.list_transactions()?;
    println!("\n🧾 Ledger: {} transactions", ledger.len());

    let state = store.cash_register()?;
    println!("\n💵 Cash register");
    println!("   Ventas:  {:>12.2} ({} u)", state.total_ventas, state.unidades_vendidas);
    println!("   Compras: {:>12.2} ({} u)", state.total_compras, state.unidades_compradas);
    println!("   Saldo:   {:>12.2}", state.saldo);

    Ok(())
}

fn run_history(config: &Config, isbn: &str) -> Result<()> {
    let store = open_store(config)?;
    let events = store.history(isbn)?;

    if events.is_empty() {
        println!("No events recorded for {}", isbn);
        return Ok(());
    }

    for event in events {
        println!(
            "{}  {:<24} {:<10} {}",
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.actor,
            event.data
        );
    }

    Ok(())
}
