// Inventory errors
// Typed failures reported by the catalog, the ledger and the store.
// The HTTP layer translates each variant into a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    /// Referenced ISBN does not exist in the catalog
    #[error("Libro no encontrado: {0}")]
    NotFound(String),

    /// ISBN already present on creation
    #[error("Ya existe un libro con ISBN {0}")]
    DuplicateKey(String),

    /// Malformed or missing field
    #[error("Datos inválidos: {0}")]
    InvalidInput(String),

    /// A sale would drive the quantity below zero
    #[error("Stock insuficiente para {isbn}: disponible {available}, solicitado {requested}")]
    InsufficientStock {
        isbn: String,
        available: i64,
        requested: i64,
    },

    #[error("Error de almacenamiento: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("El almacén quedó inconsistente tras un pánico previo")]
    Poisoned,
}

impl InventoryError {
    /// Short machine-readable code used in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::NotFound(_) => "not_found",
            InventoryError::DuplicateKey(_) => "duplicate_key",
            InventoryError::InvalidInput(_) => "invalid_input",
            InventoryError::InsufficientStock { .. } => "insufficient_stock",
            InventoryError::Storage(_) => "storage_error",
            InventoryError::Poisoned => "storage_error",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        InventoryError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = InventoryError::InsufficientStock {
            isbn: "123".to_string(),
            available: 2,
            requested: 5,
        };

        assert_eq!(err.code(), "insufficient_stock");
        assert!(err.to_string().contains("disponible 2"));
        assert!(err.to_string().contains("solicitado 5"));
    }

    #[test]
    fn test_storage_errors_convert() {
        let err: InventoryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), "storage_error");
    }
}
