//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                      │
//! │  └── CoreError        - Business rule violations, classified by        │
//! │                         ErrorKind (NotFound / Validation / Conflict)   │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | DbError, returned by the engine    │
//! │                                                                         │
//! │  Flow: CoreError ──► EngineError ──► caller (API layer)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of a [`CoreError`], used by callers to pick a
/// transport-level response (404 / 400 / 409) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist in the tenant's scope.
    NotFound,
    /// The request itself is malformed or violates a business rule.
    Validation,
    /// The request is well-formed but conflicts with current document state.
    Conflict,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// Any of them raised mid-transaction aborts the whole unit of work.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Customer id does not exist for the company (or is soft-deleted).
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    /// Location id does not exist for the company.
    #[error("Location not found: {0}")]
    LocationNotFound(i64),

    /// Product id does not exist for the company (or is soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Tax id referenced by a line or product does not exist.
    #[error("Tax not found: {0}")]
    TaxNotFound(i64),

    /// Sale id does not exist in the (company, location) scope.
    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// Sale number does not exist in the (company, location) scope.
    #[error("Sale not found: {0}")]
    SaleNumberNotFound(String),

    /// A sale must carry at least one line item.
    #[error("Sale must contain at least one item")]
    EmptyCart,

    /// More line items than a single sale may carry.
    #[error("Sale cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity must be strictly positive.
    #[error("Invalid line quantity: {quantity}")]
    InvalidQuantity {
        product_id: Option<i64>,
        quantity: f64,
    },

    /// Line unit price must be non-negative.
    #[error("Invalid line unit price: {price}")]
    InvalidUnitPrice {
        product_id: Option<i64>,
        price: f64,
    },

    /// Discount percent must be within [0, 100].
    #[error("Invalid discount percent: {percent}")]
    InvalidDiscountPercent { percent: f64 },

    /// Header-level discount amount must be non-negative.
    #[error("Invalid discount amount: {amount}")]
    InvalidDiscountAmount { amount: f64 },

    /// Paid amount must lie within [0, total].
    ///
    /// ## When This Occurs
    /// - Negative tender
    /// - Overpayment (change is computed by the caller, never stored)
    #[error("Paid amount {paid} must be between 0 and total {total}")]
    InvalidPaidAmount { paid: f64, total: f64 },

    /// Serialized products must be sold in whole units.
    #[error("Serialized product {product_id} requires a whole-number quantity, got {quantity}")]
    FractionalSerializedQuantity { product_id: i64, quantity: f64 },

    /// Serial count must equal the line quantity for serialized products.
    #[error("Product {product_id} requires {expected} serial numbers, got {got}")]
    SerialCountMismatch {
        product_id: i64,
        expected: i64,
        got: usize,
    },

    /// Serial numbers on a line must be non-empty after trimming.
    #[error("Product {product_id} has an empty serial number")]
    EmptySerialNumber { product_id: i64 },

    /// Serial numbers on a line must be pairwise distinct.
    #[error("Product {product_id} has duplicate serial number '{serial}'")]
    DuplicateSerialNumber { product_id: i64, serial: String },

    /// Serial numbers may only appear on serialized product lines.
    #[error("Serial numbers supplied for a non-serialized line")]
    UnexpectedSerialNumbers { product_id: Option<i64> },

    /// Ad-hoc lines have no catalog entry to price from.
    #[error("A line without a product must supply a unit price")]
    MissingUnitPrice,

    /// On-hand stock cannot cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: on hand = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Widget", available: 3.0, requested: 5.0 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Widget in stock"
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        product_name: String,
        available: f64,
        requested: f64,
    },

    /// The sale's lifecycle state does not permit the requested operation.
    ///
    /// ## When This Occurs
    /// - Finalizing a sale that is not a draft
    /// - Resuming a completed sale
    /// - Voiding a void document
    #[error("Sale {sale_id} is {status}, cannot {operation}")]
    InvalidTransition {
        sale_id: i64,
        status: String,
        operation: &'static str,
    },

    /// A reversing document already exists for this sale.
    #[error("Sale {sale_id} has already been voided")]
    AlreadyVoided { sale_id: i64 },
}

impl CoreError {
    /// Maps every variant to its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::CustomerNotFound(_)
            | CoreError::LocationNotFound(_)
            | CoreError::ProductNotFound(_)
            | CoreError::TaxNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::SaleNumberNotFound(_) => ErrorKind::NotFound,

            CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::InvalidQuantity { .. }
            | CoreError::InvalidUnitPrice { .. }
            | CoreError::InvalidDiscountPercent { .. }
            | CoreError::InvalidDiscountAmount { .. }
            | CoreError::InvalidPaidAmount { .. }
            | CoreError::FractionalSerializedQuantity { .. }
            | CoreError::SerialCountMismatch { .. }
            | CoreError::EmptySerialNumber { .. }
            | CoreError::DuplicateSerialNumber { .. }
            | CoreError::UnexpectedSerialNumbers { .. }
            | CoreError::MissingUnitPrice => ErrorKind::Validation,

            CoreError::InsufficientStock { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::AlreadyVoided { .. } => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            product_name: "Widget".to_string(),
            available: 3.0,
            requested: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Widget: available 3, requested 5"
        );

        let err = CoreError::InvalidPaidAmount {
            paid: -1.0,
            total: 20.0,
        };
        assert_eq!(err.to_string(), "Paid amount -1 must be between 0 and total 20");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(CoreError::SaleNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::EmptyCart.kind(), ErrorKind::Validation);
        assert_eq!(
            CoreError::AlreadyVoided { sale_id: 1 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CoreError::InsufficientStock {
                product_id: 1,
                product_name: "X".to_string(),
                available: 0.0,
                requested: 1.0,
            }
            .kind(),
            ErrorKind::Conflict
        );
    }
}
