//! # Domain Types
//!
//! Core domain types for the Meridian sale engine.
//!
//! ## Type Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Lifecycle      SaleStatus, PosStatus (explicit state machine)         │
//! │  Documents      Sale, SaleItem, SalePayment, SaleDetail                │
//! │  Requests       NewSale, SaleLineInput, PaymentLine, SaleFilter        │
//! │  Scoping        Tenant (company + acting user)                         │
//! │  Promotions     EligiblePromotion (advisor output)                     │
//! │                                                                         │
//! │  Persistence derives (sqlx::Type / sqlx::FromRow) are feature-gated    │
//! │  so this crate stays I/O-free by default.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Tenant Scoping
// =============================================================================

/// Identifies the company and acting user for a request.
///
/// Every engine operation is scoped to a tenant; entities belonging to other
/// companies are treated as non-existent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tenant {
    pub company_id: i64,
    pub user_id: i64,
}

// =============================================================================
// Sale Status (accounting lifecycle)
// =============================================================================

/// Accounting status of a sale document.
///
/// ## Transition Table
/// ```text
/// ┌───────────┬──────────────┬──────────────────────────────────────────┐
/// │ From      │ Operation    │ Result                                   │
/// ├───────────┼──────────────┼──────────────────────────────────────────┤
/// │ (none)    │ create/hold  │ Completed / Draft                        │
/// │ Draft     │ finalize     │ Completed (same document number)         │
/// │ Draft     │ void         │ zero-total Void record, no stock effect  │
/// │ Completed │ void         │ reversing Void document, stock restored  │
/// │ Void      │ anything     │ rejected                                 │
/// └───────────┴──────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleStatus {
    /// Held sale: priced and numbered but not financially committed.
    Draft,
    /// Committed sale: stock decremented, totals final.
    Completed,
    /// Reversing document created by a void operation.
    Void,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "DRAFT",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Void => "VOID",
        }
    }

    /// Finalization is only legal from a draft.
    pub fn can_finalize(&self) -> bool {
        matches!(self, SaleStatus::Draft)
    }

    /// Voiding is legal from drafts and completed sales, never from a void
    /// document itself.
    pub fn can_void(&self) -> bool {
        matches!(self, SaleStatus::Draft | SaleStatus::Completed)
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// POS Status (register lifecycle)
// =============================================================================

/// Register-side status of a sale, orthogonal to [`SaleStatus`].
///
/// A held sale is `Draft`/`Hold`; checkout and finalize both land on
/// `Completed`/`Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PosStatus {
    /// Being assembled at the register.
    Active,
    /// Parked for later retrieval.
    Hold,
    /// Tendered and closed.
    Completed,
}

impl PosStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosStatus::Active => "ACTIVE",
            PosStatus::Hold => "HOLD",
            PosStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for PosStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Documents
// =============================================================================

/// A persisted sale header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub sale_id: i64,
    pub sale_number: String,
    pub location_id: i64,
    pub customer_id: Option<i64>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub payment_method_id: Option<i64>,
    pub status: SaleStatus,
    pub pos_status: PosStatus,
    pub is_quick_sale: bool,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    /// Set on void documents: the sale this document reverses.
    pub voided_sale_id: Option<i64>,
    pub is_deleted: bool,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub sale_item_id: i64,
    pub sale_id: i64,
    pub product_id: Option<i64>,
    /// Denormalized at capture time so receipts survive product renames.
    pub product_name: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub tax_id: Option<i64>,
    pub tax_amount: f64,
    pub line_total: f64,
    /// JSON array of serial numbers, NULL for non-serialized lines.
    pub serial_numbers: Option<String>,
    pub notes: Option<String>,
}

impl SaleItem {
    /// Decodes the JSON serial-number column. A NULL or malformed column
    /// yields an empty list.
    pub fn serials(&self) -> Vec<String> {
        self.serial_numbers
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// A payment row captured when a held sale is finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalePayment {
    pub sale_payment_id: i64,
    pub sale_id: i64,
    pub method_id: Option<i64>,
    pub amount: f64,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A sale header together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Request Types
// =============================================================================

/// One requested line of a sale.
///
/// A line normally references a catalog product; ad-hoc lines (quick-sale
/// items with no catalog entry) leave `product_id` empty and carry their own
/// name and unit price instead. Ad-hoc lines never touch stock and cannot be
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Option<i64>,
    /// Captured name for ad-hoc lines; ignored when a product is referenced.
    pub product_name: Option<String>,
    pub quantity: f64,
    /// Price override; falls back to the product's selling price when absent.
    /// Required for ad-hoc lines, which have no catalog price.
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub discount_percent: f64,
    /// Explicit line tax; falls back to the product's default tax when absent.
    pub tax_id: Option<i64>,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    pub notes: Option<String>,
}

/// A request to create (or hold) a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub location_id: i64,
    pub customer_id: Option<i64>,
    pub lines: Vec<SaleLineInput>,
    /// Header-level discount, on top of per-line percentage discounts.
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    pub payment_method_id: Option<i64>,
    pub notes: Option<String>,
    /// Client-supplied replay token. Same key + same location = same sale.
    pub idempotency_key: Option<String>,
}

/// One tender line supplied when finalizing a held sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLine {
    pub method_id: Option<i64>,
    pub amount: f64,
    pub reference: Option<String>,
}

/// A request to finalize a held sale into a completed one.
///
/// Carries the *current* cart: lines may have been edited while the sale was
/// parked, so finalization reprices from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub lines: Vec<SaleLineInput>,
    pub payments: Vec<PaymentLine>,
    #[serde(default)]
    pub discount_amount: f64,
    pub notes: Option<String>,
}

/// Listing filter for sales. All fields optional and combinable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub location_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub pos_status: Option<PosStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Matches against the document number (prefix search).
    pub number_like: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Promotions
// =============================================================================

/// A promotion the advisor judged applicable to the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligiblePromotion {
    pub promotion_id: i64,
    pub discount_amount: f64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!(SaleStatus::Draft.as_str(), "DRAFT");
        assert_eq!(SaleStatus::Completed.as_str(), "COMPLETED");
        assert_eq!(SaleStatus::Void.as_str(), "VOID");
        assert_eq!(PosStatus::Hold.as_str(), "HOLD");
    }

    #[test]
    fn test_transition_guards() {
        assert!(SaleStatus::Draft.can_finalize());
        assert!(!SaleStatus::Completed.can_finalize());
        assert!(!SaleStatus::Void.can_finalize());

        assert!(SaleStatus::Draft.can_void());
        assert!(SaleStatus::Completed.can_void());
        assert!(!SaleStatus::Void.can_void());
    }

    #[test]
    fn test_serials_decode() {
        let item = SaleItem {
            sale_item_id: 1,
            sale_id: 1,
            product_id: Some(1),
            product_name: None,
            quantity: 2.0,
            unit_price: 10.0,
            discount_percent: 0.0,
            discount_amount: 0.0,
            tax_id: None,
            tax_amount: 0.0,
            line_total: 20.0,
            serial_numbers: Some(r#"["SN-1","SN-2"]"#.to_string()),
            notes: None,
        };
        assert_eq!(item.serials(), vec!["SN-1".to_string(), "SN-2".to_string()]);

        let bare = SaleItem {
            serial_numbers: None,
            ..item
        };
        assert!(bare.serials().is_empty());
    }
}
