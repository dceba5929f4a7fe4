//! # Validation Module
//!
//! Business rule validation for sale requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (API layer)                                           │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Immediate request feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - Business rule validation                       │
//! │  ├── Cart shape (non-empty, bounded)                                   │
//! │  ├── Line numerics (quantity, price, discount)                         │
//! │  └── Serial number rules                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / FK constraints                                         │
//! │  └── Unique idempotency index                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::totals::MONEY_EPSILON;
use crate::types::SaleLineInput;
use crate::MAX_SALE_LINES;

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates the overall cart shape.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_SALE_LINES`] lines
pub fn validate_cart(lines: &[SaleLineInput]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    if lines.len() > MAX_SALE_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_SALE_LINES,
        });
    }
    Ok(())
}

/// Validates the numeric fields of one line.
///
/// ## Rules
/// - Quantity strictly positive
/// - Unit price (when supplied) non-negative; zero is allowed for free items
/// - Discount percent within [0, 100]
/// - Ad-hoc lines (no product reference) must supply a unit price and may
///   not carry serial numbers
pub fn validate_line(line: &SaleLineInput) -> CoreResult<()> {
    if line.quantity <= MONEY_EPSILON {
        return Err(CoreError::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity,
        });
    }

    if let Some(price) = line.unit_price {
        if price < -MONEY_EPSILON {
            return Err(CoreError::InvalidUnitPrice {
                product_id: line.product_id,
                price,
            });
        }
    }

    if line.discount_percent < -MONEY_EPSILON || line.discount_percent > 100.0 + MONEY_EPSILON {
        return Err(CoreError::InvalidDiscountPercent {
            percent: line.discount_percent,
        });
    }

    if line.product_id.is_none() {
        if line.unit_price.is_none() {
            return Err(CoreError::MissingUnitPrice);
        }
        if !line.serial_numbers.is_empty() {
            return Err(CoreError::UnexpectedSerialNumbers { product_id: None });
        }
    }

    Ok(())
}

/// Validates the header-level discount amount.
pub fn validate_header_discount(amount: f64) -> CoreResult<()> {
    if amount < -MONEY_EPSILON {
        return Err(CoreError::InvalidDiscountAmount { amount });
    }
    Ok(())
}

// =============================================================================
// Serial Number Validators
// =============================================================================

/// Validates serial numbers on a line against the product's serialization
/// flag.
///
/// ## Rules for serialized products
/// - Quantity must be a whole number
/// - Serial count must equal the quantity
/// - Each serial must be non-empty after trimming
/// - Serials must be pairwise distinct
///
/// ## Rules for non-serialized products
/// - No serial numbers may be supplied
pub fn validate_serial_numbers(
    product_id: i64,
    is_serialized: bool,
    quantity: f64,
    serials: &[String],
) -> CoreResult<()> {
    if !is_serialized {
        if !serials.is_empty() {
            return Err(CoreError::UnexpectedSerialNumbers {
                product_id: Some(product_id),
            });
        }
        return Ok(());
    }

    if (quantity - quantity.round()).abs() > MONEY_EPSILON {
        return Err(CoreError::FractionalSerializedQuantity {
            product_id,
            quantity,
        });
    }

    let expected = quantity.round() as i64;
    if serials.len() as i64 != expected {
        return Err(CoreError::SerialCountMismatch {
            product_id,
            expected,
            got: serials.len(),
        });
    }

    let mut seen = HashSet::with_capacity(serials.len());
    for serial in serials {
        let trimmed = serial.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptySerialNumber { product_id });
        }
        if !seen.insert(trimmed) {
            return Err(CoreError::DuplicateSerialNumber {
                product_id,
                serial: trimmed.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: f64) -> SaleLineInput {
        SaleLineInput {
            product_id: Some(product_id),
            product_name: None,
            quantity,
            unit_price: Some(10.0),
            discount_percent: 0.0,
            tax_id: None,
            serial_numbers: Vec::new(),
            notes: None,
        }
    }

    fn ad_hoc(quantity: f64) -> SaleLineInput {
        SaleLineInput {
            product_id: None,
            product_name: Some("Delivery fee".to_string()),
            quantity,
            unit_price: Some(5.0),
            discount_percent: 0.0,
            tax_id: None,
            serial_numbers: Vec::new(),
            notes: None,
        }
    }

    #[test]
    fn test_validate_cart() {
        assert!(matches!(validate_cart(&[]), Err(CoreError::EmptyCart)));
        assert!(validate_cart(&[line(1, 1.0)]).is_ok());

        let big: Vec<_> = (0..=MAX_SALE_LINES as i64).map(|i| line(i, 1.0)).collect();
        assert!(matches!(
            validate_cart(&big),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_line_quantity() {
        assert!(validate_line(&line(1, 1.0)).is_ok());
        assert!(validate_line(&line(1, 0.5)).is_ok());
        assert!(validate_line(&line(1, 0.0)).is_err());
        assert!(validate_line(&line(1, -2.0)).is_err());
    }

    #[test]
    fn test_validate_line_price_and_discount() {
        let mut l = line(1, 1.0);
        l.unit_price = Some(0.0);
        assert!(validate_line(&l).is_ok());

        l.unit_price = Some(-1.0);
        assert!(validate_line(&l).is_err());

        l.unit_price = Some(10.0);
        l.discount_percent = 100.0;
        assert!(validate_line(&l).is_ok());

        l.discount_percent = 100.5;
        assert!(validate_line(&l).is_err());

        l.discount_percent = -1.0;
        assert!(validate_line(&l).is_err());
    }

    #[test]
    fn test_serials_for_serialized_product() {
        let serials = vec!["SN-1".to_string(), "SN-2".to_string()];
        assert!(validate_serial_numbers(1, true, 2.0, &serials).is_ok());

        // count mismatch
        assert!(matches!(
            validate_serial_numbers(1, true, 3.0, &serials),
            Err(CoreError::SerialCountMismatch { expected: 3, .. })
        ));

        // fractional quantity
        assert!(matches!(
            validate_serial_numbers(1, true, 1.5, &serials),
            Err(CoreError::FractionalSerializedQuantity { .. })
        ));

        // duplicate
        let dup = vec!["SN-1".to_string(), "SN-1".to_string()];
        assert!(matches!(
            validate_serial_numbers(1, true, 2.0, &dup),
            Err(CoreError::DuplicateSerialNumber { .. })
        ));

        // blank
        let blank = vec!["SN-1".to_string(), "   ".to_string()];
        assert!(matches!(
            validate_serial_numbers(1, true, 2.0, &blank),
            Err(CoreError::EmptySerialNumber { .. })
        ));
    }

    #[test]
    fn test_ad_hoc_line_rules() {
        assert!(validate_line(&ad_hoc(1.0)).is_ok());

        let mut priceless = ad_hoc(1.0);
        priceless.unit_price = None;
        assert!(matches!(
            validate_line(&priceless),
            Err(CoreError::MissingUnitPrice)
        ));

        let mut with_serials = ad_hoc(1.0);
        with_serials.serial_numbers = vec!["SN-1".to_string()];
        assert!(matches!(
            validate_line(&with_serials),
            Err(CoreError::UnexpectedSerialNumbers { product_id: None })
        ));
    }

    #[test]
    fn test_serials_for_plain_product() {
        assert!(validate_serial_numbers(1, false, 2.0, &[]).is_ok());
        assert!(matches!(
            validate_serial_numbers(1, false, 1.0, &["SN-1".to_string()]),
            Err(CoreError::UnexpectedSerialNumbers { .. })
        ));
    }
}
