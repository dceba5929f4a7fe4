//! # Tax and Discount Arithmetic
//!
//! Pure monetary math for sale documents. No I/O, no rounding surprises, and
//! no `==` on floats anywhere.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Per-Line Pricing                                    │
//! │                                                                         │
//! │   gross    = quantity × unit_price                                     │
//! │   discount = gross × discount_percent / 100                            │
//! │   net      = gross − discount                                          │
//! │   tax      = net × tax_percent / 100     (tax applies AFTER discount)  │
//! │                                                                         │
//! │                     Document Totals                                     │
//! │                                                                         │
//! │   subtotal     = Σ net                                                 │
//! │   tax_amount   = Σ tax                                                 │
//! │   total_amount = max(subtotal + tax_amount − header_discount, 0)       │
//! │                                                                         │
//! │   paid_amount ∈ [0, total_amount]   (change is never stored)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Comparison tolerance for monetary values.
///
/// All threshold checks on `f64` amounts go through this epsilon; two amounts
/// closer than a hundredth of a cent are considered equal.
pub const MONEY_EPSILON: f64 = 1e-4;

// =============================================================================
// Per-Line Pricing
// =============================================================================

/// The priced result of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePricing {
    /// Absolute discount carved out of the gross amount.
    pub discount_amount: f64,
    /// Net line total after the percentage discount, before tax.
    pub net: f64,
}

/// Prices one line: `net = quantity × unit_price × (1 − discount_percent/100)`.
///
/// Inputs are assumed already validated (see [`crate::validation`]); this is
/// arithmetic only.
pub fn price_line(quantity: f64, unit_price: f64, discount_percent: f64) -> LinePricing {
    let gross = quantity * unit_price;
    let discount_amount = gross * discount_percent / 100.0;
    LinePricing {
        discount_amount,
        net: gross - discount_amount,
    }
}

/// Tax owed on a net amount at the given percentage.
pub fn tax_for(net: f64, tax_percent: f64) -> f64 {
    net * tax_percent / 100.0
}

// =============================================================================
// Document Totals
// =============================================================================

/// Accumulates line results into document totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
}

impl Totals {
    /// Folds one priced line into the running subtotal and tax.
    pub fn add_line(&mut self, pricing: LinePricing, tax: f64) {
        self.subtotal += pricing.net;
        self.tax_amount += tax;
    }

    /// Applies the header-level discount and computes the final total,
    /// clamped at zero so an oversized discount never produces a negative
    /// document.
    pub fn finish(mut self, header_discount: f64) -> Totals {
        self.discount_amount = header_discount;
        self.total_amount = (self.subtotal + self.tax_amount - header_discount).max(0.0);
        self
    }

    /// A fully negated copy, used for reversing documents.
    pub fn negated(&self) -> Totals {
        Totals {
            subtotal: -self.subtotal,
            tax_amount: -self.tax_amount,
            discount_amount: -self.discount_amount,
            total_amount: -self.total_amount,
        }
    }
}

// =============================================================================
// Paid-Amount Rule
// =============================================================================

/// Enforces `0 ≤ paid ≤ total` within [`MONEY_EPSILON`].
///
/// Overpayment is rejected: change due is computed by the register and never
/// persisted as part of the document.
pub fn validate_paid_amount(paid: f64, total: f64) -> CoreResult<()> {
    if paid < -MONEY_EPSILON || paid > total + MONEY_EPSILON {
        return Err(CoreError::InvalidPaidAmount { paid, total });
    }
    Ok(())
}

/// Splits an amount evenly across `count` recipients.
///
/// Used for best-effort promotion-usage records; returns 0 for an empty set.
pub fn even_share(amount: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    amount / count as f64
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < MONEY_EPSILON
    }

    #[test]
    fn test_price_line_no_discount() {
        let p = price_line(2.0, 10.0, 0.0);
        assert!(close(p.net, 20.0));
        assert!(close(p.discount_amount, 0.0));
    }

    #[test]
    fn test_price_line_with_discount() {
        // 3 × 8.00 at 25% off = 24.00 gross, 6.00 discount, 18.00 net
        let p = price_line(3.0, 8.0, 25.0);
        assert!(close(p.discount_amount, 6.0));
        assert!(close(p.net, 18.0));
    }

    #[test]
    fn test_tax_applies_after_discount() {
        let p = price_line(1.0, 100.0, 10.0);
        let tax = tax_for(p.net, 15.0);
        // net 90.00, tax 13.50 (not 15.00)
        assert!(close(tax, 13.5));
    }

    #[test]
    fn test_totals_example_cart() {
        // Two units at 10.00, no discounts, no tax: total is exactly 20.00
        let mut t = Totals::default();
        let p = price_line(2.0, 10.0, 0.0);
        t.add_line(p, 0.0);
        let t = t.finish(0.0);
        assert!(close(t.subtotal, 20.0));
        assert!(close(t.tax_amount, 0.0));
        assert!(close(t.total_amount, 20.0));
    }

    #[test]
    fn test_total_clamped_at_zero() {
        let mut t = Totals::default();
        t.add_line(price_line(1.0, 5.0, 0.0), 0.0);
        let t = t.finish(100.0);
        assert!(close(t.total_amount, 0.0));
        assert!(close(t.discount_amount, 100.0));
    }

    #[test]
    fn test_negated_totals() {
        let mut t = Totals::default();
        t.add_line(price_line(2.0, 10.0, 0.0), 1.0);
        let t = t.finish(0.5);
        let n = t.negated();
        assert!(close(n.subtotal, -20.0));
        assert!(close(n.tax_amount, -1.0));
        assert!(close(n.total_amount, -20.5));
    }

    #[test]
    fn test_paid_amount_bounds() {
        assert!(validate_paid_amount(0.0, 20.0).is_ok());
        assert!(validate_paid_amount(20.0, 20.0).is_ok());
        assert!(validate_paid_amount(10.0, 20.0).is_ok());

        assert!(validate_paid_amount(-0.01, 20.0).is_err());
        assert!(validate_paid_amount(20.01, 20.0).is_err());
    }

    #[test]
    fn test_paid_amount_epsilon_tolerance() {
        // A hair over total from float noise is still acceptable
        assert!(validate_paid_amount(20.0 + 1e-6, 20.0).is_ok());
    }

    #[test]
    fn test_even_share() {
        assert!(close(even_share(9.0, 3), 3.0));
        assert!(close(even_share(10.0, 0), 0.0));
    }
}
