//! # Collaborator Seams
//!
//! Trait boundaries for the external services the sale engine talks to.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Collaborator Contract                              │
//! │                                                                         │
//! │  PromotionAdvisor ── consulted BEFORE commit                           │
//! │      failure degrades to "no promotions" (warn, keep selling)          │
//! │                                                                         │
//! │  LedgerRecorder ──── invoked AFTER commit                              │
//! │      failure is logged, never unwinds the sale                         │
//! │                                                                         │
//! │  LoyaltyAwarder ──── spawned AFTER commit (fire and forget)            │
//! │      failure is logged from the background task                        │
//! │                                                                         │
//! │  The committed sale document is the source of truth; collaborators     │
//! │  observe it, they never gate it.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Defaults are no-ops so the engine runs standalone; deployments wire real
//! implementations, tests wire recording doubles.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use meridian_core::{EligiblePromotion, Sale};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Collaborator Error
// =============================================================================

/// Opaque failure from an external collaborator.
///
/// The engine never branches on the contents; it only logs them.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CollaboratorError(String);

impl CollaboratorError {
    pub fn new(message: impl fmt::Display) -> Self {
        CollaboratorError(message.to_string())
    }
}

// =============================================================================
// Promotion Advisor
// =============================================================================

/// One cart line as seen by the promotion advisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionLine {
    /// Absent for ad-hoc lines with no catalog product.
    pub product_id: Option<i64>,
    pub category_id: Option<i64>,
    pub quantity: f64,
    /// Net line amount after the percentage discount.
    pub net: f64,
}

/// Everything the advisor needs to judge eligibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionContext {
    pub company_id: i64,
    pub location_id: i64,
    pub customer_id: i64,
    pub lines: Vec<PromotionLine>,
    pub subtotal: f64,
}

/// Judges which promotions apply to a cart. Consulted only when the sale has
/// an identified customer.
#[async_trait]
pub trait PromotionAdvisor: Send + Sync {
    async fn check_eligibility(
        &self,
        ctx: &PromotionContext,
    ) -> Result<Vec<EligiblePromotion>, CollaboratorError>;
}

// =============================================================================
// Ledger Recorder
// =============================================================================

/// Records the financial ledger entry for a committed sale.
#[async_trait]
pub trait LedgerRecorder: Send + Sync {
    async fn record_sale(&self, sale: &Sale) -> Result<(), CollaboratorError>;
}

// =============================================================================
// Loyalty Awarder
// =============================================================================

/// Awards loyalty points for a committed sale. Runs in the background.
#[async_trait]
pub trait LoyaltyAwarder: Send + Sync {
    async fn award_points(
        &self,
        customer_id: i64,
        sale_id: i64,
        total_amount: f64,
    ) -> Result<(), CollaboratorError>;
}

// =============================================================================
// No-op Defaults
// =============================================================================

/// Advisor that finds no promotions.
#[derive(Debug, Default)]
pub struct NoPromotions;

#[async_trait]
impl PromotionAdvisor for NoPromotions {
    async fn check_eligibility(
        &self,
        _ctx: &PromotionContext,
    ) -> Result<Vec<EligiblePromotion>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Recorder that discards ledger entries.
#[derive(Debug, Default)]
pub struct NoLedger;

#[async_trait]
impl LedgerRecorder for NoLedger {
    async fn record_sale(&self, _sale: &Sale) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Awarder that awards nothing.
#[derive(Debug, Default)]
pub struct NoLoyalty;

#[async_trait]
impl LoyaltyAwarder for NoLoyalty {
    async fn award_points(
        &self,
        _customer_id: i64,
        _sale_id: i64,
        _total_amount: f64,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// The collaborator bundle handed to the engine at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub promotions: Arc<dyn PromotionAdvisor>,
    pub ledger: Arc<dyn LedgerRecorder>,
    pub loyalty: Arc<dyn LoyaltyAwarder>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators {
            promotions: Arc::new(NoPromotions),
            ledger: Arc::new(NoLedger),
            loyalty: Arc::new(NoLoyalty),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
