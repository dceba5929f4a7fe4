//! # POS Lifecycle Controller
//!
//! Register-facing operations over the sale engine.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      POS Sale Lifecycle                                 │
//! │                                                                         │
//! │  cart ──checkout──────────────────────────► COMPLETED/COMPLETED        │
//! │   │        (stock sufficiency, then the engine's unit of work)         │
//! │   │                                                                     │
//! │   └──hold──► DRAFT/HOLD ──resume──► cart ──finalize──► COMPLETED/      │
//! │              (numbered,              (reprice, tender,    COMPLETED     │
//! │               NO stock               first-and-only       keeps its    │
//! │               movement)              stock decrement)     number)      │
//! │                                                                         │
//! │  DRAFT or COMPLETED ──void──► new VOID document                        │
//! │     • completed source: negated lines + totals, stock restored         │
//! │     • held source: zero-total record, no lines, no stock effect        │
//! │     • a second void of the same source is rejected                     │
//! │     • a voided draft can no longer be resumed or finalized             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! State checks run inside the same transaction as the mutation they guard,
//! so two competing finalize or void calls cannot both succeed.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use crate::engine::{normalize_idempotency_key, price_lines, SaleEngine, SALE_SEQUENCE};
use crate::error::EngineResult;
use crate::repository::sale::{SaleHeaderInsert, SaleItemInsert};
use crate::repository::{lookup, numbering, sale, stock};
use meridian_core::{
    totals, validation, CoreError, FinalizeRequest, NewSale, PosStatus, Sale, SaleDetail,
    SaleFilter, SaleLineInput, SaleStatus, Tenant, Totals, MONEY_EPSILON,
};

/// Register-side lifecycle operations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PosController {
    engine: SaleEngine,
}

impl PosController {
    pub fn new(engine: SaleEngine) -> Self {
        PosController { engine }
    }

    /// The sale engine backing this controller, for direct document reads.
    pub fn engine(&self) -> &SaleEngine {
        &self.engine
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Checks stock sufficiency for the whole cart, then runs the engine's
    /// unit of work. The error for a short line names the offending product.
    ///
    /// The sufficiency check runs on its own connection before the engine's
    /// transaction, so it is advisory under concurrency: a competing sale can
    /// still drive a counter negative between the check and the commit.
    pub async fn checkout(&self, tenant: Tenant, req: NewSale) -> EngineResult<SaleDetail> {
        validation::validate_cart(&req.lines)?;

        let mut conn = self.engine.pool.acquire().await?;
        ensure_stock(&mut conn, tenant.company_id, req.location_id, &req.lines).await?;
        drop(conn);

        self.engine.create_sale(tenant, req).await
    }

    // =========================================================================
    // Hold / Resume
    // =========================================================================

    /// Parks a cart as a numbered `DRAFT`/`HOLD` document.
    ///
    /// The sale is priced and numbered immediately so the receipt reference
    /// is stable, but stock is NOT touched until finalization.
    pub async fn hold(&self, tenant: Tenant, mut req: NewSale) -> EngineResult<SaleDetail> {
        req.idempotency_key = normalize_idempotency_key(req.idempotency_key.take());

        validation::validate_cart(&req.lines)?;
        for line in &req.lines {
            validation::validate_line(line)?;
        }
        validation::validate_header_discount(req.discount_amount)?;

        let now = Utc::now();
        let mut tx = self.engine.pool.begin().await?;

        if !lookup::location_exists(&mut tx, tenant.company_id, req.location_id).await? {
            return Err(CoreError::LocationNotFound(req.location_id).into());
        }
        if let Some(customer_id) = req.customer_id {
            if !lookup::customer_exists(&mut tx, tenant.company_id, customer_id).await? {
                return Err(CoreError::CustomerNotFound(customer_id).into());
            }
        }

        let (priced, running) = price_lines(&mut tx, tenant.company_id, &req.lines).await?;
        let totals = running.finish(req.discount_amount);

        let sale_number = numbering::next_number(
            &mut tx,
            tenant.company_id,
            Some(req.location_id),
            SALE_SEQUENCE,
            now,
        )
        .await?;

        let header = SaleHeaderInsert {
            sale_number: sale_number.clone(),
            location_id: req.location_id,
            customer_id: req.customer_id,
            totals,
            paid_amount: 0.0,
            payment_method_id: None,
            status: SaleStatus::Draft,
            pos_status: PosStatus::Hold,
            is_quick_sale: false,
            notes: req.notes.clone(),
            idempotency_key: req.idempotency_key.clone(),
            voided_sale_id: None,
            user_id: tenant.user_id,
            now,
        };
        let sale_id = sale::insert_header(&mut tx, &header).await?;

        for line in &priced {
            if let Some(product_id) = line.product_id {
                validation::validate_serial_numbers(
                    product_id,
                    line.is_serialized,
                    line.quantity,
                    &line.serial_numbers,
                )?;
            }
            sale::insert_item(&mut tx, sale_id, &line.to_insert()?).await?;
        }

        tx.commit().await?;

        info!(sale_id, sale_number = %sale_number, "Sale held");

        self.engine.get_sale(tenant, sale_id).await
    }

    /// Lists held sales, optionally narrowed to one location.
    pub async fn held_sales(
        &self,
        tenant: Tenant,
        location_id: Option<i64>,
    ) -> EngineResult<Vec<Sale>> {
        self.engine
            .list_sales(
                tenant,
                &SaleFilter {
                    location_id,
                    status: Some(SaleStatus::Draft),
                    pos_status: Some(PosStatus::Hold),
                    ..Default::default()
                },
            )
            .await
    }

    /// Retrieves a held sale for editing at the register.
    ///
    /// A draft that has already been voided stays `DRAFT`/`HOLD` on disk but
    /// is no longer editable.
    pub async fn resume(&self, tenant: Tenant, sale_id: i64) -> EngineResult<SaleDetail> {
        let detail = self.engine.get_sale(tenant, sale_id).await?;

        if detail.sale.status != SaleStatus::Draft || detail.sale.pos_status != PosStatus::Hold {
            return Err(CoreError::InvalidTransition {
                sale_id,
                status: detail.sale.status.to_string(),
                operation: "resume",
            }
            .into());
        }

        let mut conn = self.engine.pool.acquire().await?;
        if sale::fetch_void_of(&mut conn, sale_id).await?.is_some() {
            return Err(CoreError::AlreadyVoided { sale_id }.into());
        }

        Ok(detail)
    }

    // =========================================================================
    // Finalize
    // =========================================================================

    /// Turns a held sale into a completed one, keeping its document number.
    ///
    /// The cart may have been edited while parked, so lines are repriced from
    /// scratch: old items are replaced, and stock is decremented here for the
    /// first and only time.
    pub async fn finalize(
        &self,
        tenant: Tenant,
        sale_id: i64,
        req: FinalizeRequest,
    ) -> EngineResult<SaleDetail> {
        validation::validate_cart(&req.lines)?;
        for line in &req.lines {
            validation::validate_line(line)?;
        }
        validation::validate_header_discount(req.discount_amount)?;

        let now = Utc::now();
        let mut tx = self.engine.pool.begin().await?;

        let existing = sale::fetch_sale(&mut tx, tenant.company_id, sale_id)
            .await?
            .ok_or(CoreError::SaleNotFound(sale_id))?;
        if !existing.status.can_finalize() {
            return Err(CoreError::InvalidTransition {
                sale_id,
                status: existing.status.to_string(),
                operation: "finalize",
            }
            .into());
        }
        // Voiding a draft leaves its status untouched; the reversing document
        // is what marks it cancelled.
        if sale::fetch_void_of(&mut tx, sale_id).await?.is_some() {
            return Err(CoreError::AlreadyVoided { sale_id }.into());
        }

        ensure_stock(&mut tx, tenant.company_id, existing.location_id, &req.lines).await?;

        let (priced, running) = price_lines(&mut tx, tenant.company_id, &req.lines).await?;
        let totals = running.finish(req.discount_amount);

        let paid_amount: f64 = req.payments.iter().map(|p| p.amount).sum();
        totals::validate_paid_amount(paid_amount, totals.total_amount)?;

        sale::delete_items(&mut tx, sale_id).await?;
        for line in &priced {
            if let Some(product_id) = line.product_id {
                validation::validate_serial_numbers(
                    product_id,
                    line.is_serialized,
                    line.quantity,
                    &line.serial_numbers,
                )?;
            }
            sale::insert_item(&mut tx, sale_id, &line.to_insert()?).await?;
            if let Some(product_id) = line.product_id {
                stock::adjust(&mut tx, existing.location_id, product_id, -line.quantity, now)
                    .await?;
            }
        }

        for payment in &req.payments {
            sale::insert_payment(
                &mut tx,
                sale_id,
                payment.method_id,
                payment.amount,
                payment.reference.as_deref(),
                now,
            )
            .await?;
        }

        let payment_method_id = req.payments.first().and_then(|p| p.method_id);
        sale::finalize_header(
            &mut tx,
            sale_id,
            totals,
            paid_amount,
            payment_method_id,
            req.notes.as_deref(),
            tenant.user_id,
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            sale_id,
            sale_number = %existing.sale_number,
            total = totals.total_amount,
            "Held sale finalized"
        );

        let detail = self.engine.get_sale(tenant, sale_id).await?;
        self.engine.emit_post_commit(&detail.sale).await;
        Ok(detail)
    }

    // =========================================================================
    // Void
    // =========================================================================

    /// Voids a sale by writing a new reversing document. The source sale is
    /// never mutated, which keeps the audit trail append-only.
    pub async fn void_sale(
        &self,
        tenant: Tenant,
        sale_id: i64,
        reason: Option<String>,
    ) -> EngineResult<SaleDetail> {
        let now = Utc::now();
        let mut tx = self.engine.pool.begin().await?;

        let source = sale::fetch_sale(&mut tx, tenant.company_id, sale_id)
            .await?
            .ok_or(CoreError::SaleNotFound(sale_id))?;
        if !source.status.can_void() {
            return Err(CoreError::InvalidTransition {
                sale_id,
                status: source.status.to_string(),
                operation: "void",
            }
            .into());
        }
        if sale::fetch_void_of(&mut tx, sale_id).await?.is_some() {
            return Err(CoreError::AlreadyVoided { sale_id }.into());
        }

        let void_number = numbering::next_number(
            &mut tx,
            tenant.company_id,
            Some(source.location_id),
            SALE_SEQUENCE,
            now,
        )
        .await?;

        let was_completed = source.status == SaleStatus::Completed;
        let (void_totals, void_paid) = if was_completed {
            let totals = Totals {
                subtotal: source.subtotal,
                tax_amount: source.tax_amount,
                discount_amount: source.discount_amount,
                total_amount: source.total_amount,
            };
            (totals.negated(), -source.paid_amount)
        } else {
            // Held source: nothing financial ever happened, record the void
            // with zero totals and no lines.
            (Totals::default(), 0.0)
        };

        let header = SaleHeaderInsert {
            sale_number: void_number.clone(),
            location_id: source.location_id,
            customer_id: source.customer_id,
            totals: void_totals,
            paid_amount: void_paid,
            payment_method_id: source.payment_method_id,
            status: SaleStatus::Void,
            pos_status: PosStatus::Completed,
            is_quick_sale: false,
            notes: reason,
            idempotency_key: None,
            voided_sale_id: Some(sale_id),
            user_id: tenant.user_id,
            now,
        };
        let void_id = sale::insert_header(&mut tx, &header).await?;

        if was_completed {
            let items = sale::fetch_items(&mut tx, sale_id).await?;
            for item in &items {
                let reversed = SaleItemInsert {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity: -item.quantity,
                    unit_price: item.unit_price,
                    discount_percent: item.discount_percent,
                    discount_amount: -item.discount_amount,
                    tax_id: item.tax_id,
                    tax_amount: -item.tax_amount,
                    line_total: -item.line_total,
                    serial_numbers: item.serial_numbers.clone(),
                    notes: item.notes.clone(),
                };
                sale::insert_item(&mut tx, void_id, &reversed).await?;

                if let Some(product_id) = item.product_id {
                    stock::adjust(&mut tx, source.location_id, product_id, item.quantity, now)
                        .await?;
                }
            }
        }

        tx.commit().await?;

        info!(
            void_id,
            void_number = %void_number,
            source_sale_id = sale_id,
            "Sale voided"
        );

        self.engine.get_sale(tenant, void_id).await
    }
}

// =============================================================================
// Stock Sufficiency
// =============================================================================

/// Verifies on-hand stock covers the cart, aggregating lines that share a
/// product. Ad-hoc lines have nothing on hand to check and are skipped. The
/// error names the product so the register can show it.
async fn ensure_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    location_id: i64,
    lines: &[SaleLineInput],
) -> EngineResult<()> {
    let mut requested: HashMap<i64, f64> = HashMap::new();
    for line in lines {
        let Some(product_id) = line.product_id else {
            continue;
        };
        *requested.entry(product_id).or_insert(0.0) += line.quantity;
    }

    for (&product_id, &quantity) in &requested {
        let info = lookup::product_info(conn, company_id, product_id)
            .await?
            .ok_or(CoreError::ProductNotFound(product_id))?;

        let available = stock::on_hand(conn, location_id, product_id).await?;
        if available + MONEY_EPSILON < quantity {
            return Err(CoreError::InsufficientStock {
                product_id,
                product_name: info.name,
                available,
                requested: quantity,
            }
            .into());
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
    use crate::collaborators::Collaborators;
    use crate::testutil::{self, Fixture};
    use meridian_core::PaymentLine;

    fn line(product_id: i64, quantity: f64) -> SaleLineInput {
        SaleLineInput {
            product_id: Some(product_id),
            product_name: None,
            quantity,
            unit_price: None,
            discount_percent: 0.0,
            tax_id: None,
            serial_numbers: Vec::new(),
            notes: None,
        }
    }

    fn request(fx: &Fixture, lines: Vec<SaleLineInput>, paid: f64) -> NewSale {
        NewSale {
            location_id: fx.location_id,
            customer_id: None,
            lines,
            discount_amount: 0.0,
            paid_amount: paid,
            payment_method_id: Some(fx.payment_method_id),
            notes: None,
            idempotency_key: None,
        }
    }

    async fn stock_of(fx: &Fixture, product_id: i64) -> f64 {
        let mut conn = fx.db.pool().acquire().await.unwrap();
        stock::on_hand(&mut conn, fx.location_id, product_id)
            .await
            .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < MONEY_EPSILON
    }

    #[tokio::test]
    async fn test_checkout_rejects_short_stock_by_name() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let err = pos
            .checkout(fx.tenant, request(&fx, vec![line(fx.widget_id, 60.0)], 0.0))
            .await
            .unwrap_err();
        match err {
            crate::EngineError::Domain(CoreError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_name, "Widget");
                assert!(close(available, 50.0));
                assert!(close(requested, 60.0));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));
    }

    #[tokio::test]
    async fn test_checkout_aggregates_lines_per_product() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        // 30 + 30 of the same product exceeds the 50 on hand even though each
        // line alone fits
        let err = pos
            .checkout(
                fx.tenant,
                request(
                    &fx,
                    vec![line(fx.widget_id, 30.0), line(fx.widget_id, 30.0)],
                    0.0,
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::InsufficientStock { .. })
        ));
    }

    #[tokio::test]
    async fn test_checkout_happy_path() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let detail = pos
            .checkout(fx.tenant, request(&fx, vec![line(fx.widget_id, 2.0)], 20.0))
            .await
            .unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert!(close(detail.sale.total_amount, 20.0));
        assert!(close(stock_of(&fx, fx.widget_id).await, 48.0));
    }

    #[tokio::test]
    async fn test_hold_numbers_but_leaves_stock() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let held = pos
            .hold(fx.tenant, request(&fx, vec![line(fx.widget_id, 5.0)], 0.0))
            .await
            .unwrap();

        assert_eq!(held.sale.sale_number, "INV-000001");
        assert_eq!(held.sale.status, SaleStatus::Draft);
        assert_eq!(held.sale.pos_status, PosStatus::Hold);
        assert!(close(held.sale.paid_amount, 0.0));
        assert!(close(held.sale.total_amount, 50.0));
        assert_eq!(held.items.len(), 1);

        // No stock movement for a held sale
        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));

        let empty = pos
            .hold(fx.tenant, request(&fx, vec![], 0.0))
            .await
            .unwrap_err();
        assert!(matches!(
            empty,
            crate::EngineError::Domain(CoreError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_held_list_and_resume() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let held = pos
            .hold(fx.tenant, request(&fx, vec![line(fx.widget_id, 1.0)], 0.0))
            .await
            .unwrap();
        let completed = pos
            .checkout(fx.tenant, request(&fx, vec![line(fx.widget_id, 1.0)], 0.0))
            .await
            .unwrap();

        let parked = pos
            .held_sales(fx.tenant, Some(fx.location_id))
            .await
            .unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].sale_id, held.sale.sale_id);

        let resumed = pos.resume(fx.tenant, held.sale.sale_id).await.unwrap();
        assert_eq!(resumed.sale.sale_id, held.sale.sale_id);
        assert_eq!(resumed.items.len(), 1);

        let err = pos
            .resume(fx.tenant, completed.sale.sale_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::InvalidTransition {
                operation: "resume",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_finalize_keeps_number_and_decrements_once() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let held = pos
            .hold(fx.tenant, request(&fx, vec![line(fx.widget_id, 5.0)], 0.0))
            .await
            .unwrap();
        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));

        // Cart edited while parked: 3 instead of 5
        let finalized = pos
            .finalize(
                fx.tenant,
                held.sale.sale_id,
                FinalizeRequest {
                    lines: vec![line(fx.widget_id, 3.0)],
                    payments: vec![PaymentLine {
                        method_id: Some(fx.payment_method_id),
                        amount: 30.0,
                        reference: None,
                    }],
                    discount_amount: 0.0,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(finalized.sale.sale_number, held.sale.sale_number);
        assert_eq!(finalized.sale.status, SaleStatus::Completed);
        assert_eq!(finalized.sale.pos_status, PosStatus::Completed);
        assert!(close(finalized.sale.total_amount, 30.0));
        assert!(close(finalized.sale.paid_amount, 30.0));
        assert_eq!(finalized.items.len(), 1);
        assert!(close(finalized.items[0].quantity, 3.0));

        // The one and only decrement, for the edited quantity
        assert!(close(stock_of(&fx, fx.widget_id).await, 47.0));

        let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_payments WHERE sale_id = ?")
            .bind(finalized.sale.sale_id)
            .fetch_one(fx.db.pool())
            .await
            .unwrap();
        assert_eq!(payments, 1);

        // A second finalize is rejected
        let err = pos
            .finalize(
                fx.tenant,
                held.sale.sale_id,
                FinalizeRequest {
                    lines: vec![line(fx.widget_id, 1.0)],
                    payments: vec![],
                    discount_amount: 0.0,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::InvalidTransition {
                operation: "finalize",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_finalize_rejects_overpayment() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let held = pos
            .hold(fx.tenant, request(&fx, vec![line(fx.widget_id, 2.0)], 0.0))
            .await
            .unwrap();

        let err = pos
            .finalize(
                fx.tenant,
                held.sale.sale_id,
                FinalizeRequest {
                    lines: vec![line(fx.widget_id, 2.0)],
                    payments: vec![PaymentLine {
                        method_id: Some(fx.payment_method_id),
                        amount: 25.0,
                        reference: None,
                    }],
                    discount_amount: 0.0,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::InvalidPaidAmount { .. })
        ));

        // Still held, still no stock movement
        let resumed = pos.resume(fx.tenant, held.sale.sale_id).await.unwrap();
        assert_eq!(resumed.sale.status, SaleStatus::Draft);
        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));
    }

    #[tokio::test]
    async fn test_void_completed_sale_restores_stock() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let sale = pos
            .checkout(fx.tenant, request(&fx, vec![line(fx.widget_id, 4.0)], 40.0))
            .await
            .unwrap();
        assert!(close(stock_of(&fx, fx.widget_id).await, 46.0));

        let void = pos
            .void_sale(fx.tenant, sale.sale.sale_id, Some("customer return".to_string()))
            .await
            .unwrap();

        assert_eq!(void.sale.status, SaleStatus::Void);
        assert_eq!(void.sale.voided_sale_id, Some(sale.sale.sale_id));
        assert_ne!(void.sale.sale_number, sale.sale.sale_number);
        assert!(close(void.sale.total_amount, -40.0));
        assert!(close(void.sale.paid_amount, -40.0));
        assert_eq!(void.items.len(), 1);
        assert!(close(void.items[0].quantity, -4.0));

        // Stock restored
        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));

        // Source document untouched
        let source = pos
            .engine()
            .get_sale(fx.tenant, sale.sale.sale_id)
            .await
            .unwrap();
        assert_eq!(source.sale.status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn test_void_guards() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let sale = pos
            .checkout(fx.tenant, request(&fx, vec![line(fx.widget_id, 1.0)], 0.0))
            .await
            .unwrap();
        let void = pos
            .void_sale(fx.tenant, sale.sale.sale_id, None)
            .await
            .unwrap();

        // Double void rejected
        let err = pos
            .void_sale(fx.tenant, sale.sale.sale_id, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::AlreadyVoided { .. })
        ));

        // Voiding the void document rejected
        let err = pos
            .void_sale(fx.tenant, void.sale.sale_id, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::InvalidTransition {
                operation: "void",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_voided_held_sale_cannot_be_finalized_or_resumed() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let held = pos
            .hold(fx.tenant, request(&fx, vec![line(fx.widget_id, 2.0)], 0.0))
            .await
            .unwrap();
        pos.void_sale(fx.tenant, held.sale.sale_id, None)
            .await
            .unwrap();

        // The source stays DRAFT/HOLD on disk, but the reversing document
        // marks it cancelled
        let err = pos
            .finalize(
                fx.tenant,
                held.sale.sale_id,
                FinalizeRequest {
                    lines: vec![line(fx.widget_id, 2.0)],
                    payments: vec![PaymentLine {
                        method_id: Some(fx.payment_method_id),
                        amount: 20.0,
                        reference: None,
                    }],
                    discount_amount: 0.0,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::AlreadyVoided { .. })
        ));

        let err = pos.resume(fx.tenant, held.sale.sale_id).await.unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Domain(CoreError::AlreadyVoided { .. })
        ));

        // No stock ever moved for the cancelled cart
        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));
    }

    #[tokio::test]
    async fn test_hold_blanks_out_empty_idempotency_key() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let mut req = request(&fx, vec![line(fx.widget_id, 1.0)], 0.0);
        req.idempotency_key = Some("   ".to_string());

        let held = pos.hold(fx.tenant, req).await.unwrap();
        assert!(held.sale.idempotency_key.is_none());
    }

    #[tokio::test]
    async fn test_void_held_sale_is_zero_total_and_stockless() {
        let fx = testutil::fixture().await;
        let pos = fx.db.pos(Collaborators::default());

        let held = pos
            .hold(fx.tenant, request(&fx, vec![line(fx.widget_id, 5.0)], 0.0))
            .await
            .unwrap();

        let void = pos
            .void_sale(fx.tenant, held.sale.sale_id, None)
            .await
            .unwrap();

        assert_eq!(void.sale.status, SaleStatus::Void);
        assert!(close(void.sale.total_amount, 0.0));
        assert!(void.items.is_empty());
        assert!(close(stock_of(&fx, fx.widget_id).await, 50.0));
    }
}
