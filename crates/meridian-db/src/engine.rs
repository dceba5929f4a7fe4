//! # Sale Engine
//!
//! The transactional heart of the backend: turns a cart into a committed,
//! numbered sale document.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      create_sale                                        │
//! │                                                                         │
//! │  validate cart shape                                                   │
//! │       │                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────┐              │
//! │       │                                                  │              │
//! │  1. customer belongs to tenant                           │              │
//! │  2. price lines (unit price, % discount, tax)            │              │
//! │  3. promotion eligibility (customer sales only;          │              │
//! │     advisor failure degrades to "no promotions")         │ one         │
//! │  4. totals + paid ∈ [0, total]                           │ atomic      │
//! │  5. location belongs to tenant                           │ unit        │
//! │  6. idempotency replay? return committed sale            │ of          │
//! │  7. allocate document number                             │ work        │
//! │  8. insert header (COMPLETED / COMPLETED)                │              │
//! │  9. per line: serial rules, insert item, stock −qty      │              │
//! │ 10. promotion usage rows (best effort)                   │              │
//! │       │                                                  │              │
//! │  COMMIT ────────────────────────────────────────────────┘              │
//! │       │                                                                 │
//! │  post-commit: ledger entry (warn on failure),                          │
//! │               loyalty award on a background task                       │
//! │                                                                         │
//! │  Any error before COMMIT rolls back everything: no orphan items,       │
//! │  no stock drift, no lost numbers observable to readers.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotency
//! Keys are trimmed on entry; a blank key is treated as no key at all. A
//! replayed request short-circuits at step 6. The race where two requests
//! with the same key both pass step 6 is closed by the partial unique index
//! on `(location_id, idempotency_key)`: the loser's insert fails, its
//! transaction unwinds, and the committed sale is returned instead.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::collaborators::{Collaborators, PromotionContext, PromotionLine};
use crate::error::{DbError, EngineResult};
use crate::repository::sale::{SaleHeaderInsert, SaleItemInsert};
use crate::repository::{lookup, numbering, sale, stock};
use meridian_core::{
    totals, validation, CoreError, EligiblePromotion, NewSale, PosStatus, Sale, SaleDetail,
    SaleFilter, SaleLineInput, SaleStatus, Tenant, Totals,
};

/// Sequence name under which sale documents are numbered.
pub(crate) const SALE_SEQUENCE: &str = "sale";

// =============================================================================
// Priced Line
// =============================================================================

/// A request line after pricing and tax resolution, ready to persist.
///
/// Ad-hoc lines carry no product id; they never move stock and are never
/// serialized.
#[derive(Debug, Clone)]
pub(crate) struct PricedLine {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub category_id: Option<i64>,
    pub is_serialized: bool,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub tax_id: Option<i64>,
    pub tax_amount: f64,
    pub line_total: f64,
    pub serial_numbers: Vec<String>,
    pub notes: Option<String>,
}

impl PricedLine {
    pub(crate) fn to_insert(&self) -> EngineResult<SaleItemInsert> {
        Ok(SaleItemInsert {
            product_id: self.product_id,
            product_name: self.product_name.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            discount_amount: self.discount_amount,
            tax_id: self.tax_id,
            tax_amount: self.tax_amount,
            line_total: self.line_total,
            serial_numbers: encode_serials(&self.serial_numbers)?,
            notes: self.notes.clone(),
        })
    }
}

pub(crate) fn encode_serials(serials: &[String]) -> EngineResult<Option<String>> {
    if serials.is_empty() {
        return Ok(None);
    }
    let encoded = serde_json::to_string(serials)
        .map_err(|e| DbError::Internal(format!("serial number encoding: {e}")))?;
    Ok(Some(encoded))
}

/// Trims a client-supplied idempotency key; blank keys are treated as absent
/// so unrelated requests never deduplicate against each other.
pub(crate) fn normalize_idempotency_key(key: Option<String>) -> Option<String> {
    key.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// =============================================================================
// Sale Engine
// =============================================================================

/// Creates and reads sale documents. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    pub(crate) pool: SqlitePool,
    pub(crate) collaborators: Collaborators,
}

impl SaleEngine {
    pub fn new(pool: SqlitePool, collaborators: Collaborators) -> Self {
        SaleEngine {
            pool,
            collaborators,
        }
    }

    /// Creates a completed sale in one atomic unit of work.
    pub async fn create_sale(
        &self,
        tenant: Tenant,
        req: NewSale,
    ) -> EngineResult<SaleDetail> {
        self.create_sale_inner(tenant, req, false).await
    }

    /// Creates a walk-in counter sale: same pipeline as [`create_sale`], but
    /// the document is marked as a quick sale and always fully paid.
    ///
    /// [`create_sale`]: SaleEngine::create_sale
    pub async fn create_quick_sale(
        &self,
        tenant: Tenant,
        req: NewSale,
    ) -> EngineResult<SaleDetail> {
        self.create_sale_inner(tenant, req, true).await
    }

    async fn create_sale_inner(
        &self,
        tenant: Tenant,
        mut req: NewSale,
        quick: bool,
    ) -> EngineResult<SaleDetail> {
        req.idempotency_key = normalize_idempotency_key(req.idempotency_key.take());

        validation::validate_cart(&req.lines)?;
        for line in &req.lines {
            validation::validate_line(line)?;
        }
        validation::validate_header_discount(req.discount_amount)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if let Some(customer_id) = req.customer_id {
            if !lookup::customer_exists(&mut tx, tenant.company_id, customer_id).await? {
                return Err(CoreError::CustomerNotFound(customer_id).into());
            }
        }

        let (priced, running) = price_lines(&mut tx, tenant.company_id, &req.lines).await?;

        let promotions = self
            .eligible_promotions(tenant.company_id, &req, &priced, running.subtotal)
            .await;
        let promo_discount: f64 = promotions.iter().map(|p| p.discount_amount).sum();

        let totals = running.finish(req.discount_amount + promo_discount);
        let paid_amount = if quick {
            totals.total_amount
        } else {
            req.paid_amount
        };
        totals::validate_paid_amount(paid_amount, totals.total_amount)?;

        if !lookup::location_exists(&mut tx, tenant.company_id, req.location_id).await? {
            return Err(CoreError::LocationNotFound(req.location_id).into());
        }

        if let Some(ref key) = req.idempotency_key {
            if let Some(existing) = sale::fetch_by_idempotency(&mut tx, req.location_id, key).await?
            {
                debug!(
                    sale_id = existing.sale_id,
                    key = %key,
                    "Idempotent replay, returning committed sale"
                );
                let items = sale::fetch_items(&mut tx, existing.sale_id).await?;
                return Ok(SaleDetail {
                    sale: existing,
                    items,
                });
            }
        }

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
            paid_amount,
            payment_method_id: req.payment_method_id,
            status: SaleStatus::Completed,
            pos_status: PosStatus::Completed,
            is_quick_sale: quick,
            notes: req.notes.clone(),
            idempotency_key: req.idempotency_key.clone(),
            voided_sale_id: None,
            user_id: tenant.user_id,
            now,
        };

        let sale_id = match sale::insert_header(&mut tx, &header).await {
            Ok(id) => id,
            Err(err) if err.is_idempotency_conflict() => {
                // A concurrent request with the same key committed between our
                // lookup and insert. Unwind and return its sale.
                drop(tx);
                warn!(key = ?req.idempotency_key, "Idempotency race lost, replaying winner");
                return self
                    .replay_committed(req.location_id, req.idempotency_key.as_deref())
                    .await;
            }
            Err(err) => return Err(err.into()),
        };

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
                stock::adjust(&mut tx, req.location_id, product_id, -line.quantity, now).await?;
            }
        }

        let share = totals::even_share(promo_discount, promotions.len());
        for promo in &promotions {
            if let Err(err) =
                sale::insert_promotion_usage(&mut tx, sale_id, promo.promotion_id, share).await
            {
                warn!(
                    sale_id,
                    promotion_id = promo.promotion_id,
                    error = %err,
                    "Failed to record promotion usage"
                );
            }
        }

        tx.commit().await?;

        info!(
            sale_id,
            sale_number = %sale_number,
            total = totals.total_amount,
            quick,
            "Sale committed"
        );

        let detail = self.get_sale(tenant, sale_id).await?;
        self.emit_post_commit(&detail.sale).await;
        Ok(detail)
    }

    /// Consults the promotion advisor for customer sales. Failures degrade to
    /// an empty result so a down promotion service never blocks selling.
    async fn eligible_promotions(
        &self,
        company_id: i64,
        req: &NewSale,
        priced: &[PricedLine],
        subtotal: f64,
    ) -> Vec<EligiblePromotion> {
        let Some(customer_id) = req.customer_id else {
            return Vec::new();
        };

        let ctx = PromotionContext {
            company_id,
            location_id: req.location_id,
            customer_id,
            lines: priced
                .iter()
                .map(|l| PromotionLine {
                    product_id: l.product_id,
                    category_id: l.category_id,
                    quantity: l.quantity,
                    net: l.line_total,
                })
                .collect(),
            subtotal,
        };

        match self.collaborators.promotions.check_eligibility(&ctx).await {
            Ok(promotions) => promotions,
            Err(err) => {
                warn!(
                    customer_id,
                    error = %err,
                    "Promotion advisor unavailable, selling without promotions"
                );
                Vec::new()
            }
        }
    }

    async fn replay_committed(
        &self,
        location_id: i64,
        key: Option<&str>,
    ) -> EngineResult<SaleDetail> {
        let key = key
            .ok_or_else(|| DbError::Internal("idempotency conflict without a key".to_string()))?;

        let mut conn = self.pool.acquire().await?;
        let sale = sale::fetch_by_idempotency(&mut conn, location_id, key)
            .await?
            .ok_or_else(|| {
                DbError::Internal("idempotency conflict but no committed sale".to_string())
            })?;
        let items = sale::fetch_items(&mut conn, sale.sale_id).await?;

        Ok(SaleDetail { sale, items })
    }

    /// Ledger entry and loyalty award for a committed sale. Both best-effort:
    /// the document is already the source of truth.
    pub(crate) async fn emit_post_commit(&self, sale: &Sale) {
        if let Err(err) = self.collaborators.ledger.record_sale(sale).await {
            warn!(
                sale_id = sale.sale_id,
                error = %err,
                "Ledger recording failed"
            );
        }

        if let Some(customer_id) = sale.customer_id {
            let loyalty = self.collaborators.loyalty.clone();
            let sale_id = sale.sale_id;
            let total_amount = sale.total_amount;
            tokio::spawn(async move {
                if let Err(err) = loyalty.award_points(customer_id, sale_id, total_amount).await {
                    warn!(customer_id, sale_id, error = %err, "Loyalty award failed");
                }
            });
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetches a sale with its lines, scoped to the tenant.
    pub async fn get_sale(
        &self,
        tenant: Tenant,
        sale_id: i64,
    ) -> EngineResult<SaleDetail> {
        let mut conn = self.pool.acquire().await?;
        let sale = sale::fetch_sale(&mut conn, tenant.company_id, sale_id)
            .await?
            .ok_or(CoreError::SaleNotFound(sale_id))?;
        let items = sale::fetch_items(&mut conn, sale.sale_id).await?;
        Ok(SaleDetail { sale, items })
    }

    /// Fetches a sale by document number, scoped to the tenant.
    pub async fn get_sale_by_number(
        &self,
        tenant: Tenant,
        sale_number: &str,
    ) -> EngineResult<SaleDetail> {
        let mut conn = self.pool.acquire().await?;
        let sale = sale::fetch_sale_by_number(&mut conn, tenant.company_id, sale_number)
            .await?
            .ok_or_else(|| CoreError::SaleNumberNotFound(sale_number.to_string()))?;
        let items = sale::fetch_items(&mut conn, sale.sale_id).await?;
        Ok(SaleDetail { sale, items })
    }

    /// Looks up the sale committed under an idempotency key, if any.
    pub async fn get_sale_by_idempotency_key(
        &self,
        location_id: i64,
        key: &str,
    ) -> EngineResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(sale) = sale::fetch_by_idempotency(&mut conn, location_id, key).await? else {
            return Ok(None);
        };
        let items = sale::fetch_items(&mut conn, sale.sale_id).await?;
        Ok(Some(SaleDetail { sale, items }))
    }

    /// Lists sales for the tenant with combinable filters.
    pub async fn list_sales(
        &self,
        tenant: Tenant,
        filter: &SaleFilter,
    ) -> EngineResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Ok(sale::list(&mut conn, tenant.company_id, filter).await?)
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Prices every request line inside the caller's transaction: resolves unit
/// prices, applies percentage discounts, and resolves tax (explicit line tax
/// wins over the product's default).
///
/// Ad-hoc lines skip the catalog entirely: price and name come from the
/// request and only an explicitly named tax applies.
pub(crate) async fn price_lines(
    conn: &mut SqliteConnection,
    company_id: i64,
    lines: &[SaleLineInput],
) -> EngineResult<(Vec<PricedLine>, Totals)> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut running = Totals::default();

    for line in lines {
        let (product_name, category_id, is_serialized, unit_price, tax_id) = match line.product_id
        {
            Some(product_id) => {
                let info = lookup::product_info(conn, company_id, product_id)
                    .await?
                    .ok_or(CoreError::ProductNotFound(product_id))?;
                (
                    Some(info.name),
                    info.category_id,
                    info.is_serialized,
                    line.unit_price.unwrap_or(info.selling_price),
                    line.tax_id.or(info.tax_id),
                )
            }
            None => (
                line.product_name.clone(),
                None,
                false,
                line.unit_price.unwrap_or(0.0),
                line.tax_id,
            ),
        };

        let pricing = totals::price_line(line.quantity, unit_price, line.discount_percent);

        let tax_amount = match tax_id {
            Some(id) => {
                let pct = lookup::tax_percentage(conn, company_id, id)
                    .await?
                    .ok_or(CoreError::TaxNotFound(id))?;
                totals::tax_for(pricing.net, pct)
            }
            None => 0.0,
        };

        running.add_line(pricing, tax_amount);

        priced.push(PricedLine {
            product_id: line.product_id,
            product_name,
            category_id,
            is_serialized,
            quantity: line.quantity,
            unit_price,
            discount_percent: line.discount_percent,
            discount_amount: pricing.discount_amount,
            tax_id,
            tax_amount,
            line_total: pricing.net,
            serial_numbers: line.serial_numbers.clone(),
            notes: line.notes.clone(),
        });
    }

    Ok((priced, running))
}

// =============================================================================
// Unit Tests
// =============================================================================
