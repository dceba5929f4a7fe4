//! # Sale Repository
//!
//! Database operations for sale headers, lines, payments, and promotion
//! usage.
//!
//! ## Document Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale Document                                    │
//! │                                                                         │
//! │  sales ──────────── header: number, totals, status pair, audit         │
//! │    ├── sale_items ─ lines: qty, price, discount, tax, serials (JSON)   │
//! │    ├── sale_payments ─ tender breakdown (finalize only)                │
//! │    └── sale_promotions ─ best-effort promotion usage                   │
//! │                                                                         │
//! │  Headers are soft-deleted, never removed. Void documents reference     │
//! │  their source through voided_sale_id.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write takes the caller's connection; transaction scope is decided
//! by the engine.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;
use meridian_core::{PosStatus, Sale, SaleFilter, SaleItem, SaleStatus, Totals};

/// Default page size for listings when the filter doesn't set one.
const DEFAULT_LIST_LIMIT: i64 = 50;

// =============================================================================
// Insert Payloads
// =============================================================================

/// Header fields for a new sale document.
#[derive(Debug, Clone)]
pub struct SaleHeaderInsert {
    pub sale_number: String,
    pub location_id: i64,
    pub customer_id: Option<i64>,
    pub totals: Totals,
    pub paid_amount: f64,
    pub payment_method_id: Option<i64>,
    pub status: SaleStatus,
    pub pos_status: PosStatus,
    pub is_quick_sale: bool,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    pub voided_sale_id: Option<i64>,
    pub user_id: i64,
    pub now: DateTime<Utc>,
}

/// One line of a sale document, fully priced.
#[derive(Debug, Clone)]
pub struct SaleItemInsert {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub tax_id: Option<i64>,
    pub tax_amount: f64,
    pub line_total: f64,
    /// Already-encoded JSON array, NULL for non-serialized lines.
    pub serial_numbers: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Writes
// =============================================================================

/// Inserts a sale header and returns its id.
pub async fn insert_header(conn: &mut SqliteConnection, header: &SaleHeaderInsert) -> DbResult<i64> {
    debug!(
        sale_number = %header.sale_number,
        location_id = header.location_id,
        status = %header.status,
        "Inserting sale header"
    );

    let sale_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO sales (
            sale_number, location_id, customer_id,
            subtotal, tax_amount, discount_amount, total_amount, paid_amount,
            payment_method_id, status, pos_status, is_quick_sale,
            notes, idempotency_key, voided_sale_id, is_deleted,
            created_by, updated_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        RETURNING sale_id
        "#,
    )
    .bind(&header.sale_number)
    .bind(header.location_id)
    .bind(header.customer_id)
    .bind(header.totals.subtotal)
    .bind(header.totals.tax_amount)
    .bind(header.totals.discount_amount)
    .bind(header.totals.total_amount)
    .bind(header.paid_amount)
    .bind(header.payment_method_id)
    .bind(header.status)
    .bind(header.pos_status)
    .bind(header.is_quick_sale)
    .bind(&header.notes)
    .bind(&header.idempotency_key)
    .bind(header.voided_sale_id)
    .bind(header.user_id)
    .bind(header.user_id)
    .bind(header.now)
    .bind(header.now)
    .fetch_one(conn)
    .await?;

    Ok(sale_id)
}

/// Inserts one priced line.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    sale_id: i64,
    item: &SaleItemInsert,
) -> DbResult<i64> {
    let sale_item_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO sale_items (
            sale_id, product_id, product_name, quantity, unit_price,
            discount_percent, discount_amount, tax_id, tax_amount, line_total,
            serial_numbers, notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING sale_item_id
        "#,
    )
    .bind(sale_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.discount_percent)
    .bind(item.discount_amount)
    .bind(item.tax_id)
    .bind(item.tax_amount)
    .bind(item.line_total)
    .bind(&item.serial_numbers)
    .bind(&item.notes)
    .fetch_one(conn)
    .await?;

    Ok(sale_item_id)
}

/// Inserts one tender row.
pub async fn insert_payment(
    conn: &mut SqliteConnection,
    sale_id: i64,
    method_id: Option<i64>,
    amount: f64,
    reference: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_payments (sale_id, method_id, amount, reference, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(sale_id)
    .bind(method_id)
    .bind(amount)
    .bind(reference)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Records one promotion applied to a sale.
pub async fn insert_promotion_usage(
    conn: &mut SqliteConnection,
    sale_id: i64,
    promotion_id: i64,
    discount_amount: f64,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sale_promotions (sale_id, promotion_id, discount_amount) VALUES (?, ?, ?)",
    )
    .bind(sale_id)
    .bind(promotion_id)
    .bind(discount_amount)
    .execute(conn)
    .await?;

    Ok(())
}

/// Removes all lines of a sale (finalize reprices from scratch).
pub async fn delete_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?")
        .bind(sale_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Flips a held sale to completed, keeping its original document number.
pub async fn finalize_header(
    conn: &mut SqliteConnection,
    sale_id: i64,
    totals: Totals,
    paid_amount: f64,
    payment_method_id: Option<i64>,
    notes: Option<&str>,
    user_id: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(sale_id, "Finalizing sale header");

    sqlx::query(
        r#"
        UPDATE sales
           SET subtotal = ?,
               tax_amount = ?,
               discount_amount = ?,
               total_amount = ?,
               paid_amount = ?,
               payment_method_id = ?,
               status = ?,
               pos_status = ?,
               notes = COALESCE(?, notes),
               updated_by = ?,
               updated_at = ?
         WHERE sale_id = ?
        "#,
    )
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(totals.discount_amount)
    .bind(totals.total_amount)
    .bind(paid_amount)
    .bind(payment_method_id)
    .bind(SaleStatus::Completed)
    .bind(PosStatus::Completed)
    .bind(notes)
    .bind(user_id)
    .bind(now)
    .bind(sale_id)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Fetches a sale by id, scoped to a company through its location.
pub async fn fetch_sale(
    conn: &mut SqliteConnection,
    company_id: i64,
    sale_id: i64,
) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT s.*
          FROM sales s
          JOIN locations l ON l.location_id = s.location_id
         WHERE s.sale_id = ? AND l.company_id = ? AND s.is_deleted = 0
        "#,
    )
    .bind(sale_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;

    Ok(sale)
}

/// Fetches a sale by its document number, scoped to a company.
pub async fn fetch_sale_by_number(
    conn: &mut SqliteConnection,
    company_id: i64,
    sale_number: &str,
) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT s.*
          FROM sales s
          JOIN locations l ON l.location_id = s.location_id
         WHERE s.sale_number = ? AND l.company_id = ? AND s.is_deleted = 0
        "#,
    )
    .bind(sale_number)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;

    Ok(sale)
}

/// Fetches the sale previously committed under an idempotency key.
pub async fn fetch_by_idempotency(
    conn: &mut SqliteConnection,
    location_id: i64,
    key: &str,
) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT * FROM sales
         WHERE location_id = ? AND idempotency_key = ? AND is_deleted = 0
        "#,
    )
    .bind(location_id)
    .bind(key)
    .fetch_optional(conn)
    .await?;

    Ok(sale)
}

/// All lines of a sale, in insertion order.
pub async fn fetch_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        "SELECT * FROM sale_items WHERE sale_id = ? ORDER BY sale_item_id",
    )
    .bind(sale_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

/// Returns the id of the void document referencing `sale_id`, if any.
pub async fn fetch_void_of(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Option<i64>> {
    let void_id = sqlx::query_scalar::<_, i64>(
        "SELECT sale_id FROM sales WHERE voided_sale_id = ? AND is_deleted = 0 LIMIT 1",
    )
    .bind(sale_id)
    .fetch_optional(conn)
    .await?;

    Ok(void_id)
}

/// Lists sales for a company with combinable filters.
///
/// Built with a `QueryBuilder` so every value travels as a bind parameter;
/// filter input never lands in the SQL text itself.
pub async fn list(
    conn: &mut SqliteConnection,
    company_id: i64,
    filter: &SaleFilter,
) -> DbResult<Vec<Sale>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT s.*
          FROM sales s
          JOIN locations l ON l.location_id = s.location_id
         WHERE s.is_deleted = 0 AND l.company_id = "#,
    );
    qb.push_bind(company_id);

    if let Some(location_id) = filter.location_id {
        qb.push(" AND s.location_id = ").push_bind(location_id);
    }
    if let Some(customer_id) = filter.customer_id {
        qb.push(" AND s.customer_id = ").push_bind(customer_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND s.status = ").push_bind(status.as_str());
    }
    if let Some(pos_status) = filter.pos_status {
        qb.push(" AND s.pos_status = ").push_bind(pos_status.as_str());
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND s.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND s.created_at <= ").push_bind(to);
    }
    if let Some(ref number) = filter.number_like {
        qb.push(" AND s.sale_number LIKE ")
            .push_bind(format!("{number}%"));
    }

    qb.push(" ORDER BY s.created_at DESC, s.sale_id DESC");
    qb.push(" LIMIT ")
        .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT));
    qb.push(" OFFSET ").push_bind(filter.offset.unwrap_or(0));

    let sales = qb.build_query_as::<Sale>().fetch_all(conn).await?;

    Ok(sales)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn header(fx: &testutil::Fixture, number: &str) -> SaleHeaderInsert {
        SaleHeaderInsert {
            sale_number: number.to_string(),
            location_id: fx.location_id,
            customer_id: None,
            totals: Totals {
                subtotal: 20.0,
                tax_amount: 0.0,
                discount_amount: 0.0,
                total_amount: 20.0,
            },
            paid_amount: 20.0,
            payment_method_id: None,
            status: SaleStatus::Completed,
            pos_status: PosStatus::Completed,
            is_quick_sale: false,
            notes: None,
            idempotency_key: None,
            voided_sale_id: None,
            user_id: fx.tenant.user_id,
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_header_round_trip() {
        let fx = testutil::fixture().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let sale_id = insert_header(&mut conn, &header(&fx, "INV-000001"))
            .await
            .unwrap();

        let sale = fetch_sale(&mut conn, fx.tenant.company_id, sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sale.sale_number, "INV-000001");
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.pos_status, PosStatus::Completed);
        assert!((sale.total_amount - 20.0).abs() < 1e-9);

        // Invisible to other companies
        assert!(fetch_sale(&mut conn, 999, sale_id).await.unwrap().is_none());

        let by_number = fetch_sale_by_number(&mut conn, fx.tenant.company_id, "INV-000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_number.sale_id, sale_id);
    }

    #[tokio::test]
    async fn test_idempotency_index_rejects_duplicates() {
        let fx = testutil::fixture().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let mut first = header(&fx, "INV-000001");
        first.idempotency_key = Some("abc".to_string());
        insert_header(&mut conn, &first).await.unwrap();

        let mut second = header(&fx, "INV-000002");
        second.idempotency_key = Some("abc".to_string());
        let err = insert_header(&mut conn, &second).await.unwrap_err();
        assert!(err.is_idempotency_conflict(), "got: {err}");

        // NULL keys never collide
        insert_header(&mut conn, &header(&fx, "INV-000003"))
            .await
            .unwrap();
        insert_header(&mut conn, &header(&fx, "INV-000004"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_filters() {
        let fx = testutil::fixture().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let mut held = header(&fx, "INV-000001");
        held.status = SaleStatus::Draft;
        held.pos_status = PosStatus::Hold;
        held.paid_amount = 0.0;
        insert_header(&mut conn, &held).await.unwrap();
        insert_header(&mut conn, &header(&fx, "INV-000002"))
            .await
            .unwrap();

        let held_only = list(
            &mut conn,
            fx.tenant.company_id,
            &SaleFilter {
                pos_status: Some(PosStatus::Hold),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(held_only.len(), 1);
        assert_eq!(held_only[0].sale_number, "INV-000001");

        let by_prefix = list(
            &mut conn,
            fx.tenant.company_id,
            &SaleFilter {
                number_like: Some("INV-".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_prefix.len(), 2);

        let other_company = list(&mut conn, 999, &SaleFilter::default()).await.unwrap();
        assert!(other_company.is_empty());
    }
}
