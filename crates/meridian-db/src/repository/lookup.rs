//! # Lookup Repository
//!
//! Narrow master-data reads used by the engine inside its transactions:
//! product pricing metadata, tax percentages, and tenant membership checks.
//!
//! All reads run on the caller's connection so they observe the same snapshot
//! as the writes that follow them.

use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Pricing metadata for one product, scoped to a company.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductInfo {
    pub product_id: i64,
    pub name: String,
    pub selling_price: f64,
    /// Default tax applied when a line doesn't name one.
    pub tax_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_serialized: bool,
}

/// Fetches product pricing metadata. Soft-deleted products are invisible.
pub async fn product_info(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
) -> DbResult<Option<ProductInfo>> {
    let info = sqlx::query_as::<_, ProductInfo>(
        r#"
        SELECT product_id, name, selling_price, tax_id, category_id, is_serialized
          FROM products
         WHERE product_id = ? AND company_id = ? AND is_deleted = 0
        "#,
    )
    .bind(product_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;

    Ok(info)
}

/// Fetches an active tax's percentage.
pub async fn tax_percentage(
    conn: &mut SqliteConnection,
    company_id: i64,
    tax_id: i64,
) -> DbResult<Option<f64>> {
    let pct = sqlx::query_scalar::<_, f64>(
        "SELECT percentage FROM taxes WHERE tax_id = ? AND company_id = ? AND is_active = 1",
    )
    .bind(tax_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;

    Ok(pct)
}

/// True when the customer belongs to the company and isn't soft-deleted.
pub async fn customer_exists(
    conn: &mut SqliteConnection,
    company_id: i64,
    customer_id: i64,
) -> DbResult<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM customers WHERE customer_id = ? AND company_id = ? AND is_deleted = 0",
    )
    .bind(customer_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;

    Ok(found.is_some())
}

/// True when the location belongs to the company.
pub async fn location_exists(
    conn: &mut SqliteConnection,
    company_id: i64,
    location_id: i64,
) -> DbResult<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM locations WHERE location_id = ? AND company_id = ?",
    )
    .bind(location_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;

    Ok(found.is_some())
}

// =============================================================================
// Unit Tests
// =============================================================================
