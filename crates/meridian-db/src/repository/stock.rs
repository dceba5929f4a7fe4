//! # Stock Repository
//!
//! Atomic stock counter mutations.
//!
//! ## Upsert Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stock Adjustment                                    │
//! │                                                                         │
//! │  adjust(tx, location, product, delta)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT (location, product, delta)                                     │
//! │    ON CONFLICT (location_id, product_id)                               │
//! │    DO UPDATE SET quantity = quantity + delta                           │
//! │                                                                         │
//! │  • Sales pass negative deltas, voids pass the positive mirror          │
//! │  • First movement for a (location, product) pair creates the row       │
//! │  • Only ever called inside the transaction that also persists the      │
//! │    originating document, so counters and documents stay consistent     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// Applies a signed quantity delta to the `(location, product)` counter,
/// creating the row on first movement.
pub async fn adjust(
    conn: &mut SqliteConnection,
    location_id: i64,
    product_id: i64,
    delta: f64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(location_id, product_id, delta, "Adjusting stock");

    sqlx::query(
        r#"
        INSERT INTO stock (location_id, product_id, quantity, reserved_quantity, last_updated)
        VALUES (?, ?, ?, 0, ?)
        ON CONFLICT (location_id, product_id)
        DO UPDATE SET quantity = quantity + excluded.quantity,
                      last_updated = excluded.last_updated
        "#,
    )
    .bind(location_id)
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Current on-hand quantity; zero when no row exists yet.
pub async fn on_hand(
    conn: &mut SqliteConnection,
    location_id: i64,
    product_id: i64,
) -> DbResult<f64> {
    let qty = sqlx::query_scalar::<_, f64>(
        "SELECT quantity FROM stock WHERE location_id = ? AND product_id = ?",
    )
    .bind(location_id)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(qty.unwrap_or(0.0))
}

// =============================================================================
// Unit Tests
// =============================================================================
