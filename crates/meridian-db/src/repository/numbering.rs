//! # Numbering Repository
//!
//! Sequential document number allocation.
//!
//! ## Allocation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Number Allocation                                     │
//! │                                                                         │
//! │  next_number(tx, company, location?, "sale")                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE numbering_sequences                                            │
//! │     SET current_number = current_number + 1                            │
//! │   WHERE <best matching row> RETURNING prefix, length, number           │
//! │       │                                                                 │
//! │       ├── row found ──► format "INV-000042"                            │
//! │       │                                                                 │
//! │       └── no row ──► auto-provision with default prefix, retry         │
//! │                                                                         │
//! │  Row preference: exact (company, location, name) first, then the       │
//! │  company-wide row (location IS NULL).                                  │
//! │                                                                         │
//! │  The increment-and-return is a single statement, so SQLite's writer    │
//! │  lock guarantees two concurrent transactions never see the same        │
//! │  counter value. A failed allocation aborts the caller's transaction,   │
//! │  which may leave gaps; duplicates are impossible, gaps are not.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::DEFAULT_SEQUENCE_LENGTH;

#[derive(Debug, sqlx::FromRow)]
struct AllocatedRow {
    prefix: Option<String>,
    sequence_length: i64,
    current_number: i64,
}

/// Allocates the next document number for `(company, location?, name)` on the
/// caller's open transaction.
///
/// Auto-provisions a sequence row with a type-derived prefix and width 6 on
/// first use. Never reuses a number for the same tuple.
pub async fn next_number(
    conn: &mut SqliteConnection,
    company_id: i64,
    location_id: Option<i64>,
    name: &str,
    now: DateTime<Utc>,
) -> DbResult<String> {
    if let Some(row) = try_allocate(conn, company_id, location_id, name, now).await? {
        return Ok(format_number(&row));
    }

    // First use of this sequence: provision, then allocate again.
    let prefix = default_prefix(name);
    debug!(
        company_id,
        location_id, name, prefix, "Provisioning numbering sequence"
    );

    let provisioned = sqlx::query(
        r#"
        INSERT INTO numbering_sequences
            (company_id, location_id, name, prefix, sequence_length, current_number,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(company_id)
    .bind(location_id)
    .bind(name)
    .bind(&prefix)
    .bind(DEFAULT_SEQUENCE_LENGTH)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await;

    // A concurrent provisioner may have won the race; the retry below picks
    // up whichever row exists.
    if let Err(err) = provisioned {
        let err = DbError::from(err);
        if !matches!(err, DbError::UniqueViolation { .. }) {
            return Err(err);
        }
    }

    let row = try_allocate(conn, company_id, location_id, name, now)
        .await?
        .ok_or_else(|| {
            DbError::Internal(format!(
                "numbering sequence unavailable after provisioning: {name}"
            ))
        })?;

    Ok(format_number(&row))
}

async fn try_allocate(
    conn: &mut SqliteConnection,
    company_id: i64,
    location_id: Option<i64>,
    name: &str,
    now: DateTime<Utc>,
) -> DbResult<Option<AllocatedRow>> {
    let row = sqlx::query_as::<_, AllocatedRow>(
        r#"
        UPDATE numbering_sequences
           SET current_number = current_number + 1,
               updated_at = ?
         WHERE sequence_id = (
                   SELECT sequence_id
                     FROM numbering_sequences
                    WHERE company_id = ?
                      AND name = ?
                      AND (location_id = ? OR location_id IS NULL)
                    ORDER BY location_id IS NULL
                    LIMIT 1
               )
        RETURNING prefix, sequence_length, current_number
        "#,
    )
    .bind(now)
    .bind(company_id)
    .bind(name)
    .bind(location_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

fn format_number(row: &AllocatedRow) -> String {
    let width = row.sequence_length.max(0) as usize;
    let prefix = row.prefix.as_deref().unwrap_or("");
    format!("{prefix}{number:0width$}", number = row.current_number)
}

/// Default prefix for an auto-provisioned sequence, derived from its name.
fn default_prefix(name: &str) -> String {
    match name {
        "sale" => "INV-".to_string(),
        "quote" => "QOT-".to_string(),
        "purchase" => "PO-".to_string(),
        "sale_return" => "SR-".to_string(),
        "purchase_return" => "PR-".to_string(),
        "stock_adjustment" => "ADJ-".to_string(),
        "stock_transfer" => "ST-".to_string(),
        other => {
            let head: String = other.chars().take(3).collect();
            format!("{}-", head.to_uppercase())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
