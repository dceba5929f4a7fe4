//! # Repository Module
//!
//! Low-level SQL operations for the Meridian schema.
//!
//! ## Connection Threading
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Repository Connection Threading                        │
//! │                                                                         │
//! │  Every repository function takes `&mut SqliteConnection` instead of    │
//! │  the pool. The caller decides the transaction scope:                   │
//! │                                                                         │
//! │  SaleEngine::create_sale                                               │
//! │       │                                                                 │
//! │       │  let mut tx = pool.begin().await?;                             │
//! │       │  numbering::next_number(&mut tx, ...)   ┐                      │
//! │       │  sale::insert_header(&mut tx, ...)      │ one atomic           │
//! │       │  sale::insert_item(&mut tx, ...)        │ unit of work         │
//! │       │  stock::adjust(&mut tx, ...)            ┘                      │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  Either everything lands or nothing does.                              │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                        │
//! │  • Transaction boundaries are visible at the call site                 │
//! │  • The same function works inside and outside a transaction            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`sale`] - Sale headers, items, payments, promotion usage, listing
//! - [`stock`] - Atomic stock counter upserts
//! - [`numbering`] - Sequential document number allocation
//! - [`lookup`] - Narrow master-data reads (products, taxes, tenancy)

pub mod lookup;
pub mod numbering;
pub mod sale;
pub mod stock;
