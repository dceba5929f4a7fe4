//! # meridian-core: Pure Business Logic for the Meridian Sale Engine
//!
//! This crate is the **heart** of the Meridian retail backend. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (API layer, other services)             │   │
//! │  │    create_sale, checkout, hold, finalize, void_sale            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ meridian-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  totals   │  │ validation│  │   error   │  │   │
//! │  │   │   Sale    │  │ line math │  │   cart    │  │ CoreError │  │   │
//! │  │   │  statuses │  │ tax calc  │  │  serials  │  │  kinds    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  meridian-db (Database Layer)                   │   │
//! │  │        SQLite transactions, repositories, sale engine           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SaleItem, statuses, requests)
//! - [`totals`] - Tax and discount arithmetic, paid-amount rules
//! - [`error`] - Domain error types with NotFound/Validation/Conflict kinds
//! - [`validation`] - Cart and serial-number validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Explicit Errors**: All errors are typed, never strings or panics
//! 4. **Epsilon Comparisons**: Monetary `f64` values are never compared with
//!    `==`; all threshold checks go through [`totals::MONEY_EPSILON`]

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Sale` instead of
// `use meridian_core::types::Sale`

pub use error::{CoreError, CoreResult, ErrorKind};
pub use totals::{Totals, MONEY_EPSILON};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default zero-padding width for document numbers (e.g. `INV-000042`).
///
/// Applied when a numbering sequence is auto-provisioned; existing sequences
/// keep whatever width they were configured with.
pub const DEFAULT_SEQUENCE_LENGTH: i64 = 6;

/// Maximum line items allowed on a single sale.
///
/// Prevents runaway carts and keeps transaction sizes reasonable.
pub const MAX_SALE_LINES: usize = 100;
