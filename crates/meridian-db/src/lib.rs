//! # meridian-db: Database Layer for the Meridian Sale Engine
//!
//! This crate provides SQLite persistence for the Meridian retail backend and
//! hosts the two transactional services built on top of it: the sale engine
//! and the POS lifecycle controller.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Meridian Data Flow                                │
//! │                                                                         │
//! │  Caller (API layer)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    meridian-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │   │
//! │  │   │  SaleEngine  │   │PosController │   │  Collaborators   │  │   │
//! │  │   │ (engine.rs)  │   │   (pos.rs)   │   │(promotion/ledger/│  │   │
//! │  │   │              │   │              │   │ loyalty traits)  │  │   │
//! │  │   └──────┬───────┘   └──────┬───────┘   └──────────────────┘  │   │
//! │  │          │                  │                                  │   │
//! │  │   ┌──────▼──────────────────▼───────┐   ┌──────────────────┐  │   │
//! │  │   │         repositories            │   │    Database      │  │   │
//! │  │   │  sale / stock / numbering /     │◄──│    (pool.rs)     │  │   │
//! │  │   │  lookup                         │   │   + migrations   │  │   │
//! │  │   └─────────────────────────────────┘   └──────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and engine error types
//! - [`repository`] - Low-level SQL operations (sale, stock, numbering, lookup)
//! - [`collaborators`] - Trait seams for external services
//! - [`engine`] - The transactional sale engine
//! - [`pos`] - The POS lifecycle controller (checkout/hold/resume/finalize/void)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig, Collaborators};
//! use meridian_core::Tenant;
//!
//! let db = Database::new(DbConfig::new("path/to/meridian.db")).await?;
//! let engine = db.engine(Collaborators::default());
//! let pos = db.pos(Collaborators::default());
//!
//! let tenant = Tenant { company_id: 1, user_id: 1 };
//! let sale = pos.checkout(tenant, request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod collaborators;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod pos;
pub mod repository;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use collaborators::{
    Collaborators, LedgerRecorder, LoyaltyAwarder, PromotionAdvisor, PromotionContext,
};
pub use engine::SaleEngine;
pub use error::{DbError, EngineError, EngineResult};
pub use pool::{Database, DbConfig};
pub use pos::PosController;
