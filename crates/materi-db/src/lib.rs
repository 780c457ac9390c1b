//! # materi-db: Database Layer for Materi
//!
//! This crate provides database access for the Materi quote service.
//! It uses a single SQLite file with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Materi Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /quotes/save)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     materi-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SequenceRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ QuoteRepo     │    │ 001_initial  │  │   │
//! │  │   │               │    │ LineItemRepo  │    │   _schema    │  │   │
//! │  │   │               │    │ CartRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (materi.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use materi_db::{Database, DbConfig, NewQuote};
//!
//! let db = Database::new(DbConfig::new("materi.db")).await?;
//!
//! let reservation = db.sequences().reserve_next().await?;
//! let mut new = NewQuote::for_customer("vendor-1", "Acme");
//! new.quote_seq_id = Some(reservation.sequence_id);
//! let quote = db.quotes().create(new).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cart::{CartFilter, CartItemFilter, CartRepository, CartTotals, ExportReport};
pub use repository::line_item::LineItemRepository;
pub use repository::quote::{
    NewQuote, QuoteFilter, QuoteRepository, QuoteSave, QuoteUpdate, SaveReport, SaveTarget,
};
pub use repository::sequence::SequenceRepository;
pub use repository::{ItemDraft, ItemPatch};
