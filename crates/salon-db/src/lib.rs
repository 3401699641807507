//! # salon-db: Persistence for Salon Ledger
//!
//! Store adapters for the ports declared in `salon_core::ports`: a SQLite
//! adapter built on sqlx, and an in-memory adapter with the same semantics.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Salon Ledger Data Flow                            │
//! │                                                                         │
//! │  salon-services use case (SaleService::pay)                            │
//! │       │  repos.sales.pay(&settlement)                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     salon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ Sqlite*Repo   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ (repository/) │    │  (embedded)  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │   ┌───────────────┐    ┌───────────────┐                      │   │
//! │  │   │  MemoryStore  │    │  open_store   │ ← picks one by config│   │
//! │  │   │  (memory.rs)  │    │  (store.rs)   │                      │   │
//! │  │   └───────────────┘    └───────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)   or   process memory                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their mapping to `CoreError`
//! - [`repository`] - SQLite implementations of every port
//! - [`memory`] - In-memory implementation of every port
//! - [`store`] - Backend selection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use salon_db::{open_store, StoreConfig};
//!
//! let repos = open_store(&StoreConfig::default()).await?;
//! let open = repos.registers.get_current_open().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use pool::{Database, DbConfig};
pub use store::{open_store, StoreBackend, StoreConfig};
