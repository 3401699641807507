//! # salon-services: Use Cases for Salon Ledger
//!
//! Every use case follows the same shape: validate the input, load what the
//! rule needs through the ports, plan the writes with a pure `salon-core`
//! function, and hand the plan to the store, which commits it as one unit.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  boundary (HTTP, desktop, CLI)                                          │
//! │       │  Envelope::from_result("pay_sale", services.sales.pay(..))     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  salon-services (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │  SaleService  CashLedgerService  CreditWalletService            │   │
//! │  │  ReceivablesService  PayablesService  CashRegisterService       │   │
//! │  │  PurchaseService                                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │  salon_core::ports::Repositories                               │
//! │       ▼                                                                 │
//! │  salon-db (SQLite or in-memory, chosen by [store] backend)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = AppConfig::load(None)?;
//! telemetry::init_tracing(&config.logging);
//!
//! let services = SalonServices::from_config(&config).await?;
//! let register = services.registers.open(OpenRegisterInput { .. }).await?;
//! ```

pub mod cash;
pub mod config;
pub mod envelope;
pub mod payables;
pub mod purchase;
pub mod receivables;
pub mod register;
pub mod sale;
pub mod telemetry;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use cash::CashLedgerService;
pub use config::{AppConfig, ConfigError, LoggingConfig, SettlementConfig};
pub use envelope::{Envelope, ErrorBody};
pub use payables::PayablesService;
pub use purchase::PurchaseService;
pub use receivables::ReceivablesService;
pub use register::CashRegisterService;
pub use sale::SaleService;
pub use wallet::CreditWalletService;

use tracing::{info, warn};

use salon_core::ports::Repositories;
use salon_core::{CoreError, CoreResult, ErrorKind};

/// Every use case, wired to one set of ports.
#[derive(Clone)]
pub struct SalonServices {
    pub sales: SaleService,
    pub cash: CashLedgerService,
    pub wallet: CreditWalletService,
    pub receivables: ReceivablesService,
    pub payables: PayablesService,
    pub registers: CashRegisterService,
    pub purchases: PurchaseService,
}

impl SalonServices {
    pub fn new(repos: Repositories, settlement: &SettlementConfig) -> Self {
        let tenant_id = settlement.tenant_id.as_str();
        SalonServices {
            sales: SaleService::new(repos.clone(), tenant_id, settlement.payment_sum_rule),
            cash: CashLedgerService::new(repos.clone(), tenant_id),
            wallet: CreditWalletService::new(repos.clone(), tenant_id),
            receivables: ReceivablesService::new(repos.clone(), tenant_id),
            payables: PayablesService::new(repos.clone(), tenant_id),
            registers: CashRegisterService::new(repos.clone(), tenant_id),
            purchases: PurchaseService::new(repos, tenant_id),
        }
    }

    /// Opens the configured store and wires every service to it.
    pub async fn from_config(config: &AppConfig) -> CoreResult<Self> {
        let repos = salon_db::open_store(&config.store).await?;
        info!(
            backend = ?config.store.backend,
            payment_sum_rule = %config.settlement.payment_sum_rule,
            "Salon services ready"
        );
        Ok(SalonServices::new(repos, &config.settlement))
    }
}

/// Id of the currently open register, if any. Money recorded while a
/// register is open is attributed to it.
pub(crate) async fn open_register_id(repos: &Repositories) -> CoreResult<Option<String>> {
    Ok(repos.registers.get_current_open().await?.map(|r| r.id))
}

/// Logs a rule rejection and passes the error through.
pub(crate) fn rejected(operation: &'static str, err: CoreError) -> CoreError {
    if err.kind() != ErrorKind::StorageError {
        warn!(operation, code = ?err.kind(), reason = %err, "Rejected");
    }
    err
}
