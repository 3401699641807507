//! # In-Memory Store
//!
//! Every port over plain vectors behind one async lock.
//!
//! ## Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lock()                                                                │
//! │   ├── check every guard (status, paid amount, product exists, ...)     │
//! │   │      └── any failure → return, nothing written                     │
//! │   └── apply every write                                                │
//! │  unlock                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A procedure holds the lock from its first read to its last write, so the
//! guards see exactly the state the writes land on. Error kinds and messages
//! match the SQLite adapter.
//!
//! Intended for tests and throwaway sessions; nothing survives the process.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use salon_core::ledger::CashFilter;
use salon_core::payables::{PayableFilter, PayablePayment};
use salon_core::ports::{
    AccountPayableRepository, CashMovementRepository, CashRegisterRepository, ClientRepository,
    CreditRepository, ProductRepository, PurchaseRepository, Repositories, SaleFilter,
    SaleInstallmentRepository, SaleRepository,
};
use salon_core::receivables::{InstallmentReceipt, ReceivableFilter};
use salon_core::register::{self, RegisterClosing, ALREADY_OPEN_MESSAGE};
use salon_core::settlement::{PaymentSettlement, RefundSettlement};
use salon_core::stock::PurchaseSettlement;
use salon_core::{
    wallet, AccountPayable, AccountPayablePayment, CashMovement, CashRegister, Client, CoreResult,
    CreditMovement, CreditType, InstallmentStatus, Money, PayableStatus, Product, RegisterStatus,
    Sale, SaleInstallment, SaleStatus, StockMovement,
};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
struct PurchaseRecord {
    id: String,
    cash_movement_id: String,
}

#[derive(Debug, Default)]
struct State {
    sales: Vec<Sale>,
    cash: Vec<CashMovement>,
    products: Vec<Product>,
    stock: Vec<StockMovement>,
    clients: Vec<Client>,
    credits: Vec<CreditMovement>,
    installments: Vec<SaleInstallment>,
    payables: Vec<AccountPayable>,
    payable_payments: Vec<AccountPayablePayment>,
    registers: Vec<CashRegister>,
    purchases: Vec<PurchaseRecord>,
}

impl State {
    fn sale_index(&self, id: &str) -> DbResult<usize> {
        self.sales
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Index of a sale currently in `expected`.
    fn guarded_sale(&self, id: &str, expected: SaleStatus) -> DbResult<usize> {
        let idx = self.sale_index(id)?;
        let status = self.sales[idx].status;
        if status != expected {
            return Err(DbError::conflict(format!(
                "Sale {} is {}, expected {}",
                id, status, expected
            )));
        }
        Ok(idx)
    }

    fn ensure_products(&self, movements: &[StockMovement]) -> DbResult<()> {
        for movement in movements {
            if !self.products.iter().any(|p| p.id == movement.product_id) {
                return Err(DbError::not_found("Product", &movement.product_id));
            }
        }
        Ok(())
    }

    /// Callers check with [`ensure_products`](Self::ensure_products) first.
    fn apply_stock(&mut self, movements: &[StockMovement]) {
        for movement in movements {
            if let Some(product) = self.products.iter_mut().find(|p| p.id == movement.product_id) {
                product.current_stock += movement.delta();
            }
            self.stock.push(movement.clone());
        }
    }

    fn ensure_unique_cash(&self, movements: &[&CashMovement]) -> DbResult<()> {
        for movement in movements {
            if self.cash.iter().any(|m| m.id == movement.id) {
                return Err(DbError::UniqueViolation {
                    field: "cash_movements.id".to_string(),
                    value: movement.id.clone(),
                });
            }
        }
        Ok(())
    }

    fn wallet_balance(&self, client_id: &str) -> Money {
        wallet::balance(self.credits.iter().filter(|m| m.client_id == client_id))
    }
}

/// In-memory implementation of every store port.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every port backed by this store.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            sales: Arc::new(self.clone()),
            cash: Arc::new(self.clone()),
            products: Arc::new(self.clone()),
            clients: Arc::new(self.clone()),
            credits: Arc::new(self.clone()),
            installments: Arc::new(self.clone()),
            payables: Arc::new(self.clone()),
            registers: Arc::new(self.clone()),
            purchases: Arc::new(self.clone()),
        }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.sales.iter().any(|s| s.id == sale.id) {
            return Err(DbError::UniqueViolation {
                field: "sales.id".to_string(),
                value: sale.id.clone(),
            });
        }
        state.sales.push(sale.clone());
        Ok(())
    }

    async fn replace_sale_items(&self, sale: &Sale) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let idx = state.guarded_sale(&sale.id, SaleStatus::Open)?;
        let stored = &mut state.sales[idx];
        stored.items = sale.items.clone();
        stored.subtotal_cents = sale.subtotal_cents;
        stored.discount_cents = sale.discount_cents;
        stored.total_cents = sale.total_cents;
        stored.updated_at = sale.updated_at;
        Ok(())
    }

    async fn set_sale_status(&self, id: &str, from: SaleStatus, to: SaleStatus) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let idx = state.guarded_sale(id, from)?;
        let stored = &mut state.sales[idx];
        stored.status = to;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn settle_payment(&self, settlement: &PaymentSettlement) -> DbResult<()> {
        let mut state = self.state.lock().await;

        let idx = state.guarded_sale(&settlement.sale_id, SaleStatus::Open)?;
        state.ensure_products(&settlement.stock_movements)?;
        state.ensure_unique_cash(&settlement.cash_movements.iter().collect::<Vec<_>>())?;

        let sale = &mut state.sales[idx];
        sale.status = SaleStatus::Paid;
        sale.paid_at = Some(settlement.paid_at);
        sale.updated_at = settlement.paid_at;

        state.cash.extend(settlement.cash_movements.iter().cloned());
        state.apply_stock(&settlement.stock_movements);
        if let Some(debit) = &settlement.wallet_debit {
            state.credits.push(debit.clone());
        }
        Ok(())
    }

    async fn settle_refund(&self, settlement: &RefundSettlement) -> DbResult<()> {
        let mut state = self.state.lock().await;

        let idx = state.guarded_sale(&settlement.sale_id, SaleStatus::Paid)?;
        state.ensure_products(&settlement.stock_movements)?;

        let sale = &mut state.sales[idx];
        sale.status = SaleStatus::Refunded;
        sale.updated_at = settlement.refunded_at;

        state.apply_stock(&settlement.stock_movements);
        Ok(())
    }

    // =========================================================================
    // Payables
    // =========================================================================

    async fn apply_payable_payment(&self, plan: &PayablePayment) -> DbResult<()> {
        let mut state = self.state.lock().await;

        let idx = state
            .payables
            .iter()
            .position(|a| a.id == plan.account_payable_id)
            .ok_or_else(|| DbError::not_found("Account payable", &plan.account_payable_id))?;

        let account = &state.payables[idx];
        if account.status.is_settled() || account.paid_amount_cents != plan.expected_paid_amount_cents {
            return Err(DbError::conflict(format!(
                "Account payable {} changed since the payment was planned ({:?}, paid {})",
                account.id, account.status, account.paid_amount_cents
            )));
        }
        state.ensure_unique_cash(&[&plan.cash_movement])?;

        let account = &mut state.payables[idx];
        account.paid_amount_cents = plan.new_paid_amount_cents;
        account.status = plan.new_status;
        account.updated_at = plan.updated_at;

        state.cash.push(plan.cash_movement.clone());
        state.payable_payments.push(plan.payment.clone());
        Ok(())
    }

    async fn cancel_payable(&self, id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;

        let account = state
            .payables
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DbError::not_found("Account payable", id))?;

        match account.status {
            PayableStatus::Paid => Err(DbError::conflict(format!(
                "Account payable {} is paid and cannot be cancelled",
                id
            ))),
            PayableStatus::Cancelled => Err(DbError::conflict(format!(
                "Account payable {} is already cancelled",
                id
            ))),
            _ => {
                account.status = PayableStatus::Cancelled;
                account.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    // =========================================================================
    // Receivables
    // =========================================================================

    async fn insert_installments(&self, installments: &[SaleInstallment]) -> DbResult<()> {
        let mut state = self.state.lock().await;

        let mut taken: HashSet<(String, i64)> = state
            .installments
            .iter()
            .map(|i| (i.sale_id.clone(), i.installment_number))
            .collect();
        for inst in installments {
            if !taken.insert((inst.sale_id.clone(), inst.installment_number)) {
                return Err(DbError::conflict(format!(
                    "Sale {} already has installment {}",
                    inst.sale_id, inst.installment_number
                )));
            }
        }

        state.installments.extend(installments.iter().cloned());
        Ok(())
    }

    async fn receive_installment(&self, receipt: &InstallmentReceipt) -> DbResult<()> {
        let mut state = self.state.lock().await;

        let idx = state
            .installments
            .iter()
            .position(|i| i.id == receipt.installment_id)
            .ok_or_else(|| DbError::not_found("Installment", &receipt.installment_id))?;
        if state.installments[idx].status != InstallmentStatus::Pending {
            return Err(DbError::conflict(format!(
                "Installment {} has already been received",
                receipt.installment_id
            )));
        }
        state.ensure_unique_cash(&[&receipt.cash_movement])?;

        let inst = &mut state.installments[idx];
        inst.status = InstallmentStatus::Received;
        inst.received_amount_cents = Some(receipt.received_amount_cents);
        inst.received_at = Some(receipt.received_at);
        inst.bank_account_id = receipt.bank_account_id.clone();
        inst.payment_method = Some(receipt.payment_method);
        inst.notes = receipt.notes.clone();

        state.cash.push(receipt.cash_movement.clone());
        Ok(())
    }

    // =========================================================================
    // Registers, Wallet, Purchases
    // =========================================================================

    async fn open_register(&self, register: &CashRegister) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.registers.iter().any(|r| r.status == RegisterStatus::Open) {
            return Err(DbError::conflict(ALREADY_OPEN_MESSAGE));
        }
        state.registers.push(register.clone());
        Ok(())
    }

    async fn close_register(&self, closing: &RegisterClosing) -> DbResult<CashRegister> {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let session = state
            .registers
            .iter_mut()
            .find(|r| r.id == closing.register_id)
            .ok_or_else(|| DbError::not_found("Cash register", &closing.register_id))?;

        if session.status == RegisterStatus::Closed {
            return Err(DbError::conflict(format!(
                "Cash register {} is already closed",
                closing.register_id
            )));
        }

        let expected = register::expected_balance(session, &state.cash);
        session.status = RegisterStatus::Closed;
        session.closed_at = Some(closing.closed_at);
        session.closed_by = Some(closing.closed_by.clone());
        session.closing_balance_cents = Some(closing.closing_balance_cents);
        session.difference_cents = Some(closing.closing_balance_cents - expected.cents());
        Ok(session.clone())
    }

    async fn checked_debit(&self, movement: &CreditMovement) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if !state.clients.iter().any(|c| c.id == movement.client_id) {
            return Err(DbError::not_found("Client", &movement.client_id));
        }
        let available = state.wallet_balance(&movement.client_id);
        wallet::ensure_sufficient(available, Money::from_cents(movement.amount_cents))
            .map_err(|e| DbError::Rule(e.to_string()))?;
        state.credits.push(movement.clone());
        Ok(())
    }

    async fn record_purchase(&self, purchase: &PurchaseSettlement) -> DbResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_products(&purchase.stock_movements)?;
        state.ensure_unique_cash(&[&purchase.cash_movement])?;

        state.cash.push(purchase.cash_movement.clone());
        state.purchases.push(PurchaseRecord {
            id: purchase.purchase_id.clone(),
            cash_movement_id: purchase.cash_movement.id.clone(),
        });
        state.apply_stock(&purchase.stock_movements);
        Ok(())
    }

    /// Recorded purchases as `(purchase id, cash movement id)`.
    pub async fn purchases(&self) -> Vec<(String, String)> {
        let state = self.state.lock().await;
        state
            .purchases
            .iter()
            .map(|p| (p.id.clone(), p.cash_movement_id.clone()))
            .collect()
    }
}

// =============================================================================
// Ports
// =============================================================================

#[async_trait]
impl SaleRepository for MemoryStore {
    async fn create(&self, sale: &Sale) -> CoreResult<()> {
        Ok(self.insert_sale(sale).await?)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Sale>> {
        let state = self.state.lock().await;
        Ok(state.sales.iter().find(|s| s.id == id).cloned())
    }

    async fn list(&self, filter: &SaleFilter) -> CoreResult<Vec<Sale>> {
        let state = self.state.lock().await;
        let mut sales: Vec<Sale> = state
            .sales
            .iter()
            .rev()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    async fn update_items(&self, sale: &Sale) -> CoreResult<()> {
        Ok(self.replace_sale_items(sale).await?)
    }

    async fn transition(&self, id: &str, from: SaleStatus, to: SaleStatus) -> CoreResult<()> {
        Ok(self.set_sale_status(id, from, to).await?)
    }

    async fn pay(&self, settlement: &PaymentSettlement) -> CoreResult<()> {
        Ok(self.settle_payment(settlement).await?)
    }

    async fn refund(&self, settlement: &RefundSettlement) -> CoreResult<()> {
        Ok(self.settle_refund(settlement).await?)
    }
}

#[async_trait]
impl CashMovementRepository for MemoryStore {
    async fn create(&self, movement: &CashMovement) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_unique_cash(&[movement])?;
        state.cash.push(movement.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<CashMovement>> {
        let state = self.state.lock().await;
        Ok(state.cash.iter().find(|m| m.id == id).cloned())
    }

    async fn list(&self, filter: &CashFilter) -> CoreResult<Vec<CashMovement>> {
        let state = self.state.lock().await;
        let mut movements: Vec<CashMovement> = state
            .cash
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(movements)
    }

    async fn list_by_source(&self, source_id: &str) -> CoreResult<Vec<CashMovement>> {
        let state = self.state.lock().await;
        let mut movements: Vec<CashMovement> = state
            .cash
            .iter()
            .filter(|m| m.source_id.as_deref() == Some(source_id))
            .cloned()
            .collect();
        movements.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
        Ok(movements)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: &Product) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.products.iter().any(|p| p.id == product.id) {
            return Err(DbError::UniqueViolation {
                field: "products.id".to_string(),
                value: product.id.clone(),
            }
            .into());
        }
        state.products.push(product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn add_movement(&self, movement: &StockMovement) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let batch = std::slice::from_ref(movement);
        state.ensure_products(batch)?;
        state.apply_stock(batch);
        Ok(())
    }

    async fn movements_by_product(&self, product_id: &str) -> CoreResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        Ok(state
            .stock
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn movements_by_reference(&self, reference_id: &str) -> CoreResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        Ok(state
            .stock
            .iter()
            .filter(|m| m.reference_id.as_deref() == Some(reference_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn create(&self, client: &Client) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.clients.iter().any(|c| c.id == client.id) {
            return Err(DbError::UniqueViolation {
                field: "clients.id".to_string(),
                value: client.id.clone(),
            }
            .into());
        }
        state.clients.push(client.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Client>> {
        let state = self.state.lock().await;
        Ok(state.clients.iter().find(|c| c.id == id).cloned())
    }
}

#[async_trait]
impl CreditRepository for MemoryStore {
    async fn create(&self, movement: &CreditMovement) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.credits.push(movement.clone());
        Ok(())
    }

    async fn debit(&self, movement: &CreditMovement) -> CoreResult<()> {
        if movement.movement_type != CreditType::Debit {
            return Err(DbError::Internal(format!(
                "debit called with a {:?} entry",
                movement.movement_type
            ))
            .into());
        }
        Ok(self.checked_debit(movement).await?)
    }

    async fn list_by_client(&self, client_id: &str) -> CoreResult<Vec<CreditMovement>> {
        let state = self.state.lock().await;
        Ok(state
            .credits
            .iter()
            .filter(|m| m.client_id == client_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SaleInstallmentRepository for MemoryStore {
    async fn create_batch(&self, installments: &[SaleInstallment]) -> CoreResult<()> {
        Ok(self.insert_installments(installments).await?)
    }

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<SaleInstallment>> {
        let state = self.state.lock().await;
        Ok(state.installments.iter().find(|i| i.id == id).cloned())
    }

    async fn get_by_sale_id(&self, sale_id: &str) -> CoreResult<Vec<SaleInstallment>> {
        let state = self.state.lock().await;
        let mut installments: Vec<SaleInstallment> = state
            .installments
            .iter()
            .filter(|i| i.sale_id == sale_id)
            .cloned()
            .collect();
        installments.sort_by_key(|i| i.installment_number);
        Ok(installments)
    }

    async fn get_pending(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        let state = self.state.lock().await;
        let mut installments: Vec<SaleInstallment> = state
            .installments
            .iter()
            .filter(|i| filter.matches_pending(i))
            .cloned()
            .collect();
        installments.sort_by_key(|i| (i.due_date, i.installment_number));
        Ok(installments)
    }

    async fn get_received(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        let state = self.state.lock().await;
        let mut installments: Vec<SaleInstallment> = state
            .installments
            .iter()
            .rev()
            .filter(|i| filter.matches_received(i))
            .cloned()
            .collect();
        installments.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(installments)
    }

    async fn register_receipt(&self, receipt: &InstallmentReceipt) -> CoreResult<()> {
        Ok(self.receive_installment(receipt).await?)
    }
}

#[async_trait]
impl AccountPayableRepository for MemoryStore {
    async fn create(&self, account: &AccountPayable) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.payables.push(account.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<AccountPayable>> {
        let state = self.state.lock().await;
        Ok(state.payables.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, filter: &PayableFilter) -> CoreResult<Vec<AccountPayable>> {
        let state = self.state.lock().await;
        let mut accounts: Vec<AccountPayable> = state
            .payables
            .iter()
            .filter(|a| filter.matches_stored(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| (a.due_date, a.created_at).cmp(&(b.due_date, b.created_at)));
        Ok(accounts)
    }

    async fn register_payment(&self, payment: &PayablePayment) -> CoreResult<()> {
        Ok(self.apply_payable_payment(payment).await?)
    }

    async fn cancel(&self, id: &str) -> CoreResult<()> {
        Ok(self.cancel_payable(id).await?)
    }

    async fn payments(&self, account_payable_id: &str) -> CoreResult<Vec<AccountPayablePayment>> {
        let state = self.state.lock().await;
        let mut payments: Vec<AccountPayablePayment> = state
            .payable_payments
            .iter()
            .filter(|p| p.account_payable_id == account_payable_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.paid_at.cmp(&b.paid_at));
        Ok(payments)
    }
}

#[async_trait]
impl CashRegisterRepository for MemoryStore {
    async fn create(&self, register: &CashRegister) -> CoreResult<()> {
        Ok(self.open_register(register).await?)
    }

    async fn get_current_open(&self) -> CoreResult<Option<CashRegister>> {
        let state = self.state.lock().await;
        Ok(state
            .registers
            .iter()
            .find(|r| r.status == RegisterStatus::Open)
            .cloned())
    }

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<CashRegister>> {
        let state = self.state.lock().await;
        Ok(state.registers.iter().find(|r| r.id == id).cloned())
    }

    async fn close(&self, closing: &RegisterClosing) -> CoreResult<CashRegister> {
        Ok(self.close_register(closing).await?)
    }
}

#[async_trait]
impl PurchaseRepository for MemoryStore {
    async fn record(&self, purchase: &PurchaseSettlement) -> CoreResult<()> {
        Ok(self.record_purchase(purchase).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use salon_core::register::{build_register, OpenRegisterInput};
    use salon_core::settlement::{
        new_sale, plan_payment, CreateSaleInput, NewSaleItem, PaySaleInput, PaymentLine,
        PaymentSumRule,
    };
    use salon_core::wallet::{build_credit, build_debit, WalletEntryInput};
    use salon_core::{CoreError, ErrorKind, ItemType, PaymentMethod, DEFAULT_TENANT_ID};

    fn product(id: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: "Shampoo".to_string(),
            sku: None,
            current_stock: stock,
            created_at: Utc::now(),
        }
    }

    fn sale_of(product_id: &str, quantity: i64) -> Sale {
        new_sale(
            DEFAULT_TENANT_ID,
            &CreateSaleInput {
                customer_id: None,
                items: vec![NewSaleItem {
                    item_type: ItemType::Product,
                    product_id: Some(product_id.to_string()),
                    service_id: None,
                    description: "Shampoo".to_string(),
                    quantity,
                    unit_price_cents: 2000,
                }],
                discount_cents: 0,
                created_by: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn cash_payment(sale: &Sale) -> PaymentSettlement {
        plan_payment(
            sale,
            &PaySaleInput {
                sale_id: sale.id.clone(),
                payments: vec![PaymentLine {
                    method: PaymentMethod::Cash,
                    amount_cents: sale.total_cents,
                    change_cents: None,
                    bank_account_id: None,
                }],
                created_by: None,
            },
            PaymentSumRule::Strict,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_pay_is_all_or_nothing() {
        let store = MemoryStore::new();
        let repos = store.repositories();
        repos.products.create(&product("p1", 5)).await.unwrap();

        let good = sale_of("p1", 2);
        repos.sales.create(&good).await.unwrap();
        repos.sales.pay(&cash_payment(&good)).await.unwrap();
        assert_eq!(
            repos.products.find_by_id("p1").await.unwrap().unwrap().current_stock,
            3
        );

        let bad = sale_of("ghost", 1);
        repos.sales.create(&bad).await.unwrap();
        let err = repos.sales.pay(&cash_payment(&bad)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repos.cash.list_by_source(&bad.id).await.unwrap().is_empty());
        assert_eq!(
            repos.sales.find_by_id(&bad.id).await.unwrap().unwrap().status,
            SaleStatus::Open
        );
    }

    #[tokio::test]
    async fn test_stale_payment_conflicts() {
        let store = MemoryStore::new();
        let repos = store.repositories();
        repos.products.create(&product("p1", 5)).await.unwrap();

        let sale = sale_of("p1", 1);
        repos.sales.create(&sale).await.unwrap();
        let first = cash_payment(&sale);
        let second = cash_payment(&sale);

        repos.sales.pay(&first).await.unwrap();
        let err = repos.sales.pay(&second).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(repos.cash.list_by_source(&sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_open_register() {
        let repos = MemoryStore::new().repositories();
        let input = OpenRegisterInput {
            opened_by: "ana".into(),
            initial_balance_cents: 0,
        };

        repos
            .registers
            .create(&build_register(DEFAULT_TENANT_ID, &input, Utc::now()).unwrap())
            .await
            .unwrap();
        let err = repos
            .registers
            .create(&build_register(DEFAULT_TENANT_ID, &input, Utc::now()).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, CoreError::conflict(ALREADY_OPEN_MESSAGE));
    }

    #[tokio::test]
    async fn test_wallet_debit_checks_balance() {
        let repos = MemoryStore::new().repositories();
        repos
            .clients
            .create(&Client {
                id: "c-1".into(),
                tenant_id: DEFAULT_TENANT_ID.into(),
                name: "Ana".into(),
                phone: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let entry = |amount_cents| WalletEntryInput {
            client_id: "c-1".into(),
            amount_cents,
            origin: None,
            note: None,
            sale_id: None,
        };

        repos
            .credits
            .create(&build_credit(&entry(3000), Utc::now()).unwrap())
            .await
            .unwrap();
        repos
            .credits
            .debit(&build_debit(&entry(1000), Utc::now()).unwrap())
            .await
            .unwrap();
        let err = repos
            .credits
            .debit(&build_debit(&entry(2001), Utc::now()).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
        assert_eq!(
            repos.credits.balance("c-1").await.unwrap(),
            Money::from_cents(2000)
        );
    }

    #[tokio::test]
    async fn test_purchase_records_cash_and_stock() {
        use salon_core::stock::{plan_purchase, PurchaseItemInput, RegisterPurchaseInput};

        let store = MemoryStore::new();
        let repos = store.repositories();
        repos.products.create(&product("p1", 0)).await.unwrap();

        let plan = plan_purchase(
            DEFAULT_TENANT_ID,
            &RegisterPurchaseInput {
                supplier_id: None,
                description: None,
                items: vec![PurchaseItemInput {
                    product_id: "p1".into(),
                    quantity: 6,
                    unit_cost_cents: 900,
                }],
                method: PaymentMethod::Cash,
                bank_account_id: None,
                created_by: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        repos.purchases.record(&plan).await.unwrap();

        assert_eq!(
            store.purchases().await,
            vec![(plan.purchase_id.clone(), plan.cash_movement.id.clone())]
        );
        assert_eq!(
            repos.products.find_by_id("p1").await.unwrap().unwrap().current_stock,
            6
        );
    }
}
