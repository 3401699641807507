//! End-to-end settlement scenarios against the SQLite backend, wired the
//! way an application wires it: configuration → store factory → services.

use chrono::{Duration, Utc};

use salon_core::payables::{CreatePayableInput, PayablePaymentInput};
use salon_core::receivables::{CreateInstallmentsInput, InstallmentInput, ReceiptInput};
use salon_core::register::OpenRegisterInput;
use salon_core::settlement::{CreateSaleInput, NewSaleItem, PaySaleInput, PaymentLine};
use salon_core::stock::{NewProduct, PurchaseItemInput, RegisterPurchaseInput};
use salon_core::wallet::{NewClient, WalletEntryInput};
use salon_core::{
    CreditType, ErrorKind, ItemType, MovementType, PaymentMethod, Product, ReferenceType, Sale,
    SaleStatus, StockReason,
};
use salon_services::{AppConfig, Envelope, SalonServices};

async fn services() -> SalonServices {
    // Default store: SQLite, no path → private in-memory database.
    SalonServices::from_config(&AppConfig::default()).await.unwrap()
}

async fn stocked_product(services: &SalonServices, name: &str, quantity: i64) -> Product {
    let product = services
        .purchases
        .create_product(NewProduct {
            name: name.into(),
            sku: None,
        })
        .await
        .unwrap();
    services
        .purchases
        .register(RegisterPurchaseInput {
            supplier_id: None,
            description: None,
            items: vec![PurchaseItemInput {
                product_id: product.id.clone(),
                quantity,
                unit_cost_cents: 1000,
            }],
            method: PaymentMethod::Cash,
            bank_account_id: None,
            created_by: None,
        })
        .await
        .unwrap();
    services.purchases.product(&product.id).await.unwrap()
}

async fn product_sale(
    services: &SalonServices,
    customer_id: Option<String>,
    product: &Product,
    quantity: i64,
    unit_price_cents: i64,
) -> Sale {
    services
        .sales
        .create(CreateSaleInput {
            customer_id,
            items: vec![NewSaleItem {
                item_type: ItemType::Product,
                product_id: Some(product.id.clone()),
                service_id: None,
                description: product.name.clone(),
                quantity,
                unit_price_cents,
            }],
            discount_cents: 0,
            created_by: Some("front-desk".into()),
        })
        .await
        .unwrap()
}

fn one_line(sale: &Sale, method: PaymentMethod) -> PaySaleInput {
    PaySaleInput {
        sale_id: sale.id.clone(),
        payments: vec![PaymentLine {
            method,
            amount_cents: sale.total_cents,
            change_cents: None,
            bank_account_id: None,
        }],
        created_by: None,
    }
}

fn installments(sale_id: &str, parts: &[(i64, i64)]) -> CreateInstallmentsInput {
    let today = Utc::now().date_naive();
    CreateInstallmentsInput {
        sale_id: sale_id.to_string(),
        client_id: None,
        installments: parts
            .iter()
            .map(|&(number, amount)| InstallmentInput {
                installment_number: number,
                amount_cents: amount,
                due_date: today + Duration::days(30 * number),
            })
            .collect(),
    }
}

// =============================================================================
// Receivables
// =============================================================================

#[tokio::test]
async fn test_installments_out_of_order_are_sorted() {
    let services = services().await;
    let product = stocked_product(&services, "Escova", 3).await;
    let sale = product_sale(&services, None, &product, 1, 10000).await;

    let ids = services
        .receivables
        .create_installment_sale(installments(&sale.id, &[(2, 5000), (1, 5000)]))
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    let stored = services.receivables.by_sale(&sale.id).await.unwrap();
    let numbers: Vec<i64> = stored.iter().map(|i| i.installment_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(stored[0].id, ids[0]);
}

#[tokio::test]
async fn test_installments_with_a_gap_are_rejected() {
    let services = services().await;
    let product = stocked_product(&services, "Escova", 3).await;
    let sale = product_sale(&services, None, &product, 1, 10000).await;

    let err = services
        .receivables
        .create_installment_sale(installments(&sale.id, &[(1, 5000), (3, 5000)]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    assert_eq!(
        err.to_string(),
        "Installment numbers must be sequential starting from 1"
    );
    assert!(services.receivables.by_sale(&sale.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_installment_receipt_lands_in_the_ledger() {
    let services = services().await;
    let product = stocked_product(&services, "Escova", 3).await;
    let sale = product_sale(&services, None, &product, 1, 10000).await;
    let ids = services
        .receivables
        .create_installment_sale(installments(&sale.id, &[(1, 5000), (2, 5000)]))
        .await
        .unwrap();

    let movement_id = services
        .receivables
        .register_receipt(ReceiptInput {
            installment_id: ids[0].clone(),
            received_amount_cents: 5000,
            received_at: None,
            bank_account_id: Some("nubank".into()),
            payment_method: PaymentMethod::Pix,
            notes: Some("adiantado".into()),
            created_by: None,
        })
        .await
        .unwrap();

    let movement = services.cash.get(&movement_id).await.unwrap();
    assert_eq!(movement.amount_cents, 5000);
    assert_eq!(movement.movement_type, MovementType::In);

    let summary = services.receivables.summary().await.unwrap();
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.total_pending_cents, 5000);
}

// =============================================================================
// Payables
// =============================================================================

#[tokio::test]
async fn test_payable_payment_cannot_exceed_remaining_balance() {
    let services = services().await;
    let account = services
        .payables
        .create(CreatePayableInput {
            description: "Fornecedor de cosméticos".into(),
            amount_cents: 10000,
            due_date: Some(Utc::now().date_naive() + Duration::days(10)),
            supplier_id: None,
            category: None,
            notes: None,
        })
        .await
        .unwrap();

    let pay = |amount_cents: i64| PayablePaymentInput {
        account_payable_id: account.id.clone(),
        amount_cents,
        paid_at: Some(Utc::now()),
        method: PaymentMethod::BankTransfer,
        bank_account_id: None,
        notes: None,
        created_by: None,
    };

    services.payables.register_payment(pay(8000)).await.unwrap();

    let err = services.payables.register_payment(pay(3000)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    assert_eq!(
        err.to_string(),
        "Payment amount (30) exceeds remaining balance (20)"
    );

    let stored = services.payables.get(&account.id).await.unwrap();
    assert_eq!(stored.paid_amount_cents, 8000);
    assert_eq!(services.payables.payments(&account.id).await.unwrap().len(), 1);
}

// =============================================================================
// Cash register
// =============================================================================

#[tokio::test]
async fn test_only_one_register_can_be_open() {
    let services = services().await;
    services
        .registers
        .open(OpenRegisterInput {
            opened_by: "Marta".into(),
            initial_balance_cents: 20000,
        })
        .await
        .unwrap();

    let result = services
        .registers
        .open(OpenRegisterInput {
            opened_by: "Joana".into(),
            initial_balance_cents: 0,
        })
        .await;
    let envelope = Envelope::from_result("open_register", result);

    assert!(!envelope.success);
    let error = envelope.error.unwrap();
    assert_eq!(error.code, ErrorKind::StateConflict);
    assert_eq!(
        error.message,
        "Cannot open a new cash register while another one is already open"
    );
}

// =============================================================================
// Sale settlement
// =============================================================================

#[tokio::test]
async fn test_wallet_payment_deducts_stock_and_debits_wallet() {
    let services = services().await;
    let client = services
        .wallet
        .register_client(NewClient {
            name: "Fernanda".into(),
            phone: Some("11 99999-0000".into()),
        })
        .await
        .unwrap();
    let product = stocked_product(&services, "Condicionador", 5).await;
    let sale = product_sale(&services, Some(client.id.clone()), &product, 2, 2000).await;
    assert_eq!(sale.total_cents, 4000);

    services
        .sales
        .pay(one_line(&sale, PaymentMethod::StoreCredit))
        .await
        .unwrap();

    let movements = services.purchases.movements(&product.id).await.unwrap();
    let out: Vec<_> = movements
        .iter()
        .filter(|m| m.movement_type == MovementType::Out)
        .collect();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].quantity, 2);
    assert_eq!(out[0].reason, StockReason::Sale);
    assert_eq!(out[0].reference_id.as_deref(), Some(sale.id.as_str()));
    assert_eq!(services.purchases.product(&product.id).await.unwrap().current_stock, 3);

    let statement = services.wallet.statement(&client.id).await.unwrap();
    assert_eq!(statement.movements.len(), 1);
    assert_eq!(statement.movements[0].movement_type, CreditType::Debit);
    assert_eq!(statement.movements[0].amount_cents, 4000);
    assert_eq!(statement.balance_cents, -4000);

    assert_eq!(services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Paid);
    assert!(services
        .cash
        .list(&Default::default())
        .await
        .unwrap()
        .iter()
        .all(|m| m.source_id.as_deref() != Some(sale.id.as_str())));
}

#[tokio::test]
async fn test_change_on_wallet_line_is_rejected() {
    let services = services().await;
    let client = services
        .wallet
        .register_client(NewClient {
            name: "Helena".into(),
            phone: None,
        })
        .await
        .unwrap();
    let product = stocked_product(&services, "Máscara", 2).await;
    let sale = product_sale(&services, Some(client.id.clone()), &product, 1, 4500).await;

    let err = services
        .sales
        .pay(PaySaleInput {
            sale_id: sale.id.clone(),
            payments: vec![PaymentLine {
                method: PaymentMethod::StoreCredit,
                amount_cents: 5000,
                change_cents: Some(500),
                bank_account_id: None,
            }],
            created_by: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);

    assert_eq!(services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Open);
    assert!(services.wallet.statement(&client.id).await.unwrap().movements.is_empty());
    assert_eq!(services.purchases.product(&product.id).await.unwrap().current_stock, 2);
}

#[tokio::test]
async fn test_oversized_payment_lines_are_rejected() {
    let services = services().await;
    let product = stocked_product(&services, "Escova", 1).await;
    let sale = product_sale(&services, None, &product, 1, 100).await;

    let line = |amount_cents| PaymentLine {
        method: PaymentMethod::Cash,
        amount_cents,
        change_cents: None,
        bank_account_id: None,
    };
    let err = services
        .sales
        .pay(PaySaleInput {
            sale_id: sale.id.clone(),
            payments: vec![line(i64::MAX), line(i64::MAX), line(102)],
            created_by: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    assert_eq!(services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Open);
    assert_eq!(services.purchases.product(&product.id).await.unwrap().current_stock, 1);
}

#[tokio::test]
async fn test_refund_returns_stock_once() {
    let services = services().await;
    let product = stocked_product(&services, "Condicionador", 5).await;
    let sale = product_sale(&services, None, &product, 2, 2000).await;
    services.sales.pay(one_line(&sale, PaymentMethod::Cash)).await.unwrap();
    assert_eq!(services.purchases.product(&product.id).await.unwrap().current_stock, 3);

    services.sales.refund(&sale.id).await.unwrap();

    let refund_moves: Vec<_> = services
        .purchases
        .movements(&product.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.reason == StockReason::Refund)
        .collect();
    assert_eq!(refund_moves.len(), 1);
    assert_eq!(refund_moves[0].movement_type, MovementType::In);
    assert_eq!(refund_moves[0].quantity, 2);
    assert_eq!(refund_moves[0].reference_type, Some(ReferenceType::Sale));
    assert_eq!(refund_moves[0].reference_id.as_deref(), Some(sale.id.as_str()));

    assert_eq!(services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Refunded);
    assert_eq!(services.purchases.product(&product.id).await.unwrap().current_stock, 5);

    let trail = services.sales.stock_movements(&sale.id).await.unwrap();
    let reasons: Vec<StockReason> = trail.iter().map(|m| m.reason).collect();
    assert_eq!(reasons, vec![StockReason::Sale, StockReason::Refund]);

    let err = services.sales.refund(&sale.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
}

#[tokio::test]
async fn test_concurrent_payments_settle_once() {
    let services = services().await;
    let product = stocked_product(&services, "Pomada", 4).await;
    let sale = product_sale(&services, None, &product, 1, 3500).await;

    let (a, b) = tokio::join!(
        services.sales.pay(one_line(&sale, PaymentMethod::Cash)),
        services.sales.pay(one_line(&sale, PaymentMethod::Pix)),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let failure = a.err().or(b.err()).unwrap();
    assert_eq!(failure.kind(), ErrorKind::StateConflict);

    assert_eq!(services.purchases.product(&product.id).await.unwrap().current_stock, 3);
}

#[tokio::test]
async fn test_standalone_debit_checks_balance() {
    let services = services().await;
    let client = services
        .wallet
        .register_client(NewClient {
            name: "Gabriela".into(),
            phone: None,
        })
        .await
        .unwrap();

    let entry = |amount_cents: i64| WalletEntryInput {
        client_id: client.id.clone(),
        amount_cents,
        origin: Some("balcão".into()),
        note: None,
        sale_id: None,
    };

    services.wallet.add_credit(entry(5000)).await.unwrap();
    services.wallet.debit(entry(3000)).await.unwrap();

    let err = services.wallet.debit(entry(2001)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    assert_eq!(services.wallet.balance(&client.id).await.unwrap().cents(), 2000);
}
