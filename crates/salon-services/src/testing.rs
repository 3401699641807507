//! Shared fixtures for the service unit tests (in-memory store).

use chrono::Utc;

use salon_core::ports::Repositories;
use salon_core::register::OpenRegisterInput;
use salon_core::settlement::{CreateSaleInput, NewSaleItem};
use salon_core::stock::{build_product, NewProduct};
use salon_core::wallet::NewClient;
use salon_core::{
    CashRegister, Client, ItemType, PaymentSumRule, Product, Sale, DEFAULT_TENANT_ID,
};
use salon_db::MemoryStore;

use crate::{SalonServices, SettlementConfig};

pub struct Fixture {
    pub repos: Repositories,
    pub services: SalonServices,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_rule(PaymentSumRule::Strict)
    }

    pub fn with_rule(rule: PaymentSumRule) -> Self {
        let repos = MemoryStore::new().repositories();
        let services = SalonServices::new(
            repos.clone(),
            &SettlementConfig {
                payment_sum_rule: rule,
                tenant_id: DEFAULT_TENANT_ID.to_string(),
            },
        );
        Fixture { repos, services }
    }

    pub async fn open_register(&self, initial_balance_cents: i64) -> CashRegister {
        self.services
            .registers
            .open(OpenRegisterInput {
                opened_by: "Marta".into(),
                initial_balance_cents,
            })
            .await
            .unwrap()
    }

    /// An open sale with one service line worth `total_cents`.
    pub async fn service_sale(&self, total_cents: i64) -> Sale {
        self.services
            .sales
            .create(CreateSaleInput {
                customer_id: None,
                items: vec![service_item("Corte", 1, total_cents)],
                discount_cents: 0,
                created_by: None,
            })
            .await
            .unwrap()
    }
}

pub fn product_item(product_id: &str, quantity: i64, unit_price_cents: i64) -> NewSaleItem {
    NewSaleItem {
        item_type: ItemType::Product,
        product_id: Some(product_id.to_string()),
        service_id: None,
        description: "Produto".into(),
        quantity,
        unit_price_cents,
    }
}

pub fn service_item(description: &str, quantity: i64, unit_price_cents: i64) -> NewSaleItem {
    NewSaleItem {
        item_type: ItemType::Service,
        product_id: None,
        service_id: None,
        description: description.to_string(),
        quantity,
        unit_price_cents,
    }
}

pub async fn seed_product(repos: &Repositories, name: &str, stock: i64) -> Product {
    let mut product = build_product(
        DEFAULT_TENANT_ID,
        &NewProduct {
            name: name.into(),
            sku: None,
        },
        Utc::now(),
    )
    .unwrap();
    product.current_stock = stock;
    repos.products.create(&product).await.unwrap();
    product
}

pub async fn seed_client(services: &SalonServices, name: &str) -> Client {
    services
        .wallet
        .register_client(NewClient {
            name: name.into(),
            phone: None,
        })
        .await
        .unwrap()
}
