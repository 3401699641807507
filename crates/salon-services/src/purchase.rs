//! # Purchases and Stock
//!
//! Buying stock from a supplier: one stock IN per item and one cash OUT for
//! the total, committed together.

use chrono::Utc;
use tracing::info;

use salon_core::ports::Repositories;
use salon_core::stock::{
    self, NewProduct, NewStockMovement, PurchaseSettlement, RegisterPurchaseInput,
};
use salon_core::{CoreError, CoreResult, MovementType, Product, StockMovement, StockReason};

use crate::{open_register_id, rejected};

#[derive(Clone)]
pub struct PurchaseService {
    repos: Repositories,
    tenant_id: String,
}

impl PurchaseService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>) -> Self {
        PurchaseService {
            repos,
            tenant_id: tenant_id.into(),
        }
    }

    /// Registers a product with no stock; stock arrives through purchases.
    pub async fn create_product(&self, input: NewProduct) -> CoreResult<Product> {
        let product = stock::build_product(&self.tenant_id, &input, Utc::now())?;
        self.repos.products.create(&product).await?;
        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn product(&self, product_id: &str) -> CoreResult<Product> {
        self.repos
            .products
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))
    }

    /// Every stock movement of a product, oldest first.
    pub async fn movements(&self, product_id: &str) -> CoreResult<Vec<StockMovement>> {
        self.product(product_id).await?;
        self.repos.products.movements_by_product(product_id).await
    }

    /// Manual stock correction (count differences, breakage). No cash effect.
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        movement_type: MovementType,
        quantity: i64,
    ) -> CoreResult<StockMovement> {
        let movement = stock::build_stock_movement(
            &self.tenant_id,
            &NewStockMovement {
                product_id: product_id.to_string(),
                movement_type,
                quantity,
                reason: StockReason::Adjustment,
                reference_type: None,
                reference_id: None,
            },
            Utc::now(),
        )
        .map_err(|e| rejected("adjust_stock", e))?;

        self.product(product_id)
            .await
            .map_err(|e| rejected("adjust_stock", e))?;
        self.repos.products.add_movement(&movement).await?;

        info!(
            product_id = %movement.product_id,
            movement_type = ?movement.movement_type,
            quantity = movement.quantity,
            "Stock adjusted"
        );
        Ok(movement)
    }

    pub async fn register(&self, input: RegisterPurchaseInput) -> CoreResult<PurchaseSettlement> {
        let register_id = open_register_id(&self.repos).await?;
        let plan = stock::plan_purchase(&self.tenant_id, &input, register_id.as_deref(), Utc::now())
            .map_err(|e| rejected("register_purchase", e))?;

        for item in &input.items {
            self.product(&item.product_id)
                .await
                .map_err(|e| rejected("register_purchase", e))?;
        }

        self.repos
            .purchases
            .record(&plan)
            .await
            .map_err(|e| rejected("register_purchase", e))?;

        info!(
            purchase_id = %plan.purchase_id,
            supplier_id = ?plan.supplier_id,
            total_cents = plan.total_cents,
            items = plan.stock_movements.len(),
            "Purchase registered"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use salon_core::stock::PurchaseItemInput;
    use salon_core::{CashSource, ErrorKind, PaymentMethod};

    fn purchase(items: Vec<(&str, i64, i64)>, method: PaymentMethod) -> RegisterPurchaseInput {
        RegisterPurchaseInput {
            supplier_id: Some("distribuidora".into()),
            description: Some("Reposição".into()),
            items: items
                .into_iter()
                .map(|(product_id, quantity, unit_cost_cents)| PurchaseItemInput {
                    product_id: product_id.to_string(),
                    quantity,
                    unit_cost_cents,
                })
                .collect(),
            method,
            bank_account_id: None,
            created_by: None,
        }
    }

    async fn product(fx: &Fixture, name: &str) -> Product {
        fx.services
            .purchases
            .create_product(NewProduct {
                name: name.into(),
                sku: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_purchase_adds_stock_and_pays() {
        let fx = Fixture::new();
        let register = fx.open_register(0).await;
        let shampoo = product(&fx, "Shampoo").await;
        let mask = product(&fx, "Máscara").await;

        let plan = fx
            .services
            .purchases
            .register(purchase(
                vec![(&shampoo.id, 6, 1500), (&mask.id, 2, 4000)],
                PaymentMethod::Pix,
            ))
            .await
            .unwrap();
        assert_eq!(plan.total_cents, 17000);

        let p = &fx.services.purchases;
        assert_eq!(p.product(&shampoo.id).await.unwrap().current_stock, 6);
        assert_eq!(p.product(&mask.id).await.unwrap().current_stock, 2);

        let movements = p.movements(&shampoo.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::In);
        assert_eq!(movements[0].reason, StockReason::Purchase);

        let cash = fx.services.cash.get(&plan.cash_movement.id).await.unwrap();
        assert_eq!(cash.movement_type, MovementType::Out);
        assert_eq!(cash.source_type, CashSource::Purchase);
        assert_eq!(cash.amount_cents, 17000);
        assert_eq!(cash.cash_register_id.as_deref(), Some(register.id.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_product_writes_nothing() {
        let fx = Fixture::new();
        let shampoo = product(&fx, "Shampoo").await;

        let err = fx
            .services
            .purchases
            .register(purchase(
                vec![(&shampoo.id, 1, 1000), ("ghost", 1, 1000)],
                PaymentMethod::Cash,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(
            fx.services.purchases.product(&shampoo.id).await.unwrap().current_stock,
            0
        );
        assert!(fx
            .services
            .cash
            .list(&Default::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_wallet_method_is_rejected() {
        let fx = Fixture::new();
        let shampoo = product(&fx, "Shampoo").await;

        let err = fx
            .services
            .purchases
            .register(purchase(vec![(&shampoo.id, 1, 1000)], PaymentMethod::Fiado))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let fx = Fixture::new();
        let p = &fx.services.purchases;
        let shampoo = product(&fx, "Shampoo").await;

        p.adjust_stock(&shampoo.id, MovementType::In, 4).await.unwrap();
        let broken = p.adjust_stock(&shampoo.id, MovementType::Out, 1).await.unwrap();
        assert_eq!(broken.reason, StockReason::Adjustment);
        assert!(broken.reference_id.is_none());
        assert_eq!(p.product(&shampoo.id).await.unwrap().current_stock, 3);

        let err = p.adjust_stock(&shampoo.id, MovementType::In, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        let err = p.adjust_stock("ghost", MovementType::In, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(fx.services.cash.list(&Default::default()).await.unwrap().is_empty());
    }
}
