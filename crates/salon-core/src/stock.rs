//! # Stock Movements and Purchases
//!
//! Stock is an append-only list of deltas. The only rule of its own is
//! `quantity > 0`; direction comes from the movement type.
//!
//! A purchase is the one flow that moves stock and cash together:
//! ```text
//! register(purchase)
//!   ├── stock IN  × N   (reason purchase, reference purchase id)
//!   └── cash  OUT × 1   (source PURCHASE, Σ qty * unit_cost)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    CashMovement, CashSource, MovementType, PaymentMethod, Product, ReferenceType, StockMovement,
    StockReason,
};
use crate::validation::{
    new_id, validate_positive_amount, validate_quantity, validate_required,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewStockMovement {
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: StockReason,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
}

pub fn build_stock_movement(
    tenant_id: &str,
    input: &NewStockMovement,
    now: DateTime<Utc>,
) -> CoreResult<StockMovement> {
    let product_id = validate_required("productId", &input.product_id)?;
    validate_quantity(input.quantity)?;

    Ok(StockMovement {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        product_id: product_id.to_string(),
        movement_type: input.movement_type,
        quantity: input.quantity,
        reason: input.reason,
        reference_type: input.reference_type,
        reference_id: input.reference_id.clone(),
        created_at: now,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub sku: Option<String>,
}

pub fn build_product(tenant_id: &str, input: &NewProduct, now: DateTime<Utc>) -> CoreResult<Product> {
    let name = validate_required("name", &input.name)?;
    Ok(Product {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        sku: input.sku.clone(),
        current_stock: 0,
        created_at: now,
    })
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemInput {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPurchaseInput {
    pub supplier_id: Option<String>,
    pub description: Option<String>,
    pub items: Vec<PurchaseItemInput>,
    pub method: PaymentMethod,
    pub bank_account_id: Option<String>,
    pub created_by: Option<String>,
}

/// What `register` commits in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseSettlement {
    pub purchase_id: String,
    pub tenant_id: String,
    pub supplier_id: Option<String>,
    pub description: Option<String>,
    pub total_cents: i64,
    pub stock_movements: Vec<StockMovement>,
    pub cash_movement: CashMovement,
    pub created_at: DateTime<Utc>,
}

pub fn plan_purchase(
    tenant_id: &str,
    input: &RegisterPurchaseInput,
    cash_register_id: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<PurchaseSettlement> {
    if input.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        }
        .into());
    }
    if input.method.is_wallet() {
        return Err(ValidationError::InvalidFormat {
            field: "method".to_string(),
            reason: format!("'{}' does not move cash", input.method),
        }
        .into());
    }

    let purchase_id = new_id();
    let mut total = Money::zero();
    let mut stock_movements = Vec::with_capacity(input.items.len());

    for item in &input.items {
        validate_positive_amount("unitCost", item.unit_cost_cents)?;
        stock_movements.push(build_stock_movement(
            tenant_id,
            &NewStockMovement {
                product_id: item.product_id.clone(),
                movement_type: MovementType::In,
                quantity: item.quantity,
                reason: StockReason::Purchase,
                reference_type: Some(ReferenceType::Purchase),
                reference_id: Some(purchase_id.clone()),
            },
            now,
        )?);
        total += Money::from_cents(item.unit_cost_cents) * item.quantity;
    }

    let cash_movement = CashMovement {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        movement_type: MovementType::Out,
        amount_cents: total.cents(),
        method: input.method,
        source_type: CashSource::Purchase,
        source_id: Some(purchase_id.clone()),
        bank_account_id: input.bank_account_id.clone(),
        cash_register_id: cash_register_id.map(str::to_string),
        description: input
            .description
            .clone()
            .or_else(|| Some(format!("Purchase {}", purchase_id))),
        created_by: input.created_by.clone(),
        occurred_at: now,
    };

    Ok(PurchaseSettlement {
        purchase_id,
        tenant_id: tenant_id.to_string(),
        supplier_id: input.supplier_id.clone(),
        description: input.description.clone(),
        total_cents: total.cents(),
        stock_movements,
        cash_movement,
        created_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
