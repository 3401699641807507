//! # Client Credit Wallet
//!
//! A client's wallet is the signed sum of its credit movements:
//! `balance = Σ CREDIT − Σ DEBIT`. The balance is never stored.
//!
//! Two ways money leaves a wallet:
//! - a sale paid with `credit`/`fiado`: debited with no sufficiency check,
//!   so a `fiado` sale can take the wallet negative (the client owes the salon)
//! - a standalone debit: rejected when the balance does not cover it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Client, CreditMovement, CreditType};
use crate::validation::{new_id, validate_positive_amount, validate_required};

/// Origin recorded when the caller does not name one.
pub const DEFAULT_ORIGIN: &str = "manual";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntryInput {
    pub client_id: String,
    pub amount_cents: i64,
    pub origin: Option<String>,
    pub note: Option<String>,
    pub sale_id: Option<String>,
}

/// Balance plus the movements it was folded from, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WalletStatement {
    pub client_id: String,
    pub balance_cents: i64,
    pub movements: Vec<CreditMovement>,
}

pub fn balance<'a, I>(movements: I) -> Money
where
    I: IntoIterator<Item = &'a CreditMovement>,
{
    movements.into_iter().map(CreditMovement::signed_amount).sum()
}

pub fn statement(client_id: &str, mut movements: Vec<CreditMovement>) -> WalletStatement {
    movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    WalletStatement {
        client_id: client_id.to_string(),
        balance_cents: balance(&movements).cents(),
        movements,
    }
}

fn build_entry(
    movement_type: CreditType,
    input: &WalletEntryInput,
    now: DateTime<Utc>,
) -> CoreResult<CreditMovement> {
    let client_id = validate_required("clientId", &input.client_id)?;
    validate_positive_amount("amount", input.amount_cents)?;

    let origin = input
        .origin
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(DEFAULT_ORIGIN);

    Ok(CreditMovement {
        id: new_id(),
        client_id: client_id.to_string(),
        movement_type,
        amount_cents: input.amount_cents,
        origin: origin.to_string(),
        note: input.note.clone(),
        sale_id: input.sale_id.clone(),
        created_at: now,
    })
}

/// Builds a CREDIT entry (top-up, store credit from a returned service).
pub fn build_credit(input: &WalletEntryInput, now: DateTime<Utc>) -> CoreResult<CreditMovement> {
    build_entry(CreditType::Credit, input, now)
}

/// Builds a standalone DEBIT entry. Sufficiency is checked by
/// [`ensure_sufficient`] against the balance read in the same unit of work.
pub fn build_debit(input: &WalletEntryInput, now: DateTime<Utc>) -> CoreResult<CreditMovement> {
    build_entry(CreditType::Debit, input, now)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: String,
    pub phone: Option<String>,
}

/// Wallet entries hang off a client; this is the minimum to open one.
pub fn build_client(tenant_id: &str, input: &NewClient, now: DateTime<Utc>) -> CoreResult<Client> {
    let name = validate_required("name", &input.name)?;
    Ok(Client {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        phone: input
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        created_at: now,
    })
}

pub fn ensure_sufficient(available: Money, requested: Money) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::rule(format!(
            "Insufficient wallet balance: available {}, requested {}",
            available, requested
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
