//! # Credit Wallet
//!
//! Top-ups and standalone spends of a client's pre-paid credit. Sale
//! payments with `credit`/`fiado` debit the wallet through
//! [`SaleService::pay`](crate::SaleService::pay) instead, without a
//! sufficiency check.

use chrono::Utc;
use tracing::info;

use salon_core::ports::Repositories;
use salon_core::wallet::{self, NewClient, WalletEntryInput, WalletStatement};
use salon_core::{Client, CoreError, CoreResult, CreditMovement, Money};

use crate::rejected;

#[derive(Clone)]
pub struct CreditWalletService {
    repos: Repositories,
    tenant_id: String,
}

impl CreditWalletService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>) -> Self {
        CreditWalletService {
            repos,
            tenant_id: tenant_id.into(),
        }
    }

    pub async fn register_client(&self, input: NewClient) -> CoreResult<Client> {
        let client = wallet::build_client(&self.tenant_id, &input, Utc::now())?;
        self.repos.clients.create(&client).await?;
        info!(client_id = %client.id, "Client registered");
        Ok(client)
    }

    pub async fn client(&self, client_id: &str) -> CoreResult<Client> {
        self.repos
            .clients
            .find_by_id(client_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Client", client_id))
    }

    /// Appends a CREDIT entry.
    pub async fn add_credit(&self, input: WalletEntryInput) -> CoreResult<CreditMovement> {
        let movement =
            wallet::build_credit(&input, Utc::now()).map_err(|e| rejected("add_credit", e))?;
        self.client(&movement.client_id).await?;

        self.repos.credits.create(&movement).await?;

        info!(
            client_id = %movement.client_id,
            amount_cents = movement.amount_cents,
            origin = %movement.origin,
            "Wallet credited"
        );
        Ok(movement)
    }

    /// Appends a DEBIT entry if the balance covers it. The store reads the
    /// balance and writes the entry in one unit of work.
    pub async fn debit(&self, input: WalletEntryInput) -> CoreResult<CreditMovement> {
        let movement =
            wallet::build_debit(&input, Utc::now()).map_err(|e| rejected("debit_wallet", e))?;
        self.client(&movement.client_id).await?;

        self.repos
            .credits
            .debit(&movement)
            .await
            .map_err(|e| rejected("debit_wallet", e))?;

        info!(
            client_id = %movement.client_id,
            amount_cents = movement.amount_cents,
            origin = %movement.origin,
            "Wallet debited"
        );
        Ok(movement)
    }

    pub async fn balance(&self, client_id: &str) -> CoreResult<Money> {
        self.client(client_id).await?;
        self.repos.credits.balance(client_id).await
    }

    /// Balance plus every movement, newest first.
    pub async fn statement(&self, client_id: &str) -> CoreResult<WalletStatement> {
        self.client(client_id).await?;
        let movements = self.repos.credits.list_by_client(client_id).await?;
        Ok(wallet::statement(client_id, movements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_client, Fixture};
    use salon_core::{CreditType, ErrorKind};

    fn entry(client_id: &str, amount: i64) -> WalletEntryInput {
        WalletEntryInput {
            client_id: client_id.to_string(),
            amount_cents: amount,
            origin: None,
            note: None,
            sale_id: None,
        }
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let fx = Fixture::new();
        let client = seed_client(&fx.services, "Beatriz").await;
        let wallet = &fx.services.wallet;

        wallet.add_credit(entry(&client.id, 10000)).await.unwrap();
        wallet.debit(entry(&client.id, 2550)).await.unwrap();

        assert_eq!(wallet.balance(&client.id).await.unwrap().cents(), 7450);

        let statement = wallet.statement(&client.id).await.unwrap();
        assert_eq!(statement.balance_cents, 7450);
        assert_eq!(statement.movements.len(), 2);
        assert!(statement
            .movements
            .iter()
            .any(|m| m.movement_type == CreditType::Debit && m.amount_cents == 2550));
    }

    #[tokio::test]
    async fn test_debit_beyond_balance_is_rejected() {
        let fx = Fixture::new();
        let client = seed_client(&fx.services, "Carla").await;
        let wallet = &fx.services.wallet;
        wallet.add_credit(entry(&client.id, 2000)).await.unwrap();

        let err = wallet.debit(entry(&client.id, 2050)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
        assert_eq!(
            err.to_string(),
            "Insufficient wallet balance: available 20, requested 20.50"
        );
        assert_eq!(wallet.balance(&client.id).await.unwrap().cents(), 2000);
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let fx = Fixture::new();
        let wallet = &fx.services.wallet;

        let err = wallet.add_credit(entry("ghost", 100)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = wallet.debit(entry("ghost", 100)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(wallet.balance("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_validation() {
        let fx = Fixture::new();
        let client = seed_client(&fx.services, "Dora").await;

        let err = fx.services.wallet.add_credit(entry(&client.id, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
