use chrono::Duration;
use log::*;
use ucs_common::Usdt;

use crate::{
    db_types::{Currency, NewTopUp, TopUp},
    sf_api::errors::OrderFlowError,
    traits::{StorefrontDatabase, TopUpSweepResult},
};

/// `TopUpApi` manages balance deposits: creation with the commission-disambiguation scheme for
/// wallet deposits, the paid/credited two-step, and the expiry sweep for deposits nobody ever
/// paid.
#[derive(Clone)]
pub struct TopUpApi<B> {
    db: B,
    /// Base commission added to every wallet deposit before the uniqueness bump.
    min_commission: Usdt,
    /// RUB per USDT, for crediting ruble deposits.
    rub_usdt_rate: f64,
}

impl<B> TopUpApi<B>
where B: StorefrontDatabase
{
    pub fn new(db: B, min_commission: Usdt, rub_usdt_rate: f64) -> Self {
        Self { db, min_commission, rub_usdt_rate }
    }

    /// Creates a deposit request. Wallet deposits get a unique `to_pay` amount; ruble deposits
    /// carry the gateway payment URL instead.
    pub async fn create_topup(
        &self,
        customer_id: i64,
        amount: Usdt,
        currency: Currency,
        payment_url: Option<String>,
    ) -> Result<TopUp, OrderFlowError> {
        if amount <= Usdt::default() {
            return Err(OrderFlowError::InvalidAmount);
        }
        self.db.fetch_customer(customer_id).await?.ok_or(OrderFlowError::CustomerNotFound(customer_id))?;
        let topup = NewTopUp { customer_id, amount, currency, payment_url };
        let topup = self.db.insert_topup(topup, self.min_commission).await?;
        info!("💰️ Top-up #{} created for customer {customer_id}: {} to pay", topup.id, topup.to_pay);
        Ok(topup)
    }

    pub async fn fetch_topup(&self, topup_id: i64) -> Result<Option<TopUp>, OrderFlowError> {
        let topup = self.db.fetch_topup(topup_id).await?;
        Ok(topup)
    }

    /// Marks a deposit as observed-paid, then credits it. Crediting is guarded against double
    /// application, so replaying a payment notification is harmless.
    pub async fn confirm_payment(&self, topup_id: i64, tx_id: Option<&str>) -> Result<Option<TopUp>, OrderFlowError> {
        self.db.mark_topup_paid(topup_id, tx_id).await?;
        let credited = self.db.credit_topup(topup_id, self.rub_usdt_rate).await?;
        if credited.is_none() {
            debug!("💰️ Top-up #{topup_id} was already credited. Ignoring the replay.");
        }
        Ok(credited)
    }

    /// Deletes never-paid deposits older than `lifetime`.
    pub async fn expire_stale(&self, lifetime: Duration) -> Result<TopUpSweepResult, OrderFlowError> {
        let swept = self.db.delete_stale_topups(lifetime).await?;
        Ok(swept)
    }
}
