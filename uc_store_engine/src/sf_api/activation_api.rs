use log::*;

use crate::{
    db_types::{Activator, OrderStatus},
    events::EventProducers,
    sf_api::{errors::OrderFlowError, publish_operator_alert, publish_order_completed, publish_order_failed},
    traits::{
        ActivationGateway,
        ActivationOutcome,
        ActivationRequest,
        ActivationResolution,
        StorefrontDatabase,
    },
};

/// The webhook status that terminates an asynchronous activation successfully.
pub const WEBHOOK_SUCCESS_STATUS: &str = "REDEEMED";
/// Webhook statuses that terminate an asynchronous activation as failed. Anything else is
/// transient: the status is persisted and a later callback decides.
pub const WEBHOOK_FAILURE_STATUSES: [&str; 4] = ["DEFERRED", "FAILED", "REJECTED", "CANCELLED"];

/// `ActivationApi` drives the redemption of reserved UC codes against the external providers.
///
/// The provider ranking is data (operator-editable, re-read per attempt), and the protocol is:
/// try each active provider in priority order, skip providers with no configured handler, treat
/// thrown provider errors as a failed attempt, stop at the first success. A provider that only
/// *accepts* the request ends the loop too; its terminal outcome arrives later via
/// [`ActivationApi::handle_webhook`].
#[derive(Clone)]
pub struct ActivationApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> ActivationApi<B, G>
where
    B: StorefrontDatabase,
    G: ActivationGateway,
{
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    /// Runs the provider priority loop for one reserved code. Resolves the code (and possibly the
    /// owning order) unless a provider accepted the request for asynchronous confirmation, in
    /// which case the code stays unresolved awaiting the webhook.
    pub async fn activate_code(&self, code: &str) -> Result<(), OrderFlowError> {
        let uc_code =
            self.db.fetch_uc_code(code).await?.ok_or_else(|| OrderFlowError::CodeNotFound(code.to_string()))?;
        if uc_code.is_activated {
            debug!("🔑️ Code {code} is already resolved. Nothing to do.");
            return Ok(());
        }
        let Some(order_id) = uc_code.order_id else {
            warn!("🔑️ Code {code} is not linked to an order. Refusing to activate loose stock.");
            return Ok(());
        };
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let Some(player_id) = order.player_id.clone() else {
            self.resolve(code, false, "No player id on the order").await?;
            return Ok(());
        };
        let priorities = self.db.fetch_activator_priorities().await?;
        if priorities.is_empty() {
            error!("🔑️ No activator priorities are configured. Failing code {code}.");
            publish_operator_alert(&self.producers, Some(order_id), "No activator priorities are configured").await;
            self.resolve(code, false, "No activators configured").await?;
            return Ok(());
        }
        let request = ActivationRequest { player_id, code: code.to_string(), amount: uc_code.amount, order_id };
        let mut last_status = String::from("No provider attempted");
        for entry in priorities {
            let provider = entry.name;
            if !self.gateway.supports(provider) {
                debug!("🔑️ Skipping provider {provider}: no handler configured");
                continue;
            }
            debug!("🔑️ Trying provider {provider} for code {code}");
            match self.gateway.redeem(provider, &request).await {
                Ok(ActivationOutcome::Success { status }) => {
                    self.db.set_code_activator(code, provider).await?;
                    info!("🔑️ Provider {provider} activated code {code}");
                    self.resolve(code, true, &status).await?;
                    return Ok(());
                },
                Ok(ActivationOutcome::Accepted) => {
                    self.db.set_code_activator(code, provider).await?;
                    self.db.set_code_status(code, "ACCEPTED").await?;
                    info!("🔑️ Provider {provider} accepted code {code}. Awaiting the webhook.");
                    return Ok(());
                },
                Ok(ActivationOutcome::Failure { status }) => {
                    warn!("🔑️ Provider {provider} declined code {code}: {status}");
                    last_status = status;
                },
                Err(e) => {
                    warn!("🔑️ Provider {provider} blew up on code {code}: {e}");
                    last_status = format!("Exception with {provider}");
                },
            }
        }
        warn!("🔑️ All providers exhausted for code {code}. Last status: {last_status}");
        self.resolve(code, false, &last_status).await?;
        Ok(())
    }

    /// Feeds an asynchronous provider callback into the same resolution path used for synchronous
    /// outcomes. Returns the resolution when the status was terminal, `None` for transient
    /// statuses and absorbed replays.
    pub async fn handle_webhook(
        &self,
        code: &str,
        status: &str,
    ) -> Result<Option<ActivationResolution>, OrderFlowError> {
        let status = status.trim().to_ascii_uppercase();
        if status == WEBHOOK_SUCCESS_STATUS {
            return self.resolve(code, true, &status).await;
        }
        if WEBHOOK_FAILURE_STATUSES.contains(&status.as_str()) {
            return self.resolve(code, false, &status).await;
        }
        debug!("🔑️ Transient webhook status {status} for code {code}. Waiting for a later callback.");
        self.db.set_code_status(code, &status).await?;
        Ok(None)
    }

    /// Applies a terminal outcome to the code and publishes any resulting order-transition
    /// notifications. Idempotent: an already-resolved code returns `None` without side effects.
    pub async fn resolve(
        &self,
        code: &str,
        success: bool,
        status: &str,
    ) -> Result<Option<ActivationResolution>, OrderFlowError> {
        let resolution = self.db.apply_activation_result(code, success, status).await?;
        if let Some(resolution) = &resolution {
            match resolution.order_transition {
                Some(OrderStatus::Completed) => {
                    let codes = self.db.codes_for_order(&resolution.order).await?;
                    publish_order_completed(&self.producers, &resolution.order, &codes).await;
                },
                Some(OrderStatus::Failed) => {
                    publish_order_failed(&self.producers, &resolution.order, status).await;
                    publish_operator_alert(
                        &self.producers,
                        Some(resolution.order.id),
                        &format!("Activation of code {code} failed: {status}"),
                    )
                    .await;
                },
                _ => {},
            }
        }
        Ok(resolution)
    }

    /// Registers or re-ranks a provider.
    pub async fn set_priority(
        &self,
        name: Activator,
        priority: i64,
        is_active: bool,
    ) -> Result<(), OrderFlowError> {
        self.db.upsert_activator_priority(name, priority, is_active).await?;
        Ok(())
    }
}
