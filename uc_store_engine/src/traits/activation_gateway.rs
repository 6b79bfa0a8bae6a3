use thiserror::Error;

use crate::db_types::Activator;

#[derive(Debug, Clone, Error)]
pub enum ActivationGatewayError {
    #[error("Provider request failed: {0}")]
    TransportError(String),
    #[error("Provider returned an unreadable response: {0}")]
    ResponseError(String),
    #[error("No handler is configured for provider {0}")]
    NoHandler(Activator),
}

/// A single code-redemption request against one provider.
#[derive(Debug, Clone)]
pub struct ActivationRequest {
    /// The buyer identifier the code is redeemed for.
    pub player_id: String,
    /// The redemption code string.
    pub code: String,
    /// The code's denomination.
    pub amount: i64,
    /// The order the code belongs to; used for order-scoped merchant ids.
    pub order_id: i64,
}

/// The normalized result of one provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The provider redeemed the code synchronously.
    Success { status: String },
    /// The provider accepted the request; the terminal outcome will arrive via webhook.
    Accepted,
    /// The provider definitively (or indeterminately) failed; `status` is its error signal.
    Failure { status: String },
}

/// A synchronous external order-creation request (the Diamond flow). The provider's success
/// boolean maps directly to order completion.
#[derive(Debug, Clone)]
pub struct ExternalOrderRequest {
    pub product: String,
    pub product_id: String,
    pub user_id: String,
    pub zone_id: Option<String>,
}

/// The seam between the engine's activation protocol and the provider HTTP clients.
///
/// Implementations must not panic on provider errors; transport and decoding problems are
/// returned as [`ActivationGatewayError`] and treated by the engine as a failed attempt.
#[allow(async_fn_in_trait)]
pub trait ActivationGateway: Clone + Send + Sync {
    /// Whether a handler is configured for the given provider. Unsupported providers are skipped
    /// by the priority loop.
    fn supports(&self, provider: Activator) -> bool;

    /// Redeems `request` against the given provider.
    async fn redeem(
        &self,
        provider: Activator,
        request: &ActivationRequest,
    ) -> Result<ActivationOutcome, ActivationGatewayError>;

    /// Creates an order on the external provider used by the Diamond category. Returns the
    /// provider's success flag and a human-readable status message.
    async fn create_external_order(
        &self,
        request: &ExternalOrderRequest,
    ) -> Result<(bool, String), ActivationGatewayError>;
}
