use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uc_store_engine::{
    db_types::{Activator, Currency, NewCustomer, Order},
    sf_api::order_flow_api::Fulfillment,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub customer_id: i64,
    pub item_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub player_id: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// What the order flow did with a freshly placed order, flattened for the bot.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentResult {
    pub status: String,
    /// Delivered code strings, when fulfillment handed any over synchronously.
    pub codes: Vec<String>,
    pub detail: Option<String>,
}

impl From<Fulfillment> for FulfillmentResult {
    fn from(f: Fulfillment) -> Self {
        match f {
            Fulfillment::Delivered(codes) => Self { status: "delivered".into(), codes, detail: None },
            Fulfillment::AwaitingActivation(codes) => {
                Self { status: "awaiting_activation".into(), codes, detail: None }
            },
            Fulfillment::Manual => Self { status: "manual".into(), codes: Vec::new(), detail: None },
            Fulfillment::External { success, status } => Self {
                status: if success { "delivered".into() } else { "failed".into() },
                codes: Vec::new(),
                detail: Some(status),
            },
            Fulfillment::Failed(reason) => Self { status: "failed".into(), codes: Vec::new(), detail: Some(reason) },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub order: Order,
    pub fulfillment: FulfillmentResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomerRequest {
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<NewCustomerRequest> for NewCustomer {
    fn from(req: NewCustomerRequest) -> Self {
        NewCustomer {
            tg_id: req.tg_id,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            is_admin: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderRequest {
    /// When set, cancellation is refused unless this customer owns the order.
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetMessageRequest {
    /// The Telegram message id of the order card, kept for in-place edits.
    pub message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminOrderRequest {
    /// The Telegram id of the acting operator; the engine verifies the admin flag.
    pub admin_tg_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTopUpRequest {
    pub customer_id: i64,
    /// Decimal USDT amount, e.g. "25.00".
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub payment_url: Option<String>,
}

fn default_currency() -> Currency {
    Currency::Usdt
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmTopUpRequest {
    pub tx_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivatorPriorityRequest {
    pub name: Activator,
    pub priority: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// The ruble gateway's payment callback. The gateway echoes back the top-up id the payment URL
/// was created with.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeepayWebhookPayload {
    pub topup_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tx_id: Option<String>,
}

/// The asynchronous provider's terminal notification: one batch-wide `status` applied to every
/// code in the `codes` map. The map values are echoes of the redemption request (denominations)
/// and are ignored, unless `status` is absent and the value is itself a status string.
#[derive(Debug, Clone, Deserialize)]
pub struct FarsWebhookPayload {
    #[serde(default)]
    pub merchant_order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub codes: HashMap<String, serde_json::Value>,
}
