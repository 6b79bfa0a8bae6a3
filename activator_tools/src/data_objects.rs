use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct UCodeiumActivationData {
    #[serde(default)]
    pub activation_success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UCodeiumResponse {
    pub result_code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub activation_data: Option<UCodeiumActivationData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KokosErrorResponse {
    #[serde(rename = "errorCode", default)]
    pub error_code: serde_json::Value,
}

/// The asynchronous provider's redemption request. The merchant order id is scoped to our order so
/// the webhook can be correlated back.
#[derive(Debug, Clone, Serialize)]
pub struct FarsRedeemRequest {
    pub merchant_order_id: String,
    pub player_id: String,
    /// Map of code string to its denomination.
    pub codes: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FarsErrorResponse {
    #[serde(default)]
    pub error_code: serde_json::Value,
}

/// What the asynchronous provider did with a redemption request. `Accepted` is *not* success:
/// the terminal outcome arrives later on the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FarsAcceptance {
    Accepted,
    Declined(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmileOneResponse {
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
}
