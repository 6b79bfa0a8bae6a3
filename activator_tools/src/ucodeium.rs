use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::json;

use crate::{config::UCodeiumConfig, data_objects::UCodeiumResponse, error::ActivatorApiError};

/// Provider error statuses are shown to operators in chat messages; keep them short.
const MAX_STATUS_LEN: usize = 50;

/// Synchronous JSON provider. Success requires *both* a zero top-level result code and the nested
/// activation-success flag; any other combination is a definitive failure.
#[derive(Clone)]
pub struct UCodeiumApi {
    config: UCodeiumConfig,
    client: Arc<Client>,
}

impl UCodeiumApi {
    pub fn new(config: UCodeiumConfig) -> Result<Self, ActivatorApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| ActivatorApiError::Initialization(e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| ActivatorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Redeems `code` for `player_id`, returning the normalized `(success, status)` pair.
    pub async fn activate(
        &self,
        player_id: &str,
        code: &str,
        amount: i64,
    ) -> Result<(bool, String), ActivatorApiError> {
        let body = json!({
            "user_id": player_id,
            "code": code,
            "activation_amount": format!("{amount} UC"),
        });
        trace!("Sending activation request to UCodeium for {amount} UC");
        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ActivatorApiError::RequestError(e.to_string()))?;
        let payload: UCodeiumResponse =
            response.json().await.map_err(|e| ActivatorApiError::JsonError(e.to_string()))?;
        let activated = payload.activation_data.map(|d| d.activation_success).unwrap_or_default();
        if payload.result_code == 0 && activated {
            debug!("UCodeium activated the code");
            return Ok((true, "0".to_string()));
        }
        let mut status = format!("{}:{}", payload.result_code, payload.message.unwrap_or_default());
        status.truncate(MAX_STATUS_LEN);
        warn!("UCodeium declined the code: {status}");
        Ok((false, status))
    }
}
