use std::{collections::HashMap, sync::Arc};

use log::*;
use reqwest::{Client, StatusCode};

use crate::{
    config::FarsConfig,
    data_objects::{FarsAcceptance, FarsErrorResponse, FarsRedeemRequest},
    error::ActivatorApiError,
};

/// The asynchronous provider. A 200/201 response only acknowledges that the redemption request
/// was queued; the terminal outcome arrives later on an inbound webhook keyed by the code string.
#[derive(Clone)]
pub struct FarsApi {
    config: FarsConfig,
    client: Arc<Client>,
}

impl FarsApi {
    pub fn new(config: FarsConfig) -> Result<Self, ActivatorApiError> {
        let client = Client::builder().build().map_err(|e| ActivatorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Submits a redemption request for one code. The merchant order id embeds our order id and
    /// the player id so the webhook can be correlated.
    pub async fn redeem(
        &self,
        order_id: i64,
        player_id: &str,
        code: &str,
        amount: i64,
    ) -> Result<FarsAcceptance, ActivatorApiError> {
        let request = FarsRedeemRequest {
            merchant_order_id: format!("{order_id}_{player_id}"),
            player_id: player_id.to_string(),
            codes: HashMap::from([(code.to_string(), amount)]),
        };
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(self.config.token.reveal())
            .json(&request)
            .send()
            .await
            .map_err(|e| ActivatorApiError::RequestError(e.to_string()))?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                debug!("FARS accepted the redemption request for order {order_id}");
                Ok(FarsAcceptance::Accepted)
            },
            status => {
                let payload: FarsErrorResponse =
                    response.json().await.map_err(|e| ActivatorApiError::JsonError(e.to_string()))?;
                let code = payload.error_code.to_string().trim_matches('"').to_string();
                warn!("FARS declined the redemption request with {status}: {code}");
                Ok(FarsAcceptance::Declined(code))
            },
        }
    }
}
