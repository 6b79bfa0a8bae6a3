use std::sync::Arc;

use log::*;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::{config::KokosConfig, data_objects::KokosErrorResponse, error::ActivatorApiError};

/// Synchronous provider that signals its outcome through HTTP status codes: 200/201 means
/// activated, 503 carries a structured error body, anything else is an unexpected failure.
#[derive(Clone)]
pub struct KokosApi {
    config: KokosConfig,
    client: Arc<Client>,
}

impl KokosApi {
    pub fn new(config: KokosConfig) -> Result<Self, ActivatorApiError> {
        let client = Client::builder().build().map_err(|e| ActivatorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn activate(&self, player_id: &str, code: &str) -> Result<(bool, String), ActivatorApiError> {
        let body = json!({
            "user_id": player_id,
            "code": code,
        });
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(self.config.token.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| ActivatorApiError::RequestError(e.to_string()))?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                debug!("Kokos activated the code");
                Ok((true, "0".to_string()))
            },
            StatusCode::SERVICE_UNAVAILABLE => {
                let payload: KokosErrorResponse =
                    response.json().await.map_err(|e| ActivatorApiError::JsonError(e.to_string()))?;
                let status = payload.error_code.to_string().trim_matches('"').to_string();
                warn!("Kokos declined the code: {status}");
                Ok((false, status))
            },
            status => {
                warn!("Kokos returned an unexpected status {status}");
                Ok((false, "Unexpectable error".to_string()))
            },
        }
    }
}
