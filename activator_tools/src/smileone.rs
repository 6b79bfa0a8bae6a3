use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use log::*;
use md5::{Digest, Md5};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{config::SmileOneConfig, data_objects::SmileOneResponse, error::ActivatorApiError};

/// The external order-creation provider used by the Diamond category. Requests are form-encoded
/// and signed with a double-MD5 over the sorted parameters.
#[derive(Clone)]
pub struct SmileOneApi {
    config: SmileOneConfig,
    client: Arc<Client>,
}

impl SmileOneApi {
    pub fn new(config: SmileOneConfig) -> Result<Self, ActivatorApiError> {
        let client = Client::builder().build().map_err(|e| ActivatorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Creates an order on the provider. Returns the provider's success flag and its message.
    pub async fn create_order(
        &self,
        product: &str,
        product_id: &str,
        user_id: &str,
        zone_id: Option<&str>,
    ) -> Result<(bool, String), ActivatorApiError> {
        let mut params = self.base_params();
        params.insert("product", product.to_string());
        params.insert("productid", product_id.to_string());
        params.insert("userid", user_id.to_string());
        if let Some(zone_id) = zone_id {
            params.insert("zoneid", zone_id.to_string());
        }
        let payload: SmileOneResponse = self.post("/smilecoin/api/createorder", params).await?;
        let message = payload.message.unwrap_or_default();
        if payload.status == 200 {
            debug!("SmileOne order created for product {product_id}");
            Ok((true, message))
        } else {
            warn!("SmileOne declined the order: {} {message}", payload.status);
            Ok((false, format!("{}:{message}", payload.status)))
        }
    }

    /// The remaining merchant coin balance, for operator dashboards.
    pub async fn query_points(&self) -> Result<SmileOneResponse, ActivatorApiError> {
        let params = self.base_params();
        self.post("/smilecoin/api/querypoints", params).await
    }

    /// The provider's product list for a game, for operator catalog maintenance.
    pub async fn product_list(&self, product: &str) -> Result<serde_json::Value, ActivatorApiError> {
        let mut params = self.base_params();
        params.insert("product", product.to_string());
        self.post("/smilecoin/api/productlist", params).await
    }

    /// The server/zone list for a game, used to validate a buyer's user+zone pair.
    pub async fn get_server(&self, product: &str) -> Result<serde_json::Value, ActivatorApiError> {
        let mut params = self.base_params();
        params.insert("product", product.to_string());
        self.post("/smilecoin/api/getserver", params).await
    }

    fn base_params(&self) -> BTreeMap<&'static str, String> {
        let time = SystemTime::now().duration_since(UNIX_EPOCH).map(|t| t.as_secs()).unwrap_or_default();
        BTreeMap::from([
            ("uid", self.config.uid.clone()),
            ("email", self.config.email.clone()),
            ("time", time.to_string()),
        ])
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: BTreeMap<&'static str, String>,
    ) -> Result<T, ActivatorApiError> {
        let sign = self.sign(&params);
        params.insert("sign", sign);
        let url = format!("{}{path}", self.config.url);
        let response = self
            .client
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ActivatorApiError::RequestError(e.to_string()))?;
        response.json().await.map_err(|e| ActivatorApiError::JsonError(e.to_string()))
    }

    /// Double MD5 over `key=value&...&m_key` with keys in ascending order. A `BTreeMap` keeps the
    /// parameters sorted by construction.
    fn sign(&self, params: &BTreeMap<&'static str, String>) -> String {
        let mut query = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        query.push_str(&format!("&m_key={}", self.config.key.reveal()));
        let first = format!("{:x}", Md5::digest(query.as_bytes()));
        format!("{:x}", Md5::digest(first.as_bytes()))
    }
}

#[cfg(test)]
mod test {
    use ucs_common::Secret;

    use super::*;

    #[test]
    fn signature_is_a_double_md5_over_sorted_params() {
        let config = SmileOneConfig {
            url: "https://example.com".into(),
            uid: "1001".into(),
            email: "shop@example.com".into(),
            key: Secret::new("m-key".to_string()),
        };
        let api = SmileOneApi::new(config).unwrap();
        let params = BTreeMap::from([("uid", "1001".to_string()), ("email", "shop@example.com".to_string())]);
        let sign = api.sign(&params);
        let inner = format!("{:x}", Md5::digest("email=shop@example.com&uid=1001&m_key=m-key".as_bytes()));
        let expected = format!("{:x}", Md5::digest(inner.as_bytes()));
        assert_eq!(sign, expected);
    }
}
