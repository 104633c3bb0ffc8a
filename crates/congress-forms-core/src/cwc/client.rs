//! HTTP client for the CWC API.

use super::{CwcMessage, CwcMessageParams, MessagingApi, xml};
use crate::config::{CwcConfig, DeliveryAgent};
use crate::error::CwcError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

const API_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CwcHttpClient {
    client: Client,
    base_url: Url,
    api_key: String,
    delivery_agent: DeliveryAgent,
}

impl CwcHttpClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, delivery_agent: DeliveryAgent) -> Result<Self, CwcError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CwcError::NotConfigured(format!("invalid base_url {base_url}: {e}")))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
            delivery_agent,
        })
    }

    pub fn from_config(config: &CwcConfig) -> Result<Self, CwcError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| CwcError::NotConfigured("cwc.base_url is not set".to_string()))?;
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CwcError::NotConfigured("cwc.api_key is not set".to_string()))?;
        Self::new(base_url, api_key, config.delivery_agent.clone())
    }

    /// `{base_url}/{endpoint}?apikey=...`
    fn endpoint(&self, endpoint: &str) -> Result<Url, CwcError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CwcError::NotConfigured(format!("base_url {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .push(endpoint);
        url.query_pairs_mut().append_pair("apikey", &self.api_key);
        Ok(url)
    }

    async fn post(&self, endpoint: &str, message: &CwcMessage) -> Result<(), CwcError> {
        let url = self.endpoint(endpoint)?;
        debug!(endpoint, delivery_id = %message.delivery_id, "Posting CWC message");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .body(message.document.clone())
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CwcError::InvalidResponse(format!("unreadable response body: {e}")))?;

        if !status.is_success() {
            return Err(CwcError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingApi for CwcHttpClient {
    fn create_message(&self, params: CwcMessageParams) -> Result<CwcMessage, CwcError> {
        let delivery_id = uuid::Uuid::new_v4().simple().to_string();
        let document = xml::render(&delivery_id, Utc::now().date_naive(), &self.delivery_agent, &params);
        Ok(CwcMessage {
            delivery_id,
            params,
            document,
        })
    }

    async fn validate(&self, message: &CwcMessage) -> Result<(), CwcError> {
        self.post("validate", message).await
    }

    async fn deliver(&self, message: &CwcMessage) -> Result<(), CwcError> {
        self.post("message", message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> CwcHttpClient {
        CwcHttpClient::new(base, "secret", DeliveryAgent::default()).unwrap()
    }

    #[test]
    fn endpoint_appends_path_and_api_key() {
        let url = client("https://cwc.example.gov/v2/").endpoint("message").unwrap();
        assert_eq!(url.as_str(), "https://cwc.example.gov/v2/message?apikey=secret");

        let url = client("https://cwc.example.gov/v2").endpoint("validate").unwrap();
        assert_eq!(url.as_str(), "https://cwc.example.gov/v2/validate?apikey=secret");
    }

    #[test]
    fn from_config_requires_base_url_and_key() {
        let mut config = CwcConfig::default();
        assert!(matches!(CwcHttpClient::from_config(&config), Err(CwcError::NotConfigured(_))));
        config.base_url = Some("https://cwc.example.gov".to_string());
        assert!(matches!(CwcHttpClient::from_config(&config), Err(CwcError::NotConfigured(_))));
        config.api_key = Some("k".to_string());
        assert!(CwcHttpClient::from_config(&config).is_ok());
    }
}
