//! Nutritionix HTTP client
//!
//! Sends natural-language food queries using the credential block from
//! the resolved settings.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::config::NutritionixConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct NutritionixClient {
    client: Client,
    config: NutritionixConfig,
}

impl NutritionixClient {
    pub fn new(config: NutritionixConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("create http client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Full endpoint URL, or `None` while the API URL is unset.
    fn build_url(&self, path: &str) -> Option<String> {
        let base = self.config.api_url.as_deref()?.trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        Some(format!("{}/{}", base, path.trim_start_matches('/')))
    }

    /// Credential headers that are actually set.
    fn credential_headers(&self) -> Vec<(&'static str, &str)> {
        self.config
            .headers()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }

    pub async fn natural_nutrients(&self, query: &str) -> Result<Value, AppError> {
        let url = self.build_url("natural/nutrients").ok_or_else(|| {
            AppError::Upstream("nutritionix api url is not configured".to_string())
        })?;

        let mut request = self.client.post(&url).json(&json!({ "query": query }));
        for (name, value) in self.credential_headers() {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("nutritionix request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = %status, "nutritionix rejected query");
            return Err(AppError::Upstream(format!(
                "nutritionix responded with {}",
                status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("nutritionix response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: Option<&str>, app_id: Option<&str>, app_key: Option<&str>) -> NutritionixClient {
        NutritionixClient::new(NutritionixConfig {
            api_url: api_url.map(str::to_string),
            app_id: app_id.map(str::to_string),
            app_key: app_key.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn url_joins_base_and_path() {
        let c = client(Some("https://trackapi.nutritionix.com/v2/"), None, None);
        assert_eq!(
            c.build_url("/natural/nutrients").as_deref(),
            Some("https://trackapi.nutritionix.com/v2/natural/nutrients")
        );
    }

    #[test]
    fn missing_url_yields_none() {
        assert_eq!(client(None, None, None).build_url("natural/nutrients"), None);
        assert_eq!(client(Some(""), None, None).build_url("natural/nutrients"), None);
    }

    #[test]
    fn absent_credentials_are_omitted() {
        let c = client(Some("https://x.test"), Some("id"), None);
        assert_eq!(c.credential_headers(), vec![("x-app-id", "id")]);

        let c = client(Some("https://x.test"), Some("id"), Some("key"));
        assert_eq!(
            c.credential_headers(),
            vec![("x-app-id", "id"), ("x-app-key", "key")]
        );
    }

    #[tokio::test]
    async fn unconfigured_client_fails_at_use() {
        let err = client(None, None, None)
            .natural_nutrients("1 apple")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
