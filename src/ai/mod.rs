use serde_json::Value;

use crate::config::AiConfig;

/// Returned instead of generated content whenever no API key is configured.
/// Callers treat this as a successful, documented degradation.
pub const FALLBACK_NOTE: &str =
    "AI assistance is not configured. Set AI_API_KEY to enable generated content.";

/// Thin completion client shared by intake triage and report narratives.
#[derive(Clone)]
pub struct AiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl AiClient {
    pub fn from_config(cfg: &AiConfig) -> Self {
        AiClient {
            client: reqwest::Client::new(),
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// One prompt in, one completion out. A missing key short-circuits to the
    /// fallback note; an HTTP failure propagates to the caller.
    pub async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let Some(api_key) = &self.api_key else {
            return Ok(FALLBACK_NOTE.to_string());
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": 600
            }))
            .send()
            .await?
            .error_for_status()?;

        let result: Value = response.json().await?;
        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_returns_fallback_note() {
        let client = AiClient::from_config(&AiConfig {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
        });
        assert!(!client.is_configured());
        let note = client.complete("summarize this period").await.unwrap();
        assert_eq!(note, FALLBACK_NOTE);
    }
}
