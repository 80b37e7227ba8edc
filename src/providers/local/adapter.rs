use async_trait::async_trait;
use reqwest::Client;

use super::models::*;
use crate::providers::traits::ModelClient;
use crate::providers::types::{ModelSettings, ProviderError};

/// Client for a locally served model behind an OpenAI compatible API
/// (Ollama, llama.cpp server, LM Studio).
pub struct LocalProvider {
    client: Client,
    settings: ModelSettings,
}

impl LocalProvider {
    pub fn new(settings: ModelSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    fn build_messages(system_prompt: Option<&str>, prompt: &str) -> Vec<OpenAiMessage> {
        let mut result = Vec::new();

        if let Some(system) = system_prompt {
            if !system.is_empty() {
                result.push(OpenAiMessage {
                    role: "system".to_string(),
                    content: Some(system.to_string()),
                });
            }
        }

        result.push(OpenAiMessage {
            role: "user".to_string(),
            content: Some(prompt.to_string()),
        });

        result
    }

    fn build_auth_header(api_key: Option<&str>) -> Option<String> {
        match api_key {
            Some(key) if !key.is_empty() => Some(format!("Bearer {}", key)),
            _ => None,
        }
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    fn extract_content(response: OpenAiResponse) -> Result<String, ProviderError> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No content in response".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl ModelClient for LocalProvider {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn infer(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let openai_request = OpenAiRequest {
            model: self.settings.model.clone(),
            messages: Self::build_messages(self.settings.system_prompt.as_deref(), prompt),
            stream: false,
            temperature: self.settings.temperature,
        };

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&openai_request);

        if let Some(auth) = Self::build_auth_header(self.settings.api_key.as_deref()) {
            req = req.header("Authorization", auth);
        }

        let response = req.send().await.map_err(|e| {
            ProviderError::NetworkError(format!(
                "Failed to connect to {}: {}",
                self.settings.base_url, e
            ))
        })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::AuthError("Invalid API key".to_string()));
        }

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(Self::parse_error_message(
                status, &body,
            )));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Self::extract_content(openai_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_with_system_prompt() {
        let messages = LocalProvider::build_messages(Some("Be brief."), "hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_build_messages_skips_empty_system_prompt() {
        let messages = LocalProvider::build_messages(Some(""), "hello");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_auth_header_only_for_non_empty_key() {
        assert_eq!(LocalProvider::build_auth_header(None), None);
        assert_eq!(LocalProvider::build_auth_header(Some("")), None);
        assert_eq!(
            LocalProvider::build_auth_header(Some("k")).as_deref(),
            Some("Bearer k")
        );
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error":{"message":"model 'x' not found"}}"#;
        let msg = LocalProvider::parse_error_message(reqwest::StatusCode::NOT_FOUND, body);
        assert_eq!(msg, "HTTP 404: model 'x' not found");

        let msg = LocalProvider::parse_error_message(reqwest::StatusCode::BAD_GATEWAY, "oops");
        assert_eq!(msg, "HTTP 502: Request failed");
    }

    #[test]
    fn test_extract_content() {
        let response: OpenAiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}],"model":"m"}"#,
        )
        .unwrap();
        assert_eq!(LocalProvider::extract_content(response).unwrap(), "hi");

        let empty: OpenAiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            LocalProvider::extract_content(empty),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
