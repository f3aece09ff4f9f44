//! AI content generation client.
//!
//! Two concerns behind one client: product copy via the Anthropic Messages
//! API and product imagery via the `OpenAI` images API. Both are optional;
//! a missing API key surfaces as `AiError::NotConfigured` rather than a
//! startup failure.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::AiConfig;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DESCRIBE_MAX_TOKENS: u32 = 1024;

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const IMAGE_MODEL: &str = "gpt-image-1";
const IMAGE_SIZE: &str = "1024x1024";

const DESCRIBE_SYSTEM_PROMPT: &str = "You write product copy for a boutique \
clothing storefront. Given a product name and hints, reply with a single \
evocative paragraph of 40-70 words. No headings, no bullet points, no emoji.";

/// Errors from the AI providers.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI provider not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected the request: HTTP {status}: {body}")]
    ProviderRejected {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("empty response from provider")]
    EmptyResponse,
}

/// A generated product image, base64-encoded PNG.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub b64_png: String,
}

/// Client for AI content generation.
#[derive(Clone)]
pub struct AiClient {
    inner: Arc<AiClientInner>,
}

struct AiClientInner {
    client: reqwest::Client,
    anthropic_api_key: Option<SecretString>,
    anthropic_model: String,
    openai_api_key: Option<SecretString>,
}

impl AiClient {
    /// Create a client from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &AiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(AiClientInner {
                client,
                anthropic_api_key: config.anthropic_api_key.clone(),
                anthropic_model: config.anthropic_model.clone(),
                openai_api_key: config.openai_api_key.clone(),
            }),
        }
    }

    /// Generate a product description from a name and optional hints.
    ///
    /// # Errors
    ///
    /// Returns `AiError::NotConfigured` when no Anthropic key is set, or a
    /// provider error when the request fails.
    #[instrument(skip(self), fields(model = %self.inner.anthropic_model))]
    pub async fn describe(&self, name: &str, hints: Option<&str>) -> Result<String, AiError> {
        let api_key = self
            .inner
            .anthropic_api_key
            .as_ref()
            .ok_or(AiError::NotConfigured)?;

        let prompt = build_describe_prompt(name, hints);

        #[derive(Serialize)]
        struct MessagesRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            system: &'a str,
            messages: Vec<MessageIn<'a>>,
        }

        #[derive(Serialize)]
        struct MessageIn<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct MessagesResponse {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(default)]
            text: String,
        }

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.inner.anthropic_model,
                max_tokens: DESCRIBE_MAX_TOKENS,
                system: DESCRIBE_SYSTEM_PROMPT,
                messages: vec![MessageIn {
                    role: "user",
                    content: &prompt,
                }],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::ProviderRejected { status, body });
        }

        let body: MessagesResponse = response.json().await?;
        let text = body
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(text)
    }

    /// Generate a product image from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `AiError::NotConfigured` when no `OpenAI` key is set, or a
    /// provider error when the request fails.
    #[instrument(skip(self, prompt))]
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, AiError> {
        let api_key = self
            .inner
            .openai_api_key
            .as_ref()
            .ok_or(AiError::NotConfigured)?;

        #[derive(Serialize)]
        struct ImageRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            n: u32,
            size: &'a str,
        }

        #[derive(Deserialize)]
        struct ImageResponse {
            data: Vec<ImageDatum>,
        }

        #[derive(Deserialize)]
        struct ImageDatum {
            b64_json: String,
        }

        let response = self
            .inner
            .client
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(api_key.expose_secret())
            .json(&ImageRequest {
                model: IMAGE_MODEL,
                prompt,
                n: 1,
                size: IMAGE_SIZE,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::ProviderRejected { status, body });
        }

        let body: ImageResponse = response.json().await?;
        let datum = body.data.into_iter().next().ok_or(AiError::EmptyResponse)?;

        Ok(GeneratedImage {
            b64_png: datum.b64_json,
        })
    }
}

/// Build the user prompt for description generation.
fn build_describe_prompt(name: &str, hints: Option<&str>) -> String {
    match hints {
        Some(hints) if !hints.trim().is_empty() => {
            format!("Product: {name}\nHints: {}", hints.trim())
        }
        _ => format!("Product: {name}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_prompt_with_hints() {
        let prompt = build_describe_prompt("Linen Wrap Dress", Some(" breathable, summer "));
        assert_eq!(prompt, "Product: Linen Wrap Dress\nHints: breathable, summer");
    }

    #[test]
    fn test_describe_prompt_without_hints() {
        assert_eq!(
            build_describe_prompt("Linen Wrap Dress", None),
            "Product: Linen Wrap Dress"
        );
        assert_eq!(
            build_describe_prompt("Linen Wrap Dress", Some("   ")),
            "Product: Linen Wrap Dress"
        );
    }

    #[tokio::test]
    async fn test_describe_without_key_is_not_configured() {
        let client = AiClient::new(&AiConfig {
            anthropic_api_key: None,
            anthropic_model: "claude-sonnet-4-5".to_string(),
            openai_api_key: None,
        });

        assert!(matches!(
            client.describe("Linen Wrap Dress", None).await,
            Err(AiError::NotConfigured)
        ));
        assert!(matches!(
            client.generate_image("a dress").await,
            Err(AiError::NotConfigured)
        ));
    }
}
