use async_trait::async_trait;
use captionly_shared::caption::GenerationResult;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::GeminiConfig;
use crate::prompt::PromptSpec;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API returned an empty caption.")]
    EmptyCaption,
    #[error("Upstream model error: {0}")]
    Upstream(String),
}

/// A hosted model that turns a prompt into a caption.
#[async_trait]
pub trait CaptionModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, spec: &PromptSpec) -> Result<GenerationResult, GenerationError>;
}

/// Gemini `generateContent` client. One attempt per call; a failed request
/// is reported to the user, who re-triggers manually.
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn request_body(spec: &PromptSpec) -> Value {
        json!({
            "contents": [
                { "role": "user", "parts": [ { "text": spec.prompt } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": spec.schema,
            }
        })
    }
}

#[async_trait]
impl CaptionModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, spec: &PromptSpec) -> Result<GenerationResult, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        debug!("Calling {} ({} prompt chars)", url, spec.prompt.chars().count());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(spec))
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            error!("Gemini returned {}: {}", status, body);
            return Err(GenerationError::Upstream(format!("status {}", status)));
        }

        let envelope: Value = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Upstream(format!("non-JSON envelope: {}", e)))?;
        parse_envelope(&envelope)
    }
}

/// Pulls the model text out of a `generateContent` response.
pub fn parse_envelope(envelope: &Value) -> Result<GenerationResult, GenerationError> {
    if let Some(err) = envelope.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(GenerationError::Upstream(format!("API error: {}", message)));
    }

    let text = envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| GenerationError::Upstream("response missing candidate text".to_string()))?;

    parse_caption_json(text)
}

/// Parses the schema-constrained JSON the model produced.
pub fn parse_caption_json(text: &str) -> Result<GenerationResult, GenerationError> {
    let parsed: GenerationResult = serde_json::from_str(text.trim())
        .map_err(|e| GenerationError::Upstream(format!("malformed caption JSON: {}", e)))?;

    let caption = parsed.caption.trim().to_string();
    if caption.is_empty() {
        return Err(GenerationError::EmptyCaption);
    }

    let hashtags = parsed
        .hashtags
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();

    Ok(GenerationResult { caption, hashtags })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::build_prompt;
    use axum::{Json, Router, routing::post};
    use captionly_shared::caption::CaptionRequest;

    fn envelope(text: &str) -> Value {
        json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ], "role": "model" } }
            ]
        })
    }

    #[test]
    fn parses_caption_and_trims_hashtags() {
        let result = parse_envelope(&envelope(
            r##"{"caption":" សួស្តី ","hashtags":["#កាហ្វេ"," ","#ថ្មី "]}"##,
        ))
        .unwrap();
        assert_eq!(result.caption, "សួស្តី");
        assert_eq!(result.hashtags, vec!["#កាហ្វេ", "#ថ្មី"]);
    }

    #[test]
    fn blank_caption_is_empty_caption() {
        let err = parse_caption_json(r#"{"caption":"   ","hashtags":[]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyCaption));
    }

    #[test]
    fn malformed_json_is_upstream() {
        let err = parse_caption_json("not json").unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
    }

    #[test]
    fn api_error_envelope_is_upstream() {
        let err = parse_envelope(&json!({"error": {"code": 429, "message": "quota"}})).unwrap_err();
        match err {
            GenerationError::Upstream(msg) => assert!(msg.contains("quota")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn request_body_declares_json_schema() {
        let spec = build_prompt(&CaptionRequest {
            product_name: "soap".to_string(),
            ..Default::default()
        });
        let body = GeminiClient::request_body(&spec);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], spec.schema);
        assert_eq!(body["contents"][0]["parts"][0]["text"], json!(spec.prompt));
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(api_base: String) -> GeminiClient {
        let _ = rustls::crypto::ring::default_provider().install_default();
        GeminiClient::new(&GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_base,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn generate_round_trip_against_local_server() {
        let app = Router::new().route(
            "/models/{action}",
            post(|Json(body): Json<Value>| async move {
                assert!(body["contents"][0]["parts"][0]["text"].is_string());
                Json(envelope(r##"{"caption":"ហាងថ្មី","hashtags":["#ហាង"]}"##))
            }),
        );
        let base = serve(app).await;

        let spec = build_prompt(&CaptionRequest {
            product_name: "ហាងកាហ្វេថ្មី".to_string(),
            ..Default::default()
        });
        let result = client_for(base).generate(&spec).await.unwrap();
        assert_eq!(result.caption, "ហាងថ្មី");
        assert_eq!(result.hashtags, vec!["#ហាង"]);
    }

    #[tokio::test]
    async fn server_error_is_upstream() {
        let app = Router::new().route(
            "/models/{action}",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(app).await;

        let spec = build_prompt(&CaptionRequest {
            product_name: "x".to_string(),
            ..Default::default()
        });
        let err = client_for(base).generate(&spec).await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
    }
}
