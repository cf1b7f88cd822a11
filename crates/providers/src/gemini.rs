//! Gemini `generateContent` client over reqwest.
//!
//! Request: `POST {base}/v1beta/models/{model}:generateContent` with
//! `contents[0].parts` holding text and `inline_data` (base64) parts.
//! Response text is the concatenation of `candidates[0].content.parts[*].text`.

use std::time::Duration;

use {
    async_trait::async_trait,
    base64::Engine,
    claimguard_config::schema::GeminiConfig,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::{GenerationError, ImagePayload, ReasoningService};

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn image(image: &ImagePayload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.data),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    model: String,
    base_url: String,
    timeout: Duration,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, config: &GeminiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_seconds),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String, GenerationError> {
        let key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or(GenerationError::NotConfigured)?;

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        debug!(model = %self.model, "gemini generateContent");
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            warn!(status = status.as_u16(), %message, "gemini returned an error");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        response_text(parsed)
    }
}

fn response_text(resp: GenerateResponse) -> Result<String, GenerationError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return match resp.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(GenerationError::Blocked { reason }),
            None => Err(GenerationError::Malformed("no candidates".into())),
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return match candidate.finish_reason {
            Some(reason) if reason == "SAFETY" || reason == "RECITATION" => {
                Err(GenerationError::Blocked { reason })
            },
            _ => Err(GenerationError::Empty),
        };
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl ReasoningService for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        self.generate(vec![Part::text(prompt)]).await
    }

    async fn generate_multimodal(
        &self,
        instruction: &str,
        images: &[ImagePayload],
        context: Option<&str>,
    ) -> Result<String, GenerationError> {
        let mut parts = Vec::with_capacity(images.len() + 2);
        parts.push(Part::text(instruction));
        parts.extend(images.iter().map(Part::image));
        if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
            parts.push(Part::text(context));
        }
        self.generate(parts).await
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, serde_json::json};

    fn provider(base_url: &str, key: Option<&str>) -> GeminiProvider {
        let config = GeminiConfig {
            api_key: key.map(|k| Secret::new(k.to_string())),
            base_url: base_url.to_string(),
            ..Default::default()
        };
        GeminiProvider::new(reqwest::Client::new(), &config)
    }

    fn answer(text: &str) -> String {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn text_generation_sends_prompt_and_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .match_header("x-goog-api-key", "k-1")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "Is garlic a cure?"}]}],
                "generation_config": {"max_output_tokens": 1024}
            })))
            .with_header("content-type", "application/json")
            .with_body(answer("Verdict: False\n"))
            .create_async()
            .await;

        let out = provider(&server.url(), Some("k-1"))
            .generate_text("Is garlic a cure?")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out, "Verdict: False");
    }

    #[tokio::test]
    async fn multimodal_sends_instruction_images_then_context() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [
                    {"text": "Check this."},
                    {"inline_data": {"mime_type": "image/png", "data": "AQID"}},
                    {"text": "caption"}
                ]}]
            })))
            .with_body(answer("Answer: ok"))
            .create_async()
            .await;

        let images = [ImagePayload::new("image/png", vec![1, 2, 3])];
        let out = provider(&server.url(), Some("k"))
            .generate_multimodal("Check this.", &images, Some(" caption "))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out, "Answer: ok");
    }

    #[tokio::test]
    async fn error_status_is_typed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#)
            .create_async()
            .await;

        let err = provider(&server.url(), Some("k"))
            .generate_text("hi")
            .await
            .unwrap_err();
        assert!(!err.is_transport());
        match err {
            GenerationError::Status { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(&format!("http://{addr}"), Some("k"))
            .generate_text("hi")
            .await
            .unwrap_err();
        assert!(err.is_transport(), "{err}");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let err = provider("http://127.0.0.1:9", None)
            .generate_text("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
        assert!(err.to_string().starts_with("generation_error"));
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let resp: GenerateResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(matches!(
            response_text(resp),
            Err(GenerationError::Blocked { reason }) if reason == "SAFETY"
        ));
    }

    #[test]
    fn parts_are_concatenated() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "Answer: a"}, {"text": "b."}]}}]
        }))
        .unwrap();
        assert_eq!(response_text(resp).unwrap(), "Answer: ab.");
    }

    #[test]
    fn empty_candidate_is_an_error() {
        let resp: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}))
                .unwrap();
        assert!(matches!(response_text(resp), Err(GenerationError::Empty)));
    }
}
