#![allow(clippy::unwrap_used)]
//! Integration tests for the HTTP routes, served on a real local port.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    claimguard_auto_reply::{APOLOGY, ClaimVerifier, ReplyPipeline},
    claimguard_config::ClaimguardConfig,
    claimguard_gateway::{AppState, build_app},
    claimguard_providers::{GenerationError, ImagePayload, ReasoningService},
    claimguard_sessions::ConversationStore,
    claimguard_sources::Allowlist,
    tokio::net::TcpListener,
};

struct Fixed {
    answer: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl ReasoningService for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn model(&self) -> &str {
        "fixed-1"
    }

    async fn generate_text(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or(GenerationError::Empty)
    }

    async fn generate_multimodal(
        &self,
        _instruction: &str,
        _images: &[ImagePayload],
        _context: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or(GenerationError::Empty)
    }
}

async fn start(answer: Option<&str>) -> (SocketAddr, Arc<Fixed>) {
    let service = Arc::new(Fixed {
        answer: answer.map(str::to_string),
        calls: AtomicUsize::new(0),
    });
    let shared: Arc<dyn ReasoningService> = service.clone();
    let mut config = ClaimguardConfig::default();
    config.chat.chunk_limit = 120;

    let pipeline = ReplyPipeline::from_config(
        &config,
        reqwest::Client::new(),
        Arc::clone(&shared),
        ConversationStore::in_memory(),
    );
    let verifier = ClaimVerifier::new(
        Arc::clone(&shared),
        Allowlist::new(&config.sources.allowed_domains),
    );
    let app = build_app(AppState::new(pipeline, verifier));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, service)
}

#[tokio::test]
async fn health_reports_ok() {
    let (addr, _) = start(Some("unused")).await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn bot_replies_with_escaped_twiml() {
    let (addr, service) = start(Some(
        "Verdict: False\nSummary: Garlic & onions are healthy foods, but neither <prevents> COVID-19.\nSources:\n- https://www.who.int/news",
    ))
    .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/bot"))
        .form(&[
            ("From", "whatsapp:+15550100"),
            ("Body", "Does garlic cure COVID?"),
            ("NumMedia", "0"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/xml")
    );
    let xml = resp.text().await.unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>"));
    assert!(xml.contains("Garlic &amp; onions"));
    assert!(xml.contains("&lt;prevents&gt;"));
    assert!(xml.ends_with("</Message></Response>"));
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);

    // The reply exceeds the 120-char chunk limit, so it is numbered.
    let parts = xml.matches("<Message>").count();
    assert!(parts > 1);
    assert!(xml.contains(&format!("<Message>(1/{parts}) Verdict: False")));
}

#[tokio::test]
async fn bot_apologizes_when_generation_fails() {
    let (addr, _) = start(None).await;
    let xml = reqwest::Client::new()
        .post(format!("http://{addr}/bot"))
        .form(&[("From", "whatsapp:+15550101"), ("Body", "hello")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let apology = APOLOGY.replace('\'', "&apos;");
    assert!(xml.contains(&format!("<Message>{apology}</Message>")));
}

#[tokio::test]
async fn bot_tolerates_a_non_form_body() {
    let (addr, _) = start(Some("Answer: Hi.\nSources:\n- None")).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/bot"))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("<Response>"));
}

#[tokio::test]
async fn verify_returns_structured_verdict() {
    let (addr, _) = start(Some(
        r#"{"verdict": "False", "summary": "No evidence.", "links": [{"title": "CDC", "url": "https://www.cdc.gov/covid"}]}"#,
    ))
    .await;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/verify"))
        .json(&serde_json::json!({"text": "Garlic   cures COVID"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["verdict"], "False");
    assert_eq!(body["summary"], "No evidence.");
    assert_eq!(body["links"][0]["url"], "https://www.cdc.gov/covid");
    assert_eq!(body["id"].as_str().unwrap().len(), 12);
}

#[tokio::test]
async fn verify_empty_claim() {
    let (addr, service) = start(Some("{}")).await;
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/verify"))
        .json(&serde_json::json!({"text": "   "}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["verdict"], "Unclear");
    assert_eq!(body["summary"], "Empty claim provided");
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}
