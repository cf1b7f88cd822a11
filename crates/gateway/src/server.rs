use std::{collections::HashMap, net::SocketAddr};

use {
    axum::{
        Form, Json, Router,
        extract::{State, rejection::FormRejection},
        http::header,
        response::IntoResponse,
        routing::{get, post},
    },
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{state::AppState, twiml};

/// Build the router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/bot", post(bot_handler))
        .route("/verify", post(verify_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(bind: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, version = state.version, "claimguard listening");
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}

/// Messaging webhook. Always answers 200 with a TwiML document.
async fn bot_handler(
    State(state): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> impl IntoResponse {
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(e) => {
            warn!(error = %e, "unreadable webhook form, treating as empty");
            HashMap::new()
        },
    };
    let message = twiml::inbound_from_form(&fields);
    info!(
        user_id = %message.user_id,
        attachments = message.media.len(),
        "inbound message"
    );

    let reply = state.pipeline.process_inbound(&message).await;
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        twiml::render(&reply.chunks),
    )
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    text: String,
}

async fn verify_handler(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> impl IntoResponse {
    Json(state.verifier.verify(&request.text).await)
}
