//! Inbound message → reply chunks.

use std::{sync::Arc, time::Instant};

use {
    claimguard_common::InboundMessage,
    claimguard_config::ClaimguardConfig,
    claimguard_extract::ContentExtractor,
    claimguard_media::MediaRetriever,
    claimguard_providers::ReasoningService,
    claimguard_sessions::{ConversationHistory, ConversationStore},
    claimguard_sources::{Allowlist, enforce_sources},
    tracing::{info, warn},
};

use crate::{
    chunk::chunk_reply,
    context::ContextAssembler,
    gateway::{ReasoningGateway, image_payloads},
    prompt::{ReplyMode, instruction},
};

/// The single reply sent when the reasoning service fails.
pub const APOLOGY: &str =
    "Sorry, I couldn't generate a response right now. Please try again in a moment.";

/// Outcome of processing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReply {
    pub mode: ReplyMode,
    /// Final reply text before chunking.
    pub text: String,
    /// Allow-listed sources in the rewritten `Sources:` block.
    pub sources: Vec<String>,
    /// Transport-sized parts, in send order.
    pub chunks: Vec<String>,
    /// Whether the images went through the multimodal call.
    pub multimodal: bool,
    /// Set when the reasoning service failed and [`APOLOGY`] was sent.
    pub failed: bool,
}

/// Limits applied by [`ReplyPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineLimits {
    pub assistant_turn_max_chars: usize,
    pub chunk_limit: usize,
    pub max_sources: usize,
    pub serialize_per_user: bool,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            assistant_turn_max_chars: 1_000,
            chunk_limit: 1_500,
            max_sources: 3,
            serialize_per_user: true,
        }
    }
}

impl PipelineLimits {
    pub fn from_config(config: &ClaimguardConfig) -> Self {
        Self {
            assistant_turn_max_chars: config.chat.assistant_turn_max_chars,
            chunk_limit: config.chat.chunk_limit,
            max_sources: config.sources.max_sources,
            serialize_per_user: config.chat.serialize_per_user,
        }
    }
}

/// Wires retrieval, extraction, generation, citation enforcement, history
/// and chunking together.
#[derive(Clone)]
pub struct ReplyPipeline {
    retriever: MediaRetriever,
    assembler: ContextAssembler,
    gateway: ReasoningGateway,
    allowlist: Allowlist,
    store: ConversationStore,
    limits: PipelineLimits,
}

impl ReplyPipeline {
    pub fn new(
        retriever: MediaRetriever,
        assembler: ContextAssembler,
        gateway: ReasoningGateway,
        allowlist: Allowlist,
        store: ConversationStore,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            retriever,
            assembler,
            gateway,
            allowlist,
            store,
            limits,
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(
        config: &ClaimguardConfig,
        client: reqwest::Client,
        service: Arc<dyn ReasoningService>,
        store: ConversationStore,
    ) -> Self {
        let extractor = ContentExtractor::from_config(&config.extract);
        Self::new(
            MediaRetriever::from_config(client, config),
            ContextAssembler::from_config(extractor, config),
            ReasoningGateway::new(service, config.chat.prompt_history_turns),
            Allowlist::new(&config.sources.allowed_domains),
            store,
            PipelineLimits::from_config(config),
        )
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[must_use]
    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Process one inbound message. Always produces a reply; failures past
    /// this point are logged, never returned.
    pub async fn process_inbound(&self, message: &InboundMessage) -> PipelineReply {
        let started = Instant::now();
        let user_id = message.user_id.as_str();
        let _guard = if self.limits.serialize_per_user {
            Some(self.store.lock_user(user_id).await)
        } else {
            None
        };

        let mut history = match self.store.load(user_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load history, starting empty");
                ConversationHistory::new(self.store.limit())
            },
        };
        let prior_turns = history.turns().to_vec();
        history.push_user(message.turn_text());

        let outcomes = self.retriever.fetch_all(&message.media).await;
        let context = self.assembler.build(&message.body, &outcomes).await;
        let images = image_payloads(&outcomes);
        let multimodal = !images.is_empty();
        let instruction = instruction(context.mode, &self.allowlist, self.limits.max_sources);

        let generated = self
            .gateway
            .answer(&instruction, &prior_turns, &context.text, &images)
            .await;

        let (text, sources, failed) = match generated {
            Ok(raw) => {
                let verified = enforce_sources(&raw, &self.allowlist, self.limits.max_sources);
                history.push_assistant(&verified.text, self.limits.assistant_turn_max_chars);
                (verified.text, verified.sources, false)
            },
            Err(e) => {
                warn!(
                    user_id,
                    transport = e.is_transport(),
                    error = %e,
                    "reasoning service failed"
                );
                (APOLOGY.to_string(), Vec::new(), true)
            },
        };

        if let Err(e) = self.store.save(user_id, &history).await {
            warn!(user_id, error = %e, "failed to persist history");
        }

        let chunks = chunk_reply(&text, self.limits.chunk_limit);
        info!(
            user_id,
            mode = %context.mode,
            attachments = message.media.len(),
            multimodal,
            failed,
            sources = sources.len(),
            chunks = chunks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reply ready"
        );

        PipelineReply {
            mode: context.mode,
            text,
            sources,
            chunks,
            multimodal,
            failed,
        }
    }
}
