//! The two call shapes against the reasoning service.

use std::sync::Arc;

use {
    claimguard_media::MediaOutcome,
    claimguard_providers::{GenerationError, ImagePayload, ReasoningService},
    tracing::{debug, info},
};

/// Chooses between a text-only prompt and a multimodal call.
#[derive(Clone)]
pub struct ReasoningGateway {
    service: Arc<dyn ReasoningService>,
    history_turns: usize,
}

impl ReasoningGateway {
    pub fn new(service: Arc<dyn ReasoningService>, history_turns: usize) -> Self {
        Self {
            service,
            history_turns,
        }
    }

    /// Ask for an answer. When any image was fetched the images go to the
    /// multimodal call with the context, if any, as trailing text; otherwise
    /// the text prompt carries the instruction, recent history and the
    /// context.
    pub async fn answer(
        &self,
        instruction: &str,
        history: &[String],
        context: &str,
        images: &[ImagePayload],
    ) -> Result<String, GenerationError> {
        if images.is_empty() {
            let prompt = text_prompt(instruction, history, self.history_turns, context);
            debug!(
                service = self.service.name(),
                model = self.service.model(),
                chars = prompt.chars().count(),
                "text generation"
            );
            self.service.generate_text(&prompt).await
        } else {
            info!(
                service = self.service.name(),
                model = self.service.model(),
                images = images.len(),
                "multimodal generation"
            );
            let context = Some(context.trim()).filter(|c| !c.is_empty());
            self.service
                .generate_multimodal(instruction, images, context)
                .await
        }
    }
}

/// Instruction, the last `turns` history entries, then the user content.
pub fn text_prompt(instruction: &str, history: &[String], turns: usize, context: &str) -> String {
    let recent = &history[history.len().saturating_sub(turns)..];
    let mut prompt = String::from(instruction.trim_end());
    if !recent.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        prompt.push_str(&recent.join("\n"));
    }
    prompt.push_str("\n\nUser content:\n\"\"\"\n");
    prompt.push_str(context);
    prompt.push_str("\n\"\"\"");
    prompt
}

/// Image payloads for every fetched image, in attachment order.
pub fn image_payloads(outcomes: &[MediaOutcome]) -> Vec<ImagePayload> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            MediaOutcome::Fetched(media) if media.is_image() => Some(ImagePayload::new(
                media.content_type.clone(),
                media.bytes.clone(),
            )),
            _ => None,
        })
        .collect()
}
