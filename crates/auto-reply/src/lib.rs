//! Inbound message processing: the glue between the transport and the
//! reasoning service.
//!
//! Flow: inbound message → fetch attachments → extract text → assemble
//! context → pick instruction → generate → enforce sources → record history →
//! chunk reply.

pub mod chunk;
pub mod context;
pub mod gateway;
pub mod pipeline;
pub mod prompt;
pub mod verify;

pub use {
    chunk::chunk_reply,
    context::{AssistantContext, ContextAssembler, EMPTY_CONTEXT_PLACEHOLDER},
    gateway::ReasoningGateway,
    pipeline::{APOLOGY, PipelineLimits, PipelineReply, ReplyPipeline},
    prompt::{ReplyMode, instruction},
    verify::{ClaimVerifier, Verdict, VerifyLink, VerifyResponse},
};
