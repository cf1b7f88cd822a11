//! Twilio-style webhook form parsing and TwiML rendering.

use std::collections::HashMap;

use claimguard_common::{InboundMessage, MediaRef};

/// Twilio delivers at most ten attachments per message.
pub const MAX_MEDIA: usize = 10;

const UNKNOWN_USER: &str = "unknown_user";

/// Build an [`InboundMessage`] from the webhook form fields `From`, `Body`,
/// `NumMedia`, `MediaUrl{i}` and `MediaContentType{i}`.
pub fn inbound_from_form(form: &HashMap<String, String>) -> InboundMessage {
    let field = |name: &str| form.get(name).map(|v| v.trim()).unwrap_or_default();

    let user_id = match field("From") {
        "" => UNKNOWN_USER,
        from => from,
    };
    let declared = field("NumMedia").parse::<usize>().unwrap_or(0).min(MAX_MEDIA);

    let mut message = InboundMessage::text(user_id, field("Body"));
    for i in 0..declared {
        let url = field(&format!("MediaUrl{i}"));
        if url.is_empty() {
            continue;
        }
        message = message.with_media(MediaRef::new(url, field(&format!("MediaContentType{i}"))));
    }
    message
}

/// A `<Response>` with one `<Message>` per chunk.
pub fn render(chunks: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
    for chunk in chunks {
        xml.push_str("<Message>");
        xml.push_str(&escape_xml(chunk));
        xml.push_str("</Message>");
    }
    xml.push_str("</Response>");
    xml
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
