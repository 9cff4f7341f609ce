use super::{Responder, ResponderError};
use crate::store::{Keyword, TaskDocument, TaskKind};
use chrono::{DateTime, Utc};

const TWEET_LIMIT: usize = 280;
const PREVIEW_LIMIT: usize = 200;

/// Deterministic draft generator. Picks an opening by channel, a pitch by
/// classification keyword, and always closes with the review checklist the
/// operator works through before approving.
#[derive(Debug, Clone, Default)]
pub struct TemplateResponder;

impl TemplateResponder {
    pub fn new() -> Self {
        Self
    }
}

impl Responder for TemplateResponder {
    fn generate(
        &self,
        doc: &TaskDocument,
        now: DateTime<Utc>,
    ) -> Result<String, ResponderError> {
        let response = response_text(&doc.front.kind, doc.front.keyword);
        let mut draft = String::new();
        draft.push_str("## Draft Response\n\n");
        draft.push_str(&format!(
            "Generated: {}\n",
            now.format("%Y-%m-%d %H:%M UTC")
        ));
        draft.push_str(&format!("Channel: {}\n", doc.front.kind));
        draft.push_str(&format!("Classification: {}\n", doc.front.keyword));

        let preview = body_preview(&doc.body);
        if !preview.is_empty() {
            draft.push_str(&format!("\n> {preview}\n"));
        }

        draft.push_str(&format!("\n{response}\n"));
        if matches!(doc.front.kind, TaskKind::TwitterMention) {
            draft.push_str(&format!(
                "\nCharacter count: {} / {TWEET_LIMIT}\n",
                response.chars().count()
            ));
        }

        draft.push_str("\n## Action Required\n\n");
        draft.push_str("- [ ] Review the draft above\n");
        draft.push_str("- [ ] Edit the response if needed\n");
        if matches!(doc.front.kind, TaskKind::TwitterMention) {
            draft.push_str(&format!("- [ ] Keep the response under {TWEET_LIMIT} characters\n"));
        }
        draft.push_str("- [ ] Move this file to Approved/ to send, or Rejected/ to discard\n");
        Ok(draft)
    }
}

fn response_text(kind: &TaskKind, keyword: Keyword) -> String {
    let greeting = match kind {
        TaskKind::FacebookMessage | TaskKind::InstagramMessage => {
            "Hi! Thanks for your message."
        }
        TaskKind::TwitterMention => "Hi! Thanks for the mention.",
        TaskKind::LinkedinMessage => "Hello, thank you for connecting with us.",
        TaskKind::GmailMessage => "Hello,\n\nThank you for your email.",
        TaskKind::WhatsappMessage => "Hi! Thanks for reaching out on WhatsApp.",
        TaskKind::Other(_) => "Hello, thank you for getting in touch.",
    };
    let pitch = match keyword {
        Keyword::Sales => {
            "We'd love to help with your request. Could you share what you're \
             looking for, your timeline, and a budget range? We'll come back \
             with a tailored proposal."
        }
        Keyword::Client => {
            "We appreciate you being a valued client. Could you share a bit \
             more about your request so we can route it to the right person?"
        }
        Keyword::Project => {
            "This sounds like an interesting opportunity. Could you outline \
             the project scope, expected deliverables, and timeline? Happy to \
             set up a quick call this week."
        }
        Keyword::General => {
            "We've received your message and will get back to you shortly. If \
             this is urgent, please let us know."
        }
    };
    format!("{greeting}\n\n{pitch}")
}

fn body_preview(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_LIMIT {
        return flat;
    }
    let truncated: String = flat.chars().take(PREVIEW_LIMIT).collect();
    format!("{truncated}...")
}
