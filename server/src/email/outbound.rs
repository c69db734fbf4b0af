use anyhow::{anyhow, Context};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use lettre::message::{Mailbox as LettreMailbox, MultiPart};

/// A reply to be sent on an existing thread. `in_reply_to` / `references`
/// come from the original message's headers so clients thread correctly.
#[derive(Debug, Clone)]
pub struct OutboundReply {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub thread_id: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

/// Build the RFC 822 form of a reply and encode it the way the provider's
/// send endpoint expects (base64url, no padding).
pub fn build_reply_raw(reply: &OutboundReply) -> anyhow::Result<String> {
    let from_mailbox: LettreMailbox = reply
        .from
        .parse()
        .map_err(|e| anyhow!("Invalid 'from' address '{}': {}", reply.from, e))?;

    let mut builder = lettre::Message::builder()
        .from(from_mailbox)
        .subject(reply_subject(&reply.subject));

    if let Some(ref in_reply_to) = reply.in_reply_to {
        builder = builder.in_reply_to(in_reply_to.clone());
    }

    if let Some(ref references) = reply.references {
        builder = builder.references(references.clone());
    }

    for recipient in &reply.to {
        builder = builder.to(recipient
            .parse()
            .map_err(|e| anyhow!("Invalid 'to' address '{}': {}", recipient, e))?);
    }

    for recipient in &reply.cc {
        builder = builder.cc(recipient
            .parse()
            .map_err(|e| anyhow!("Invalid 'cc' address '{}': {}", recipient, e))?);
    }

    let plain = reply
        .body_text
        .clone()
        .unwrap_or_else(|| html2text::from_read(reply.body_html.as_bytes(), 400));

    let message = builder
        .multipart(MultiPart::alternative_plain_html(
            plain,
            reply.body_html.clone(),
        ))
        .context("Failed to build reply message")?;

    Ok(URL_SAFE_NO_PAD.encode(message.formatted()))
}

/// Prefix with `Re:` unless the subject already carries one.
fn reply_subject(subject: &str) -> String {
    if subject.trim_start().to_ascii_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}
