use chrono::{DateTime, Utc};
use google_gmail1::api::{Message, MessagePart};
use regex::Regex;

use crate::model::message_record::{AttachmentMeta, EmailAddress, InboundMessageRecord};

lazy_static::lazy_static!(
    static ref RE_NAMED_ADDRESS: Regex =
        Regex::new(r#"^\s*"?([^"<]*?)"?\s*<([^>]+)>\s*$"#).unwrap();
);

/// Fully parsed inbound message, the unit flowing through one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub thread_id: String,
    pub from: EmailAddress,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub snippet: String,
    pub labels: Vec<String>,
    pub attachments: Vec<AttachmentMeta>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Parse a full-format Gmail API message. Returns `None` when the
    /// response is missing the pieces a message cannot be processed without
    /// (id, thread, payload, sender).
    pub fn from_gmail_message(msg: &Message) -> Option<InboundMessage> {
        let id = msg.id.clone()?;
        let thread_id = msg.thread_id.clone()?;
        let payload = msg.payload.as_ref()?;

        let from = parse_address(&header(payload, "from")?)?;
        let to = parse_address_list(header(payload, "to").as_deref().unwrap_or(""));
        let cc = parse_address_list(header(payload, "cc").as_deref().unwrap_or(""));
        let bcc = parse_address_list(header(payload, "bcc").as_deref().unwrap_or(""));
        let reply_to = header(payload, "reply-to");
        let subject = header(payload, "subject").unwrap_or_default();

        let PartExtract {
            first_plain_text,
            first_html_text,
            attachments,
        } = extract_parts(payload);

        let received_at = msg
            .internal_date
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Some(InboundMessage {
            id,
            thread_id,
            from,
            to,
            cc,
            bcc,
            reply_to,
            subject,
            body_text: first_plain_text,
            body_html: first_html_text,
            snippet: msg.snippet.clone().unwrap_or_default(),
            labels: msg.label_ids.clone().unwrap_or_default(),
            attachments,
            received_at,
        })
    }

    /// Plain text for the classifier: the text part when present, otherwise
    /// the HTML part run through html2text, otherwise the snippet.
    pub fn classification_text(&self) -> String {
        if let Some(text) = &self.body_text {
            return text.clone();
        }
        if let Some(html) = &self.body_html {
            return html2text::from_read(html.as_bytes(), 400);
        }
        self.snippet.clone()
    }

    /// Freeze this message into its persisted record form.
    pub fn to_record(&self, mailbox_id: &str, now: DateTime<Utc>) -> InboundMessageRecord {
        InboundMessageRecord {
            mailbox_id: mailbox_id.to_string(),
            provider_message_id: self.id.clone(),
            thread_id: self.thread_id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            reply_to: self.reply_to.clone(),
            subject: self.subject.clone(),
            body_text: self.body_text.clone(),
            body_html: self.body_html.clone(),
            snippet: self.snippet.clone(),
            labels: self.labels.clone(),
            attachments: self.attachments.clone(),
            received_at: self.received_at,
            classification: None,
            correlation: None,
            processed_at: None,
            created_at: now,
        }
    }
}

/// What a depth-first walk of one MIME tree yields. First `text/plain` and
/// first `text/html` leaf win; every leaf carrying an attachment id is
/// collected.
#[derive(Debug, Default, PartialEq)]
pub struct PartExtract {
    pub first_plain_text: Option<String>,
    pub first_html_text: Option<String>,
    pub attachments: Vec<AttachmentMeta>,
}

impl PartExtract {
    fn merge(mut self, other: PartExtract) -> PartExtract {
        if self.first_plain_text.is_none() {
            self.first_plain_text = other.first_plain_text;
        }
        if self.first_html_text.is_none() {
            self.first_html_text = other.first_html_text;
        }
        self.attachments.extend(other.attachments);
        self
    }
}

/// Pure walk over a Gmail message part tree.
pub fn extract_parts(part: &MessagePart) -> PartExtract {
    let mut out = PartExtract::default();

    if let Some(body) = part.body.as_ref() {
        if let Some(attachment_id) = body.attachment_id.as_ref() {
            if part.filename.as_deref().is_some_and(|f| !f.is_empty()) {
                out.attachments.push(AttachmentMeta {
                    filename: part.filename.clone().unwrap_or_default(),
                    mime_type: part
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                    size: body.size.unwrap_or(0) as i64,
                    attachment_id: attachment_id.clone(),
                });
            }
        }

        if let Some(data) = body.data.as_ref() {
            let decoded = String::from_utf8(data.clone()).ok();
            match part.mime_type.as_deref() {
                Some("text/plain") => out.first_plain_text = decoded,
                Some("text/html") => out.first_html_text = decoded,
                _ => {}
            }
        }
    }

    for child in part.parts.iter().flatten() {
        out = out.merge(extract_parts(child));
    }

    out
}

/// Extract a header value from a message part's header list.
pub fn header(part: &MessagePart, name: &str) -> Option<String> {
    part.headers.as_ref()?.iter().find_map(|h| {
        let matches = h
            .name
            .as_deref()
            .map(|n| n.eq_ignore_ascii_case(name))
            .unwrap_or(false);
        if matches {
            h.value.clone()
        } else {
            None
        }
    })
}

/// Parse a `Display Name <addr>` or bare-address header value.
pub fn parse_address(raw: &str) -> Option<EmailAddress> {
    if let Some(caps) = RE_NAMED_ADDRESS.captures(raw) {
        let name = caps.get(1).map(|m| m.as_str().trim().to_string());
        return Some(EmailAddress {
            email: caps.get(2)?.as_str().trim().to_string(),
            name: name.filter(|n| !n.is_empty()),
        });
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(EmailAddress {
        email: trimmed.to_string(),
        name: None,
    })
}

/// Parse a comma-separated recipient list into bare addresses.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(parse_address)
        .map(|a| a.email)
        .collect()
}
