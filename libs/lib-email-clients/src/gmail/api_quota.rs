//! Gmail API quota costs, in quota units per call.
//!
//! Values match the published per-method costs. The per-user limit is 250
//! units per second; clients size their leaky bucket from these numbers.

pub struct GmailApiQuota {
    pub messages_list: usize,
    pub messages_get: usize,
    pub messages_modify: usize,
    pub messages_send: usize,
    pub labels_list: usize,
    pub labels_create: usize,
    pub get_profile: usize,
}

pub const GMAIL_API_QUOTA: GmailApiQuota = GmailApiQuota {
    messages_list: 5,
    messages_get: 5,
    messages_modify: 5,
    messages_send: 100,
    labels_list: 1,
    labels_create: 5,
    get_profile: 1,
};

pub const GMAIL_QUOTA_PER_SECOND: usize = 250;
