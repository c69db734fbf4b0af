use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::server_config::cfg;

/// Classification categories assigned by the external classifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    AmcOrder,
    Opportunity,
    Case,
    Status,
    Scheduling,
    Updates,
    Ap,
    Ar,
    Information,
    Notifications,
    Remove,
    Escalate,
}

impl Category {
    /// The namespaced mailbox label applied for this category.
    pub fn mail_label(&self) -> String {
        namespaced(self.as_ref())
    }
}

/// Labels the curator applies beyond the per-category ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityLabels {
    AutoResponded,
}

impl UtilityLabels {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityLabels::AutoResponded => "Auto-Responded",
        }
    }

    pub fn mail_label(&self) -> String {
        namespaced(self.as_str())
    }
}

/// Prefix a label with the configured namespace, e.g. `Mailroom/STATUS`.
pub fn namespaced(label: &str) -> String {
    format!("{}/{}", cfg.sync.label_namespace, label)
}
