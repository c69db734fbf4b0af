use serde::Serialize;

/// Stage a poll-cycle error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStage {
    Connect,
    List,
    Fetch,
    Parse,
    Persist,
    Classify,
    Card,
}

impl std::fmt::Display for PollStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollStage::Connect => write!(f, "connect"),
            PollStage::List => write!(f, "list"),
            PollStage::Fetch => write!(f, "fetch"),
            PollStage::Parse => write!(f, "parse"),
            PollStage::Persist => write!(f, "persist"),
            PollStage::Classify => write!(f, "classify"),
            PollStage::Card => write!(f, "card"),
        }
    }
}

/// One error surfaced by a poll cycle. Message-level entries carry the
/// provider message id; mailbox-level entries do not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollError {
    pub message_id: Option<String>,
    pub stage: PollStage,
    pub detail: String,
}

impl PollError {
    pub fn mailbox(stage: PollStage, detail: impl Into<String>) -> Self {
        PollError {
            message_id: None,
            stage,
            detail: detail.into(),
        }
    }

    pub fn message(stage: PollStage, message_id: impl Into<String>, detail: impl Into<String>) -> Self {
        PollError {
            message_id: Some(message_id.into()),
            stage,
            detail: detail.into(),
        }
    }
}

/// Summary of one poll cycle. `success` reflects mailbox-level health only;
/// per-message failures are isolated into `errors` without failing the cycle.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub success: bool,
    pub messages_processed: u32,
    pub cards_created: u32,
    pub auto_executed_cards: u32,
    pub errors: Vec<PollError>,
}

impl PollResult {
    /// A cycle that did nothing and was fine with that.
    pub fn empty_success() -> Self {
        PollResult {
            success: true,
            ..Default::default()
        }
    }
}
