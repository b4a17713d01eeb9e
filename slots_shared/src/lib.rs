use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    pub game_id: i64,
    pub session_token: String,
    pub bet_amount: f64,
    pub round_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WinRequest {
    pub game_id: i64,
    pub session_token: String,
    pub win_amount: f64,
    pub round_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BalanceResponse {
    pub balance: f64,
}

/// Settlement replies come either wrapped (`{"balance": n}`) or as a bare number.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum BalanceReply {
    Wrapped(BalanceResponse),
    Bare(f64),
}

impl BalanceReply {
    pub fn balance(self) -> f64 {
        match self {
            BalanceReply::Wrapped(r) => r.balance,
            BalanceReply::Bare(b) => b,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: None,
        }
    }

    /// The reason to show the player.
    pub fn reason(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// Messages exchanged with the window hosting the game frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrameMessage {
    #[serde(rename_all = "camelCase")]
    GameLoaded { game_id: Option<i64> },
    UpdateBalance { balance: f64 },
}

impl FrameMessage {
    /// Parses a message from the host; `None` for malformed or unknown messages.
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn to_json(&self) -> String {
        // enum of plain fields always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;
