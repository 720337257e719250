//! Display-oriented activity records derived from the message log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colloquy_common::MessageId;

use crate::message::{AgentTaskStatus, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Research,
    Coding,
    AgentSubtask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Completed,
}

/// Kind-specific payload. Closed set: presentation code matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityDetail {
    Research { sources: Vec<Source> },
    Coding { code_blocks: usize },
    AgentSubtask {
        agent: String,
        task_status: AgentTaskStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub status: ActivityStatus,
    pub title: String,
    pub description: String,
    /// 0-100. Never 100 while `status` is `Active`.
    pub progress: u8,
    pub detail: ActivityDetail,
    /// The finalized message this was scanned from; `None` for the live one.
    pub message_id: Option<MessageId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        match self.detail {
            ActivityDetail::Research { .. } => ActivityKind::Research,
            ActivityDetail::Coding { .. } => ActivityKind::Coding,
            ActivityDetail::AgentSubtask { .. } => ActivityKind::AgentSubtask,
        }
    }

    pub fn is_live(&self) -> bool {
        self.message_id.is_none()
    }
}
