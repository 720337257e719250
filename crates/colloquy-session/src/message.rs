//! Finalized conversation messages and their structured attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colloquy_common::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Reference to a file handed over by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    /// Opaque locator returned by the uploader.
    pub reference: String,
}

/// A web or document source consulted while researching an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AgentTaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, AgentTaskStatus::Completed | AgentTaskStatus::Failed)
    }
}

/// One sub-task of a multi-agent answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTask {
    pub agent: String,
    pub title: String,
    pub status: AgentTaskStatus,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub label: String,
    pub prompt: String,
}

/// Follow-up prompts offered under an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuickActionSet {
    pub actions: Vec<QuickAction>,
}

/// Why a message ended other than by normal completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageMarker {
    /// The user stopped the turn; content is the partial output.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub research_sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_results: Option<Vec<AgentTask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_actions: Option<QuickActionSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<MessageMarker>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            model: None,
            attachments: Vec::new(),
            research_sources: Vec::new(),
            agent_results: None,
            quick_actions: None,
            marker: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_research_sources(mut self, sources: Vec<Source>) -> Self {
        self.research_sources = sources;
        self
    }

    pub fn with_agent_results(mut self, tasks: Vec<AgentTask>) -> Self {
        self.agent_results = Some(tasks);
        self
    }

    pub fn with_quick_actions(mut self, actions: QuickActionSet) -> Self {
        self.quick_actions = Some(actions);
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.marker == Some(MessageMarker::Stopped)
    }
}
