//! Activity deriver: a pure projection of (message log, live turn) into
//! activity records.
//!
//! Retrospective records come from finalized assistant messages, one
//! provenance per message with agent results taking precedence over research
//! sources, and research sources over code blocks. A streaming turn adds
//! exactly one live record at the end.

mod policy;
mod types;


use crate::ingest::Turn;
use crate::message::{AgentTask, AgentTaskStatus, Message, Role};

pub use policy::{ActivityPolicy, KeywordClassifier, LivePhase, PhaseClassifier};
pub use types::{Activity, ActivityDetail, ActivityKind, ActivityStatus};

const DESCRIPTION_CHARS: usize = 80;

/// Derive the activity list. Safe to call on every tick; the result depends
/// only on the arguments.
pub fn derive(messages: &[Message], turn: Option<&Turn>, policy: &ActivityPolicy) -> Vec<Activity> {
    let mut activities: Vec<Activity> = messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .flat_map(|m| retrospective(m, policy))
        .collect();

    if let Some(turn) = turn.filter(|t| t.is_streaming()) {
        activities.push(live(messages, turn, policy));
    }
    activities
}

fn retrospective(message: &Message, policy: &ActivityPolicy) -> Vec<Activity> {
    if let Some(tasks) = message.agent_results.as_ref().filter(|t| !t.is_empty()) {
        return tasks
            .iter()
            .enumerate()
            .map(|(i, task)| agent_subtask(message, i, task))
            .collect();
    }

    if !message.research_sources.is_empty() {
        return vec![research(message)];
    }

    let blocks = count_code_blocks(&message.content);
    let coding_capable = message
        .model
        .as_deref()
        .is_some_and(|m| policy.is_coding_model(m));
    if blocks > 0 && coding_capable {
        return vec![coding(message, blocks)];
    }
    Vec::new()
}

fn agent_subtask(message: &Message, index: usize, task: &AgentTask) -> Activity {
    let (status, progress, completed_at) = match task.status {
        AgentTaskStatus::Completed | AgentTaskStatus::Failed => {
            (ActivityStatus::Completed, 100, Some(message.created_at))
        }
        AgentTaskStatus::Running => (ActivityStatus::Active, 50, None),
        AgentTaskStatus::Pending => (ActivityStatus::Active, 0, None),
    };
    let description = match task.summary {
        Some(ref summary) => format!("{}: {}", task.agent, summary),
        None => task.agent.clone(),
    };
    Activity {
        id: format!("{}:agent:{index}", message.id),
        status,
        title: task.title.clone(),
        description: clip(&description),
        progress,
        detail: ActivityDetail::AgentSubtask {
            agent: task.agent.clone(),
            task_status: task.status,
        },
        message_id: Some(message.id.clone()),
        started_at: message.created_at,
        completed_at,
    }
}

fn research(message: &Message) -> Activity {
    let count = message.research_sources.len();
    let noun = if count == 1 { "source" } else { "sources" };
    let titles: Vec<&str> = message
        .research_sources
        .iter()
        .take(3)
        .map(|s| s.title.as_str())
        .collect();
    Activity {
        id: format!("{}:research", message.id),
        status: ActivityStatus::Completed,
        title: format!("Researched {count} {noun}"),
        description: clip(&titles.join(", ")),
        progress: 100,
        detail: ActivityDetail::Research {
            sources: message.research_sources.clone(),
        },
        message_id: Some(message.id.clone()),
        started_at: message.created_at,
        completed_at: Some(message.created_at),
    }
}

fn coding(message: &Message, blocks: usize) -> Activity {
    let noun = if blocks == 1 { "code block" } else { "code blocks" };
    Activity {
        id: format!("{}:coding", message.id),
        status: ActivityStatus::Completed,
        title: format!("Wrote {blocks} {noun}"),
        description: message.model.clone().unwrap_or_default(),
        progress: 100,
        detail: ActivityDetail::Coding { code_blocks: blocks },
        message_id: Some(message.id.clone()),
        started_at: message.created_at,
        completed_at: Some(message.created_at),
    }
}

fn live(messages: &[Message], turn: &Turn, policy: &ActivityPolicy) -> Activity {
    let prompt = messages
        .iter()
        .find(|m| &m.id == turn.user_message_id())
        .or_else(|| messages.iter().rev().find(|m| m.role == Role::User))
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    let (title, detail) = match policy.classify(prompt) {
        LivePhase::Research => (
            "Researching",
            ActivityDetail::Research {
                sources: Vec::new(),
            },
        ),
        LivePhase::Coding => (
            "Writing code",
            ActivityDetail::Coding {
                code_blocks: count_code_blocks(turn.buffered_text()),
            },
        ),
    };

    Activity {
        id: format!("live:{}", turn.id()),
        status: ActivityStatus::Active,
        title: title.to_string(),
        description: clip(prompt),
        progress: policy.live_progress(turn.buffered_text().chars().count()),
        detail,
        message_id: None,
        started_at: turn.started_at(),
        completed_at: None,
    }
}

/// Complete fenced blocks: fence lines divided by two, rounded down.
pub fn count_code_blocks(content: &str) -> usize {
    let fences = content
        .lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count();
    fences / 2
}

fn clip(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= DESCRIPTION_CHARS {
        return line.to_string();
    }
    let mut clipped: String = line.chars().take(DESCRIPTION_CHARS - 1).collect();
    clipped.push('…');
    clipped
}
