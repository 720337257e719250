//! Line-oriented front end: plain text is sent, slash commands mutate.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use colloquy_common::{ColloquyError, MessageId};
use colloquy_session::{
    Activity, ActivityStatus, ContextStatus, Message, Role, ScrollAction, SessionError,
    SessionEvent, SessionHandle, TurnStatus, WarningLevel,
};

const HELP: &str = "\
commands (N is the number shown by /history):
  /stop            stop the streaming reply
  /edit N text     replace the content of message N
  /regen N         regenerate assistant message N
  /branch N        continue in a copy of the history up to N
  /delete N        delete message N and everything after it
  /history         list messages
  /activity        list research, coding and agent activity
  /context         show context window usage
  /up, /bottom     unpin or re-pin the view to the latest message
  /fork            accept the fork suggested at critical context usage
  /quit            close the session";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Say(String),
    Stop,
    Edit { index: usize, text: String },
    Regenerate(usize),
    Branch(usize),
    Delete(usize),
    History,
    Activity,
    Context,
    Up,
    Bottom,
    Fork,
    Help,
    Quit,
    Invalid(String),
}

/// `None` for blank lines.
pub fn parse(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Input::Say(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let input = match name {
        "stop" => Input::Stop,
        "edit" => {
            let (index, text) = match args.split_once(char::is_whitespace) {
                Some((index, text)) => (index, text.trim()),
                None => (args, ""),
            };
            match index.parse() {
                Ok(index) if !text.is_empty() => Input::Edit {
                    index,
                    text: text.to_string(),
                },
                _ => Input::Invalid("usage: /edit N text".into()),
            }
        }
        "regen" => indexed(args, "regen", Input::Regenerate),
        "branch" => indexed(args, "branch", Input::Branch),
        "delete" => indexed(args, "delete", Input::Delete),
        "history" => Input::History,
        "activity" => Input::Activity,
        "context" => Input::Context,
        "up" => Input::Up,
        "bottom" => Input::Bottom,
        "fork" => Input::Fork,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("unknown command /{other}, try /help")),
    };
    Some(input)
}

fn indexed(args: &str, name: &str, make: fn(usize) -> Input) -> Input {
    match args.parse() {
        Ok(index) => make(index),
        Err(_) => Input::Invalid(format!("usage: /{name} N")),
    }
}

/// Read stdin until `/quit` or end of input, then close the current session.
pub async fn run(mut handle: SessionHandle) -> Result<(), ColloquyError> {
    let mut printer = spawn_printer(handle.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse(&line) else {
            continue;
        };
        if input == Input::Quit {
            break;
        }
        match execute(&handle, input).await {
            Ok(Some(child)) => {
                printer.abort();
                println!("switched to session {}", child.id());
                printer = spawn_printer(child.subscribe());
                // Dropping the last parent handle closes that session.
                handle = child;
            }
            Ok(None) => {}
            Err(e) => eprintln!("error: {}", e.user_message()),
        }
    }

    printer.abort();
    handle
        .close()
        .await
        .map_err(|e| ColloquyError::Session(e.to_string()))
}

/// Apply one input. Returns the new session when the input branched.
async fn execute(
    handle: &SessionHandle,
    input: Input,
) -> Result<Option<SessionHandle>, SessionError> {
    match input {
        Input::Say(text) => {
            handle.send(text).await?;
        }
        Input::Stop => {
            if handle.stop().await?.is_none() {
                println!("nothing is streaming");
            }
        }
        Input::Edit { index, text } => {
            let Some(id) = message_at(handle, index).await? else {
                return Ok(no_such_message(index));
            };
            handle.edit(&id, text).await?;
            println!("edited message {index}");
        }
        Input::Regenerate(index) => {
            let Some(id) = message_at(handle, index).await? else {
                return Ok(no_such_message(index));
            };
            handle.regenerate(&id).await?;
        }
        Input::Branch(index) => {
            let Some(id) = message_at(handle, index).await? else {
                return Ok(no_such_message(index));
            };
            return Ok(Some(handle.branch(&id).await?));
        }
        Input::Delete(index) => {
            let Some(id) = message_at(handle, index).await? else {
                return Ok(no_such_message(index));
            };
            let removed = handle.delete(&id).await?;
            println!("deleted {} message(s)", removed.len());
        }
        Input::History => {
            let snapshot = handle.snapshot().await?;
            for (i, message) in snapshot.messages.iter().enumerate() {
                let edited = snapshot.edited.as_ref() == Some(&message.id);
                println!("{}", history_line(i + 1, message, edited));
            }
            if let Some(partial) = snapshot.streaming {
                println!("  … assistant  {partial}");
            }
        }
        Input::Activity => {
            let activities = handle.activities().await?;
            if activities.is_empty() {
                println!("no activity");
            }
            for activity in &activities {
                println!("{}", activity_line(activity));
            }
        }
        Input::Context => match handle.context_status().await? {
            Some(status) => println!("{}", context_line(&status)),
            None => println!("context usage unknown"),
        },
        Input::Up => {
            handle.scroll(ScrollAction::Up).await?;
            println!("view unpinned");
        }
        Input::Bottom => {
            handle.scroll(ScrollAction::JumpToBottom).await?;
        }
        Input::Fork => return Ok(Some(handle.fork_from_recommendation().await?)),
        Input::Help => println!("{HELP}"),
        Input::Invalid(reason) => eprintln!("{reason}"),
        Input::Quit => {}
    }
    Ok(None)
}

async fn message_at(
    handle: &SessionHandle,
    index: usize,
) -> Result<Option<MessageId>, SessionError> {
    let messages = handle.messages().await?;
    Ok(index
        .checked_sub(1)
        .and_then(|i| messages.get(i))
        .map(|m| m.id.clone()))
}

fn no_such_message(index: usize) -> Option<SessionHandle> {
    eprintln!("no message {index}, see /history");
    None
}

fn spawn_printer(mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "terminal fell behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Delta { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        SessionEvent::TurnFinished { status, .. } => match status {
            TurnStatus::Stopped => println!(" [stopped]"),
            _ => println!(),
        },
        SessionEvent::TurnFailed { reason, .. } => eprintln!("\n{reason}"),
        SessionEvent::ContextUpdated(status) if status.warning_level != WarningLevel::Ok => {
            eprintln!("{}", context_line(status));
            if let Some(recommendation) = &status.recommendation {
                eprintln!("{} (/fork)", recommendation.message);
            }
        }
        SessionEvent::ScrollToLatest => tracing::trace!("scroll to latest"),
        _ => {}
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn history_line(number: usize, message: &Message, edited: bool) -> String {
    let mut line = format!("{number:>3} {:<9}  {}", role_label(message.role), message.content);
    if message.is_stopped() {
        line.push_str(" [stopped]");
    }
    if edited {
        line.push_str(" [edited, /regen the reply to apply]");
    }
    if !message.attachments.is_empty() {
        line.push_str(&format!(" [{} attachment(s)]", message.attachments.len()));
    }
    line
}

fn activity_line(activity: &Activity) -> String {
    let status = match activity.status {
        ActivityStatus::Active => "active",
        ActivityStatus::Completed => "done",
    };
    format!(
        "[{status:>6} {:>3}%] {}: {}",
        activity.progress, activity.title, activity.description
    )
}

fn context_line(status: &ContextStatus) -> String {
    let level = match status.warning_level {
        WarningLevel::Ok => "ok",
        WarningLevel::Warn => "warning",
        WarningLevel::Critical => "critical",
    };
    format!(
        "context {:.1}% ({} / {} tokens, {level})",
        status.percentage, status.current_tokens, status.limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(parse("  hello  "), Some(Input::Say("hello".into())));
        assert_eq!(parse("   "), None);
    }

    #[test]
    fn indexed_commands() {
        assert_eq!(parse("/regen 4"), Some(Input::Regenerate(4)));
        assert_eq!(parse("/branch 2"), Some(Input::Branch(2)));
        assert_eq!(parse("/delete 1"), Some(Input::Delete(1)));
        assert!(matches!(parse("/regen"), Some(Input::Invalid(_))));
        assert!(matches!(parse("/delete x"), Some(Input::Invalid(_))));
    }

    #[test]
    fn edit_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse("/edit 3   make it  shorter "),
            Some(Input::Edit {
                index: 3,
                text: "make it  shorter".into()
            })
        );
        assert!(matches!(parse("/edit 3"), Some(Input::Invalid(_))));
        assert!(matches!(parse("/edit"), Some(Input::Invalid(_))));
    }

    #[test]
    fn bare_commands() {
        assert_eq!(parse("/stop"), Some(Input::Stop));
        assert_eq!(parse("/history"), Some(Input::History));
        assert_eq!(parse("/activity"), Some(Input::Activity));
        assert_eq!(parse("/context"), Some(Input::Context));
        assert_eq!(parse("/up"), Some(Input::Up));
        assert_eq!(parse("/bottom"), Some(Input::Bottom));
        assert_eq!(parse("/fork"), Some(Input::Fork));
        assert_eq!(parse("/quit"), Some(Input::Quit));
        assert!(matches!(parse("/nope"), Some(Input::Invalid(_))));
    }

    #[test]
    fn history_line_marks_stopped_and_edited() {
        let message = Message::user("hi");
        assert_eq!(history_line(1, &message, false), "  1 you        hi");
        assert!(history_line(1, &message, true).contains("[edited"));
    }

    #[test]
    fn context_line_formats_percentage() {
        let status = ContextStatus {
            current_tokens: 950,
            limit: 1000,
            percentage: 95.0,
            warning_level: WarningLevel::Critical,
            recommendation: None,
        };
        assert_eq!(context_line(&status), "context 95.0% (950 / 1000 tokens, critical)");
    }
}
