//! Offline backend used by the terminal front end.
//!
//! Streams an echo of the prompt word by word and estimates context usage
//! at four characters per token.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use colloquy_common::SessionId;
use colloquy_session::{
    ChunkStream, ContextReport, ContextSource, StreamChunk, TransportError, TurnBackend,
    TurnRequest,
};

const CHARS_PER_TOKEN: usize = 4;

pub struct DemoBackend {
    budget: u64,
    word_delay: Duration,
    usage: Mutex<HashMap<SessionId, u64>>,
}

impl DemoBackend {
    pub fn new(budget: u64, word_delay: Duration) -> Self {
        Self {
            budget: budget.max(1),
            word_delay,
            usage: Mutex::new(HashMap::new()),
        }
    }

    fn record_usage(&self, session_id: &SessionId, tokens: u64) -> Result<(), TransportError> {
        let mut usage = self
            .usage
            .lock()
            .map_err(|_| TransportError::Protocol("usage table poisoned".into()))?;
        usage.insert(session_id.clone(), tokens);
        Ok(())
    }
}

#[async_trait]
impl TurnBackend for DemoBackend {
    async fn start_turn(&self, request: TurnRequest) -> Result<ChunkStream, TransportError> {
        let reply = compose_reply(&request.user_content);
        let chars = request
            .history
            .iter()
            .map(|m| m.content.chars().count())
            .sum::<usize>()
            + reply.chars().count();
        self.record_usage(&request.session_id, estimate_tokens(chars))?;

        let words: Vec<String> = reply.split_inclusive(' ').map(String::from).collect();
        let last = words.len() as u64;
        let chunks = words
            .into_iter()
            .enumerate()
            .map(|(seq, word)| StreamChunk::delta(seq as u64, word))
            .chain(std::iter::once(StreamChunk::finished(last)));

        let delay = self.word_delay;
        Ok(stream::iter(chunks)
            .then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                chunk
            })
            .boxed())
    }
}

#[async_trait]
impl ContextSource for DemoBackend {
    async fn context_status(&self, session_id: &SessionId) -> Result<ContextReport, TransportError> {
        let current_tokens = self
            .usage
            .lock()
            .map_err(|_| TransportError::Protocol("usage table poisoned".into()))?
            .get(session_id)
            .copied()
            .unwrap_or(0);
        Ok(ContextReport {
            current_tokens,
            limit: self.budget,
            percentage: current_tokens as f64 * 100.0 / self.budget as f64,
            recommendation: None,
        })
    }
}

fn estimate_tokens(chars: usize) -> u64 {
    chars.div_ceil(CHARS_PER_TOKEN) as u64
}

/// Prompts that mention code get a fenced block back so coding activity shows up.
fn compose_reply(prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.to_lowercase().contains("code") {
        format!(
            "Here is a sketch for that.\n\n```rust\nfn main() {{\n    println!(\"{{}}\", {prompt:?});\n}}\n```\n"
        )
    } else {
        format!("You said: {prompt}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_common::MessageId;
    use colloquy_session::{Message, TurnOptions};

    fn request(session_id: &SessionId, content: &str) -> TurnRequest {
        TurnRequest {
            session_id: session_id.clone(),
            user_message_id: MessageId::new(),
            user_content: content.into(),
            history: vec![Message::user(content)],
            options: TurnOptions::default(),
        }
    }

    #[tokio::test]
    async fn streams_echo_word_by_word_then_final() {
        let backend = DemoBackend::new(1000, Duration::ZERO);
        let session = SessionId::new();
        let chunks: Vec<StreamChunk> = backend
            .start_turn(request(&session, "hello there"))
            .await
            .unwrap()
            .collect()
            .await;

        let text: String = chunks.iter().map(|c| c.delta.as_str()).collect();
        assert_eq!(text, "You said: hello there");
        assert_eq!(chunks.len(), 5);
        assert!(chunks.last().unwrap().is_final);
        let seqs: Vec<u64> = chunks.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn code_prompt_gets_fenced_block() {
        let backend = DemoBackend::new(1000, Duration::ZERO);
        let chunks: Vec<StreamChunk> = backend
            .start_turn(request(&SessionId::new(), "write code"))
            .await
            .unwrap()
            .collect()
            .await;
        let text: String = chunks.iter().map(|c| c.delta.as_str()).collect();
        assert!(text.contains("```rust"));
    }

    #[tokio::test]
    async fn context_usage_tracks_last_turn() {
        let backend = DemoBackend::new(100, Duration::ZERO);
        let session = SessionId::new();

        let empty = backend.context_status(&session).await.unwrap();
        assert_eq!(empty.current_tokens, 0);
        assert_eq!(empty.limit, 100);

        // "abcd" plus "You said: abcd" is 18 chars.
        backend.start_turn(request(&session, "abcd")).await.unwrap();
        let report = backend.context_status(&session).await.unwrap();
        assert_eq!(report.current_tokens, 5);
        assert!((report.percentage - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 1);
        assert_eq!(estimate_tokens(8), 2);
    }
}
