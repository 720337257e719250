//! Restores send order for transports that may deliver chunks out of order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::StreamChunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{held} chunks held waiting for seq {waiting_for}")]
pub struct SequenceOverflow {
    pub waiting_for: u64,
    pub held: usize,
}

#[derive(Debug)]
pub(crate) struct Resequencer {
    next: u64,
    pending: BTreeMap<u64, StreamChunk>,
    limit: usize,
}

impl Resequencer {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
            limit: limit.max(1),
        }
    }

    /// Accept one chunk and release every chunk that is now contiguous.
    ///
    /// Retransmitted sequence numbers are ignored.
    pub(crate) fn push(&mut self, chunk: StreamChunk) -> Result<Vec<StreamChunk>, SequenceOverflow> {
        if chunk.seq < self.next || self.pending.contains_key(&chunk.seq) {
            debug!(seq = chunk.seq, next = self.next, "dropping duplicate chunk");
            return Ok(Vec::new());
        }
        if chunk.seq != self.next && self.pending.len() >= self.limit {
            return Err(SequenceOverflow {
                waiting_for: self.next,
                held: self.pending.len(),
            });
        }

        self.pending.insert(chunk.seq, chunk);

        let mut ready = Vec::new();
        while let Some(chunk) = self.pending.remove(&self.next) {
            self.next += 1;
            ready.push(chunk);
        }
        Ok(ready)
    }

    pub(crate) fn held(&self) -> usize {
        self.pending.len()
    }
}
