//! Session state owning identity, configuration and sequence counters.
//!
//! The C heritage of this protocol kept the poll and send sequence counters
//! as file-level statics next to a global config block. Here all of it lives
//! in one `AgentSession` that is moved into whichever loop runs (foreground
//! or background service), so exactly one loop can ever drive a session and
//! no synchronization is needed.

use crate::codec::TransactionId;
use crate::config::{AgentConfig, AgentIdentity};

/// Mutable per-process protocol state.
///
/// Sequence counters are independent per direction (poll vs. send), start at
/// zero on process start, are incremented before every use and wrap silently
/// at 2^24. Callers must tolerate wraparound; there is no uniqueness
/// guarantee beyond 2^24 operations per direction.
#[derive(Debug)]
pub struct AgentSession {
    pub identity: AgentIdentity,
    pub config: AgentConfig,
    poll_sequence: u32,
    send_sequence: u32,
}

impl AgentSession {
    pub fn new(identity: AgentIdentity, config: AgentConfig) -> Self {
        Self {
            identity,
            config,
            poll_sequence: 0,
            send_sequence: 0,
        }
    }

    /// Next transaction id for a poll query.
    pub fn next_poll_tsid(&mut self) -> TransactionId {
        self.poll_sequence = (self.poll_sequence + 1) & 0x00ff_ffff;
        TransactionId::new(self.poll_sequence)
    }

    /// Next transaction id for an outbound transfer chunk.
    pub fn next_send_tsid(&mut self) -> TransactionId {
        self.send_sequence = (self.send_sequence + 1) & 0x00ff_ffff;
        TransactionId::new(self.send_sequence)
    }
}
