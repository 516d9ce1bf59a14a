//! Keyed integrity tag for outgoing queries.
//!
//! Every query name carries an HMAC-MD5 tag computed over the transaction
//! id's textual hex form concatenated with the payload fragment, keyed with
//! the shared secret. The receiving server recomputes the tag to tell
//! legitimate agent traffic apart from stray lookups hitting the zone.
//! MD5 is mandated by the wire protocol; the tag authenticates, it does not
//! encrypt.

use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Computes the query tag: lowercase hex HMAC-MD5 over `tsid || fragment`.
///
/// Deterministic: identical inputs always yield the same 32-character tag.
///
/// # Arguments
/// * `tsid` - The transaction id in its 8-character hex rendering.
/// * `fragment` - The (already sanitized) payload fragment, possibly empty.
/// * `key` - The shared secret, used as raw bytes.
///
/// # Errors
/// Fails only if the underlying MAC cannot be initialized from the key.
/// Callers treat this as fatal: the agent cannot transmit without a tag.
pub fn sign(tsid: &str, fragment: &str, key: &[u8]) -> crate::error::Result<String> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|_| crate::error::AgentError::auth_error("Failed to initialize HMAC-MD5"))?;
    mac.update(tsid.as_bytes());
    mac.update(fragment.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
