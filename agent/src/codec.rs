//! Query codec: transaction ids, the safe-alphabet transform and DNS name
//! assembly.
//!
//! Query names have the shape `prefix.tsid.[data.]tag.domain`. Every label
//! must stay within the 63-octet DNS label limit and the restricted
//! `[A-Za-z0-9_-]` alphabet; the data label is omitted entirely (not emitted
//! as an empty string) when the payload fragment is empty, a wire-format
//! contract the decoding server depends on.
//!
//! # DNS Constraints
//! - Maximum label length: 63 octets per name component
//! - Payload fragments are base64 mapped into the label-safe alphabet
//!   (`+`→`-`, `/`→`_`, padding `=` dropped)

use base64::Engine;

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Raw fragment size for result uploads.
///
/// 45 raw bytes expand to 60 base64 characters before sanitization, which
/// keeps the encoded data label within the 63-octet limit.
pub const RAW_CHUNK_SIZE: usize = 45;

/// Transaction identifier carried in every query for correlation.
///
/// A `(channel, sequence)` pair rendered as 8 hex characters
/// (`{:02x}{:06x}`). The channel byte is reserved for future multiplexing
/// and is always zero today; the sequence is a per-direction counter that
/// wraps silently at 2^24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId {
    pub channel: u8,
    pub sequence: u32,
}

impl TransactionId {
    /// Creates a transaction id on the default (zero) channel.
    pub fn new(sequence: u32) -> Self {
        Self {
            channel: 0,
            sequence: sequence & 0x00ff_ffff,
        }
    }
}

impl std::fmt::Display for TransactionId {
    /// Renders the id as 2 hex chars of channel and 6 of sequence.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}{:06x}", self.channel, self.sequence & 0x00ff_ffff)
    }
}

/// Maps a base64 string into the DNS-label-safe alphabet.
///
/// Alphanumerics pass through unchanged, `+` becomes `-`, `/` becomes `_`
/// and padding `=` characters are dropped entirely, so the output may be
/// shorter than the input. Dropping the padding is lossy: the receiver must
/// re-derive the original byte count from its own length accounting rather
/// than from padding. This must be preserved exactly; it is a property of
/// the wire format, not a defect.
pub fn sanitize_base64(encoded: &str) -> String {
    encoded
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '+' => Some('-'),
            '/' => Some('_'),
            _ => None,
        })
        .collect()
}

/// Base64-encodes raw bytes and maps the result into the safe alphabet.
pub fn safe_encode(data: &[u8]) -> String {
    sanitize_base64(&base64::prelude::BASE64_STANDARD.encode(data))
}

/// Assembles the full query name `prefix.tsid.[data.]tag.domain`.
///
/// Joins the non-empty labels with `.`; when `fragment` is empty the data
/// label is omitted and the name has one fewer label. The fragment must
/// already be restricted to the safe alphabet and must not exceed
/// [`MAX_LABEL_LEN`] octets; the codec does not re-validate this (caller
/// precondition, enforced by the transfer layer's fragment sizing).
pub fn encode_query(
    prefix: &str,
    fragment: &str,
    domain: &str,
    tsid: &TransactionId,
    tag: &str,
) -> String {
    let tsid = tsid.to_string();

    if fragment.is_empty() {
        format!("{}.{}.{}.{}", prefix, tsid, tag, domain)
    } else {
        format!("{}.{}.{}.{}.{}", prefix, tsid, fragment, tag, domain)
    }
}
