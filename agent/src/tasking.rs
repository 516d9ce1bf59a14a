//! Tasking model and response parsing.
//!
//! Poll responses arrive in one of four shapes: the literal `ACK` (nothing
//! queued), a `txtvers`-prefixed service string (also nothing queued), the
//! compact plain wire form `taskid:command`, or a JSON tasking object. The
//! JSON form is parsed by direct scanning for the literal keys rather than a
//! full JSON parser: the controller emits a flat, predictable object and the
//! agent only needs three fields out of it.
//!
//! Known scanner limitations, inherited from the wire contract: `params`
//! object capture counts brace depth and therefore does not support quoted
//! braces, strings containing `}` inside the object, or escaped quotes.

/// Maximum accepted task id length (canonical UUID).
const MAX_ID_LEN: usize = 36;

/// Maximum accepted command line length in the JSON form.
const MAX_COMMAND_LEN: usize = 64;

/// Maximum accepted params blob length.
const MAX_PARAMS_LEN: usize = 4096;

/// One unit of tasking: produced by parsing, consumed once by dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub command: String,
    pub params: String,
}

/// How the result for a task must be wrapped on the way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Plain wire form: the raw result text is sent as-is.
    Plain,
    /// JSON tasking form: the result is wrapped in a
    /// `{"task_id":…,"output":…}` envelope.
    Json,
}

/// Classifies a raw poll response into a task, or nothing.
///
/// `ACK` and `txtvers…` replies mean no task is queued. A response whose
/// first non-space byte is `{` is treated as the JSON tasking form (a JSON
/// object necessarily contains `:`, so this check runs first). Any other
/// response containing `:` is the plain `id:command` form; without a
/// separator the whole string is taken as the command line under the legacy
/// task id `"0"`. Malformed JSON tasking yields `None` and is dropped
/// silently by the caller.
pub fn interpret_poll_response(raw: &str) -> Option<(Task, ReplyMode)> {
    if raw.is_empty() || raw == "ACK" || raw.starts_with("txtvers") {
        return None;
    }

    if raw.trim_start().starts_with('{') {
        return parse_tasking_json(raw).map(|task| (task, ReplyMode::Json));
    }

    match raw.split_once(':') {
        Some((id, command)) => Some((
            Task {
                id: id.to_string(),
                command: command.to_string(),
                params: String::new(),
            },
            ReplyMode::Plain,
        )),
        None => Some((
            Task {
                id: "0".to_string(),
                command: raw.to_string(),
                params: String::new(),
            },
            ReplyMode::Plain,
        )),
    }
}

/// Scans past a key's `:` and any spaces/quote, returning the value start.
fn value_start<'a>(buf: &'a str, key: &str) -> Option<&'a str> {
    let after_key = &buf[buf.find(key)? + key.len()..];
    let after_colon = &after_key[after_key.find(':')? + 1..];
    Some(after_colon.trim_start_matches([' ', '"']))
}

/// Extracts a quote-delimited string value for `key`, bounded by `max_len`.
fn string_field<'a>(buf: &'a str, key: &str, max_len: usize) -> Option<&'a str> {
    let rest = value_start(buf, key)?;
    let value = &rest[..rest.find('"').unwrap_or(rest.len())];

    if value.len() > max_len {
        return None;
    }
    Some(value)
}

/// Parses the JSON tasking form by literal-key scanning.
///
/// Required fields are `"id"` and `"command"`; a missing or over-long field
/// is a parse failure. `"params"` is optional and defaults to empty; an
/// object-typed value is captured by brace-depth counting (one nesting level,
/// braces included), a string value up to the closing quote, anything else
/// up to the next `,` or `}`.
pub fn parse_tasking_json(buf: &str) -> Option<Task> {
    let id = string_field(buf, "\"id\"", MAX_ID_LEN)?;
    let command = string_field(buf, "\"command\"", MAX_COMMAND_LEN)?;

    let params = match buf.find("\"params\"") {
        None => "",
        Some(key_pos) => {
            let after_key = &buf[key_pos + "\"params\"".len()..];
            let rest = after_key[after_key.find(':')? + 1..].trim_start_matches(' ');

            if let Some(body) = rest.strip_prefix('{') {
                let mut depth = 1usize;
                let mut end = rest.len();
                for (offset, c) in body.char_indices() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = offset + 2;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                &rest[..end]
            } else if let Some(body) = rest.strip_prefix('"') {
                &body[..body.find('"').unwrap_or(body.len())]
            } else {
                &rest[..rest
                    .find([',', '}'])
                    .unwrap_or(rest.len())]
            }
        }
    };

    if params.len() > MAX_PARAMS_LEN {
        return None;
    }

    Some(Task {
        id: id.to_string(),
        command: command.to_string(),
        params: params.to_string(),
    })
}

/// Wraps a task result in the JSON reply envelope.
///
/// Quotes, backslashes and control whitespace in the output are escaped so
/// multi-line command output survives the envelope.
pub fn result_envelope(task_id: &str, output: &str) -> String {
    let mut escaped = String::with_capacity(output.len());
    for c in output.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }

    format!("{{\"task_id\":\"{}\",\"output\":\"{}\"}}", task_id, escaped)
}
