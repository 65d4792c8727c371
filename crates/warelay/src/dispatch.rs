//! Outbound request normalization.
//!
//! `POST /send-message` bodies arrive loosely typed: the automation side has
//! historically used several field names for the same thing. Resolution is
//! an explicit ordered alias list, first present key wins; everything here
//! is a pure function so the rules are testable without a server.

use serde_json::{Map, Value};
use thiserror::Error;

/// Accepted field names for the target identifier, in resolution order.
pub const TARGET_ALIASES: [&str; 3] = ["to", "jid", "phone"];

/// Accepted field names for the message text, in resolution order.
pub const TEXT_ALIASES: [&str; 3] = ["message", "text", "msg"];

/// Domain suffix for direct-message JIDs.
pub const DEFAULT_DM_DOMAIN: &str = "s.whatsapp.net";

/// Legacy domain convention still used by some provider builds.
pub const LEGACY_DM_DOMAIN: &str = "c.us";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("missing target field (accepted: {})", TARGET_ALIASES.join(", "))]
    MissingTarget,
    #[error("missing message field (accepted: {})", TEXT_ALIASES.join(", "))]
    MissingText,
    #[error("invalid target '{given}': {reason}")]
    InvalidTarget { given: String, reason: String },
}

/// First present non-null value among `aliases`, with the matched key.
/// An explicit `null` counts as absent, so later aliases still match.
fn resolve_alias<'a>(
    body: &'a Map<String, Value>,
    aliases: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    aliases.iter().find_map(|key| {
        body.get(*key)
            .filter(|value| !value.is_null())
            .map(|value| (*key, value))
    })
}

/// Resolve the raw target identifier. Numbers are accepted and stringified
/// (phone numbers pasted without quotes); `null` counts as absent.
pub fn resolve_target(body: &Map<String, Value>) -> Result<String, DispatchError> {
    match resolve_alias(body, &TARGET_ALIASES) {
        Some((_, Value::String(s))) => Ok(s.clone()),
        Some((_, Value::Number(n))) => Ok(n.to_string()),
        _ => Err(DispatchError::MissingTarget),
    }
}

/// Resolve the outbound text. Absent or `null` is rejected; any value that
/// trims to empty (including an explicit `""`) is replaced by
/// `default_message`. One uniform rule: whitespace-only and empty behave
/// identically.
pub fn resolve_text(
    body: &Map<String, Value>,
    default_message: &str,
) -> Result<String, DispatchError> {
    let text = match resolve_alias(body, &TEXT_ALIASES) {
        Some((_, Value::String(s))) => s.clone(),
        _ => return Err(DispatchError::MissingText),
    };
    if text.trim().is_empty() {
        Ok(default_message.to_string())
    } else {
        Ok(text)
    }
}

/// Normalize a raw target into `digits@domain` form.
///
/// The local part keeps digits only (strips `+`, spaces, dashes); a missing
/// domain gets [`DEFAULT_DM_DOMAIN`] appended. Already-normalized JIDs pass
/// through unchanged.
pub fn normalize_jid(raw: &str) -> Result<String, DispatchError> {
    let invalid = |reason: &str| DispatchError::InvalidTarget {
        given: raw.to_string(),
        reason: reason.to_string(),
    };

    let (local_raw, domain_raw) = match raw.split_once('@') {
        Some((local, domain)) => (local, domain),
        None => (raw, DEFAULT_DM_DOMAIN),
    };

    let local: String = local_raw.chars().filter(char::is_ascii_digit).collect();
    if local.is_empty() {
        return Err(invalid("no digits in local part"));
    }

    let domain: String = domain_raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if domain.is_empty() {
        return Err(invalid("empty domain"));
    }

    Ok(format!("{local}@{domain}"))
}

/// The other domain convention for a normalized JID, if one applies. Used
/// for the single retry after a provider decode error.
pub fn alternate_domain(jid: &str) -> Option<String> {
    let (local, domain) = jid.split_once('@')?;
    match domain {
        DEFAULT_DM_DOMAIN => Some(format!("{local}@{LEGACY_DM_DOMAIN}")),
        LEGACY_DM_DOMAIN => Some(format!("{local}@{DEFAULT_DM_DOMAIN}")),
        _ => None,
    }
}
