use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Maximum length for a task title, in characters.
pub const MAX_TITLE_LEN: usize = 500;

/// Maximum length for a single detail line, in characters.
pub const MAX_DETAIL_LEN: usize = 1000;

/// Maximum length for a single reference entry, in characters.
pub const MAX_REFERENCE_LEN: usize = 500;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d*(\.[1-9]\d*)*$").unwrap());

static STABLE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{7}$").unwrap());

static METADATA_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());

/// True for dotted-decimal hierarchical IDs like "2" or "2.3.1".
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

/// True for 7-character lowercase base36 stable IDs.
pub fn is_valid_stable_id(id: &str) -> bool {
    STABLE_ID_PATTERN.is_match(id)
}

fn contains_forbidden_control(s: &str) -> bool {
    s.chars()
        .any(|c| c == '\0' || (c.is_control() && !matches!(c, '\t' | '\n' | '\r')))
}

/// Validate a task title: non-empty, bounded, no control characters.
pub fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(Error::validation("task title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "task title exceeds {MAX_TITLE_LEN} characters"
        )));
    }
    if contains_forbidden_control(title) || title.contains('\n') || title.contains('\r') {
        return Err(Error::validation(
            "task title contains control characters",
        ));
    }
    Ok(())
}

pub fn validate_details(details: &[String]) -> Result<()> {
    for (i, detail) in details.iter().enumerate() {
        if contains_forbidden_control(detail) {
            return Err(Error::validation(format!(
                "detail {} contains control characters",
                i + 1
            )));
        }
        if detail.chars().count() > MAX_DETAIL_LEN {
            return Err(Error::validation(format!(
                "detail {} exceeds maximum length of {MAX_DETAIL_LEN} characters",
                i + 1
            )));
        }
        // A detail shaped like a Stream/Owner/Blocked-by line would be
        // reabsorbed as metadata on the next parse, so the document would
        // not survive a write/read cycle intact.
        if crate::parse::is_metadata_line(detail) {
            return Err(Error::validation(format!(
                "detail {} would be parsed as task metadata: {detail}",
                i + 1
            )));
        }
    }
    Ok(())
}

pub fn validate_references(refs: &[String]) -> Result<()> {
    for (i, r) in refs.iter().enumerate() {
        if contains_forbidden_control(r) {
            return Err(Error::validation(format!(
                "reference {} contains control characters",
                i + 1
            )));
        }
        if r.chars().count() > MAX_REFERENCE_LEN {
            return Err(Error::validation(format!(
                "reference {} exceeds maximum length of {MAX_REFERENCE_LEN} characters",
                i + 1
            )));
        }
    }
    Ok(())
}

/// Requirement links must carry hierarchical IDs.
pub fn validate_requirements(requirements: &[String]) -> Result<()> {
    for (i, req) in requirements.iter().enumerate() {
        if !is_valid_id(req) {
            return Err(Error::validation(format!(
                "requirement {} has invalid format: {req}",
                i + 1
            )));
        }
    }
    Ok(())
}

/// Owners are free-form agent identifiers but must stay on one line.
pub fn validate_owner(owner: &str) -> Result<()> {
    if owner
        .chars()
        .any(|c| c == '\0' || (c.is_control() && c != ' '))
    {
        return Err(Error::validation("owner contains invalid characters"));
    }
    Ok(())
}

pub fn validate_phase_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("phase name cannot be empty"));
    }
    Ok(())
}

/// Front-matter metadata keys are flat YAML scalars: no dots, no YAML
/// specials, identifier-shaped.
pub fn validate_metadata_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation("empty metadata key"));
    }
    if key.contains('.') {
        return Err(Error::validation(format!("nested keys not supported: {key}")));
    }
    if matches!(key, "<<" | "&" | "*") {
        return Err(Error::validation(format!("reserved YAML key: {key}")));
    }
    if !METADATA_KEY_PATTERN.is_match(key) {
        return Err(Error::validation(format!(
            "invalid key '{key}': must start with a letter or underscore, \
             followed by letters, numbers, or underscores"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchical_ids() {
        assert!(is_valid_id("1"));
        assert!(is_valid_id("2.3.1"));
        assert!(is_valid_id("10.20"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("0"));
        assert!(!is_valid_id("1.0"));
        assert!(!is_valid_id("1."));
        assert!(!is_valid_id("a.b"));
        assert!(!is_valid_id("01"));
    }

    #[test]
    fn stable_ids() {
        assert!(is_valid_stable_id("abc1234"));
        assert!(is_valid_stable_id("0000001"));
        assert!(!is_valid_stable_id("ABC1234"));
        assert!(!is_valid_stable_id("abc123"));
        assert!(!is_valid_stable_id("abc12345"));
    }

    #[test]
    fn titles() {
        assert!(validate_title("a task").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"x".repeat(501)).is_err());
        assert!(validate_title(&"x".repeat(500)).is_ok());
        assert!(validate_title("line\nbreak").is_err());
    }

    #[test]
    fn owners() {
        assert!(validate_owner("agent-7").is_ok());
        assert!(validate_owner("agent 7").is_ok());
        assert!(validate_owner("").is_ok());
        assert!(validate_owner("agent\n7").is_err());
        assert!(validate_owner("agent\t7").is_err());
    }

    #[test]
    fn metadata_keys() {
        assert!(validate_metadata_key("project").is_ok());
        assert!(validate_metadata_key("_private").is_ok());
        assert!(validate_metadata_key("a.b").is_err());
        assert!(validate_metadata_key("").is_err());
        assert!(validate_metadata_key("3abc").is_err());
        assert!(validate_metadata_key("<<").is_err());
    }

    #[test]
    fn detail_length_bounded() {
        assert!(validate_details(&["fine".into()]).is_ok());
        assert!(validate_details(&["y".repeat(1001)]).is_err());
    }

    #[test]
    fn metadata_shaped_details_rejected() {
        assert!(validate_details(&["Stream: 5".into()]).is_err());
        assert!(validate_details(&["Owner: bob".into()]).is_err());
        assert!(validate_details(&["Blocked-by: abc1234".into()]).is_err());
        assert!(validate_details(&["References: a.md".into()]).is_err());
        assert!(validate_details(&["Requirements: [1.1](r.md#1.1)".into()]).is_err());
        // These re-parse as plain detail text, so they are fine to store.
        assert!(validate_details(&["Stream: -3".into()]).is_ok());
        assert!(validate_details(&["mentions Stream: 5 mid-sentence".into()]).is_ok());
        assert!(validate_details(&["Requirements: just words".into()]).is_ok());
    }
}
