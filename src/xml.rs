//! Narrow element lookup for the markup returned by the device.
//!
//! This is deliberately not an XML parser. Device responses (`login_sid.lua`,
//! phone book exports, lua pages) are not guaranteed to be well-formed, so the
//! lookup is a tolerant text match: find an opening tag with the given name and
//! attributes, then take everything up to the next closing tag of the same name.
//! Absence is the only failure signal; malformed input never errors.
//!
//! Attributes are matched literally, in the order given, each rendered as
//! ` key="value"` directly after the element name.

use regex::Regex;
use tracing::debug;

/// Which match to return when an element occurs more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Occurrence {
    #[default]
    First,
    Last,
}

/// Text value of the first element called `name` in `document`.
#[must_use]
pub fn extract_value(document: Option<&str>, name: &str) -> Option<String> {
    extract_value_with(document, name, &[], Occurrence::First)
}

/// Text value of an element called `name` whose opening tag carries `attributes`.
///
/// Returns `None` when `document` is absent or empty, or when no element matches.
#[must_use]
pub fn extract_value_with(
    document: Option<&str>,
    name: &str,
    attributes: &[(&str, &str)],
    occurrence: Occurrence,
) -> Option<String> {
    let document = document.filter(|d| !d.is_empty())?;

    let re = element_pattern(name, attributes)?;

    let captures = match occurrence {
        Occurrence::First => re.captures(document),
        Occurrence::Last => re.captures_iter(document).last(),
    }?;

    captures.get(1).map(|m| m.as_str().to_string())
}

fn element_pattern(name: &str, attributes: &[(&str, &str)]) -> Option<Regex> {
    let attrs: String = attributes
        .iter()
        .map(|(key, value)| format!(" {key}=\"{value}\""))
        .collect();

    let name = regex::escape(name);
    let pattern = format!("<{name}{}>(.*?)</{name}>", regex::escape(&attrs));

    Regex::new(&pattern)
        .map_err(|e| debug!("invalid element pattern {}: {}", pattern, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?><SessionInfo><SID>0000000000000000</SID><Challenge>2$60000$abcd$6000$ef01</Challenge><BlockTime>0</BlockTime><Rights></Rights><Users><User>alice</User><User last="1">bob</User></Users></SessionInfo>"#;

    #[test]
    fn extracts_sid() {
        let doc = "<SID>0000000000000000</SID>";
        assert_eq!(
            extract_value(Some(doc), "SID").as_deref(),
            Some("0000000000000000")
        );
    }

    #[test]
    fn first_and_last_occurrence() {
        let doc = "<Users><User>alice</User><User>bob</User></Users>";
        assert_eq!(extract_value(Some(doc), "User").as_deref(), Some("alice"));
        assert_eq!(
            extract_value_with(Some(doc), "User", &[], Occurrence::Last).as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn attribute_constrains_match() {
        assert_eq!(
            extract_value_with(
                Some(CHALLENGE_BODY),
                "User",
                &[("last", "1")],
                Occurrence::First
            )
            .as_deref(),
            Some("bob")
        );
        assert_eq!(
            extract_value_with(
                Some(CHALLENGE_BODY),
                "User",
                &[("last", "2")],
                Occurrence::First
            ),
            None
        );
    }

    #[test]
    fn plain_name_does_not_match_tag_with_attributes() {
        let doc = r#"<User last="1">bob</User>"#;
        assert_eq!(extract_value(Some(doc), "User"), None);
    }

    #[test]
    fn reads_fields_from_login_body() {
        assert_eq!(
            extract_value(Some(CHALLENGE_BODY), "Challenge").as_deref(),
            Some("2$60000$abcd$6000$ef01")
        );
        assert_eq!(
            extract_value(Some(CHALLENGE_BODY), "BlockTime").as_deref(),
            Some("0")
        );
        assert_eq!(
            extract_value(Some(CHALLENGE_BODY), "Rights").as_deref(),
            Some("")
        );
    }

    #[test]
    fn absent_inputs_yield_none() {
        assert_eq!(extract_value(None, "SID"), None);
        assert_eq!(extract_value(Some(""), "SID"), None);
        assert_eq!(extract_value(Some("<SID>1234"), "SID"), None);
        assert_eq!(extract_value(Some("<html>busy</html>"), "SID"), None);
    }

    #[test]
    fn tolerates_unbalanced_markup() {
        let doc = "<div><SID>1122334455667788</SID><p>unclosed";
        assert_eq!(
            extract_value(Some(doc), "SID").as_deref(),
            Some("1122334455667788")
        );
    }

    #[test]
    fn element_names_are_literal() {
        let doc = "<S.D>x</S.D><SID>y</SID>";
        assert_eq!(extract_value(Some(doc), "S.D").as_deref(), Some("x"));
        assert_eq!(extract_value(Some("<SxD>z</SxD>"), "S.D"), None);
    }
}
