//! Extracts the labelled fields from the service's free-text reply.

pub const CONTENT_LABEL: &str = "Content";
pub const SCENARIO_LABEL: &str = "Scenario";
pub const TAGS_LABEL: &str = "Tags";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub content: String,
    pub scenario: String,
    /// Still comma-delimited; see [`crate::category::split_tags`].
    pub tags: String,
}

/// Missing labels leave their field empty; unrecognised lines are skipped.
/// A label repeated later in the reply replaces the earlier value.
pub fn parse(raw: &str) -> ParsedReply {
    let mut reply = ParsedReply::default();
    for line in raw.lines() {
        let line = line.trim();
        if let Some(value) = labelled_value(line, CONTENT_LABEL) {
            reply.content = value.to_string();
        } else if let Some(value) = labelled_value(line, SCENARIO_LABEL) {
            reply.scenario = value.to_string();
        } else if let Some(value) = labelled_value(line, TAGS_LABEL) {
            reply.tags = value.to_string();
        }
    }
    reply
}

fn labelled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(label)?;
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('\u{ff1a}'))?;
    Some(rest.trim())
}
