pub const UNCLASSIFIED: &str = "unclassified";
pub const UNSUPPORTED: &str = "unsupported";

/// Splits a comma-delimited tag string, trimming each tag and dropping empties.
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Primary category of a tag string: its first tag, or [`UNCLASSIFIED`].
pub fn assign(tags_text: &str) -> String {
    primary(&split_tags(tags_text))
}

pub fn primary(tags: &[String]) -> String {
    tags.first()
        .cloned()
        .unwrap_or_else(|| UNCLASSIFIED.to_string())
}
