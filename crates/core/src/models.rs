use crate::category;
use crate::response::ParsedReply;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of analysing one file: either the parsed fields or a failure reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub content: String,
    pub scenario: String,
    pub tags: Vec<String>,
    pub failure_reason: Option<String>,
}

impl ClassificationResult {
    pub fn from_reply(reply: ParsedReply) -> Self {
        Self {
            content: reply.content,
            scenario: reply.scenario,
            tags: category::split_tags(&reply.tags),
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            failure_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_reason.is_none()
    }

    pub fn tags_text(&self) -> String {
        self.tags.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: String,
}
