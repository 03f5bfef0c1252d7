use super::error::{Result, SweepError};
use super::object::model_name;
use std::collections::BTreeSet;

/// Model names swept when no allow-list is configured.
pub const DEFAULT_MODEL_TAGS: [&str; 2] = ["Item", "Collection"];

/// Ordered, non-empty set of tags that mark an object for deletion.
///
/// Tags may be given as bare model names or as full model URIs; both are
/// stored as model names. Duplicates keep their first position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAllowList {
    tags: Vec<String>,
}

impl TagAllowList {
    pub fn new<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for (position, tag) in tags.into_iter().enumerate() {
            let tag = model_name(tag.as_ref().trim()).trim();
            if tag.is_empty() {
                return Err(SweepError::Configuration(format!(
                    "allow-list tag at position {} is blank",
                    position
                )));
            }
            if !normalized.iter().any(|existing| existing == tag) {
                normalized.push(tag.to_string());
            }
        }

        if normalized.is_empty() {
            return Err(SweepError::Configuration(
                "allow-list must contain at least one tag".into(),
            ));
        }

        Ok(Self { tags: normalized })
    }

    /// Parses a comma-separated list such as `Item,Collection`.
    pub fn parse(list: &str) -> Result<Self> {
        let parts: Vec<&str> = list.split(',').filter(|p| !p.trim().is_empty()).collect();
        Self::new(parts)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// First allow-listed tag present in `object_tags`, in allow-list order.
    pub fn first_match<'a>(&'a self, object_tags: &BTreeSet<String>) -> Option<&'a str> {
        self.tags
            .iter()
            .find(|tag| object_tags.contains(tag.as_str()))
            .map(String::as_str)
    }
}

impl Default for TagAllowList {
    fn default() -> Self {
        Self {
            tags: DEFAULT_MODEL_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}
