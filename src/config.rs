use crate::core::{RelationKind, Result, SweepError, TagAllowList};
use crate::store::memory::DEFAULT_PAGE_SIZE;
use std::fmt;
use std::str::FromStr;

pub const ENV_TAGS: &str = "MODELSWEEP_TAGS";
pub const ENV_RELATION: &str = "MODELSWEEP_RELATION";
pub const ENV_ON_ERROR: &str = "MODELSWEEP_ON_ERROR";
pub const ENV_CONCURRENCY: &str = "MODELSWEEP_CONCURRENCY";
pub const ENV_PAGE_SIZE: &str = "MODELSWEEP_PAGE_SIZE";

/// What the sweep does when deleting a matched object fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionPolicy {
    /// Stop the sweep and report the failure with the count so far
    #[default]
    Abort,
    /// Record the failure in the report and keep sweeping
    Continue,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionPolicy::Abort => f.write_str("abort"),
            DeletionPolicy::Continue => f.write_str("continue"),
        }
    }
}

impl FromStr for DeletionPolicy {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(DeletionPolicy::Abort),
            "continue" | "skip" => Ok(DeletionPolicy::Continue),
            other => Err(SweepError::Configuration(format!(
                "unknown deletion policy '{}' (expected 'abort' or 'continue')",
                other
            ))),
        }
    }
}

/// Sweep configuration
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Tags that mark an object for deletion
    pub allow_list: TagAllowList,

    /// Relationship whose values are matched against the allow-list
    pub relation: RelationKind,

    /// Policy for failed deletions
    pub on_delete_error: DeletionPolicy,

    /// Maximum number of deletes in flight
    pub concurrency: usize,

    /// Objects fetched per enumeration page by stores that page
    pub page_size: usize,
}

impl SweepConfig {
    pub fn new() -> Self {
        Self {
            allow_list: TagAllowList::default(),
            relation: RelationKind::HasModel,
            on_delete_error: DeletionPolicy::Abort,
            concurrency: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the allow-list
    pub fn allow_list(mut self, allow_list: TagAllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Set the relationship to match on
    pub fn relation(mut self, relation: RelationKind) -> Self {
        self.relation = relation;
        self
    }

    /// Set the deletion failure policy
    pub fn on_delete_error(mut self, policy: DeletionPolicy) -> Self {
        self.on_delete_error = policy;
        self
    }

    /// Set the maximum number of concurrent deletes
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the enumeration page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SweepError::Configuration(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(SweepError::Configuration(
                "page size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Defaults overridden by `MODELSWEEP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `MODELSWEEP_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(tags) = lookup(ENV_TAGS) {
            config.allow_list = TagAllowList::parse(&tags)?;
        }
        if let Some(relation) = lookup(ENV_RELATION) {
            config.relation = RelationKind::from(relation.trim());
        }
        if let Some(policy) = lookup(ENV_ON_ERROR) {
            config.on_delete_error = policy.parse()?;
        }
        if let Some(value) = lookup(ENV_CONCURRENCY) {
            config.concurrency = parse_count(ENV_CONCURRENCY, &value)?;
        }
        if let Some(value) = lookup(ENV_PAGE_SIZE) {
            config.page_size = parse_count(ENV_PAGE_SIZE, &value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| SweepError::Configuration(format!("invalid {} '{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.allow_list, TagAllowList::default());
        assert_eq!(config.relation, RelationKind::HasModel);
        assert_eq!(config.on_delete_error, DeletionPolicy::Abort);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SweepConfig::new()
            .allow_list(TagAllowList::parse("Page").unwrap())
            .relation(RelationKind::IsPartOf)
            .on_delete_error(DeletionPolicy::Continue)
            .concurrency(4)
            .page_size(50);

        assert_eq!(config.allow_list.tags(), &["Page".to_string()]);
        assert_eq!(config.relation, RelationKind::IsPartOf);
        assert_eq!(config.on_delete_error, DeletionPolicy::Continue);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(SweepConfig::new().concurrency(0).validate().is_err());
        assert!(SweepConfig::new().page_size(0).validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = SweepConfig::from_lookup(lookup(&[
            (ENV_TAGS, "Book, Page"),
            (ENV_RELATION, "is_member_of"),
            (ENV_ON_ERROR, "Continue"),
            (ENV_CONCURRENCY, "8"),
            (ENV_PAGE_SIZE, "100"),
        ]))
        .unwrap();

        assert_eq!(config.allow_list.tags(), &["Book".to_string(), "Page".to_string()]);
        assert_eq!(config.relation, RelationKind::IsMemberOf);
        assert_eq!(config.on_delete_error, DeletionPolicy::Continue);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_from_lookup_errors() {
        let err = SweepConfig::from_lookup(lookup(&[(ENV_TAGS, "")])).unwrap_err();
        assert!(matches!(err, SweepError::Configuration(_)));

        let err = SweepConfig::from_lookup(lookup(&[(ENV_CONCURRENCY, "many")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CONCURRENCY));

        let err = SweepConfig::from_lookup(lookup(&[(ENV_ON_ERROR, "retry")])).unwrap_err();
        assert!(err.to_string().contains("retry"));

        assert!(SweepConfig::from_lookup(lookup(&[(ENV_PAGE_SIZE, "0")])).is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("abort".parse::<DeletionPolicy>().unwrap(), DeletionPolicy::Abort);
        assert_eq!("skip".parse::<DeletionPolicy>().unwrap(), DeletionPolicy::Continue);
        assert_eq!(DeletionPolicy::Continue.to_string(), "continue");
    }
}
