//! Environment binding substituted into scripts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::BuildMode;

/// Name to value, fixed for one build. Always holds `NODE_ENV`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentBinding {
    vars: BTreeMap<String, String>,
}

impl EnvironmentBinding {
    /// `NODE_ENV` from the mode, overlaid on the configured entries.
    pub fn new(mode: BuildMode, extra: &BTreeMap<String, String>) -> Self {
        let mut vars = extra.clone();
        vars.insert("NODE_ENV".to_string(), mode.policy().env_name.to_string());
        Self { vars }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(binding: &'a EnvironmentBinding, name: &str) -> Option<&'a str> {
        binding.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    #[test]
    fn test_node_env_follows_mode() {
        let none = BTreeMap::new();
        let dev = EnvironmentBinding::new(BuildMode::Development, &none);
        let prod = EnvironmentBinding::new(BuildMode::Production, &none);
        assert_eq!(value(&dev, "NODE_ENV"), Some("development"));
        assert_eq!(value(&prod, "NODE_ENV"), Some("production"));
        assert_eq!(prod.len(), 1);
    }

    #[test]
    fn test_node_env_cannot_be_overridden() {
        let extra = BTreeMap::from([
            ("NODE_ENV".to_string(), "test".to_string()),
            ("API_URL".to_string(), "/api".to_string()),
        ]);
        let binding = EnvironmentBinding::new(BuildMode::Production, &extra);
        assert_eq!(value(&binding, "NODE_ENV"), Some("production"));
        assert_eq!(value(&binding, "API_URL"), Some("/api"));
    }
}
