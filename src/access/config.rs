//! Access Configuration
//!
//! Grants, superusers and API keys as they appear in the config file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::PathResolver;

/// Kind of access a grant confers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
}

/// One grant entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConfig {
    pub principal: String,
    /// Logical path; empty string is the wildcard grant
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_access")]
    pub access: Access,
}

fn default_access() -> Access {
    Access::Read
}

/// Access configuration section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Principals that bypass the gate entirely
    #[serde(default)]
    pub superusers: Vec<String>,

    #[serde(default)]
    pub grants: Vec<GrantConfig>,

    /// API key -> principal name
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl AccessConfig {
    /// Check that every grant path is a valid logical path
    pub fn validate(&self) -> Result<(), String> {
        for grant in &self.grants {
            if grant.principal.trim().is_empty() {
                return Err("access.grants entries need a principal".to_string());
            }
            PathResolver::normalize(&grant.path)
                .map_err(|e| format!("access grant for '{}': {}", grant.principal, e))?;
        }

        if self.api_keys.keys().any(|k| k.is_empty()) {
            return Err("access.api_keys must not contain an empty key".to_string());
        }

        Ok(())
    }

    /// Principal name bound to an API key
    pub fn principal_for_key(&self, key: &str) -> Option<&str> {
        self.api_keys.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_section() {
        let config: AccessConfig = serde_json::from_str(
            r#"{
                "superusers": ["root"],
                "grants": [
                    {"principal": "alice", "path": "orders"},
                    {"principal": "bob", "path": "", "access": "write"}
                ],
                "api_keys": {"k-alice": "alice"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.grants[0].access, Access::Read);
        assert_eq!(config.grants[1].access, Access::Write);
        assert_eq!(config.principal_for_key("k-alice"), Some("alice"));
        assert_eq!(config.principal_for_key("nope"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_escaping_grant() {
        let config = AccessConfig {
            grants: vec![GrantConfig {
                principal: "alice".to_string(),
                path: "../etc".to_string(),
                access: Access::Read,
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
