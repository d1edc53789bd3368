//! # Access Gate
//!
//! The whole permission surface the query engine needs. Grants match a
//! logical path exactly; the path -> topic -> wildcard fallback belongs to the
//! caller (see `QueryService`).

use std::collections::{HashMap, HashSet};

use super::config::{Access, AccessConfig};
use super::principal::Principal;
use crate::query::PathResolver;

/// Permission oracle
pub trait AccessGate: Send + Sync {
    /// May `principal` read `logical_path`?
    fn can_read(&self, principal: &Principal, logical_path: &str) -> bool;

    /// May `principal` write `logical_path`?
    fn can_write(&self, principal: &Principal, logical_path: &str) -> bool;

    /// Does `principal` bypass the gate?
    fn is_superuser(&self, principal: &Principal) -> bool;
}

/// Fixed grant table held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryAccessGate {
    /// principal -> granted (path, access) pairs
    grants: HashMap<String, HashSet<(String, Access)>>,
    superusers: HashSet<String>,
}

impl MemoryAccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the configuration section.
    ///
    /// Grant paths that do not normalize are skipped; `AccessConfig::validate`
    /// reports them at load time.
    pub fn from_config(config: &AccessConfig) -> Self {
        let mut gate = Self::new();
        for name in &config.superusers {
            gate = gate.with_superuser(name);
        }
        for grant in &config.grants {
            gate = gate.with_grant(&grant.principal, &grant.path, grant.access);
        }
        gate
    }

    pub fn with_superuser(mut self, principal: &str) -> Self {
        self.superusers.insert(principal.to_string());
        self
    }

    pub fn with_grant(mut self, principal: &str, path: &str, access: Access) -> Self {
        match PathResolver::normalize(path) {
            Ok(path) => {
                self.grants
                    .entry(principal.to_string())
                    .or_default()
                    .insert((path, access));
            }
            Err(e) => tracing::warn!(principal, path, error = %e, "skipping invalid grant"),
        }
        self
    }

    fn has_grant(&self, principal: &Principal, logical_path: &str, access: Access) -> bool {
        let name = match principal.name() {
            Some(n) => n,
            None => return false,
        };

        self.grants
            .get(name)
            .map(|set| set.contains(&(logical_path.to_string(), access)))
            .unwrap_or(false)
    }
}

impl AccessGate for MemoryAccessGate {
    fn can_read(&self, principal: &Principal, logical_path: &str) -> bool {
        self.has_grant(principal, logical_path, Access::Read)
    }

    fn can_write(&self, principal: &Principal, logical_path: &str) -> bool {
        self.has_grant(principal, logical_path, Access::Write)
    }

    fn is_superuser(&self, principal: &Principal) -> bool {
        principal
            .name()
            .map(|n| self.superusers.contains(n))
            .unwrap_or(false)
    }
}
