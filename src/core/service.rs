//! Service handle shared by the HTTP layer and tests.

use crate::{
    config::{PoolSettings, RetrySettings},
    core::locks::LockRegistry,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Pool settings resolved to cents, ready for the hot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRules {
    /// Smallest amount a request may ask for
    pub min_request_cents: i64,
    /// Minimum description length in characters
    pub min_description_length: usize,
    /// Share of savings that may be pledged to active requests
    pub cap_percent: u8,
    /// Smallest useful contribution
    pub min_contribution_cents: i64,
    /// Retry policy for concurrency conflicts
    pub retry: RetrySettings,
}

impl PoolRules {
    /// Validates `settings` and converts monetary values to cents.
    pub fn from_settings(settings: &PoolSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            min_request_cents: settings.min_request_cents()?,
            min_description_length: settings.min_description_length,
            cap_percent: settings.contribution_cap_percent,
            min_contribution_cents: settings.min_contribution_cents()?,
            retry: settings.retry(),
        })
    }
}

impl Default for PoolRules {
    fn default() -> Self {
        Self {
            min_request_cents: 500,
            min_description_length: 10,
            cap_percent: 50,
            min_contribution_cents: 100,
            retry: RetrySettings::default(),
        }
    }
}

/// Entry point for every pool operation.
///
/// Cloning is cheap: the connection pool and lock registry are shared.
#[derive(Debug, Clone)]
pub struct PoolService {
    pub(crate) db: DatabaseConnection,
    pub(crate) rules: PoolRules,
    pub(crate) locks: Arc<LockRegistry>,
}

impl PoolService {
    /// Creates a service over `db` enforcing `rules`.
    #[must_use]
    pub fn new(db: DatabaseConnection, rules: PoolRules) -> Self {
        Self {
            db,
            rules,
            locks: Arc::new(LockRegistry::new()),
        }
    }

    /// The underlying connection, for read-only helpers.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The rules this service enforces.
    #[must_use]
    pub const fn rules(&self) -> &PoolRules {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_rules_from_default_settings_match_default_rules() {
        let rules = PoolRules::from_settings(&PoolSettings::default()).unwrap();
        assert_eq!(rules, PoolRules::default());
    }

    #[test]
    fn test_rules_reject_invalid_cap() {
        let settings = PoolSettings {
            contribution_cap_percent: 150,
            ..PoolSettings::default()
        };
        assert!(matches!(
            PoolRules::from_settings(&settings),
            Err(Error::Config { .. })
        ));
    }
}
