//! Download policy evaluation.
//!
//! Pure functions over an [`AccessConfig`]; safe to call from any task.
//!
//! Rules, first failure wins:
//! 1. the config must be enabled
//! 2. a finite quota must not be exhausted, even if `enabled` was left on
//!
//! The `start_time`/`end_time` window is carried on the config but not
//! enforced here.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::records::AccessConfig;

/// Why a download was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The URL is switched off.
    Disabled,
    /// The remaining-download quota is zero.
    Exhausted,
    /// No URL record exists for the key.
    NotFound,
    /// The store could not answer.
    StoreError,
}

impl DenyReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Exhausted => "exhausted",
            Self::NotFound => "not_found",
            Self::StoreError => "store_error",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Evaluates `config` at `now`.
#[must_use]
pub fn evaluate(config: &AccessConfig, _now: DateTime<Utc>) -> Decision {
    if !config.enabled {
        return Decision::Deny(DenyReason::Disabled);
    }
    if config.count_remaining.is_exhausted() {
        return Decision::Deny(DenyReason::Exhausted);
    }
    Decision::Allow
}

/// Boolean form of [`evaluate`].
#[must_use]
pub fn is_allowed(config: &AccessConfig, now: DateTime<Utc>) -> bool {
    evaluate(config, now).is_allow()
}
