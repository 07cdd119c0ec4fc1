//! Access policy carried by every URL record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remaining-download quota for a URL.
///
/// Serialized as `null` for [`Quota::Unlimited`] and as a plain integer for
/// [`Quota::Remaining`], so stored records keep the `count_remaining: null | n`
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum Quota {
    /// No limit is applied.
    #[default]
    Unlimited,
    /// This many downloads are left.
    Remaining(u64),
}

impl Quota {
    /// Returns true when a finite quota has been used up.
    #[must_use]
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Remaining(0))
    }

    /// Returns the remaining count, or `None` when unlimited.
    #[must_use]
    pub fn remaining(self) -> Option<u64> {
        match self {
            Self::Unlimited => None,
            Self::Remaining(n) => Some(n),
        }
    }
}

impl From<Option<u64>> for Quota {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::Unlimited, Self::Remaining)
    }
}

impl From<Quota> for Option<u64> {
    fn from(value: Quota) -> Self {
        value.remaining()
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "-"),
            Self::Remaining(n) => write!(f, "{n}"),
        }
    }
}

/// Download policy embedded in a [`UrlRecord`](super::UrlRecord).
///
/// A fresh config is disabled with an unlimited quota and no time window,
/// so a newly created URL serves nothing until an administrator enables it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Mandatory on/off switch.
    pub enabled: bool,
    /// Downloads left before the URL disables itself.
    #[serde(default)]
    pub count_remaining: Quota,
    /// Start of the access window. Stored but not enforced.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// End of the access window. Stored but not enforced.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl AccessConfig {
    /// An enabled config with the given quota and no window.
    #[must_use]
    pub fn enabled_with(count_remaining: Quota) -> Self {
        Self {
            enabled: true,
            count_remaining,
            ..Self::default()
        }
    }
}
