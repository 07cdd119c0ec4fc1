//! Per-record mutations applied after a confirmed download.

use crate::records::{AccessConfig, Quota, Record, UrlRecord};

/// Takes one unit off a finite quota.
///
/// Returns true when this call disabled the config. Unlimited quotas are
/// left alone. The quota never goes below zero, and reaching zero switches
/// the config off; nothing here switches it back on.
pub(crate) fn consume_quota(config: &mut AccessConfig) -> bool {
    let Quota::Remaining(remaining) = config.count_remaining else {
        return false;
    };

    let left = remaining.saturating_sub(1);
    config.count_remaining = Quota::Remaining(left);
    if left == 0 && config.enabled {
        config.enabled = false;
        return true;
    }
    false
}

/// Counts one download on any record. Never disables anything.
pub(crate) fn record_download<R: Record>(record: &mut R) -> bool {
    record.stats_mut().record_download();
    false
}

/// Consumes quota and counts the download on a URL.
///
/// Returns true when the URL was disabled by this download.
pub(crate) fn record_url_download(url: &mut UrlRecord) -> bool {
    let disabled = consume_quota(&mut url.config);
    url.stats.record_download();
    disabled
}
