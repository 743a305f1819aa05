// Expiration math
//
// Everything here is recomputed from (expires_at, now) on every read.
// Nothing is cached, so results always match the clock at observation time.
use chrono::{DateTime, Duration, Utc};
use larder_store::FoodItem;
use serde::{Deserialize, Serialize};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Warning window used when settings say nothing else
pub const DEFAULT_WARNING_DAYS: u32 = 3;

/// Widest warning window the settings accept
pub const MAX_WARNING_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Overdue,
    Today,
    ExpiringSoon,
    Upcoming,
}

impl ExpiryStatus {
    /// Statuses that warrant a reminder. Overdue items are past saving.
    pub fn needs_attention(&self) -> bool {
        matches!(self, ExpiryStatus::Today | ExpiryStatus::ExpiringSoon)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Overdue => "overdue",
            ExpiryStatus::Today => "today",
            ExpiryStatus::ExpiringSoon => "expiring soon",
            ExpiryStatus::Upcoming => "upcoming",
        }
    }
}

impl std::fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `floor((expires_at - now) / 1 day)`; negative once the date has passed
pub fn days_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

pub fn classify_days(days: i64, warning_days: u32) -> ExpiryStatus {
    if days < 0 {
        ExpiryStatus::Overdue
    } else if days == 0 {
        ExpiryStatus::Today
    } else if days <= i64::from(warning_days) {
        ExpiryStatus::ExpiringSoon
    } else {
        ExpiryStatus::Upcoming
    }
}

pub fn classify(expires_at: DateTime<Utc>, now: DateTime<Utc>, warning_days: u32) -> ExpiryStatus {
    classify_days(days_until(expires_at, now), warning_days)
}

/// Latest expiration that still counts as "expiring" right now
///
/// Saturates at the end of representable time.
pub fn warning_threshold(now: DateTime<Utc>, warning_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::milliseconds(i64::from(warning_days) * MILLIS_PER_DAY))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Start of a trailing window of `days` days ending at `now`
///
/// Saturates at the start of representable time.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::milliseconds(i64::from(days) * MILLIS_PER_DAY))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Reject warning windows wider than `MAX_WARNING_DAYS`
pub fn check_warning_days(days: u32) -> crate::Result<u32> {
    if days > MAX_WARNING_DAYS {
        return Err(crate::Error::ValidationError(format!(
            "warning window must be at most {} days, got {}",
            MAX_WARNING_DAYS, days
        )));
    }
    Ok(days)
}

/// "3 days left", "Expires today", "Expired 2 days ago"
pub fn describe_days(days: i64) -> String {
    match days {
        0 => "Expires today".to_string(),
        1 => "1 day left".to_string(),
        -1 => "Expired 1 day ago".to_string(),
        d if d > 0 => format!("{} days left", d),
        d => format!("Expired {} days ago", -d),
    }
}

/// An item together with its expiration state at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedItem {
    #[serde(flatten)]
    pub item: FoodItem,
    pub days_left: i64,
    pub status: ExpiryStatus,
}

impl TrackedItem {
    pub fn assess(item: FoodItem, now: DateTime<Utc>, warning_days: u32) -> Self {
        let days_left = days_until(item.expires_at, now);
        Self {
            status: classify_days(days_left, warning_days),
            days_left,
            item,
        }
    }

    pub fn assess_all(items: Vec<FoodItem>, now: DateTime<Utc>, warning_days: u32) -> Vec<Self> {
        items
            .into_iter()
            .map(|item| Self::assess(item, now, warning_days))
            .collect()
    }

    pub fn label(&self) -> String {
        describe_days(self.days_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_750_000_000_000).unwrap()
    }

    #[test]
    fn test_past_is_overdue() {
        let now = now();
        for offset in [Duration::milliseconds(1), Duration::hours(5), Duration::days(3)] {
            assert!(days_until(now - offset, now) < 0);
            assert_eq!(classify(now - offset, now, 3), ExpiryStatus::Overdue);
        }
    }

    #[test]
    fn test_same_instant_is_today() {
        let now = now();
        assert_eq!(days_until(now, now), 0);
        assert_eq!(classify(now, now, 3), ExpiryStatus::Today);
        // anything inside the next 24h floors to zero too
        assert_eq!(classify(now + Duration::hours(23), now, 3), ExpiryStatus::Today);
    }

    #[test]
    fn test_window_boundaries() {
        let now = now();
        assert_eq!(classify(now + Duration::days(1), now, 3), ExpiryStatus::ExpiringSoon);
        assert_eq!(classify(now + Duration::days(3), now, 3), ExpiryStatus::ExpiringSoon);
        assert_eq!(classify(now + Duration::days(4), now, 3), ExpiryStatus::Upcoming);
        // a zero-day window leaves only today and overdue worth flagging
        assert_eq!(classify(now + Duration::days(1), now, 0), ExpiryStatus::Upcoming);
    }

    #[test]
    fn test_bananas_and_milk() {
        let now = now();
        assert_eq!(classify(now + Duration::days(2), now, 3), ExpiryStatus::ExpiringSoon);
        assert_eq!(classify(now + Duration::days(7), now, 3), ExpiryStatus::Upcoming);
    }

    #[test]
    fn test_threshold_is_now_plus_window() {
        let now = now();
        assert_eq!(warning_threshold(now, 3), now + Duration::milliseconds(3 * MILLIS_PER_DAY));
        assert_eq!(warning_threshold(now, 0), now);
    }

    #[test]
    fn test_huge_windows_saturate() {
        let now = now();
        assert!(warning_threshold(now, u32::MAX) > now + Duration::days(i64::from(MAX_WARNING_DAYS)));
        assert_eq!(warning_threshold(DateTime::<Utc>::MAX_UTC, 1), DateTime::<Utc>::MAX_UTC);
        assert_eq!(window_start(DateTime::<Utc>::MIN_UTC, 1), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(now, 30), now - Duration::days(30));
    }

    #[test]
    fn test_warning_days_bound() {
        assert_eq!(check_warning_days(MAX_WARNING_DAYS).unwrap(), MAX_WARNING_DAYS);
        assert!(matches!(
            check_warning_days(MAX_WARNING_DAYS + 1),
            Err(crate::Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_needs_attention() {
        assert!(ExpiryStatus::Today.needs_attention());
        assert!(ExpiryStatus::ExpiringSoon.needs_attention());
        assert!(!ExpiryStatus::Overdue.needs_attention());
        assert!(!ExpiryStatus::Upcoming.needs_attention());
    }

    #[test]
    fn test_describe_days() {
        assert_eq!(describe_days(0), "Expires today");
        assert_eq!(describe_days(1), "1 day left");
        assert_eq!(describe_days(5), "5 days left");
        assert_eq!(describe_days(-1), "Expired 1 day ago");
        assert_eq!(describe_days(-4), "Expired 4 days ago");
    }

    #[test]
    fn test_assess_tracks_item() {
        let now = now();
        let item = FoodItem::new("Bananas", "Fruits", now + Duration::days(2)).with_quantity(5, "pieces");
        let tracked = TrackedItem::assess(item, now, DEFAULT_WARNING_DAYS);
        assert_eq!(tracked.days_left, 2);
        assert_eq!(tracked.status, ExpiryStatus::ExpiringSoon);
        assert_eq!(tracked.label(), "2 days left");
    }
}
