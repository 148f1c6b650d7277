// ── Clock & IDs (C1) ────────────────────────────────────────────────────
// The only authority for `created_at` / `updated_at`. Client-supplied
// `event_time` on a CareRecord is accepted as-is, but the derived
// `search_date` is always computed server-side from UTC — never from the
// caller's clock.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub type Instant = DateTime<Utc>;
pub type Date = NaiveDate;

/// Current UTC instant. The sole authority for `created_at` / `updated_at`.
pub fn now() -> Instant {
    Utc::now()
}

/// Current UTC calendar date.
pub fn today() -> Date {
    Utc::now().date_naive()
}

/// Derive the UTC calendar date a CareRecord's `event_time` falls on.
pub fn search_date_for(event_time: Instant) -> Date {
    event_time.date_naive()
}

/// A fresh random identifier, used for every PK in the data model.
pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Deterministic composite id for a Like: at most one Like per (user, subject).
pub fn compose_like_id(subject_type: &str, user_id: &str, subject_id: &str) -> String {
    format!("{subject_type}_{user_id}_{subject_id}")
}

/// Deterministic composite id for a pet's daily care-log document.
pub fn compose_daily_log_id(pet_id: &str, date: Date) -> String {
    format!("{pet_id}_{}", date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_id_is_deterministic_and_order_sensitive() {
        let a = compose_like_id("post", "user_1", "post_9");
        let b = compose_like_id("post", "user_1", "post_9");
        assert_eq!(a, b);
        assert_eq!(a, "post_user_1_post_9");
    }

    #[test]
    fn daily_log_id_uses_yyyymmdd() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        assert_eq!(compose_daily_log_id("pet_1", date), "pet_1_20260728");
    }

    #[test]
    fn search_date_derives_from_utc_instant() {
        let t: Instant = "2026-01-05T23:59:59Z".parse().unwrap();
        assert_eq!(search_date_for(t), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }
}
