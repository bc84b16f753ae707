//! Subscription-tier quota accounting and feature gating.
//!
//! Distinct from the short-window rate limiter: quotas track calendar usage
//! (daily and monthly) per user, gate tier-locked features, and drive
//! upgrade suggestions. Daily and monthly counters live behind the
//! [`CounterStore`] seam keyed by calendar period, so rollover happens by
//! key change and a shared backend can replace the in-process store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::store::CounterStore;
use crate::types::{SearchKind, Tier};

/// Static per-tier limits and feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierQuota {
    /// The tier these limits belong to.
    pub tier: Tier,
    /// Searches allowed per calendar day.
    pub daily_limit: u64,
    /// Searches allowed per calendar month.
    pub monthly_limit: u64,
    /// Whether advanced search options are available.
    pub advanced_search: bool,
    /// Whether fan-out deep search is available.
    pub deep_search: bool,
    /// Whether multi-query batch search is available.
    pub batch_search: bool,
}

/// Look up the static quota table for a tier.
pub fn quota_for(tier: Tier) -> TierQuota {
    match tier {
        Tier::Free => TierQuota {
            tier,
            daily_limit: 50,
            monthly_limit: 1_000,
            advanced_search: false,
            deep_search: false,
            batch_search: false,
        },
        Tier::Pro => TierQuota {
            tier,
            daily_limit: 500,
            monthly_limit: 10_000,
            advanced_search: true,
            deep_search: true,
            batch_search: false,
        },
        Tier::Enterprise => TierQuota {
            tier,
            daily_limit: 10_000,
            monthly_limit: 200_000,
            advanced_search: true,
            deep_search: true,
            batch_search: true,
        },
    }
}

/// A user's usage counters and streak, assembled on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Searches consumed today.
    pub daily_used: u64,
    /// Searches consumed this calendar month.
    pub monthly_used: u64,
    /// Day the daily counter last rolled over.
    pub last_daily_reset: NaiveDate,
    /// First day of the month the monthly counter covers.
    pub last_monthly_reset: NaiveDate,
    /// Total searches ever consumed.
    pub lifetime_total: u64,
    /// Consecutive active days including today.
    pub streak_days: u32,
}

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaDecision {
    /// Whether the search may proceed.
    pub allowed: bool,
    /// Why the search was denied, when it was.
    pub reason: Option<String>,
    /// Whether a higher tier would lift the denial.
    pub upgrade_required: bool,
}

/// Snapshot for the usage-stats surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Searches consumed today.
    pub used: u64,
    /// Daily limit for the user's tier.
    pub limit: u64,
    /// Searches left today.
    pub remaining: u64,
    /// When the daily counter resets (next UTC midnight).
    pub reset_at: chrono::DateTime<Utc>,
    /// The user's tier.
    pub tier: Tier,
}

/// A recommendation to move to a higher tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSuggestion {
    /// The suggested tier.
    pub to: Tier,
    /// Why the upgrade is suggested.
    pub reason: String,
}

/// Per-user metadata that is not a simple period counter.
#[derive(Debug, Clone)]
struct UserMeta {
    tier: Tier,
    lifetime_total: u64,
    streak_days: u32,
    last_active: Option<NaiveDate>,
}

impl Default for UserMeta {
    fn default() -> Self {
        Self {
            tier: Tier::Free,
            lifetime_total: 0,
            streak_days: 0,
            last_active: None,
        }
    }
}

/// Keep period counters a little past their period so late reads still see
/// them before the backend expires the key.
const DAILY_KEY_TTL: Duration = Duration::from_secs(48 * 60 * 60);
const MONTHLY_KEY_TTL: Duration = Duration::from_secs(40 * 24 * 60 * 60);

/// Quota manager: tier lookup, gating, usage recording, upgrade hints.
pub struct QuotaManager {
    store: Arc<dyn CounterStore>,
    users: Mutex<HashMap<String, UserMeta>>,
}

impl QuotaManager {
    /// Create a manager over the given counter store.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            users: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, UserMeta>> {
        // Degrade open on poisoning, same policy as the rate limiter.
        self.users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn daily_key(user: &str, day: NaiveDate) -> String {
        format!("usage:{user}:day:{day}")
    }

    fn monthly_key(user: &str, day: NaiveDate) -> String {
        format!("usage:{user}:month:{:04}-{:02}", day.year(), day.month())
    }

    /// Assign a tier to a user. Users default to [`Tier::Free`].
    pub fn set_tier(&self, user: &str, tier: Tier) {
        self.lock().entry(user.to_string()).or_default().tier = tier;
    }

    /// Current tier for a user.
    pub fn tier_of(&self, user: &str) -> Tier {
        self.lock().get(user).map_or(Tier::Free, |m| m.tier)
    }

    /// Static quota table for a user's tier.
    pub fn quota(&self, user: &str) -> TierQuota {
        quota_for(self.tier_of(user))
    }

    /// Whether `user` may run a search of `kind` right now.
    ///
    /// Gating order: daily limit, then monthly limit, then the feature flag
    /// for the requested kind.
    pub fn can_search(&self, user: &str, kind: SearchKind) -> QuotaDecision {
        self.can_search_on(user, kind, Utc::now().date_naive())
    }

    fn can_search_on(&self, user: &str, kind: SearchKind, today: NaiveDate) -> QuotaDecision {
        let quota = self.quota(user);
        let daily = self.store.get(&Self::daily_key(user, today)).unwrap_or(0);
        let monthly = self.store.get(&Self::monthly_key(user, today)).unwrap_or(0);
        let not_top_tier = quota.tier != Tier::Enterprise;

        if daily >= quota.daily_limit {
            return QuotaDecision {
                allowed: false,
                reason: Some(format!(
                    "daily limit of {} searches reached",
                    quota.daily_limit
                )),
                upgrade_required: not_top_tier,
            };
        }
        if monthly >= quota.monthly_limit {
            return QuotaDecision {
                allowed: false,
                reason: Some(format!(
                    "monthly limit of {} searches reached",
                    quota.monthly_limit
                )),
                upgrade_required: not_top_tier,
            };
        }
        let feature_allowed = match kind {
            SearchKind::Standard => true,
            SearchKind::Deep => quota.deep_search,
            SearchKind::Batch => quota.batch_search,
        };
        if !feature_allowed {
            let feature = match kind {
                SearchKind::Deep => "deep search",
                SearchKind::Batch => "batch search",
                SearchKind::Standard => unreachable!("standard search is never feature-gated"),
            };
            return QuotaDecision {
                allowed: false,
                reason: Some(format!("{feature} is not available on the {} tier", quota.tier)),
                upgrade_required: true,
            };
        }
        QuotaDecision {
            allowed: true,
            reason: None,
            upgrade_required: false,
        }
    }

    /// Record one consumed search for `user`. Updates daily and monthly
    /// counters, the lifetime total, and the activity streak.
    pub fn record_usage(&self, user: &str, kind: SearchKind) {
        self.record_usage_on(user, kind, Utc::now().date_naive());
    }

    fn record_usage_on(&self, user: &str, _kind: SearchKind, today: NaiveDate) {
        // Fresh period keys get an expiry so stale periods age out of the
        // store once the maintenance sweep runs.
        self.store
            .increment(&Self::daily_key(user, today), 1, Some(DAILY_KEY_TTL));
        self.store
            .increment(&Self::monthly_key(user, today), 1, Some(MONTHLY_KEY_TTL));

        let mut users = self.lock();
        let meta = users.entry(user.to_string()).or_default();
        meta.lifetime_total += 1;
        match meta.last_active {
            Some(last) if last == today => {}
            Some(last) if last.succ_opt() == Some(today) => meta.streak_days += 1,
            _ => meta.streak_days = 1,
        }
        meta.last_active = Some(today);
    }

    /// Assemble the user's current usage record.
    pub fn usage(&self, user: &str) -> UsageRecord {
        self.usage_on(user, Utc::now().date_naive())
    }

    fn usage_on(&self, user: &str, today: NaiveDate) -> UsageRecord {
        let daily_used = self.store.get(&Self::daily_key(user, today)).unwrap_or(0);
        let monthly_used = self.store.get(&Self::monthly_key(user, today)).unwrap_or(0);
        let meta = self.lock().get(user).cloned().unwrap_or_default();
        let month_start = today.with_day(1).unwrap_or(today);
        UsageRecord {
            daily_used,
            monthly_used,
            last_daily_reset: today,
            last_monthly_reset: month_start,
            lifetime_total: meta.lifetime_total,
            streak_days: meta.streak_days,
        }
    }

    /// Snapshot for the usage-stats surface: today's consumption against
    /// the daily limit, plus when it resets.
    pub fn usage_stats(&self, user: &str) -> UsageStats {
        let today = Utc::now().date_naive();
        let quota = self.quota(user);
        let used = self.store.get(&Self::daily_key(user, today)).unwrap_or(0);
        let tomorrow = today.succ_opt().unwrap_or(today);
        let reset_at = Utc
            .from_utc_datetime(&tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default());
        UsageStats {
            used,
            limit: quota.daily_limit,
            remaining: quota.daily_limit.saturating_sub(used),
            reset_at,
            tier: quota.tier,
        }
    }

    /// Suggest an upgrade when usage presses against the current tier.
    ///
    /// Fires at ≥80% of the daily or monthly limit, or when a free tier's
    /// history looks like pro-level traffic (>25 searches per active day on
    /// average, or >500 this month).
    pub fn suggest_upgrade(&self, user: &str) -> Option<UpgradeSuggestion> {
        self.suggest_upgrade_on(user, Utc::now().date_naive())
    }

    fn suggest_upgrade_on(&self, user: &str, today: NaiveDate) -> Option<UpgradeSuggestion> {
        let quota = self.quota(user);
        let next = match quota.tier {
            Tier::Free => Tier::Pro,
            Tier::Pro => Tier::Enterprise,
            Tier::Enterprise => return None,
        };
        let usage = self.usage_on(user, today);

        if usage_percentage(usage.daily_used, quota.daily_limit) >= 80 {
            return Some(UpgradeSuggestion {
                to: next,
                reason: format!(
                    "daily usage at {}% of the {} limit",
                    usage_percentage(usage.daily_used, quota.daily_limit),
                    quota.tier
                ),
            });
        }
        if usage_percentage(usage.monthly_used, quota.monthly_limit) >= 80 {
            return Some(UpgradeSuggestion {
                to: next,
                reason: format!(
                    "monthly usage at {}% of the {} limit",
                    usage_percentage(usage.monthly_used, quota.monthly_limit),
                    quota.tier
                ),
            });
        }
        if quota.tier == Tier::Free {
            let active_days = usage.streak_days.max(1) as u64;
            if usage.monthly_used > 500 || usage.lifetime_total / active_days > 25 {
                return Some(UpgradeSuggestion {
                    to: Tier::Pro,
                    reason: "historical usage exceeds typical free-tier volume".into(),
                });
            }
        }
        None
    }
}

/// Percentage of a limit consumed, capped at 100. A zero limit reads as 0.
pub fn usage_percentage(used: u64, limit: u64) -> u8 {
    if limit == 0 {
        return 0;
    }
    ((used * 100 / limit).min(100)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn make_manager() -> QuotaManager {
        QuotaManager::new(Arc::new(MemoryStore::new()))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn tier_daily_limits_strictly_increase() {
        assert!(quota_for(Tier::Enterprise).daily_limit > quota_for(Tier::Pro).daily_limit);
        assert!(quota_for(Tier::Pro).daily_limit > quota_for(Tier::Free).daily_limit);
    }

    #[test]
    fn users_default_to_free() {
        let manager = make_manager();
        assert_eq!(manager.tier_of("nobody"), Tier::Free);
        assert_eq!(manager.quota("nobody").tier, Tier::Free);
    }

    #[test]
    fn set_tier_changes_quota() {
        let manager = make_manager();
        manager.set_tier("alice", Tier::Pro);
        assert_eq!(manager.quota("alice").daily_limit, 500);
    }

    #[test]
    fn fresh_user_can_search() {
        let manager = make_manager();
        let decision = manager.can_search("alice", SearchKind::Standard);
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
    }

    #[test]
    fn free_tier_at_daily_cap_is_denied_with_upgrade_hint() {
        let manager = make_manager();
        let today = day(2026, 8, 25);
        for _ in 0..50 {
            manager.record_usage_on("alice", SearchKind::Standard, today);
        }
        let decision = manager.can_search_on("alice", SearchKind::Standard, today);
        assert!(!decision.allowed);
        assert!(decision.upgrade_required);
        assert!(decision
            .reason
            .expect("denial carries a reason")
            .contains("daily limit"));
    }

    #[test]
    fn daily_counter_rolls_over_by_date() {
        let manager = make_manager();
        let monday = day(2026, 8, 24);
        let tuesday = day(2026, 8, 25);
        for _ in 0..50 {
            manager.record_usage_on("alice", SearchKind::Standard, monday);
        }
        assert!(!manager.can_search_on("alice", SearchKind::Standard, monday).allowed);
        assert!(manager.can_search_on("alice", SearchKind::Standard, tuesday).allowed);
    }

    #[test]
    fn monthly_limit_gates_after_daily() {
        let manager = make_manager();
        manager.set_tier("heavy", Tier::Pro);
        // Spread 10_000 searches across the month without tripping a single day.
        for d in 1..=20 {
            let date = day(2026, 8, d);
            for _ in 0..500 {
                manager.record_usage_on("heavy", SearchKind::Standard, date);
            }
        }
        let decision = manager.can_search_on("heavy", SearchKind::Standard, day(2026, 8, 21));
        assert!(!decision.allowed);
        assert!(decision
            .reason
            .expect("denial carries a reason")
            .contains("monthly limit"));
    }

    #[test]
    fn deep_search_requires_deep_flag() {
        let manager = make_manager();
        let decision = manager.can_search("free-user", SearchKind::Deep);
        assert!(!decision.allowed);
        assert!(decision.upgrade_required);

        manager.set_tier("pro-user", Tier::Pro);
        assert!(manager.can_search("pro-user", SearchKind::Deep).allowed);
    }

    #[test]
    fn batch_search_requires_batch_flag() {
        let manager = make_manager();
        manager.set_tier("pro-user", Tier::Pro);
        assert!(!manager.can_search("pro-user", SearchKind::Batch).allowed);

        manager.set_tier("ent-user", Tier::Enterprise);
        assert!(manager.can_search("ent-user", SearchKind::Batch).allowed);
    }

    #[test]
    fn usage_record_tracks_counters_and_lifetime() {
        let manager = make_manager();
        let today = day(2026, 8, 25);
        for _ in 0..3 {
            manager.record_usage_on("alice", SearchKind::Standard, today);
        }
        let usage = manager.usage_on("alice", today);
        assert_eq!(usage.daily_used, 3);
        assert_eq!(usage.monthly_used, 3);
        assert_eq!(usage.lifetime_total, 3);
        assert_eq!(usage.last_monthly_reset, day(2026, 8, 1));
    }

    #[test]
    fn streak_increments_on_consecutive_days() {
        let manager = make_manager();
        manager.record_usage_on("alice", SearchKind::Standard, day(2026, 8, 23));
        manager.record_usage_on("alice", SearchKind::Standard, day(2026, 8, 24));
        manager.record_usage_on("alice", SearchKind::Standard, day(2026, 8, 25));
        assert_eq!(manager.usage_on("alice", day(2026, 8, 25)).streak_days, 3);
    }

    #[test]
    fn streak_resets_after_gap() {
        let manager = make_manager();
        manager.record_usage_on("alice", SearchKind::Standard, day(2026, 8, 20));
        manager.record_usage_on("alice", SearchKind::Standard, day(2026, 8, 25));
        assert_eq!(manager.usage_on("alice", day(2026, 8, 25)).streak_days, 1);
    }

    #[test]
    fn streak_unchanged_within_same_day() {
        let manager = make_manager();
        let today = day(2026, 8, 25);
        manager.record_usage_on("alice", SearchKind::Standard, today);
        manager.record_usage_on("alice", SearchKind::Standard, today);
        assert_eq!(manager.usage_on("alice", today).streak_days, 1);
    }

    #[test]
    fn usage_percentage_edges() {
        assert_eq!(usage_percentage(50, 50), 100);
        assert_eq!(usage_percentage(0, 50), 0);
        assert_eq!(usage_percentage(25, 50), 50);
        assert_eq!(usage_percentage(0, 0), 0);
        assert_eq!(usage_percentage(120, 50), 100);
    }

    #[test]
    fn suggest_upgrade_at_80_percent_daily() {
        let manager = make_manager();
        let today = day(2026, 8, 25);
        for _ in 0..40 {
            manager.record_usage_on("alice", SearchKind::Standard, today);
        }
        let suggestion = manager
            .suggest_upgrade_on("alice", today)
            .expect("should suggest at 80%");
        assert_eq!(suggestion.to, Tier::Pro);
    }

    #[test]
    fn no_suggestion_for_light_usage() {
        let manager = make_manager();
        let today = day(2026, 8, 25);
        for _ in 0..5 {
            manager.record_usage_on("alice", SearchKind::Standard, today);
        }
        assert!(manager.suggest_upgrade_on("alice", today).is_none());
    }

    #[test]
    fn enterprise_never_gets_suggestions() {
        let manager = make_manager();
        manager.set_tier("ent", Tier::Enterprise);
        let today = day(2026, 8, 25);
        for _ in 0..9_000 {
            manager.record_usage_on("ent", SearchKind::Standard, today);
        }
        assert!(manager.suggest_upgrade_on("ent", today).is_none());
    }

    #[test]
    fn usage_stats_reflects_daily_counters() {
        let manager = make_manager();
        manager.set_tier("alice", Tier::Pro);
        manager.record_usage("alice", SearchKind::Standard);
        let stats = manager.usage_stats("alice");
        assert_eq!(stats.used, 1);
        assert_eq!(stats.limit, 500);
        assert_eq!(stats.remaining, 499);
        assert_eq!(stats.tier, Tier::Pro);
        assert!(stats.reset_at > Utc::now());
    }
}
