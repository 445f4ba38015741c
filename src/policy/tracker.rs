//! Punishment timer tracking
//!
//! State machine for the per-(role, member) grace-period timers. The `step`
//! function is the pure core; `evaluate_member` (sweep path) and
//! `track_added_role` (immediate path) commit its verdicts to the store and
//! emit directives for the executor.

use crate::policy::{
    Directive, PolicySnapshot, PolicyStore, REASON_IMMEDIATE_PUNISHMENT, REASON_PUNISHMENT,
};
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use std::collections::HashSet;
use tracing::info;

/// Verdict for one (role, member) pair at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStep {
    /// Role newly observed held; start the grace period
    Start,
    /// Role newly observed held with a zero grace period; fire immediately
    StartAndFire,
    /// Grace period elapsed; fire and clear the timer
    Fire,
    /// Timer running, grace period not yet elapsed
    Hold,
    /// Role no longer held; clear the timer (debounce reset)
    Reset,
    /// Role not held, no timer running
    Idle,
}

/// Decide what happens to a timer given the member's current hold on the
/// role. Pure: the sweep and the immediate path both reduce to this.
#[must_use]
pub fn step(
    now: DateTime<Utc>,
    holds_role: bool,
    delay_secs: u64,
    applied_at: Option<DateTime<Utc>>,
) -> TimerStep {
    match (holds_role, applied_at) {
        (true, None) => {
            if delay_secs == 0 {
                TimerStep::StartAndFire
            } else {
                TimerStep::Start
            }
        }
        (true, Some(applied_at)) => {
            let delay = i64::try_from(delay_secs).unwrap_or(i64::MAX);
            if (now - applied_at).num_seconds() >= delay {
                TimerStep::Fire
            } else {
                TimerStep::Hold
            }
        }
        (false, Some(_)) => TimerStep::Reset,
        (false, None) => TimerStep::Idle,
    }
}

/// Sweep-path evaluation of one member against every punishment policy.
///
/// Timer changes are committed to the store as they are decided; the
/// returned directives still have to be dispatched by the caller. A fired
/// timer is cleared on the attempt, so a failed platform call is retried
/// only after a fresh grace period on the next detection.
pub fn evaluate_member(
    store: &PolicyStore,
    snapshot: &PolicySnapshot,
    now: DateTime<Utc>,
    guild_id: GuildId,
    user_id: UserId,
    member_roles: &HashSet<RoleId>,
) -> Vec<Directive> {
    let mut directives = Vec::new();

    for (role_id, policy) in &snapshot.punishments {
        let role_id = *role_id;
        let holds = member_roles.contains(&role_id);
        let applied_at = store.applied_at(role_id, user_id);

        match step(now, holds, policy.delay_secs, applied_at) {
            TimerStep::Start => {
                store.start_timer(role_id, user_id, now);
            }
            TimerStep::StartAndFire => {
                // Zero delay: fire in the same evaluation that first
                // observes the role; no timer entry is left behind.
                directives.push(fire(guild_id, user_id, role_id, policy.action.into(), REASON_PUNISHMENT));
            }
            TimerStep::Fire => {
                store.clear_timer(role_id, user_id);
                directives.push(fire(guild_id, user_id, role_id, policy.action.into(), REASON_PUNISHMENT));
            }
            TimerStep::Reset => {
                store.clear_timer(role_id, user_id);
            }
            TimerStep::Hold | TimerStep::Idle => {}
        }
    }

    directives
}

/// Immediate-path reaction to a punishment role being added to a member.
///
/// Restarts the grace period unconditionally: re-adding the role resets the
/// clock even if a stale timer survived a missed removal event. With a zero
/// delay the action fires right away and no timer entry is kept.
pub fn track_added_role(
    store: &PolicyStore,
    snapshot: &PolicySnapshot,
    now: DateTime<Utc>,
    guild_id: GuildId,
    user_id: UserId,
    role_id: RoleId,
) -> Option<Directive> {
    let policy = snapshot.punishments.get(&role_id)?;

    if policy.delay_secs == 0 {
        store.clear_timer(role_id, user_id);
        return Some(fire(guild_id, user_id, role_id, policy.action.into(), REASON_IMMEDIATE_PUNISHMENT));
    }

    store.start_timer(role_id, user_id, now);
    None
}

fn fire(
    guild_id: GuildId,
    user_id: UserId,
    role_id: RoleId,
    action: crate::policy::PolicyAction,
    reason: &'static str,
) -> Directive {
    info!(
        target: crate::POLICY_TARGET,
        guild_id = %guild_id,
        user_id = %user_id,
        role_id = %role_id,
        action = %action,
        "Punishment grace period crossed"
    );
    Directive {
        guild_id,
        user_id,
        role_id,
        action,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyAction, PunishmentAction, PunishmentPolicy};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn role(id: u64) -> RoleId {
        RoleId::new(id)
    }

    fn guild() -> GuildId {
        GuildId::new(900)
    }

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    fn engine_with_policy(role_id: RoleId, action: PunishmentAction, delay_secs: u64) -> PolicyStore {
        let store = PolicyStore::new();
        store.set_punishment(role_id, PunishmentPolicy { action, delay_secs });
        store
    }

    #[test]
    fn test_step_verdicts() {
        // Newly held
        assert_eq!(step(at(100), true, 10, None), TimerStep::Start);
        assert_eq!(step(at(100), true, 0, None), TimerStep::StartAndFire);

        // Timer running
        assert_eq!(step(at(105), true, 10, Some(at(100))), TimerStep::Hold);
        assert_eq!(step(at(110), true, 10, Some(at(100))), TimerStep::Fire);
        assert_eq!(step(at(111), true, 10, Some(at(100))), TimerStep::Fire);

        // Role gone
        assert_eq!(step(at(105), false, 10, Some(at(100))), TimerStep::Reset);
        assert_eq!(step(at(105), false, 10, None), TimerStep::Idle);
    }

    #[test]
    fn test_sweep_starts_then_fires() {
        // Kick after 10s. Member gains the role at t=100; the t=105 sweep
        // starts the timer, the t=111 sweep fires and clears it.
        let store = engine_with_policy(role(1), PunishmentAction::Kick, 10);
        let snapshot = store.snapshot();
        let roles: HashSet<RoleId> = [role(1)].into_iter().collect();

        let actions = evaluate_member(&store, &snapshot, at(105), guild(), user(7), &roles);
        assert!(actions.is_empty());
        assert_eq!(store.applied_at(role(1), user(7)), Some(at(105)));

        let actions = evaluate_member(&store, &snapshot, at(116), guild(), user(7), &roles);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, PolicyAction::Kick);
        assert_eq!(actions[0].role_id, role(1));
        assert_eq!(actions[0].user_id, user(7));
        assert!(store.applied_at(role(1), user(7)).is_none());
    }

    #[test]
    fn test_single_crossing_fires_once() {
        let store = engine_with_policy(role(1), PunishmentAction::Ban, 10);
        let snapshot = store.snapshot();
        let roles: HashSet<RoleId> = [role(1)].into_iter().collect();
        store.start_timer(role(1), user(7), at(100));

        let first = evaluate_member(&store, &snapshot, at(120), guild(), user(7), &roles);
        assert_eq!(first.len(), 1);

        // The entry was cleared on fire, so the next sweep restarts the
        // timer instead of firing again.
        let second = evaluate_member(&store, &snapshot, at(121), guild(), user(7), &roles);
        assert!(second.is_empty());
        assert_eq!(store.applied_at(role(1), user(7)), Some(at(121)));
    }

    #[test]
    fn test_debounce_reset_on_role_loss() {
        // Gains the role at t=100 (delay 10), loses it at t=103. The t=105
        // sweep clears the timer; nothing ever fires.
        let store = engine_with_policy(role(1), PunishmentAction::Kick, 10);
        let snapshot = store.snapshot();
        store.start_timer(role(1), user(7), at(100));

        let none: HashSet<RoleId> = HashSet::new();
        let actions = evaluate_member(&store, &snapshot, at(105), guild(), user(7), &none);
        assert!(actions.is_empty());
        assert!(store.applied_at(role(1), user(7)).is_none());

        // Regains at t=200: the grace period runs from t=200, not t=100.
        let roles: HashSet<RoleId> = [role(1)].into_iter().collect();
        let actions = evaluate_member(&store, &snapshot, at(200), guild(), user(7), &roles);
        assert!(actions.is_empty());
        assert_eq!(store.applied_at(role(1), user(7)), Some(at(200)));

        let actions = evaluate_member(&store, &snapshot, at(209), guild(), user(7), &roles);
        assert!(actions.is_empty());
        let actions = evaluate_member(&store, &snapshot, at(210), guild(), user(7), &roles);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_zero_delay_fires_on_first_observation() {
        let store = engine_with_policy(role(1), PunishmentAction::Mute, 0);
        let snapshot = store.snapshot();
        let roles: HashSet<RoleId> = [role(1)].into_iter().collect();

        let actions = evaluate_member(&store, &snapshot, at(100), guild(), user(7), &roles);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, PolicyAction::Mute);
        assert_eq!(store.timer_count(), 0);
    }

    #[test]
    fn test_multiple_policies_evaluate_independently() {
        let store = engine_with_policy(role(1), PunishmentAction::Kick, 10);
        store.set_punishment(
            role(2),
            PunishmentPolicy {
                action: PunishmentAction::Mute,
                delay_secs: 30,
            },
        );
        let snapshot = store.snapshot();
        let roles: HashSet<RoleId> = [role(1), role(2)].into_iter().collect();
        store.start_timer(role(1), user(7), at(100));
        store.start_timer(role(2), user(7), at(100));

        // Both grace periods have elapsed; both fire in the same pass.
        let actions = evaluate_member(&store, &snapshot, at(200), guild(), user(7), &roles);
        assert_eq!(actions.len(), 2);
        let kinds: HashSet<PolicyAction> = actions.iter().map(|d| d.action).collect();
        assert!(kinds.contains(&PolicyAction::Kick));
        assert!(kinds.contains(&PolicyAction::Mute));
    }

    #[test]
    fn test_event_path_restarts_timer() {
        let store = engine_with_policy(role(1), PunishmentAction::Kick, 10);
        let snapshot = store.snapshot();
        store.start_timer(role(1), user(7), at(100));

        // Re-adding the role via the event path restarts the clock.
        let fired = track_added_role(&store, &snapshot, at(104), guild(), user(7), role(1));
        assert!(fired.is_none());
        assert_eq!(store.applied_at(role(1), user(7)), Some(at(104)));
    }

    #[test]
    fn test_event_path_zero_delay_fires() {
        let store = engine_with_policy(role(1), PunishmentAction::Ban, 0);
        let snapshot = store.snapshot();

        let fired = track_added_role(&store, &snapshot, at(100), guild(), user(7), role(1));
        let directive = fired.unwrap();
        assert_eq!(directive.action, PolicyAction::Ban);
        assert_eq!(directive.reason, REASON_IMMEDIATE_PUNISHMENT);
        assert_eq!(store.timer_count(), 0);
    }

    #[test]
    fn test_event_path_ignores_unpoliced_roles() {
        let store = engine_with_policy(role(1), PunishmentAction::Kick, 10);
        let snapshot = store.snapshot();

        assert!(track_added_role(&store, &snapshot, at(100), guild(), user(7), role(2)).is_none());
        assert_eq!(store.timer_count(), 0);
    }
}
