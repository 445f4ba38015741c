//! Policy store
//!
//! This module provides the in-memory configuration tables for the
//! reconciliation engine: the trigger role set, the removal role set, the
//! punishment policy table, and the punishment timer state. All state is
//! process-lifetime only; nothing is persisted.

use crate::policy::{PolicyError, PolicyResult, PunishmentAction};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use poise::serenity_prelude::{RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Punishment configured for a role: what to do and how long the member may
/// hold the role before it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentPolicy {
    /// Action taken once the grace period elapses
    pub action: PunishmentAction,
    /// Grace period in seconds; 0 means the action fires on first observation
    pub delay_secs: u64,
}

/// Consistent read of the three configuration tables, taken once per sweep
/// pass so a pass never observes a half-applied reconfiguration.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    pub triggers: HashSet<RoleId>,
    pub removals: HashSet<RoleId>,
    pub punishments: HashMap<RoleId, PunishmentPolicy>,
}

/// Shared handle to the policy tables. Cloning is cheap; all clones see the
/// same underlying maps.
#[derive(Clone, Default)]
pub struct PolicyStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    /// Roles whose presence strips the removal set
    triggers: DashSet<RoleId>,
    /// Roles stripped from any member holding a trigger role
    removals: DashSet<RoleId>,
    /// Punishment policy per role, last write wins
    punishments: DashMap<RoleId, PunishmentPolicy>,
    /// (role, member) -> when the engine first observed the member holding
    /// the role continuously. Entry absent means no timer is running.
    timers: DashMap<(RoleId, UserId), DateTime<Utc>>,
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("triggers", &self.inner.triggers.len())
            .field("removals", &self.inner.removals.len())
            .field("punishments", &self.inner.punishments.len())
            .field("timers", &self.inner.timers.len())
            .finish()
    }
}

impl PolicyStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger role. Returns `false` if it was already present; either
    /// way the call succeeds.
    pub fn add_trigger(&self, role_id: RoleId) -> bool {
        self.inner.triggers.insert(role_id)
    }

    /// Remove a trigger role. Removing an absent role is a no-op.
    pub fn remove_trigger(&self, role_id: RoleId) -> bool {
        self.inner.triggers.remove(&role_id).is_some()
    }

    /// Add a removal role
    pub fn add_removal(&self, role_id: RoleId) -> bool {
        self.inner.removals.insert(role_id)
    }

    /// Remove a removal role
    pub fn remove_removal(&self, role_id: RoleId) -> bool {
        self.inner.removals.remove(&role_id).is_some()
    }

    /// Current trigger and removal role lists, for the list command
    #[must_use]
    pub fn list_roles(&self) -> (Vec<RoleId>, Vec<RoleId>) {
        let triggers = self.inner.triggers.iter().map(|r| *r).collect();
        let removals = self.inner.removals.iter().map(|r| *r).collect();
        (triggers, removals)
    }

    /// Set or overwrite the punishment policy for a role. In-flight timers
    /// for the role are preserved; a delay change takes effect on the next
    /// evaluation rather than resetting anyone's clock.
    pub fn set_punishment(&self, role_id: RoleId, policy: PunishmentPolicy) -> Option<PunishmentPolicy> {
        self.inner.punishments.insert(role_id, policy)
    }

    /// Remove the punishment policy for a role along with every timer entry
    /// that references it.
    ///
    /// # Errors
    /// Returns `PolicyError::PolicyNotFound` if the role has no policy.
    pub fn clear_punishment(&self, role_id: RoleId) -> PolicyResult<PunishmentPolicy> {
        let (_, policy) = self
            .inner
            .punishments
            .remove(&role_id)
            .ok_or(PolicyError::PolicyNotFound(role_id))?;
        self.inner.timers.retain(|(role, _), _| *role != role_id);
        Ok(policy)
    }

    /// Get the punishment policy for a role
    #[must_use]
    pub fn punishment(&self, role_id: RoleId) -> Option<PunishmentPolicy> {
        self.inner.punishments.get(&role_id).map(|entry| *entry.value())
    }

    /// Take a consistent copy of the configuration tables
    #[must_use]
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            triggers: self.inner.triggers.iter().map(|r| *r).collect(),
            removals: self.inner.removals.iter().map(|r| *r).collect(),
            punishments: self
                .inner
                .punishments
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
        }
    }

    /// When the timer for (role, member) started, if one is running
    #[must_use]
    pub fn applied_at(&self, role_id: RoleId, user_id: UserId) -> Option<DateTime<Utc>> {
        self.inner.timers.get(&(role_id, user_id)).map(|entry| *entry.value())
    }

    /// Start (or restart) the timer for (role, member) at `now`
    pub fn start_timer(&self, role_id: RoleId, user_id: UserId, now: DateTime<Utc>) {
        self.inner.timers.insert((role_id, user_id), now);
    }

    /// Stop the timer for (role, member), returning when it had started
    pub fn clear_timer(&self, role_id: RoleId, user_id: UserId) -> Option<DateTime<Utc>> {
        self.inner.timers.remove(&(role_id, user_id)).map(|(_, at)| at)
    }

    /// Drop timer entries whose role no longer has a punishment policy.
    /// Such entries indicate a bug elsewhere; the store self-heals and the
    /// caller logs what was discarded. Returns the discarded keys.
    pub fn purge_orphaned_timers(&self, snapshot: &PolicySnapshot) -> Vec<(RoleId, UserId)> {
        let orphans: Vec<(RoleId, UserId)> = self
            .inner
            .timers
            .iter()
            .filter(|entry| !snapshot.punishments.contains_key(&entry.key().0))
            .map(|entry| *entry.key())
            .collect();
        for key in &orphans {
            self.inner.timers.remove(key);
        }
        orphans
    }

    /// Number of running timers
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.inner.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: u64) -> RoleId {
        RoleId::new(id)
    }

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn test_trigger_add_is_idempotent() {
        let store = PolicyStore::new();
        assert!(store.add_trigger(role(1)));
        assert!(!store.add_trigger(role(1)));

        let (triggers, removals) = store.list_roles();
        assert_eq!(triggers, vec![role(1)]);
        assert!(removals.is_empty());

        // Removing an absent role is a no-op, not an error
        assert!(!store.remove_trigger(role(2)));
        assert!(store.remove_trigger(role(1)));
        assert!(store.list_roles().0.is_empty());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = PolicyStore::new();
        store.add_trigger(role(1));
        store.add_removal(role(2));

        let snapshot = store.snapshot();
        store.add_trigger(role(3));

        assert!(snapshot.triggers.contains(&role(1)));
        assert!(!snapshot.triggers.contains(&role(3)));
        assert!(snapshot.removals.contains(&role(2)));
    }

    #[test]
    fn test_set_punishment_preserves_timers() {
        let store = PolicyStore::new();
        let policy = PunishmentPolicy {
            action: PunishmentAction::Kick,
            delay_secs: 10,
        };
        store.set_punishment(role(1), policy);

        let started = Utc::now();
        store.start_timer(role(1), user(7), started);

        // Reconfiguring the delay must not reset the running timer
        let previous = store.set_punishment(
            role(1),
            PunishmentPolicy {
                action: PunishmentAction::Ban,
                delay_secs: 60,
            },
        );
        assert_eq!(previous, Some(policy));
        assert_eq!(store.applied_at(role(1), user(7)), Some(started));
        assert_eq!(
            store.punishment(role(1)).unwrap().action,
            PunishmentAction::Ban
        );
    }

    #[test]
    fn test_clear_punishment_removes_timers() {
        let store = PolicyStore::new();
        store.set_punishment(
            role(1),
            PunishmentPolicy {
                action: PunishmentAction::Mute,
                delay_secs: 5,
            },
        );
        store.set_punishment(
            role(2),
            PunishmentPolicy {
                action: PunishmentAction::Kick,
                delay_secs: 5,
            },
        );
        let now = Utc::now();
        store.start_timer(role(1), user(7), now);
        store.start_timer(role(1), user(8), now);
        store.start_timer(role(2), user(7), now);

        store.clear_punishment(role(1)).unwrap();
        assert_eq!(store.timer_count(), 1);
        assert!(store.applied_at(role(1), user(7)).is_none());
        assert!(store.applied_at(role(2), user(7)).is_some());

        // Clearing a role with no policy reports not-found
        let err = store.clear_punishment(role(9)).unwrap_err();
        assert!(matches!(err, PolicyError::PolicyNotFound(r) if r == role(9)));
    }

    #[test]
    fn test_purge_orphaned_timers() {
        let store = PolicyStore::new();
        store.set_punishment(
            role(1),
            PunishmentPolicy {
                action: PunishmentAction::Mute,
                delay_secs: 5,
            },
        );
        let now = Utc::now();
        store.start_timer(role(1), user(7), now);
        // Timer for a role that never had a policy
        store.start_timer(role(3), user(7), now);

        let snapshot = store.snapshot();
        let purged = store.purge_orphaned_timers(&snapshot);
        assert_eq!(purged, vec![(role(3), user(7))]);
        assert_eq!(store.timer_count(), 1);
        assert!(store.applied_at(role(1), user(7)).is_some());
    }
}
