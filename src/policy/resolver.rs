//! Conflict resolution
//!
//! Given a member's current role set and the configured trigger/removal
//! sets, compute which roles to strip. Pure and deterministic so the sweep
//! path and the immediate path always agree on the same answer.

use poise::serenity_prelude::RoleId;
use std::collections::HashSet;

/// Roles to strip from a member: the intersection of their roles with the
/// removal set, but only when they hold at least one trigger role.
///
/// Stripping is one-shot per detection. A role listed as both trigger and
/// removal is stripped like any other removal role; once gone it no longer
/// triggers, so there is no removal loop.
#[must_use]
pub fn resolve(
    member_roles: &HashSet<RoleId>,
    triggers: &HashSet<RoleId>,
    removals: &HashSet<RoleId>,
) -> HashSet<RoleId> {
    if member_roles.is_disjoint(triggers) {
        return HashSet::new();
    }
    member_roles.intersection(removals).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(ids: &[u64]) -> HashSet<RoleId> {
        ids.iter().map(|id| RoleId::new(*id)).collect()
    }

    #[test]
    fn test_strips_removals_when_trigger_held() {
        let member = roles(&[1, 2, 3]);
        let triggers = roles(&[1]);
        let removals = roles(&[2, 4]);

        assert_eq!(resolve(&member, &triggers, &removals), roles(&[2]));
    }

    #[test]
    fn test_no_trigger_means_no_removals() {
        let member = roles(&[2, 3]);
        let triggers = roles(&[1]);
        let removals = roles(&[2]);

        assert!(resolve(&member, &triggers, &removals).is_empty());
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let member = roles(&[1, 2]);
        let triggers = roles(&[1]);
        let removals = roles(&[2]);

        let first = resolve(&member, &triggers, &removals);
        let second = resolve(&member, &triggers, &removals);
        assert_eq!(first, second);
    }

    #[test]
    fn test_convergence_after_stripping() {
        // After removing the resolved roles, a second resolve finds nothing
        // more to do.
        let member = roles(&[1, 2, 5]);
        let triggers = roles(&[1]);
        let removals = roles(&[2, 5]);

        let strip = resolve(&member, &triggers, &removals);
        let remaining: HashSet<RoleId> = member.difference(&strip).copied().collect();
        assert!(resolve(&remaining, &triggers, &removals).is_empty());
    }

    #[test]
    fn test_role_in_both_sets_does_not_loop() {
        // Role 1 is both a trigger and a removal role. It gets stripped once;
        // with it gone the member no longer triggers.
        let member = roles(&[1]);
        let triggers = roles(&[1]);
        let removals = roles(&[1]);

        let strip = resolve(&member, &triggers, &removals);
        assert_eq!(strip, roles(&[1]));

        let remaining: HashSet<RoleId> = member.difference(&strip).copied().collect();
        assert!(resolve(&remaining, &triggers, &removals).is_empty());
    }

    #[test]
    fn test_spec_scenario() {
        // Member holds {T, R}; T triggers, R is removable.
        let triggers = roles(&[10]);
        let removals = roles(&[20]);

        assert_eq!(resolve(&roles(&[10, 20]), &triggers, &removals), roles(&[20]));
        assert!(resolve(&roles(&[10]), &triggers, &removals).is_empty());
    }
}
