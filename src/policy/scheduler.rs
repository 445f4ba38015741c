//! Reconciliation scheduler
//!
//! One task owns both sweep tickers and the request queue. Every evaluation
//! (sweeps and the immediate path alike) runs on this task, so reads and
//! writes of the timer state never interleave and the grace-period semantics
//! cannot be corrupted by a sweep/event race.

use crate::policy::{
    ActionExecutor, Directive, GuildRoster, PolicyAction, PolicyStore, ReconcileRequest,
    REASON_CONFLICT_SWEEP, REASON_TRIGGER_ADDED, resolver, tracker,
};
use chrono::Utc;
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::{self, Duration, Instant, Interval};
use tracing::{error, info, warn};

/// Default conflict sweep interval in seconds
pub const DEFAULT_CONFLICT_INTERVAL_SECS: u64 = 60;
/// Default punishment sweep interval in seconds
pub const DEFAULT_PUNISHMENT_INTERVAL_SECS: u64 = 60;

const REQUEST_QUEUE_CAPACITY: usize = 100;

/// Service driving the periodic sweeps and the event-driven immediate path
#[derive(Clone)]
pub struct ReconcilerService {
    store: PolicyStore,
    executor: Arc<dyn ActionExecutor>,
    roster: Arc<dyn GuildRoster>,
}

impl ReconcilerService {
    /// Create a new reconciler over the given store, executor, and roster
    pub fn new(
        store: PolicyStore,
        executor: Arc<dyn ActionExecutor>,
        roster: Arc<dyn GuildRoster>,
    ) -> Self {
        Self {
            store,
            executor,
            roster,
        }
    }

    /// Spawn the reconciliation task and return the request sender
    pub fn start(self, conflict_secs: u64, punishment_secs: u64) -> Sender<ReconcileRequest> {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        tokio::spawn(async move {
            self.run(rx, conflict_secs, punishment_secs).await;
        });
        tx
    }

    /// The reconciliation task: serves queue requests and both sweep tickers
    /// until shut down. Interval changes replace the ticker, so the new
    /// period applies from the next cycle without touching running timers.
    pub async fn run(
        self,
        mut rx: Receiver<ReconcileRequest>,
        conflict_secs: u64,
        punishment_secs: u64,
    ) {
        info!(
            target: crate::POLICY_TARGET,
            conflict_secs, punishment_secs, "Starting reconciliation task"
        );

        let mut conflict_tick = ticker(conflict_secs);
        let mut punishment_tick = ticker(punishment_secs);

        loop {
            tokio::select! {
                request = rx.recv() => {
                    let Some(request) = request else { break };
                    match request {
                        ReconcileRequest::MemberUpdate { guild_id, user_id, before, after } => {
                            self.handle_member_update(guild_id, user_id, &before, &after).await;
                        }
                        ReconcileRequest::SweepConflicts => self.sweep_conflicts().await,
                        ReconcileRequest::SweepPunishments => self.sweep_punishments().await,
                        ReconcileRequest::SetConflictInterval(secs) => {
                            conflict_tick = ticker(secs);
                            info!(target: crate::POLICY_TARGET, secs, "Conflict sweep interval changed");
                        }
                        ReconcileRequest::SetPunishmentInterval(secs) => {
                            punishment_tick = ticker(secs);
                            info!(target: crate::POLICY_TARGET, secs, "Punishment sweep interval changed");
                        }
                        ReconcileRequest::Shutdown => {
                            info!(target: crate::POLICY_TARGET, "Received shutdown request");
                            break;
                        }
                    }
                }
                _ = conflict_tick.tick() => self.sweep_conflicts().await,
                _ = punishment_tick.tick() => self.sweep_punishments().await,
            }
        }

        info!(target: crate::POLICY_TARGET, "Reconciliation task shut down");
    }

    /// Immediate path: react to roles added to a member. Role removals are
    /// left to the punishment sweep's debounce branch.
    pub async fn handle_member_update(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        before: &HashSet<RoleId>,
        after: &HashSet<RoleId>,
    ) {
        let added: Vec<RoleId> = after.difference(before).copied().collect();
        if added.is_empty() {
            return;
        }
        let snapshot = self.store.snapshot();

        if added.iter().any(|role| snapshot.triggers.contains(role)) {
            for role_id in resolver::resolve(after, &snapshot.triggers, &snapshot.removals) {
                self.dispatch(Directive {
                    guild_id,
                    user_id,
                    role_id,
                    action: PolicyAction::RemoveRole,
                    reason: REASON_TRIGGER_ADDED,
                })
                .await;
            }
        }

        let now = Utc::now();
        for role_id in added {
            if let Some(directive) =
                tracker::track_added_role(&self.store, &snapshot, now, guild_id, user_id, role_id)
            {
                self.dispatch(directive).await;
            }
        }
    }

    /// Conflict sweep: strip removal roles from every member holding a
    /// trigger role, in every guild. Safe to run redundantly.
    pub async fn sweep_conflicts(&self) {
        let snapshot = self.store.snapshot();
        if snapshot.triggers.is_empty() || snapshot.removals.is_empty() {
            return;
        }

        for guild_id in self.roster.guilds() {
            for (user_id, roles) in self.roster.members(guild_id) {
                for role_id in resolver::resolve(&roles, &snapshot.triggers, &snapshot.removals) {
                    self.dispatch(Directive {
                        guild_id,
                        user_id,
                        role_id,
                        action: PolicyAction::RemoveRole,
                        reason: REASON_CONFLICT_SWEEP,
                    })
                    .await;
                }
            }
        }
    }

    /// Punishment sweep: advance every member's timers against every
    /// punishment policy and dispatch whatever crossed its grace period.
    pub async fn sweep_punishments(&self) {
        let snapshot = self.store.snapshot();

        for (role_id, user_id) in self.store.purge_orphaned_timers(&snapshot) {
            warn!(
                target: crate::POLICY_TARGET,
                role_id = %role_id,
                user_id = %user_id,
                "Discarding punishment timer with no matching policy"
            );
        }
        if snapshot.punishments.is_empty() {
            return;
        }

        let now = Utc::now();
        for guild_id in self.roster.guilds() {
            for (user_id, roles) in self.roster.members(guild_id) {
                for directive in
                    tracker::evaluate_member(&self.store, &snapshot, now, guild_id, user_id, &roles)
                {
                    self.dispatch(directive).await;
                }
            }
        }
    }

    /// Execute one directive, logging a failure and moving on. A failed
    /// attempt is dropped; the next sweep or event re-derives the need.
    async fn dispatch(&self, directive: Directive) {
        if let Err(e) = self.executor.execute(directive).await {
            error!(
                target: crate::POLICY_TARGET,
                guild_id = %directive.guild_id,
                user_id = %directive.user_id,
                role_id = %directive.role_id,
                action = %directive.action,
                error = %e,
                "Failed to execute policy action"
            );
        }
    }
}

fn ticker(secs: u64) -> Interval {
    let period = Duration::from_secs(secs.max(1));
    // First tick lands one full period out; a plain interval would fire
    // immediately on every reconfiguration.
    time::interval_at(Instant::now() + period, period)
}
