//! Role policy reconciliation engine
//!
//! Tracks role-policy configuration and per-member punishment timers,
//! re-evaluates every guild member on a periodic sweep, and reacts
//! immediately to role-change events. Platform I/O happens only behind the
//! `ActionExecutor` and `GuildRoster` seams.

mod action;
mod error;
mod executor;
mod resolver;
mod roster;
mod scheduler;
mod store;
mod tracker;

pub use action::{
    Directive, PolicyAction, PunishmentAction, REASON_CONFLICT_SWEEP, REASON_IMMEDIATE_PUNISHMENT,
    REASON_PUNISHMENT, REASON_TRIGGER_ADDED,
};
pub use error::{PolicyError, PolicyResult};
pub use executor::{ActionExecutor, DiscordExecutor};
pub use resolver::resolve;
pub use roster::{CacheRoster, GuildRoster};
pub use scheduler::{
    DEFAULT_CONFLICT_INTERVAL_SECS, DEFAULT_PUNISHMENT_INTERVAL_SECS, ReconcilerService,
};
pub use store::{PolicySnapshot, PolicyStore, PunishmentPolicy};
pub use tracker::{TimerStep, evaluate_member, step, track_added_role};

#[cfg(test)]
pub use executor::MockActionExecutor;

use poise::serenity_prelude::{GuildId, RoleId, UserId};
use std::collections::HashSet;

/// Request type for the reconciliation task
#[derive(Debug, Clone)]
pub enum ReconcileRequest {
    /// A member's role set changed; run the immediate path
    MemberUpdate {
        guild_id: GuildId,
        user_id: UserId,
        before: HashSet<RoleId>,
        after: HashSet<RoleId>,
    },
    /// Run a conflict sweep now
    SweepConflicts,
    /// Run a punishment sweep now
    SweepPunishments,
    /// Change the conflict sweep interval (seconds), effective next cycle
    SetConflictInterval(u64),
    /// Change the punishment sweep interval (seconds), effective next cycle
    SetPunishmentInterval(u64),
    /// Shut down the reconciliation task
    Shutdown,
}
