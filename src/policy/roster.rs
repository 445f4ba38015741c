//! Guild membership enumeration for sweep passes
//!
//! Sweeps need every member of every guild with their current role sets.
//! The trait keeps the engine off the live gateway; tests supply fixed
//! rosters.

use poise::serenity_prelude::{self as serenity, GuildId, RoleId, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// Source of guild and member snapshots for the reconciler
pub trait GuildRoster: Send + Sync {
    /// Guilds the bot currently sees
    fn guilds(&self) -> Vec<GuildId>;

    /// Members of a guild with their current role sets. An unknown guild
    /// yields an empty list.
    fn members(&self, guild_id: GuildId) -> Vec<(UserId, HashSet<RoleId>)>;
}

/// Roster backed by the serenity gateway cache
pub struct CacheRoster {
    cache: Arc<serenity::Cache>,
}

impl CacheRoster {
    #[must_use]
    pub fn new(cache: Arc<serenity::Cache>) -> Self {
        Self { cache }
    }
}

impl GuildRoster for CacheRoster {
    fn guilds(&self) -> Vec<GuildId> {
        self.cache.guilds()
    }

    fn members(&self, guild_id: GuildId) -> Vec<(UserId, HashSet<RoleId>)> {
        self.cache
            .guild(guild_id)
            .map(|guild| {
                guild
                    .members
                    .iter()
                    .map(|(user_id, member)| (*user_id, member.roles.iter().copied().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
