use crate::policy::ReconcileRequest;
use crate::{Data, EVENT_TARGET};
use poise::serenity_prelude::{
    self as serenity, Context, EventHandler, GuildId, GuildMemberUpdateEvent, Member, Ready, RoleId,
};
use std::collections::HashSet;
use tracing::{error, info, warn};

pub struct Handler;

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!("Cache ready! The bot is in {guild_count} guild(s)");
    }

    /// Immediate path: forward role-set changes to the reconciliation task.
    async fn guild_member_update(
        &self,
        ctx: Context,
        old_if_available: Option<Member>,
        new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        let data = { ctx.data.read().await.get::<Data>().cloned() };
        let Some(data) = data else {
            return;
        };
        let Some(tx) = data.reconciler_tx() else {
            return;
        };

        // On a cache miss the old member is unknown; an empty before-set
        // makes every current role count as added, which is safe because
        // the immediate path is idempotent.
        let before: HashSet<RoleId> = old_if_available
            .map(|member| member.roles.iter().copied().collect())
            .unwrap_or_default();
        let after: HashSet<RoleId> = new
            .map(|member| member.roles.iter().copied().collect())
            .unwrap_or_else(|| event.roles.iter().copied().collect());

        let request = ReconcileRequest::MemberUpdate {
            guild_id: event.guild_id,
            user_id: event.user.id,
            before,
            after,
        };
        if let Err(e) = tx.send(request).await {
            error!(
                target: EVENT_TARGET,
                guild_id = %event.guild_id,
                user_id = %event.user.id,
                error = %e,
                "Failed to queue member update for reconciliation"
            );
        }
    }
}
