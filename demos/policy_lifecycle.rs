//! Offline walkthrough of the reconciliation engine: no gateway, a fixed
//! roster and a printing executor stand in for Discord.

use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use role_warden::policy::{
    ActionExecutor, Directive, GuildRoster, PolicyResult, PolicyStore, PunishmentAction,
    PunishmentPolicy, ReconcilerService,
};
use std::collections::HashSet;
use std::sync::Arc;

struct DemoRoster;

impl GuildRoster for DemoRoster {
    fn guilds(&self) -> Vec<GuildId> {
        vec![GuildId::new(100)]
    }

    fn members(&self, _guild_id: GuildId) -> Vec<(UserId, HashSet<RoleId>)> {
        // Alice holds the trigger role and a removable role; Bob holds the
        // punished role.
        vec![
            (
                UserId::new(1),
                [RoleId::new(10), RoleId::new(20)].into_iter().collect(),
            ),
            (UserId::new(2), [RoleId::new(30)].into_iter().collect()),
        ]
    }
}

struct PrintingExecutor;

#[async_trait]
impl ActionExecutor for PrintingExecutor {
    async fn execute(&self, directive: Directive) -> PolicyResult<()> {
        println!(
            "  -> {} user {} role {} ({})",
            directive.action, directive.user_id, directive.role_id, directive.reason
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    println!("Policy Lifecycle Walkthrough");
    println!("----------------------------");

    let store = PolicyStore::new();
    store.add_trigger(RoleId::new(10));
    store.add_removal(RoleId::new(20));
    store.set_punishment(
        RoleId::new(30),
        PunishmentPolicy {
            action: PunishmentAction::Kick,
            delay_secs: 10,
        },
    );

    let service = ReconcilerService::new(store.clone(), Arc::new(PrintingExecutor), Arc::new(DemoRoster));

    println!("\nConflict sweep (Alice holds trigger 10 and removable 20):");
    service.sweep_conflicts().await;

    println!("\nFirst punishment sweep (starts Bob's timer, no action):");
    service.sweep_punishments().await;
    println!("  running timers: {}", store.timer_count());

    // Pretend Bob has been holding role 30 for longer than the grace period.
    store.start_timer(
        RoleId::new(30),
        UserId::new(2),
        Utc::now() - chrono::Duration::seconds(11),
    );

    println!("\nSecond punishment sweep (grace period crossed):");
    service.sweep_punishments().await;
    println!("  running timers: {}", store.timer_count());

    println!("\nImmediate path (Bob re-gains role 30, timer restarts):");
    service
        .handle_member_update(
            GuildId::new(100),
            UserId::new(2),
            &HashSet::new(),
            &[RoleId::new(30)].into_iter().collect(),
        )
        .await;
    println!("  running timers: {}", store.timer_count());
}
