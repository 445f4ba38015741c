//! Slash commands: the configuration mutation surface
//!
//! Commands only mutate the policy store or post messages on the reconciler
//! queue; policy is never evaluated inline here.

use crate::policy::{PunishmentAction, PunishmentPolicy, ReconcileRequest};
use crate::{Context, Error};
use poise::command;
use poise::serenity_prelude::{self as serenity, Mentionable, RoleId};
use std::collections::HashSet;

/// Basic ping command
/// This command is used to check if the bot is responsive.
#[command(prefix_command, slash_command, guild_only)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Pong!").await?;
    Ok(())
}

/// Add a trigger role
#[command(slash_command, guild_only, rename = "add-trigger")]
pub async fn add_trigger(
    ctx: Context<'_>,
    #[description = "The trigger role"] role: serenity::Role,
) -> Result<(), Error> {
    ctx.data().store.add_trigger(role.id);
    ctx.say(format!("Added {} as a trigger role.", role.name)).await?;
    Ok(())
}

/// Remove a trigger role
#[command(slash_command, guild_only, rename = "remove-trigger")]
pub async fn remove_trigger(
    ctx: Context<'_>,
    #[description = "The trigger role to remove"] role: serenity::Role,
) -> Result<(), Error> {
    ctx.data().store.remove_trigger(role.id);
    ctx.say(format!("Removed {} from trigger roles.", role.name)).await?;
    Ok(())
}

/// Add a role to be removed when a trigger role is held
#[command(slash_command, guild_only, rename = "add-removal-role")]
pub async fn add_removal_role(
    ctx: Context<'_>,
    #[description = "The role to remove"] role: serenity::Role,
) -> Result<(), Error> {
    ctx.data().store.add_removal(role.id);
    ctx.say(format!("Added {} to the removal list.", role.name)).await?;
    Ok(())
}

/// Remove a role from the removal list
#[command(slash_command, guild_only, rename = "remove-removal-role")]
pub async fn remove_removal_role(
    ctx: Context<'_>,
    #[description = "The role to take off the removal list"] role: serenity::Role,
) -> Result<(), Error> {
    ctx.data().store.remove_removal(role.id);
    ctx.say(format!("Removed {} from the removal list.", role.name)).await?;
    Ok(())
}

/// List all trigger and removal roles
#[command(slash_command, guild_only, rename = "list-roles")]
pub async fn list_roles(ctx: Context<'_>) -> Result<(), Error> {
    let (triggers, removals) = ctx.data().store.list_roles();

    // Resolve ids against the guild so deleted roles are elided.
    let message = {
        let known: HashSet<RoleId> = ctx
            .guild()
            .map(|guild| guild.roles.keys().copied().collect())
            .unwrap_or_default();
        format!(
            "**Trigger Roles:** {}\n**Roles to Remove:** {}",
            render_role_list(&triggers, &known),
            render_role_list(&removals, &known),
        )
    };

    ctx.say(message).await?;
    Ok(())
}

/// Set how often the conflict sweep runs (in seconds)
#[command(slash_command, guild_only, rename = "set-conflict-interval")]
pub async fn set_conflict_interval(
    ctx: Context<'_>,
    #[description = "Sweep interval in seconds"] seconds: u64,
) -> Result<(), Error> {
    if seconds == 0 {
        ctx.say("Interval must be a positive number of seconds.").await?;
        return Ok(());
    }
    send_to_reconciler(&ctx, ReconcileRequest::SetConflictInterval(seconds)).await?;
    ctx.say(format!("Conflict sweep interval set to {seconds} seconds.")).await?;
    Ok(())
}

/// Set how often the punishment sweep runs (in seconds)
#[command(slash_command, guild_only, rename = "set-punishment-interval")]
pub async fn set_punishment_interval(
    ctx: Context<'_>,
    #[description = "Sweep interval in seconds"] seconds: u64,
) -> Result<(), Error> {
    if seconds == 0 {
        ctx.say("Interval must be a positive number of seconds.").await?;
        return Ok(());
    }
    send_to_reconciler(&ctx, ReconcileRequest::SetPunishmentInterval(seconds)).await?;
    ctx.say(format!("Punishment sweep interval set to {seconds} seconds.")).await?;
    Ok(())
}

/// Set a punishment for a role
#[command(slash_command, guild_only, rename = "add-punishment-role")]
pub async fn add_punishment_role(
    ctx: Context<'_>,
    #[description = "Role to punish"] role: serenity::Role,
    #[description = "mute, kick, or ban"] action: String,
    #[description = "Grace period in seconds"] delay: u64,
) -> Result<(), Error> {
    let Ok(action) = action.parse::<PunishmentAction>() else {
        ctx.say("Invalid action. Use mute, kick, or ban.").await?;
        return Ok(());
    };
    ctx.data().store.set_punishment(
        role.id,
        PunishmentPolicy {
            action,
            delay_secs: delay,
        },
    );
    ctx.say(format!(
        "Members holding {} will receive a {} after {} seconds.",
        role.name, action, delay
    ))
    .await?;
    Ok(())
}

/// Remove the punishment from a role
#[command(slash_command, guild_only, rename = "remove-punishment-role")]
pub async fn remove_punishment_role(
    ctx: Context<'_>,
    #[description = "Role to stop punishing"] role: serenity::Role,
) -> Result<(), Error> {
    match ctx.data().store.clear_punishment(role.id) {
        Ok(_) => {
            ctx.say(format!("Removed punishment for {}.", role.name)).await?;
        }
        Err(_) => {
            ctx.say("Role not found in punishment list.").await?;
        }
    }
    Ok(())
}

/// Every command the bot registers
#[must_use]
pub fn all() -> Vec<poise::Command<crate::Data, Error>> {
    vec![
        ping(),
        add_trigger(),
        remove_trigger(),
        add_removal_role(),
        remove_removal_role(),
        list_roles(),
        set_conflict_interval(),
        set_punishment_interval(),
        add_punishment_role(),
        remove_punishment_role(),
    ]
}

fn render_role_list(ids: &[RoleId], known: &HashSet<RoleId>) -> String {
    let mentions: Vec<String> = ids
        .iter()
        .filter(|id| known.contains(id))
        .map(|id| id.mention().to_string())
        .collect();
    if mentions.is_empty() {
        "None".to_string()
    } else {
        mentions.join(", ")
    }
}

async fn send_to_reconciler(ctx: &Context<'_>, request: ReconcileRequest) -> Result<(), Error> {
    let Some(tx) = ctx.data().reconciler_tx() else {
        return Err("Reconciliation task is not running".into());
    };
    tx.send(request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definitions() {
        let commands = all();
        let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ping",
                "add-trigger",
                "remove-trigger",
                "add-removal-role",
                "remove-removal-role",
                "list-roles",
                "set-conflict-interval",
                "set-punishment-interval",
                "add-punishment-role",
                "remove-punishment-role",
            ]
        );
        assert!(commands.iter().all(|c| c.guild_only));
    }

    #[test]
    fn test_commands_register_as_slash_commands() {
        for cmd in all() {
            assert!(
                cmd.create_as_slash_command().is_some(),
                "{} should register as a slash command",
                cmd.name
            );
        }
    }

    #[test]
    fn test_render_role_list_elides_deleted_roles() {
        let known: HashSet<RoleId> = [RoleId::new(1)].into_iter().collect();
        let rendered = render_role_list(&[RoleId::new(1), RoleId::new(2)], &known);
        assert_eq!(rendered, RoleId::new(1).mention().to_string());

        assert_eq!(render_role_list(&[], &known), "None");
        assert_eq!(render_role_list(&[RoleId::new(2)], &known), "None");
    }
}
