use std::env;
use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use role_warden::policy::{
    CacheRoster, DEFAULT_CONFLICT_INTERVAL_SECS, DEFAULT_PUNISHMENT_INTERVAL_SECS,
    DiscordExecutor, ReconcilerService,
};
use role_warden::{Data, Error, commands, handlers, logging};
use serenity::GatewayIntents;
use tracing::info;

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // Initialize logging
    logging::init()?;

    // Load environment variables
    let token = env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN must be set");

    // Set up the bot's data
    let data = Data::new();

    // Configure the Poise framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // Start the reconciliation engine against the live gateway
                let executor = Arc::new(DiscordExecutor::new(ctx.http.clone()));
                let roster = Arc::new(CacheRoster::new(ctx.cache.clone()));
                let service = ReconcilerService::new(data.store.clone(), executor, roster);
                let tx = service.start(
                    DEFAULT_CONFLICT_INTERVAL_SECS,
                    DEFAULT_PUNISHMENT_INTERVAL_SECS,
                );

                let mut data = data;
                data.set_reconciler_tx(tx);

                // Make the data reachable from raw gateway event handlers
                ctx.data.write().await.insert::<Data>(data.clone());
                info!("Reconciliation engine started");
                Ok(data)
            })
        })
        .build();

    // Configure the Serenity client; GUILD_MEMBERS is required for member
    // update events and for the cache-backed sweeps
    let intents = GatewayIntents::non_privileged() | GatewayIntents::GUILD_MEMBERS;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler)
        .framework(framework)
        .await
        .expect("Failed to create client");

    info!("Starting bot...");
    // Start the bot
    if let Err(err) = client.start().await {
        eprintln!("Error starting the bot: {}", err);
    }

    Ok(())
}

fn main() {
    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {}", err);
    }
}
