use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Football card collecting bot with a web dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Register slash commands in this guild only (instant, for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Run the bot without the dashboard web server
    #[arg(long)]
    no_web: bool,
}

mod commands;
mod config;
mod error;
mod game;
mod logging;
mod managers;
mod state;
mod web;

use commands::{balance, contract, contract_info, help, managenews, news, penalty, ping, remove_player};
use config::Settings;
use error::BotError;
use game::SystemClock;
use managers::{
    create_shared_collection_manager, create_shared_config_manager,
    create_shared_contract_manager, create_shared_mail_manager, create_shared_penalty_manager,
    SharedCollectionManager, SharedContractManager, SharedPenaltyManager,
};
use state::{create_shared_user_store, NewsStore, PackLimits, SharedNewsStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub settings: Settings,
    pub contracts: SharedContractManager,
    pub penalty: SharedPenaltyManager,
    pub collection: SharedCollectionManager,
    pub news: SharedNewsStore,
    pub status: web::SharedBotStatus,
}

/// Log the application id encoded in the first token segment
fn log_application_id(token: &str) {
    use base64::Engine;

    let Some(segment) = token.split('.').next() else {
        return;
    };
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(segment)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(segment));

    if let Some(id) = decoded.ok().and_then(|bytes| String::from_utf8(bytes).ok()) {
        info!(
            "Application ID: {} (invite: https://discord.com/oauth2/authorize?client_id={}&scope=bot%20applications.commands)",
            id, id
        );
    }
}

fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        ping(),
        help(),
        balance(),
        contract(),
        contract_info(),
        penalty(),
        remove_player(),
        news(),
        managenews(),
    ]
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let message = match error.downcast_ref::<BotError>() {
                Some(e) if e.is_user_facing() => {
                    info!(
                        "Command '{}' for {} ended with: {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        e
                    );
                    format!("❌ {}", e)
                }
                _ => {
                    error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                    ctx.data().status.record_error(error.to_string());
                    "❌ An error occurred. Please try again later.".to_string()
                }
            };
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .content(message)
                        .ephemeral(true),
                )
                .await;
        }
        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
            warn!(
                "Argument parse error in '{}': {} (input: {:?})",
                ctx.command().qualified_name,
                error,
                input
            );
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .content(format!("❌ {}", error))
                        .ephemeral(true),
                )
                .await;
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                error!("Check for '{}' failed: {}", ctx.command().qualified_name, error);
            }
        }
        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
            warn!(
                "User {} missing permissions for '{}': {:?}",
                ctx.author().name,
                ctx.command().qualified_name,
                missing_permissions
            );
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .content("❌ This command can only be used in a server.")
                        .ephemeral(true),
                )
                .await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::ShardStageUpdate { event } = event {
        let connected = matches!(event.new, serenity::ConnectionStage::Connected);
        if !connected {
            warn!("Shard {} is {:?}", event.shard_id, event.new);
        }
        data.status.set_connected(connected);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Captured lines back the dashboard's admin log view
    let log_buffer = logging::create_log_buffer(1000);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    let token = std::env::var("DISCORD_TOKEN").context("Missing DISCORD_TOKEN environment variable")?;
    log_application_id(&token);

    let settings = Settings::from_env();
    tokio::fs::create_dir_all(settings.users_dir())
        .await
        .with_context(|| format!("Failed to create {}", settings.users_dir()))?;

    info!("Loading configurations from {}...", settings.data_path);
    let config_manager = create_shared_config_manager(settings.clone());
    config_manager
        .write()
        .await
        .load_all()
        .await
        .context("Failed to load packs or player catalog")?;

    let news_store = match NewsStore::load(&settings.news_path()).await {
        Ok(store) => store,
        Err(e) => {
            warn!("Could not load news: {}, starting with no articles", e);
            NewsStore::empty(&settings.news_path())
        }
    };
    let news_store: SharedNewsStore = Arc::new(news_store);

    let limits_path = settings.pack_limits_path();
    let limits = {
        let config = config_manager.read().await;
        PackLimits::load(&limits_path, config.packs()).await
    };

    let users = create_shared_user_store(&settings.users_dir());
    let contracts =
        create_shared_contract_manager(config_manager.clone(), users.clone(), limits, &limits_path);
    let penalty_manager = create_shared_penalty_manager(users.clone(), Arc::new(SystemClock));
    let mail = create_shared_mail_manager(users.clone());
    let collection = create_shared_collection_manager(users.clone());
    let status = web::create_bot_status();

    let target_guild_id = args.guild_id;
    match target_guild_id {
        Some(gid) => info!("--guild-id: Registering commands in guild {} only", gid),
        None => info!("Registering commands globally (takes up to 1 hour to propagate)"),
    }

    if args.no_web {
        info!("--no-web: Dashboard web server disabled");
    }
    let web_config = (!args.no_web).then(web::WebServerConfig::from_env);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);
                status.set_connected(true);

                match target_guild_id {
                    Some(gid) => {
                        let guild_id = serenity::GuildId::new(gid);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            guild_id,
                        )
                        .await
                        {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!(
                                "Registered {} commands for guild {}",
                                framework.options().commands.len(),
                                guild_id
                            );
                        }
                    }
                    None => {
                        if let Err(e) = poise::builtins::register_globally(
                            ctx,
                            &framework.options().commands,
                        )
                        .await
                        {
                            error!("Failed to register commands globally: {}", e);
                        } else {
                            info!(
                                "Registered {} commands globally",
                                framework.options().commands.len()
                            );
                        }
                    }
                }

                if let Some(web_config) = web_config {
                    let admin_guild = std::env::var("DISCORD_GUILD_ID")
                        .ok()
                        .and_then(|s| s.parse::<u64>().ok())
                        .or(target_guild_id)
                        .filter(|id| *id != 0)
                        .map(serenity::GuildId::new);

                    let web_state = web::WebState {
                        oauth: web::OAuthState::from_env(),
                        sessions: web::create_session_store(),
                        settings: settings.clone(),
                        config_manager,
                        contracts: contracts.clone(),
                        penalty: penalty_manager.clone(),
                        mail,
                        collection: collection.clone(),
                        news: news_store.clone(),
                        log_buffer,
                        status: status.clone(),
                        serenity_http: Some(ctx.http.clone()),
                        admin_guild,
                    };

                    tokio::spawn(async move {
                        info!("Starting dashboard web server on port {}...", web_config.port);
                        if let Err(e) = web::start_web_server(web_config, web_state).await {
                            error!("Web server error: {}", e);
                        }
                    });
                }

                Ok(Data {
                    settings,
                    contracts,
                    penalty: penalty_manager,
                    collection,
                    news: news_store,
                    status,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    warn!("Bot ended.");

    Ok(())
}
