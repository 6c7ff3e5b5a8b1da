use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(
        poise::CreateReply::default()
            .content("🏓 Pong! Bot is working!")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("⚽ Pitchside Commands")
        .description("Collect players, build your squad and play the daily penalty game.")
        .field("/contract [pack]", "Pull a player from a pack, or list the packs", false)
        .field("/contract-info [pack]", "Odds and top players of a pack", false)
        .field("/penalty status", "Your daily penalty progress", false)
        .field("/penalty shoot", "Take today's penalty shot", false)
        .field("/removeplayer <player>", "Remove a player from your collection", false)
        .field("/balance", "Your GP, eCoins and unclaimed mail", false)
        .field("/news [page]", "Latest game news", false)
        .field("/managenews", "Add or remove news (Admin)", false)
        .color(0x0099ff);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Show your balances and collection size
#[poise::command(slash_command)]
pub async fn balance(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let data = ctx.data().collection.user(&user_id).await?;

    let embed = serenity::CreateEmbed::new()
        .title(format!("💼 {}'s Club", ctx.author().name))
        .field("💵 GP", data.gp.to_string(), true)
        .field("💰 eCoins", data.e_coins.to_string(), true)
        .field("👥 Players", data.players.len().to_string(), true)
        .field("📬 Unclaimed mail", data.unclaimed_mail_count().to_string(), true)
        .color(0x5865f2);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
