use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Owned players whose name matches the typed text. The choice value is the player id.
async fn autocomplete_owned_player(
    ctx: Context<'_>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let user_id = ctx.author().id.to_string();
    ctx.data()
        .collection
        .suggest(&user_id, partial)
        .await
        .into_iter()
        .map(|player| serenity::AutocompleteChoice::new(player.summary(), player.id))
        .collect()
}

/// Remove a player from your collection
#[poise::command(slash_command, rename = "removeplayer")]
pub async fn remove_player(
    ctx: Context<'_>,
    #[description = "The player to remove"]
    #[autocomplete = "autocomplete_owned_player"]
    player: String,
) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let removed = ctx.data().collection.remove_player(&user_id, &player).await?;

    info!("{} removed {} from their collection", ctx.author().name, removed.name);

    let embed = serenity::CreateEmbed::new()
        .title("🗑️ Player Removed")
        .description(format!(
            "Successfully removed **{}** from your collection.",
            removed.summary()
        ))
        .color(0xe67e22);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
