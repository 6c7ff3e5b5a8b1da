use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::{error, info};

use crate::error::BotError;
use crate::game::penalty::{ON_MISS, ON_SCORE};
use crate::game::{Direction, PenaltyStatus, START_STEPS};
use crate::managers::PenaltyOutcome;
use crate::{Context, Error};

const AIM_TIMEOUT: Duration = Duration::from_secs(60);

const RULES_FOOTER: &str =
    "You only get 1 shot per day. Reach 0 to earn a reward, then it resets to 35.";

/// Button id for one aim direction, bound to the user who ran the command
fn shot_button_id(direction: Direction, user_id: serenity::UserId) -> String {
    format!("penalty_{}_{}", direction, user_id)
}

fn not_your_button_text() -> String {
    format!("⛔ {}", BotError::NotYourInteraction)
}

/// Parse `penalty_<direction>_<userId>`
fn parse_shot_button(custom_id: &str) -> Option<(Direction, serenity::UserId)> {
    let mut parts = custom_id.splitn(3, '_');
    if parts.next()? != "penalty" {
        return None;
    }
    let direction = parts.next()?.parse().ok()?;
    let user_id = parts.next()?.parse::<u64>().ok().filter(|id| *id != 0)?;
    Some((direction, serenity::UserId::new(user_id)))
}

/// Button label and emoji
fn direction_button(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Left => ("Left", "⬅️"),
        Direction::Center => ("Center", "⬆️"),
        Direction::Right => ("Right", "➡️"),
    }
}

fn status_embed(status: &PenaltyStatus) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("📊 Daily Penalty - Status")
        .color(0x5865f2)
        .description(format!(
            "🎯 Remaining path: **{}**\n⚽ On Goal: -{} • ❌ On Miss: -{}",
            status.remaining, ON_SCORE, ON_MISS
        ))
        .field(
            "📅 Today's Shot",
            if status.can_play_today {
                "⏳ Available"
            } else {
                "✔️ Used"
            },
            true,
        )
        .footer(serenity::CreateEmbedFooter::new(RULES_FOOTER))
}

fn result_embed(outcome: &PenaltyOutcome) -> serenity::CreateEmbed {
    let shot = &outcome.shot;
    let description = if shot.scored {
        format!(
            "✅ **GOAL!**\nYou aimed **{}** and the keeper went **{}**.\n\n🟢 Progress: **-{}** steps",
            shot.direction, shot.keeper, shot.delta
        )
    } else {
        format!(
            "❌ **MISS!**\nYou aimed **{}** but the keeper went **{}**.\n\n🔴 Progress: **-{}** steps",
            shot.direction, shot.keeper, shot.delta
        )
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("⚽ Daily Penalty - Result ⚽")
        .color(if shot.scored { 0x2ecc71 } else { 0xe74c3c })
        .description(description)
        .field("📊 Remaining Steps", shot.remaining.to_string(), true)
        .field("📅 Today's Shot", "✔️ Used", true)
        .footer(serenity::CreateEmbedFooter::new(RULES_FOOTER));

    if !shot.rewards.is_empty() {
        let rewards: Vec<String> = shot.rewards.iter().map(|r| r.describe()).collect();
        embed = embed.field("🎁 Rewards", rewards.join("\n\n"), false);
    }
    if shot.cycle_completed {
        embed = embed.field(
            "🏁 Path complete",
            format!("Your path resets to {}.", START_STEPS),
            false,
        );
    }
    embed
}

/// Daily penalty minigame
#[poise::command(slash_command, subcommands("status", "shoot"), subcommand_required)]
pub async fn penalty(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// View your daily penalty progress
#[poise::command(slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let status = ctx.data().penalty.status(&user_id).await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(status_embed(&status))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Take your daily penalty shot (once per day)
#[poise::command(slash_command)]
pub async fn shoot(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author().id;
    ctx.data().penalty.arm(&author.to_string()).await?;

    let buttons: Vec<serenity::CreateButton> = Direction::ALL
        .iter()
        .map(|direction| {
            let (label, emoji) = direction_button(*direction);
            serenity::CreateButton::new(shot_button_id(*direction, author))
                .label(label)
                .emoji(serenity::ReactionType::Unicode(emoji.to_string()))
                .style(serenity::ButtonStyle::Primary)
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("⚽ Daily Penalty - Choose Your Aim")
        .color(0x2ecc71)
        .description(
            "Pick your shot direction by pressing a button:\n\n```      🧍 Keeper\n   |   ⚽   |   \n```",
        )
        .footer(serenity::CreateEmbedFooter::new(
            "You only get 1 shot per day. Choose wisely!",
        ));

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(embed)
                .components(vec![serenity::CreateActionRow::Buttons(buttons)]),
        )
        .await?;
    let message = reply.message().await?;

    while let Some(interaction) = message
        .await_component_interaction(ctx.serenity_context().shard.clone())
        .timeout(AIM_TIMEOUT)
        .await
    {
        let Some((direction, owner)) = parse_shot_button(&interaction.data.custom_id) else {
            continue;
        };

        if interaction.user.id != owner {
            info!(
                "User {} pressed a penalty button belonging to {}",
                interaction.user.name, owner
            );
            if let Err(e) = interaction
                .create_response(
                    ctx.http(),
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(not_your_button_text())
                            .ephemeral(true),
                    ),
                )
                .await
            {
                error!(
                    "Failed to turn away {} from a penalty button: {}",
                    interaction.user.name, e
                );
            }
            continue;
        }

        let response = match ctx.data().penalty.shoot(&owner.to_string(), direction).await {
            Ok(outcome) => serenity::CreateInteractionResponseMessage::new()
                .embed(result_embed(&outcome))
                .components(vec![]),
            Err(e) => {
                if !e.is_user_facing() {
                    error!("Penalty shot failed for {}: {}", owner, e);
                }
                let text = if e.is_user_facing() {
                    format!("⛔ {}", e)
                } else {
                    "An error occurred. Please try again.".to_string()
                };
                serenity::CreateInteractionResponseMessage::new()
                    .content(text)
                    .embeds(vec![])
                    .components(vec![])
            }
        };

        if let Err(e) = interaction
            .create_response(
                ctx.http(),
                serenity::CreateInteractionResponse::UpdateMessage(response),
            )
            .await
        {
            error!("Failed to show penalty result: {}", e);
        }
        return Ok(());
    }

    // No valid press before the timeout
    reply
        .edit(
            ctx,
            poise::CreateReply::default()
                .content("⏱️ Time's up! Run `/penalty shoot` again to take your shot.")
                .components(vec![]),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_users_button_is_turned_away() {
        let owner = serenity::UserId::new(111);
        let id = shot_button_id(Direction::Left, owner);
        let (_, parsed_owner) = parse_shot_button(&id).unwrap();
        assert_ne!(parsed_owner, serenity::UserId::new(222));
        assert_eq!(not_your_button_text(), "⛔ This button isn't for you.");
    }

    #[test]
    fn test_button_id_round_trip() {
        let user = serenity::UserId::new(123456789012345678);
        let id = shot_button_id(Direction::Center, user);
        assert_eq!(id, "penalty_center_123456789012345678");
        assert_eq!(parse_shot_button(&id), Some((Direction::Center, user)));
    }

    #[test]
    fn test_parse_rejects_foreign_ids() {
        assert_eq!(parse_shot_button("config_global"), None);
        assert_eq!(parse_shot_button("penalty_up_1"), None);
        assert_eq!(parse_shot_button("penalty_left_abc"), None);
        assert_eq!(parse_shot_button("penalty_left_0"), None);
        assert_eq!(parse_shot_button("penalty_left"), None);
    }
}
