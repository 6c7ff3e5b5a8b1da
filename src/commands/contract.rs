use poise::serenity_prelude as serenity;

use crate::config::{Pack, Player};
use crate::managers::{PackInfo, PullOutcome};
use crate::{Context, Error};

const TOP_PLAYERS: usize = 10;

/// Pack keys matching what the user has typed so far
async fn autocomplete_pack(ctx: Context<'_>, partial: &str) -> Vec<serenity::AutocompleteChoice> {
    let partial = partial.to_lowercase();
    ctx.data()
        .contracts
        .list_packs()
        .await
        .into_iter()
        .filter(|info| {
            info.pack.key.contains(&partial) || info.pack.name.to_lowercase().contains(&partial)
        })
        .map(|info| {
            serenity::AutocompleteChoice::new(
                format!("{} ({})", info.pack.name, info.pack.price_label()),
                info.pack.key,
            )
        })
        .collect()
}

fn pack_list_embed(packs: &[PackInfo]) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("eFutbal Contract System")
        .description("Choose a pack to pull from using the pack option.")
        .color(0x0099ff);

    for info in packs {
        let mut value = format!(
            "{}\nCost: **{}**",
            info.pack.description,
            info.pack.price_label()
        );
        if let Some(stock) = info.stock {
            value.push_str(&format!("\nStock: **{}/{}**", stock.remaining, stock.total));
        }
        embed = embed.field(
            format!("{} {}", info.pack.emoji(), info.pack.name),
            value,
            false,
        );
    }
    embed
}

fn pull_embed(outcome: &PullOutcome) -> serenity::CreateEmbed {
    let player = &outcome.player;
    let emoji = player.rarity.emoji();
    let footer = if outcome.duplicate {
        format!(
            "Duplicate! You received {} GP for selling the extra copy.",
            outcome.duplicate_gp
        )
    } else {
        "New player added to your collection!".to_string()
    };

    serenity::CreateEmbed::new()
        .title(format!("{} Contract Pull! {}", emoji, emoji))
        .description(format!(
            "You pulled **{}** from the {}!",
            player.name, outcome.pack_name
        ))
        .color(player.rarity.color())
        .field("Rarity", format!("{} {}", emoji, player.rarity), true)
        .field(
            "Overall",
            format!("📊 {} (max {})", player.overall, player.max_overall_or_base()),
            true,
        )
        .field("Position", format!("🎯 {}", player.position), true)
        .field(
            "Balance",
            format!(
                "💵 {} GP • 💰 {} eCoins",
                outcome.balances.gp, outcome.balances.e_coins
            ),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(footer))
}

/// Pull a new player from a contract pack
#[poise::command(slash_command)]
pub async fn contract(
    ctx: Context<'_>,
    #[description = "Choose a contract pack"]
    #[autocomplete = "autocomplete_pack"]
    pack: Option<String>,
) -> Result<(), Error> {
    let Some(pack_key) = pack else {
        let packs = ctx.data().contracts.list_packs().await;
        ctx.send(poise::CreateReply::default().embed(pack_list_embed(&packs)))
            .await?;
        return Ok(());
    };

    ctx.defer().await?;

    let user_id = ctx.author().id.to_string();
    let outcome = ctx.data().contracts.pull(&user_id, &pack_key).await?;

    ctx.send(poise::CreateReply::default().embed(pull_embed(&outcome)))
        .await?;
    Ok(())
}

fn chances_text(pack: &Pack) -> String {
    let mut entries: Vec<_> = pack
        .rarity_chances
        .entries()
        .iter()
        .filter(|(_, chance)| *chance > 0.0)
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));

    let lines: Vec<String> = entries
        .iter()
        .map(|(rarity, chance)| format!("{} {}: {:.1}%", rarity.emoji(), rarity, chance * 100.0))
        .collect();
    if lines.is_empty() {
        "-".to_string()
    } else {
        lines.join("\n")
    }
}

fn pack_info_embed(pack: &Pack, top: &[Player]) -> serenity::CreateEmbed {
    let top_lines: Vec<String> = top
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "#{} {} **{}** - {} - {} OVR",
                i + 1,
                p.rarity.emoji(),
                p.name,
                p.position,
                p.overall
            )
        })
        .collect();

    serenity::CreateEmbed::new()
        .title(&pack.name)
        .description(&pack.description)
        .color(0x8e44ad)
        .field("Cost", pack.price_label(), true)
        .field("Rarity Chances", chances_text(pack), true)
        .field(
            format!("Top {} Players", TOP_PLAYERS),
            if top_lines.is_empty() {
                "No players found.".to_string()
            } else {
                top_lines.join("\n")
            },
            false,
        )
}

/// Show odds and top players for contract packs
#[poise::command(slash_command, rename = "contract-info")]
pub async fn contract_info(
    ctx: Context<'_>,
    #[description = "Specific pack to show info for"]
    #[autocomplete = "autocomplete_pack"]
    pack: Option<String>,
) -> Result<(), Error> {
    let contracts = &ctx.data().contracts;

    let keys: Vec<String> = match pack {
        Some(key) => vec![key],
        None => contracts
            .list_packs()
            .await
            .into_iter()
            .map(|info| info.pack.key)
            .collect(),
    };

    let mut reply = poise::CreateReply::default();
    // Discord caps a message at 10 embeds
    for key in keys.iter().take(10) {
        let (pack, top) = contracts.top_players(key, TOP_PLAYERS).await?;
        reply = reply.embed(pack_info_embed(&pack, &top));
    }

    ctx.send(reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacksConfig;

    #[test]
    fn test_chances_text_sorted_and_skips_zero() {
        let packs = PacksConfig::default();
        let legend = packs.get("legend").unwrap();
        let text = chances_text(legend);

        assert!(!text.contains("White"));
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().next().unwrap().ends_with("Silver: 35.0%"));
        assert!(text.lines().last().unwrap().ends_with("Legend: 5.0%"));
    }
}
