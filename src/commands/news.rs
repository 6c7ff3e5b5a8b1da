use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::state::news::{MAX_CONTENT_LEN, MAX_TITLE_LEN};
use crate::state::{NewsItem, NewsType};
use crate::{Context, Error};

/// Discord allows 25 fields per embed
const MAX_LIST_FIELDS: usize = 25;
const PREVIEW_LEN: usize = 100;

/// Allow users listed in ADMIN_IDS or members with the ADMINISTRATOR permission
pub async fn is_news_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let author = ctx.author();
    if ctx.data().settings.is_admin(&author.id.to_string()) {
        return Ok(true);
    }

    let has_admin = match ctx.author_member().await {
        Some(member) => member
            .permissions
            .map_or(false, |p| p.contains(serenity::Permissions::ADMINISTRATOR)),
        None => false,
    };

    if !has_admin {
        warn!("{} tried to manage news without permission", author.name);
        ctx.send(
            poise::CreateReply::default()
                .content("❌ You do not have permission to use this command.")
                .ephemeral(true),
        )
        .await?;
    }
    Ok(has_admin)
}

/// First `max` characters, with an ellipsis if anything was cut
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn news_field(item: &NewsItem) -> (String, String) {
    (
        format!("{} {}", item.news_type.emoji(), item.title),
        format!(
            "{}\n*{}*",
            item.content,
            item.date.format("%b %-d, %Y %H:%M UTC")
        ),
    )
}

/// View the latest game updates and news
#[poise::command(slash_command)]
pub async fn news(
    ctx: Context<'_>,
    #[description = "Page number to view"]
    #[min = 1]
    page: Option<u32>,
) -> Result<(), Error> {
    let page = ctx
        .data()
        .news
        .page(page.unwrap_or(1) as usize)
        .await?;

    if page.total == 0 {
        let embed = serenity::CreateEmbed::new()
            .title("📰 Game News")
            .description("No news available at the moment. Check back later!")
            .color(0x0014dc)
            .timestamp(serenity::Timestamp::now());
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("📰 Latest News")
        .description("Stay updated with the latest game updates, events, and announcements!")
        .color(0xffed00)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Page {}/{} • Total News: {}",
            page.page, page.total_pages, page.total
        )))
        .timestamp(serenity::Timestamp::now());

    for item in &page.items {
        let (name, value) = news_field(item);
        embed = embed.field(name, value, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Manage game news (Admin only)
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    subcommands("add", "remove", "list", "clear"),
    subcommand_required
)]
pub async fn managenews(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a new news article
#[poise::command(slash_command, check = "is_news_admin")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Type of news"]
    #[rename = "type"]
    kind: NewsType,
    #[description = "News title"]
    #[max_length = 100]
    title: String,
    #[description = "News content/description"]
    #[max_length = 1000]
    content: String,
) -> Result<(), Error> {
    if title.chars().count() > MAX_TITLE_LEN || content.chars().count() > MAX_CONTENT_LEN {
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "❌ Titles are limited to {} characters and content to {}.",
                    MAX_TITLE_LEN, MAX_CONTENT_LEN
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let author = ctx.author().name.clone();
    let item = ctx
        .data()
        .news
        .add(kind, &title, &content, Some(author.clone()))
        .await?;

    info!("{} published news #{}", author, item.id);

    let embed = serenity::CreateEmbed::new()
        .title("✅ News Article Created")
        .description("The news article has been successfully added!")
        .color(0x27ae60)
        .field("ID", format!("#{}", item.id), true)
        .field("Type", format!("{} {}", kind.emoji(), kind), true)
        .field("Title", &item.title, false)
        .field("Content", &item.content, false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Created by {}",
            author
        )))
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Remove a news article by ID
#[poise::command(slash_command, check = "is_news_admin")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "News ID to remove"]
    #[min = 1]
    id: u32,
) -> Result<(), Error> {
    let removed = ctx.data().news.remove(id).await?;

    let embed = serenity::CreateEmbed::new()
        .title("🗑️ News Article Removed")
        .description(format!("Successfully removed news article #{}", id))
        .color(0xe74c3c)
        .field("Title", &removed.title, false)
        .field("Content", &removed.content, false)
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List all news articles with IDs
#[poise::command(slash_command, check = "is_news_admin")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let items = ctx.data().news.list_all().await;

    if items.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("📰 No news articles found.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("📋 All News Articles")
        .description(format!("Total: {} article(s)", items.len()))
        .color(0x3498db)
        .timestamp(serenity::Timestamp::now());

    for item in items.iter().take(MAX_LIST_FIELDS) {
        embed = embed.field(
            format!("#{} - {} {}", item.id, item.news_type.emoji(), item.title),
            format!(
                "{}\n*{}*",
                preview(&item.content, PREVIEW_LEN),
                item.date.format("%b %-d, %Y")
            ),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Clear all news articles (use with caution!)
#[poise::command(slash_command, check = "is_news_admin")]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    let count = ctx.data().news.clear().await?;
    info!("{} cleared {} news article(s)", ctx.author().name, count);

    let embed = serenity::CreateEmbed::new()
        .title("🧹 News Cleared")
        .description(format!("Successfully removed {} news article(s).", count))
        .color(0xe67e22)
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
