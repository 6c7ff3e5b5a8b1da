use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{BotError, Result};

pub const NEWS_PER_PAGE: usize = 5;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_CONTENT_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum NewsType {
    #[name = "🔄 Update"]
    Update,
    #[name = "🎉 Event"]
    Event,
    #[name = "🔧 Maintenance"]
    Maintenance,
    #[name = "📢 Announcement"]
    Announcement,
    #[name = "✨ New Feature"]
    Feature,
    #[name = "🐛 Bug Fix"]
    Bugfix,
}

impl NewsType {
    pub fn emoji(&self) -> &'static str {
        match self {
            NewsType::Update => "🔄",
            NewsType::Event => "🎉",
            NewsType::Maintenance => "🔧",
            NewsType::Announcement => "📢",
            NewsType::Feature => "✨",
            NewsType::Bugfix => "🐛",
        }
    }
}

impl fmt::Display for NewsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NewsType::Update => "update",
            NewsType::Event => "event",
            NewsType::Maintenance => "maintenance",
            NewsType::Announcement => "announcement",
            NewsType::Feature => "feature",
            NewsType::Bugfix => "bugfix",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: u32,
    #[serde(rename = "type")]
    pub news_type: NewsType,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NewsFile {
    #[serde(default)]
    news: Vec<NewsItem>,
}

/// One page of news, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPage {
    pub items: Vec<NewsItem>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Admin-authored news, persisted to data/news.json
pub struct NewsStore {
    path: String,
    items: RwLock<Vec<NewsItem>>,
}

impl NewsStore {
    /// Load from a JSON file, or start empty if it does not exist
    pub async fn load(path: &str) -> Result<Self> {
        let items = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let file: NewsFile =
                    serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                        path: path.to_string(),
                        source: e,
                    })?;
                file.news
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(BotError::StateLoad {
                    path: path.to_string(),
                    source: e,
                })
            }
        };

        Ok(Self {
            path: path.to_string(),
            items: RwLock::new(items),
        })
    }

    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            items: RwLock::new(Vec::new()),
        }
    }

    async fn persist(&self, items: &[NewsItem]) -> Result<()> {
        let file = NewsFile {
            news: items.to_vec(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = std::path::Path::new(&self.path).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let temp_path = format!("{}.tmp", self.path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: self.path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::StateSave {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(())
    }

    /// All news, newest first
    pub async fn list_all(&self) -> Vec<NewsItem> {
        let mut items = self.items.read().await.clone();
        items.sort_by(|a, b| b.date.cmp(&a.date));
        items
    }

    /// A 1-based page of news, newest first
    pub async fn page(&self, page: usize) -> Result<NewsPage> {
        let all = self.list_all().await;
        let total = all.len();
        let total_pages = total.div_ceil(NEWS_PER_PAGE);
        let page = page.max(1);

        if total == 0 {
            return Ok(NewsPage {
                items: Vec::new(),
                page,
                total_pages,
                total,
            });
        }
        if page > total_pages {
            return Err(BotError::InvalidPage { total_pages });
        }

        let items = all
            .into_iter()
            .skip((page - 1) * NEWS_PER_PAGE)
            .take(NEWS_PER_PAGE)
            .collect();

        Ok(NewsPage {
            items,
            page,
            total_pages,
            total,
        })
    }

    pub async fn add(
        &self,
        news_type: NewsType,
        title: &str,
        content: &str,
        author: Option<String>,
    ) -> Result<NewsItem> {
        if title.trim().is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(BotError::ConfigValidation {
                message: format!("title must be 1-{} characters", MAX_TITLE_LEN),
            });
        }
        if content.trim().is_empty() || content.chars().count() > MAX_CONTENT_LEN {
            return Err(BotError::ConfigValidation {
                message: format!("content must be 1-{} characters", MAX_CONTENT_LEN),
            });
        }

        let mut items = self.items.write().await;
        let id = items.iter().map(|n| n.id).max().map_or(1, |max| max + 1);
        let item = NewsItem {
            id,
            news_type,
            title: title.to_string(),
            content: content.to_string(),
            date: Utc::now(),
            author,
        };

        let mut updated = items.clone();
        updated.push(item.clone());
        self.persist(&updated).await?;
        *items = updated;

        info!("News #{} '{}' added", item.id, item.title);
        Ok(item)
    }

    pub async fn remove(&self, id: u32) -> Result<NewsItem> {
        let mut items = self.items.write().await;
        let index = items
            .iter()
            .position(|n| n.id == id)
            .ok_or(BotError::NewsNotFound { id })?;

        let mut updated = items.clone();
        let removed = updated.remove(index);
        self.persist(&updated).await?;
        *items = updated;

        info!("News #{} removed", id);
        Ok(removed)
    }

    /// Remove every article, returning how many there were
    pub async fn clear(&self) -> Result<usize> {
        let mut items = self.items.write().await;
        let count = items.len();
        self.persist(&[]).await?;
        items.clear();

        info!("Cleared {} news article(s)", count);
        Ok(count)
    }
}

/// Shared news store type
pub type SharedNewsStore = Arc<NewsStore>;
