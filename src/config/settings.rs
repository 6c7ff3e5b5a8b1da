use std::collections::HashSet;

/// Process-wide settings read from the environment (.env is loaded first)
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base directory for packs.json, players.json, news.json and user files
    pub data_path: String,

    /// Discord user IDs allowed to manage news and read logs
    pub admin_ids: HashSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: "data".to_string(),
            admin_ids: HashSet::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("DATA_PATH").unwrap_or_else(|_| "data".to_string()),
            admin_ids: std::env::var("ADMIN_IDS")
                .map(|s| parse_admin_ids(&s))
                .unwrap_or_default(),
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.contains(user_id)
    }

    pub fn users_dir(&self) -> String {
        format!("{}/users", self.data_path)
    }

    pub fn packs_path(&self) -> String {
        format!("{}/packs.json", self.data_path)
    }

    pub fn players_path(&self) -> String {
        format!("{}/players.json", self.data_path)
    }

    pub fn pack_limits_path(&self) -> String {
        format!("{}/pack_limits.json", self.data_path)
    }

    pub fn news_path(&self) -> String {
        format!("{}/news.json", self.data_path)
    }
}

fn parse_admin_ids(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        let ids = parse_admin_ids(" 123, 456 ,,789");
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("456"));
    }

    #[test]
    fn test_paths() {
        let settings = Settings {
            data_path: "/srv/game".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.users_dir(), "/srv/game/users");
        assert_eq!(settings.news_path(), "/srv/game/news.json");
        assert!(!settings.is_admin("1"));
    }
}
