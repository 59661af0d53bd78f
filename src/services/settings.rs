use anyhow::Result;

use super::database::Database;

const THEME_KEY: &str = "shopwise-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// ANSI colour used for highlights: links, inline code, the assistant label.
    pub fn accent(&self) -> &'static str {
        match self {
            Theme::Dark => "\x1b[36m",
            Theme::Light => "\x1b[34m",
        }
    }

    pub fn muted(&self) -> &'static str {
        match self {
            Theme::Dark => "\x1b[90m",
            Theme::Light => "\x1b[2m",
        }
    }
}

pub struct SettingsService;

impl SettingsService {
    pub async fn load_theme(db: &Database) -> Theme {
        match db.get_setting(THEME_KEY).await {
            Ok(Some(value)) => Theme::from_str(&value).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!("Failed to read theme preference: {}", e);
                Theme::default()
            }
        }
    }

    pub async fn save_theme(db: &Database, theme: Theme) -> Result<()> {
        db.set_setting(THEME_KEY, theme.as_str()).await
    }
}
