use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub webapp: WebAppConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Base URL of the Bot API, without the `/bot<token>` suffix.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebAppConfig {
    #[serde(default = "default_webapp_url")]
    pub url: String,
    #[serde(default = "default_button_text")]
    pub button_text: String,
    #[serde(default = "default_start_text")]
    pub start_text: String,
    #[serde(default = "default_menu_text")]
    pub menu_text: String,
    /// Prefix of the acknowledgement sent when the web app posts data back
    /// (long-polling transport only).
    #[serde(default = "default_data_received_text")]
    pub data_received_text: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for WebAppConfig {
    fn default() -> Self {
        Self {
            url: default_webapp_url(),
            button_text: default_button_text(),
            start_text: default_start_text(),
            menu_text: default_menu_text(),
            data_received_text: default_data_received_text(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_webapp_url() -> String {
    "https://restaurant-mike.vercel.app/telegram-webapp.html".to_string()
}

fn default_button_text() -> String {
    "Открыть меню ресторана".to_string()
}

fn default_start_text() -> String {
    "Добро пожаловать в наш ресторан! Нажмите на кнопку ниже, чтобы открыть меню.".to_string()
}

fn default_menu_text() -> String {
    "Нажмите на кнопку ниже, чтобы открыть меню нашего ресторана.".to_string()
}

fn default_data_received_text() -> String {
    "Получены данные из WebApp: ".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply environment
    /// overrides and validate.
    ///
    /// An explicitly given `path` must exist. Without one, `config.toml` in the
    /// working directory is used when present; otherwise everything comes from
    /// defaults and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            ),
            None => std::fs::read_to_string("config.toml").ok(),
        };

        let mut config = match content {
            Some(content) => Self::parse(&content)?,
            None => Config::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override file values with environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(api_url) = get("TELEGRAM_API_URL") {
            self.telegram.api_url = api_url;
        }
        if let Some(url) = get("WEBAPP_URL") {
            self.webapp.url = url;
        }
        if let Some(addr) = get("BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "Telegram bot token is not configured (set TELEGRAM_BOT_TOKEN or [telegram] bot_token)"
            );
        }
        reqwest::Url::parse(&self.telegram.api_url)
            .with_context(|| format!("Invalid Telegram API URL: {}", self.telegram.api_url))?;
        reqwest::Url::parse(&self.webapp.url)
            .with_context(|| format!("Invalid web app URL: {}", self.webapp.url))?;
        if self.telegram.request_timeout_secs == 0 {
            anyhow::bail!("[telegram] request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.telegram.request_timeout_secs, 10);
        assert_eq!(
            config.webapp.url,
            "https://restaurant-mike.vercel.app/telegram-webapp.html"
        );
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(config.telegram.bot_token.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
[telegram]
bot_token = "123:abc"
request_timeout_secs = 3

[webapp]
url = "https://menu.example.com/app.html"
button_text = "Menu"

[server]
bind_address = "127.0.0.1:3000"
"#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.webapp.url, "https://menu.example.com/app.html");
        assert_eq!(config.webapp.button_text, "Menu");
        assert_eq!(config.webapp.start_text, default_start_text());
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::parse("[telegram]\nbot_token = \"from-file\"\n").unwrap();
        config.apply_env(env(&[
            ("TELEGRAM_BOT_TOKEN", "from-env"),
            ("WEBAPP_URL", "https://env.example.com/"),
            ("BIND_ADDRESS", "127.0.0.1:9000"),
        ]));
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.webapp.url, "https://env.example.com/");
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = Config::parse("[telegram]\nbot_token = \"from-file\"\n").unwrap();
        config.apply_env(env(&[("TELEGRAM_BOT_TOKEN", "  ")]));
        assert_eq!(config.telegram.bot_token, "from-file");
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_invalid_webapp_url_rejected() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".to_string();
        config.webapp.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".to_string();
        config.telegram.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".to_string();
        assert!(config.validate().is_ok());
    }
}
