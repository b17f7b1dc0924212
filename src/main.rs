mod bot;
mod config;
mod platform;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;

const USAGE: &str = "usage: menubot [serve|poll|set-webhook <url>|webhook-info] [--config <path>]";

#[derive(Debug, PartialEq)]
enum Mode {
    Serve,
    Poll,
    SetWebhook(String),
    WebhookInfo,
}

#[derive(Debug, PartialEq)]
struct Args {
    mode: Mode,
    config_path: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config requires a path")?;
            config_path = Some(PathBuf::from(path));
        } else {
            positional.push(arg.as_str());
        }
    }

    let mode = match positional.as_slice() {
        [] | ["serve"] => Mode::Serve,
        ["poll"] => Mode::Poll,
        ["webhook-info"] => Mode::WebhookInfo,
        ["set-webhook", url] => Mode::SetWebhook(url.to_string()),
        _ => anyhow::bail!("{}", USAGE),
    };

    Ok(Args { mode, config_path })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,menubot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let config = Config::load(args.config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Web app: {}", config.webapp.url);
    info!("  Bot API: {}", config.telegram.api_url);

    let state = Arc::new(AppState::new(config)?);

    match args.mode {
        Mode::Serve => platform::webhook::run(state).await?,
        Mode::Poll => platform::polling::run(state).await?,
        Mode::SetWebhook(url) => {
            let result = state.telegram.set_webhook(&url).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Mode::WebhookInfo => {
            let result = state.telegram.webhook_info().await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        let owned: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        parse_args(&owned)
    }

    #[test]
    fn test_default_mode_is_serve() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.mode, Mode::Serve);
        assert!(parsed.config_path.is_none());
    }

    #[test]
    fn test_config_flag_anywhere() {
        let parsed = args(&["--config", "bot.toml", "poll"]).unwrap();
        assert_eq!(parsed.mode, Mode::Poll);
        assert_eq!(parsed.config_path, Some(PathBuf::from("bot.toml")));
    }

    #[test]
    fn test_set_webhook_takes_url() {
        let parsed = args(&["set-webhook", "https://example.com/hook"]).unwrap();
        assert_eq!(
            parsed.mode,
            Mode::SetWebhook("https://example.com/hook".to_string())
        );
    }

    #[test]
    fn test_unknown_or_incomplete_args_rejected() {
        assert!(args(&["set-webhook"]).is_err());
        assert!(args(&["launch"]).is_err());
        assert!(args(&["--config"]).is_err());
    }
}
