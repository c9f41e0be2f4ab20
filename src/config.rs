// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : config.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;
use clap::Parser;
use dotenvy::dotenv;

use crate::catalog::{Catalog, OpenItems};
use crate::error::ConfigError;
use crate::sync::RenderStyle;

pub const DEFAULT_TIMEZONE: &str = "Asia/Tashkent";
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Command-line overrides; anything not given falls back to env / `.env`.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "tally_bot", version, about = "Daily buy/sell tally with a live chat summary")]
pub struct Cli {
    /// HTTP listen port (env HTTP_PORT)
    #[arg(long)]
    pub port: Option<u16>,
    /// Directory for data_<date>.json files (env DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// telegram | log (env GATEWAY)
    #[arg(long)]
    pub gateway: Option<String>,
    /// IANA timezone, e.g. Asia/Tashkent (env TIMEZONE)
    #[arg(long)]
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelegramArgs {
    pub api_url: String,
    pub token: String,
    pub chat_id: i64,
}

/// Where the summary message goes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayMode {
    Telegram(TelegramArgs),
    /// dry run: text is only logged
    Log,
}

impl GatewayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayMode::Telegram(_) => "telegram",
            GatewayMode::Log => "log",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    pub http_port: u16,
    pub data_dir: PathBuf,
    pub tz_name: String,
    pub tz: Tz,
    pub catalog: Catalog,
    pub gateway: GatewayMode,
    pub style: RenderStyle,
}

pub fn load(cli: Cli) -> Result<Args, ConfigError> {
    // Pastikan .env dibaca (BOT_TOKEN, CHAT_ID, dll)
    let _ = dotenv();
    from_lookup(cli, |k| env::var(k).ok())
}

/// Resolve settings from CLI overrides plus a key lookup (env in production).
pub fn from_lookup<F>(cli: Cli, get: F) -> Result<Args, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    // ===== Basic =====
    let http_port = match cli.port {
        Some(p) => p,
        None => match get("HTTP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "HTTP_PORT", value: v })?,
            None => 8080,
        },
    };
    let data_dir = cli
        .data_dir
        .or_else(|| get("DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    // ===== Timezone =====
    let tz_name = cli
        .timezone
        .or_else(|| get("TIMEZONE"))
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let tz: Tz = tz_name
        .parse()
        .map_err(|e| ConfigError::Timezone(tz_name.clone(), format!("{e}")))?;

    // ===== Catalog =====
    let open = match get("OPEN_ITEMS") {
        Some(v) => OpenItems::parse(&v).ok_or(ConfigError::Invalid { key: "OPEN_ITEMS", value: v })?,
        None => OpenItems::Split,
    };
    let catalog = match get("CATALOG") {
        Some(list) => Catalog::parse(&list, open)?,
        None => Catalog::default_with(open),
    };

    // ===== Gateway =====
    let mode = cli
        .gateway
        .or_else(|| get("GATEWAY"))
        .unwrap_or_else(|| "telegram".to_string());
    let gateway = match mode.to_ascii_lowercase().as_str() {
        "log" | "dry_run" => GatewayMode::Log,
        "telegram" => {
            let token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
            let raw_chat = get("CHAT_ID").ok_or(ConfigError::Missing("CHAT_ID"))?;
            let chat_id = raw_chat
                .parse::<i64>()
                .map_err(|_| ConfigError::Invalid { key: "CHAT_ID", value: raw_chat })?;
            let api_url = get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string());
            GatewayMode::Telegram(TelegramArgs { api_url, token, chat_id })
        }
        _ => return Err(ConfigError::Invalid { key: "GATEWAY", value: mode }),
    };

    // ===== Message wording =====
    let mut style = RenderStyle::default();
    if let Some(t) = get("HEADER_TITLE") {
        style.header_title = t;
    }
    if let Some(t) = get("OPEN_TITLE") {
        style.open_title = t;
    }

    Ok(Args { http_port, data_dir, tz_name, tz, catalog, gateway, style })
}
