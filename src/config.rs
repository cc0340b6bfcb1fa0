use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use time::{macros::format_description, Time};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PIXABAY_BASE_URL: &str = "https://pixabay.com/api/";

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// `None` disables every generation-backed feature.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PixabayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// UTC wall-clock time of the daily plan run.
    pub run_at: Time,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub gemini: GeminiConfig,
    pub pixabay: PixabayConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let gemini = GeminiConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.into()),
            timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        let pixabay = PixabayConfig {
            api_key: non_empty_var("PIXABAY_KEY"),
            base_url: std::env::var("PIXABAY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PIXABAY_BASE_URL.into()),
        };
        let scheduler = SchedulerConfig {
            enabled: std::env::var("DAILY_PLAN_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            run_at: parse_run_at(
                &std::env::var("DAILY_PLAN_AT").unwrap_or_else(|_| "12:00".into()),
            )?,
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8000),
            gemini,
            pixabay,
            scheduler,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an `HH:MM` time of day.
pub fn parse_run_at(raw: &str) -> anyhow::Result<Time> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .with_context(|| format!("DAILY_PLAN_AT must be HH:MM, got {raw:?}"))
}
