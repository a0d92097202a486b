use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub tavily_api_key: String,
    pub output_dir: PathBuf,
    pub results_num: u32,
    pub dedupe_urls: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let results_num = lookup("RESULTS_NUM")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u32>()
            .context("RESULTS_NUM must be a positive integer")?;
        ensure!(results_num >= 1, "RESULTS_NUM must be at least 1");

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            tavily_api_key: require("TAVILY_API_KEY")?,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./ai-agent-output")),
            results_num,
            dedupe_urls: lookup("DEDUPE_URLS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            port: lookup("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
