//! Data models and configuration
//!
//! Defines the request options, chat transcript types and environment-driven
//! configuration shared by the Gemini clients and the studio.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "16:9" | "landscape" => Ok(Self::Landscape),
            "9:16" | "portrait" => Ok(Self::Portrait),
            other => Err(Error::InvalidRequest(format!(
                "Unsupported aspect ratio '{}'. Expected 16:9 or 9:16",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hd => "720p",
            Self::FullHd => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability/cost tier a chat session is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatModel {
    #[default]
    Flash,
    Pro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PRO_CHAT_MODEL: &str = "gemini-2.5-pro";

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: Option<String>,
    pub image_model: String,
    pub video_model: String,
    pub chat_model: String,
    pub pro_chat_model: String,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub poll_retries: usize,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        check_env_file(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let secs = |key: &str, default: u64| -> Result<Duration> {
            match var(key) {
                Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    Error::Config(format!("{} must be a whole number of seconds, got '{}'", key, raw))
                }),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let poll_interval = secs("VIDEO_POLL_INTERVAL_SECS", 10)?;
        let max_wait = secs("VIDEO_MAX_WAIT_SECS", 600)?;
        if poll_interval.is_zero() {
            return Err(Error::Config(
                "VIDEO_POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let poll_retries = match var("VIDEO_POLL_RETRIES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("VIDEO_POLL_RETRIES must be a number, got '{}'", raw))
            })?,
            None => 2,
        };

        Ok(Self {
            api_key,
            base_url: var("GEMINI_BASE_URL"),
            image_model: var("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            video_model: var("VIDEO_MODEL").unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            chat_model: var("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            pro_chat_model: var("PRO_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_PRO_CHAT_MODEL.to_string()),
            poll_interval,
            max_wait,
            poll_retries,
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
        })
    }

    pub fn chat_model_id(&self, model: ChatModel) -> &str {
        match model {
            ChatModel::Flash => &self.chat_model,
            ChatModel::Pro => &self.pro_chat_model,
        }
    }
}

/// A missing `.env` is fine; one that exists but cannot be parsed is not.
fn check_env_file<T>(loaded: dotenvy::Result<T>) -> Result<()> {
    match loaded {
        Err(e) if !e.not_found() => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();

        assert_eq!(config.api_key, "k");
        assert_eq!(config.base_url, None);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.video_model, DEFAULT_VIDEO_MODEL);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.max_wait, Duration::from_secs(600));
        assert_eq!(config.poll_retries, 2);
        assert_eq!(config.chat_model_id(ChatModel::Flash), DEFAULT_CHAT_MODEL);
        assert_eq!(config.chat_model_id(ChatModel::Pro), DEFAULT_PRO_CHAT_MODEL);
    }

    #[test]
    fn test_config_falls_back_to_api_key() {
        let config = Config::from_lookup(lookup(&[("API_KEY", "legacy")])).unwrap();
        assert_eq!(config.api_key, "legacy");
    }

    #[test]
    fn test_config_requires_key() {
        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("VIDEO_POLL_INTERVAL_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("VIDEO_POLL_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_env_file(dotenvy::from_path(dir.path().join(".env"))).is_ok());
    }

    #[test]
    fn test_malformed_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "NOT VALID AT ALL\n").unwrap();

        let err = check_env_file(dotenvy::from_path(&path)).unwrap_err();
        assert!(matches!(err, Error::EnvVar(_)));
    }

    #[test]
    fn test_aspect_ratio_parsing() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert_eq!("Portrait".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert!("4:3".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_chat_turn_serialization() {
        let turn = ChatTurn::model("Done!");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"model","text":"Done!"}"#);
    }
}
