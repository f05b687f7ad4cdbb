use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::specialist::Specialist;

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_collection() -> String {
    "deals".to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_similar_deal_limit() -> usize {
    5
}

fn default_similar_content_chars() -> usize {
    500
}

fn default_explainer_similar_deals() -> usize {
    3
}

fn default_coach_specialists() -> Vec<Specialist> {
    Specialist::COACH_PANEL.to_vec()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub agents: AgentSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// Managed vector database. Absent means only the local fallback is used.
    #[serde(default)]
    pub chroma_url: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        VectorStoreConfig {
            chroma_url: None,
            collection: default_collection(),
            cache_path: None,
        }
    }
}

impl VectorStoreConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| Config::get_config_dir().join("embeddings.sqlite"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSettings {
    /// Ceiling on generation attempts in the critique-refine loops.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_similar_deal_limit")]
    pub similar_deal_limit: usize,
    #[serde(default = "default_similar_content_chars")]
    pub similar_content_chars: usize,
    #[serde(default = "default_explainer_similar_deals")]
    pub explainer_similar_deals: usize,
    /// Specialists consulted by the deal coach, in synthesis order.
    #[serde(default = "default_coach_specialists")]
    pub coach_specialists: Vec<Specialist>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            max_attempts: default_max_attempts(),
            similar_deal_limit: default_similar_deal_limit(),
            similar_content_chars: default_similar_content_chars(),
            explainer_similar_deals: default_explainer_similar_deals(),
            coach_specialists: default_coach_specialists(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut config = if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => config,
                    Err(e) => {
                        log::warn!("Error parsing {}: {}. Using defaults.", config_path.display(), e);
                        Config::default()
                    }
                },
                Err(e) => {
                    log::warn!("Error reading {}: {}. Using defaults.", config_path.display(), e);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Some(key) = env_non_empty("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(model) = env_non_empty("CRM_COACH_MODEL") {
            self.openai.model = model;
        }
        if let Some(url) = env_non_empty("CHROMA_DB_URL") {
            self.vector_store.chroma_url = Some(url);
        }
    }

    /// Problems that make the AI features unusable, empty when the setup is complete.
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.openai.api_key.trim().is_empty() {
            issues.push("OpenAI API key is not configured".to_string());
        }
        if self.agents.max_attempts == 0 {
            issues.push("agents.max_attempts must be at least 1".to_string());
        }
        if self.agents.coach_specialists.is_empty() {
            issues.push("agents.coach_specialists must name at least one specialist".to_string());
        }
        for (i, specialist) in self.agents.coach_specialists.iter().enumerate() {
            if !Specialist::COACH_PANEL.contains(specialist) {
                issues.push(format!("{} cannot sit on the deal coach panel", specialist));
            } else if self.agents.coach_specialists[..i].contains(specialist) {
                issues.push(format!("{} is listed twice on the deal coach panel", specialist));
            }
        }
        issues
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/crm-coach")
        } else {
            PathBuf::from(".")
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
