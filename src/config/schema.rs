use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-user data directory under `$HOME`.
const DATA_DIR_NAME: &str = ".lexgate";

// ── Provider ─────────────────────────────────────────────────────

/// Which text-generation backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini REST API.
    Gemini,
    /// Local Ollama server.
    Ollama,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    pub fn from_str_lossy(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "ollama" | "local" => Some(Self::Ollama),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,
    /// Model used by every workflow node.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// API key (Gemini only). Usually supplied through the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for the provider endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout for generation and embedding calls.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_provider_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            temperature: default_temperature(),
            api_key: None,
            base_url: None,
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

// ── Workflow ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Shared retry budget for ambiguous queries and rejected answers.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Hard ceiling on node executions per query.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_steps() -> u32 {
    32
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_steps: default_max_steps(),
        }
    }
}

// ── Retrieval ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// SQLite file holding chunks and their embeddings. `~` is expanded.
    #[serde(default = "default_index_path")]
    pub index_path: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Embedding model; `None` picks the provider's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

fn default_index_path() -> String {
    format!("~/{DATA_DIR_NAME}/index.db")
}

fn default_top_k() -> usize {
    4
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_model: None,
        }
    }
}

impl RetrievalConfig {
    /// Index path with `~` and environment variables expanded. An unset
    /// variable leaves the path with only `~` expanded.
    pub fn resolved_index_path(&self) -> PathBuf {
        let expanded = shellexpand::full(&self.index_path).unwrap_or_else(|e| {
            tracing::warn!(path = %self.index_path, "Could not expand index path: {e}");
            shellexpand::tilde(&self.index_path)
        });
        PathBuf::from(expanded.into_owned())
    }
}

// ── Web ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Page scraped by the web responder.
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_web_timeout_secs")]
    pub timeout_secs: u64,
    /// Characters of page text passed to the model.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_source_url() -> String {
    "https://www.livelaw.in/top-stories".into()
}

fn default_web_timeout_secs() -> u64 {
    8
}

fn default_max_chars() -> usize {
    3000
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            timeout_secs: default_web_timeout_secs(),
            max_chars: default_max_chars(),
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    3000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

// ── Root ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where this config was loaded from. Not serialized.
    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// `~/.lexgate`.
    pub fn data_dir() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(DATA_DIR_NAME))
    }

    /// Load `~/.lexgate/config.toml`, writing defaults if it does not exist,
    /// then apply environment overrides and validate.
    pub fn load_or_init() -> Result<Self> {
        let path = Self::data_dir()?.join("config.toml");
        Self::load_or_init_at(&path)
    }

    pub fn load_or_init_at(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            tracing::info!(path = %path.display(), "Wrote default config");
            config
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write config: {}", self.config_path.display()))?;
        Ok(())
    }

    /// Environment wins over the file for provider settings.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(kind) = non_empty("LEXGATE_PROVIDER") {
            match ProviderKind::from_str_lossy(&kind) {
                Some(kind) => self.provider.kind = kind,
                None => tracing::warn!(value = %kind, "Ignoring unknown LEXGATE_PROVIDER"),
            }
        }
        if let Some(model) = non_empty("LEXGATE_MODEL") {
            self.provider.model = model;
        }
        if let Some(key) = non_empty("LEXGATE_API_KEY")
            .or_else(|| non_empty("GEMINI_API_KEY"))
            .or_else(|| non_empty("GOOGLE_API_KEY"))
        {
            self.provider.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            anyhow::bail!("provider.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!(
                "provider.temperature must be between 0.0 and 2.0 (got {})",
                self.provider.temperature
            );
        }
        if self.provider.timeout_secs == 0 || self.web.timeout_secs == 0 {
            anyhow::bail!("timeouts must be at least 1 second");
        }
        if self.workflow.max_steps == 0 {
            anyhow::bail!("workflow.max_steps must be at least 1");
        }
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be at least 1");
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            anyhow::bail!(
                "retrieval.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.retrieval.chunk_overlap,
                self.retrieval.chunk_size
            );
        }
        if self.web.max_chars == 0 {
            anyhow::bail!("web.max_chars must be at least 1");
        }
        Ok(())
    }
}
