//! Configuration system for Polish.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/polish/config.toml` and/or `.polish/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Placeholder substituted with the user's text in the prompt template.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Top-level configuration for Polish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolishConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl PolishConfig {
    /// Collect warnings from every section.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for w in self.server.validate() {
            warnings.push(format!("[server] {}", w));
        }
        for w in self.generation.validate() {
            warnings.push(format!("[generation] {}", w));
        }
        warnings
    }
}

/// Location of the local inference server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the server, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Path of the streaming generation endpoint.
    pub generate_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_path: "/api/generate".to_string(),
        }
    }
}

impl ServerConfig {
    /// Full URL of the generation endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.generate_path.trim_start_matches('/')
        )
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            warnings.push(format!(
                "base_url '{}' is not an http(s) URL",
                self.base_url
            ));
        }
        if self.generate_path.trim().is_empty() {
            warnings.push("generate_path is empty".to_string());
        }
        warnings
    }
}

/// What to ask the model for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model name as known to the server.
    pub model: String,
    /// Prompt sent to the model; `{input}` is replaced with the user's text.
    pub prompt_template: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            prompt_template: "rewrite and enhance the following text in a friendly and short way (only the text reply - without quotes): {input}".to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.trim().is_empty() {
            warnings.push("model is empty".to_string());
        }
        if !self.prompt_template.contains(INPUT_PLACEHOLDER) {
            warnings.push(format!(
                "prompt_template has no {} placeholder; the text will be appended",
                INPUT_PLACEHOLDER
            ));
        }
        warnings
    }
}

/// Terminal front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Whether to use ANSI colors.
    pub color: bool,
    /// Copy every completed result to the clipboard automatically.
    pub copy_on_complete: bool,
    /// Whether to keep a prompt history file in the workspace.
    pub history: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            color: true,
            copy_on_complete: false,
            history: true,
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "polish", "polish")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".polish").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `POLISH_`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.polish/config.toml`)
/// 4. User config (`~/.config/polish/config.toml`)
/// 5. Built-in defaults
///
/// CLI flags are applied by the caller on the returned value.
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<PolishConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(PolishConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (POLISH_GENERATION__MODEL, POLISH_SERVER__BASE_URL, etc.)
    figment = figment.merge(Env::prefixed("POLISH_").split("__"));

    Ok(figment.extract()?)
}

/// Check whether any Polish configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}
