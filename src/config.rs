use crate::error::{ProxyError, Result};
use crate::translate::normalize::ThinkTagsMode;
use crate::upstream::DEFAULT_UPSTREAM_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_stream")]
    pub default_stream: bool,
    #[serde(default)]
    pub think_tags_mode: ThinkTagsMode,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub url: String,
}

/// Fixed-key mode is on only when both values are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_token: Option<String>,
}

fn default_port() -> u16 {
    8787
}

fn default_stream() -> bool {
    true
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            debug_mode: false,
            default_stream: default_stream(),
            think_tags_mode: ThinkTagsMode::default(),
            upstream: UpstreamConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir. With no file
    /// anywhere, the defaults are used and the environment does the rest.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PORT`, `UPSTREAM_URL`, `DEBUG_MODE`, `DEFAULT_STREAM`,
    /// `THINK_TAGS_MODE`, `DEFAULT_KEY` and `UPSTREAM_TOKEN`.
    /// Empty values count as unset.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .map_err(|_| ProxyError::config(format!("Invalid PORT value '{port}'")))?;
        }
        if let Some(url) = var("UPSTREAM_URL") {
            self.upstream.url = url;
        }
        if let Some(debug) = var("DEBUG_MODE") {
            self.debug_mode = debug == "true";
        }
        if let Some(stream) = var("DEFAULT_STREAM") {
            self.default_stream = stream == "true";
        }
        if let Some(mode) = var("THINK_TAGS_MODE") {
            self.think_tags_mode = mode.parse()?;
        }
        if let Some(key) = var("DEFAULT_KEY") {
            self.auth.default_key = Some(key);
        }
        if let Some(token) = var("UPSTREAM_TOKEN") {
            self.auth.upstream_token = Some(token);
        }

        Ok(())
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("zai-proxy.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = dirs_path() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("zai-proxy")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("zai-proxy").join("config.toml"));
        }
        if let Some(home) = dirs_path() {
            paths.push(home.join(".config").join("zai-proxy").join("config.toml"));
        }
    }

    // Home directory fallback
    if let Some(home) = dirs_path() {
        paths.push(home.join(".zai-proxy.toml"));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000
debug_mode = true
default_stream = false
think_tags_mode = "strip"

[upstream]
url = "http://localhost:9000/api/chat/completions"

[auth]
default_key = "sk-shared"
upstream_token = "tok"
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert!(config.debug_mode);
        assert!(!config.default_stream);
        assert_eq!(config.upstream.url, "http://localhost:9000/api/chat/completions");
        assert_eq!(config.auth.default_key.as_deref(), Some("sk-shared"));
        assert_eq!(config.auth.upstream_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 8787);
        assert!(!config.debug_mode);
        assert!(config.default_stream);
        assert_eq!(config.think_tags_mode, ThinkTagsMode::Strip);
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
        assert!(config.auth.default_key.is_none());
    }

    #[test]
    fn test_unknown_think_tags_mode_in_file_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, r#"think_tags_mode = "raw""#).unwrap();
        assert!(ProxyConfig::load(f.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ProxyConfig::default();
        config
            .apply_env_overrides(env(&[
                ("PORT", "9999"),
                ("UPSTREAM_URL", "http://example.test/chat"),
                ("DEBUG_MODE", "true"),
                ("DEFAULT_STREAM", "false"),
                ("THINK_TAGS_MODE", "strip"),
                ("DEFAULT_KEY", "sk-a"),
                ("UPSTREAM_TOKEN", "tok-b"),
            ]))
            .unwrap();

        assert_eq!(config.port, 9999);
        assert_eq!(config.upstream.url, "http://example.test/chat");
        assert!(config.debug_mode);
        assert!(!config.default_stream);
        assert_eq!(config.auth.default_key.as_deref(), Some("sk-a"));
        assert_eq!(config.auth.upstream_token.as_deref(), Some("tok-b"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = ProxyConfig::default();
        config
            .apply_env_overrides(env(&[("UPSTREAM_URL", ""), ("DEFAULT_KEY", "")]))
            .unwrap();
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
        assert!(config.auth.default_key.is_none());
    }

    #[test]
    fn test_flags_only_enable_on_literal_true() {
        let mut config = ProxyConfig::default();
        config
            .apply_env_overrides(env(&[("DEBUG_MODE", "yes"), ("DEFAULT_STREAM", "1")]))
            .unwrap();
        assert!(!config.debug_mode);
        assert!(!config.default_stream);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = ProxyConfig::default();
        assert!(config.apply_env_overrides(env(&[("PORT", "http")])).is_err());
        assert!(config
            .apply_env_overrides(env(&[("THINK_TAGS_MODE", "keep")]))
            .is_err());
    }

    #[test]
    fn test_search_paths_start_with_cwd() {
        let paths = config_search_paths();
        assert_eq!(paths[0], PathBuf::from("zai-proxy.toml"));
    }
}
