//! Ollama client configuration.

/// Configuration for the Ollama client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Default model to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Controls how long the model stays loaded in memory (e.g., "5m", "0" to unload immediately).
    pub keep_alive: Option<String>,
}

impl OllamaConfig {
    /// Default Ollama API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3";
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration with a specific model.
    #[must_use]
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `OLLAMA_BASE_URL` - Optional base URL
    /// - `OLLAMA_MODEL` - Optional default model
    /// - `OLLAMA_KEEP_ALIVE` - Optional keep alive duration
    /// - `OLLAMA_TIMEOUT_SECS` - Optional request timeout; `0` disables it
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("OLLAMA_BASE_URL")
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_owned());
        let model = non_empty("OLLAMA_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_owned());
        let keep_alive = non_empty("OLLAMA_KEEP_ALIVE");
        let timeout_secs = match non_empty("OLLAMA_TIMEOUT_SECS").map(|v| v.trim().parse::<u64>())
        {
            Some(Ok(0)) => None,
            Some(Ok(secs)) => Some(secs),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "ignoring invalid OLLAMA_TIMEOUT_SECS");
                Some(Self::DEFAULT_TIMEOUT_SECS)
            }
            None => Some(Self::DEFAULT_TIMEOUT_SECS),
        };

        Self {
            base_url,
            model,
            timeout_secs,
            keep_alive,
        }
        .normalized()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self.normalized()
    }

    /// Sets the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Removes the request timeout.
    #[must_use]
    pub const fn no_timeout(mut self) -> Self {
        self.timeout_secs = None;
        self
    }

    /// Sets the keep alive duration.
    #[must_use]
    pub fn keep_alive(mut self, duration: impl Into<String>) -> Self {
        self.keep_alive = Some(duration.into());
        self
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.len() != self.base_url.len() {
            self.base_url = trimmed.to_owned();
        }
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
            keep_alive: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> OllamaConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        OllamaConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout_secs, Some(300));
        assert!(config.keep_alive.is_none());
        assert_eq!(lookup(&[]), config);
    }

    #[test]
    fn reads_environment() {
        let config = lookup(&[
            ("OLLAMA_BASE_URL", "http://gpu-box:11434/"),
            ("OLLAMA_MODEL", "mistral"),
            ("OLLAMA_KEEP_ALIVE", "5m"),
            ("OLLAMA_TIMEOUT_SECS", "30"),
        ]);
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.keep_alive.as_deref(), Some("5m"));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn timeout_parsing() {
        assert_eq!(lookup(&[("OLLAMA_TIMEOUT_SECS", "0")]).timeout_secs, None);
        assert_eq!(
            lookup(&[("OLLAMA_TIMEOUT_SECS", "soon")]).timeout_secs,
            Some(OllamaConfig::DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn blank_values_fall_back() {
        let config = lookup(&[("OLLAMA_MODEL", "  "), ("OLLAMA_BASE_URL", "")]);
        assert_eq!(config.model, OllamaConfig::DEFAULT_MODEL);
        assert_eq!(config.base_url, OllamaConfig::DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_strips_trailing_slashes() {
        let config = OllamaConfig::with_model("phi3")
            .base_url("http://server:11434//")
            .timeout(60)
            .keep_alive("0");
        assert_eq!(config.base_url, "http://server:11434");
        assert_eq!(config.model, "phi3");
        assert_eq!(config.timeout_secs, Some(60));
        assert_eq!(config.no_timeout().timeout_secs, None);
    }
}
