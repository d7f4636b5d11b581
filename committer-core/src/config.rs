// configuration - toml file, environment and cli overrides resolved into one settings value

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::ai::Provider;
use crate::error::ConfigError;
use crate::splitter::{ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_ENCODING};

/// diffs up to this many characters are sent whole
pub const DEFAULT_CHUNK_THRESHOLD: usize = 128_000;

/// default bound on a single llm call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";

/// contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub chunk_threshold: Option<usize>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub encoding: Option<String>,
    pub endpoints: EndpointConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub ollama: Option<String>,
    pub openrouter: Option<String>,
}

/// values given on the command line; `None` means "not passed"
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
    pub chunk_threshold: Option<usize>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub encoding: Option<String>,
}

/// base urls for each provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub openai: String,
    pub anthropic: String,
    pub ollama: String,
    pub openrouter: String,
}

/// fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    pub timeout: Duration,
    pub chunk_threshold: usize,
    pub chunk: ChunkConfig,
    pub endpoints: Endpoints,
}

impl Settings {
    /// layer cli overrides over the environment over the config file over defaults
    pub fn resolve(
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let provider = match overrides.provider {
            Some(provider) => provider,
            None => match env("COMMITTER_PROVIDER").filter(|name| !name.trim().is_empty()) {
                Some(name) => {
                    Provider::from_name(&name).ok_or(ConfigError::InvalidProvider(name))?
                }
                None => file.provider.unwrap_or_default(),
            },
        };

        let model = overrides
            .model
            .clone()
            .or_else(|| env("COMMITTER_MODEL"))
            .or(file.model)
            .unwrap_or_else(|| provider.default_model().to_string());

        let timeout = overrides
            .timeout
            .or(file.timeout_secs.map(Duration::from_secs))
            .unwrap_or(DEFAULT_TIMEOUT);

        let chunk = ChunkConfig::new(
            overrides
                .chunk_size
                .or(file.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            overrides
                .chunk_overlap
                .or(file.chunk_overlap)
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            overrides
                .encoding
                .clone()
                .or(file.encoding)
                .unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
        )?;

        let endpoints = Endpoints {
            openai: file
                .endpoints
                .openai
                .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            anthropic: file
                .endpoints
                .anthropic
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_ENDPOINT.to_string()),
            ollama: env("OLLAMA_HOST")
                .or(file.endpoints.ollama)
                .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
            openrouter: file
                .endpoints
                .openrouter
                .unwrap_or_else(|| DEFAULT_OPENROUTER_ENDPOINT.to_string()),
        };

        Ok(Self {
            provider,
            model,
            timeout,
            chunk_threshold: overrides
                .chunk_threshold
                .or(file.chunk_threshold)
                .unwrap_or(DEFAULT_CHUNK_THRESHOLD),
            chunk,
            endpoints,
        })
    }
}

/// where the config file lives: explicit path, `$COMMITTER_CONFIG`, then the user config dir
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os("COMMITTER_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("committer").join("config.toml"))
}

/// read and parse a config file; a missing file yields the empty config
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(FileConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// parse `15s`, `2m`, `500ms`; a bare number is seconds
pub fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let raw = raw.trim();
    let parsed = match raw.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(raw),
    };

    match parsed {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SplitError;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::resolve(&Overrides::default(), no_env, FileConfig::default()).unwrap();
        assert_eq!(settings.provider, Provider::OpenAi);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.timeout, Duration::from_secs(15));
        assert_eq!(settings.chunk_threshold, 128_000);
        assert_eq!(settings.chunk, ChunkConfig::default());
        assert_eq!(settings.endpoints.ollama, DEFAULT_OLLAMA_ENDPOINT);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file: FileConfig = toml::from_str(
            r#"
            provider = "ollama"
            model = "from-file"
            timeout_secs = 40
            chunk_size = 2000
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("COMMITTER_MODEL", "from-env")].into();
        let env = |key: &str| env.get(key).map(|v| v.to_string());

        let settings = Settings::resolve(&Overrides::default(), &env, file.clone()).unwrap();
        assert_eq!(settings.provider, Provider::Ollama);
        assert_eq!(settings.model, "from-env");
        assert_eq!(settings.timeout, Duration::from_secs(40));
        assert_eq!(settings.chunk.chunk_size(), 2000);

        let overrides = Overrides {
            model: Some("from-cli".into()),
            timeout: Some(Duration::from_secs(3)),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&overrides, &env, file).unwrap();
        assert_eq!(settings.model, "from-cli");
        assert_eq!(settings.timeout, Duration::from_secs(3));
    }

    #[test]
    fn provider_picks_its_own_default_model() {
        let overrides = Overrides {
            provider: Some(Provider::Anthropic),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&overrides, no_env, FileConfig::default()).unwrap();
        assert_eq!(settings.model, Provider::Anthropic.default_model());
    }

    #[test]
    fn bad_chunk_settings_are_rejected() {
        let overrides = Overrides {
            chunk_size: Some(10),
            chunk_overlap: Some(10),
            ..Overrides::default()
        };
        let err = Settings::resolve(&overrides, no_env, FileConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Chunk(SplitError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn unknown_provider_in_env_is_rejected() {
        let env = |key: &str| (key == "COMMITTER_PROVIDER").then(|| "gemini".to_string());
        let err = Settings::resolve(&Overrides::default(), env, FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProvider(name) if name == "gemini"));

        // a cli choice never consults the environment
        let overrides = Overrides {
            provider: Some(Provider::Ollama),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&overrides, env, FileConfig::default()).unwrap();
        assert_eq!(settings.provider, Provider::Ollama);
    }

    #[test]
    fn provider_from_env_is_case_insensitive() {
        let env = |key: &str| (key == "COMMITTER_PROVIDER").then(|| "Anthropic".to_string());
        let settings = Settings::resolve(&Overrides::default(), env, FileConfig::default()).unwrap();
        assert_eq!(settings.provider, Provider::Anthropic);
    }

    #[test]
    fn ollama_host_env_overrides_endpoint() {
        let env = |key: &str| (key == "OLLAMA_HOST").then(|| "http://gpu-box:11434".to_string());
        let settings = Settings::resolve(&Overrides::default(), env, FileConfig::default()).unwrap();
        assert_eq!(settings.endpoints.ollama, "http://gpu-box:11434");
    }

    #[test]
    fn missing_config_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_file_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "chunk_size = \"lots\"").unwrap();
        assert!(matches!(
            load_file_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn config_file_endpoints_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "provider = \"openrouter\"\n[endpoints]\nopenrouter = \"http://proxy.local/v1\"\n",
        )
        .unwrap();
        let file = load_file_config(Some(&path)).unwrap();
        let settings = Settings::resolve(&Overrides::default(), no_env, file).unwrap();
        assert_eq!(settings.provider, Provider::OpenRouter);
        assert_eq!(settings.endpoints.openrouter, "http://proxy.local/v1");
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = config_path(Some(Path::new("/tmp/committer.toml")));
        assert_eq!(path, Some(PathBuf::from("/tmp/committer.toml")));
    }

    #[test]
    fn timeouts_parse() {
        assert_eq!(parse_timeout("15").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_timeout("500ms").unwrap(), Duration::from_millis(500));
        assert!(parse_timeout("soon").is_err());
        assert!(parse_timeout("0s").is_err());
    }
}
