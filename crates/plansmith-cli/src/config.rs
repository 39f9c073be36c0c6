//! Configuration file management for plansmith.
//!
//! Provides a TOML-based config file at `~/.config/plansmith/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use plansmith_core::llm::OpenAiClient;
use plansmith_core::tracker::{GitHubClient, GitHubOAuth};
use plansmith_db::config::DbConfig;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const LLM_MODEL_ENV: &str = "PLANSMITH_LLM_MODEL";
pub const LLM_BASE_URL_ENV: &str = "PLANSMITH_LLM_BASE_URL";
pub const GITHUB_API_URL_ENV: &str = "PLANSMITH_GITHUB_API_URL";
pub const GITHUB_OAUTH_URL_ENV: &str = "PLANSMITH_GITHUB_OAUTH_URL";
pub const GITHUB_CLIENT_ID_ENV: &str = "GITHUB_CLIENT_ID";
pub const GITHUB_CLIENT_SECRET_ENV: &str = "GITHUB_CLIENT_SECRET";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub github: GitHubSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Default, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct GitHubSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Debug stand-in for an optional secret.
fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

impl fmt::Debug for LlmSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSection")
            .field("api_key", &redacted(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Debug for GitHubSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSection")
            .field("api_url", &self.api_url)
            .field("oauth_url", &self.oauth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .finish()
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the plansmith config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/plansmith` or
/// `~/.config/plansmith`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("plansmith");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("plansmith")
}

/// Return the path to the plansmith config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since the file may hold API keys.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Model provider settings.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    /// Build the model client. Fails when no API key was configured.
    pub fn client(&self) -> Result<OpenAiClient> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("no model API key; set {OPENAI_API_KEY_ENV} or llm.api_key in the config file");
        };
        OpenAiClient::new(&self.base_url, api_key, &self.model)
            .context("failed to build model client")
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// GitHub endpoints and OAuth application settings.
#[derive(Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub oauth_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl GitHubConfig {
    pub fn client(&self) -> Result<GitHubClient> {
        GitHubClient::new(&self.api_url).context("failed to build GitHub client")
    }

    /// OAuth helpers, available only when both client id and secret are set.
    pub fn oauth(&self) -> Result<Option<GitHubOAuth>> {
        let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(None);
        };
        let oauth = GitHubOAuth::new(&self.oauth_url, &self.api_url, id, secret)
            .context("failed to build GitHub OAuth client")?;
        Ok(Some(oauth))
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("oauth_url", &self.oauth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .finish()
    }
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PlansmithConfig {
    pub db_config: DbConfig,
    pub llm: LlmConfig,
    pub github: GitHubConfig,
}

/// Env var if set and non-empty, else the config-file value.
fn env_or(var: &str, file_value: Option<String>) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or(file_value)
}

impl PlansmithConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `PLANSMITH_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Model: `OPENAI_API_KEY` / `PLANSMITH_LLM_*` > `[llm]` > OpenAI defaults
    /// - GitHub: `PLANSMITH_GITHUB_*` / `GITHUB_CLIENT_*` > `[github]` > public GitHub
    ///
    /// A missing config file is not an error.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = match load_config() {
            Ok(cfg) => Some(cfg),
            Err(_) if !config_path().exists() => None,
            Err(e) => return Err(e),
        };
        let (database, llm, github) = match file_config {
            Some(cfg) => (Some(cfg.database), cfg.llm, cfg.github),
            None => (None, LlmSection::default(), GitHubSection::default()),
        };

        let db_url = match cli_db_url {
            Some(url) => url.to_string(),
            None => env_or(DbConfig::ENV_VAR, database.map(|d| d.url))
                .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_string()),
        };

        let llm = LlmConfig {
            api_key: env_or(OPENAI_API_KEY_ENV, llm.api_key),
            model: env_or(LLM_MODEL_ENV, llm.model)
                .unwrap_or_else(|| OpenAiClient::DEFAULT_MODEL.to_string()),
            base_url: env_or(LLM_BASE_URL_ENV, llm.base_url)
                .unwrap_or_else(|| OpenAiClient::DEFAULT_BASE_URL.to_string()),
        };

        let github = GitHubConfig {
            api_url: env_or(GITHUB_API_URL_ENV, github.api_url)
                .unwrap_or_else(|| GitHubClient::DEFAULT_API_URL.to_string()),
            oauth_url: env_or(GITHUB_OAUTH_URL_ENV, github.oauth_url)
                .unwrap_or_else(|| GitHubOAuth::DEFAULT_OAUTH_URL.to_string()),
            client_id: env_or(GITHUB_CLIENT_ID_ENV, github.client_id),
            client_secret: env_or(GITHUB_CLIENT_SECRET_ENV, github.client_secret),
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            llm,
            github,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MANAGED_VARS: &[&str] = &[
        "XDG_CONFIG_HOME",
        DbConfig::ENV_VAR,
        OPENAI_API_KEY_ENV,
        LLM_MODEL_ENV,
        LLM_BASE_URL_ENV,
        GITHUB_API_URL_ENV,
        GITHUB_OAUTH_URL_ENV,
        GITHUB_CLIENT_ID_ENV,
        GITHUB_CLIENT_SECRET_ENV,
    ];

    /// Holds the env lock, points the config dir at a temp dir, clears
    /// every plansmith variable, and restores the originals on drop.
    struct IsolatedEnv {
        tmp: tempfile::TempDir,
        saved: Vec<(&'static str, Option<String>)>,
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    impl IsolatedEnv {
        fn new() -> Self {
            let lock = crate::test_util::lock_env();
            let saved = MANAGED_VARS
                .iter()
                .map(|v| (*v, std::env::var(v).ok()))
                .collect();
            let tmp = tempfile::TempDir::new().unwrap();
            for var in MANAGED_VARS {
                unsafe { std::env::remove_var(var) };
            }
            unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
            Self {
                tmp,
                saved,
                _lock: lock,
            }
        }

        fn set(&self, var: &str, value: &str) {
            unsafe { std::env::set_var(var, value) };
        }

        fn write_config(&self, contents: &str) {
            let dir = self.tmp.path().join("plansmith");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("config.toml"), contents).unwrap();
        }
    }

    impl Drop for IsolatedEnv {
        fn drop(&mut self) {
            for (var, value) in &self.saved {
                match value {
                    Some(v) => unsafe { std::env::set_var(var, v) },
                    None => unsafe { std::env::remove_var(var) },
                }
            }
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        let _env = IsolatedEnv::new();

        let config = PlansmithConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.llm.api_key, None);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.oauth_url, "https://github.com");
        assert!(config.github.oauth().unwrap().is_none());
        assert!(config.llm.client().is_err());
    }

    #[test]
    fn cli_flag_overrides_env_and_file() {
        let env = IsolatedEnv::new();
        env.write_config("[database]\nurl = \"postgresql://file:5432/filedb\"\n");
        env.set(DbConfig::ENV_VAR, "postgresql://env:5432/envdb");

        let config = PlansmithConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn env_overrides_config_file() {
        let env = IsolatedEnv::new();
        env.write_config(
            "[database]\nurl = \"postgresql://file:5432/filedb\"\n\n\
             [llm]\nmodel = \"file-model\"\napi_key = \"sk-file\"\n",
        );
        env.set(DbConfig::ENV_VAR, "postgresql://env:5432/envdb");
        env.set(LLM_MODEL_ENV, "env-model");

        let config = PlansmithConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.llm.model, "env-model");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn config_file_sections_are_read() {
        let env = IsolatedEnv::new();
        env.write_config(
            "[database]\nurl = \"postgresql://file:5432/filedb\"\n\n\
             [github]\napi_url = \"http://ghe.local/api/v3\"\n\
             client_id = \"id\"\nclient_secret = \"secret\"\n",
        );

        let config = PlansmithConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
        assert_eq!(config.github.api_url, "http://ghe.local/api/v3");
        assert!(config.github.oauth().unwrap().is_some());
    }

    #[test]
    fn empty_env_value_falls_through() {
        let env = IsolatedEnv::new();
        env.set(OPENAI_API_KEY_ENV, "  ");

        let config = PlansmithConfig::resolve(None).unwrap();
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let env = IsolatedEnv::new();
        env.write_config("[database\nurl = ");

        let err = PlansmithConfig::resolve(None).unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to parse config file"),
            "unexpected error: {err:#}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn save_config_roundtrips_with_private_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _env = IsolatedEnv::new();
        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
            llm: LlmSection {
                api_key: Some("sk-test".to_string()),
                ..LlmSection::default()
            },
            github: GitHubSection::default(),
        };
        save_config(&original).unwrap();

        let meta = std::fs::metadata(config_path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(loaded.llm.api_key.as_deref(), Some("sk-test"));
        assert!(loaded.github.client_id.is_none());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("plansmith/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let env = IsolatedEnv::new();
        env.set(OPENAI_API_KEY_ENV, "sk-live-123");
        env.set(GITHUB_CLIENT_ID_ENV, "client-1");
        env.set(GITHUB_CLIENT_SECRET_ENV, "shh-123");

        let config = PlansmithConfig::resolve(None).unwrap();
        let shown = format!("{config:?}");
        assert!(!shown.contains("sk-live-123"), "{shown}");
        assert!(!shown.contains("shh-123"), "{shown}");
        assert!(shown.contains("client-1"));

        let section = GitHubSection {
            client_secret: Some("shh-123".to_string()),
            ..GitHubSection::default()
        };
        assert!(!format!("{section:?}").contains("shh-123"));
    }
}
