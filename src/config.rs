use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Environment variable holding the path of the configuration file.
pub const CONFIG_ENV_VAR: &str = "LANBILLING_CONFIG";
pub const CONFIG_SECTION: &str = "lanbilling";

const DEFAULT_HOSTNAME: &str = "localhost";
const DEFAULT_LOGIN: &str = "admin";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file has no [{0}] section")]
    MissingSection(String),
    #[error("config section [{section}] is missing required key \"{key}\"")]
    MissingKey { section: String, key: &'static str },
    #[error("failed to read password: {0}")]
    Prompt(String),
}

/// One section of the configuration file, as written.
#[derive(Deserialize, Debug, Default)]
struct RawSection {
    login: Option<String>,
    hostname: Option<String>,
    wsdl_url: Option<String>,
    soap_proxy_address: Option<String>,
    password: Option<String>,
}

/// Connection settings after defaults were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LanbillingConfig {
    pub hostname: String,
    pub login: String,
    pub password: String,
    pub wsdl_url: String,
    pub soap_proxy_address: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    section: &str,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) => Ok(non_blank(Some(v))),
        None => Err(ConfigError::MissingKey {
            section: section.to_string(),
            key,
        }),
    }
}

impl LanbillingConfig {
    /// Loads the file named by `LANBILLING_CONFIG`. `.env` files are honoured.
    /// When the file has no password, `prompt` is asked for one.
    pub fn from_env<F>(prompt: F) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> Result<String, ConfigError>,
    {
        dotenv::dotenv().ok();
        let path = env::var(CONFIG_ENV_VAR).map_err(|_| ConfigError::MissingEnv(CONFIG_ENV_VAR))?;
        Self::load(Path::new(&path), CONFIG_SECTION, prompt)
    }

    pub fn load<F>(path: &Path, section: &str, prompt: F) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> Result<String, ConfigError>,
    {
        info!(path = ?path, "Attempting to load config.");
        let contents = fs::read_to_string(path).map_err(|source| {
            error!(path = ?path, error = %source, "Failed to read config file.");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&contents, path, section, prompt)
    }

    fn parse<F>(contents: &str, path: &Path, section: &str, prompt: F) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> Result<String, ConfigError>,
    {
        let mut sections: BTreeMap<String, RawSection> =
            toml::from_str(contents).map_err(|source| {
                error!(path = ?path, error = %source, "Failed to parse config file.");
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        let raw = sections
            .remove(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;

        let login = required(raw.login, section, "login")?;
        let hostname = required(raw.hostname, section, "hostname")?;
        let wsdl_url = required(raw.wsdl_url, section, "wsdl_url")?;

        let hostname = hostname.unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
        let wsdl_url =
            wsdl_url.unwrap_or_else(|| format!("http://{hostname}/admin/soap/api3.wsdl"));
        // An explicitly blank password is kept blank; only a missing one is prompted for.
        let password = match raw.password {
            Some(password) => password.trim().to_string(),
            None => prompt()?,
        };

        let config = LanbillingConfig {
            login: login.unwrap_or_else(|| DEFAULT_LOGIN.to_string()),
            hostname,
            password,
            wsdl_url,
            soap_proxy_address: non_blank(raw.soap_proxy_address),
        };
        info!(
            hostname = %config.hostname,
            login = %config.login,
            wsdl_url = %config.wsdl_url,
            soap_proxy_address = ?config.soap_proxy_address,
            "Loaded config successfully."
        );
        Ok(config)
    }
}

/// Asks for the billing password on the terminal.
pub fn prompt_password() -> Result<String, ConfigError> {
    dialoguer::Password::new()
        .with_prompt("Please, type in password for Lanbilling")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| ConfigError::Prompt(e.to_string()))
}
