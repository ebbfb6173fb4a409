//! Configuration loading
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument / environment variable (parsed by the binary)
//! 2. TOML config file
//! 3. Compiled default
//!
//! Missing credentials default to empty strings. Provider calls made with
//! empty credentials fail cleanly instead of aborting startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_TABLE_NAME: &str = "leads";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://leads.db?mode=rwc";
pub const DEFAULT_IPQS_BASE_URL: &str = "https://ipqualityscore.com/api/json";
pub const DEFAULT_TRUSTEDFORM_USERNAME: &str = "API";
pub const DEFAULT_TRUSTEDFORM_BASE_URL: &str = "https://cert.trustedform.com";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5780";

/// One layer of optional settings (CLI/env or TOML file)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub leads_table_name: Option<String>,
    pub region: Option<String>,
    pub database_url: Option<String>,
    pub ipqs_api_key: Option<String>,
    pub ipqs_base_url: Option<String>,
    pub trustedform_username: Option<String>,
    pub trustedform_password: Option<String>,
    pub trustedform_base_url: Option<String>,
    pub listen_addr: Option<String>,
}

/// Load a TOML config file layer
pub fn load_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path)?;
    let layer = toml::from_str::<ConfigLayer>(&content)?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(layer)
}

/// Fully resolved service configuration
#[derive(Clone)]
pub struct LeadConfig {
    pub leads_table_name: String,
    pub region: String,
    pub database_url: String,
    pub ipqs_api_key: String,
    pub ipqs_base_url: String,
    pub trustedform_username: String,
    pub trustedform_password: String,
    pub trustedform_base_url: String,
    pub listen_addr: String,
}

impl LeadConfig {
    /// Resolve every setting from the CLI/env layer, then the file layer,
    /// then the compiled default.
    pub fn resolve(cli: ConfigLayer, file: Option<ConfigLayer>) -> Result<Self> {
        let file = file.unwrap_or_default();

        fn pick(cli: Option<String>, file: Option<String>, default: &str) -> String {
            cli.or(file).unwrap_or_else(|| default.to_string())
        }

        let config = Self {
            leads_table_name: pick(
                cli.leads_table_name,
                file.leads_table_name,
                DEFAULT_TABLE_NAME,
            ),
            region: pick(cli.region, file.region, DEFAULT_REGION),
            database_url: pick(cli.database_url, file.database_url, DEFAULT_DATABASE_URL),
            ipqs_api_key: pick(cli.ipqs_api_key, file.ipqs_api_key, ""),
            ipqs_base_url: pick(cli.ipqs_base_url, file.ipqs_base_url, DEFAULT_IPQS_BASE_URL),
            trustedform_username: pick(
                cli.trustedform_username,
                file.trustedform_username,
                DEFAULT_TRUSTEDFORM_USERNAME,
            ),
            trustedform_password: pick(cli.trustedform_password, file.trustedform_password, ""),
            trustedform_base_url: pick(
                cli.trustedform_base_url,
                file.trustedform_base_url,
                DEFAULT_TRUSTEDFORM_BASE_URL,
            ),
            listen_addr: pick(cli.listen_addr, file.listen_addr, DEFAULT_LISTEN_ADDR),
        };

        validate_table_name(&config.leads_table_name)?;
        Ok(config)
    }

    /// Database URL with any `user:password@` userinfo masked
    pub fn redacted_database_url(&self) -> String {
        redact_url_userinfo(&self.database_url)
    }
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self {
            leads_table_name: DEFAULT_TABLE_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            ipqs_api_key: String::new(),
            ipqs_base_url: DEFAULT_IPQS_BASE_URL.to_string(),
            trustedform_username: DEFAULT_TRUSTEDFORM_USERNAME.to_string(),
            trustedform_password: String::new(),
            trustedform_base_url: DEFAULT_TRUSTEDFORM_BASE_URL.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

// Credentials are redacted so the config can be logged.
impl std::fmt::Debug for LeadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(secret: &str) -> &'static str {
            if secret.is_empty() {
                "<unset>"
            } else {
                "<redacted>"
            }
        }

        f.debug_struct("LeadConfig")
            .field("leads_table_name", &self.leads_table_name)
            .field("region", &self.region)
            .field("database_url", &self.redacted_database_url())
            .field("ipqs_api_key", &redact(&self.ipqs_api_key))
            .field("ipqs_base_url", &self.ipqs_base_url)
            .field("trustedform_username", &self.trustedform_username)
            .field("trustedform_password", &redact(&self.trustedform_password))
            .field("trustedform_base_url", &self.trustedform_base_url)
            .field("listen_addr", &self.listen_addr)
            .finish()
    }
}

fn redact_url_userinfo(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://<redacted>{}", scheme, &rest[at..]),
        None => url.to_string(),
    }
}

/// The table name is interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid store table name: {:?}", name)))
    }
}
