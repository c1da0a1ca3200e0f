use crate::domain::model::SourceKind;
use crate::utils::error::{BrokerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional TOML profile carrying site defaults. Command line flags win over
/// profile values; profile values win over built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub server: Option<ServerProfile>,
    pub credentials: Option<CredentialsProfile>,
    pub selection: Option<SelectionProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerProfile {
    pub endpoint: Option<String>,
    pub trust_certificate: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsProfile {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionProfile {
    pub source_types: Option<Vec<SourceKind>>,
    pub source_location: Option<String>,
    pub licence_type: Option<String>,
    pub worker_count: Option<u32>,
}

impl Profile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BrokerError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| BrokerError::Config {
            message: format!("profile parsing error: {}", e),
        })
    }
}

/// Replace `${VAR_NAME}` references with environment values; unset variables
/// are left verbatim so validation can point at them.
fn substitute_env_vars(content: &str) -> String {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}
