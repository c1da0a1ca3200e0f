pub mod profile;

use crate::domain::model::{SelectionCriteria, SourceKind};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_list, validate_non_empty_string, validate_positive_number, validate_url,
    Validate,
};
#[cfg(feature = "cli")]
use profile::Profile;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://localhost:27443";

/// Fully resolved configuration: command line flags merged over the optional
/// profile, merged over built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub endpoint: String,
    pub user_data_dir: String,
    pub username: String,
    pub password: String,
    pub trust_certificate: bool,
    pub acquire_any: bool,
    pub criteria: SelectionCriteria,
}

impl ConfigProvider for Settings {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn user_data_dir(&self) -> &str {
        &self.user_data_dir
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }

    fn trust_certificate(&self) -> bool {
        self.trust_certificate
    }

    fn acquire_any(&self) -> bool {
        self.acquire_any
    }

    fn criteria(&self) -> SelectionCriteria {
        self.criteria.clone()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("endpoint", &self.endpoint)?;
        validate_non_empty_string("user_data_dir", &self.user_data_dir)?;
        validate_positive_number("licence_worker_count", self.criteria.worker_count as usize, 1)?;
        validate_non_empty_list("licence_source_type", &self.criteria.source_kinds)?;
        Ok(())
    }
}

/// Command line surface of the broker.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "licence-broker")]
#[command(version)]
#[command(about = "A console app to demonstrate licence acquisition")]
pub struct CliConfig {
    /// Acquire any licence based on cached credentials and detected hardware.
    /// Expects only one to be discovered; all filter flags are ignored.
    #[arg(short = 'a', long)]
    pub acquire_any: bool,

    /// Where the engine will look for the folders containing user artefacts.
    #[arg(short = 'd', long)]
    pub user_data_dir: String,

    /// Username for every licence credential request.
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Password for every licence credential request.
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Forces bad certificates to be trusted.
    #[arg(short = 'c', long)]
    pub trust_certificate: bool,

    /// Selects a licence type if multiple are available.
    #[arg(short = 't', long)]
    pub licence_type: Option<String>,

    /// Selects a licence source by exact location if multiple are available.
    #[arg(short = 'l', long)]
    pub licence_source_location: Option<String>,

    /// Comma delimited order defining which licence source types to check.
    #[arg(short = 's', long, value_delimiter = ',')]
    pub licence_source_type: Option<Vec<SourceKind>>,

    /// Number of workers to request when the licence offers the choice.
    #[arg(short = 'w', long)]
    pub licence_worker_count: Option<u32>,

    /// Licence server endpoint URL.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// TOML profile supplying site defaults for the flags above.
    #[arg(long)]
    pub profile: Option<std::path::PathBuf>,

    /// Enable verbose output.
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Resolve flags against the optional profile into [`Settings`].
    pub fn into_settings(self) -> Result<Settings> {
        let profile = match &self.profile {
            Some(path) => Profile::from_file(path)?,
            None => Profile::default(),
        };
        let server = profile.server.unwrap_or_default();
        let credentials = profile.credentials.unwrap_or_default();
        let selection = profile.selection.unwrap_or_default();

        Ok(Settings {
            endpoint: self
                .endpoint
                .or(server.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            user_data_dir: self.user_data_dir,
            username: self.username.or(credentials.username).unwrap_or_default(),
            password: self.password.or(credentials.password).unwrap_or_default(),
            trust_certificate: self.trust_certificate || server.trust_certificate.unwrap_or(false),
            acquire_any: self.acquire_any,
            criteria: SelectionCriteria {
                source_kinds: self
                    .licence_source_type
                    .or(selection.source_types)
                    .unwrap_or_else(SourceKind::default_priority),
                source_location: self
                    .licence_source_location
                    .or(selection.source_location)
                    .unwrap_or_default(),
                short_name: self
                    .licence_type
                    .or(selection.licence_type)
                    .unwrap_or_default(),
                worker_count: self
                    .licence_worker_count
                    .or(selection.worker_count)
                    .unwrap_or(2),
            },
        })
    }
}
