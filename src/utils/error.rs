use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Could not enumerate licence source {location}: {message}")]
    Discovery { location: String, message: String },

    #[error("Could not acquire '{short_name}' from {location}: {message}")]
    Acquisition {
        short_name: String,
        location: String,
        message: String,
    },

    #[error("Licence could not be acquired (sources attempted: {})", attempted.join(","))]
    AcquisitionFailed {
        attempted: Vec<String>,
        #[source]
        cause: Box<BrokerError>,
    },

    #[error(
        "No licence could be found\n\
         \tsource types={source_types}\n\
         \tsource location={source_location}\n\
         \tlicence type={short_name}\n\
         \tworker count={worker_count}"
    )]
    NoLicenceFound {
        source_types: String,
        source_location: String,
        short_name: String,
        worker_count: u32,
    },
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Licensing,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BrokerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BrokerError::Config { .. }
            | BrokerError::InvalidConfigValue { .. }
            | BrokerError::MissingConfig { .. } => ErrorCategory::Configuration,
            BrokerError::Http(_) => ErrorCategory::Network,
            BrokerError::Discovery { .. }
            | BrokerError::Acquisition { .. }
            | BrokerError::AcquisitionFailed { .. }
            | BrokerError::NoLicenceFound { .. } => ErrorCategory::Licensing,
            BrokerError::Io(_) | BrokerError::Serialization(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BrokerError::Discovery { .. } => ErrorSeverity::Medium,
            BrokerError::Config { .. }
            | BrokerError::InvalidConfigValue { .. }
            | BrokerError::MissingConfig { .. } => ErrorSeverity::High,
            BrokerError::Acquisition { .. }
            | BrokerError::AcquisitionFailed { .. }
            | BrokerError::NoLicenceFound { .. } => ErrorSeverity::High,
            BrokerError::Http(_) => ErrorSeverity::Medium,
            BrokerError::Io(_) | BrokerError::Serialization(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BrokerError::Http(_) => {
                "Check that the licence server endpoint is reachable and the URL is correct"
                    .to_string()
            }
            BrokerError::Config { .. }
            | BrokerError::InvalidConfigValue { .. }
            | BrokerError::MissingConfig { .. } => {
                "Review the command line flags and profile file, then retry".to_string()
            }
            BrokerError::Discovery { location, .. } => format!(
                "Verify credentials and certificate trust for {}, or exclude it from the source list",
                location
            ),
            BrokerError::Acquisition { .. } => {
                "The matched licence was refused; check credentials and available seats".to_string()
            }
            BrokerError::AcquisitionFailed { .. } => {
                "Inspect the underlying cause below; every attempted source failed".to_string()
            }
            BrokerError::NoLicenceFound { .. } => {
                "Relax the filters (source type, location, licence type) or verify the licence server holds the expected licences"
                    .to_string()
            }
            BrokerError::Io(_) | BrokerError::Serialization(_) => {
                "This is likely an environment or backend contract problem; rerun with --verbose"
                    .to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BrokerError::NoLicenceFound { .. } => self.to_string(),
            BrokerError::AcquisitionFailed { cause, .. } => {
                format!("{}\n\tcaused by: {}", self, cause)
            }
            other => other.to_string(),
        }
    }
}
