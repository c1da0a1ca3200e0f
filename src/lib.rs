pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::Settings;

pub use adapters::http::HttpLicenceBackend;
pub use core::licensor::Licensor;
pub use core::session::EngineSession;
pub use domain::model::{
    AcquiredLicence, Credentials, LicenceOffer, LicenceSource, SelectionCriteria, SourceKind,
};
pub use domain::ports::{ConfigProvider, LicenceBackend};
pub use utils::error::{BrokerError, Result};
