pub mod licensor;
pub mod session;

pub use crate::domain::model::{
    AcquiredLicence, Credentials, LicenceOffer, LicenceSource, SelectionCriteria, SourceKind,
};
pub use crate::domain::ports::{ConfigProvider, LicenceBackend};
pub use crate::utils::error::Result;
