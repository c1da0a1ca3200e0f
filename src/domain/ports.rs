use crate::domain::model::{
    AcquiredLicence, LicenceOffer, LicenceSource, SelectionCriteria, SourceKind,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The licensing backend the selector drives. Implementations talk to the
/// actual licence infrastructure (licence server, dongle daemon, ...); the
/// selector itself is pure control flow over these calls.
#[async_trait]
pub trait LicenceBackend: Send + Sync {
    /// Version string reported by the backend, logged at session start.
    async fn version(&self) -> Result<String>;

    /// Enumerate licence sources, in the priority order given. A failure here
    /// means the backend is unreachable and fails the whole run.
    async fn discover_sources(&self, kinds: &[SourceKind]) -> Result<Vec<LicenceSource>>;

    /// Enumerate licences offered by one source. Failures are scoped to that
    /// source; callers are expected to continue with the next one.
    async fn discover_offers(&self, source: &LicenceSource) -> Result<Vec<LicenceOffer>>;

    /// Acquire a specific offer, optionally requesting a worker count.
    async fn acquire(
        &self,
        source: &LicenceSource,
        offer: &LicenceOffer,
        workers: Option<u32>,
    ) -> Result<AcquiredLicence>;

    /// Acquire whatever single licence the backend can find, with no
    /// filtering. Only meaningful when exactly one licence is discoverable;
    /// with more than one the behaviour is backend-defined.
    async fn acquire_any(&self) -> Result<AcquiredLicence>;
}

/// Read-only configuration consumed by the session and the CLI.
pub trait ConfigProvider: Send + Sync {
    fn endpoint(&self) -> &str;
    fn user_data_dir(&self) -> &str;
    fn username(&self) -> &str;
    fn password(&self) -> &str;
    fn trust_certificate(&self) -> bool;
    fn acquire_any(&self) -> bool;
    fn criteria(&self) -> SelectionCriteria;
}
