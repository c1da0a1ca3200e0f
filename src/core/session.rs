use crate::adapters::http::HttpLicenceBackend;
use crate::core::licensor::Licensor;
use crate::domain::model::Credentials;
use crate::domain::ports::{ConfigProvider, LicenceBackend};
use crate::utils::error::Result;

/// A scoped connection to the licensing backend. The session owns the backend
/// handle; it is released when the session is dropped, on every exit path.
pub struct EngineSession {
    licensor: Licensor<HttpLicenceBackend>,
    user: String,
}

impl EngineSession {
    /// Open a session against the configured endpoint, applying credentials
    /// and certificate trust before the first request is made.
    pub async fn open(config: &impl ConfigProvider) -> Result<EngineSession> {
        let user = resolve_user(config.username());
        let criteria = config.criteria();

        tracing::info!("userDataDir: {}", config.user_data_dir());
        tracing::info!("user: {}", user);
        tracing::info!("Engine is starting up...");

        let credentials = if !user.is_empty() && !config.password().is_empty() {
            Some(Credentials {
                username: user.clone(),
                password: config.password().to_string(),
            })
        } else {
            None
        };

        // A requested source location is forced into the lookup even when the
        // backend would not discover it on its own.
        let registry_hint = if criteria.source_location.is_empty() {
            None
        } else {
            Some(criteria.source_location.clone())
        };

        let backend = HttpLicenceBackend::new(
            config.endpoint(),
            credentials,
            config.trust_certificate(),
            registry_hint,
        )?;
        if config.trust_certificate() {
            // Reserved for sources whose certificates cannot be fixed.
            tracing::warn!("Trusting licence server certificates blindly");
        }

        let version = backend.version().await?;
        tracing::info!("Initialising: {}", version);

        Ok(EngineSession {
            licensor: Licensor::new(backend),
            user,
        })
    }

    pub fn licensor(&self) -> &Licensor<HttpLicenceBackend> {
        &self.licensor
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        tracing::info!("Engine is shutting down...");
    }
}

/// Effective user for credential requests: explicit configuration, then the
/// `LICENCE_USER` and `USER` environment variables, then a fixed fallback.
fn resolve_user(configured: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    std::env::var("LICENCE_USER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "app-user".to_string())
}
