use crate::domain::model::{
    AcquiredLicence, Credentials, LicenceOffer, LicenceSource, SourceKind,
};
use crate::domain::ports::LicenceBackend;
use crate::utils::error::{BrokerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

/// Licence backend over the licence server's REST surface.
///
/// Credentials are offered on every request as basic auth; certificate trust
/// is applied once, when the client is built.
pub struct HttpLicenceBackend {
    client: Client,
    endpoint: String,
    credentials: Option<Credentials>,
    registry_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: String,
}

#[derive(Debug, Serialize)]
struct AcquireBody<'a> {
    short_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    worker_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AcquiredBody {
    short_name: String,
    #[serde(default)]
    workers: Option<u32>,
    #[serde(default)]
    source: Option<LicenceSource>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

impl HttpLicenceBackend {
    pub fn new(
        endpoint: &str,
        credentials: Option<Credentials>,
        trust_certificate: bool,
        registry_hint: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(trust_certificate)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
            registry_hint,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(format!("{}{}", self.endpoint, path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.post(format!("{}{}", self.endpoint, path)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                tracing::debug!("Offering credentials to server [{}]", self.endpoint);
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }

    /// Map a non-2xx response into a source-scoped error without losing the
    /// server's own description of the failure.
    async fn check(location: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.text().await {
            Ok(body) if !body.is_empty() => format!("{}: {}", status, body),
            _ => status.to_string(),
        };
        Err(BrokerError::Discovery {
            location: location.to_string(),
            message,
        })
    }

    fn into_licence(body: AcquiredBody, source: &LicenceSource) -> AcquiredLicence {
        AcquiredLicence {
            short_name: body.short_name,
            workers: body.workers,
            source: body.source.unwrap_or_else(|| source.clone()),
            expiry: body.expiry,
        }
    }
}

#[async_trait]
impl LicenceBackend for HttpLicenceBackend {
    async fn version(&self) -> Result<String> {
        let response = self.get("/api/version").send().await?;
        let response = Self::check(&self.endpoint, response).await?;
        let body: VersionBody = response.json().await?;
        Ok(body.version)
    }

    async fn discover_sources(&self, kinds: &[SourceKind]) -> Result<Vec<LicenceSource>> {
        let types = kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut request = self
            .get("/api/licence-sources")
            .query(&[("types", types.as_str())]);
        if let Some(hint) = &self.registry_hint {
            request = request.query(&[("registry", hint.as_str())]);
        }
        let response = Self::check(&self.endpoint, request.send().await?).await?;
        let sources: Vec<LicenceSource> = response.json().await?;
        Ok(sources)
    }

    async fn discover_offers(&self, source: &LicenceSource) -> Result<Vec<LicenceOffer>> {
        let response = self
            .get(&format!("/api/licence-sources/{}/licences", source.id))
            .send()
            .await?;
        let response = Self::check(&source.location, response).await?;
        let offers: Vec<LicenceOffer> = response.json().await?;
        Ok(offers)
    }

    async fn acquire(
        &self,
        source: &LicenceSource,
        offer: &LicenceOffer,
        workers: Option<u32>,
    ) -> Result<AcquiredLicence> {
        let response = self
            .post(&format!("/api/licence-sources/{}/acquire", source.id))
            .json(&AcquireBody {
                short_name: &offer.short_name,
                worker_count: workers,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) if !body.is_empty() => format!("{}: {}", status, body),
                _ => status.to_string(),
            };
            return Err(BrokerError::Acquisition {
                short_name: offer.short_name.clone(),
                location: source.location.clone(),
                message,
            });
        }

        let body: AcquiredBody = response.json().await?;
        Ok(Self::into_licence(body, source))
    }

    /// The degenerate mode: the server picks the single discoverable licence.
    async fn acquire_any(&self) -> Result<AcquiredLicence> {
        let response = self.post("/api/licences/acquire-any").send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) if !body.is_empty() => format!("{}: {}", status, body),
                _ => status.to_string(),
            };
            return Err(BrokerError::Acquisition {
                short_name: "any".to_string(),
                location: self.endpoint.clone(),
                message,
            });
        }

        let body: AcquiredBody = response.json().await?;
        let fallback = LicenceSource {
            id: String::new(),
            kind: SourceKind::Server,
            location: self.endpoint.clone(),
        };
        Ok(Self::into_licence(body, &fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_on_the_endpoint_is_trimmed() {
        let backend =
            HttpLicenceBackend::new("https://host:27443/", None, false, None).unwrap();
        assert_eq!(backend.endpoint, "https://host:27443");
    }

    #[test]
    fn acquire_body_omits_absent_worker_count() {
        let body = AcquireBody {
            short_name: "reviewer",
            worker_count: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"short_name":"reviewer"}"#
        );
    }
}
