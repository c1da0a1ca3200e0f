use crate::domain::model::{AcquiredLicence, LicenceOffer, SelectionCriteria};
use crate::domain::ports::LicenceBackend;
use crate::utils::error::{BrokerError, Result};

/// Walks licence sources in priority order and acquires the first matching
/// offer. Pure control flow over a [`LicenceBackend`]; every backend call is
/// awaited before the next, so at most one request is in flight at a time.
pub struct Licensor<B: LicenceBackend> {
    backend: B,
}

impl<B: LicenceBackend> Licensor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Acquire at most one licence according to `criteria`.
    ///
    /// Enumeration failures at a single source are tolerated: the error is
    /// recorded and the scan moves on to the next source. Only the aggregate
    /// absence of a successful acquisition is surfaced, wrapping the most
    /// recent underlying error as its cause. When a non-empty source location
    /// was requested, the scan never falls through past that source.
    pub async fn acquire(&self, criteria: &SelectionCriteria) -> Result<AcquiredLicence> {
        tracing::info!("Acquiring a licence from: {}", criteria.kinds_display());

        let sources = self.backend.discover_sources(&criteria.source_kinds).await?;

        let mut last_error: Option<BrokerError> = None;
        let mut attempted: Vec<String> = Vec::new();

        for source in &sources {
            tracing::info!("Found {} ({})", source.location, source.kind);
            if !criteria.matches_location(source) {
                continue;
            }
            attempted.push(source.location.clone());

            match self.backend.discover_offers(source).await {
                Ok(offers) => {
                    for offer in &offers {
                        tracing::info!("Licence discovered: {}", offer.short_name);
                        if !criteria.matches_offer(offer) {
                            continue;
                        }

                        // First match wins; a failed acquire is not retried
                        // against sibling offers at the same source.
                        let workers = worker_request(offer, criteria.worker_count);
                        match workers {
                            Some(count) => tracing::info!("Acquiring {} workers", count),
                            None => tracing::info!("Acquiring the default worker count"),
                        }
                        match self.backend.acquire(source, offer, workers).await {
                            Ok(licence) => return Ok(licence),
                            Err(e) => {
                                tracing::warn!(
                                    "Could not acquire '{}' from {}: {}",
                                    offer.short_name,
                                    source.location,
                                    e
                                );
                                last_error = Some(e);
                            }
                        }
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Errors trying to enumerate licence source {}: {}",
                        source.location,
                        e
                    );
                    last_error = Some(e);
                }
            }

            // A specifically requested source must not fall through to others.
            if !criteria.source_location.is_empty() && source.location == criteria.source_location {
                break;
            }
        }

        match last_error {
            Some(cause) => Err(BrokerError::AcquisitionFailed {
                attempted,
                cause: Box::new(cause),
            }),
            None => Err(BrokerError::NoLicenceFound {
                source_types: criteria.kinds_display(),
                source_location: criteria.source_location.clone(),
                short_name: criteria.short_name.clone(),
                worker_count: criteria.worker_count,
            }),
        }
    }

    /// Acquire whatever single licence the backend can find, bypassing all
    /// filtering. Expects exactly one candidate to be discoverable.
    pub async fn acquire_any(&self) -> Result<AcquiredLicence> {
        self.backend.acquire_any().await
    }
}

/// Workers to request for `offer`: the configured count when the offer lets
/// the caller choose, otherwise none (the backend applies its own default).
fn worker_request(offer: &LicenceOffer, requested: u32) -> Option<u32> {
    if offer.can_choose_workers {
        Some(requested)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LicenceSource, SourceKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Per-source script: either a list of offers or an enumeration failure.
    enum OfferScript {
        Offers(Vec<LicenceOffer>),
        Fail(String),
    }

    /// Deterministic in-memory backend recording which sources were visited.
    struct ScriptedBackend {
        sources: Vec<LicenceSource>,
        offers: HashMap<String, OfferScript>,
        refuse_acquire: bool,
        visited: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(sources: Vec<LicenceSource>) -> Self {
            Self {
                sources,
                offers: HashMap::new(),
                refuse_acquire: false,
                visited: Mutex::new(Vec::new()),
            }
        }

        fn with_offers(mut self, location: &str, offers: Vec<LicenceOffer>) -> Self {
            self.offers
                .insert(location.to_string(), OfferScript::Offers(offers));
            self
        }

        fn with_failure(mut self, location: &str, message: &str) -> Self {
            self.offers
                .insert(location.to_string(), OfferScript::Fail(message.to_string()));
            self
        }

        fn visited(&self) -> Vec<String> {
            self.visited.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LicenceBackend for ScriptedBackend {
        async fn version(&self) -> Result<String> {
            Ok("9.6-test".to_string())
        }

        async fn discover_sources(&self, kinds: &[SourceKind]) -> Result<Vec<LicenceSource>> {
            // Returned in the priority order given, like the real backend.
            let mut out = Vec::new();
            for kind in kinds {
                out.extend(
                    self.sources
                        .iter()
                        .filter(|s| s.kind == *kind)
                        .cloned(),
                );
            }
            Ok(out)
        }

        async fn discover_offers(&self, source: &LicenceSource) -> Result<Vec<LicenceOffer>> {
            self.visited.lock().unwrap().push(source.location.clone());
            match self.offers.get(&source.location) {
                Some(OfferScript::Offers(offers)) => Ok(offers.clone()),
                Some(OfferScript::Fail(message)) => Err(BrokerError::Discovery {
                    location: source.location.clone(),
                    message: message.clone(),
                }),
                None => Ok(Vec::new()),
            }
        }

        async fn acquire(
            &self,
            source: &LicenceSource,
            offer: &LicenceOffer,
            workers: Option<u32>,
        ) -> Result<AcquiredLicence> {
            if self.refuse_acquire {
                return Err(BrokerError::Acquisition {
                    short_name: offer.short_name.clone(),
                    location: source.location.clone(),
                    message: "no seats left".to_string(),
                });
            }
            Ok(AcquiredLicence {
                short_name: offer.short_name.clone(),
                workers: workers.or(offer.default_workers),
                source: source.clone(),
                expiry: offer.expiry,
            })
        }

        async fn acquire_any(&self) -> Result<AcquiredLicence> {
            unimplemented!("not used by selector tests")
        }
    }

    fn source(kind: SourceKind, location: &str) -> LicenceSource {
        LicenceSource {
            id: location.replace([':', '.'], "-"),
            kind,
            location: location.to_string(),
        }
    }

    fn offer(short_name: &str, can_choose_workers: bool) -> LicenceOffer {
        LicenceOffer {
            short_name: short_name.to_string(),
            can_choose_workers,
            default_workers: None,
            description: None,
            expiry: None,
        }
    }

    fn criteria(kinds: Vec<SourceKind>) -> SelectionCriteria {
        SelectionCriteria {
            source_kinds: kinds,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn location_filter_visits_at_most_one_source() {
        let backend = ScriptedBackend::new(vec![
            source(SourceKind::Server, "a:27443"),
            source(SourceKind::Server, "b:27443"),
            source(SourceKind::Server, "c:27443"),
        ])
        .with_offers("b:27443", vec![offer("enterprise-workstation", false)]);

        let licensor = Licensor::new(backend);
        let mut criteria = criteria(vec![SourceKind::Server]);
        criteria.source_location = "b:27443".to_string();

        let acquired = licensor.acquire(&criteria).await.unwrap();
        assert_eq!(acquired.source.location, "b:27443");
        assert_eq!(licensor.backend().visited(), vec!["b:27443"]);
    }

    #[tokio::test]
    async fn empty_filters_take_first_offer_of_first_yielding_source() {
        let sources = vec![
            source(SourceKind::Dongle, "local-dongle"),
            source(SourceKind::Server, "srv:27443"),
        ];
        let backend = ScriptedBackend::new(sources.clone())
            .with_offers("local-dongle", vec![offer("dongle-lic", false)])
            .with_offers("srv:27443", vec![offer("server-lic", false)]);
        let licensor = Licensor::new(backend);

        let first = licensor
            .acquire(&criteria(vec![SourceKind::Dongle, SourceKind::Server]))
            .await
            .unwrap();
        assert_eq!(first.short_name, "dongle-lic");

        // Reversed priority yields the other licence.
        let backend = ScriptedBackend::new(sources)
            .with_offers("local-dongle", vec![offer("dongle-lic", false)])
            .with_offers("srv:27443", vec![offer("server-lic", false)]);
        let licensor = Licensor::new(backend);
        let second = licensor
            .acquire(&criteria(vec![SourceKind::Server, SourceKind::Dongle]))
            .await
            .unwrap();
        assert_eq!(second.short_name, "server-lic");
    }

    #[test]
    fn identical_backends_give_identical_results() {
        let build = || {
            ScriptedBackend::new(vec![
                source(SourceKind::System, "this-system"),
                source(SourceKind::Server, "srv:27443"),
            ])
            .with_failure("this-system", "not registered")
            .with_offers("srv:27443", vec![offer("enterprise-workstation", true)])
        };

        let run = || {
            tokio_test::block_on(
                Licensor::new(build())
                    .acquire(&criteria(vec![SourceKind::System, SourceKind::Server])),
            )
        };
        let a = run().unwrap();
        let b = run().unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn failure_at_earlier_source_is_discarded_on_later_success() {
        let backend = ScriptedBackend::new(vec![
            source(SourceKind::Server, "a:27443"),
            source(SourceKind::Server, "b:27443"),
        ])
        .with_failure("a:27443", "bad cert")
        .with_offers("b:27443", vec![offer("enterprise-workstation", false)]);

        let result = Licensor::new(backend)
            .acquire(&criteria(vec![SourceKind::Server]))
            .await;
        let acquired = result.unwrap();
        assert_eq!(acquired.source.location, "b:27443");
    }

    #[tokio::test]
    async fn all_sources_failing_reports_last_error() {
        let backend = ScriptedBackend::new(vec![
            source(SourceKind::Server, "a:27443"),
            source(SourceKind::Server, "b:27443"),
        ])
        .with_failure("a:27443", "first failure")
        .with_failure("b:27443", "second failure");

        let err = Licensor::new(backend)
            .acquire(&criteria(vec![SourceKind::Server]))
            .await
            .unwrap_err();
        match err {
            BrokerError::AcquisitionFailed { attempted, cause } => {
                assert_eq!(attempted, vec!["a:27443", "b:27443"]);
                assert!(cause.to_string().contains("second failure"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_match_and_no_error_synthesizes_not_found() {
        let backend = ScriptedBackend::new(vec![source(SourceKind::Dongle, "local-dongle")])
            .with_offers("local-dongle", vec![offer("reviewer", false)]);

        let mut criteria = criteria(vec![SourceKind::Dongle]);
        criteria.short_name = "enterprise-workstation".to_string();
        criteria.worker_count = 4;

        let err = Licensor::new(backend).acquire(&criteria).await.unwrap_err();
        match err {
            BrokerError::NoLicenceFound {
                source_types,
                source_location,
                short_name,
                worker_count,
            } => {
                assert_eq!(source_types, "dongle");
                assert_eq!(source_location, "");
                assert_eq!(short_name, "enterprise-workstation");
                assert_eq!(worker_count, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn worker_selection_uses_requested_count() {
        let backend = ScriptedBackend::new(vec![source(SourceKind::Dongle, "local-dongle")])
            .with_offers(
                "local-dongle",
                vec![offer("enterprise-workstation", true)],
            );

        let mut criteria = criteria(vec![SourceKind::Dongle]);
        criteria.short_name = "enterprise-workstation".to_string();

        let acquired = Licensor::new(backend).acquire(&criteria).await.unwrap();
        assert_eq!(acquired.workers, Some(2));
    }

    #[tokio::test]
    async fn pinned_location_discovery_failure_stops_the_scan() {
        let backend = ScriptedBackend::new(vec![
            source(SourceKind::Server, "host:27443"),
            source(SourceKind::Server, "fallback:27443"),
        ])
        .with_failure("host:27443", "bad cert")
        .with_offers("fallback:27443", vec![offer("enterprise-workstation", false)]);

        let mut criteria = criteria(vec![SourceKind::Server]);
        criteria.source_location = "host:27443".to_string();

        let licensor = Licensor::new(backend);
        let err = licensor.acquire(&criteria).await.unwrap_err();
        match err {
            BrokerError::AcquisitionFailed { attempted, cause } => {
                assert_eq!(attempted, vec!["host:27443"]);
                assert!(cause.to_string().contains("bad cert"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(licensor.backend().visited(), vec!["host:27443"]);
    }

    #[tokio::test]
    async fn acquire_failure_moves_to_next_source_not_sibling_offer() {
        let backend = ScriptedBackend {
            refuse_acquire: true,
            ..ScriptedBackend::new(vec![source(SourceKind::Server, "a:27443")])
        }
        .with_offers(
            "a:27443",
            vec![offer("enterprise-workstation", false), offer("reviewer", false)],
        );

        let err = Licensor::new(backend)
            .acquire(&criteria(vec![SourceKind::Server]))
            .await
            .unwrap_err();
        // The sibling "reviewer" offer is never tried; the acquire failure is
        // the terminal cause.
        match err {
            BrokerError::AcquisitionFailed { cause, .. } => {
                assert!(matches!(*cause, BrokerError::Acquisition { ref short_name, .. }
                    if short_name == "enterprise-workstation"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn offer_without_worker_choice_requests_backend_default() {
        let mut with_default = offer("desktop", false);
        with_default.default_workers = Some(1);
        let backend = ScriptedBackend::new(vec![source(SourceKind::System, "this-system")])
            .with_offers("this-system", vec![with_default]);

        let acquired = Licensor::new(backend)
            .acquire(&criteria(vec![SourceKind::System]))
            .await
            .unwrap();
        assert_eq!(acquired.workers, Some(1));
    }
}
