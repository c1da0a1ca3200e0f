use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of provider a licence can be enumerated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[cfg_attr(feature = "cli", clap(rename_all = "kebab-case"))]
pub enum SourceKind {
    System,
    Dongle,
    Server,
    CloudServer,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::System => "system",
            SourceKind::Dongle => "dongle",
            SourceKind::Server => "server",
            SourceKind::CloudServer => "cloud-server",
        }
    }

    /// The default lookup order when the caller does not specify one.
    pub fn default_priority() -> Vec<SourceKind> {
        vec![
            SourceKind::System,
            SourceKind::Dongle,
            SourceKind::Server,
            SourceKind::CloudServer,
        ]
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "system" => Ok(SourceKind::System),
            "dongle" => Ok(SourceKind::Dongle),
            "server" => Ok(SourceKind::Server),
            "cloud-server" => Ok(SourceKind::CloudServer),
            other => Err(format!("unknown licence source type: {}", other)),
        }
    }
}

/// A licence provider discovered by the backend. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceSource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub location: String,
}

/// A licence available from a source, optionally parameterized by worker count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenceOffer {
    pub short_name: String,
    #[serde(default)]
    pub can_choose_workers: bool,
    /// Worker count the backend would grant when none is requested.
    #[serde(default, rename = "workers")]
    pub default_workers: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

/// User-supplied filter driving the selection scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Ordered lookup priority; the scan visits kinds in exactly this order.
    pub source_kinds: Vec<SourceKind>,
    /// Exact-match location filter; empty matches any source.
    pub source_location: String,
    /// Exact-match licence short name; empty matches any offer.
    pub short_name: String,
    /// Workers to request when an offer supports worker selection.
    pub worker_count: u32,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            source_kinds: SourceKind::default_priority(),
            source_location: String::new(),
            short_name: String::new(),
            worker_count: 2,
        }
    }
}

impl SelectionCriteria {
    pub fn matches_location(&self, source: &LicenceSource) -> bool {
        self.source_location.is_empty() || source.location == self.source_location
    }

    pub fn matches_offer(&self, offer: &LicenceOffer) -> bool {
        self.short_name.is_empty() || offer.short_name == self.short_name
    }

    /// Comma-joined kind list, for logs and error messages.
    pub fn kinds_display(&self) -> String {
        self.source_kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Credentials offered to the backend on every licence request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The outcome of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredLicence {
    pub short_name: String,
    /// Workers granted; None when the licence type has no worker concept.
    pub workers: Option<u32>,
    pub source: LicenceSource,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_round_trips_through_str() {
        for kind in SourceKind::default_priority() {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert!("usb".parse::<SourceKind>().is_err());
    }

    #[test]
    fn default_criteria_match_everything() {
        let criteria = SelectionCriteria::default();
        let source = LicenceSource {
            id: "s1".into(),
            kind: SourceKind::Server,
            location: "host:27443".into(),
        };
        let offer = LicenceOffer {
            short_name: "enterprise-workstation".into(),
            can_choose_workers: true,
            default_workers: Some(8),
            description: None,
            expiry: None,
        };
        assert!(criteria.matches_location(&source));
        assert!(criteria.matches_offer(&offer));
        assert_eq!(criteria.worker_count, 2);
        assert_eq!(criteria.kinds_display(), "system,dongle,server,cloud-server");
    }

    #[test]
    fn location_filter_is_exact_match() {
        let criteria = SelectionCriteria {
            source_location: "host:27443".into(),
            ..Default::default()
        };
        let near_miss = LicenceSource {
            id: "s1".into(),
            kind: SourceKind::Server,
            location: "host:27444".into(),
        };
        assert!(!criteria.matches_location(&near_miss));
    }
}
