//! Provider registry.
//!
//! Maps a provider label to the resolver endpoints that belong to it. The
//! table is plain configuration: built-in defaults, optionally overridden
//! from the command line. Nothing here touches the network.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::error::ConfigError;

pub const DEFAULT_DNS_PORT: u16 = 53;

/// Providers used when none are named explicitly.
pub const DEFAULT_SELECTION: &[&str] = &["honest", "bt"];

const DEFAULT_PROVIDERS: &[(&str, &[&str])] = &[
    (
        "honest",
        &[
            "8.8.4.4",
            "8.8.8.8", // google
            "4.2.2.1",
            "4.2.2.2",
            "4.2.2.3",
            "4.2.2.4", // level3
            "209.244.0.3",
            "209.244.0.4", // level3
            "84.200.69.80",
            "84.200.70.40", // dns.watch
            "208.67.222.222",
            "208.67.220.123", // opendns
        ],
    ),
    (
        "honest-censorship",
        &[
            "208.67.222.123",
            "208.67.220.123", // opendns family shield
            "8.26.56.26",
            "8.20.247.20", // comodo securedns
        ],
    ),
    (
        "bt",
        // Only answers from inside BT's network.
        &["81.139.56.100", "81.139.57.100"],
    ),
];

/// A named group of endpoints assumed to share a filtering posture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub label: Arc<str>,
    pub endpoints: Vec<SocketAddr>,
}

/// Static provider table.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<(String, Vec<String>)>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in provider table.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (label, addrs) in DEFAULT_PROVIDERS {
            registry.insert(*label, addrs.iter().map(|a| a.to_string()).collect());
        }
        registry
    }

    /// Define `label`, replacing any existing definition.
    pub fn insert(&mut self, label: impl Into<String>, addrs: Vec<String>) {
        let label = label.into();
        match self.providers.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = addrs,
            None => self.providers.push((label, addrs)),
        }
    }

    /// Apply an override of the form `LABEL=ADDR[,ADDR...]`.
    pub fn apply_override(&mut self, spec: &str) -> Result<(), ConfigError> {
        let malformed = || ConfigError::MalformedOverride(spec.to_string());

        let (label, addrs) = spec.split_once('=').ok_or_else(malformed)?;
        let label = label.trim();
        if label.is_empty() {
            return Err(malformed());
        }

        let addrs = addrs
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();

        self.insert(label, addrs);
        Ok(())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|(label, _)| label.as_str())
    }

    /// The normalized endpoints for `label`, in configured order with
    /// duplicates removed.
    pub fn endpoints_for(&self, label: &str) -> Result<Vec<SocketAddr>, ConfigError> {
        let (_, addrs) = self
            .providers
            .iter()
            .find(|(l, _)| l == label)
            .ok_or_else(|| ConfigError::UnknownProvider(label.to_string()))?;

        let mut endpoints = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let endpoint = normalize(addr).ok_or_else(|| ConfigError::MalformedEndpoint {
                label: label.to_string(),
                value: addr.clone(),
            })?;
            if !endpoints.contains(&endpoint) {
                endpoints.push(endpoint);
            }
        }

        if endpoints.is_empty() {
            return Err(ConfigError::EmptyProvider(label.to_string()));
        }

        Ok(endpoints)
    }

    /// Resolve a provider selection, rejecting anything unusable before
    /// a single packet is sent.
    pub fn select<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<Provider>, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::EmptyProviderSet);
        }

        let mut providers: Vec<Provider> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            if providers.iter().any(|p| &*p.label == label) {
                continue;
            }
            providers.push(Provider {
                label: Arc::from(label),
                endpoints: self.endpoints_for(label)?,
            });
        }

        Ok(providers)
    }
}

/// Parse an endpoint, appending the default DNS port when none is given.
///
/// Accepts `1.2.3.4`, `1.2.3.4:5353`, `2001:db8::1` and `[2001:db8::1]:5353`.
pub fn normalize(addr: &str) -> Option<SocketAddr> {
    let addr = addr.trim();
    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return Some(socket);
    }

    let bare = addr
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(addr);
    let ip = bare.parse::<IpAddr>().ok()?;

    Some(SocketAddr::new(ip, DEFAULT_DNS_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_appends_default_port() {
        assert_eq!(normalize("8.8.8.8"), Some("8.8.8.8:53".parse().unwrap()));
        assert_eq!(
            normalize("2001:db8::1"),
            Some("[2001:db8::1]:53".parse().unwrap())
        );
        assert_eq!(
            normalize("[2001:db8::1]"),
            Some("[2001:db8::1]:53".parse().unwrap())
        );
    }

    #[test]
    fn normalize_keeps_explicit_port() {
        assert_eq!(
            normalize("1.2.3.4:5353"),
            Some("1.2.3.4:5353".parse().unwrap())
        );
        assert_eq!(
            normalize("[2001:db8::1]:54"),
            Some("[2001:db8::1]:54".parse().unwrap())
        );
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("dns.google"), None);
        assert_eq!(normalize("1.2.3.4:"), None);
        assert_eq!(normalize("1.2.3.4:99999"), None);
    }

    #[test]
    fn defaults_are_valid() {
        let registry = ProviderRegistry::with_defaults();
        for label in registry.labels() {
            let endpoints = registry.endpoints_for(label).unwrap();
            assert!(!endpoints.is_empty());
            assert!(endpoints.iter().all(|e| e.port() == DEFAULT_DNS_PORT));
        }
        assert!(registry.select(DEFAULT_SELECTION).is_ok());
    }

    #[test]
    fn endpoints_keep_order_and_drop_duplicates() {
        let mut registry = ProviderRegistry::new();
        registry.insert(
            "test",
            vec!["9.9.9.9".into(), "1.1.1.1".into(), "9.9.9.9:53".into()],
        );

        let endpoints = registry.endpoints_for("test").unwrap();
        assert_eq!(
            endpoints,
            vec![
                "9.9.9.9:53".parse::<SocketAddr>().unwrap(),
                "1.1.1.1:53".parse().unwrap()
            ]
        );
    }

    #[test]
    fn override_replaces_provider() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.apply_override("bt=10.0.0.1, 10.0.0.2:5353").unwrap();

        let endpoints = registry.endpoints_for("bt").unwrap();
        assert_eq!(
            endpoints,
            vec![
                "10.0.0.1:53".parse::<SocketAddr>().unwrap(),
                "10.0.0.2:5353".parse().unwrap()
            ]
        );
        assert_eq!(registry.labels().filter(|l| *l == "bt").count(), 1);
    }

    #[test]
    fn override_can_define_new_provider() {
        let mut registry = ProviderRegistry::new();
        registry.apply_override("isp=192.0.2.1").unwrap();
        assert_eq!(registry.labels().collect::<Vec<_>>(), vec!["isp"]);
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        let mut registry = ProviderRegistry::new();
        assert!(matches!(
            registry.apply_override("no-equals-sign"),
            Err(ConfigError::MalformedOverride(_))
        ));
        assert!(matches!(
            registry.apply_override("=1.2.3.4"),
            Err(ConfigError::MalformedOverride(_))
        ));
    }

    #[test]
    fn select_rejects_bad_configuration() {
        let mut registry = ProviderRegistry::new();
        registry.insert("empty", vec![]);
        registry.insert("broken", vec!["1.2.3.4".into(), "not-an-ip".into()]);

        let none: [&str; 0] = [];
        assert_eq!(registry.select(&none), Err(ConfigError::EmptyProviderSet));
        assert_eq!(
            registry.select(&["missing"]),
            Err(ConfigError::UnknownProvider("missing".into()))
        );
        assert_eq!(
            registry.select(&["empty"]),
            Err(ConfigError::EmptyProvider("empty".into()))
        );
        assert_eq!(
            registry.select(&["broken"]),
            Err(ConfigError::MalformedEndpoint {
                label: "broken".into(),
                value: "not-an-ip".into()
            })
        );
    }

    #[test]
    fn select_ignores_repeated_labels() {
        let registry = ProviderRegistry::with_defaults();
        let providers = registry.select(&["honest", "honest"]).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(&*providers[0].label, "honest");
    }
}
