// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! API credentials and client configuration, loaded once at startup.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "api.risk.lseg.com";
pub const DEFAULT_GATEWAY_PATH: &str = "/screening/v3/";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Immutable API credentials. The secret is opaque key material and is never
/// printed, not even through `Debug`.
#[derive(Clone)]
pub struct Credentials {
    key_id: String,
    secret: Vec<u8>,
    host: String,
}

impl Credentials {
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>, host: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
            host: host.into(),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Fixed-count, fixed-interval polling. No backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Everything the client needs, passed explicitly to whoever needs it.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub credentials: Credentials,
    /// `https` in production; tests point the client at a local `http` server.
    pub scheme: String,
    /// Path prefix every endpoint hangs off, with leading and trailing `/`.
    pub gateway_path: String,
    pub group_id: String,
    pub http_timeout: Duration,
    pub poll: PollPolicy,
}

impl ApiConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Required: `SCREENING_API_KEY`,
    /// `SCREENING_API_SECRET`, `SCREENING_GROUP_ID`; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let key_id = required("SCREENING_API_KEY")?;
        let secret = required("SCREENING_API_SECRET")?;
        let group_id = required("SCREENING_GROUP_ID")?;

        let host = lookup("SCREENING_API_HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let scheme = lookup("SCREENING_SCHEME").unwrap_or_else(|| "https".into());
        if scheme != "https" && scheme != "http" {
            return Err(ConfigError::Invalid {
                key: "SCREENING_SCHEME",
                message: format!("expected 'http' or 'https', got '{scheme}'"),
            });
        }

        let gateway_path = normalize_gateway_path(
            &lookup("SCREENING_GATEWAY_PATH").unwrap_or_else(|| DEFAULT_GATEWAY_PATH.into()),
        );

        let timeout_secs = parse_or(&lookup, "SCREENING_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let max_attempts = parse_or(&lookup, "SCREENING_POLL_ATTEMPTS", DEFAULT_POLL_ATTEMPTS)?;
        let interval_ms = parse_or(&lookup, "SCREENING_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;

        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "SCREENING_POLL_ATTEMPTS",
                message: "must be at least 1".into(),
            });
        }

        tracing::info!(
            host = %host,
            gateway = %gateway_path,
            poll_attempts = max_attempts,
            poll_interval_ms = interval_ms,
            "Screening API configured"
        );

        Ok(Self {
            credentials: Credentials::new(key_id, secret.into_bytes(), host),
            scheme,
            gateway_path,
            group_id,
            http_timeout: Duration::from_secs(timeout_secs),
            poll: PollPolicy {
                max_attempts,
                interval: Duration::from_millis(interval_ms),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}

fn normalize_gateway_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else {
        format!("/{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SCREENING_API_KEY", "key-1"),
        ("SCREENING_API_SECRET", "c2VjcmV0"),
        ("SCREENING_GROUP_ID", "group-1"),
    ];

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let cfg = ApiConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(cfg.credentials.host(), DEFAULT_HOST);
        assert_eq!(cfg.credentials.secret(), b"c2VjcmV0");
        assert_eq!(cfg.gateway_path, "/screening/v3/");
        assert_eq!(cfg.scheme, "https");
        assert_eq!(cfg.poll, PollPolicy::default());
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = ApiConfig::from_lookup(lookup_from(&[
            ("SCREENING_API_KEY", "key-1"),
            ("SCREENING_GROUP_ID", "group-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SCREENING_API_SECRET")));
    }

    #[test]
    fn bad_numbers_and_zero_attempts_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCREENING_POLL_INTERVAL_MS", "soon"));
        assert!(matches!(
            ApiConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Invalid { key: "SCREENING_POLL_INTERVAL_MS", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCREENING_POLL_ATTEMPTS", "0"));
        assert!(ApiConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn gateway_path_is_normalized() {
        assert_eq!(normalize_gateway_path("screening/v3"), "/screening/v3/");
        assert_eq!(normalize_gateway_path("/screening/v3/"), "/screening/v3/");
        assert_eq!(normalize_gateway_path(""), "/");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let creds = Credentials::new("key-1", b"top-secret".to_vec(), "example.test");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("key-1"));
        assert!(!rendered.contains("top-secret"));
    }
}
